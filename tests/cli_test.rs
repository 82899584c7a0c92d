//! Argument parsing tests for the cdkflow CLI.

use std::path::PathBuf;

use clap::Parser;

use cdkflow::cli::args::{Cli, Commands, ConfigCommands, FormatArg};
use cdkflow::domain::Format;

#[test]
fn given_synth_flags_when_parsed_then_fields_set() {
    let cli = Cli::try_parse_from([
        "cdkflow", "-ddd", "-C", "/tmp", "synth", "--out-dir", "out", "--format", "json",
    ])
    .unwrap();

    assert_eq!(cli.debug, 3);
    assert_eq!(cli.project_dir, Some(PathBuf::from("/tmp")));
    match cli.command {
        Some(Commands::Synth {
            out_dir,
            format,
            stdout,
            check,
        }) => {
            assert_eq!(out_dir, Some(PathBuf::from("out")));
            assert_eq!(format.map(Format::from), Some(Format::Json));
            assert!(!stdout && !check);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn given_stdout_and_check_when_parsed_then_conflict() {
    let result = Cli::try_parse_from(["cdkflow", "synth", "--stdout", "--check"]);

    assert!(result.is_err());
}

#[test]
fn given_config_path_when_parsed_then_subcommand() {
    let cli = Cli::try_parse_from(["cdkflow", "config", "path"]).unwrap();

    assert!(matches!(
        cli.command,
        Some(Commands::Config {
            command: ConfigCommands::Path
        })
    ));
}

#[test]
fn given_format_arg_when_converted_then_matching_format() {
    assert_eq!(Format::from(FormatArg::Yaml), Format::Yaml);
    assert_eq!(Format::from(FormatArg::Json), Format::Json);
}
