//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::stacks::build_app;
use crate::cli::args::{Cli, Commands, ConfigCommands, FormatArg};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, project_config_path, Settings};
use crate::domain::Format;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `cdkflow --help`".into(),
        ));
    };
    let project_dir = resolve_project_dir(cli.project_dir.as_deref())?;
    debug!("project_dir: {}", project_dir.display());

    // These work without loading (possibly broken) config files.
    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Commands::Config {
            command: ConfigCommands::Path,
        } => return _config_path(&project_dir),
        _ => {}
    }

    let settings = Settings::load(Some(project_dir.as_path()))?;
    let container = ServiceContainer::new(settings);
    match command {
        Commands::Synth {
            out_dir,
            format,
            stdout,
            check,
        } => _synth(
            &container,
            &project_dir,
            out_dir.as_deref(),
            *format,
            *stdout,
            *check,
        ),
        Commands::Tree => _tree(&container),
        Commands::Config {
            command: ConfigCommands::Show,
        } => _config_show(&container),
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

fn resolve_project_dir(arg: Option<&Path>) -> CliResult<PathBuf> {
    match arg {
        Some(dir) if dir.is_dir() => Ok(dir.to_path_buf()),
        Some(dir) => Err(CliError::InvalidArgs(format!(
            "project directory does not exist: {}",
            dir.display()
        ))),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("determine current directory", e).into()),
    }
}

#[instrument(skip(container))]
fn _synth(
    container: &ServiceContainer,
    project_dir: &Path,
    out_dir: Option<&Path>,
    format: Option<FormatArg>,
    stdout: bool,
    check: bool,
) -> CliResult<()> {
    let settings = &container.settings;
    let format = format.map(Format::from).unwrap_or(settings.format);
    let encoder = format.encoder(settings.header.clone());
    let out_dir = match out_dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => project_dir.join(dir),
        None => settings.resolved_output_dir(project_dir),
    };
    let mut app = build_app(settings)?;

    if stdout {
        let document = container.synth.render_document(&mut app, encoder.as_ref())?;
        output::raw(&document);
        return Ok(());
    }

    if check {
        let drift = container.synth.check(&mut app, encoder.as_ref(), &out_dir)?;
        if drift.is_empty() {
            output::success(&format!("workflows up to date in {}", out_dir.display()));
            return Ok(());
        }
        output::header("Stale workflow files:");
        for item in &drift {
            output::failure(&format!("{} ({:?})", item.path.display(), item.kind));
        }
        return Err(CliError::Stale { count: drift.len() });
    }

    let outcomes = container.synth.write(&mut app, encoder.as_ref(), &out_dir)?;
    for outcome in &outcomes {
        if outcome.changed {
            output::success(&format!("wrote {}", outcome.path.display()));
        } else {
            output::unchanged(&format!("{} (unchanged)", outcome.path.display()));
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn _tree(container: &ServiceContainer) -> CliResult<()> {
    let app = build_app(&container.settings)?;
    output::raw(&app.to_tree_string());
    output::detail(&format!(
        "depth: {}, leaves: {}",
        app.depth(),
        app.leaf_nodes().len()
    ));
    Ok(())
}

fn _config_show(container: &ServiceContainer) -> CliResult<()> {
    output::raw(&container.settings.to_toml()?);
    Ok(())
}

fn _config_path(project_dir: &Path) -> CliResult<()> {
    let marker = |path: &Path| if path.exists() { "" } else { " (not found)" };
    match global_config_path() {
        Some(path) => output::detail(&format!("global:  {}{}", path.display(), marker(&path))),
        None => output::detail("global:  <no config directory>"),
    }
    let local = project_config_path(project_dir);
    output::detail(&format!("project: {}{}", local.display(), marker(&local)));
    Ok(())
}
