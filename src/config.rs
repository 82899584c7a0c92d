//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/cdkflow/cdkflow.toml`
//! 3. Project config: `<project_dir>/.cdkflow.toml`
//! 4. Environment variables: `CDKFLOW_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::Format;

pub const DEFAULT_OUTPUT_DIR: &str = ".github/workflows";
pub const DEFAULT_HEADER: &str = "Generated by cdkflow. Do not modify.";
pub const DEFAULT_STACK: &str = "cdk";

/// Unified configuration for cdkflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory workflow files are written to (default: .github/workflows)
    pub output_dir: PathBuf,
    /// Output format (default: yaml)
    pub format: Format,
    /// Comment written at the top of YAML files; `None` disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Name of the root stack
    pub stack: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            format: Format::default(),
            header: Some(DEFAULT_HEADER.to_string()),
            stack: DEFAULT_STACK.to_string(),
        }
    }
}

/// Raw settings for intermediate parsing.
///
/// `None` means "not specified, inherit from the layer below".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RawSettings {
    pub output_dir: Option<PathBuf>,
    pub format: Option<Format>,
    pub header: Option<String>,
    pub stack: Option<String>,
}

/// Get the XDG config directory for cdkflow.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cdkflow").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("cdkflow.toml"))
}

/// Get the path to the project config file.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".cdkflow.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// An empty header disables it.
fn normalize_header(header: String) -> Option<String> {
    if header.is_empty() {
        None
    } else {
        Some(header)
    }
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for the local config file
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path();
        let project = project_dir.map(project_config_path);
        let current = Self::load_files(global.as_deref(), project.as_deref())?;
        let mut current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;
        Ok(current)
    }

    /// Merge defaults with the given config files, skipping missing ones.
    ///
    /// Environment variables are not consulted.
    pub fn load_files(
        global: Option<&Path>,
        project: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();
        for path in [global, project].into_iter().flatten() {
            if path.exists() {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(raw);
            }
        }
        Ok(current)
    }

    /// Overlay wins for every field it specifies.
    fn merge_with(self, overlay: RawSettings) -> Self {
        Self {
            output_dir: overlay.output_dir.unwrap_or(self.output_dir),
            format: overlay.format.unwrap_or(self.format),
            header: match overlay.header {
                Some(header) => normalize_header(header),
                None => self.header,
            },
            stack: overlay.stack.unwrap_or(self.stack),
        }
    }

    /// Apply CDKFLOW_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("CDKFLOW").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("output_dir") {
            settings.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("format") {
            settings.format = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_string("header") {
            settings.header = normalize_header(val);
        }
        if let Ok(val) = config.get_string("stack") {
            settings.stack = val;
        }

        Ok(settings)
    }

    /// Expand `~`, `$VAR`, and `${VAR}` in the output directory.
    pub fn expand_paths(&mut self) {
        let raw = self.output_dir.to_string_lossy().to_string();
        let expanded = shellexpand::full(&raw)
            .map(|s| s.into_owned())
            .unwrap_or(raw);
        self.output_dir = PathBuf::from(expanded);
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.stack.trim().is_empty() {
            return Err(ApplicationError::Config {
                message: "stack name must not be empty".into(),
            });
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ApplicationError::Config {
                message: "output_dir must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Output directory resolved against the project directory.
    pub fn resolved_output_dir(&self, project_dir: &Path) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            project_dir.join(&self.output_dir)
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.output_dir, PathBuf::from(".github/workflows"));
        assert_eq!(settings.format, Format::Yaml);
        assert_eq!(settings.header.as_deref(), Some(DEFAULT_HEADER));
        assert_eq!(settings.stack, "cdk");
    }

    #[test]
    fn given_tilde_in_output_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            output_dir: PathBuf::from("~/workflows"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let out = settings.output_dir.to_string_lossy();
        assert!(out.starts_with(&home), "output_dir should start with home: {out}");
        assert!(!out.contains('~'));
    }

    #[test]
    fn given_empty_header_when_merging_then_header_disabled() {
        let raw = RawSettings {
            header: Some(String::new()),
            ..RawSettings::default()
        };

        let merged = Settings::default().merge_with(raw);

        assert_eq!(merged.header, None);
        assert_eq!(merged.stack, DEFAULT_STACK);
    }

    #[test]
    fn given_relative_output_dir_when_resolving_then_joined_to_project() {
        let settings = Settings::default();
        let resolved = settings.resolved_output_dir(Path::new("/work/repo"));
        assert_eq!(resolved, PathBuf::from("/work/repo/.github/workflows"));
    }
}
