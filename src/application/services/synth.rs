//! Synthesis service
//!
//! Renders the construct tree into workflow files, writes them, and checks
//! whether files on disk are up to date.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::{artifacts, Address, App, Encoder};
use crate::infrastructure::traits::FileSystem;

/// One encoded workflow file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// File name including extension, e.g. `main.yml`
    pub file_name: String,
    /// Address of the workflow construct
    pub address: Address,
    pub content: String,
}

/// Result of writing one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    /// False when the file already had the rendered content
    pub changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftKind {
    Missing,
    Changed,
}

/// A file on disk that differs from a fresh render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    pub path: PathBuf,
    pub kind: DriftKind,
}

/// Service for turning an app into workflow files.
pub struct SynthService {
    fs: Arc<dyn FileSystem>,
}

impl SynthService {
    /// Create a new synthesis service.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Synthesize the app (finalizing it) and encode the whole document.
    #[instrument(level = "debug", skip_all)]
    pub fn render_document(&self, app: &mut App, encoder: &dyn Encoder) -> ApplicationResult<String> {
        let document = app.synth()?;
        Ok(encoder.encode(&document)?)
    }

    /// Synthesize the app (finalizing it) and encode one artifact per workflow.
    #[instrument(level = "debug", skip_all)]
    pub fn render(
        &self,
        app: &mut App,
        encoder: &dyn Encoder,
    ) -> ApplicationResult<Vec<RenderedArtifact>> {
        // Whole-tree synthesis catches collisions across stacks.
        app.synth()?;

        let mut rendered = Vec::new();
        for artifact in artifacts(app)? {
            let content = encoder.encode(&artifact.document)?;
            let file_name = format!("{}.{}", artifact.name, encoder.extension());
            debug!("render: {} -> {}", artifact.address, file_name);
            rendered.push(RenderedArtifact {
                file_name,
                address: artifact.address,
                content,
            });
        }
        Ok(rendered)
    }

    /// Render and write all artifacts into `out_dir`.
    ///
    /// Files whose content is already current are left untouched.
    #[instrument(level = "debug", skip(self, app, encoder))]
    pub fn write(
        &self,
        app: &mut App,
        encoder: &dyn Encoder,
        out_dir: &Path,
    ) -> ApplicationResult<Vec<WriteOutcome>> {
        let rendered = self.render(app, encoder)?;
        self.fs
            .create_dir_all(out_dir)
            .with_path_context("create output directory", out_dir)?;

        let mut outcomes = Vec::with_capacity(rendered.len());
        for artifact in rendered {
            let path = out_dir.join(&artifact.file_name);
            if self.is_current(&path, &artifact.content)? {
                debug!("write: {} unchanged", path.display());
                outcomes.push(WriteOutcome {
                    path,
                    changed: false,
                });
                continue;
            }
            self.fs
                .write_atomic(&path, &artifact.content)
                .with_path_context("write workflow", &path)?;
            info!("wrote {}", path.display());
            outcomes.push(WriteOutcome {
                path,
                changed: true,
            });
        }
        Ok(outcomes)
    }

    /// Compare a fresh render with the files in `out_dir`.
    #[instrument(level = "debug", skip(self, app, encoder))]
    pub fn check(
        &self,
        app: &mut App,
        encoder: &dyn Encoder,
        out_dir: &Path,
    ) -> ApplicationResult<Vec<Drift>> {
        let mut drift = Vec::new();
        for artifact in self.render(app, encoder)? {
            let path = out_dir.join(&artifact.file_name);
            if !self.fs.exists(&path) {
                drift.push(Drift {
                    path,
                    kind: DriftKind::Missing,
                });
            } else if !self.is_current(&path, &artifact.content)? {
                drift.push(Drift {
                    path,
                    kind: DriftKind::Changed,
                });
            }
        }
        debug!("check: {} stale files", drift.len());
        Ok(drift)
    }

    fn is_current(&self, path: &Path, content: &str) -> ApplicationResult<bool> {
        if !self.fs.exists(path) {
            return Ok(false);
        }
        let existing = self
            .fs
            .read_to_string(path)
            .with_path_context("read workflow", path)?;
        Ok(existing == content)
    }
}
