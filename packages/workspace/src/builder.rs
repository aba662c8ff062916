//! Compile the production snapshot into a deployable document.
//!
//! A build either leaves a readable artifact behind or fails with
//! diagnostic text. Upload only ever reads an artifact from a completed
//! build.

use async_trait::async_trait;
use serde_json::Value;
use sitecraft_template::{compile_with, CompileOptions};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;

pub const ARTIFACT_NAME: &str = "index.html";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to read template {path:?}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start build command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Build command exited with {status}:\n{diagnostics}")]
    Failed { status: String, diagnostics: String },

    #[error("Build command timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Build finished without producing {0:?}")]
    MissingArtifact(PathBuf),
}

/// Output of a completed build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
}

#[async_trait]
pub trait SiteBuilder: Send + Sync {
    async fn build(&self, production: &Value) -> Result<Artifact, BuildError>;
}

/// In-process build: compile the template and write `index.html`.
pub struct CompileBuilder {
    template_path: PathBuf,
    out_dir: PathBuf,
    options: CompileOptions,
}

impl CompileBuilder {
    pub fn new(template_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            out_dir: out_dir.into(),
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl SiteBuilder for CompileBuilder {
    async fn build(&self, production: &Value) -> Result<Artifact, BuildError> {
        let template = tokio::fs::read_to_string(&self.template_path)
            .await
            .map_err(|source| BuildError::Template {
                path: self.template_path.clone(),
                source,
            })?;

        let html = compile_with(&template, production, &self.options);

        let output = |source| BuildError::Output {
            path: self.out_dir.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.out_dir).await.map_err(output)?;
        let path = self.out_dir.join(ARTIFACT_NAME);
        tokio::fs::write(&path, html).await.map_err(output)?;

        tracing::debug!(artifact = ?path, "compiled site");
        Ok(Artifact { path })
    }
}

/// External build: run a shell command that reads the production snapshot
/// from disk and writes the artifact.
pub struct CommandBuilder {
    command: String,
    cwd: PathBuf,
    artifact: PathBuf,
    timeout: Duration,
}

impl CommandBuilder {
    pub fn new(command: impl Into<String>, cwd: impl Into<PathBuf>, artifact: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.into(),
            artifact: artifact.into(),
            timeout,
        }
    }

    fn shell(&self) -> tokio::process::Command {
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = tokio::process::Command::new("cmd");
            cmd.args(["/C", &self.command]);
            cmd
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = tokio::process::Command::new("sh");
            cmd.args(["-c", &self.command]);
            cmd
        };
        cmd.current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl SiteBuilder for CommandBuilder {
    async fn build(&self, _production: &Value) -> Result<Artifact, BuildError> {
        tracing::info!(command = %self.command, "running build command");

        let child = self.shell().spawn().map_err(BuildError::Spawn)?;
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| BuildError::TimedOut(self.timeout))?
            .map_err(BuildError::Spawn)?;

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if diagnostics.is_empty() {
                diagnostics = String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
            return Err(BuildError::Failed {
                status: output.status.to_string(),
                diagnostics,
            });
        }

        let path = resolve(&self.cwd, &self.artifact);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(BuildError::MissingArtifact(path));
        }
        Ok(Artifact { path })
    }
}

fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
