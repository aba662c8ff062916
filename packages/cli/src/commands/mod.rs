pub mod compile;
pub mod init;
pub mod publish;
pub mod serve;

pub use compile::{compile, CompileArgs};
pub use init::{init, InitArgs};
pub use publish::{publish, PublishArgs};
pub use serve::{serve, ServeArgs};

use anyhow::{Context, Result};
use sitecraft_workspace::{Config, Site};
use std::path::Path;

/// Open the project at `cwd` with its config file, if any.
pub(crate) fn open_site(cwd: &Path) -> Result<Site> {
    let config = Config::load(cwd).context("Failed to load config")?;
    Ok(Site::open(cwd, config))
}
