use super::open_site;
use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use sitecraft_editor::{instrument, Rules};
use sitecraft_template::{compile_with, CompileOptions};
use sitecraft_workspace::{ContentStore, Snapshot};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SnapshotArg {
    Preview,
    Production,
}

impl From<SnapshotArg> for Snapshot {
    fn from(arg: SnapshotArg) -> Self {
        match arg {
            SnapshotArg::Preview => Snapshot::Preview,
            SnapshotArg::Production => Snapshot::Production,
        }
    }
}

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Content snapshot to render
    #[arg(short, long, value_enum, default_value = "preview")]
    pub snapshot: SnapshotArg,

    /// Render the editable preview (annotated and instrumented)
    #[arg(long)]
    pub editable: bool,

    /// Output to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// Output file (defaults to <outDir>/index.html)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub async fn compile(args: CompileArgs, cwd: &Path) -> Result<()> {
    let site = open_site(cwd)?;
    let snapshot = Snapshot::from(args.snapshot);

    let template_path = site.template_path();
    let template = fs::read_to_string(&template_path)
        .with_context(|| format!("Failed to read template {}", template_path.display()))?;

    let tree = site
        .content()
        .load(snapshot)
        .await?
        .ok_or_else(|| anyhow!("The {} snapshot does not exist", snapshot))?;

    let html = if args.editable {
        let annotated = compile_with(&template, &tree, &CompileOptions::preview());
        instrument(&annotated, &Rules::default()).html
    } else {
        compile_with(&template, &tree, &CompileOptions::default())
    };

    if args.stdout {
        println!("{}", html);
        return Ok(());
    }

    let out = args
        .out
        .unwrap_or_else(|| site.config().out_dir(cwd).join(sitecraft_workspace::builder::ARTIFACT_NAME));
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out, html)?;

    println!(
        "  {} {} ({}) → {}",
        "✓".green(),
        site.config().template_path,
        snapshot,
        out.display()
    );
    Ok(())
}
