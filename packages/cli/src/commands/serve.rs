use super::open_site;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sitecraft_workspace::{reload_on_template_change, router, serve as serve_http};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Do not reload frames when the template changes
    #[arg(long)]
    pub no_watch: bool,
}

pub async fn serve(args: ServeArgs, cwd: &Path) -> Result<()> {
    let site = open_site(cwd)?;
    let state = site.app_state().await.context("Failed to start preview session")?;

    let _watch = if args.no_watch {
        None
    } else {
        Some(reload_on_template_change(site.template_path(), Arc::clone(&state.preview))?)
    };

    let host = args.host.unwrap_or_else(|| site.config().http.host.clone());
    let port = args.port.unwrap_or(site.config().http.port);
    let addr = format!("{}:{}", host, port);

    println!("{}", "🎨 Starting Sitecraft editor...".bright_blue().bold());
    println!("  Template: {}", site.template_path().display());
    println!("  Editor:   {}", format!("http://{}/", addr).cyan());
    println!();

    let app = router(state, Some(site.asset_mount()));
    serve_http(&addr, app).await?;
    Ok(())
}
