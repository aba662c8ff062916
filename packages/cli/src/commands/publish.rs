use super::open_site;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::Path;

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn publish(args: PublishArgs, cwd: &Path) -> Result<()> {
    let site = open_site(cwd)?;
    println!("{}", "🚀 Publishing...".bright_blue().bold());

    match site.publisher().publish().await {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            for record in &report.stages {
                println!(
                    "  {} {:?} at {}",
                    "✓".green(),
                    record.stage,
                    record.completed_at.format("%H:%M:%S%.3f")
                );
            }
            println!();
            println!("{} {}", "✅ Published".green().bold(), report.url.unwrap_or_default());
            Ok(())
        }
        Err(err) => {
            eprintln!("  {} stopped after {:?}", "✗".red(), err.completed_stage());
            Err(err.into())
        }
    }
}
