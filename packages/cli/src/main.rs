mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{compile, init, publish, serve, CompileArgs, InitArgs, PublishArgs, ServeArgs};
use tracing_subscriber::EnvFilter;

/// Sitecraft CLI - static site with live in-page editing
#[derive(Parser, Debug)]
#[command(name = "sitecraft")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Sitecraft project
    Init(InitArgs),

    /// Render a content snapshot through the template
    Compile(CompileArgs),

    /// Promote preview content, build and upload the site
    Publish(PublishArgs),

    /// Start the live editor
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => match cli.command {
            Command::Init(args) => init(args, &cwd),
            Command::Compile(args) => compile(args, &cwd).await,
            Command::Publish(args) => publish(args, &cwd).await,
            Command::Serve(args) => serve(args, &cwd).await,
        },
        Err(err) => Err(anyhow::Error::new(err).context("Cannot get current directory")),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
