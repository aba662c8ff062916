use anyhow::Result;
use clap::Args;
use colored::Colorize;
use sitecraft_workspace::{Config, Snapshot, DEFAULT_CONFIG_NAME};
use std::fs;
use std::path::Path;

const STARTER_TEMPLATE: &str = include_str!("../../starter/index.html");
const STARTER_CONTENT: &str = include_str!("../../starter/content.json");

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Template path, relative to the project root
    #[arg(short, long, default_value = "site/index.html")]
    pub template: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!("{} {} already exists", "⚠️".yellow(), DEFAULT_CONFIG_NAME.bright_white());
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Sitecraft project...".bright_blue().bold());

    let config = Config {
        template_path: args.template.clone(),
        ..Config::default()
    };

    let template = config.template_path(cwd);
    if !template.exists() {
        if let Some(parent) = template.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&template, STARTER_TEMPLATE)?;
        println!("  {} Created {}", "✓".green(), args.template);
    }

    let content_dir = config.content_dir(cwd);
    let preview = content_dir.join(Snapshot::Preview.file_name());
    if !preview.exists() {
        fs::create_dir_all(&content_dir)?;
        fs::write(&preview, STARTER_CONTENT)?;
        println!("  {} Created {}/{}", "✓".green(), config.content_dir, Snapshot::Preview.file_name());
    }

    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: sitecraft serve");
    println!("  2. Open http://{}:{}/ and toggle edit mode", config.http.host, config.http.port);
    println!("  3. Run: sitecraft publish");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_scaffolds_project() {
        let dir = tempfile::tempdir().unwrap();
        init(
            InitArgs {
                template: "web/page.html".into(),
                force: false,
            },
            dir.path(),
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.template_path, "web/page.html");
        assert!(dir.path().join("web/page.html").exists());

        let content = fs::read_to_string(dir.path().join("content/content.preview.json")).unwrap();
        let tree: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(tree["hero"]["title"], "We build things");
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{"templatePath":"mine.html"}"#).unwrap();
        init(
            InitArgs {
                template: "site/index.html".into(),
                force: false,
            },
            dir.path(),
        )
        .unwrap();
        assert_eq!(Config::load(dir.path()).unwrap().template_path, "mine.html");
        assert!(!dir.path().join("site/index.html").exists());
    }
}
