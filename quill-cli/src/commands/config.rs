use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quill_db::QuillConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the resolved configuration as TOML
    Show,
    /// Show config file path
    Path,
}

pub fn run_config(config: &QuillConfig, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => run_show(config),
        ConfigCommands::Path => run_path(),
    }
}

fn run_show(config: &QuillConfig) -> Result<()> {
    let toml_str = config
        .to_toml_string()
        .context("Failed to serialize config to TOML")?;
    println!("{}", toml_str);
    Ok(())
}

fn run_path() -> Result<()> {
    let path = QuillConfig::config_path();
    let status = if path.exists() { "exists" } else { "not created" };
    println!("{} ({})", path.display(), status);
    Ok(())
}
