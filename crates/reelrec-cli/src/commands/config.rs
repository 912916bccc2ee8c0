use clap::Subcommand;
use color_eyre::eyre::{bail, eyre, Context};
use color_eyre::Result;
use reel_config::{Config, PathManager};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write a default config file, optionally setting the user
    Init {
        #[arg(long)]
        user: Option<String>,
    },
}

pub fn run(cfg: &Config, paths: &PathManager, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let rendered = toml::to_string_pretty(cfg).context("Failed to render config")?;
            println!("# {}", paths.config_file().display());
            print!("{rendered}");
        }
        ConfigCommand::Init { user } => {
            let path = paths.config_file();
            if path.exists() {
                bail!("Config file already exists: {}", path.display());
            }
            let mut cfg = Config::default();
            cfg.user.name = user;
            cfg.save(&path).map_err(|e| eyre!("{}", e))?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
