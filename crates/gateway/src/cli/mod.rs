pub mod config;

use clap::{Parser, Subcommand};

/// Switchboard — bot/human conversation routing gateway.
#[derive(Debug, Parser)]
#[command(name = "switchboard", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the gateway (the default when no subcommand is given).
    Serve,
    /// Inspect or check the configuration file.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Show the version and exit.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Check the config file for problems.
    Validate,
    /// Print the effective config (defaults applied) as TOML.
    Show,
}

/// Locate and parse the config file.
///
/// The path comes from `SWITCHBOARD_CONFIG`, falling back to
/// `switchboard.toml` in the working directory. A missing file is not an
/// error; the built-in defaults apply. Returns the config together with
/// the path it came from, for log lines and `config validate` output.
pub fn load_config() -> anyhow::Result<(sb_domain::config::Config, String)> {
    let path =
        std::env::var("SWITCHBOARD_CONFIG").unwrap_or_else(|_| "switchboard.toml".to_owned());

    if !std::path::Path::new(&path).exists() {
        return Ok((sb_domain::config::Config::default(), path));
    }

    let raw =
        std::fs::read_to_string(&path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    let config = toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))?;
    Ok((config, path))
}
