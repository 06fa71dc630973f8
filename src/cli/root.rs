use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{validate_lookup_args, Args, Commands};
use crate::cli::commands::{run_config_command, run_lookup_command};
use crate::config::Analyst1Config;

pub struct RootCommand;

/// Log level for the subscriber: `-v` flags win over the configured level.
pub fn effective_log_level(verbosity: u8, configured: &str) -> String {
    match verbosity {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(level: &str) {
    // RUST_LOG takes precedence when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

impl RootCommand {
    pub async fn execute() -> Result<()> {
        let args = Args::parse();
        let env_vars: HashMap<String, String> = std::env::vars().collect();

        match args.command {
            Commands::Lookup(lookup_args) => {
                validate_lookup_args(&lookup_args)?;
                let config = Analyst1Config::load_with_precedence(
                    args.config.as_deref(),
                    Some(&lookup_args),
                    &env_vars,
                )?;
                init_tracing(&effective_log_level(args.verbosity, &config.logging.level));
                run_lookup_command(lookup_args, config).await
            }
            Commands::Config { generate } => {
                let config = if generate {
                    Analyst1Config::default()
                } else {
                    Analyst1Config::load_with_precedence(args.config.as_deref(), None, &env_vars)?
                };
                init_tracing(&effective_log_level(args.verbosity, &config.logging.level));
                run_config_command(&config, generate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_log_level() {
        assert_eq!(effective_log_level(0, "warn"), "warn");
        assert_eq!(effective_log_level(1, "warn"), "debug");
        assert_eq!(effective_log_level(3, "info"), "trace");
    }
}
