use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look up entities in Analyst1
    Lookup(LookupArgs),

    /// Show the effective configuration
    Config {
        /// Print the default configuration instead
        #[arg(long)]
        generate: bool,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct LookupArgs {
    /// Entities as `type:value` or bare values (type is detected)
    pub values: Vec<String>,

    /// JSON file with an array of {"type", "value"} objects, `-` for stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Fetch actor details for CVE hits
    #[arg(long)]
    pub details: bool,

    /// Use the indicator search endpoint
    #[arg(long, conflicts_with = "exact")]
    pub search: bool,

    /// Use the exact indicator match endpoint
    #[arg(long = "match")]
    pub exact: bool,

    /// Print only summary tags instead of full results
    #[arg(long)]
    pub summary: bool,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub user_name: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub proxy: Option<String>,

    /// Accept invalid server certificates
    #[arg(long)]
    pub insecure: bool,

    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

pub fn validate_lookup_args(args: &LookupArgs) -> Result<()> {
    if args.values.is_empty() && args.input.is_none() {
        return Err(anyhow::anyhow!(
            "No entities given: pass values or --input <FILE>"
        ));
    }

    if let Some(input) = &args.input {
        if input.as_os_str() != "-" && !input.is_file() {
            return Err(anyhow::anyhow!("Input file not found: {}", input.display()));
        }
    }

    if args.timeout_secs == Some(0) {
        return Err(anyhow::anyhow!("--timeout-secs must be positive"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lookup_command() {
        let args = Args::try_parse_from([
            "analyst1-lookup",
            "lookup",
            "8.8.8.8",
            "cve:CVE-2021-44228",
            "--details",
            "--search",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.verbosity, 2);
        let Commands::Lookup(lookup) = args.command else {
            panic!("expected lookup command");
        };
        assert_eq!(lookup.values, vec!["8.8.8.8", "cve:CVE-2021-44228"]);
        assert!(lookup.details);
        assert!(lookup.search);
        assert!(!lookup.exact);
    }

    #[test]
    fn test_search_conflicts_with_match() {
        let parsed = Args::try_parse_from(["analyst1-lookup", "lookup", "x.com", "--search", "--match"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_config_command() {
        let args = Args::try_parse_from(["analyst1-lookup", "config", "--generate"]).unwrap();
        assert!(matches!(args.command, Commands::Config { generate: true }));
    }

    #[test]
    fn test_validate_lookup_args() {
        assert!(validate_lookup_args(&LookupArgs::default()).is_err());

        let args = LookupArgs {
            values: vec!["example.com".to_string()],
            ..LookupArgs::default()
        };
        assert!(validate_lookup_args(&args).is_ok());

        let args = LookupArgs {
            input: Some(PathBuf::from("/nonexistent/entities.json")),
            ..LookupArgs::default()
        };
        assert!(validate_lookup_args(&args).is_err());

        let args = LookupArgs {
            input: Some(PathBuf::from("-")),
            timeout_secs: Some(0),
            ..LookupArgs::default()
        };
        assert!(validate_lookup_args(&args).is_err());
    }
}
