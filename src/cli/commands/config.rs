use anyhow::Result;

use crate::config::Analyst1Config;

pub fn run_config_command(config: &Analyst1Config, generate: bool) -> Result<()> {
    if generate {
        println!("{}", Analyst1Config::generate_default_config());
    } else {
        println!("{}", config.to_redacted_toml()?);
    }
    Ok(())
}
