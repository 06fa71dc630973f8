pub mod config;
pub mod lookup;

pub use config::run_config_command;
pub use lookup::{collect_entities, execute_lookup, run_lookup_command};
