pub mod args;
pub mod commands;
pub mod root;

pub use args::{validate_lookup_args, Args, Commands, LookupArgs};
pub use root::RootCommand;
