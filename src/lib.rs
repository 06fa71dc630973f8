pub mod cli;
pub mod config;
pub mod integration;

// Re-export core types for convenience
pub use analyst1_core::{Details, Entity, EntityType, LookupError, LookupOptions, LookupResult};
pub use config::{Analyst1Config, RequestSettings};
pub use integration::Integration;
