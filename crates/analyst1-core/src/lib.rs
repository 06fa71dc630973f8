//! Core types for the Analyst1 lookup connector.
//!
//! This crate provides the types shared by the client and the host layer:
//! - Observable entities and their types (Entity, EntityType)
//! - Per-call lookup options (LookupOptions)
//! - Lookup results and their details payloads
//! - The lookup error taxonomy

mod entity;
mod error;
mod options;
mod result;

pub use entity::{Entity, EntityType};
pub use error::LookupError;
pub use options::LookupOptions;
pub use result::{
    ActorStub, CveDetails, Details, IndicatorDetails, LookupData, LookupResult,
    UNKNOWN_ACTOR_NAME,
};
