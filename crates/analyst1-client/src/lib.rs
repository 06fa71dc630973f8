//! Analyst1 API client for the lookup connector.
//!
//! This crate turns entities into Analyst1 requests, runs them with a fixed
//! ceiling of in-flight requests, classifies each response and assembles the
//! uniform `{summary, details}` results:
//! - [`build_request`]: entity to request descriptor
//! - [`Analyst1Client::lookup`]: bounded batch lookup
//! - [`Analyst1Client::expand`]: actor detail expansion for CVE hits

mod classify;
mod details;
mod lookup;
mod request;
mod summary;
mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use classify::{classify, is_miss};
pub use lookup::{Analyst1Client, MAX_PARALLEL_LOOKUPS};
pub use request::{
    build_actor_request, build_request, Credentials, RequestDescriptor, SearchMode, ACTOR_PATH,
    INDICATOR_MATCH_PATH, INDICATOR_SEARCH_PATH,
};
pub use summary::{assemble_result, build_details, cve_summary_tags, summary_tags};
pub use transport::{HttpResponse, HttpTransport, Transport, TransportConfig, TransportError};
