//! Request construction for the Analyst1 REST API.
//!
//! Building a request never touches the network. The only failure modes are
//! caller contract violations: an entity type the platform does not know, or
//! a missing base URL.

use std::fmt;

use analyst1_core::{Entity, EntityType, LookupError, LookupOptions};
use reqwest::Method;

pub const INDICATOR_MATCH_PATH: &str = "api/1_0/indicator/match";
pub const INDICATOR_SEARCH_PATH: &str = "api/1_0/indicator";
pub const ACTOR_PATH: &str = "api/1_0/actor";

/// Which endpoint family a request targets. Decides how a 200 body is
/// classified and summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Exact indicator match; misses come back as 404.
    Match,
    /// Full-text indicator search; misses come back as an empty result list.
    Search,
    /// Actor search by CVE.
    Cve,
    /// Single actor fetched by id.
    Actor,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// A fully specified HTTP request for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub uri: String,
    pub query: Vec<(&'static str, String)>,
    pub auth: Credentials,
    /// The response body is expected to be JSON.
    pub json: bool,
    pub mode: SearchMode,
}

impl RequestDescriptor {
    fn get(uri: String, query: Vec<(&'static str, String)>, options: &LookupOptions, mode: SearchMode) -> Self {
        Self {
            method: Method::GET,
            uri,
            query,
            auth: Credentials {
                user: options.user_name.clone(),
                pass: options.password.clone(),
            },
            json: true,
            mode,
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Build the lookup request for one entity.
pub fn build_request(entity: &Entity, options: &LookupOptions) -> Result<RequestDescriptor, LookupError> {
    let base_url = options.base_url()?;

    match &entity.entity_type {
        EntityType::Cve => Ok(RequestDescriptor::get(
            format!("{}{}", base_url, ACTOR_PATH),
            vec![("cve", entity.value.clone())],
            options,
            SearchMode::Cve,
        )),
        EntityType::Other(name) => Err(LookupError::UnsupportedEntityType(name.clone())),
        entity_type @ (EntityType::IPv4
        | EntityType::IPv6
        | EntityType::Domain
        | EntityType::Hash
        | EntityType::Email) => {
            if options.do_indicator_match_search {
                let platform_type = entity_type
                    .platform_type()
                    .ok_or_else(|| LookupError::UnsupportedEntityType(entity_type.to_string()))?;
                Ok(RequestDescriptor::get(
                    format!("{}{}", base_url, INDICATOR_MATCH_PATH),
                    vec![
                        ("value", entity.value.clone()),
                        ("type", platform_type.to_string()),
                    ],
                    options,
                    SearchMode::Match,
                ))
            } else {
                Ok(RequestDescriptor::get(
                    format!("{}{}", base_url, INDICATOR_SEARCH_PATH),
                    vec![("searchTerm", entity.value.clone())],
                    options,
                    SearchMode::Search,
                ))
            }
        }
    }
}

/// Build the request fetching a single actor record by id.
pub fn build_actor_request(actor_id: &str, options: &LookupOptions) -> Result<RequestDescriptor, LookupError> {
    let base_url = options.base_url()?;
    Ok(RequestDescriptor::get(
        format!("{}{}/{}", base_url, ACTOR_PATH, actor_id),
        Vec::new(),
        options,
        SearchMode::Actor,
    ))
}
