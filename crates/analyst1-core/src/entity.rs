//! Observable entity definitions.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The kind of observable submitted for enrichment.
///
/// Type strings outside the supported set are kept as `Other` so that the
/// request builder can reject them instead of guessing a platform type.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    IPv4,
    IPv6,
    Domain,
    Hash,
    Email,
    Cve,
    Other(String),
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::IPv4 => write!(f, "IPv4"),
            EntityType::IPv6 => write!(f, "IPv6"),
            EntityType::Domain => write!(f, "domain"),
            EntityType::Hash => write!(f, "hash"),
            EntityType::Email => write!(f, "email"),
            EntityType::Cve => write!(f, "cve"),
            EntityType::Other(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for EntityType {
    fn from(s: &str) -> Self {
        match s {
            "IPv4" => EntityType::IPv4,
            "IPv6" => EntityType::IPv6,
            "domain" => EntityType::Domain,
            "hash" => EntityType::Hash,
            "email" => EntityType::Email,
            "cve" => EntityType::Cve,
            other => EntityType::Other(other.to_string()),
        }
    }
}

impl From<String> for EntityType {
    fn from(s: String) -> Self {
        EntityType::from(s.as_str())
    }
}

impl From<EntityType> for String {
    fn from(entity_type: EntityType) -> Self {
        entity_type.to_string()
    }
}

impl EntityType {
    /// Case-insensitive match on the supported type names, used for
    /// `type:value` input on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ipv4" | "ip" => Some(EntityType::IPv4),
            "ipv6" => Some(EntityType::IPv6),
            "domain" => Some(EntityType::Domain),
            "hash" | "file" => Some(EntityType::Hash),
            "email" => Some(EntityType::Email),
            "cve" => Some(EntityType::Cve),
            _ => None,
        }
    }

    /// Analyst1 indicator type token for this entity type.
    ///
    /// `Cve` has no indicator type: CVEs are searched through the actor
    /// endpoint. `Other` has none either.
    pub fn platform_type(&self) -> Option<&'static str> {
        match self {
            EntityType::IPv4 => Some("ip"),
            EntityType::IPv6 => Some("ipv6"),
            EntityType::Hash => Some("file"),
            EntityType::Email => Some("email"),
            EntityType::Domain => Some("domain"),
            EntityType::Cve | EntityType::Other(_) => None,
        }
    }

    pub fn is_cve(&self) -> bool {
        matches!(self, EntityType::Cve)
    }
}

/// An observable to investigate.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub value: String,
}

fn cve_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^CVE-\d{4}-\d{4,}$").expect("valid CVE regex"))
}

fn hash_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[A-Fa-f0-9]{32}|[A-Fa-f0-9]{40}|[A-Fa-f0-9]{64})$")
            .expect("valid hash regex")
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
    })
}

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$")
            .expect("valid domain regex")
    })
}

impl Entity {
    pub fn new(entity_type: EntityType, value: impl Into<String>) -> Self {
        Self {
            entity_type,
            value: value.into(),
        }
    }

    /// Detect the entity type of a bare value.
    ///
    /// Returns `None` when the value does not look like any supported
    /// observable.
    pub fn detect(value: &str) -> Option<Self> {
        let value = value.trim();
        let entity_type = if value.parse::<Ipv4Addr>().is_ok() {
            EntityType::IPv4
        } else if value.parse::<Ipv6Addr>().is_ok() {
            EntityType::IPv6
        } else if cve_pattern().is_match(value) {
            EntityType::Cve
        } else if hash_pattern().is_match(value) {
            EntityType::Hash
        } else if email_pattern().is_match(value) {
            EntityType::Email
        } else if domain_pattern().is_match(value) {
            EntityType::Domain
        } else {
            return None;
        };

        Some(Self::new(entity_type, value))
    }

    /// Parse `type:value` or a bare value.
    ///
    /// The prefix is only treated as a type when it names a supported type,
    /// so IPv6 literals such as `fe80::1` still fall through to detection.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Some((prefix, rest)) = input.split_once(':') {
            if let Some(entity_type) = EntityType::from_name(prefix) {
                if !rest.is_empty() {
                    return Some(Self::new(entity_type, rest));
                }
            }
        }
        Self::detect(input)
    }
}
