//! Lookup results and details payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Entity;

/// Name used for actors the platform returned without a title.
pub const UNKNOWN_ACTOR_NAME: &str = "Unknown Actor";

/// Actor reference extracted from a CVE search, resolved later by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorStub {
    pub name: String,
    #[serde(default)]
    pub id: Value,
}

impl ActorStub {
    /// Path segment for fetching this actor, if it has a usable id.
    pub fn id_segment(&self) -> Option<String> {
        match &self.id {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }
}

/// Details for a CVE hit: actor stubs plus the records the detail
/// expander resolved for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveDetails {
    pub actors: Vec<ActorStub>,
    #[serde(default)]
    pub results: Vec<Value>,
}

/// Details for an indicator hit. Search bodies are kept as returned; any
/// field besides `totalResults` and `results` lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDetails {
    #[serde(rename = "totalResults", default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<Value>,
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Details payload of a hit.
///
/// Deserializing a bare `Details` guesses the variant from its shape, so an
/// indicator body carrying its own `actors` list reads back as `Cve`.
/// Deserialize a whole [`LookupResult`] to pick the variant from the entity
/// type instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Details {
    Cve(CveDetails),
    Indicator(IndicatorDetails),
}

impl Details {
    pub fn results(&self) -> &[Value] {
        match self {
            Details::Cve(details) => &details.results,
            Details::Indicator(details) => &details.results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupData {
    pub summary: Vec<String>,
    pub details: Details,
}

/// One output record per input entity. `data` is `None` on a miss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLookupResult")]
pub struct LookupResult {
    pub entity: Entity,
    pub data: Option<LookupData>,
}

#[derive(Deserialize)]
struct RawLookupData {
    summary: Vec<String>,
    details: Value,
}

#[derive(Deserialize)]
struct RawLookupResult {
    entity: Entity,
    data: Option<RawLookupData>,
}

impl TryFrom<RawLookupResult> for LookupResult {
    type Error = serde_json::Error;

    fn try_from(raw: RawLookupResult) -> Result<Self, Self::Error> {
        let is_cve = raw.entity.entity_type.is_cve();
        let data = raw
            .data
            .map(|data| {
                let details = if is_cve {
                    Details::Cve(serde_json::from_value(data.details)?)
                } else {
                    Details::Indicator(serde_json::from_value(data.details)?)
                };
                Ok::<_, serde_json::Error>(LookupData {
                    summary: data.summary,
                    details,
                })
            })
            .transpose()?;

        Ok(Self {
            entity: raw.entity,
            data,
        })
    }
}

impl LookupResult {
    pub fn miss(entity: Entity) -> Self {
        Self { entity, data: None }
    }

    pub fn hit(entity: Entity, summary: Vec<String>, details: Details) -> Self {
        Self {
            entity,
            data: Some(LookupData { summary, details }),
        }
    }

    pub fn is_miss(&self) -> bool {
        self.data.is_none()
    }

    pub fn details(&self) -> Option<&Details> {
        self.data.as_ref().map(|data| &data.details)
    }
}
