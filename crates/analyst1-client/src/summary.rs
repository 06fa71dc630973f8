//! Summary tags and details payloads for hits.

use analyst1_core::{
    ActorStub, CveDetails, Details, Entity, IndicatorDetails, LookupResult, UNKNOWN_ACTOR_NAME,
};
use serde_json::{json, Map, Value};

use crate::classify::is_miss;
use crate::request::SearchMode;

const MAX_ACTOR_TAGS: usize = 5;

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Best-effort actor name: indicator bodies use `name`, actor search
/// results use `title`.
fn actor_name(actor: &Value) -> Option<&str> {
    ["name", "title"]
        .iter()
        .filter_map(|key| actor.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty())
}

fn results(body: &Value) -> &[Value] {
    body.get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn indicator_actor_tags(body: &Value) -> impl Iterator<Item = String> + '_ {
    body.get("actors")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(actor_name)
        .map(|name| format!("Actor: {}", name))
}

/// Tags for a CVE hit. The remainder is counted against every actor in the
/// result list, named or not.
pub fn cve_summary_tags(actors: &[Value]) -> Vec<String> {
    let mut tags: Vec<String> = actors
        .iter()
        .filter_map(actor_name)
        .take(MAX_ACTOR_TAGS)
        .map(|name| format!("Actor: {}", name))
        .collect();

    if tags.len() < actors.len() {
        let remaining = actors.len() - tags.len();
        tags.push(format!("+{} more actors", remaining));
    }
    tags
}

pub fn summary_tags(body: &Value, mode: SearchMode) -> Vec<String> {
    match mode {
        SearchMode::Match => {
            let mut tags = vec![
                format!("TLP: {}", display(body.get("tlp"))),
                format!("Reports: {}", display(body.get("reportCount"))),
            ];
            tags.extend(indicator_actor_tags(body));
            tags
        }
        SearchMode::Search => {
            let mut tags = vec![format!("Results: {}", display(body.get("totalResults")))];
            tags.extend(indicator_actor_tags(body));
            tags
        }
        SearchMode::Cve => cve_summary_tags(results(body)),
        SearchMode::Actor => actor_name(body)
            .map(|name| vec![format!("Actor: {}", name)])
            .unwrap_or_default(),
    }
}

fn indicator_details(body: &Value) -> IndicatorDetails {
    if body.get("results").is_some_and(Value::is_array) {
        if let Ok(details) = serde_json::from_value::<IndicatorDetails>(body.clone()) {
            return details;
        }
    }
    IndicatorDetails {
        total_results: Some(json!(1)),
        results: vec![body.clone()],
        extra: Map::new(),
    }
}

pub fn build_details(body: &Value, mode: SearchMode) -> Details {
    match mode {
        SearchMode::Cve => Details::Cve(CveDetails {
            actors: results(body)
                .iter()
                .map(|actor| ActorStub {
                    name: actor_name(actor).unwrap_or(UNKNOWN_ACTOR_NAME).to_string(),
                    id: actor.get("id").cloned().unwrap_or(Value::Null),
                })
                .collect(),
            results: Vec::new(),
        }),
        SearchMode::Match | SearchMode::Search | SearchMode::Actor => {
            Details::Indicator(indicator_details(body))
        }
    }
}

/// Turn a classified outcome into the result record for `entity`.
pub fn assemble_result(entity: Entity, mode: SearchMode, body: Option<Value>) -> LookupResult {
    match body {
        Some(body) if !is_miss(&body, mode) => {
            let summary = summary_tags(&body, mode);
            let details = build_details(&body, mode);
            LookupResult::hit(entity, summary, details)
        }
        _ => LookupResult::miss(entity),
    }
}
