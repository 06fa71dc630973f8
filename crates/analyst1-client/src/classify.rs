//! Response classification: every HTTP exchange becomes a payload, a miss,
//! or a batch-aborting error.

use analyst1_core::LookupError;
use serde_json::Value;

use crate::request::SearchMode;
use crate::transport::{HttpResponse, TransportError};

/// Classify a finished exchange. `Ok(None)` is a miss.
pub fn classify(outcome: Result<HttpResponse, TransportError>) -> Result<Option<Value>, LookupError> {
    let response = outcome.map_err(|e| LookupError::Http(e.to_string()))?;
    match response.status {
        200 => Ok(response.body),
        404 => Ok(None),
        400 => Err(LookupError::BadRequest {
            body: response.body.unwrap_or(Value::Null),
        }),
        status => Err(LookupError::UnexpectedStatus {
            status,
            body: response.body.unwrap_or(Value::Null),
        }),
    }
}

fn has_results(body: &Value) -> bool {
    body.get("results")
        .and_then(Value::as_array)
        .is_some_and(|results| !results.is_empty())
}

/// Whether a 200 body carries no intelligence for the entity.
pub fn is_miss(body: &Value, mode: SearchMode) -> bool {
    if body.is_null() {
        return true;
    }
    match mode {
        // match misses arrive as 404, any body is a hit
        SearchMode::Match | SearchMode::Actor => false,
        SearchMode::Search | SearchMode::Cve => !has_results(body),
    }
}
