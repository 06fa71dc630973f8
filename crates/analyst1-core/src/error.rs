//! Lookup error taxonomy.

use serde_json::{json, Value};
use thiserror::Error;

/// Errors that abort a lookup batch or a detail expansion.
///
/// Remote errors carry the response body so the host can show what the
/// platform returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("HTTP Request Error: {0}")]
    Http(String),

    #[error("400 - Bad Request Parameters: {body}")]
    BadRequest { body: Value },

    #[error("Unexpected HTTP Status Code {status} received: {body}")]
    UnexpectedStatus { status: u16, body: Value },

    #[error("Unsupported entity type '{0}' reached the request builder")]
    UnsupportedEntityType(String),

    #[error("Lookup option '{0}' is required")]
    MissingOption(&'static str),
}

impl LookupError {
    /// Short tag describing the failure class.
    pub fn detail(&self) -> String {
        match self {
            LookupError::Http(_) => "HTTP Request Error".to_string(),
            LookupError::BadRequest { .. } => "400 - Bad Request Parameters".to_string(),
            LookupError::UnexpectedStatus { status, .. } => {
                format!("Unexpected HTTP Status Code {} received", status)
            }
            LookupError::UnsupportedEntityType(_) => "Unsupported Entity Type".to_string(),
            LookupError::MissingOption(_) => "Missing Option".to_string(),
        }
    }

    /// True for failures reported by the network or the remote service,
    /// false for caller contract violations.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            LookupError::Http(_) | LookupError::BadRequest { .. } | LookupError::UnexpectedStatus { .. }
        )
    }

    /// `{ "error": ..., "detail": ... }` object handed to the host.
    pub fn to_json(&self) -> Value {
        let error = match self {
            LookupError::Http(message) => Value::String(message.clone()),
            LookupError::BadRequest { body } | LookupError::UnexpectedStatus { body, .. } => body.clone(),
            LookupError::UnsupportedEntityType(entity_type) => Value::String(entity_type.clone()),
            LookupError::MissingOption(option) => Value::String((*option).to_string()),
        };
        json!({ "error": error, "detail": self.detail() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_tags() {
        assert_eq!(LookupError::Http("refused".into()).detail(), "HTTP Request Error");
        assert_eq!(
            LookupError::BadRequest { body: Value::Null }.detail(),
            "400 - Bad Request Parameters"
        );
        assert_eq!(
            LookupError::UnexpectedStatus { status: 503, body: Value::Null }.detail(),
            "Unexpected HTTP Status Code 503 received"
        );
    }

    #[test]
    fn test_contract_violation_is_not_remote() {
        assert!(!LookupError::UnsupportedEntityType("url".into()).is_remote());
        assert!(LookupError::Http("timeout".into()).is_remote());
    }

    #[test]
    fn test_to_json_carries_body() {
        let err = LookupError::BadRequest {
            body: json!({"message": "bad type"}),
        };
        assert_eq!(
            err.to_json(),
            json!({"error": {"message": "bad type"}, "detail": "400 - Bad Request Parameters"})
        );
    }
}
