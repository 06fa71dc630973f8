//! Per-call lookup options supplied by the host.

use serde::{Deserialize, Serialize};

use crate::LookupError;

/// Tenant options passed with every lookup.
///
/// Field names follow the host's option keys (`url`, `userName`, `password`,
/// `doIndicatorMatchSearch`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LookupOptions {
    /// Base URL of the Analyst1 API, including scheme and port.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub user_name: String,

    #[serde(default)]
    pub password: String,

    /// Exact indicator match (true) or full-text indicator search (false).
    #[serde(default = "default_match_search")]
    pub do_indicator_match_search: bool,
}

fn default_match_search() -> bool {
    true
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            user_name: String::new(),
            password: String::new(),
            do_indicator_match_search: default_match_search(),
        }
    }
}

impl LookupOptions {
    pub fn new(url: impl Into<String>, user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_name: user_name.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn with_match_search(mut self, enabled: bool) -> Self {
        self.do_indicator_match_search = enabled;
        self
    }

    /// Base URL with a guaranteed trailing `/`.
    pub fn base_url(&self) -> Result<String, LookupError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(LookupError::MissingOption("url"));
        }
        if url.ends_with('/') {
            Ok(url.to_string())
        } else {
            Ok(format!("{}/", url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let options = LookupOptions::new("https://analyst1.local", "u", "p");
        assert_eq!(options.base_url().unwrap(), "https://analyst1.local/");

        let options = LookupOptions::new("https://analyst1.local/", "u", "p");
        assert_eq!(options.base_url().unwrap(), "https://analyst1.local/");
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let options = LookupOptions::default();
        assert_eq!(options.base_url(), Err(LookupError::MissingOption("url")));
    }

    #[test]
    fn test_host_option_keys() {
        let options: LookupOptions = serde_json::from_str(
            r#"{"url": "https://a1", "userName": "alice", "password": "pw"}"#,
        )
        .unwrap();
        assert_eq!(options.user_name, "alice");
        assert!(options.do_indicator_match_search);
    }
}
