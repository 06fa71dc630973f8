//! HTTP transport shared by every lookup.
//!
//! The transport is built once from the TLS/proxy settings and then only
//! read. Tests substitute their own [`Transport`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Certificate, Client as HttpClient, Identity, Proxy};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::request::RequestDescriptor;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid transport configuration: {0}")]
    Config(String),
}

/// Status and parsed body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// `None` when the body was empty or JSON `null`.
    pub body: Option<Value>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, Some(body))
    }

    pub fn not_found() -> Self {
        Self::new(404, None)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError>;
}

/// Transport-level settings: client certificate, trust store, proxy and
/// certificate validation.
#[derive(Clone)]
pub struct TransportConfig {
    /// PEM certificate, or a PKCS#12 bundle when `passphrase` is set.
    pub cert: Option<Vec<u8>>,
    /// PKCS#8 PEM private key matching `cert`.
    pub key: Option<Vec<u8>>,
    pub passphrase: Option<String>,
    /// PEM certificate authority added to the trust store.
    pub ca: Option<Vec<u8>>,
    pub proxy: Option<String>,
    pub reject_unauthorized: bool,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            cert: None,
            key: None,
            passphrase: None,
            ca: None,
            proxy: None,
            reject_unauthorized: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("cert", &self.cert.as_ref().map(|c| c.len()))
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("ca", &self.ca.as_ref().map(|c| c.len()))
            .field("proxy", &self.proxy)
            .field("reject_unauthorized", &self.reject_unauthorized)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_identity(mut self, cert: Vec<u8>, key: Option<Vec<u8>>) -> Self {
        self.cert = Some(cert);
        self.key = key;
        self
    }

    pub fn with_passphrase(mut self, passphrase: String) -> Self {
        self.passphrase = Some(passphrase);
        self
    }

    pub fn with_ca(mut self, ca: Vec<u8>) -> Self {
        self.ca = Some(ca);
        self
    }

    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_reject_unauthorized(mut self, reject: bool) -> Self {
        self.reject_unauthorized = reject;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn identity(&self) -> Result<Option<Identity>, TransportError> {
        match (&self.cert, &self.key, &self.passphrase) {
            (Some(bundle), _, Some(passphrase)) => {
                Ok(Some(Identity::from_pkcs12_der(bundle, passphrase)?))
            }
            (Some(cert), Some(key), None) => Ok(Some(Identity::from_pkcs8_pem(cert, key)?)),
            (Some(_), None, None) => Err(TransportError::Config(
                "client certificate needs a private key or a passphrase-protected PKCS#12 bundle"
                    .to_string(),
            )),
            (None, Some(_), _) => Err(TransportError::Config(
                "private key configured without a client certificate".to_string(),
            )),
            (None, None, _) => Ok(None),
        }
    }
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http_client: HttpClient,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut builder = HttpClient::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.reject_unauthorized);

        if let Some(identity) = config.identity()? {
            builder = builder.identity(identity);
        }
        if let Some(ref ca) = config.ca {
            builder = builder.add_root_certificate(Certificate::from_pem(ca)?);
        }
        if let Some(ref proxy) = config.proxy {
            builder = builder.proxy(Proxy::all(proxy.as_str())?);
        }

        debug!(?config, "Building HTTP transport");

        Ok(Self {
            http_client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .http_client
            .request(request.method.clone(), &request.uri)
            .basic_auth(&request.auth.user, Some(&request.auth.pass));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if request.json {
            builder = builder.header(ACCEPT, "application/json");
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        Ok(HttpResponse::new(status, parse_body(&text)))
    }
}

/// Parse a response body as JSON. Bodies that are not JSON are kept as a
/// string so error responses still carry what the server said.
pub(crate) fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), None);
        assert_eq!(parse_body("null"), None);
        assert_eq!(parse_body(r#"{"tlp":"RED"}"#), Some(json!({"tlp": "RED"})));
        assert_eq!(
            parse_body("<html>gateway</html>"),
            Some(Value::String("<html>gateway</html>".to_string()))
        );
    }

    #[test]
    fn test_default_transport_builds() {
        assert!(HttpTransport::new(&TransportConfig::default()).is_ok());
    }

    #[test]
    fn test_certificate_without_key_is_rejected() {
        let config = TransportConfig::new().with_client_identity(b"cert".to_vec(), None);
        assert!(matches!(
            HttpTransport::new(&config),
            Err(TransportError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_ca_is_rejected() {
        let config = TransportConfig::new().with_ca(b"not a certificate".to_vec());
        assert!(HttpTransport::new(&config).is_err());
    }

    #[test]
    fn test_proxy_and_insecure_settings_build() {
        let config = TransportConfig::new()
            .with_proxy("http://proxy.internal:3128".to_string())
            .with_reject_unauthorized(false)
            .with_timeout(Duration::from_secs(5));
        assert!(HttpTransport::new(&config).is_ok());
    }
}
