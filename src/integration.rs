//! Host-facing lookup integration.
//!
//! `Integration::startup` runs once and builds the shared transport from the
//! `[request]` settings. Lookups and detail expansion then borrow it for
//! every call.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use analyst1_client::{Analyst1Client, HttpTransport, Transport, TransportConfig};
use analyst1_core::{Details, Entity, LookupOptions, LookupResult};

use crate::config::RequestSettings;

#[derive(Clone)]
pub struct Integration {
    client: Analyst1Client,
}

fn read_optional(path: &str, what: &str) -> Result<Option<Vec<u8>>> {
    if path.is_empty() {
        return Ok(None);
    }
    let bytes = std::fs::read(Path::new(path))
        .with_context(|| format!("Failed to read {} file: {}", what, path))?;
    Ok(Some(bytes))
}

/// Transport configuration for `settings`, reading certificate files from disk.
pub fn transport_config(settings: &RequestSettings) -> Result<TransportConfig> {
    let mut config = TransportConfig::new()
        .with_reject_unauthorized(settings.reject_unauthorized)
        .with_timeout(Duration::from_secs(settings.timeout_secs));

    if let Some(cert) = read_optional(&settings.cert, "certificate")? {
        let key = read_optional(&settings.key, "private key")?;
        config = config.with_client_identity(cert, key);
    } else if !settings.key.is_empty() {
        anyhow::bail!("request.key is set but request.cert is empty");
    }
    if !settings.passphrase.is_empty() {
        config = config.with_passphrase(settings.passphrase.clone());
    }
    if let Some(ca) = read_optional(&settings.ca, "certificate authority")? {
        config = config.with_ca(ca);
    }
    if !settings.proxy.is_empty() {
        config = config.with_proxy(settings.proxy.clone());
    }

    Ok(config)
}

impl Integration {
    pub fn startup(settings: &RequestSettings) -> Result<Self> {
        let config = transport_config(settings)?;
        let transport = HttpTransport::new(&config).context("Failed to build HTTP transport")?;
        tracing::info!("Analyst1 integration started");
        Ok(Self::with_transport(Arc::new(transport)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            client: Analyst1Client::new(transport),
        }
    }

    pub fn client(&self) -> &Analyst1Client {
        &self.client
    }

    pub async fn do_lookup(
        &self,
        entities: &[Entity],
        options: &LookupOptions,
    ) -> Result<Vec<LookupResult>> {
        Ok(self.client.lookup(entities, options).await?)
    }

    pub async fn on_details(
        &self,
        result: &LookupResult,
        options: &LookupOptions,
    ) -> Result<Option<Details>> {
        Ok(self.client.expand(result, options).await?)
    }
}
