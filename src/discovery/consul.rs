//! Consul-backed configuration store.
//!
//! # Endpoints
//! - `GET /v1/kv/<prefix>?recurse=true`: route entries, values base64 encoded
//! - `GET /v1/health/service/<name>?passing=true`: healthy instances
//!
//! # Design Decisions
//! - A 404 on the KV listing means "no keys", not an outage
//! - The first passing instance wins, load balancing is not our concern
//! - Service address falls back to the node address when unset

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::discovery::{BackendError, ConfigBackend, KvEntry, ServiceAddress};

const TOKEN_HEADER: &str = "X-Consul-Token";

#[derive(Debug, Clone)]
pub struct ConsulBackend {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KvPair {
    key: String,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    node: NodeInfo,
    service: ServiceInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeInfo {
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceInfo {
    #[serde(default)]
    address: String,
    port: u16,
}

impl ConsulBackend {
    pub fn new(
        address: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let base_url = Url::parse(address)
            .map_err(|e| BackendError::Unavailable(format!("invalid consul address {address}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Base URL extended with `segments`, each percent-encoded.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BackendError::Unavailable(format!("invalid consul address {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, BackendError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }
        request
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl ConfigBackend for ConsulBackend {
    async fn list(&self, prefix: &str) -> Result<Vec<KvEntry>, BackendError> {
        // Slashes in the prefix separate KV path components.
        let mut url = self.endpoint(["v1", "kv"].into_iter().chain(prefix.split('/')))?;
        url.query_pairs_mut().append_pair("recurse", "true");

        let response = self.get(url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(BackendError::Unavailable(format!(
                "kv listing returned {}",
                response.status()
            )));
        }

        let pairs: Vec<KvPair> = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let mut entries = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let value = match pair.value {
                Some(encoded) => general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| BackendError::Decode(format!("{}: {}", pair.key, e)))?,
                None => Vec::new(),
            };
            entries.push(KvEntry::new(pair.key, value));
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn resolve_service(&self, name: &str) -> Result<ServiceAddress, BackendError> {
        let mut url = self.endpoint(["v1", "health", "service", name])?;
        url.query_pairs_mut().append_pair("passing", "true");

        let response = self.get(url).await?;
        if !response.status().is_success() {
            return Err(BackendError::Unavailable(format!(
                "health lookup for {} returned {}",
                name,
                response.status()
            )));
        }

        let instances: Vec<HealthEntry> = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        instances
            .into_iter()
            .next()
            .map(|entry| {
                let address = if entry.service.address.is_empty() {
                    entry.node.address
                } else {
                    entry.service.address
                };
                ServiceAddress::new(address, entry.service.port)
            })
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    fn kind(&self) -> &'static str {
        "consul"
    }
}
