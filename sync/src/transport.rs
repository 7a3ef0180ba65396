use async_trait::async_trait;
use common::{Endpoint, Method};
use serde_json::Value;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{Result, SyncError};

/// The wire between the sync layer and the scheduler gateway.
///
/// Implementations return the decoded JSON body on any 2xx response and an
/// error for transport failures or other statuses. A 2xx body that is not
/// JSON comes back as `Value::Null` so normalization can degrade it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: &Endpoint, body: Option<&Value>) -> Result<Value>;
}

pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, endpoint: &Endpoint, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let mut request = match endpoint.method() {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        let query = endpoint.query();
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| SyncError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("{} returned {}", endpoint, status);
            return Err(SyncError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| SyncError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            log::debug!("{} body is not JSON ({}), treating as empty", endpoint, e);
            Value::Null
        }))
    }
}
