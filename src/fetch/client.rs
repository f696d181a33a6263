use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, FetchError};
use crate::fetch::retry::RetryPolicy;
use crate::inventory::SourceId;

/// Authenticated JSON client for one remote source.
///
/// Credentials travel as default headers on every request; no cookies or
/// session state are kept between calls.
#[derive(Debug, Clone)]
pub struct HttpSource {
    source_id: SourceId,
    base_url: String,
    client: Client,
    retry: RetryPolicy,
    quota_header: Option<&'static str>,
}

impl HttpSource {
    pub fn new(
        source_id: SourceId,
        base_url: impl Into<String>,
        auth_headers: &[(&'static str, &str)],
        retry: RetryPolicy,
        timeout: Duration,
    ) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        for (name, value) in auth_headers {
            let value = HeaderValue::from_str(value).map_err(|_| {
                AppError::Config(format!("{} header {} has an invalid value", source_id, name))
            })?;
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                AppError::Config(format!("{} header name {} is invalid", source_id, name))
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            source_id,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            retry,
            quota_header: None,
        })
    }

    /// Log the remaining request quota the remote reports in `header`
    pub fn with_quota_header(mut self, header: &'static str) -> Self {
        self.quota_header = Some(header);
        self
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// GET `endpoint` and decode the JSON body, applying the retry policy
    pub async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let label = format!("{} {}", self.source_id, endpoint);
        self.retry
            .run(&label, |attempt| self.get_json_once(endpoint, query, attempt))
            .await
    }

    async fn get_json_once(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        attempt: u32,
    ) -> Result<Value, FetchError> {
        let url = self.url_for(endpoint);
        debug!("🔄 {} request (attempt {}): {}", self.source_id, attempt, url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                source_id: self.source_id,
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        debug!("📊 {} response: {}", self.source_id, status);

        if let Some(header) = self.quota_header {
            let remaining = response
                .headers()
                .get(header)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("N/A");
            debug!("📈 {} requests remaining: {}", self.source_id, remaining);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ {} {} error: {} {}", self.source_id, endpoint, status, body);
            return Err(FetchError::Http {
                source_id: self.source_id,
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Network {
            source_id: self.source_id,
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse {
            source_id: self.source_id,
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    /// Shorthand for a shape error on `endpoint`
    pub fn parse_error(&self, endpoint: &str, message: impl Into<String>) -> FetchError {
        FetchError::Parse {
            source_id: self.source_id,
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }
}

pub(crate) fn log_source_config(source_id: SourceId, base_url: &str, credentials: &[(&str, bool)]) {
    info!("🔧 {} API configuration:", source_id.display_name());
    info!("   Base URL: {}", base_url);
    for (name, present) in credentials {
        info!("   {}: {}", name, if *present { "✅ Set" } else { "❌ Missing" });
    }
}
