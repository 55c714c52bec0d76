//! Upstream order and asset API client
//!
//! [`AssetSource`] is the seam between the batch engine and the network. The
//! production implementation is [`UpstreamClient`]; tests substitute scripted sources.

use crate::config::UpstreamConfig;
use crate::error::{AssetError, Error, Result};
use crate::types::{AssetReference, DownloadParams, FetchedAsset, OrderId};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

/// Source of order metadata and asset content
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the raw order document
    ///
    /// Fails with [`Error::OrderNotFound`] when the upstream does not know the order,
    /// and [`Error::UpstreamUnavailable`] when it cannot be reached or misbehaves.
    async fn fetch_order(&self, order_id: &OrderId, dev_mode: bool) -> Result<serde_json::Value>;

    /// Perform a single download attempt for one asset
    async fn fetch_asset(
        &self,
        reference: &AssetReference,
        params: &DownloadParams,
    ) -> std::result::Result<FetchedAsset, AssetError>;
}

/// HTTP client for the upstream enhancement API
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl UpstreamClient {
    /// Build a client from configuration
    ///
    /// Every call is bounded by `request_timeout`, redirects included.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        if config.api_key.is_none() {
            tracing::warn!("no upstream API key configured, requests will be unauthenticated");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn headers(&self, dev_mode: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            match HeaderValue::from_str(key) {
                Ok(value) => {
                    headers.insert("x-api-key", value);
                }
                Err(_) => tracing::warn!("upstream API key is not a valid header value"),
            }
        }
        if dev_mode {
            headers.insert("x-dev-mode", HeaderValue::from_static("true"));
        }
        headers
    }
}

#[async_trait]
impl AssetSource for UpstreamClient {
    async fn fetch_order(&self, order_id: &OrderId, dev_mode: bool) -> Result<serde_json::Value> {
        let url = format!("{}/orders/{}", self.base_url, order_id);
        tracing::info!(order_id = %order_id, "retrieving order");

        let response = self
            .client
            .get(&url)
            .headers(self.headers(dev_mode))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(order_id = %order_id, error = %e, "network error retrieving order");
                Error::UpstreamUnavailable("Failed to reach upstream API".to_string())
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(Error::OrderNotFound {
                    order_id: order_id.to_string(),
                });
            }
            status => {
                tracing::error!(
                    order_id = %order_id,
                    status = status.as_u16(),
                    "upstream error retrieving order"
                );
                return Err(Error::UpstreamUnavailable(format!(
                    "Failed to retrieve order (upstream returned {})",
                    status.as_u16()
                )));
            }
        }

        response.json().await.map_err(|e| {
            tracing::error!(order_id = %order_id, error = %e, "unreadable order document");
            Error::UpstreamUnavailable("Upstream returned an unreadable order document".to_string())
        })
    }

    async fn fetch_asset(
        &self,
        reference: &AssetReference,
        params: &DownloadParams,
    ) -> std::result::Result<FetchedAsset, AssetError> {
        let url = format!(
            "{}/images/{}/enhanced",
            self.base_url,
            urlencoding::encode(&reference.id)
        );

        let response = self
            .client
            .get(&url)
            .headers(self.headers(params.dev_mode))
            .query(&params.query_pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(AssetError::EmptyBody);
        }

        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }
}
