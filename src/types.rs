//! Core types for order-batch-dl

use crate::error::{Error, Result};
use bytes::Bytes;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;

#[allow(clippy::unwrap_used)]
static ORDER_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

/// Validated order identifier (hyphenated UUID, any case)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Validate a raw order identifier
    ///
    /// Anything that is not a hyphenated UUID is rejected, which also keeps
    /// metacharacters out of upstream URLs.
    pub fn parse(raw: &str) -> Result<Self> {
        if ORDER_ID_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidInput(format!(
                "Invalid order ID format. Expected a UUID, got: '{}'",
                raw
            )))
        }
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OrderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Normalized identifier/name pair for one asset of an order
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct AssetReference {
    /// Upstream asset identifier (never empty)
    pub id: String,
    /// Display name, used to name the archive entry (falls back to the id)
    pub name: String,
}

/// Output image format requested from the upstream service
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG (default)
    #[default]
    Jpeg,
    /// PNG
    Png,
    /// WebP
    Webp,
    /// AVIF
    Avif,
    /// JPEG XL
    Jxl,
}

impl ImageFormat {
    /// Value sent in the `format` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Avif => "avif",
            ImageFormat::Jxl => "jxl",
        }
    }

    /// File extension used for archive entries in this format
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Avif => "avif",
            ImageFormat::Jxl => "jxl",
        }
    }

    /// Map a response content type (e.g. `image/png; charset=binary`) to a format
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/webp" => Some(ImageFormat::Webp),
            "image/avif" => Some(ImageFormat::Avif),
            "image/jxl" => Some(ImageFormat::Jxl),
            _ => None,
        }
    }
}

/// Passthrough parameters forwarded to the upstream enhanced-asset endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadParams {
    /// Output format (default: jpeg)
    #[serde(default)]
    pub format: ImageFormat,

    /// Output quality 1-90 (None = upstream default)
    #[serde(default)]
    pub quality: Option<u8>,

    /// Download free preview-quality images (default: true)
    #[serde(default = "default_preview")]
    pub preview: bool,

    /// Upstream development mode, watermarked output without consuming credits (default: false)
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_preview() -> bool {
    true
}

impl Default for DownloadParams {
    fn default() -> Self {
        Self {
            format: ImageFormat::default(),
            quality: None,
            preview: true,
            dev_mode: false,
        }
    }
}

impl DownloadParams {
    /// Reject parameters the upstream service would refuse
    pub fn validate(&self) -> Result<()> {
        if let Some(quality) = self.quality
            && !(1..=90).contains(&quality)
        {
            return Err(Error::InvalidInput(format!(
                "Image quality must be between 1 and 90, got: {}",
                quality
            )));
        }
        Ok(())
    }

    /// Query pairs for the enhanced-asset request
    ///
    /// `preview` is only sent when disabled, `quality` only when set.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if !self.preview {
            pairs.push(("preview", "false".to_string()));
        }
        pairs.push(("format", self.format.as_str().to_string()));
        if let Some(quality) = self.quality {
            pairs.push(("quality", quality.to_string()));
        }
        pairs
    }
}

/// Raw content of one successfully downloaded asset
#[derive(Clone, Debug)]
pub struct FetchedAsset {
    /// Response body
    pub bytes: Bytes,
    /// Declared content type, if any
    pub content_type: Option<String>,
}

/// Result of attempting to download one asset reference
#[derive(Clone, Debug)]
pub enum DownloadOutcome {
    /// The asset was downloaded
    Success {
        /// The asset that was downloaded
        reference: AssetReference,
        /// Raw asset bytes
        bytes: Bytes,
        /// Declared content type, used to pick the entry extension
        content_type: Option<String>,
        /// Number of upstream attempts made (1 or 2)
        attempts: u32,
    },
    /// The asset could not be downloaded
    Failure {
        /// The asset that failed
        reference: AssetReference,
        /// Human-readable failure reason
        reason: String,
        /// Upstream HTTP status, when the failure carried one
        http_status: Option<u16>,
        /// Number of upstream attempts made (1 or 2)
        attempts: u32,
    },
}

impl DownloadOutcome {
    /// The asset this outcome belongs to
    pub fn reference(&self) -> &AssetReference {
        match self {
            DownloadOutcome::Success { reference, .. } => reference,
            DownloadOutcome::Failure { reference, .. } => reference,
        }
    }

    /// Number of upstream attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            DownloadOutcome::Success { attempts, .. } => *attempts,
            DownloadOutcome::Failure { attempts, .. } => *attempts,
        }
    }

    /// Whether the download succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success { .. })
    }
}

/// One failed asset, as listed in the download report and the 422 error body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReportEntry {
    /// Asset identifier
    pub id: String,
    /// Asset display name
    pub name: String,
    /// Human-readable failure reason
    pub reason: String,
    /// Upstream HTTP status, when available
    pub status: Option<u16>,
}

/// Response metadata for a completed (full or partial) batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchCounts {
    /// Number of resolved asset references
    pub total: usize,
    /// Number of assets written to the archive
    pub downloaded: usize,
    /// Number of assets listed in the download report
    pub failed: usize,
}
