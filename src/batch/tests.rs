//! Tests for the batch download engine.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::*;
use crate::error::AssetError;
use crate::types::{AssetReference, FetchedAsset, ImageFormat};

const ORDER: &str = "100aefc4-8664-4180-9a97-42f428c6aace";

type Scripted = std::result::Result<Vec<u8>, AssetError>;

/// In-memory [`AssetSource`] with per-asset scripted responses.
///
/// Unscripted assets succeed with their id as the body. Each scripted response
/// is consumed once; the last one repeats.
pub(crate) struct ScriptedSource {
    order: Option<Value>,
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    content_types: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, u32>>,
    order_calls: AtomicU32,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self {
            order: None,
            scripts: Mutex::new(HashMap::new()),
            content_types: HashMap::new(),
            delays: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            order_calls: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_order(mut self, order: Value) -> Self {
        self.order = Some(order);
        self
    }

    pub(crate) fn script(self, id: &str, responses: Vec<Scripted>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.to_string(), responses.into());
        self
    }

    pub(crate) fn content_type(mut self, id: &str, content_type: &str) -> Self {
        self.content_types
            .insert(id.to_string(), content_type.to_string());
        self
    }

    pub(crate) fn delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub(crate) fn calls(&self, id: &str) -> u32 {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub(crate) fn total_asset_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub(crate) fn order_calls(&self) -> u32 {
        self.order_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_response(&self, id: &str) -> Scripted {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(id) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Ok(id.as_bytes().to_vec()),
        }
    }
}

#[async_trait]
impl AssetSource for ScriptedSource {
    async fn fetch_order(&self, order_id: &OrderId, _dev_mode: bool) -> Result<Value> {
        self.order_calls.fetch_add(1, Ordering::SeqCst);
        self.order.clone().ok_or_else(|| Error::OrderNotFound {
            order_id: order_id.to_string(),
        })
    }

    async fn fetch_asset(
        &self,
        reference: &AssetReference,
        _params: &DownloadParams,
    ) -> std::result::Result<FetchedAsset, AssetError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(reference.id.clone())
            .or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&reference.id) {
            tokio::time::sleep(*delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.next_response(&reference.id).map(|bytes| FetchedAsset {
            bytes: bytes.into(),
            content_type: self.content_types.get(&reference.id).cloned(),
        })
    }
}

fn order_id() -> OrderId {
    OrderId::parse(ORDER).unwrap()
}

fn order_doc(name: &str, assets: &[(&str, &str)]) -> Value {
    let images: Vec<Value> = assets
        .iter()
        .map(|(id, name)| json!({"image_id": id, "image_name": name}))
        .collect();
    json!({"order_id": ORDER, "name": name, "images": images})
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.max_delay = Duration::from_millis(5);
    config
}

fn downloader(source: Arc<ScriptedSource>, config: &Config) -> BatchDownloader {
    BatchDownloader::new(source, config, Stats::new())
}

fn archive_entries(body: ArchiveBody) -> HashMap<String, Vec<u8>> {
    let bytes = body.into_bytes().unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entries = HashMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        entries.insert(file.name().to_string(), content);
    }
    entries
}

// -----------------------------------------------------------------------
// Response classes
// -----------------------------------------------------------------------

#[tokio::test]
async fn full_success_archives_every_asset_without_report() {
    let source = Arc::new(ScriptedSource::new().with_order(order_doc(
        "Beach House",
        &[("a", "front.jpg"), ("b", "back.jpg"), ("c", "side.jpg")],
    )));
    let dl = downloader(source.clone(), &test_config());

    let batch = dl.run(&order_id(), &DownloadParams::default()).await.unwrap();

    assert_eq!(batch.order_name, "Beach House");
    assert_eq!(
        batch.counts,
        BatchCounts {
            total: 3,
            downloaded: 3,
            failed: 0
        }
    );
    let entries = archive_entries(batch.body);
    let names: HashSet<_> = entries.keys().cloned().collect();
    assert_eq!(
        names,
        HashSet::from([
            "front.jpg".to_string(),
            "back.jpg".to_string(),
            "side.jpg".to_string()
        ])
    );
    assert_eq!(entries["front.jpg"], b"a");

    let snap = dl.stats().snapshot(true).await;
    assert_eq!(snap.zips_served, 1);
    assert_eq!(snap.images_downloaded, 3);
    assert_eq!(snap.recent_errors, Some(vec![]));
}

#[tokio::test]
async fn one_failure_yields_partial_archive_with_report() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_order(order_doc(
                "Beach House",
                &[("a", "front.jpg"), ("b", "back.jpg"), ("c", "side.jpg")],
            ))
            .script("b", vec![Err(AssetError::Status { status: 404 })]),
    );
    let dl = downloader(source.clone(), &test_config());

    let batch = dl.run(&order_id(), &DownloadParams::default()).await.unwrap();

    assert_eq!(
        batch.counts,
        BatchCounts {
            total: 3,
            downloaded: 2,
            failed: 1
        }
    );
    let entries = archive_entries(batch.body);
    assert_eq!(entries.len(), 3, "two images plus the report");
    let report = String::from_utf8(entries[REPORT_ENTRY_NAME].clone()).unwrap();
    assert!(report.contains("Downloaded: 2/3"));
    assert!(report.contains("  - b (back.jpg): HTTP 404"));
    assert_eq!(source.calls("b"), 1, "4xx is not retried");

    let snap = dl.stats().snapshot(true).await;
    assert_eq!(snap.images_failed, 1);
    assert_eq!(snap.recent_errors.unwrap().len(), 1);
}

#[tokio::test]
async fn all_failures_are_a_total_failure_with_every_reason() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_order(order_doc("Order", &[("a", "a.jpg"), ("b", "b.jpg")]))
            .script("a", vec![Err(AssetError::Status { status: 500 })])
            .script("b", vec![Err(AssetError::Timeout)]),
    );
    let dl = downloader(source.clone(), &test_config());

    let err = dl
        .run(&order_id(), &DownloadParams::default())
        .await
        .unwrap_err();

    match err {
        Error::TotalBatchFailure { order_id, failures } => {
            assert_eq!(order_id, ORDER);
            assert_eq!(failures.len(), 2);
            let reasons: HashSet<_> = failures.iter().map(|f| f.reason.as_str()).collect();
            assert_eq!(reasons, HashSet::from(["HTTP 500", "Download timed out"]));
        }
        other => panic!("expected total batch failure, got {other:?}"),
    }
    assert_eq!(source.calls("a"), 2, "5xx retried once");
    assert_eq!(source.calls("b"), 2, "timeout retried once");

    let snap = dl.stats().snapshot(true).await;
    assert_eq!(snap.batches_failed, 1);
    assert_eq!(snap.zips_served, 0);
    assert_eq!(snap.recent_errors.unwrap()[0].error, "All images failed");
}

#[tokio::test]
async fn transient_failure_then_success_is_archived() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_order(order_doc("Order", &[("a", "a.jpg")]))
            .script(
                "a",
                vec![Err(AssetError::Status { status: 503 }), Ok(b"late".to_vec())],
            ),
    );
    let dl = downloader(source.clone(), &test_config());

    let batch = dl.run(&order_id(), &DownloadParams::default()).await.unwrap();

    assert_eq!(batch.counts.downloaded, 1);
    assert_eq!(source.calls("a"), 2);
    assert_eq!(archive_entries(batch.body)["a.jpg"], b"late");
}

// -----------------------------------------------------------------------
// Request-level rejections
// -----------------------------------------------------------------------

#[tokio::test]
async fn empty_order_is_rejected_without_downloads() {
    let source = Arc::new(ScriptedSource::new().with_order(order_doc("Empty", &[])));
    let dl = downloader(source.clone(), &test_config());

    let err = dl
        .run(&order_id(), &DownloadParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::OrderEmpty { .. }));
    assert_eq!(source.total_asset_calls(), 0);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let source = Arc::new(ScriptedSource::new());
    let dl = downloader(source.clone(), &test_config());

    let err = dl
        .run(&order_id(), &DownloadParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::OrderNotFound { .. }));
}

#[tokio::test]
async fn oversized_order_is_rejected_before_any_download() {
    let assets: Vec<(String, String)> = (0..4)
        .map(|i| (format!("id-{i}"), format!("n-{i}.jpg")))
        .collect();
    let borrowed: Vec<(&str, &str)> = assets
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();
    let source = Arc::new(ScriptedSource::new().with_order(order_doc("Big", &borrowed)));
    let mut config = test_config();
    config.batch.max_assets_per_order = 3;
    let dl = downloader(source.clone(), &config);

    let err = dl
        .run(&order_id(), &DownloadParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TooManyAssets { count: 4, limit: 3 }));
    assert_eq!(source.total_asset_calls(), 0);
}

#[tokio::test]
async fn invalid_quality_is_rejected_before_order_lookup() {
    let source = Arc::new(ScriptedSource::new().with_order(order_doc("O", &[("a", "a")])));
    let dl = downloader(source.clone(), &test_config());
    let params = DownloadParams {
        quality: Some(0),
        ..Default::default()
    };

    let err = dl.run(&order_id(), &params).await.unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(source.order_calls(), 0);
}

// -----------------------------------------------------------------------
// Naming, concurrency, spill
// -----------------------------------------------------------------------

#[tokio::test]
async fn colliding_names_all_survive_with_suffixes() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_order(order_doc(
                "Order",
                &[("a", "room.jpg"), ("b", "room.jpg"), ("c", "room.jpg")],
            ))
            .delay("a", Duration::from_millis(1))
            .delay("b", Duration::from_millis(20))
            .delay("c", Duration::from_millis(40)),
    );
    let dl = downloader(source, &test_config());

    let batch = dl.run(&order_id(), &DownloadParams::default()).await.unwrap();
    let entries = archive_entries(batch.body);

    assert_eq!(entries.len(), 3);
    assert_eq!(entries["room.jpg"], b"a");
    assert_eq!(entries["room_1.jpg"], b"b");
    assert_eq!(entries["room_2.jpg"], b"c");
}

#[tokio::test]
async fn in_flight_downloads_never_exceed_permits() {
    let mut source = ScriptedSource::new();
    let mut assets = Vec::new();
    for i in 0..12 {
        let id = format!("id-{i}");
        source = source.delay(&id, Duration::from_millis(10));
        assets.push((id.clone(), format!("{id}.jpg")));
    }
    let borrowed: Vec<(&str, &str)> = assets
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();
    let source = Arc::new(source.with_order(order_doc("Order", &borrowed)));
    let mut config = test_config();
    config.batch.max_concurrent_downloads = 3;
    let dl = downloader(source.clone(), &config);

    let batch = dl.run(&order_id(), &DownloadParams::default()).await.unwrap();

    assert_eq!(batch.counts.downloaded, 12);
    assert_eq!(source.peak_in_flight(), 3);
}

#[tokio::test]
async fn large_batch_spills_to_disk() {
    let big = vec![9u8; 4096];
    let source = Arc::new(
        ScriptedSource::new()
            .with_order(order_doc("Order", &[("a", "a"), ("b", "b")]))
            .script("a", vec![Ok(big.clone())])
            .script("b", vec![Ok(big.clone())]),
    );
    let mut config = test_config();
    config.batch.spill_threshold_bytes = 1024;
    let dl = downloader(source, &config);

    let batch = dl.run(&order_id(), &DownloadParams::default()).await.unwrap();

    assert!(batch.body.is_on_disk());
    let entries = archive_entries(batch.body);
    assert_eq!(entries["a.jpg"], big);
    assert_eq!(entries["b.jpg"], big);
}

#[tokio::test]
async fn extension_comes_from_content_type() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_order(order_doc("Order", &[("a", "front.jpg"), ("b", "back")]))
            .content_type("a", "image/png"),
    );
    let dl = downloader(source, &test_config());
    let params = DownloadParams {
        format: ImageFormat::Webp,
        ..Default::default()
    };

    let batch = dl.run(&order_id(), &params).await.unwrap();
    let entries = archive_entries(batch.body);

    assert!(entries.contains_key("front.png"));
    assert!(entries.contains_key("back.webp"));
}

#[tokio::test]
async fn rerunning_a_batch_yields_the_same_entry_names() {
    let source = Arc::new(ScriptedSource::new().with_order(order_doc(
        "Order",
        &[("a", "x.jpg"), ("b", "y.jpg"), ("c", "z.jpg")],
    )));
    let dl = downloader(source, &test_config());

    let first = dl.run(&order_id(), &DownloadParams::default()).await.unwrap();
    let second = dl.run(&order_id(), &DownloadParams::default()).await.unwrap();

    assert_eq!(first.counts.downloaded, second.counts.downloaded);
    let first: HashSet<_> = archive_entries(first.body).into_keys().collect();
    let second: HashSet<_> = archive_entries(second.body).into_keys().collect();
    assert_eq!(first, second);
}
