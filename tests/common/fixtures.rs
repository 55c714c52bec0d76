//! Upstream fixtures: order records, asset responses and archive readers

use super::ORDER_ID;
use std::io::{Cursor, Read};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Order record with `count` images named `photo-{i}.jpg` and ids `img-{i}`
pub fn order_record(name: &str, count: usize) -> serde_json::Value {
    let images: Vec<_> = (0..count)
        .map(|i| {
            serde_json::json!({
                "image_id": format!("img-{i}"),
                "image_name": format!("photo-{i}.jpg"),
            })
        })
        .collect();
    serde_json::json!({ "order_id": ORDER_ID, "name": name, "images": images })
}

/// Serve `record` for the fixture order
pub async fn mount_order(server: &MockServer, record: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/orders/{ORDER_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(record))
        .mount(server)
        .await;
}

/// Serve `template` for one asset's enhanced download
pub async fn mount_asset(server: &MockServer, asset_id: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/images/{asset_id}/enhanced")))
        .respond_with(template)
        .mount(server)
        .await;
}

/// A JPEG response whose body is `body`, optionally delayed
pub fn jpeg_response(body: &[u8], delay: Option<Duration>) -> ResponseTemplate {
    let template = ResponseTemplate::new(200)
        .insert_header("content-type", "image/jpeg")
        .set_body_bytes(body.to_vec());
    match delay {
        Some(delay) => template.set_delay(delay),
        None => template,
    }
}

/// Deterministic pseudo-random bytes that do not compress
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect()
}

/// Read every entry of an archive as (name, content), in archive order
#[allow(clippy::unwrap_used)]
pub fn read_entries(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (entry.name().to_string(), content)
        })
        .collect()
}
