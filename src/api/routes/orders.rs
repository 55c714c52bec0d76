//! Order handlers: batch image download.

use super::ImagesQuery;
use crate::api::AppState;
use crate::batch::{ArchiveBody, BatchArchive};
use crate::error::Error;
use crate::types::{DownloadParams, OrderId};
use crate::utils::safe_download_name;
use axum::{
    body::Body,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use tokio_util::io::ReaderStream;

/// Response header carrying the number of resolved assets
pub const X_TOTAL_IMAGES: &str = "x-total-images";
/// Response header carrying the number of archived assets
pub const X_DOWNLOADED: &str = "x-downloaded";
/// Response header carrying the number of failed assets
pub const X_FAILED: &str = "x-failed";

/// GET /orders/:order_id/images - Download all enhanced images of an order as a ZIP
///
/// Images that fail are listed in a `_download_report.txt` entry and counted in
/// `X-Failed`. If every image fails, a 422 with per-image reasons is returned
/// instead of an archive.
#[utoipa::path(
    get,
    path = "/orders/{order_id}/images",
    tag = "orders",
    params(
        ("order_id" = String, Path, description = "Order ID (UUID)"),
        ImagesQuery
    ),
    responses(
        (status = 200, description = "ZIP archive of the downloaded images", content_type = "application/zip",
            headers(
                ("X-Total-Images" = usize, description = "Images in the order"),
                ("X-Downloaded" = usize, description = "Images in the archive"),
                ("X-Failed" = usize, description = "Images listed in the download report")
            )),
        (status = 400, description = "Malformed order ID or parameters", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 404, description = "Order not found or empty", body = crate::error::ApiError),
        (status = 413, description = "Order exceeds the per-order image limit", body = crate::error::ApiError),
        (status = 422, description = "No image could be downloaded", body = crate::error::ApiError),
        (status = 502, description = "Upstream API unreachable", body = crate::error::ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn download_order_images(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    query: Result<Query<ImagesQuery>, QueryRejection>,
) -> Result<Response, Error> {
    let order_id = OrderId::parse(&order_id)?;
    let Query(query) = query.map_err(|e| Error::InvalidInput(e.body_text()))?;
    let params = DownloadParams::from(query);

    let batch = state.downloader.run(&order_id, &params).await?;
    archive_response(batch)
}

fn archive_response(batch: BatchArchive) -> Result<Response, Error> {
    let BatchArchive {
        order_name,
        counts,
        body,
        ..
    } = batch;

    let disposition = format!(
        "attachment; filename=\"{}_images.zip\"",
        safe_download_name(&order_name)
    );
    let len = body.len();

    let body = match body {
        ArchiveBody::InMemory(bytes) => Body::from(bytes),
        ArchiveBody::OnDisk { file, .. } => {
            Body::from_stream(ReaderStream::new(tokio::fs::File::from_std(file)))
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/zip")
        .header(CONTENT_LENGTH, len)
        .header(CONTENT_DISPOSITION, disposition)
        .header(X_TOTAL_IMAGES, counts.total)
        .header(X_DOWNLOADED, counts.downloaded)
        .header(X_FAILED, counts.failed)
        .body(body)
        .map_err(|e| Error::ApiServerError(format!("failed to build archive response: {e}")))
}
