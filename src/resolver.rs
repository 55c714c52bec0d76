//! Order resolution: upstream order record to normalized asset references

use crate::error::{Error, Result};
use crate::types::{AssetReference, OrderId};
use crate::upstream::AssetSource;
use serde_json::Value;

/// An order ready for batch download
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedOrder {
    /// The order identifier
    pub order_id: OrderId,
    /// Display name of the order (falls back to the order id)
    pub name: String,
    /// Normalized asset references, in upstream order
    pub references: Vec<AssetReference>,
}

/// Fetch an order and normalize its asset list
///
/// Fails with [`Error::OrderEmpty`] when no usable reference remains and with
/// [`Error::TooManyAssets`] when the order exceeds `max_assets`.
pub async fn resolve_order(
    source: &dyn AssetSource,
    order_id: &OrderId,
    dev_mode: bool,
    max_assets: usize,
) -> Result<ResolvedOrder> {
    let document = source.fetch_order(order_id, dev_mode).await?;
    let order = normalize_order(order_id, &document)?;

    if order.references.len() > max_assets {
        return Err(Error::TooManyAssets {
            count: order.references.len(),
            limit: max_assets,
        });
    }

    tracing::info!(
        order_id = %order_id,
        order_name = %order.name,
        assets = order.references.len(),
        "order resolved, starting downloads"
    );
    Ok(order)
}

/// Normalize a raw order document
///
/// Each entry of `images` may name its identifier `image_id` or `id` and its display
/// name `image_name` or `name`. Entries without an identifier are dropped.
pub fn normalize_order(order_id: &OrderId, document: &Value) -> Result<ResolvedOrder> {
    let name = string_field(document, &["name"]).unwrap_or_else(|| order_id.to_string());

    let entries = document
        .get("images")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let references: Vec<AssetReference> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let reference = normalize_entry(entry);
            if reference.is_none() {
                tracing::warn!(
                    order_id = %order_id,
                    index,
                    "dropping order entry without an image identifier"
                );
            }
            reference
        })
        .collect();

    if references.is_empty() {
        return Err(Error::OrderEmpty {
            order_id: order_id.to_string(),
            name,
        });
    }

    Ok(ResolvedOrder {
        order_id: order_id.clone(),
        name,
        references,
    })
}

fn normalize_entry(entry: &Value) -> Option<AssetReference> {
    let id = string_field(entry, &["image_id", "id"])?;
    let name = string_field(entry, &["image_name", "name"]).unwrap_or_else(|| id.clone());
    Some(AssetReference { id, name })
}

/// First non-empty value among `keys`, accepting strings and numbers
fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
