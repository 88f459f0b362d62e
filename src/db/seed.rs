//! One-shot import of scraped catalog records into an empty catalog.

use std::path::Path;

use serde_json::Value;

use super::{DocumentStore, TANKS};
use crate::errors::AppError;
use crate::models::{strip_identifiers, CatalogRecord};

/// Import a JSON array of records when the catalog is empty.
///
/// Returns the number of inserted records. Entries that are not objects or
/// break the armament invariant are skipped with a warning.
pub async fn import_seed(store: &DocumentStore, path: &Path) -> Result<usize, AppError> {
    if store.count(TANKS).await? > 0 {
        tracing::info!("Catalog already populated, skipping seed import");
        return Ok(0);
    }

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Internal(format!("Cannot read seed file {:?}: {}", path, e)))?;
    let entries: Vec<Value> = serde_json::from_str(&raw)?;

    let mut inserted = 0;
    for (index, entry) in entries.into_iter().enumerate() {
        let Value::Object(body) = entry else {
            tracing::warn!("Seed entry {} is not an object, skipping", index);
            continue;
        };
        let body = strip_identifiers(body);
        if let Err(e) = CatalogRecord::validate_document(&body) {
            tracing::warn!("Seed entry {} rejected: {}", index, e);
            continue;
        }
        store.insert(TANKS, &body).await?;
        inserted += 1;
    }

    tracing::info!("Imported {} catalog records from {:?}", inserted, path);
    Ok(inserted)
}
