//! One-off move of images still hosted by the legacy provider into the bucket.

use std::time::Duration;

use sea_orm::{DatabaseConnection, DbErr};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::media::{ImageTarget, MediaError, ObjectStore};

const MEDIA_SEGMENT: &str = "/media/";

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("URL has no `/media/` path: {0}")]
    NoKey(String),

    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub migrated: usize,
    pub failed: usize,
}

/// Object key for a legacy URL: everything after `/media/`, query dropped.
pub fn legacy_key(url: &str) -> Option<String> {
    let (_, rest) = url.split_once(MEDIA_SEGMENT)?;
    let key = rest.split(['?', '#']).next().unwrap_or_default();
    (!key.is_empty()).then(|| key.to_string())
}

pub fn content_type_for(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

async fn migrate_row(
    db: &DatabaseConnection,
    store: &dyn ObjectStore,
    http: &reqwest::Client,
    target: ImageTarget,
    id: Uuid,
    url: &str,
) -> Result<String, MigrateError> {
    let key = legacy_key(url).ok_or_else(|| MigrateError::NoKey(url.to_string()))?;
    let bytes = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    store
        .put(&key, bytes.to_vec(), content_type_for(&key))
        .await?;
    let new_url = store.urls().url_for(&key);
    target.rewrite_url(db, id, &new_url).await?;
    Ok(new_url)
}

/// Walks every migrated column and moves each matching image. A failed row is
/// logged and skipped. Returns one summary per column.
pub async fn run(
    db: &DatabaseConnection,
    store: &dyn ObjectStore,
    marker: &str,
    delay: Duration,
) -> anyhow::Result<Vec<(ImageTarget, Summary)>> {
    let http = reqwest::Client::new();
    let mut report = Vec::new();

    for target in ImageTarget::MIGRATED {
        let rows = target.rows_matching(db, marker).await?;
        info!(
            table = target.table(),
            column = target.column(),
            rows = rows.len(),
            "migrating images"
        );

        let mut summary = Summary::default();
        for (id, url) in rows {
            match migrate_row(db, store, &http, target, id, &url).await {
                Ok(new_url) => {
                    summary.migrated += 1;
                    info!(table = target.table(), %id, %new_url, "image migrated");
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(table = target.table(), %id, %url, %err, "image migration failed");
                }
            }
            tokio::time::sleep(delay).await;
        }

        if summary.failed > 0 {
            warn!(
                table = target.table(),
                migrated = summary.migrated,
                failed = summary.failed,
                "table finished with failures"
            );
        } else {
            info!(
                table = target.table(),
                migrated = summary.migrated,
                "table finished"
            );
        }
        report.push((target, summary));
    }

    Ok(report)
}
