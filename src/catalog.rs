//! Read side: what is on disk, what is in the table, and where they disagree.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::debug;

use crate::db::entities::images;
use crate::error::ImagegenError;
use crate::store::is_valid_filename;

/// One image as shown in the gallery.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// file name inside the image directory
    pub filename: String,
    /// URL the image is served from
    pub path: String,
    /// bytes on disk
    pub size: u64,
    /// file modification time, fractional unix seconds
    pub created: f64,
    /// pixels, 0 when unreadable
    pub width: u32,
    /// pixels, 0 when unreadable
    pub height: u32,
    /// stored prompt, or the filename when there is no row
    pub prompt: String,
}

/// Where the directory and the metadata table disagree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// files with no metadata row
    pub orphan_files: Vec<String>,
    /// metadata rows with no file
    pub dangling_records: Vec<String>,
}

impl Reconciliation {
    /// True when every file has a row and every row has a file
    pub fn is_consistent(&self) -> bool {
        self.orphan_files.is_empty() && self.dangling_records.is_empty()
    }
}

/// Read-only view over the image directory and the metadata table.
#[derive(Clone, Debug)]
pub struct Catalog {
    db: DatabaseConnection,
    image_dir: PathBuf,
}

impl Catalog {
    /// Builds a catalog over `image_dir`
    pub fn new(db: DatabaseConnection, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            image_dir: image_dir.into(),
        }
    }

    /// Images on disk joined with their prompts, newest file first.
    pub async fn list(&self) -> Result<Vec<CatalogEntry>, ImagegenError> {
        let prompts = images::Entity::prompts_by_filename(&self.db).await?;

        let mut entries = Vec::new();
        for filename in list_image_files(&self.image_dir).await? {
            let path = self.image_dir.join(&filename);
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(metadata) => metadata,
                // deleted between the directory scan and now
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            let created = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
                .map(|duration| duration.as_secs_f64())
                .unwrap_or_default();
            let (width, height) = read_dimensions(path).await;

            entries.push(CatalogEntry {
                path: format!("/image/{filename}"),
                size: metadata.len(),
                created,
                width,
                height,
                prompt: prompts
                    .get(&filename)
                    .cloned()
                    .unwrap_or_else(|| filename.clone()),
                filename,
            });
        }

        entries.sort_by(|a, b| b.created.total_cmp(&a.created));
        Ok(entries)
    }

    /// Every metadata row, newest `created_timestamp` first.
    pub async fn raw_metadata(&self) -> Result<Vec<images::Model>, ImagegenError> {
        Ok(images::Entity::newest_first(&self.db).await?)
    }

    /// Compares the directory scan with the table scan, keyed by filename.
    pub async fn reconcile(&self) -> Result<Reconciliation, ImagegenError> {
        let files: BTreeSet<String> = list_image_files(&self.image_dir)
            .await?
            .into_iter()
            .collect();
        let records: BTreeSet<String> = images::Entity::prompts_by_filename(&self.db)
            .await?
            .into_keys()
            .collect();

        let reconciliation = Reconciliation {
            orphan_files: files.difference(&records).cloned().collect(),
            dangling_records: records.difference(&files).cloned().collect(),
        };
        debug!("Reconciled catalog: {:?}", reconciliation);
        Ok(reconciliation)
    }
}

async fn read_dimensions(path: PathBuf) -> (u32, u32) {
    match tokio::task::spawn_blocking(move || image::image_dimensions(&path)).await {
        Ok(Ok(dimensions)) => dimensions,
        Ok(Err(err)) => {
            debug!("Failed to read image dimensions: {}", err);
            (0, 0)
        }
        Err(err) => {
            debug!("Dimension probe task failed: {}", err);
            (0, 0)
        }
    }
}

/// Servable image names in `image_dir`, sorted; empty if the directory is missing.
async fn list_image_files(image_dir: &Path) -> Result<Vec<String>, ImagegenError> {
    let mut entries = match tokio::fs::read_dir(image_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(ImagegenError::InternalServerError(err.to_string())),
    };

    let mut images = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        // same name rule as serving and deleting
        if let Some(name) = entry.file_name().to_str()
            && is_valid_filename(name)
        {
            images.push(name.to_string());
        }
    }
    images.sort();
    Ok(images)
}
