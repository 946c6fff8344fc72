//! Writes generated images and their metadata.

use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::catalog::Catalog;
use crate::constants::{FILENAME_PREFIX, IMAGE_EXTENSION};
use crate::db::entities::images;
use crate::error::ImagegenError;
use crate::gemini::GeneratedImage;

/// Owns the image directory and the metadata table. Every write goes through
/// `write_lock`, so a save and a delete never interleave.
#[derive(Debug)]
pub struct ImageStore {
    db: DatabaseConnection,
    image_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl ImageStore {
    /// Creates a store over `image_dir`, which is created on first save.
    pub fn new(db: DatabaseConnection, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            image_dir: image_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Where the images live
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Full path of `filename` inside the image directory
    pub fn image_path(&self, filename: &str) -> PathBuf {
        self.image_dir.join(filename)
    }

    /// A read-only view over the same directory and table
    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.db.clone(), self.image_dir.clone())
    }

    /// Writes the image and records one metadata row for it.
    ///
    /// Never overwrites an existing file. If the row can't be written the
    /// file is removed again.
    #[instrument(skip_all, fields(filename = %image.filename))]
    pub async fn save(
        &self,
        image: &GeneratedImage,
        prompt: &str,
    ) -> Result<images::Model, ImagegenError> {
        if !is_valid_filename(&image.filename) {
            return Err(ImagegenError::BadRequest(format!(
                "Invalid filename {}",
                image.filename
            )));
        }
        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.image_dir).await?;
        let path = self.image_path(&image.filename);
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(ImagegenError::InternalServerError(format!(
                    "{} already exists",
                    path.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };
        file.write_all(&image.bytes).await?;
        file.flush().await?;
        drop(file);

        let (width, height) = probe_dimensions(&image.bytes);
        let created: DateTime<Local> = match tokio::fs::metadata(&path)
            .await
            .and_then(|metadata| metadata.modified())
        {
            Ok(modified) => modified.into(),
            Err(_) => Local::now(),
        };

        let record = images::ActiveModel {
            filename: Set(image.filename.clone()),
            prompt: Set(prompt.to_string()),
            width: Set(i32::try_from(width).unwrap_or_default()),
            height: Set(i32::try_from(height).unwrap_or_default()),
            file_size: Set(i64::try_from(image.bytes.len()).unwrap_or_default()),
            created_time: Set(format_created_time(&created)),
            created_timestamp: Set(epoch_seconds(&created)),
            ..Default::default()
        };

        match record.insert(&self.db).await {
            Ok(model) => {
                info!(
                    "Saved {} ({}x{}, {} bytes)",
                    model.filename, model.width, model.height, model.file_size
                );
                Ok(model)
            }
            Err(err) => {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!(
                        "Failed to remove {} after metadata error: {}",
                        path.display(),
                        remove_err
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Removes the metadata row, then the file.
    ///
    /// Not found when neither exists. A row without a file is cleaned up and
    /// counts as success; a file that can't be removed after its row has gone
    /// is a [`ImagegenError::PartialDelete`].
    #[instrument(skip(self))]
    pub async fn delete(&self, filename: &str) -> Result<(), ImagegenError> {
        if !is_valid_filename(filename) {
            return Err(ImagegenError::BadRequest(format!(
                "Invalid filename {filename}"
            )));
        }
        let _guard = self.write_lock.lock().await;

        let path = self.image_path(filename);
        let file_exists = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.is_file(),
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => return Err(err.into()),
        };

        let removed_rows = images::Entity::delete_by_filename(&self.db, filename).await?;

        if !file_exists {
            if removed_rows == 0 {
                return Err(ImagegenError::NotFound(filename.to_string()));
            }
            warn!("Removed metadata for {} which had no file", filename);
            return Ok(());
        }

        if let Err(err) = tokio::fs::remove_file(&path).await
            && err.kind() != ErrorKind::NotFound
        {
            return Err(ImagegenError::PartialDelete(format!(
                "metadata for {filename} was removed but the file was not: {err}"
            )));
        }

        info!("Deleted {} ({} metadata rows)", filename, removed_rows);
        Ok(())
    }
}

/// `gemini_generated_<YYYYmmdd_HHMMSS>_<8 hex>.png`
pub fn generate_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_{}_{:08x}.{}",
        FILENAME_PREFIX,
        now.format("%Y%m%d_%H%M%S"),
        rand::random::<u32>(),
        IMAGE_EXTENSION
    )
}

/// Plain `[A-Za-z0-9_.-]` name ending in `.png`, not starting with a dot.
pub fn is_valid_filename(filename: &str) -> bool {
    let Some(stem) = filename.strip_suffix(&format!(".{IMAGE_EXTENSION}")) else {
        return false;
    };
    !stem.is_empty()
        && !filename.starts_with('.')
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Reads width and height from the image header, `(0, 0)` if it can't.
pub fn probe_dimensions(bytes: &[u8]) -> (u32, u32) {
    let dimensions = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::from)
        .and_then(|reader| reader.into_dimensions());
    match dimensions {
        Ok(dimensions) => dimensions,
        Err(err) => {
            debug!("Failed to read image dimensions: {}", err);
            (0, 0)
        }
    }
}

fn format_created_time(created: &DateTime<Local>) -> String {
    created.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn epoch_seconds(created: &DateTime<Local>) -> f64 {
    created.timestamp_micros() as f64 / 1_000_000.0
}
