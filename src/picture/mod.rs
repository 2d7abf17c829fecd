use std::path::{Path, PathBuf};
use futures::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::global::error::AppError;
use crate::imdb::model::Poster;
use crate::imdb::source::title_id_from_url;

pub mod progress;

use progress::DownloadProgress;

/// Create the target directory and any missing parents
pub async fn ensure_target_dir(target_dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(target_dir)
        .await
        .map_err(|source| AppError::TargetDirectory {
            path: target_dir.to_path_buf(),
            source,
        })
}

/// `<title id>-<index, two digits>.<extension of the image URL>`
pub fn poster_filename(poster: &Poster) -> String {
    let title_id = title_id_from_url(&poster.movie_url).unwrap_or_else(|| "poster".to_string());
    format!("{}-{:02}{}", title_id, poster.index, extension_from_url(&poster.image_url))
}

/// Extension of the last path segment including the dot, or empty
pub fn extension_from_url(image_url: &str) -> String {
    let path = match url::Url::parse(image_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => image_url.to_string(),
    };

    let name = path.rsplit('/').next().unwrap_or_default();
    name.rfind('.')
        .map(|index| name[index..].to_string())
        .unwrap_or_default()
}

/// Stream `image_url` into `target_dir/filename`.
/// A partially written file is removed on failure; a file this call never
/// created is left alone.
pub async fn download(
    client: &Client,
    image_url: &str,
    target_dir: &Path,
    filename: &str,
    progress: &dyn DownloadProgress,
) -> Result<PathBuf, AppError> {
    ensure_target_dir(target_dir).await?;
    let file_path = target_dir.join(filename);

    progress.start(image_url);

    let written = write_to_file(client, image_url, &file_path, progress).await;
    match written {
        Ok(size) => {
            progress.done(image_url);
            info!(url = %image_url, path = ?file_path, size, "Poster saved");
            Ok(file_path)
        }
        Err(WriteFailure { reason, created }) => {
            error!(url = %image_url, path = ?file_path, error = %reason, "Poster download failed");
            if created && fs::remove_file(&file_path).await.is_ok() {
                debug!(path = ?file_path, "Removed partial file");
            }
            Err(AppError::Download {
                url: image_url.to_string(),
                reason,
            })
        }
    }
}

/// Why a write failed and whether `file_path` was created by it
struct WriteFailure {
    reason: String,
    created: bool,
}

impl WriteFailure {
    fn before_create(reason: String) -> Self {
        Self { reason, created: false }
    }

    fn after_create(reason: String) -> Self {
        Self { reason, created: true }
    }
}

async fn write_to_file(
    client: &Client,
    image_url: &str,
    file_path: &Path,
    progress: &dyn DownloadProgress,
) -> Result<u64, WriteFailure> {
    let response = client
        .get(image_url)
        .send()
        .await
        .map_err(|e| WriteFailure::before_create(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(WriteFailure::before_create(format!("HTTP {}", response.status())));
    }

    let total_bytes = response.content_length().unwrap_or(0);

    let mut file = fs::File::create(file_path)
        .await
        .map_err(|e| WriteFailure::before_create(format!("failed to create file: {e}")))?;

    let mut stream = response.bytes_stream();
    let mut bytes_read: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| WriteFailure::after_create(format!("failed to read body: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| WriteFailure::after_create(format!("failed to write file: {e}")))?;

        bytes_read += chunk.len() as u64;
        let fraction = if total_bytes > 0 {
            bytes_read as f64 / total_bytes as f64
        } else {
            0.0
        };
        progress.update(image_url, fraction, bytes_read, total_bytes);
    }

    file.flush()
        .await
        .map_err(|e| WriteFailure::after_create(format!("failed to flush file: {e}")))?;

    Ok(bytes_read)
}
