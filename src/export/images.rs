//! Downloading post images for the static site.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::stream::{self, StreamExt};
use reqwest::header::REFERER;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::constants::{IMAGE_REFERER, IMAGE_USER_AGENT};

/// Directory name of downloaded images, relative to the export root.
pub const IMAGES_SUBDIR: &str = "images";

/// Suffix of an image file still being written.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Downloads distinct image URLs with at most `workers` requests in flight.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    images_dir: PathBuf,
    workers: usize,
}

impl ImageFetcher {
    /// Create a fetcher writing into `export_dir/images`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(export_dir: &Path, workers: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(IMAGE_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build image HTTP client")?;

        Ok(Self {
            client,
            images_dir: export_dir.join(IMAGES_SUBDIR),
            workers: workers.max(1),
        })
    }

    /// Download every distinct URL, returning URL → path relative to the
    /// export root. Failed downloads are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns an error if the images directory cannot be created.
    pub async fn materialize<I>(&self, urls: I) -> Result<HashMap<String, String>>
    where
        I: IntoIterator<Item = String>,
    {
        let distinct: BTreeSet<String> = urls.into_iter().collect();
        if distinct.is_empty() {
            return Ok(HashMap::new());
        }

        tokio::fs::create_dir_all(&self.images_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create images directory: {}",
                    self.images_dir.display()
                )
            })?;

        let total = distinct.len();
        debug!(total, workers = self.workers, "Downloading images");

        let results: Vec<(String, Result<String>)> = stream::iter(distinct)
            .map(|url| async move {
                let local = self.download(&url).await;
                (url, local)
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut mapping = HashMap::with_capacity(total);
        for (url, local) in results {
            match local {
                Ok(path) => {
                    mapping.insert(url, path);
                }
                Err(e) => warn!(%url, "Keeping remote image URL: {e:#}"),
            }
        }
        Ok(mapping)
    }

    async fn download(&self, url: &str) -> Result<String> {
        let file_name = image_file_name(url);
        let relative = format!("{IMAGES_SUBDIR}/{file_name}");
        let target = self.images_dir.join(&file_name);

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Ok(relative);
        }

        let response = self
            .client
            .get(url)
            .header(REFERER, IMAGE_REFERER)
            .send()
            .await
            .context("Image request failed")?;

        if !response.status().is_success() {
            bail!("Image download failed with status {}", response.status());
        }

        let bytes = response.bytes().await.context("Failed to read image body")?;

        // Only complete files may appear under the final name; it is reused as-is.
        let partial = self.images_dir.join(format!("{file_name}{PARTIAL_SUFFIX}"));
        if let Err(e) = write_then_rename(&partial, &target, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        Ok(relative)
    }
}

async fn write_then_rename(partial: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(partial, bytes)
        .await
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    tokio::fs::rename(partial, target)
        .await
        .with_context(|| format!("Failed to move image into place: {}", target.display()))
}

/// Stable file name for an image URL: a hash of the URL plus its extension.
#[must_use]
pub fn image_file_name(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("{}.{}", &digest[..32], image_extension(url))
}

fn image_extension(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            Path::new(parsed.path())
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase)
        })
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}
