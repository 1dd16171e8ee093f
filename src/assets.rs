//! Presigned asset retrieval and single-asset download

use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_LENGTH;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ConsoleError, ConsoleResult, NetworkErrorKind};
use crate::metrics::HttpRequestMetrics;
use crate::session::ConsoleSession;
use crate::validate::validate_uuid;

/// Presigned asset hrefs of one ordered product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresignedAssets {
    /// STAC id of the product
    pub id: String,
    /// Asset key → asset object with presigned `href`
    #[serde(default)]
    pub assets: Map<String, Value>,
}

impl PresignedAssets {
    /// Presigned href of asset `key`
    pub fn href(&self, key: &str) -> Option<&str> {
        self.assets.get(key)?.get("href")?.as_str()
    }
}

/// Presigned assets of all products in `order_id`, optionally only `stac_ids`
pub async fn get_presigned_assets(
    session: &dyn ConsoleSession,
    order_id: &str,
    stac_ids: Option<&[String]>,
) -> ConsoleResult<Vec<PresignedAssets>> {
    validate_uuid(order_id)?;
    info!("getting presigned assets for order {}", order_id);

    let value = session
        .get_json(&format!("/orders/{order_id}/download"), &[])
        .await?;
    let products: Vec<PresignedAssets> = serde_json::from_value(value)?;

    Ok(match stac_ids {
        Some(ids) if !ids.is_empty() => products
            .into_iter()
            .filter(|p| ids.contains(&p.id))
            .collect(),
        _ => products,
    })
}

/// Streams presigned assets to disk
#[derive(Clone)]
pub struct AssetDownloader {
    client: Client,
}

impl AssetDownloader {
    /// Downloader honouring the connect timeout of `config`
    ///
    /// No overall request timeout is applied; assets can be large.
    pub fn new(config: &ClientConfig) -> ConsoleResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ConsoleError::Network {
                kind: NetworkErrorKind::Other,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Size in bytes of the asset behind `url`, from a `HEAD` request
    pub async fn bytesize(&self, url: &str) -> ConsoleResult<u64> {
        let timer = HttpRequestMetrics::start("HEAD");
        let response = self.client.head(url).send().await.map_err(|e| {
            timer.record_network_error();
            ConsoleError::from_reqwest(&e)
        })?;
        timer.record_complete(response.status().as_u16());

        if !response.status().is_success() {
            return Err(ConsoleError::Http {
                status: response.status().as_u16(),
                message: format!("HEAD {url} failed"),
            });
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ConsoleError::Parse(format!("no content length for {url}")))
    }

    /// Download `url` to `local_path`
    ///
    /// An existing file is kept unless `override_existing` is set. Data is
    /// streamed into a `.part` file that is renamed once complete.
    pub async fn download(
        &self,
        url: &str,
        local_path: &Path,
        override_existing: bool,
        show_progress: bool,
    ) -> ConsoleResult<PathBuf> {
        if local_path.exists() && !override_existing {
            info!(
                "{} already exists ... skipping download (set override to replace)",
                local_path.display()
            );
            return Ok(local_path.to_path_buf());
        }

        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let timer = HttpRequestMetrics::start("GET");
        let response = self.client.get(url).send().await.map_err(|e| {
            timer.record_network_error();
            ConsoleError::from_reqwest(&e)
        })?;
        let status = response.status();
        timer.record_complete(status.as_u16());
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConsoleError::from_error_body(status.as_u16(), &body));
        }

        let progress = progress_bar(response.content_length(), local_path, show_progress);
        let part_path = part_path(local_path);
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ConsoleError::from_reqwest(&e)));
        let written = match write_part(chunks, &part_path, &progress).await {
            Ok(written) => written,
            Err(e) => {
                progress.abandon();
                return Err(e);
            }
        };

        tokio::fs::rename(&part_path, local_path).await?;
        progress.finish_and_clear();

        debug!("wrote {} bytes to {}", written, local_path.display());
        info!("successfully downloaded to {}", local_path.display());
        Ok(local_path.to_path_buf())
    }
}

/// Write `chunks` to `part_path`; the partial file is removed when a chunk or write fails
async fn write_part<S, B>(
    chunks: S,
    part_path: &Path,
    progress: &ProgressBar,
) -> ConsoleResult<u64>
where
    S: Stream<Item = ConsoleResult<B>>,
    B: AsRef<[u8]>,
{
    let result = copy_chunks(chunks, part_path, progress).await;
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(part_path).await {
            warn!("failed to remove {}: {}", part_path.display(), e);
        }
    }
    result
}

async fn copy_chunks<S, B>(
    chunks: S,
    part_path: &Path,
    progress: &ProgressBar,
) -> ConsoleResult<u64>
where
    S: Stream<Item = ConsoleResult<B>>,
    B: AsRef<[u8]>,
{
    futures_util::pin_mut!(chunks);
    let mut file = tokio::fs::File::create(part_path).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        file.write_all(chunk.as_ref()).await?;
        written += chunk.as_ref().len() as u64;
        progress.set_position(written);
    }
    file.flush().await?;
    Ok(written)
}

fn part_path(local_path: &Path) -> PathBuf {
    let mut name = local_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    local_path.with_file_name(name)
}

fn progress_bar(total: Option<u64>, local_path: &Path, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total.unwrap_or(0));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    let name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    pb.set_message(name);
    pb
}
