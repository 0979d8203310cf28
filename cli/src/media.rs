use crate::types::Track;
use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

const FALLBACK_FILE_NAME: &str = "media.bin";

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
}

impl Client {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }

    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("media request to {url} failed"))?;
        if !response.status().is_success() {
            bail!("media host responded with status {}", response.status());
        }
        let bytes = response.bytes().await.context("failed to read media body")?;
        Ok(bytes.to_vec())
    }
}

fn remote_url(source: &str) -> Option<Url> {
    Url::parse(source).ok().filter(|url| matches!(url.scheme(), "http" | "https"))
}

fn file_name_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string()
}

/// First 16 hex chars of the SHA-256 of the normalized URL.
fn cache_key(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    hex::encode(&digest[..8])
}

/// Where a remote media locator is cached: `<media_dir>/<key>-<file name>`.
pub fn cache_path(media_dir: &Path, source: &str) -> Option<PathBuf> {
    let url = remote_url(source)?;
    Some(media_dir.join(format!("{}-{}", cache_key(&url), file_name_for(&url))))
}

/// Resolves a track locator to a playable file. Remote locators only resolve
/// once they have been cached.
pub fn local_media_path(media_dir: &Path, source: &str) -> Option<PathBuf> {
    if let Some(path) = cache_path(media_dir, source) {
        return path.is_file().then_some(path);
    }
    match Url::parse(source) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
        _ => Some(PathBuf::from(source)),
    }
}

/// Downloads a remote locator into the cache unless it is already there.
/// Local locators are returned as-is.
pub async fn ensure_cached(client: &Client, media_dir: &Path, source: &str) -> Result<PathBuf> {
    let Some(target) = cache_path(media_dir, source) else {
        return local_media_path(media_dir, source)
            .ok_or_else(|| anyhow!("unable to resolve media locator {source}"));
    };
    if target.is_file() {
        debug!("media already cached at {}", target.display());
        return Ok(target);
    }
    let url = remote_url(source).ok_or_else(|| anyhow!("invalid media URL {source}"))?;
    let body = client.fetch(&url).await?;
    tokio::fs::create_dir_all(media_dir)
        .await
        .with_context(|| format!("failed to create media dir {}", media_dir.display()))?;
    let partial = target.with_extension(format!("{:08x}.part", rand::random::<u32>()));
    tokio::fs::write(&partial, &body)
        .await
        .with_context(|| format!("failed to write {}", partial.display()))?;
    tokio::fs::rename(&partial, &target)
        .await
        .with_context(|| format!("failed to move media into {}", target.display()))?;
    info!("cached {source} at {}", target.display());
    Ok(target)
}

/// Copies a track's media into `<download_dir>/<track id>/` next to a
/// `metadata.json` descriptor.
pub async fn download_track(
    client: &Client,
    media_dir: &Path,
    download_dir: &Path,
    track: Track,
) -> Result<PathBuf> {
    let source_path = ensure_cached(client, media_dir, &track.file_url).await?;
    let download_dir = download_dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        if !source_path.is_file() {
            return Err(anyhow!("media path does not exist: {}", source_path.display()));
        }
        let track_dir = download_dir.join(&track.id);
        fs::create_dir_all(&track_dir)
            .with_context(|| format!("failed to create track dir {}", track_dir.display()))?;

        let file_name = match remote_url(&track.file_url) {
            Some(url) => file_name_for(&url),
            None => source_path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string()),
        };
        let target_path = track_dir.join(file_name);
        if source_path != target_path {
            fs::copy(&source_path, &target_path)
                .with_context(|| format!("failed to copy media to {}", target_path.display()))?;
        }

        let metadata_path = track_dir.join("metadata.json");
        let metadata_json =
            serde_json::to_vec_pretty(&track).context("failed to encode track metadata")?;
        fs::write(&metadata_path, metadata_json)
            .with_context(|| format!("failed to write metadata at {}", metadata_path.display()))?;
        Ok(target_path)
    })
    .await
    .context("download task panicked")?
}
