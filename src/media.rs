//! Hosted-video resolution through the external media JSON endpoint.
//!
//! A media id found on a lecture page maps to a JSON document listing the
//! encodes the host offers. Resolution picks the largest mp4; anything else
//! (missing media, no mp4 encode) is a not-found condition the orchestrator
//! skips over.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Error, Resource, Result};

/// Default origin of the video-hosting JSON API.
pub const DEFAULT_MEDIA_BASE_URL: &str = "https://fast.wistia.com";

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// One downloadable encode of a hosted video.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoAsset {
    /// Direct asset URL.
    pub url: String,
    /// Asset size in bytes; used to pick the best encode.
    #[serde(default)]
    pub size: u64,
    /// Container extension (`mp4`, `m3u8`, ...).
    pub ext: Option<String>,
}

/// A resolved hosted video: the chosen asset plus its display name.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    /// The media identifier this was resolved from.
    pub id: String,
    /// Display name, used for the destination filename.
    pub name: String,
    /// The highest-resolution mp4 encode.
    pub video: VideoAsset,
}

#[derive(Debug, Deserialize)]
struct MediaDocument {
    media: Option<MediaBody>,
}

#[derive(Debug, Deserialize)]
struct MediaBody {
    name: Option<String>,
    #[serde(default)]
    assets: Vec<VideoAsset>,
}

/// Resolves media ids against the video host's unauthenticated JSON API.
#[derive(Debug, Clone)]
pub struct MediaResolver {
    client: Client,
    base: Url,
}

impl Default for MediaResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaResolver {
    /// Creates a resolver against [`DEFAULT_MEDIA_BASE_URL`].
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let base = Url::parse(DEFAULT_MEDIA_BASE_URL).expect("static URL");
        Self::with_base_url(base)
    }

    /// Creates a resolver against a custom endpoint origin.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_base_url(base: Url) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client, base }
    }

    /// Resolves a media id into the largest-mp4 asset descriptor.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the media document has no assets or no mp4
    /// encode, [`Error::Request`]/[`Error::Parse`] for transport and decode
    /// failures.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve(&self, media_id: &str) -> Result<MediaInfo> {
        let url = self
            .base
            .join(&format!("/embed/medias/{media_id}.json"))
            .map_err(|_| Error::invalid_url(media_id))?;
        let body = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::request(url.as_str(), e))?
            .text()
            .await
            .map_err(|e| Error::request(url.as_str(), e))?;
        let document: MediaDocument =
            serde_json::from_str(&body).map_err(|e| Error::parse("media info", e))?;

        let Some(media) = document.media else {
            return Err(Error::not_found(Resource::Media, media_id));
        };
        let Some(video) = best_mp4(&media.assets) else {
            return Err(Error::not_found(Resource::Media, media_id));
        };

        debug!(size = video.size, "selected mp4 asset");
        Ok(MediaInfo {
            id: media_id.to_string(),
            name: media.name.unwrap_or_else(|| media_id.to_string()),
            video: video.clone(),
        })
    }
}

/// Picks the mp4 asset with the largest size. Ties are broken arbitrarily;
/// practical inputs have distinct sizes.
fn best_mp4(assets: &[VideoAsset]) -> Option<&VideoAsset> {
    assets
        .iter()
        .filter(|asset| asset.ext.as_deref() == Some("mp4"))
        .max_by_key(|asset| asset.size)
}
