//! Authenticated content fetcher.
//!
//! Wraps one HTTP client and the run's [`Session`], turning platform paths
//! into authenticated GET requests. Responses are returned as decoded text
//! or as a CSS-selector-queryable document for the catalog to pick apart.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::COOKIE;
use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

use crate::auth::Session;
use crate::error::{Error, Result};

/// The platform origin all relative paths resolve against.
pub const DEFAULT_BASE_URL: &str = "https://online.fastcampus.co.kr";

/// Connection timeout for content requests.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for content requests; generous because attachment pages can
/// be slow behind the authenticated proxy.
const READ_TIMEOUT_SECS: u64 = 120;

/// Performs authenticated GET requests against the platform.
///
/// Owns the run's [`Session`] exclusively; the session is read-only, so a
/// single `Fetcher` is shared freely across concurrent tasks.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base: Url,
    session: Session,
}

impl Fetcher {
    /// Creates a fetcher for the given origin and session.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(base: Url, session: Session) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            base,
            session,
        }
    }

    /// Returns the platform origin this fetcher resolves paths against.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolves `path` against the base origin.
    ///
    /// Standard URL resolution applies: absolute paths replace the path
    /// component, full URLs pass through unchanged.
    fn resolve(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|_| Error::invalid_url(path))
    }

    /// Fetches `path` with the session cookie attached and returns the
    /// decoded response body.
    ///
    /// The HTTP status is deliberately not translated into an error: the
    /// platform serves missing resources as HTTP 200 pages with a different
    /// structure, so existence is the catalog's structural check, not a
    /// status-code check.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] for an unresolvable path, [`Error::Request`]
    /// for network failures.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_raw(&self, path: &str) -> Result<String> {
        let url = self.resolve(path)?;
        debug!(url = %url, "fetching");
        let response = self
            .client
            .get(url.clone())
            .header(COOKIE, self.session.cookie_header())
            .send()
            .await
            .map_err(|e| Error::request(url.as_str(), e))?;
        response
            .text()
            .await
            .map_err(|e| Error::request(url.as_str(), e))
    }

    /// Fetches `path` and parses the body as an HTML document.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_raw`](Self::fetch_raw).
    pub async fn fetch(&self, path: &str) -> Result<Html> {
        let body = self.fetch_raw(path).await?;
        Ok(Html::parse_document(&body))
    }
}
