//! Rate-limited HTTP client with a flat file page cache
//!
//! Every series page is stored under `<cache>/wiki/<title>` next to a
//! `<title>_date` file holding the server's `Last-Modified` value. Later runs
//! revalidate with `If-Modified-Since` and reuse the cached body on `304`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderValue, IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::StatusCode;
use tokio::fs;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};

/// User-Agent sent with every request
const DEFAULT_USER_AGENT: &str = concat!("wikitrack/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retry attempts for transient errors
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Cache subdirectory for wiki pages
const WIKI_CACHE_DIR: &str = "wiki";

/// Suffix of the file holding a page's `Last-Modified` value
const DATE_SUFFIX: &str = "_date";

/// Where page documents come from.
///
/// `key` identifies the document locally (the series title) and `url` is
/// where it lives on the network.
#[allow(async_fn_in_trait)]
pub trait DocumentSource {
    async fn fetch_document(&self, key: &str, url: &str) -> Result<String>;
}

/// Rate limiter to control request frequency
///
/// Ensures that requests are spaced at least `min_interval` apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// # Example
    /// ```
    /// use wikitrack_core::client::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(2.0);
    /// assert_eq!(limiter.min_interval().as_millis(), 500);
    /// ```
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = Duration::from_secs_f64(1.0 / requests_per_second);
        let now = Instant::now();
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(now.checked_sub(min_interval).unwrap_or(now))),
        }
    }

    /// Wait until the next request may be sent.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();

        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }

        *last = Instant::now();
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Configuration for the HTTP side of [`WikiClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum requests per second (default: 2.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Root of the page cache
    pub cache_dir: PathBuf,
    /// Serve cached pages without revalidation
    pub offline: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            timeout_secs: 30,
            cache_dir: PathBuf::from("cache"),
            offline: false,
        }
    }
}

impl From<&TrackerConfig> for ClientConfig {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            requests_per_second: config.requests_per_second,
            timeout_secs: config.timeout_secs,
            cache_dir: config.cache_dir.clone(),
            offline: config.offline,
        }
    }
}

/// Result of a single (possibly conditional) GET.
#[derive(Debug)]
enum Fetched {
    Modified {
        body: String,
        last_modified: Option<String>,
    },
    NotModified,
}

/// Paths of one cached page.
struct CacheEntry {
    body: PathBuf,
    date: PathBuf,
}

impl CacheEntry {
    fn new(dir: &Path, key: &str) -> Self {
        let name = sanitize_key(key);
        Self {
            body: dir.join(&name),
            date: dir.join(format!("{}{}", name, DATE_SUFFIX)),
        }
    }

    fn exists(&self) -> bool {
        self.body.is_file() && self.date.is_file()
    }
}

/// Turn a series title into a safe file name.
pub fn sanitize_key(key: &str) -> String {
    let name: String = key
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.starts_with('.') {
        format!("_{}", name)
    } else {
        name
    }
}

/// Remove the whole page cache below `cache_dir`.
///
/// A missing directory is not an error.
pub async fn purge_cache(cache_dir: &Path) -> Result<()> {
    match fs::remove_dir_all(cache_dir).await {
        Ok(()) => {
            info!(dir = %cache_dir.display(), "Purged page cache");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// HTTP client for wiki pages with rate limiting, retries and a page cache
///
/// This client automatically:
/// - Limits request rate to avoid server overload
/// - Retries on transient errors (429, 5xx) with exponential backoff
/// - Revalidates cached pages with `If-Modified-Since`
pub struct WikiClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    cache_dir: PathBuf,
    offline: bool,
}

impl WikiClient {
    /// Create a client caching below `cache_dir`
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(ClientConfig {
            cache_dir: cache_dir.into(),
            ..ClientConfig::default()
        })
    }

    /// Create a new client with custom configuration
    ///
    /// # Arguments
    /// * `config` - Request rate, timeout, cache root and offline flag
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        if config.requests_per_second.is_nan() || config.requests_per_second <= 0.0 {
            return Err(TrackerError::Config(format!(
                "Requests per second must be positive, got [{}]",
                config.requests_per_second
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(config.requests_per_second),
            cache_dir: config.cache_dir.join(WIKI_CACHE_DIR),
            offline: config.offline,
        })
    }

    /// Directory holding the cached pages
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Fetch a page, going through the cache
    ///
    /// # Arguments
    /// * `key` - Series title, names the cache files
    /// * `url` - Page to request when the cache cannot be used
    ///
    /// # Errors
    /// - `TrackerError::HttpError` - Network or HTTP error after all retries
    /// - `TrackerError::RateLimited` - Server returned 429 after all retries
    /// - `TrackerError::NotFound` - Server returned 404
    /// - `TrackerError::Io` - The cache could not be read or written
    pub async fn fetch(&self, key: &str, url: &str) -> Result<String> {
        let entry = CacheEntry::new(&self.cache_dir, key);
        let cached = entry.exists();

        if cached && self.offline {
            debug!(title = key, "Serving cached page (offline)");
            return Ok(fs::read_to_string(&entry.body).await?);
        }
        if self.offline {
            info!(title = key, "No cached copy, fetching despite offline mode");
        }

        let since = if cached {
            let raw = fs::read_to_string(&entry.date).await?;
            Some(raw.trim().to_string())
        } else {
            None
        };

        info!(title = key, url, "Fetching");
        match self.fetch_with_retry(url, since.as_deref()).await? {
            Fetched::NotModified => {
                debug!(title = key, "Page not modified, using cache");
                Ok(fs::read_to_string(&entry.body).await?)
            }
            Fetched::Modified {
                body,
                last_modified,
            } => {
                self.store(key, &entry, &body, last_modified.as_deref())
                    .await?;
                Ok(body)
            }
        }
    }

    async fn store(
        &self,
        key: &str,
        entry: &CacheEntry,
        body: &str,
        last_modified: Option<&str>,
    ) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).await?;
        fs::write(&entry.body, body).await?;
        match last_modified {
            Some(value) => fs::write(&entry.date, value).await?,
            None => {
                warn!(title = key, "Last-Modified not available, page will be refetched next run");
                // A stale date would pair with the new body.
                if entry.date.is_file() {
                    fs::remove_file(&entry.date).await?;
                }
            }
        }
        Ok(())
    }

    async fn fetch_with_retry(&self, url: &str, since: Option<&str>) -> Result<Fetched> {
        let mut attempt = 0;
        loop {
            self.rate_limiter.acquire().await;

            let mut request = self.client.get(url);
            if let Some(value) = since.and_then(|v| HeaderValue::from_str(v).ok()) {
                request = request.header(IF_MODIFIED_SINCE, value);
            }
            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::NOT_MODIFIED && since.is_some() {
                return Ok(Fetched::NotModified);
            }

            if status.is_success() {
                let last_modified = response
                    .headers()
                    .get(LAST_MODIFIED)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                let body = response.text().await?;
                return Ok(Fetched::Modified {
                    body,
                    last_modified,
                });
            }

            // Handle 404 - Not Found (no retry)
            if status == StatusCode::NOT_FOUND {
                return Err(TrackerError::NotFound(url.to_string()));
            }

            let transient = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if transient && attempt < MAX_RETRIES {
                let delay = calculate_backoff_delay(attempt);
                warn!(url, %status, attempt, "Transient error, retrying in {:?}", delay);
                sleep(delay).await;
                attempt += 1;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(TrackerError::RateLimited);
            }

            return match response.error_for_status() {
                Err(err) => Err(err.into()),
                Ok(_) => Err(TrackerError::ParseError(format!(
                    "Unexpected status [{}] for [{}]",
                    status, url
                ))),
            };
        }
    }
}

impl DocumentSource for WikiClient {
    async fn fetch_document(&self, key: &str, url: &str) -> Result<String> {
        self.fetch(key, url).await
    }
}

/// Exponential backoff: 1s, 2s, 4s, ...
fn calculate_backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_RETRY_DELAY_MS * 2u64.pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LAST_MODIFIED_VALUE: &str = "Wed, 21 Oct 2015 07:28:00 GMT";

    fn client(dir: &Path, offline: bool) -> WikiClient {
        WikiClient::with_config(ClientConfig {
            requests_per_second: 100.0,
            timeout_secs: 5,
            cache_dir: dir.to_path_buf(),
            offline,
        })
        .unwrap()
    }

    fn seed_cache(dir: &Path, key: &str, body: &str) {
        let wiki = dir.join(WIKI_CACHE_DIR);
        std::fs::create_dir_all(&wiki).unwrap();
        let entry = CacheEntry::new(&wiki, key);
        std::fs::write(entry.body, body).unwrap();
        std::fs::write(entry.date, LAST_MODIFIED_VALUE).unwrap();
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(2.0);
        assert_eq!(limiter.min_interval(), Duration::from_millis(500));

        let limiter = RateLimiter::new(4.0);
        assert_eq!(limiter.min_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_backoff_delay_calculation() {
        assert_eq!(calculate_backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(calculate_backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(calculate_backoff_delay(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("Doctor Who"), "Doctor Who");
        assert_eq!(sanitize_key("Marvel's Agents/S.H.I.E.L.D."), "Marvel_s Agents_S.H.I.E.L.D.");
        assert_eq!(sanitize_key("../etc"), "_.._etc");
        assert_eq!(sanitize_key(""), "_");
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        let config = ClientConfig {
            requests_per_second: 0.0,
            ..ClientConfig::default()
        };
        assert!(WikiClient::with_config(config).is_err());
    }

    #[test]
    fn test_client_config_from_tracker_config() {
        let tracker = TrackerConfig {
            offline: true,
            cache_dir: PathBuf::from("/tmp/pages"),
            ..TrackerConfig::default()
        };
        let config = ClientConfig::from(&tracker);
        assert!(config.offline);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/pages"));
        assert_eq!(config.requests_per_second, 2.0);
    }

    #[tokio::test]
    async fn test_rate_limiter_acquire() {
        let limiter = RateLimiter::new(10.0);

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_fetch_stores_body_and_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Show"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html>fresh</html>")
                    .insert_header("Last-Modified", LAST_MODIFIED_VALUE),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client(dir.path(), false);
        let url = format!("{}/wiki/Show", server.uri());

        let body = client.fetch("Show", &url).await.unwrap();
        assert_eq!(body, "<html>fresh</html>");

        let wiki = dir.path().join(WIKI_CACHE_DIR);
        assert_eq!(std::fs::read_to_string(wiki.join("Show")).unwrap(), body);
        assert_eq!(
            std::fs::read_to_string(wiki.join("Show_date")).unwrap(),
            LAST_MODIFIED_VALUE
        );
    }

    #[tokio::test]
    async fn test_not_modified_serves_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Show"))
            .and(header_exists("If-Modified-Since"))
            .respond_with(ResponseTemplate::new(304))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        seed_cache(dir.path(), "Show", "<html>cached</html>");
        let client = client(dir.path(), false);

        let body = client
            .fetch("Show", &format!("{}/wiki/Show", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>cached</html>");
    }

    #[tokio::test]
    async fn test_modified_replaces_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Show"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html>new</html>")
                    .insert_header("Last-Modified", "Thu, 22 Oct 2015 07:28:00 GMT"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        seed_cache(dir.path(), "Show", "<html>old</html>");
        let client = client(dir.path(), false);

        let body = client
            .fetch("Show", &format!("{}/wiki/Show", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>new</html>");
        let date = std::fs::read_to_string(dir.path().join("wiki/Show_date")).unwrap();
        assert_eq!(date, "Thu, 22 Oct 2015 07:28:00 GMT");
    }

    #[tokio::test]
    async fn test_offline_uses_cache_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        seed_cache(dir.path(), "Show", "<html>cached</html>");
        let client = client(dir.path(), true);

        let body = client
            .fetch("Show", &format!("{}/wiki/Show", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>cached</html>");
    }

    #[tokio::test]
    async fn test_offline_without_cache_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Show"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>net</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client(dir.path(), true);

        let body = client
            .fetch("Show", &format!("{}/wiki/Show", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>net</html>");
    }

    #[tokio::test]
    async fn test_missing_last_modified_skips_date_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Show"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>x</html>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client(dir.path(), false);
        client
            .fetch("Show", &format!("{}/wiki/Show", server.uri()))
            .await
            .unwrap();

        let wiki = dir.path().join(WIKI_CACHE_DIR);
        assert!(wiki.join("Show").is_file());
        assert!(!wiki.join("Show_date").exists());
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client(dir.path(), false);
        let err = client
            .fetch("Missing", &format!("{}/wiki/Missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client(dir.path(), false);
        let err = client
            .fetch("Forbidden", &format!("{}/wiki/Forbidden", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::HttpError(_)));
    }

    #[tokio::test]
    async fn test_purge_cache() {
        let dir = tempfile::tempdir().unwrap();
        seed_cache(dir.path(), "Show", "<html></html>");

        purge_cache(dir.path()).await.unwrap();
        assert!(!dir.path().exists());

        // Purging again is fine.
        purge_cache(dir.path()).await.unwrap();
    }
}
