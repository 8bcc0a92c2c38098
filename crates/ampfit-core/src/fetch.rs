//! Fetching of external resources: stylesheets and images.
//!
//! The converter only talks to the [`Fetcher`] and [`ImageStats`] traits.
//! [`HttpFetcher`] and [`FileFetcher`] cover the usual cases and any
//! `Fn(&Url) -> Result<Vec<u8>, FetchError>` closure is a fetcher too.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// User-Agent header sent with HTTP requests.
const USER_AGENT: &str = concat!("ampfit/", env!("CARGO_PKG_VERSION"));

/// Default HTTP request timeout.
const TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from fetching or decoding a resource.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be created.
    #[error("failed to create HTTP client: {message}")]
    Client {
        /// Underlying error message.
        message: String,
    },

    /// The request failed before a response arrived.
    #[error("request to {url} failed: {message}")]
    Request {
        /// Requested URL.
        url: String,
        /// Underlying error message.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// A local file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The URL cannot be served by this fetcher.
    #[error("cannot fetch {url}: {reason}")]
    Unsupported {
        /// Requested URL.
        url: String,
        /// Why the URL was refused.
        reason: String,
    },

    /// Image data could not be decoded.
    #[error("failed to decode image {url}: {message}")]
    Decode {
        /// Image URL.
        url: String,
        /// Decoder message.
        message: String,
    },
}

// ────────────────────────────────────────────
// Fetchers
// ────────────────────────────────────────────

/// Blocking byte source for absolute URLs.
pub trait Fetcher: Send + Sync {
    /// Returns the body of the resource at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be retrieved.
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

impl<F> Fetcher for F
where
    F: Fn(&Url) -> Result<Vec<u8>, FetchError> + Send + Sync,
{
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self(url)
    }
}

/// Shared handle to a fetcher.
pub type FetcherRef = Arc<dyn Fetcher>;

/// Fetches over HTTP(S) with a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(TIMEOUT)
    }

    /// Creates a fetcher with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        debug!("GET {url}");
        let request_error = |e: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(request_error)
    }
}

/// Serves URL paths from a local directory, ignoring scheme and host.
///
/// `https://example.com/css/site.css` maps to `<root>/css/site.css`.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    /// Creates a fetcher rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn local_path(&self, url: &Url) -> Result<PathBuf, FetchError> {
        let relative = Path::new(url.path().trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FetchError::Unsupported {
                url: url.to_string(),
                reason: "path escapes the fetcher root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let path = self.local_path(url)?;
        debug!("reading {}", path.display());
        std::fs::read(&path).map_err(|e| FetchError::Io { path, source: e })
    }
}

// ────────────────────────────────────────────
// Image statistics
// ────────────────────────────────────────────

/// Final URL and pixel dimensions of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSize {
    /// URL to write into `src`; may differ from the requested one.
    pub url: Url,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Source of image metadata for `<amp-img>`.
pub trait ImageStats: Send + Sync {
    /// Returns the URL and dimensions of the image at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be fetched or decoded.
    fn image_size(&self, url: &Url) -> Result<ImageSize, FetchError>;

    /// Returns a `srcset` value for the image; empty means none.
    ///
    /// # Errors
    ///
    /// Returns an error if the srcset cannot be computed.
    fn image_srcset(&self, _url: &Url) -> Result<String, FetchError> {
        Ok(String::new())
    }
}

/// Shared handle to an image stats provider.
pub type ImageStatsRef = Arc<dyn ImageStats>;

/// Fetches images and reads their dimensions from the encoded header.
pub struct FetchingImageStats {
    fetcher: FetcherRef,
}

impl FetchingImageStats {
    /// Creates a provider that downloads through `fetcher`.
    #[must_use]
    pub fn new(fetcher: FetcherRef) -> Self {
        Self { fetcher }
    }
}

impl ImageStats for FetchingImageStats {
    fn image_size(&self, url: &Url) -> Result<ImageSize, FetchError> {
        let bytes = self.fetcher.fetch(url)?;
        let decode_error = |message: String| FetchError::Decode {
            url: url.to_string(),
            message,
        };
        let (width, height) = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| decode_error(e.to_string()))?
            .into_dimensions()
            .map_err(|e| decode_error(e.to_string()))?;
        debug!("{url}: {width}x{height}");
        Ok(ImageSize {
            url: url.clone(),
            width,
            height,
        })
    }
}

// ────────────────────────────────────────────
// URL helpers
// ────────────────────────────────────────────

/// Parses an attribute URL, accepting relative references.
///
/// Relative references are joined onto `file:///` so that host and path can
/// still be inspected. The flag is true for relative input.
///
/// # Errors
///
/// Returns an error if the value is not a URL even relative to a base.
pub fn parse_lenient(value: &str) -> Result<(Url, bool), url::ParseError> {
    match Url::parse(value) {
        Ok(url) => Ok((url, false)),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse("file:///")?;
            Ok((base.join(value)?, true))
        }
        Err(e) => Err(e),
    }
}

/// Parses the configured canonical URL, accepting a bare path such as `/`.
///
/// # Errors
///
/// Returns an error if the value is not a URL.
pub fn canonical_base(canonical: &str) -> Result<Url, url::ParseError> {
    parse_lenient(canonical).map(|(url, _)| url)
}

/// Resolves a resource reference found in the document.
///
/// Absolute references are kept. References starting with `/` resolve
/// against the canonical origin; other relative references resolve against
/// the canonical path treated as a directory.
///
/// # Errors
///
/// Returns an error if the reference cannot be joined.
pub fn resolve_resource_url(base: &Url, reference: &str) -> Result<Url, url::ParseError> {
    match Url::parse(reference) {
        Ok(url) => return Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {}
        Err(e) => return Err(e),
    }
    if reference.starts_with('/') {
        return base.join(reference);
    }
    let mut directory = base.clone();
    if !directory.path().ends_with('/') {
        let path = format!("{}/", directory.path());
        directory.set_path(&path);
    }
    directory.join(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/foo/bar").unwrap()
    }

    #[test]
    fn resolve_keeps_absolute() {
        let url = resolve_resource_url(&base(), "https://cdn.example.org/a.png").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/a.png");
    }

    #[test]
    fn resolve_root_relative_against_origin() {
        let url = resolve_resource_url(&base(), "/img/a.png").unwrap();
        assert_eq!(url.as_str(), "https://example.com/img/a.png");
    }

    #[test]
    fn resolve_relative_treats_path_as_directory() {
        let url = resolve_resource_url(&base(), "a.png").unwrap();
        assert_eq!(url.as_str(), "https://example.com/foo/bar/a.png");
    }

    #[test]
    fn canonical_base_accepts_path() {
        let url = canonical_base("/").unwrap();
        assert_eq!(url.as_str(), "file:///");
        assert!(url.host_str().is_none());
        assert_eq!(
            resolve_resource_url(&url, "a.png").unwrap().as_str(),
            "file:///a.png"
        );
    }

    #[test]
    fn parse_lenient_flags_relative() {
        let (url, relative) = parse_lenient("//cdn.example.org/x.js").unwrap();
        assert!(relative);
        assert_eq!(url.host_str(), Some("cdn.example.org"));

        let (_, relative) = parse_lenient("https://example.com").unwrap();
        assert!(!relative);

        assert!(parse_lenient("http://[::1").is_err());
    }

    #[test]
    fn closures_are_fetchers() {
        let fetcher = |url: &Url| -> Result<Vec<u8>, FetchError> { Ok(url.path().as_bytes().to_vec()) };
        let body = fetcher.fetch(&base()).unwrap();
        assert_eq!(body, b"/foo/bar");
    }

    #[test]
    fn file_fetcher_maps_url_path_below_root() {
        let fetcher = FileFetcher::new("/srv/site");
        let url = Url::parse("https://example.com/a/b.css").unwrap();
        assert_eq!(
            fetcher.local_path(&url).unwrap(),
            PathBuf::from("/srv/site/a/b.css")
        );
    }

    #[test]
    fn fetching_image_stats_reads_png_header() {
        let mut png = Vec::new();
        image::RgbaImage::new(100, 50)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let fetcher: FetcherRef =
            Arc::new(move |_: &Url| -> Result<Vec<u8>, FetchError> { Ok(png.clone()) });
        let stats = FetchingImageStats::new(fetcher);
        let size = stats.image_size(&base()).unwrap();
        assert_eq!((size.width, size.height), (100, 50));
        assert_eq!(stats.image_srcset(&base()).unwrap(), "");
    }

    #[test]
    fn undecodable_image_is_an_error() {
        let fetcher: FetcherRef =
            Arc::new(|_: &Url| -> Result<Vec<u8>, FetchError> { Ok(b"not an image".to_vec()) });
        let err = FetchingImageStats::new(fetcher).image_size(&base()).unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }
}
