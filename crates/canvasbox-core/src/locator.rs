//! # Locator Module
//!
//! Builds every content URL from the configured chapters base URL.
//!
//! The base URL may be absolute (`https://cdn.example/chapters`) or relative
//! to the hosting page (`/chapters`). Relative bases are resolved against the
//! page origin so callers never need to know which form was configured.

use url::Url;

// =============================================================================
// WELL-KNOWN PATHS
// =============================================================================

/// Event stream endpoint, relative to the base URL.
pub const SSE_PATH: &str = "/sse";

/// Prelude payload, relative to the base URL.
pub const PRELUDE_FILE_PATH: &str = "/index.json";

/// Script entry point of an instance.
pub const JAVASCRIPT_FILENAME: &str = "index.js";

/// Optional HTML fragment of an instance.
pub const HTML_FILENAME: &str = "index.html";

/// Optional stylesheet of an instance.
pub const STYLESHEET_FILENAME: &str = "index.css";

/// Optional markdown description of an instance.
pub const DESCRIPTION_FILENAME: &str = "index.md";

/// Optional preview image of an instance.
pub const PREVIEW_IMAGE_FILENAME: &str = "index.png";

/// Base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "/chapters";

/// Page origin used to resolve relative base URLs when none is configured.
pub const DEFAULT_ORIGIN: &str = "http://localhost";

// =============================================================================
// CONTENT LOCATOR
// =============================================================================

/// Base URL plus the page origin it is relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLocator {
    base_url: String,
    origin: Url,
}

impl ContentLocator {
    /// Create a locator for `base_url`, resolving relative forms against `origin`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, origin: Url) -> Self {
        Self {
            base_url: base_url.into(),
            origin,
        }
    }

    /// The configured base URL, verbatim.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Join `paths` with `/` and append them to the base URL.
    ///
    /// A trailing slash on the base and a leading slash on the joined path
    /// collapse into one.
    #[must_use]
    pub fn concatenate(&self, paths: &[&str]) -> String {
        let path = paths.join("/");
        match (self.base_url.ends_with('/'), path.strip_prefix('/')) {
            (true, Some(rest)) => format!("{}{}", self.base_url, rest),
            _ => format!("{}{}", self.base_url, path),
        }
    }

    /// Parse `raw` as an absolute URL, falling back to the page origin.
    pub fn resolve(&self, raw: &str) -> Result<Url, url::ParseError> {
        Url::parse(raw).or_else(|_| self.origin.join(raw))
    }

    /// Concatenate `paths` onto the base and resolve the result.
    pub fn url_for(&self, paths: &[&str]) -> Result<Url, url::ParseError> {
        self.resolve(&self.concatenate(paths))
    }

    /// URL of the prelude payload.
    pub fn prelude_url(&self) -> Result<Url, url::ParseError> {
        self.url_for(&[PRELUDE_FILE_PATH])
    }

    /// URL of one asset file of the instance at `full_entry`.
    pub fn asset_url(&self, full_entry: &str, filename: &str) -> Result<Url, url::ParseError> {
        self.url_for(&[full_entry, filename])
    }

    /// URL of the live-reload event stream.
    pub fn event_stream_url(&self) -> Result<Url, url::ParseError> {
        self.url_for(&[SSE_PATH])
    }
}

// =============================================================================
// TESTS
// =============================================================================
