//! # Content Client
//!
//! HTTP access to the chapters content server.
//!
//! ```text
//! GET {base}/index.json                 -> Prelude
//! GET {base}{full_entry}/index.js       -> script
//! GET {base}{full_entry}/index.html     -> html fragment
//! GET {base}{full_entry}/index.css      -> stylesheet
//! GET {base}{full_entry}/index.md       -> description
//! GET {base}/sse                        -> live reload event stream
//! ```
//!
//! Any non-2xx answer becomes [`ContentError::Request`]. Nothing is retried.

use canvasbox_core::locator::{
    DESCRIPTION_FILENAME, HTML_FILENAME, JAVASCRIPT_FILENAME, PREVIEW_IMAGE_FILENAME,
    STYLESHEET_FILENAME,
};
use canvasbox_core::{
    ContentLocator, ImportMapEntry, Prelude, ResolvedInstance, SandboxContent, Theme,
};
use reqwest::header::{ACCEPT, HeaderValue};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Timeout applied to every request except the event stream.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors from the content server.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The server answered with a non-success status.
    #[error("Request failure with status {status}{}", status_text_suffix(.status_text))]
    Request {
        status: u16,
        status_text: Option<String>,
    },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A content URL could not be built.
    #[error("invalid content URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ContentError {
    /// HTTP status of a request failure.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn status_text_suffix(status_text: &Option<String>) -> String {
    match status_text.as_deref() {
        Some(text) if !text.is_empty() => format!(", status text {}", text),
        _ => String::new(),
    }
}

// =============================================================================
// INSTANCE SOURCES
// =============================================================================

/// Text assets of one instance, ready for the sandbox assembler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceSources {
    pub script: String,
    pub html: Option<String>,
    pub stylesheet: Option<String>,
}

impl InstanceSources {
    /// Borrow the sources as sandbox content.
    #[must_use]
    pub fn content<'a>(
        &'a self,
        theme: Theme,
        import_maps: &'a [ImportMapEntry],
    ) -> SandboxContent<'a> {
        SandboxContent {
            theme,
            import_maps: Some(import_maps),
            html: self.html.as_deref(),
            stylesheet: self.stylesheet.as_deref(),
            script: Some(&self.script),
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client for the content server.
#[derive(Debug, Clone)]
pub struct ContentClient {
    locator: ContentLocator,
    client: reqwest::Client,
}

impl ContentClient {
    /// Create a client for the content addressed by `locator`.
    pub fn new(locator: ContentLocator) -> Self {
        Self {
            locator,
            client: reqwest::Client::builder().build().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn locator(&self) -> &ContentLocator {
        &self.locator
    }

    /// GET `url`, failing on any non-2xx status.
    async fn get(&self, url: Url) -> Result<reqwest::Response, ContentError> {
        tracing::debug!(%url, "fetching");
        let response = self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        check_status(response)
    }

    /// Fetch and decode the prelude.
    pub async fn prelude(&self) -> Result<Prelude, ContentError> {
        let url = self.locator.prelude_url().map_err(|source| ContentError::Url {
            url: self.locator.concatenate(&[canvasbox_core::locator::PRELUDE_FILE_PATH]),
            source,
        })?;
        let body = self.get(url).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch any content path as UTF-8 text.
    ///
    /// Relative paths resolve against the page origin.
    pub async fn text_file(&self, path: &str) -> Result<String, ContentError> {
        let url = self.locator.resolve(path).map_err(|source| ContentError::Url {
            url: path.to_string(),
            source,
        })?;
        Ok(self.get(url).await?.text().await?)
    }

    async fn instance_file(
        &self,
        full_entry: &str,
        filename: &str,
    ) -> Result<String, ContentError> {
        self.text_file(&self.locator.concatenate(&[full_entry, filename]))
            .await
    }

    pub async fn instance_javascript(&self, full_entry: &str) -> Result<String, ContentError> {
        self.instance_file(full_entry, JAVASCRIPT_FILENAME).await
    }

    pub async fn instance_html(&self, full_entry: &str) -> Result<String, ContentError> {
        self.instance_file(full_entry, HTML_FILENAME).await
    }

    pub async fn instance_stylesheet(&self, full_entry: &str) -> Result<String, ContentError> {
        self.instance_file(full_entry, STYLESHEET_FILENAME).await
    }

    /// Fetch the markdown description of an instance.
    pub async fn instance_description(&self, full_entry: &str) -> Result<String, ContentError> {
        self.instance_file(full_entry, DESCRIPTION_FILENAME).await
    }

    /// Absolute URL of an instance's preview image.
    pub fn preview_image_url(&self, full_entry: &str) -> Result<Url, ContentError> {
        self.locator
            .asset_url(full_entry, PREVIEW_IMAGE_FILENAME)
            .map_err(|source| ContentError::Url {
                url: self.locator.concatenate(&[full_entry, PREVIEW_IMAGE_FILENAME]),
                source,
            })
    }

    /// Fetch the script, plus html and stylesheet when the instance has them.
    pub async fn instance_sources(
        &self,
        full_entry: &str,
        instance: &ResolvedInstance,
    ) -> Result<InstanceSources, ContentError> {
        let html = async {
            if instance.has_html {
                self.instance_html(full_entry).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let stylesheet = async {
            if instance.has_stylesheet {
                self.instance_stylesheet(full_entry).await.map(Some)
            } else {
                Ok(None)
            }
        };

        let (script, html, stylesheet) =
            tokio::try_join!(self.instance_javascript(full_entry), html, stylesheet)?;
        Ok(InstanceSources {
            script,
            html,
            stylesheet,
        })
    }

    /// Open the live-reload event stream.
    ///
    /// Resolves once the server accepted the stream. No timeout applies to
    /// the returned response.
    pub async fn open_event_stream(&self) -> Result<reqwest::Response, ContentError> {
        let url = self
            .locator
            .event_stream_url()
            .map_err(|source| ContentError::Url {
                url: self.locator.concatenate(&[canvasbox_core::locator::SSE_PATH]),
                source,
            })?;
        tracing::debug!(%url, "opening event stream");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await?;
        check_status(response)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ContentError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ContentError::Request {
            status: status.as_u16(),
            status_text: status.canonical_reason().map(str::to_string),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
