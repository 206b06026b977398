//! Clients for upstream services
//!
//! - Site: 24/7 channel directory and live sports schedule
//! - EPG: XMLTV programme guide feed

pub mod epg;
pub mod site;

pub use epg::EpgClient;
pub use site::SiteClient;

use std::time::Duration;

use thiserror::Error;

/// Errors from fetching and parsing an upstream document
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Invalid response: {0}")]
    Parse(String),
}

impl FetchError {
    /// Whether the failure came from the body rather than the transport
    pub fn is_parse(&self) -> bool {
        matches!(self, FetchError::Parse(_))
    }
}

/// HTTP client whose every request is bounded by `timeout`
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("HTTP client should build with the default TLS backend")
}

/// Read a response body as text, mapping non-2xx to [`FetchError::Status`]
pub(crate) async fn text_body(response: reqwest::Response) -> Result<String, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(response.text().await?)
}
