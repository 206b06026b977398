//! Stream resolver
//!
//! Turns a channel reference into a playable [`MediaDescriptor`] by walking
//! a chain of dependent upstream requests:
//!
//! ```text
//! stream page ──iframe src──▶ player page ──fetch path, channelKey, manifest──▶
//! key lookup ──signing key──▶ https://{key}{stream_path}/{key}/{channelKey}{manifest}
//! ```
//!
//! Each stage is its own type and each transition a pure function of the
//! previous stage and a response body, so the chain can be exercised hop by
//! hop without a network. [`Resolver::resolve`] only performs the fetches.
//! Nothing is retried or cached: tokens are short-lived, and a failed hop
//! ends the attempt.

pub mod extract;

pub use extract::{Extractor, PatternExtractor};

use std::fmt;

use reqwest::header::{REFERER, USER_AGENT};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::api::{http_client, text_body, FetchError};
use crate::config::Config;
use crate::models::MediaDescriptor;

/// Characters of a response body included in shape-change logs
const BODY_PREVIEW: usize = 200;

// =============================================================================
// Errors
// =============================================================================

/// A request in the resolution chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    StreamPage,
    PlayerPage,
    KeyLookup,
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hop::StreamPage => write!(f, "stream page"),
            Hop::PlayerPage => write!(f, "player page"),
            Hop::KeyLookup => write!(f, "key lookup"),
        }
    }
}

/// A value mined from a hop response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    IframeSrc,
    FetchPath,
    ChannelKey,
    ManifestSuffix,
    SigningKey,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IframeSrc => write!(f, "iframe src"),
            Token::FetchPath => write!(f, "fetch path"),
            Token::ChannelKey => write!(f, "channelKey"),
            Token::ManifestSuffix => write!(f, "manifest suffix"),
            Token::SigningKey => write!(f, "signing key"),
        }
    }
}

/// Why a resolution attempt failed. All variants are terminal.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Network error during {hop}: {source}")]
    Network {
        hop: Hop,
        #[source]
        source: FetchError,
    },

    #[error("Upstream shape changed: {token} not found in {hop} response")]
    UpstreamShapeChanged { hop: Hop, token: Token },

    #[error("Invalid stream link: {0}")]
    InvalidStreamLink(String),
}

// =============================================================================
// Targets
// =============================================================================

/// What to resolve: a channel id or a stream page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    /// Numeric channel id, as found in the schedule
    Channel(String),
    /// Stream page URL or a path relative to the site base
    Page(String),
}

impl StreamTarget {
    /// Interpret user input: anything containing a `/` is a page, the rest
    /// is a channel id
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.contains('/') {
            StreamTarget::Page(input.to_string())
        } else {
            StreamTarget::Channel(input.to_string())
        }
    }

    /// Absolute stream page URL under `base` (no trailing slash)
    pub fn page_url(&self, base: &str) -> String {
        match self {
            StreamTarget::Channel(id) => {
                format!("{}/stream/stream-{}.php", base, urlencoding::encode(id))
            }
            StreamTarget::Page(page) if page.starts_with("http://") || page.starts_with("https://") => {
                page.clone()
            }
            StreamTarget::Page(path) => format!("{}/{}", base, path.trim_start_matches('/')),
        }
    }
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamTarget::Channel(id) => write!(f, "channel {}", id),
            StreamTarget::Page(page) => write!(f, "{}", page),
        }
    }
}

// =============================================================================
// Stages
// =============================================================================

/// Hop 1 done: the player iframe is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IframeFetched {
    pub iframe_url: String,
    /// Scheme and authority of the iframe URL
    pub referer_base: String,
}

/// Hop 2 done: the player script's tokens are known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokensExtracted {
    pub referer_base: String,
    /// Path of the key lookup endpoint
    pub stream_token: String,
    pub channel_key: String,
    pub manifest_suffix: String,
}

impl TokensExtracted {
    /// URL of the key lookup: referer base, stream token and channel key
    /// concatenated verbatim
    pub fn key_lookup_url(&self) -> String {
        format!("{}{}{}", self.referer_base, self.stream_token, self.channel_key)
    }
}

/// Hop 3 done: everything needed to build the media URL is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyResolved {
    pub referer_base: String,
    pub channel_key: String,
    pub manifest_suffix: String,
    pub signing_key: String,
}

fn shape_changed(hop: Hop, token: Token, body: &str) -> ResolveError {
    let preview: String = body.chars().take(BODY_PREVIEW).collect();
    warn!(%hop, %token, body_len = body.len(), %preview, "expected token missing from upstream response");
    ResolveError::UpstreamShapeChanged { hop, token }
}

/// Scheme and authority of a URL, e.g. `https://x.test:8443`
pub fn referer_base(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Hop 1 transition: locate the player iframe in the stream page.
///
/// Only the first iframe counts. A relative src is resolved against the
/// stream page URL.
pub fn locate_iframe<E: Extractor + ?Sized>(
    extractor: &E,
    page_url: &str,
    body: &str,
) -> Result<IframeFetched, ResolveError> {
    let src = extractor
        .iframe_src(body)
        .ok_or_else(|| shape_changed(Hop::StreamPage, Token::IframeSrc, body))?;

    let iframe = Url::parse(page_url)
        .and_then(|page| page.join(src))
        .or_else(|_| Url::parse(src))
        .map_err(|_| shape_changed(Hop::StreamPage, Token::IframeSrc, body))?;
    let referer_base =
        referer_base(&iframe).ok_or_else(|| shape_changed(Hop::StreamPage, Token::IframeSrc, body))?;

    Ok(IframeFetched {
        iframe_url: iframe.to_string(),
        referer_base,
    })
}

/// Hop 2 transition: mine the player page for the key lookup path, the
/// channel key and the manifest suffix. All three are required.
pub fn extract_tokens<E: Extractor + ?Sized>(
    extractor: &E,
    stage: IframeFetched,
    body: &str,
) -> Result<TokensExtracted, ResolveError> {
    let hop = Hop::PlayerPage;
    let stream_token = extractor
        .fetch_path(body)
        .ok_or_else(|| shape_changed(hop, Token::FetchPath, body))?;
    let channel_key = extractor
        .channel_key(body)
        .ok_or_else(|| shape_changed(hop, Token::ChannelKey, body))?;
    let manifest_suffix = extractor
        .manifest_suffix(body)
        .ok_or_else(|| shape_changed(hop, Token::ManifestSuffix, body))?;

    Ok(TokensExtracted {
        referer_base: stage.referer_base,
        stream_token: stream_token.to_string(),
        channel_key: channel_key.to_string(),
        manifest_suffix: manifest_suffix.to_string(),
    })
}

/// Hop 3 transition: read the signing key from the key lookup response
pub fn resolve_key<E: Extractor + ?Sized>(
    extractor: &E,
    stage: TokensExtracted,
    body: &str,
) -> Result<KeyResolved, ResolveError> {
    let signing_key = extractor
        .signing_key(body)
        .ok_or_else(|| shape_changed(Hop::KeyLookup, Token::SigningKey, body))?;

    Ok(KeyResolved {
        referer_base: stage.referer_base,
        channel_key: stage.channel_key,
        manifest_suffix: stage.manifest_suffix,
        signing_key: signing_key.to_string(),
    })
}

/// Final transition: build and validate the media descriptor
pub fn assemble(
    stage: KeyResolved,
    stream_path: &str,
    user_agent: &str,
) -> Result<MediaDescriptor, ResolveError> {
    let key = &stage.signing_key;
    let url = format!(
        "https://{}{}/{}/{}{}",
        key, stream_path, key, stage.channel_key, stage.manifest_suffix
    );

    if !url.starts_with("http") || Url::parse(&url).map(|u| u.host().is_none()).unwrap_or(true) {
        return Err(ResolveError::InvalidStreamLink(url));
    }

    Ok(MediaDescriptor {
        url,
        headers: vec![
            ("Referer".to_string(), format!("{}/", stage.referer_base)),
            ("Origin".to_string(), stage.referer_base),
            ("Keep-Alive".to_string(), "true".to_string()),
            ("User-Agent".to_string(), user_agent.to_string()),
        ],
    })
}

// =============================================================================
// Resolver
// =============================================================================

/// Drives the hop chain against the upstream site
pub struct Resolver<E = PatternExtractor> {
    base_url: String,
    stream_path: String,
    user_agent: String,
    client: reqwest::Client,
    extractor: E,
}

impl Resolver<PatternExtractor> {
    /// Create a resolver from configuration
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.site_base().to_string(),
            stream_path: config.stream_path.clone(),
            user_agent: config.user_agent.clone(),
            client: http_client(config.hop_timeout()),
            extractor: PatternExtractor,
        }
    }

    /// Create a resolver against a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>, stream_path: impl Into<String>) -> Self {
        let config = Config {
            base_url: base_url.into(),
            stream_path: stream_path.into(),
            ..Config::default()
        };
        Self::new(&config)
    }
}

impl<E: Extractor> Resolver<E> {
    /// Swap the token extractor
    pub fn with_extractor<X: Extractor>(self, extractor: X) -> Resolver<X> {
        Resolver {
            base_url: self.base_url,
            stream_path: self.stream_path,
            user_agent: self.user_agent,
            client: self.client,
            extractor,
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Resolve a target into a playable descriptor. All or nothing.
    #[instrument(skip(self, target), fields(target = %target))]
    pub async fn resolve(&self, target: &StreamTarget) -> Result<MediaDescriptor, ResolveError> {
        let page_url = target.page_url(&self.base_url);

        let body = self.hop(Hop::StreamPage, &page_url).await?;
        let stage = locate_iframe(&self.extractor, &page_url, &body)?;
        debug!(iframe = %stage.iframe_url, referer_base = %stage.referer_base, "iframe located");

        let body = self.hop(Hop::PlayerPage, &stage.iframe_url).await?;
        let stage = extract_tokens(&self.extractor, stage, &body)?;
        debug!(channel_key = %stage.channel_key, stream_token = %stage.stream_token, "player tokens extracted");

        let body = self.hop(Hop::KeyLookup, &stage.key_lookup_url()).await?;
        let stage = resolve_key(&self.extractor, stage, &body)?;
        debug!(signing_key = %stage.signing_key, "signing key resolved");

        let descriptor = assemble(stage, &self.stream_path, &self.user_agent)?;
        debug!(url = %descriptor.url, "stream resolved");
        Ok(descriptor)
    }

    /// One request of the chain. Every hop replays the same Referer and
    /// User-Agent.
    async fn hop(&self, hop: Hop, url: &str) -> Result<String, ResolveError> {
        debug!(%hop, %url, "requesting");
        let response = self
            .client
            .post(url)
            .header(REFERER, format!("{}/", self.base_url))
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| ResolveError::Network {
                hop,
                source: FetchError::Network(e),
            })?;

        text_body(response)
            .await
            .map_err(|source| ResolveError::Network { hop, source })
    }
}
