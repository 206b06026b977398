//! Token extraction from upstream pages
//!
//! Every pattern the resolver depends on lives here, one method per token.
//! When the upstream layout changes, this is the only file that should need
//! to follow it. Absence is `None`, never an error: the resolver decides
//! what a missing token means.

use std::sync::OnceLock;

use regex::Regex;

/// Pulls resolution tokens out of response bodies
pub trait Extractor: Send + Sync {
    /// First `iframe src="..."` in document order (hop 1)
    fn iframe_src<'a>(&self, body: &'a str) -> Option<&'a str>;

    /// Path passed to `fetch('...')` in the player script (hop 2)
    fn fetch_path<'a>(&self, body: &'a str) -> Option<&'a str>;

    /// Value of the `channelKey` variable (hop 2)
    fn channel_key<'a>(&self, body: &'a str) -> Option<&'a str>;

    /// Manifest suffix such as `/mono.m3u8` (hop 2)
    fn manifest_suffix<'a>(&self, body: &'a str) -> Option<&'a str>;

    /// Signing key host: first quoted string after a colon (hop 3)
    fn signing_key<'a>(&self, body: &'a str) -> Option<&'a str>;
}

/// Regex-based extractor matching the current upstream layout
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

fn first_capture<'a>(re: &Regex, body: &'a str) -> Option<&'a str> {
    re.captures(body).and_then(|c| c.get(1)).map(|m| m.as_str())
}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($re).expect(concat!(stringify!($name), " should compile")))
        }
    };
}

pattern!(iframe_re, r#"iframe src="([^"]*)"#);
pattern!(fetch_re, r"fetch\('([^']*)");
pattern!(channel_key_re, r#"var channelKey = "([^"]*)"#);
pattern!(manifest_re, r"(/mono\.m3u8)");
pattern!(signing_key_re, r#":"([^"]*)"#);

impl Extractor for PatternExtractor {
    fn iframe_src<'a>(&self, body: &'a str) -> Option<&'a str> {
        first_capture(iframe_re(), body)
    }

    fn fetch_path<'a>(&self, body: &'a str) -> Option<&'a str> {
        first_capture(fetch_re(), body)
    }

    fn channel_key<'a>(&self, body: &'a str) -> Option<&'a str> {
        first_capture(channel_key_re(), body)
    }

    fn manifest_suffix<'a>(&self, body: &'a str) -> Option<&'a str> {
        first_capture(manifest_re(), body)
    }

    fn signing_key<'a>(&self, body: &'a str) -> Option<&'a str> {
        first_capture(signing_key_re(), body)
    }
}
