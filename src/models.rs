//! Data structures and types for livetv
//!
//! Contains the shared models used across the application organized by domain:
//! - **Channels**: 24/7 channel directory entries
//! - **Schedule**: live sports schedule, categories and events
//! - **Playback**: the resolved media descriptor handed to a player
//! - **EPG**: programme guide channels and programmes
//! - **Listings**: directory entries for the presentation layer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use url::form_urlencoded;

/// Display-name marker for adult channels
pub const ADULT_MARKER: &str = "18+";

// =============================================================================
// Channel Models
// =============================================================================

/// A channel parsed from the 24/7 channel directory page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub display_name: String,
    /// Path of the channel's stream page, relative to the site base
    pub path_fragment: String,
}

impl ChannelRef {
    pub fn new(display_name: impl Into<String>, path_fragment: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            path_fragment: path_fragment.into(),
        }
    }

    /// Whether the display name carries the adult marker
    pub fn is_adult(&self) -> bool {
        self.display_name.contains(ADULT_MARKER)
    }

    /// Numeric stream id from a `stream-{id}.php` path, if present
    pub fn stream_id(&self) -> Option<&str> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"stream-([^/.]+)\.php").expect("stream id regex should compile")
        });
        re.captures(&self.path_fragment)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stream_id() {
            Some(id) => write!(f, "{} [{}]", self.display_name, id),
            None => write!(f, "{}", self.display_name),
        }
    }
}

// =============================================================================
// Schedule Models
// =============================================================================

/// A channel carrying a scheduled event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChannel {
    pub channel_name: String,
    pub channel_id: String,
}

/// A single scheduled event as published upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub event: String,
    /// Start time in UTC, `HH:MM`
    pub time: String,
    pub channels: Vec<EventChannel>,
}

/// Events of one category on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub events: Vec<ScheduleEvent>,
}

/// One schedule date with its categories in upstream order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDay {
    pub date: String,
    pub categories: Vec<Category>,
}

/// The full live sports schedule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub days: Vec<ScheduleDay>,
}

impl Schedule {
    /// All categories across every date, in document order
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.days.iter().flat_map(|d| d.categories.iter())
    }
}

/// An event ready for display, with its start time in the viewer's timezone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventListing {
    /// `"{local_time} {event}"`
    pub title: String,
    pub channels: Vec<EventChannel>,
}

/// Clock style for rendered times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

// =============================================================================
// Playback Models
// =============================================================================

/// A resolved, playable stream: the media URL plus the headers the
/// upstream CDN expects on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub url: String,
    /// Ordered as they are replayed: Referer, Origin, Keep-Alive, User-Agent
    pub headers: Vec<(String, String)>,
}

impl MediaDescriptor {
    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Render as `url|Name=value&Name=value`, values form-urlencoded.
    ///
    /// A trailing `/` stays literal, so the Referer renders as
    /// `Referer=https%3A%2F%2Fhost/`. Decoding is unaffected.
    pub fn to_playback_url(&self) -> String {
        let suffix = self
            .headers
            .iter()
            .map(|(k, v)| format!("{}={}", k, header_value(v)))
            .collect::<Vec<_>>()
            .join("&");
        if suffix.is_empty() {
            self.url.clone()
        } else {
            format!("{}|{}", self.url, suffix)
        }
    }

    /// Parse a pipe-suffixed playback URL back into a descriptor
    pub fn from_playback_url(s: &str) -> Self {
        let (url, suffix) = match s.split_once('|') {
            Some((u, rest)) => (u, rest),
            None => (s, ""),
        };
        let headers = suffix
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (k.to_string(), form_decode(v))
            })
            .collect();
        Self {
            url: url.to_string(),
            headers,
        }
    }
}

fn header_value(value: &str) -> String {
    match value.strip_suffix('/') {
        Some(base) => format!("{}/", form_encode(base)),
        None => form_encode(value),
    }
}

fn form_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn form_decode(value: &str) -> String {
    let replaced = value.replace('+', " ");
    urlencoding::decode(&replaced)
        .map(|s| s.into_owned())
        .unwrap_or(replaced)
}

impl fmt::Display for MediaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_playback_url())
    }
}

// =============================================================================
// EPG Models
// =============================================================================

/// A channel declared in an XMLTV feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpgChannel {
    pub id: String,
    pub display_names: Vec<String>,
}

impl EpgChannel {
    /// First non-empty display name, trimmed
    pub fn primary_name(&self) -> Option<&str> {
        self.display_names
            .iter()
            .map(|n| n.trim())
            .find(|n| !n.is_empty())
    }
}

/// A programme entry from an XMLTV feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Programme {
    pub channel: String,
    /// Raw XMLTV timestamp, `YYYYMMDDHHMMSS[ +ZZZZ]`
    pub start: String,
    pub stop: String,
    pub title: Option<String>,
    pub desc: Option<String>,
}

/// A programme airing soon, rendered for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingProgramme {
    pub title: String,
    pub start: String,
    pub desc: String,
}

// =============================================================================
// Listing Models
// =============================================================================

/// An item handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub title: String,
    /// Argument that navigates to (or plays) this entry
    pub reference: String,
    /// Leaf entries are playable, the rest are folders
    pub is_leaf: bool,
}

impl DirectoryEntry {
    pub fn folder(title: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            reference: reference.into(),
            is_leaf: false,
        }
    }

    pub fn playable(title: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            reference: reference.into(),
            is_leaf: true,
        }
    }
}

impl From<&ChannelRef> for DirectoryEntry {
    fn from(channel: &ChannelRef) -> Self {
        let reference = channel
            .stream_id()
            .map(str::to_string)
            .unwrap_or_else(|| channel.path_fragment.clone());
        DirectoryEntry::playable(channel.display_name.clone(), reference)
    }
}

impl From<&EventChannel> for DirectoryEntry {
    fn from(channel: &EventChannel) -> Self {
        DirectoryEntry::playable(channel.channel_name.clone(), channel.channel_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_from_path() {
        let ch = ChannelRef::new("ESPN USA", "/stream/stream-44.php");
        assert_eq!(ch.stream_id(), Some("44"));

        let ch = ChannelRef::new("Odd", "/watch/odd.html");
        assert_eq!(ch.stream_id(), None);
    }

    #[test]
    fn test_adult_marker() {
        assert!(ChannelRef::new("Adult 18+ One", "/stream/stream-1.php").is_adult());
        assert!(!ChannelRef::new("CNN USA", "/stream/stream-2.php").is_adult());
    }

    #[test]
    fn test_playback_url_format() {
        let desc = MediaDescriptor {
            url: "https://k.test/path/k/premium51/mono.m3u8".to_string(),
            headers: vec![
                ("Referer".into(), "https://x.test/".into()),
                ("Origin".into(), "https://x.test".into()),
                ("Keep-Alive".into(), "true".into()),
                ("User-Agent".into(), "Mozilla/5.0 (X11)".into()),
            ],
        };
        assert_eq!(
            desc.to_playback_url(),
            "https://k.test/path/k/premium51/mono.m3u8\
             |Referer=https%3A%2F%2Fx.test/\
             &Origin=https%3A%2F%2Fx.test\
             &Keep-Alive=true\
             &User-Agent=Mozilla%2F5.0+%28X11%29"
        );
    }

    #[test]
    fn test_playback_url_referer_slash_decodes() {
        let desc = MediaDescriptor::from_playback_url(
            "https://k.test/mono.m3u8|Referer=https%3A%2F%2Fx.test/&Keep-Alive=true",
        );
        assert_eq!(desc.header("referer"), Some("https://x.test/"));
        assert_eq!(
            desc.to_playback_url(),
            "https://k.test/mono.m3u8|Referer=https%3A%2F%2Fx.test/&Keep-Alive=true"
        );
    }

    #[test]
    fn test_playback_url_without_headers() {
        let desc = MediaDescriptor::from_playback_url("https://a.test/x.m3u8");
        assert_eq!(desc.url, "https://a.test/x.m3u8");
        assert!(desc.headers.is_empty());
        assert_eq!(desc.to_playback_url(), "https://a.test/x.m3u8");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let desc = MediaDescriptor {
            url: "https://a.test".into(),
            headers: vec![("User-Agent".into(), "ua".into())],
        };
        assert_eq!(desc.header("user-agent"), Some("ua"));
        assert_eq!(desc.header("Referer"), None);
    }

    #[test]
    fn test_epg_primary_name_skips_blank() {
        let ch = EpgChannel {
            id: "us-espn".into(),
            display_names: vec!["  ".into(), " ESPN USA ".into()],
        };
        assert_eq!(ch.primary_name(), Some("ESPN USA"));
    }

    #[test]
    fn test_directory_entry_from_channel() {
        let entry = DirectoryEntry::from(&ChannelRef::new("CNN USA", "/stream/stream-345.php"));
        assert_eq!(entry.reference, "345");
        assert!(entry.is_leaf);
    }
}
