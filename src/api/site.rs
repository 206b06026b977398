//! Site client
//!
//! Fetches the 24/7 channel directory and the live sports schedule.
//! Neither is a documented API: the directory is scraped from HTML and the
//! schedule is loosely-typed JSON, so both parsers tolerate drift where they
//! can and report a parse error where they cannot.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{http_client, text_body, FetchError};
use crate::config::Config;
use crate::models::{Category, ChannelRef, EventChannel, Schedule, ScheduleDay, ScheduleEvent};

/// Client for the channel directory and schedule endpoints
pub struct SiteClient {
    base_url: String,
    schedule_url: String,
    user_agent: String,
    client: reqwest::Client,
}

impl SiteClient {
    /// Create a client from configuration
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.site_base().to_string(),
            schedule_url: config.schedule_url(),
            user_agent: config.user_agent.clone(),
            client: http_client(config.feed_timeout()),
        }
    }

    /// Create a client against a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>, schedule_path: &str) -> Self {
        let config = Config {
            base_url: base_url.into(),
            schedule_path: schedule_path.to_string(),
            ..Config::default()
        };
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn schedule_url(&self) -> &str {
        &self.schedule_url
    }

    /// Fetch and parse the 24/7 channel directory, unfiltered
    pub async fn fetch_channels(&self) -> Result<Vec<ChannelRef>, FetchError> {
        let url = format!("{}/24-7-channels.php", self.base_url);
        debug!(%url, "fetching channel directory");

        let response = self
            .client
            .post(&url)
            .header(REFERER, format!("{}/", self.base_url))
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;
        let body = text_body(response).await?;

        parse_channel_directory(&body)
    }

    /// Fetch and parse the live sports schedule
    pub async fn fetch_schedule(&self) -> Result<Schedule, FetchError> {
        debug!(url = %self.schedule_url, "fetching schedule");

        let response = self
            .client
            .get(&self.schedule_url)
            .headers(self.browser_headers())
            .send()
            .await?;
        let body = text_body(response).await?;

        parse_schedule(&body)
    }

    /// Header set of a desktop browser navigating the site
    fn browser_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        if let Ok(referer) = HeaderValue::from_str(&self.base_url) {
            headers.insert(REFERER, referer);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));
        headers.insert("DNT", HeaderValue::from_static("1"));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
        headers
    }
}

// =============================================================================
// Channel Directory Parsing
// =============================================================================

fn directory_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<center><h1(.+?)tab-2").expect("directory block regex should compile")
    })
}

fn directory_entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"href="(.*)" target(.*)<strong>(.*)</strong>"#)
            .expect("directory entry regex should compile")
    })
}

/// Parse the channel table out of the directory page
pub fn parse_channel_directory(html: &str) -> Result<Vec<ChannelRef>, FetchError> {
    let block = directory_block_regex()
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| FetchError::Parse("channel table not found in directory page".into()))?;

    let channels: Vec<ChannelRef> = directory_entry_regex()
        .captures_iter(block.as_str())
        .filter_map(|c| {
            let path = c.get(1)?.as_str().trim();
            let name = clean_name(c.get(3)?.as_str());
            (!path.is_empty() && !name.is_empty()).then(|| ChannelRef::new(name, path))
        })
        .collect();

    debug!(count = channels.len(), "parsed channel directory");
    Ok(channels)
}

// =============================================================================
// Schedule Parsing
// =============================================================================

/// Decode HTML entities and trim
pub fn clean_name(raw: &str) -> String {
    htmlescape::decode_html(raw)
        .unwrap_or_else(|_| raw.to_string())
        .trim()
        .to_string()
}

/// Parse the schedule JSON: `{date: {category: [event, ...]}}`.
///
/// Key order is preserved. Dates or categories of the wrong shape, and
/// events whose channels are not objects, are skipped with a warning.
pub fn parse_schedule(body: &str) -> Result<Schedule, FetchError> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("schedule JSON: {}", e)))?;
    let dates = root
        .as_object()
        .ok_or_else(|| FetchError::Parse("schedule root is not an object".into()))?;

    let mut days = Vec::with_capacity(dates.len());
    for (date, categories) in dates {
        let Some(categories) = categories.as_object() else {
            warn!(%date, "schedule date is not an object, skipping");
            continue;
        };
        days.push(ScheduleDay {
            date: date.clone(),
            categories: parse_categories(categories),
        });
    }

    Ok(Schedule { days })
}

fn parse_categories(categories: &Map<String, Value>) -> Vec<Category> {
    categories
        .iter()
        .filter_map(|(name, events)| {
            let Some(events) = events.as_array() else {
                warn!(category = %name, "schedule category is not a list, skipping");
                return None;
            };
            Some(Category {
                name: clean_name(name),
                events: events.iter().filter_map(parse_event).collect(),
            })
        })
        .collect()
}

fn parse_event(raw: &Value) -> Option<ScheduleEvent> {
    let event = raw.get("event").and_then(Value::as_str)?.to_string();
    let time = raw
        .get("time")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    // Channels arrive either as a list or as an object keyed by index
    let entries: Vec<&Value> = match raw.get("channels") {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => Vec::new(),
    };
    if !entries.iter().all(|c| c.is_object()) {
        warn!(%event, "unexpected data structure in 'channels', skipping event");
        return None;
    }

    let channels = entries
        .into_iter()
        .filter_map(|c| {
            let channel_id = match c.get("channel_id")? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let channel_name = c
                .get("channel_name")
                .and_then(Value::as_str)
                .map(clean_name)
                .unwrap_or_else(|| channel_id.clone());
            Some(EventChannel {
                channel_name,
                channel_id,
            })
        })
        .collect();

    Some(ScheduleEvent {
        event,
        time,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTORY: &str = r#"<html><body>
<center><h1>24/7 Channels</h1>
<div class="grid-item"><a href="/stream/stream-51.php" target="_blank" rel="noopener"><span style="color: #000000;"><strong>ABC USA</strong></span></a></div>
<div class="grid-item"><a href="/stream/stream-44.php" target="_blank" rel="noopener"><span style="color: #000000;"><strong>ESPN USA</strong></span></a></div>
<div class="grid-item"><a href="/stream/stream-501.php" target="_blank" rel="noopener"><span style="color: #000000;"><strong>Vivid Red 18+</strong></span></a></div>
<div class="grid-item"><a href="/stream/stream-88.php" target="_blank" rel="noopener"><span style="color: #000000;"><strong>Tom &amp; Jerry TV</strong></span></a></div>
</center>
<div id="tab-2"><a href="/stream/stream-999.php" target="_blank"><strong>Outside</strong></a></div>
</body></html>"#;

    #[test]
    fn test_parse_channel_directory() {
        let channels = parse_channel_directory(DIRECTORY).unwrap();
        assert_eq!(channels.len(), 4);
        assert_eq!(channels[0], ChannelRef::new("ABC USA", "/stream/stream-51.php"));
        assert_eq!(channels[1].stream_id(), Some("44"));
        assert!(channels[2].is_adult());
        assert_eq!(channels[3].display_name, "Tom & Jerry TV");
    }

    #[test]
    fn test_directory_ignores_entries_after_block() {
        let channels = parse_channel_directory(DIRECTORY).unwrap();
        assert!(channels.iter().all(|c| c.display_name != "Outside"));
    }

    #[test]
    fn test_directory_without_table_is_parse_error() {
        let err = parse_channel_directory("<html>maintenance</html>").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_parse_schedule_preserves_order_and_shapes() {
        let body = r#"{
            "Friday 14th Mar 2025 - Schedule Time UK GMT": {
                "Soccer": [
                    {"event": "Arsenal vs Chelsea", "time": "19:45",
                     "channels": [{"channel_name": "Sky Sports Main Event", "channel_id": "38"}]}
                ],
                "Basketball": [
                    {"event": "NBA: Lakers vs Celtics", "time": "00:30",
                     "channels": {"0": {"channel_name": "NBA TV", "channel_id": 404},
                                  "1": {"channel_name": "ESPN USA", "channel_id": "44"}}},
                    {"event": "Broken", "time": "01:00", "channels": ["44"]}
                ],
                "Darts &amp; Snooker ": []
            }
        }"#;

        let schedule = parse_schedule(body).unwrap();
        assert_eq!(schedule.days.len(), 1);
        let names: Vec<_> = schedule.categories().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Soccer", "Basketball", "Darts & Snooker"]);

        let basketball = &schedule.days[0].categories[1];
        assert_eq!(basketball.events.len(), 1);
        let channels = &basketball.events[0].channels;
        assert_eq!(channels[0].channel_id, "404");
        assert_eq!(channels[1].channel_name, "ESPN USA");
    }

    #[test]
    fn test_malformed_schedule_is_parse_error() {
        assert!(parse_schedule("<html>").unwrap_err().is_parse());
        assert!(parse_schedule("[1, 2]").unwrap_err().is_parse());
    }
}
