//! EPG (Electronic Program Guide) client
//!
//! Downloads an XMLTV feed, gunzips it when needed, and parses channels
//! and programmes with a streaming quick-xml reader.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};

use chrono::NaiveDateTime;
use flate2::read::GzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, warn};

use super::{http_client, FetchError};
use crate::config::Config;
use crate::models::{EpgChannel, Programme, UpcomingProgramme};

/// Programmes shown by [`EpgFeed::upcoming`]
pub const UPCOMING_LIMIT: usize = 3;

/// Parsed XMLTV document
#[derive(Debug, Clone, Default)]
pub struct EpgFeed {
    pub channels: Vec<EpgChannel>,
    pub programmes: Vec<Programme>,
}

impl EpgFeed {
    /// Map of lowercase display name to EPG channel id.
    ///
    /// Uses each channel's first non-empty display name. When two channels
    /// share a name the later one wins.
    pub fn display_name_index(&self) -> HashMap<String, String> {
        self.channels
            .iter()
            .filter(|c| !c.id.is_empty())
            .filter_map(|c| Some((c.primary_name()?.to_lowercase(), c.id.clone())))
            .collect()
    }

    /// Next programmes on `channel_id` starting at or after `now`, in feed
    /// order, at most [`UPCOMING_LIMIT`].
    pub fn upcoming(&self, channel_id: &str, now: NaiveDateTime) -> Vec<UpcomingProgramme> {
        self.programmes
            .iter()
            .filter(|p| p.channel == channel_id)
            .filter_map(|p| {
                let start = parse_xmltv_time(&p.start);
                if start.is_none() {
                    warn!(channel = %p.channel, start = %p.start, "unparsable programme start");
                }
                Some((p, start?))
            })
            .filter(|(_, start)| *start >= now)
            .take(UPCOMING_LIMIT)
            .map(|(p, start)| UpcomingProgramme {
                title: p
                    .title
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or("Unknown Title")
                    .to_string(),
                start: start.format("%I:%M %p").to_string(),
                desc: p
                    .desc
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or("No Description Available")
                    .to_string(),
            })
            .collect()
    }
}

/// Parse the leading `YYYYMMDDHHMMSS` of an XMLTV timestamp. The offset
/// suffix is ignored and the time treated as UTC.
pub fn parse_xmltv_time(raw: &str) -> Option<NaiveDateTime> {
    let digits = raw.trim().get(..14)?;
    NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S").ok()
}

/// XMLTV feed client
pub struct EpgClient {
    url: String,
    client: reqwest::Client,
}

impl EpgClient {
    /// Create a client for the configured feed
    pub fn new(config: &Config) -> Self {
        Self {
            url: config.epg_url.clone(),
            client: http_client(config.epg_timeout()),
        }
    }

    /// Create a client for a custom feed URL (for testing)
    pub fn with_url(url: impl Into<String>) -> Self {
        let config = Config {
            epg_url: url.into(),
            ..Config::default()
        };
        Self::new(&config)
    }

    /// Download and parse the feed
    pub async fn fetch(&self) -> Result<EpgFeed, FetchError> {
        debug!(url = %self.url, "downloading EPG feed");

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "EPG feed downloaded");

        // Feeds run to hundreds of megabytes; keep parsing off the runtime
        tokio::task::spawn_blocking(move || parse_feed_bytes(&bytes))
            .await
            .map_err(|e| FetchError::Parse(format!("EPG parser task failed: {}", e)))?
    }

    /// Upcoming programmes for one channel. Download or parse failures give
    /// an empty list.
    pub async fn upcoming(&self, channel_id: &str, now: NaiveDateTime) -> Vec<UpcomingProgramme> {
        match self.fetch().await {
            Ok(feed) => feed.upcoming(channel_id, now),
            Err(e) => {
                warn!(error = %e, url = %self.url, "EPG unavailable");
                Vec::new()
            }
        }
    }
}

/// Parse feed bytes, gunzipping when the gzip magic is present
pub fn parse_feed_bytes(bytes: &[u8]) -> Result<EpgFeed, FetchError> {
    if bytes.starts_with(&[0x1f, 0x8b]) {
        parse_feed(BufReader::new(GzDecoder::new(bytes)))
    } else {
        parse_feed(bytes)
    }
}

/// Which text node the reader is inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    DisplayName,
    Title,
    Desc,
}

/// Stream-parse an XMLTV document
pub fn parse_feed<R: BufRead>(source: R) -> Result<EpgFeed, FetchError> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut feed = EpgFeed::default();
    let mut buf = Vec::new();
    let mut channel: Option<EpgChannel> = None;
    let mut programme: Option<Programme> = None;
    let mut field: Option<TextField> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| FetchError::Parse(format!("XMLTV at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"channel" => {
                    channel = Some(EpgChannel {
                        id: attribute(&e, "id").unwrap_or_default(),
                        display_names: Vec::new(),
                    });
                }
                b"programme" => programme = Some(programme_from(&e)),
                b"display-name" if channel.is_some() => field = Some(TextField::DisplayName),
                b"title" if programme.is_some() => field = Some(TextField::Title),
                b"desc" if programme.is_some() => field = Some(TextField::Desc),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"channel" => feed.channels.push(EpgChannel {
                    id: attribute(&e, "id").unwrap_or_default(),
                    display_names: Vec::new(),
                }),
                b"programme" => feed.programmes.push(programme_from(&e)),
                _ => {}
            },
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| FetchError::Parse(format!("XMLTV text: {}", e)))?;
                push_text(field, &text, &mut channel, &mut programme);
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(&t).into_owned();
                push_text(field, &text, &mut channel, &mut programme);
            }
            Event::End(e) => match e.name().as_ref() {
                b"channel" => {
                    if let Some(done) = channel.take() {
                        feed.channels.push(done);
                    }
                }
                b"programme" => {
                    if let Some(done) = programme.take() {
                        feed.programmes.push(done);
                    }
                }
                b"display-name" | b"title" | b"desc" => field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!(
        channels = feed.channels.len(),
        programmes = feed.programmes.len(),
        "parsed EPG feed"
    );
    Ok(feed)
}

fn push_text(
    field: Option<TextField>,
    text: &str,
    channel: &mut Option<EpgChannel>,
    programme: &mut Option<Programme>,
) {
    match (field, channel.as_mut(), programme.as_mut()) {
        (Some(TextField::DisplayName), Some(ch), _) => ch.display_names.push(text.to_string()),
        // First title/desc wins; feeds repeat them per language
        (Some(TextField::Title), _, Some(p)) if p.title.is_none() => p.title = Some(text.to_string()),
        (Some(TextField::Desc), _, Some(p)) if p.desc.is_none() => p.desc = Some(text.to_string()),
        _ => {}
    }
}

fn programme_from(e: &BytesStart<'_>) -> Programme {
    Programme {
        channel: attribute(e, "channel").unwrap_or_default(),
        start: attribute(e, "start").unwrap_or_default(),
        stop: attribute(e, "stop").unwrap_or_default(),
        title: None,
        desc: None,
    }
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    let attr = e.try_get_attribute(name).ok()??;
    attr.unescape_value().ok().map(|v| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tv generator-info-name="test">
  <channel id="us-espn">
    <display-name lang="en">ESPN USA</display-name>
    <display-name>ESPN</display-name>
  </channel>
  <channel id="uk-bbcone">
    <display-name></display-name>
    <display-name>BBC One UK</display-name>
  </channel>
  <programme start="20250314180000 +0000" stop="20250314190000 +0000" channel="us-espn">
    <title lang="en">SportsCenter</title>
    <desc lang="en">Highlights &amp; news</desc>
  </programme>
  <programme start="20250314190000 +0000" stop="20250314200000 +0000" channel="us-espn">
    <title>NBA Countdown</title>
  </programme>
  <programme start="20250314190000 +0000" stop="20250314200000 +0000" channel="uk-bbcone">
    <title>News</title>
  </programme>
  <programme start="20250314200000 +0000" stop="20250314230000 +0000" channel="us-espn">
    <title>NBA: Lakers at Celtics</title>
    <desc>Live</desc>
  </programme>
  <programme start="20250314230000 +0000" stop="20250315000000 +0000" channel="us-espn">
    <title>SportsCenter</title>
  </programme>
  <programme start="20250315000000 +0000" stop="20250315010000 +0000" channel="us-espn">
    <title>Late</title>
  </programme>
</tv>"#;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_feed_channels_and_programmes() {
        let feed = parse_feed(FEED.as_bytes()).unwrap();
        assert_eq!(feed.channels.len(), 2);
        assert_eq!(feed.channels[0].id, "us-espn");
        assert_eq!(feed.channels[0].display_names, vec!["ESPN USA", "ESPN"]);
        assert_eq!(feed.programmes.len(), 6);
        assert_eq!(feed.programmes[0].desc.as_deref(), Some("Highlights & news"));
    }

    #[test]
    fn test_display_name_index_uses_first_non_empty_name() {
        let feed = parse_feed(FEED.as_bytes()).unwrap();
        let index = feed.display_name_index();
        assert_eq!(index.get("espn usa").map(String::as_str), Some("us-espn"));
        assert_eq!(index.get("bbc one uk").map(String::as_str), Some("uk-bbcone"));
        assert!(!index.contains_key("espn"));
    }

    #[test]
    fn test_upcoming_takes_three_from_now() {
        let feed = parse_feed(FEED.as_bytes()).unwrap();
        let upcoming = feed.upcoming("us-espn", at(18, 30));

        assert_eq!(upcoming.len(), 3);
        assert_eq!(upcoming[0].title, "NBA Countdown");
        assert_eq!(upcoming[0].start, "07:00 PM");
        assert_eq!(upcoming[0].desc, "No Description Available");
        assert_eq!(upcoming[1].title, "NBA: Lakers at Celtics");
        assert_eq!(upcoming[2].start, "11:00 PM");
    }

    #[test]
    fn test_upcoming_unknown_channel_is_empty() {
        let feed = parse_feed(FEED.as_bytes()).unwrap();
        assert!(feed.upcoming("nope", at(0, 0)).is_empty());
    }

    #[test]
    fn test_parse_xmltv_time() {
        assert_eq!(parse_xmltv_time("20250314180000 +0000"), Some(at(18, 0)));
        assert_eq!(parse_xmltv_time("20250314180000"), Some(at(18, 0)));
        assert_eq!(parse_xmltv_time("2025031418"), None);
    }

    #[test]
    fn test_gzip_feed_is_detected() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(FEED.as_bytes()).unwrap();
        let gz = encoder.finish().unwrap();

        let feed = parse_feed_bytes(&gz).unwrap();
        assert_eq!(feed.channels.len(), 2);
    }

    #[test]
    fn test_malformed_feed_is_parse_error() {
        let err = parse_feed_bytes(b"<tv><channel id=\"x\"></tv>").unwrap_err();
        assert!(err.is_parse());
    }
}
