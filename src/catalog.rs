//! Catalog: the listing side of the app
//!
//! Owns the two fetch caches (channel directory and schedule) and turns their
//! contents into what the user browses: channels filtered by the adult opt-in
//! or by country, schedule categories, and events with start times in the
//! viewer's timezone. The resolver never goes through here.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, TimeDelta};
use tracing::{info, warn};

use crate::api::{FetchError, SiteClient};
use crate::cache::FetchCache;
use crate::config::Config;
use crate::models::{ChannelRef, EventListing, Schedule, TimeFormat};

/// Country filters offered for the channel list
pub const COUNTRIES: &[&str] = &[
    "USA",
    "UK",
    "Spain",
    "Canada",
    "Australia",
    "Mexico",
    "Germany",
    "India",
    "France",
    "Portugal",
    "Italy",
    "Arabic",
    "Misc",
];

/// Category whose events get the NBA sub-listing
pub const NBA_CATEGORY: &str = "Basketball";

/// Cached channel directory and schedule
pub struct Catalog {
    site: SiteClient,
    channels: FetchCache<String, Vec<ChannelRef>>,
    schedule: FetchCache<String, Schedule>,
    max_age: Duration,
    utc_offset_hours: i32,
    time_format: TimeFormat,
}

impl Catalog {
    pub fn new(config: &Config) -> Self {
        Self::with_site(SiteClient::new(config), config)
    }

    /// Build a catalog around an existing site client
    pub fn with_site(site: SiteClient, config: &Config) -> Self {
        Self {
            site,
            channels: FetchCache::new("channels"),
            schedule: FetchCache::new("schedule"),
            max_age: config.cache_duration(),
            utc_offset_hours: config.utc_offset_hours(),
            time_format: config.time_format,
        }
    }

    fn channels_key(&self) -> String {
        format!("{}/24-7-channels.php", self.site.base_url())
    }

    fn schedule_key(&self) -> String {
        self.site.schedule_url().to_string()
    }

    /// The full channel directory, adult entries included. A directory page
    /// that no longer parses gives an empty list.
    pub async fn all_channels(&self) -> Result<Arc<Vec<ChannelRef>>, FetchError> {
        let result = self
            .channels
            .get_or_fetch(&self.channels_key(), self.max_age, || self.site.fetch_channels())
            .await;
        match result {
            Err(e) if e.is_parse() => {
                warn!(error = %e, "channel directory unreadable, listing nothing");
                Ok(Arc::new(Vec::new()))
            }
            other => other,
        }
    }

    /// Channels in directory order. Adult entries only with the opt-in.
    pub async fn channels(&self, adult_opt_in: bool) -> Result<Vec<ChannelRef>, FetchError> {
        let all = self.all_channels().await?;
        Ok(all
            .iter()
            .filter(|c| adult_opt_in || !c.is_adult())
            .cloned()
            .collect())
    }

    /// Channels whose name contains `country`, case-insensitively
    pub async fn country_channels(
        &self,
        country: &str,
        adult_opt_in: bool,
    ) -> Result<Vec<ChannelRef>, FetchError> {
        let needle = country.to_lowercase();
        let mut channels = self.channels(adult_opt_in).await?;
        channels.retain(|c| c.display_name.to_lowercase().contains(&needle));
        Ok(channels)
    }

    /// The schedule. Malformed JSON gives an empty schedule.
    pub async fn schedule(&self) -> Result<Arc<Schedule>, FetchError> {
        let result = self
            .schedule
            .get_or_fetch(&self.schedule_key(), self.max_age, || self.site.fetch_schedule())
            .await;
        match result {
            Err(e) if e.is_parse() => {
                warn!(error = %e, "schedule unreadable, listing nothing");
                Ok(Arc::new(Schedule::default()))
            }
            other => other,
        }
    }

    /// Category names in document order, each listed once
    pub async fn categories(&self) -> Result<Vec<String>, FetchError> {
        let schedule = self.schedule().await?;
        let mut names: Vec<String> = Vec::new();
        for category in schedule.categories() {
            if !names.contains(&category.name) {
                names.push(category.name.clone());
            }
        }
        Ok(names)
    }

    /// Events of every category named `category` across all dates
    pub async fn events(&self, category: &str) -> Result<Vec<EventListing>, FetchError> {
        let schedule = self.schedule().await?;
        Ok(schedule
            .categories()
            .filter(|c| c.name.eq_ignore_ascii_case(category))
            .flat_map(|c| c.events.iter())
            .map(|e| EventListing {
                title: format!(
                    "{} {}",
                    local_time(&e.time, self.utc_offset_hours, self.time_format),
                    e.event
                ),
                channels: e.channels.clone(),
            })
            .collect())
    }

    /// NBA games within the basketball category. Other categories have none.
    pub async fn nba_events(&self, category: &str) -> Result<Vec<EventListing>, FetchError> {
        if !category.eq_ignore_ascii_case(NBA_CATEGORY) {
            return Ok(Vec::new());
        }
        let mut events = self.events(category).await?;
        events.retain(|e| e.title.to_uppercase().contains("NBA"));
        Ok(events)
    }

    /// Warm both caches. Failures are logged, not returned.
    pub async fn preload(&self) {
        let (schedule, channels) = tokio::join!(self.schedule(), self.all_channels());
        match schedule {
            Ok(s) => info!(categories = s.categories().count(), "schedule preloaded"),
            Err(e) => warn!(error = %e, "failed to preload schedule"),
        }
        match channels {
            Ok(c) => info!(channels = c.len(), "channel directory preloaded"),
            Err(e) => warn!(error = %e, "failed to preload channel directory"),
        }
    }

    /// Drop both cached collections so the next read goes upstream
    pub async fn refresh(&self) {
        self.channels.invalidate(&self.channels_key()).await;
        self.schedule.invalidate(&self.schedule_key()).await;
        info!("catalog caches invalidated");
    }
}

/// Render an upstream `HH:MM` (UTC) in the viewer's timezone, wrapping around
/// midnight. Unparsable input is returned unchanged.
pub fn local_time(utc: &str, offset_hours: i32, format: TimeFormat) -> String {
    let Ok(time) = NaiveTime::parse_from_str(utc.trim(), "%H:%M") else {
        warn!(time = %utc, "unparsable event time");
        return utc.to_string();
    };
    let (local, _) = time.overflowing_add_signed(TimeDelta::hours(i64::from(offset_hours)));

    match format {
        TimeFormat::TwelveHour => local
            .format("%I:%M %p")
            .to_string()
            .trim_start_matches('0')
            .to_string(),
        TimeFormat::TwentyFourHour => local.format("%H:%M").to_string(),
    }
}
