//! CLI Command Handlers
//!
//! Implements all CLI commands by calling the catalog, resolver, EPG client
//! and player. Each handler takes CLI args, the loaded config and Output,
//! and returns an ExitCode.

use std::collections::HashMap;

use anyhow::Context;
use chrono::Utc;

use crate::api::{EpgClient, FetchError};
use crate::catalog::{Catalog, COUNTRIES};
use crate::cli::{
    validate_channel, ChannelsCmd, EventsCmd, ExitCode, LookupCmd, MatchCmd, Output, PlayCmd,
    PlayResponse, ResolveCmd, ResolvedStream, UpcomingCmd,
};
use crate::config::Config;
use crate::matching::{self, MatchReport};
use crate::models::{DirectoryEntry, EventListing, MediaDescriptor, UpcomingProgramme};
use crate::resolver::{ResolveError, Resolver, StreamTarget};
use crate::stream::{LocalPlayer, PlayerError, PlayerType};

// =============================================================================
// Error Mapping
// =============================================================================

fn fetch_exit_code(e: &FetchError) -> ExitCode {
    match e {
        FetchError::Network(_) | FetchError::Status(_) => ExitCode::NetworkError,
        FetchError::Parse(_) => ExitCode::UpstreamChanged,
    }
}

fn resolve_exit_code(e: &ResolveError) -> ExitCode {
    match e {
        ResolveError::Network { .. } => ExitCode::NetworkError,
        ResolveError::UpstreamShapeChanged { .. } => ExitCode::UpstreamChanged,
        ResolveError::InvalidStreamLink(_) => ExitCode::NotFound,
    }
}

/// Print `data`, turning a serialization failure into an error exit
fn emit<T: serde::Serialize>(output: &Output, data: T, text: impl FnOnce(&T) -> String) -> ExitCode {
    match output.print(data, text) {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}

fn render_entries(entries: &[DirectoryEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            if e.is_leaf {
                format!("{:<40} {}", e.title, e.reference)
            } else {
                format!("{}/", e.title)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Channels / Countries
// =============================================================================

pub async fn channels_cmd(cmd: ChannelsCmd, config: &Config, output: &Output) -> ExitCode {
    let catalog = Catalog::new(config);
    let adult = cmd.adult || config.adult_enabled();

    let result = match cmd.country.as_deref() {
        Some(country) => {
            output.info(format!("Fetching {} channels...", country));
            catalog.country_channels(country, adult).await
        }
        None => {
            output.info("Fetching channels...");
            catalog.channels(adult).await
        }
    };

    match result {
        Ok(channels) => {
            let entries: Vec<DirectoryEntry> = channels.iter().map(DirectoryEntry::from).collect();
            emit(output, entries, |e| render_entries(e))
        }
        Err(e) => output.error(format!("Channel list failed: {}", e), fetch_exit_code(&e)),
    }
}

pub fn countries_cmd(output: &Output) -> ExitCode {
    let entries: Vec<DirectoryEntry> = COUNTRIES
        .iter()
        .map(|c| DirectoryEntry::folder(format!("{} TV", c), *c))
        .collect();
    emit(output, entries, |e| render_entries(e))
}

// =============================================================================
// Schedule
// =============================================================================

pub async fn categories_cmd(config: &Config, output: &Output) -> ExitCode {
    let catalog = Catalog::new(config);
    output.info("Fetching schedule...");

    match catalog.categories().await {
        Ok(names) => {
            let entries: Vec<DirectoryEntry> = names
                .into_iter()
                .map(|n| DirectoryEntry::folder(n.clone(), n))
                .collect();
            emit(output, entries, |e| render_entries(e))
        }
        Err(e) => output.error(format!("Schedule failed: {}", e), fetch_exit_code(&e)),
    }
}

fn render_events(events: &[EventListing]) -> String {
    let mut out = Vec::new();
    for event in events {
        out.push(event.title.clone());
        for channel in &event.channels {
            out.push(format!("    {:<36} {}", channel.channel_name, channel.channel_id));
        }
    }
    out.join("\n")
}

pub async fn events_cmd(cmd: EventsCmd, config: &Config, output: &Output) -> ExitCode {
    let catalog = Catalog::new(config);
    output.info(format!("Fetching {} events...", cmd.category));

    let result = if cmd.nba {
        catalog.nba_events(&cmd.category).await
    } else {
        catalog.events(&cmd.category).await
    };

    match result {
        Ok(events) if events.is_empty() => output.error(
            format!("No events found for '{}'", cmd.category),
            ExitCode::NotFound,
        ),
        Ok(events) => emit(output, events, |e| render_events(e)),
        Err(e) => output.error(format!("Schedule failed: {}", e), fetch_exit_code(&e)),
    }
}

// =============================================================================
// Resolve / Play
// =============================================================================

async fn resolve_channel(
    channel: &str,
    config: &Config,
    output: &Output,
) -> Result<MediaDescriptor, ExitCode> {
    let channel = validate_channel(channel).map_err(|e| output.error(e, ExitCode::InvalidArgs))?;
    let target = StreamTarget::parse(channel);

    output.info(format!("Resolving {}...", target));
    Resolver::new(config)
        .resolve(&target)
        .await
        .map_err(|e| output.error(format!("Resolve failed: {}", e), resolve_exit_code(&e)))
}

pub async fn resolve_cmd(cmd: ResolveCmd, config: &Config, output: &Output) -> ExitCode {
    let media = match resolve_channel(&cmd.channel, config, output).await {
        Ok(media) => media,
        Err(code) => return code,
    };

    let response = ResolvedStream {
        playback_url: media.to_playback_url(),
        url: media.url,
        headers: media.headers,
    };
    emit(output, response, |r| r.playback_url.clone())
}

/// Player from the flag, else the configured one, else the default
fn choose_player(cmd: &PlayCmd, config: &Config) -> Result<PlayerType, PlayerError> {
    match (cmd.player, config.player.as_deref()) {
        (Some(choice), _) => Ok(choice.into()),
        (None, Some(configured)) => configured.parse(),
        (None, None) => Ok(PlayerType::default()),
    }
}

pub async fn play_cmd(cmd: PlayCmd, config: &Config, output: &Output) -> ExitCode {
    let player_type = match choose_player(&cmd, config) {
        Ok(p) => p,
        Err(e) => return output.error(e.to_string(), ExitCode::InvalidArgs),
    };
    let player = LocalPlayer::new(player_type);

    if !player.is_available().await {
        return output.error(
            format!("{} not found. Install it first.", player_type.display_name()),
            ExitCode::PlayerFailed,
        );
    }

    let media = match resolve_channel(&cmd.channel, config, output).await {
        Ok(media) => media,
        Err(code) => return code,
    };

    output.info(format!("Opening in {}...", player_type.display_name()));

    let launched = if cmd.wait {
        player.play_and_wait(&media).await
    } else {
        player.play(&media).map(|_child| ())
    };
    if let Err(e) = launched {
        return output.error(format!("Failed to start player: {}", e), ExitCode::PlayerFailed);
    }

    let response = PlayResponse {
        status: if cmd.wait { "finished" } else { "playing" }.to_string(),
        player: player_type.display_name().to_string(),
        url: media.url,
    };
    emit(output, response, |r| format!("{} in {}", r.status, r.player))
}

// =============================================================================
// EPG
// =============================================================================

fn render_programmes(programmes: &[UpcomingProgramme]) -> String {
    programmes
        .iter()
        .map(|p| format!("{}  {}\n          {}", p.start, p.title, p.desc))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn upcoming_cmd(cmd: UpcomingCmd, config: &Config, output: &Output) -> ExitCode {
    // Accept a directory name from the built-in table as well as a raw id
    let channel_id: &str = matching::epg_id_for(&cmd.channel).unwrap_or(cmd.channel.as_str());
    output.info(format!("Fetching guide for {}...", channel_id));

    let client = EpgClient::new(config);
    let programmes = client.upcoming(channel_id, Utc::now().naive_utc()).await;

    if programmes.is_empty() {
        return output.error(
            format!("No upcoming programmes for '{}'", channel_id),
            ExitCode::NotFound,
        );
    }
    emit(output, programmes, |p| render_programmes(p))
}

async fn names_to_match(cmd: &MatchCmd, config: &Config) -> anyhow::Result<Vec<String>> {
    match &cmd.names {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(matching::parse_name_list(&text))
        }
        None => {
            let channels = Catalog::new(config)
                .channels(config.adult_enabled())
                .await
                .context("Failed to fetch channel directory")?;
            Ok(channels.into_iter().map(|c| c.display_name).collect())
        }
    }
}

fn render_report(report: &MatchReport) -> String {
    let mut lines: Vec<String> = report
        .matches
        .iter()
        .map(|(name, id)| format!("{:<40} {}", name, id))
        .collect();
    if !report.unmatched.is_empty() {
        lines.push(String::new());
        lines.push(format!("Unmatched ({}):", report.unmatched.len()));
        lines.extend(report.unmatched.iter().map(|n| format!("    {}", n)));
    }
    lines.join("\n")
}

pub async fn match_cmd(cmd: MatchCmd, config: &Config, output: &Output) -> ExitCode {
    let names = match names_to_match(&cmd, config).await {
        Ok(names) => names,
        Err(e) => return output.error(format!("{:#}", e), ExitCode::Error),
    };

    output.info("Downloading EPG feed...");
    let feed = match EpgClient::new(config).fetch().await {
        Ok(feed) => feed,
        Err(e) => return output.error(format!("EPG failed: {}", e), fetch_exit_code(&e)),
    };
    let index: HashMap<String, String> = feed.display_name_index();

    let report = matching::auto_match(&names, &index);
    output.info(format!(
        "Matched {} channels, {} unmatched",
        report.matches.len(),
        report.unmatched.len()
    ));

    if cmd.source {
        emit(output, report, |r| r.to_table_source())
    } else {
        emit(output, report, |r| render_report(r))
    }
}

pub fn lookup_cmd(cmd: LookupCmd, output: &Output) -> ExitCode {
    match matching::epg_id_for(&cmd.name) {
        Some(id) => emit(output, DirectoryEntry::playable(cmd.name, id), |e| e.reference.clone()),
        None => output.error(format!("No EPG id for '{}'", cmd.name), ExitCode::NotFound),
    }
}
