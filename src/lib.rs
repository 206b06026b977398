//! livetv - Browse and play live TV and sports streams
//!
//! Lists a site's 24/7 channels and sports schedule, resolves a channel into
//! a playable stream through a chain of dependent page fetches, and hands the
//! result to a local player.
//!
//! # Modules
//!
//! - `models` - Channels, schedule, media descriptor, EPG and listing types
//! - `config` - TOML configuration with environment overrides
//! - `cache` - Time-bounded, single-flight fetch cache
//! - `api` - Site (channel directory, schedule) and EPG clients
//! - `catalog` - Cached, filtered listings
//! - `resolver` - Multi-hop stream resolution
//! - `matching` - Channel name to EPG id matching
//! - `stream` - Local player sink
//! - `cli` / `commands` - Command line surface

pub mod api;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod matching;
pub mod models;
pub mod resolver;
pub mod stream;

// Re-export commonly used types
pub use models::{
    Category, ChannelRef, DirectoryEntry, EpgChannel, EventChannel, EventListing,
    MediaDescriptor, Programme, Schedule, ScheduleEvent, UpcomingProgramme,
};

pub use api::{EpgClient, FetchError, SiteClient};
pub use cache::FetchCache;
pub use catalog::Catalog;
pub use config::Config;
pub use resolver::{ResolveError, Resolver, StreamTarget};
pub use stream::{LocalPlayer, PlayerType};
