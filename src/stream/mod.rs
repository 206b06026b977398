//! Playback sink
//!
//! Hands a resolved [`MediaDescriptor`](crate::models::MediaDescriptor) to a
//! local player, translating its headers into the player's own flags.

pub mod player;

pub use player::{LocalPlayer, PlayerError, PlayerType};
