//! Local Player - VLC/mpv playback support
//!
//! Players fetch the stream themselves, so the descriptor's headers travel
//! as command-line flags rather than as a pipe suffix on the URL.

use std::process::Stdio;
use std::str::FromStr;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::models::MediaDescriptor;

/// Supported local players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerType {
    /// mpv media player (default, replays every header)
    #[default]
    Mpv,
    /// VLC media player (Referer and User-Agent only)
    Vlc,
}

impl PlayerType {
    /// Get the command name for this player
    pub fn command(&self) -> &'static str {
        match self {
            PlayerType::Vlc => {
                // On macOS, VLC is an app bundle - check for it
                #[cfg(target_os = "macos")]
                if std::path::Path::new("/Applications/VLC.app").exists() {
                    return "/Applications/VLC.app/Contents/MacOS/VLC";
                }
                "vlc"
            }
            PlayerType::Mpv => "mpv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerType::Vlc => "VLC",
            PlayerType::Mpv => "mpv",
        }
    }

    /// Player arguments for a descriptor: the bare URL followed by header flags
    pub fn args(&self, media: &MediaDescriptor) -> Vec<String> {
        let mut args = vec![media.url.clone()];
        let referer = media.header("Referer");
        let user_agent = media.header("User-Agent");

        match self {
            PlayerType::Mpv => {
                if let Some(referer) = referer {
                    args.push(format!("--referrer={}", referer));
                }
                if let Some(ua) = user_agent {
                    args.push(format!("--user-agent={}", ua));
                }
                let extra: Vec<String> = media
                    .headers
                    .iter()
                    .filter(|(name, _)| {
                        !name.eq_ignore_ascii_case("Referer") && !name.eq_ignore_ascii_case("User-Agent")
                    })
                    .map(|(name, value)| format!("{}: {}", name, value))
                    .collect();
                if !extra.is_empty() {
                    args.push(format!("--http-header-fields={}", extra.join(",")));
                }
                args.push("--force-window=immediate".to_string());
            }
            PlayerType::Vlc => {
                if let Some(referer) = referer {
                    args.push(format!("--http-referrer={}", referer));
                }
                if let Some(ua) = user_agent {
                    args.push(format!("--http-user-agent={}", ua));
                }
                args.push("--no-video-title-show".to_string());
            }
        }
        args
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for PlayerType {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mpv" => Ok(PlayerType::Mpv),
            "vlc" => Ok(PlayerType::Vlc),
            other => Err(PlayerError::Unsupported(other.to_string())),
        }
    }
}

/// Errors from local player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
    #[error("Unsupported player '{0}' (expected mpv or vlc)")]
    Unsupported(String),
}

/// Local player for resolved streams
pub struct LocalPlayer {
    player_type: PlayerType,
}

impl LocalPlayer {
    pub fn new(player_type: PlayerType) -> Self {
        Self { player_type }
    }

    pub fn player_type(&self) -> PlayerType {
        self.player_type
    }

    /// Check if the player is available on the system
    pub async fn is_available(&self) -> bool {
        let cmd = self.player_type.command();

        // If it's a full path (macOS app bundle), check if it exists
        if cmd.starts_with('/') {
            return std::path::Path::new(cmd).exists();
        }

        Command::new("which")
            .arg(cmd)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Launch the player on a descriptor and return the child process
    pub fn play(&self, media: &MediaDescriptor) -> Result<Child, PlayerError> {
        let args = self.player_type.args(media);
        debug!(player = %self.player_type, ?args, "launching player");

        let mut cmd = Command::new(self.player_type.command());
        cmd.args(&args);
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerError::NotFound(self.player_type.command().to_string())
            } else {
                PlayerError::StartFailed(e)
            }
        })
    }

    /// Play and wait for the player to close
    pub async fn play_and_wait(&self, media: &MediaDescriptor) -> Result<(), PlayerError> {
        let mut child = self.play(media)?;
        child.wait().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media() -> MediaDescriptor {
        MediaDescriptor {
            url: "https://top1.cdn.test/top1/premium51/mono.m3u8".to_string(),
            headers: vec![
                ("Referer".to_string(), "https://x.test/".to_string()),
                ("Origin".to_string(), "https://x.test".to_string()),
                ("Keep-Alive".to_string(), "true".to_string()),
                ("User-Agent".to_string(), "Mozilla/5.0 (X11)".to_string()),
            ],
        }
    }

    #[test]
    fn test_player_type_command() {
        // On macOS with VLC installed, returns full path; otherwise "vlc"
        let vlc_cmd = PlayerType::Vlc.command();
        assert!(vlc_cmd == "vlc" || vlc_cmd == "/Applications/VLC.app/Contents/MacOS/VLC");
        assert_eq!(PlayerType::Mpv.command(), "mpv");
    }

    #[test]
    fn test_player_type_parse() {
        assert_eq!("MPV".parse::<PlayerType>().unwrap(), PlayerType::Mpv);
        assert_eq!(" vlc ".parse::<PlayerType>().unwrap(), PlayerType::Vlc);
        assert!(matches!(
            "kodi".parse::<PlayerType>(),
            Err(PlayerError::Unsupported(_))
        ));
    }

    #[test]
    fn test_mpv_args_carry_all_headers() {
        let args = PlayerType::Mpv.args(&media());
        assert_eq!(
            args,
            vec![
                "https://top1.cdn.test/top1/premium51/mono.m3u8",
                "--referrer=https://x.test/",
                "--user-agent=Mozilla/5.0 (X11)",
                "--http-header-fields=Origin: https://x.test,Keep-Alive: true",
                "--force-window=immediate",
            ]
        );
    }

    #[test]
    fn test_vlc_args() {
        let args = PlayerType::Vlc.args(&media());
        assert_eq!(args[0], "https://top1.cdn.test/top1/premium51/mono.m3u8");
        assert!(args.contains(&"--http-referrer=https://x.test/".to_string()));
        assert!(args.contains(&"--http-user-agent=Mozilla/5.0 (X11)".to_string()));
        assert!(!args.iter().any(|a| a.contains("Origin")));
    }
}
