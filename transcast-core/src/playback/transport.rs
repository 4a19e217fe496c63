use std::fmt;

use serde::Serialize;

/// How a stream URL is handed to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackTransport {
    /// Adaptive HTTP streaming (`.m3u8` playlists).
    Hls,
    /// MPEG-DASH manifests (`.mpd`).
    Dash,
    /// Direct progressive download of a single file.
    Progressive,
}

impl PlaybackTransport {
    pub fn mime_type(&self) -> &'static str {
        match self {
            PlaybackTransport::Hls => "application/x-mpegURL",
            PlaybackTransport::Dash => "application/dash+xml",
            PlaybackTransport::Progressive => "video/mp4",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackTransport::Hls => "hls",
            PlaybackTransport::Dash => "dash",
            PlaybackTransport::Progressive => "progressive",
        }
    }
}

impl fmt::Display for PlaybackTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the transport from the URL path suffix. Query string and fragment
/// are ignored and the comparison is case-insensitive.
pub fn select_transport(stream_url: &str) -> PlaybackTransport {
    let path = stream_url
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if path.ends_with(".m3u8") {
        PlaybackTransport::Hls
    } else if path.ends_with(".mpd") {
        PlaybackTransport::Dash
    } else {
        PlaybackTransport::Progressive
    }
}
