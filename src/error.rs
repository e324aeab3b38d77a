use std::io;

use thiserror::Error;

pub const EXIT_DOWNLOAD: i32 = 1;
pub const EXIT_PLAYBACK: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 3;

/// Anything that went wrong talking to the listing or metadata endpoints.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{url} answered HTTP status {status}{}", body_suffix(.body))]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("unexpected payload from {url}: {reason}")]
    Payload { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to launch {player}: {source}")]
    Launch {
        player: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting on {player}: {source}")]
    Wait {
        player: String,
        #[source]
        source: io::Error,
    },

    #[error("interrupted")]
    Cancelled,
}

fn body_suffix(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        let truncated = body.chars().take(240).collect::<String>();
        format!(" ({truncated})")
    }
}

pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(playback) = err.downcast_ref::<PlaybackError>() {
        return match playback {
            PlaybackError::Cancelled => EXIT_INTERRUPTED,
            PlaybackError::Launch { .. } | PlaybackError::Wait { .. } => EXIT_PLAYBACK,
        };
    }
    EXIT_DOWNLOAD
}
