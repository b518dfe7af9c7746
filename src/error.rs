//! Error types (thiserror-based).

use std::path::PathBuf;

use thiserror::Error;

/// Decode and audio output failures.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to open file: {0}")]
    FileOpen(#[from] std::io::Error),

    #[error("Failed to probe format: {0}")]
    Probe(String),

    #[error("No default track found")]
    NoTrack,

    #[error("No sample rate in track")]
    NoSampleRate,

    #[error("Failed to create decoder: {0}")]
    Decoder(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("No audio output device found")]
    NoOutputDevice,

    #[error("Failed to get output config: {0}")]
    OutputConfig(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to build output stream: {0}")]
    StreamBuild(String),

    #[error("Failed to start stream: {0}")]
    StreamPlay(String),

    #[error("Failed to spawn audio thread: {0}")]
    Thread(String),
}

/// Configuration file failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Local failures of a cut request. None of these are ever sent across the
/// cutter channel.
#[derive(Error, Debug)]
pub enum CutError {
    #[error("No region selected")]
    InactiveRegion,

    #[error("No file found")]
    NoSource,

    #[error("A cut is already in progress")]
    JobInFlight,

    #[error("Video cutter not available")]
    ChannelUnavailable,

    #[error("Failed to encode cut request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures inside the cut worker. Reported to the page as an `error` status.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("invalid range {start}..{end}")]
    InvalidRange { start: f64, end: f64 },

    #[error("invalid output name {0:?}")]
    InvalidFilename(String),

    #[error("malformed request: {0}")]
    Request(#[from] serde_json::Error),

    #[error("failed to run ffmpeg: {0}")]
    Io(#[from] std::io::Error),

    #[error("ffmpeg exited with {status}: {stderr}")]
    Ffmpeg { status: String, stderr: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_error_texts_match_notifications() {
        assert_eq!(CutError::NoSource.to_string(), "No file found");
        assert_eq!(
            CutError::ChannelUnavailable.to_string(),
            "Video cutter not available"
        );
    }

    #[test]
    fn worker_range_display() {
        let err = WorkerError::InvalidRange {
            start: 5.0,
            end: 2.5,
        };
        assert_eq!(err.to_string(), "invalid range 5..2.5");
    }

    #[test]
    fn io_converts_into_audio_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AudioError = io_err.into();
        assert!(matches!(err, AudioError::FileOpen(_)));
    }
}
