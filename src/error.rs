// Error types shared by the player, loader, output devices and settings
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The output device (or the settings) cannot carry the PCM format
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("No output device available")]
    NoOutputDevice,

    /// Device enumeration, stream build or stream start failed
    #[error("Audio output error: {0}")]
    Device(String),

    /// The track could not be opened (missing, permission denied, locked)
    #[error("Failed to open audio file {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// RIFF header could not be parsed in chunk mode
    #[error("Invalid WAV header: {0}")]
    Header(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Config(String),

    #[error("Playback worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, Error>;
