use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiveSimError {
    #[error("Failed to read playlist {path}: {source}")]
    PlaylistReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid m3u8 file: {0}")]
    M3u8ParseError(String),

    #[error("Playlist is empty")]
    PlaylistEmpty,

    #[error("Playlist is full, capacity: {0}")]
    PlaylistFull(usize),

    #[error("No segment available for sliding")]
    EmptyRotation,

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

pub type LiveSimResult<T> = Result<T, LiveSimError>;
