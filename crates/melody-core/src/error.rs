use std::path::PathBuf;

/// Errors surfaced by scale construction, option validation and file I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown mode: {0}")]
    UnknownMode(String),

    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("invalid scale pattern: {0}")]
    InvalidPattern(String),

    #[error("pitch {0} is outside the MIDI range 0..=127")]
    PitchOutOfRange(i32),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("MIDI error: {0}")]
    Midi(String),
}

pub type Result<T> = std::result::Result<T, Error>;
