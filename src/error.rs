use thiserror::Error;

#[derive(Error, Debug)]
pub enum CwError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No Morse pattern for character {0:?}")]
    NotFound(char),

    #[error("Player is busy playing")]
    Busy,

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CwError>;
