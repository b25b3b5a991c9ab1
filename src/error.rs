use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileWatchError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Camera Error: {0}")]
    Camera(String),

    #[error("Move Edit Error: {0}")]
    Edit(String),

    #[error("No Such Move: {0}")]
    NoSuchMove(usize),

    #[error("Engine Stopped")]
    EngineStopped,
}

pub type TwResult<T> = Result<T, TileWatchError>;
