use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewerError>;

/// Why a model could not be brought into the scene.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("model fetch failed: {0}")]
    Fetch(String),

    #[error("failed to decode model: {0}")]
    Decode(#[from] tobj::LoadError),

    #[error("model contains no geometry")]
    EmptyModel,
}

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("model load failed: {0}")]
    Load(#[from] LoadError),

    #[error("load {ticket} superseded by load {current}")]
    StaleLoad { ticket: u64, current: u64 },

    #[error("no model is loaded")]
    ModelNotLoaded,

    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),
}
