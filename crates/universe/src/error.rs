use killwatch_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UniverseError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: u64 },

    #[error("decode error: {0}")]
    Decode(String),
}

impl From<UniverseError> for CoreError {
    fn from(e: UniverseError) -> Self {
        match e {
            UniverseError::NotFound { kind, id } => CoreError::not_found(kind, id),
            other => CoreError::Upstream(other.to_string()),
        }
    }
}
