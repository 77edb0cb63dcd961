use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no scenario selected")]
    NoScenario,

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error("invalid job request: {0}")]
    InvalidJob(String),
}

/// Failure reported by an external collaborator (job service, metrics sink).
#[derive(Debug, Error)]
pub enum CollabError {
    #[error("{service} rejected the request: {reason}")]
    Rejected {
        service: &'static str,
        reason:  String,
    },

    #[error("{0} is unavailable")]
    Unavailable(&'static str),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("snapshot store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
