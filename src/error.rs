use thiserror::Error;

/// Content source failures. Recovered locally by installing the built-in
/// seed catalog; never fatal to the caller.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("content source unavailable: {0}")]
    Unavailable(String),

    #[error("content source yielded no parseable rows")]
    Empty,
}

/// Durable-store failures. Logged at the component boundary; the in-memory
/// state remains the source of truth and the previous persisted blob stays
/// intact (every write replaces a whole serialized record).
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("durable store read failed: {0}")]
    Read(String),

    #[error("durable store write failed: {0}")]
    Write(String),

    #[error("persisted record is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type EngineResult<T> = Result<T, EngineError>;
