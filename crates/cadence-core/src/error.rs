//! Shared error type for the scheduler core.
//!
//! Error kinds follow the scheduler's error handling design: `Validation`
//! and `Parse` are caller mistakes (never swallowed by the engine),
//! `NotFound` and `Conflict` surface the relevant id, and `Store` /
//! `Evaluator` originate from collaborators and are caught and logged at
//! the engine's fire boundary rather than propagated (see `engine.rs`).

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store: {0}")]
    Store(String),

    #[error("evaluator: {0}")]
    Evaluator(String),

    #[error("parse: {0}")]
    Parse(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
