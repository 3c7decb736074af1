use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The bridge's error taxonomy. Every fallible operation in the core crates
/// resolves to one of these variants so that the orchestrator can apply the
/// `ignore_*` policy for the ones that are recoverable.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("source error: {0}")]
    Source(String),

    #[error("source connection timed out after {0:?}")]
    SourceConnectionTimeout(std::time::Duration),

    #[error("replay storage error: {0}")]
    ReplayStorage(String),

    #[error("message sink error: {0}")]
    MessageSink(String),

    #[error("invalid routing condition: {0}")]
    InvalidRoutingCondition(String),

    /// Orderly shutdown signal observed at a suspension point. Not a failure;
    /// carried as an error so it can propagate through `?` at pull sites.
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
