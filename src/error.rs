/// Errors raised by the search engine.
///
/// The four variants are deliberately coarse: each one is a distinct,
/// catchable failure category. Specifics travel in the message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed search space or an unsupported search configuration:
    /// empty value sets, unparsable values, an oversized parameter grid,
    /// zero sampling tries, references to unregistered random distribution
    /// generators, snapshotting requested, or a metric that is neither
    /// minimized nor maximized.
    #[error("invalid search configuration: {0}")]
    Config(String),

    /// The training data failed a precondition required by a collaborator.
    #[error("invalid data: {0}")]
    Data(String),

    /// The trainer or the cross-validation runner failed. The search aborts
    /// at the failing candidate with no partial result.
    #[error("training failed: {0}")]
    Trainer(String),

    /// An internal invariant was violated. This indicates a bug in the
    /// search engine, not bad user input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = core::result::Result<T, Error>;
