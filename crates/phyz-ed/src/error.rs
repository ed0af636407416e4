//! Error types for basis construction, term application, and solvers.

use thiserror::Error;

/// Errors raised by the exact-diagonalization core.
#[derive(Debug, Error)]
pub enum EdError {
    /// Out-of-range sector, malformed permutation, size mismatch, ...
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A term with the wrong arity, overlapping or out-of-range sites.
    #[error("invalid term {kind} on sites {sites:?}: {reason}")]
    InvalidTerm {
        kind: String,
        sites: Vec<usize>,
        reason: String,
    },

    /// Complex data requested in a real-valued computation.
    #[error("numeric incompatibility: {0}")]
    NumericCompatibility(String),

    /// The term cannot act between the given pair of blocks.
    #[error("unsupported pairing: {0}")]
    UnsupportedPairing(String),

    /// Rank disagreement or buffer mismatch in a collective operation.
    #[error("distributed failure: {0}")]
    Distributed(String),

    /// An inner error with added context.
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<EdError>,
    },
}

impl EdError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Wrap `self` with an outer context message.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error of the causal chain.
    pub fn root(&self) -> &EdError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Render the full chain, outermost first, as `a: b: c`.
    pub fn chain(&self) -> String {
        match self {
            Self::Context { context, source } => format!("{context}: {}", source.chain()),
            other => other.to_string(),
        }
    }
}

/// Result alias for the exact-diagonalization core.
pub type Result<T> = std::result::Result<T, EdError>;

/// Attach context to the error of a `Result`.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| e.context(f()))
    }
}
