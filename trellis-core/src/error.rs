//! Error types for binding, compilation and section lifecycle.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while compiling, binding or driving a view.
///
/// Compile errors (`UnterminatedQuote`, `UnknownFilter`, `MultiplePublish`)
/// abort the one marker they belong to. Lifecycle errors are returned to the
/// caller that requested the transition.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unterminated quote in expression `{0}`")]
    UnterminatedQuote(String),

    #[error("unknown filter `{0}`")]
    UnknownFilter(String),

    #[error("expression `{0}` declares more than one publish target")]
    MultiplePublish(String),

    #[error("cannot publish to `{0}`")]
    NotWritable(String),

    #[error("scoped key `{0}` is read-only")]
    ReadOnlyScope(String),

    #[error("no change notifier configured; rendering statically")]
    NoObserverConfigured,

    #[error("section has been destroyed")]
    SectionDestroyed,

    #[error("template source must be a single element, found {0} top-level nodes")]
    FragmentRoots(usize),

    #[error("invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    #[error("directive failed: {0}")]
    Directive(String),

    #[error("marker `{attribute}`: {source}")]
    Marker {
        attribute: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an error with the attribute name of the marker it came from.
    pub fn in_marker(self, attribute: impl Into<String>) -> Self {
        Error::Marker {
            attribute: attribute.into(),
            source: Box::new(self),
        }
    }

    /// Strip any marker wrapping and return the underlying error.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Marker { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
