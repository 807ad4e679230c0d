use thiserror::Error;

/// Convenience result type for iterator and script operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Error type returned by the scripted iterators.
///
/// Configuration and compile errors surface while an iterator is being initialized; the host
/// aborts iterator setup when it sees one. Script errors surface later, while entries are being
/// pulled, and are fatal for the scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A required option is missing, malformed, or did not evaluate to a callable.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The script source failed to parse or its top-level statements failed to evaluate.
    #[error("compile error: {source}")]
    Compile {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A user function raised an error while processing entries.
    #[error("script error: {0}")]
    Script(#[from] Box<rhai::EvalAltResult>),

    /// An iterator setting could not be decoded.
    #[error("invalid iterator setting: {0}")]
    InvalidSetting(#[from] serde_json::Error),
}

impl ScanError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn compile(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Compile {
            source: Box::new(source),
        }
    }
}
