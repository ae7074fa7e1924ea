use thiserror::Error;

/// Engine-level error kinds, per the error handling design: each wraps an
/// opaque description rather than the underlying typed error, since
/// `Revision::error` is itself an opaque failure description.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid prefix: {0}")]
    InvalidPrefix(#[from] pwned_prefix::PrefixError),
    #[error("no active dataset")]
    NotInitialized,
    #[error("dataset file corrupted: {0}")]
    Corrupted(String),
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("update cancelled")]
    Cancelled,
    #[error(transparent)]
    Record(#[from] pwned_record::RecordError),
}

impl From<pwned_provider::ProviderError> for EngineError {
    fn from(e: pwned_provider::ProviderError) -> Self {
        EngineError::ProviderUnavailable(e.to_string())
    }
}

impl From<pwned_dataset::DatasetError> for EngineError {
    fn from(e: pwned_dataset::DatasetError) -> Self {
        match e {
            pwned_dataset::DatasetError::Io(io) => EngineError::Io(io.to_string()),
            pwned_dataset::DatasetError::Corrupted(msg) => EngineError::Corrupted(msg),
            #[cfg(feature = "binary-layout")]
            pwned_dataset::DatasetError::Record(r) => EngineError::Record(r),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
