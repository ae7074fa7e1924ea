#![forbid(unsafe_code)]

//! Range Provider: the capability the Mirror Engine fetches prefix ranges
//! through. `Box<dyn RangeProvider>` is chosen once at startup from
//! configuration (upstream, file import, or mock), the same shape as a
//! pluggable transport.

mod file_importer;
mod mock;
mod upstream;

pub use file_importer::FileRangeImporter;
pub use mock::MockProvider;
pub use upstream::UpstreamClient;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error reading provider source: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Yields one prefix's range body: records sorted by suffix ascending,
/// `\n`-separated, no trailing newline. Line terminators from any HTTP
/// source must already be normalized (`\r\n` -> `\n`) by the implementation.
#[async_trait]
pub trait RangeProvider: Send + Sync {
    async fn get_range(&self, prefix: &str) -> Result<String>;
}
