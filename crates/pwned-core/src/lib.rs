//! Revision state machine, Mirror Engine, and Reader over a mirrored
//! range-addressable Pwned Password dataset.

mod config;
mod engine;
mod error;
mod revision;

#[cfg(feature = "binary-layout")]
pub use config::BinaryLayoutConfig;
pub use config::{MirrorConfig, DEFAULT_WORKERS, MAX_WORKERS};
pub use engine::{MirrorEngine, UpdateResult};
pub use error::{EngineError, Result};
pub use revision::{Revision, Status};
