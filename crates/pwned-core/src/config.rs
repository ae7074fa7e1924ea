use std::path::PathBuf;

/// Default worker count, matching the original revision thread default.
pub const DEFAULT_WORKERS: usize = 64;
/// Operator-configurable worker count bound.
pub const MAX_WORKERS: usize = 256;

/// Configuration of the compact binary Dataset Layout variant (§4.2/§4.4).
/// `file_code_length` is the number of leading hex digits shared by every
/// prefix in one group file; `count_byte_width` bounds the stored leak
/// count.
#[cfg(feature = "binary-layout")]
#[derive(Debug, Clone, Copy)]
pub struct BinaryLayoutConfig {
    pub file_code_length: usize,
    pub count_byte_width: pwned_record::binary::CountByteWidth,
}

#[cfg(feature = "binary-layout")]
impl Default for BinaryLayoutConfig {
    fn default() -> Self {
        Self {
            file_code_length: 3,
            count_byte_width: pwned_record::binary::CountByteWidth::Four,
        }
    }
}

/// Engine-wide configuration: where data lives and how many cooperative
/// workers fetch it.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub resource_dir: PathBuf,
    pub workers: usize,
    #[cfg(feature = "binary-layout")]
    pub binary_layout: Option<BinaryLayoutConfig>,
}

impl MirrorConfig {
    pub fn new(resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dir: resource_dir.into(),
            workers: DEFAULT_WORKERS,
            #[cfg(feature = "binary-layout")]
            binary_layout: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    #[cfg(feature = "binary-layout")]
    pub fn with_binary_layout(mut self, layout: BinaryLayoutConfig) -> Self {
        self.binary_layout = Some(layout);
        self
    }
}
