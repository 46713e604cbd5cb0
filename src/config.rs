//! Tunables for the stream reader and its block cache.
//!
//! Parsed from the command line (and `STREAMREADER_`-prefixed environment
//! variables) for the demo binary; library users construct a [`ReaderConfig`]
//! directly with `ReaderConfig::default()` or explicit fields.

use clap::Parser;

/// Number of objects fetched per `get_objects` call when extending the index
/// window without data (§4.3).
pub const GET_OBJECT_STEP: usize = 4;

/// Initial/baseline readahead size: 512 KiB.
pub const DEFAULT_READAHEAD_SIZE: u64 = 512 * 1024;

/// Ceiling the readahead controller's geometric growth saturates at: 32 MiB.
pub const MAX_READAHEAD_SIZE: u64 = 32 * 1024 * 1024;

/// How long the readahead controller holds at the baseline size after a
/// reset before it's willing to grow again.
pub const READAHEAD_RESET_COOLDOWN_SECS: u64 = 60;

/// Retry budget for a single `read()` call after a retryable error (§4.1,
/// §7): one retry, with the index window reset first.
pub const READ_RETRY_BUDGET: u32 = 1;

/// Default number of blocks kept pinned-or-cached across all streams sharing
/// one [`crate::cache::BlockCache`].
pub const DEFAULT_BLOCK_CACHE_CAPACITY: usize = crate::cache::DEFAULT_CACHE_CAPACITY;

/// Runtime configuration for a [`crate::stream::StreamReader`].
#[derive(Parser, Debug, Clone)]
#[command(name = "streamreader")]
#[command(author, version, about, long_about = None)]
pub struct ReaderConfig {
    /// Objects fetched per index-window extension call.
    #[arg(long, default_value_t = GET_OBJECT_STEP, env = "STREAMREADER_GET_OBJECT_STEP")]
    pub get_object_step: usize,

    /// Baseline readahead size in bytes.
    #[arg(long, default_value_t = DEFAULT_READAHEAD_SIZE, env = "STREAMREADER_DEFAULT_READAHEAD_SIZE")]
    pub default_readahead_size: u64,

    /// Maximum readahead size in bytes the controller will grow to.
    #[arg(long, default_value_t = MAX_READAHEAD_SIZE, env = "STREAMREADER_MAX_READAHEAD_SIZE")]
    pub max_readahead_size: u64,

    /// Cooldown, in seconds, before the readahead controller regrows past
    /// baseline after a reset.
    #[arg(long, default_value_t = READAHEAD_RESET_COOLDOWN_SECS, env = "STREAMREADER_READAHEAD_COOLDOWN_SECS")]
    pub readahead_cooldown_secs: u64,

    /// Retries permitted for one `read()` call after a retryable error.
    #[arg(long, default_value_t = READ_RETRY_BUDGET, env = "STREAMREADER_READ_RETRY_BUDGET")]
    pub read_retry_budget: u32,

    /// Maximum number of data blocks held across all streams sharing the
    /// block cache.
    #[arg(long, default_value_t = DEFAULT_BLOCK_CACHE_CAPACITY, env = "STREAMREADER_CACHE_CAPACITY")]
    pub cache_capacity: usize,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            get_object_step: GET_OBJECT_STEP,
            default_readahead_size: DEFAULT_READAHEAD_SIZE,
            max_readahead_size: MAX_READAHEAD_SIZE,
            readahead_cooldown_secs: READAHEAD_RESET_COOLDOWN_SECS,
            read_retry_budget: READ_RETRY_BUDGET,
            cache_capacity: DEFAULT_BLOCK_CACHE_CAPACITY,
            verbose: false,
        }
    }
}

impl ReaderConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.get_object_step == 0 {
            return Err("get_object_step must be greater than 0".to_string());
        }
        if self.default_readahead_size == 0 {
            return Err("default_readahead_size must be greater than 0".to_string());
        }
        if self.max_readahead_size < self.default_readahead_size {
            return Err("max_readahead_size must be >= default_readahead_size".to_string());
        }
        if self.cache_capacity == 0 {
            return Err("cache_capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ReaderConfig::default().validate().is_ok());
    }

    #[test]
    fn max_below_default_rejected() {
        let mut config = ReaderConfig::default();
        config.max_readahead_size = config.default_readahead_size - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_get_object_step_rejected() {
        let mut config = ReaderConfig::default();
        config.get_object_step = 0;
        assert!(config.validate().is_err());
    }
}
