//! Session policy knobs.
//!
//! Nothing here is a protocol requirement: the values only decide how long the
//! demuxer keeps looking for late headers and how much payload a muxer keeps
//! buffered per logical stream before cutting a page.

use std::env;
use std::str::FromStr;

/// Environment variable overriding [`DemuxerConfig::lookahead_limit`].
pub const LOOKAHEAD_LIMIT_ENV: &str = "XIPHKIT_LOOKAHEAD_LIMIT";

/// Environment variable overriding [`MuxerConfig::flush_threshold`].
pub const FLUSH_THRESHOLD_ENV: &str = "XIPHKIT_FLUSH_THRESHOLD";

/// Read-side configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemuxerConfig {
    /// Primary stream payload packets to observe with no new header activity
    /// before header discovery gives up on tentative companions.
    pub lookahead_limit: usize,
}

impl Default for DemuxerConfig {
    fn default() -> Self {
        Self { lookahead_limit: 10 }
    }
}

impl DemuxerConfig {
    /// Defaults, overridden by `XIPHKIT_LOOKAHEAD_LIMIT` when it is set and parses.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(limit) = env_value(LOOKAHEAD_LIMIT_ENV) {
            config.lookahead_limit = limit;
        }
        config
    }

    /// Sets `lookahead_limit`.
    pub fn with_lookahead_limit(mut self, limit: usize) -> Self {
        self.lookahead_limit = limit;
        self
    }
}

/// Write-side configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxerConfig {
    /// Pending payload bytes per logical stream above which a page is cut.
    pub flush_threshold: usize,
}

impl Default for MuxerConfig {
    fn default() -> Self {
        Self {
            flush_threshold: 16 * 1024,
        }
    }
}

impl MuxerConfig {
    /// Defaults, overridden by `XIPHKIT_FLUSH_THRESHOLD` when it is set and parses.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(threshold) = env_value(FLUSH_THRESHOLD_ENV) {
            config.flush_threshold = threshold;
        }
        config
    }

    /// Sets `flush_threshold`.
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }
}

fn env_value<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(DemuxerConfig::default().lookahead_limit, 10);
        assert_eq!(MuxerConfig::default().flush_threshold, 16 * 1024);
    }

    #[test]
    fn test_builders() {
        let demux = DemuxerConfig::default().with_lookahead_limit(3);
        assert_eq!(demux.lookahead_limit, 3);
        let mux = MuxerConfig::default().with_flush_threshold(512);
        assert_eq!(mux.flush_threshold, 512);
    }

    #[test]
    fn test_env_override() {
        env::set_var(FLUSH_THRESHOLD_ENV, "4096");
        assert_eq!(MuxerConfig::from_env().flush_threshold, 4096);
        env::set_var(FLUSH_THRESHOLD_ENV, "lots");
        assert_eq!(MuxerConfig::from_env().flush_threshold, 16 * 1024);
        env::remove_var(FLUSH_THRESHOLD_ENV);
    }
}
