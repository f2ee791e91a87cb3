// Configuration module for ridx
// Reads from environment variables with sensible defaults

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
///
/// The three thresholds are the constants the resolution pipeline was
/// tuned with; overridable, but the defaults are the observed values.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum line distance between the query cursor and a candidate
    /// access chain (RIDX_PROXIMITY_LINES)
    pub proximity_lines: u32,

    /// Minimum number of canonical path segments a traced reference
    /// must resolve through (RIDX_MIN_CANONICAL_HOPS)
    pub min_canonical_hops: usize,

    /// Maximum reference name length in bytes (RIDX_MAX_REFERENCE_LENGTH)
    pub max_reference_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proximity_lines: 5,
            min_canonical_hops: 5,
            max_reference_length: 64,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(val) = env::var("RIDX_PROXIMITY_LINES") {
            if let Ok(parsed) = val.parse() {
                config.proximity_lines = parsed;
            } else {
                eprintln!(
                    "ridx: Warning: Invalid RIDX_PROXIMITY_LINES value: {}, using default: {}",
                    val, config.proximity_lines
                );
            }
        }

        if let Ok(val) = env::var("RIDX_MIN_CANONICAL_HOPS") {
            if let Ok(parsed) = val.parse() {
                config.min_canonical_hops = parsed;
            } else {
                eprintln!(
                    "ridx: Warning: Invalid RIDX_MIN_CANONICAL_HOPS value: {}, using default: {}",
                    val, config.min_canonical_hops
                );
            }
        }

        if let Ok(val) = env::var("RIDX_MAX_REFERENCE_LENGTH") {
            if let Ok(parsed) = val.parse() {
                config.max_reference_length = parsed;
            } else {
                eprintln!(
                    "ridx: Warning: Invalid RIDX_MAX_REFERENCE_LENGTH value: {}, using default: {}",
                    val, config.max_reference_length
                );
            }
        }

        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}
