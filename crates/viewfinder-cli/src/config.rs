use std::time::Duration;
use viewfinder_core::ProcessingParameters;
use viewfinder_hw::resolver::DEFAULT_MAX_PROBE;

/// Tool configuration, loaded from environment variables.
///
/// Processing parameters are fixed for the lifetime of a run; there is no
/// runtime adjustment channel. CLI flags override individual fields.
pub struct Config {
    /// Highest capture index the probe scan will try (exclusive).
    pub max_probe_index: u32,
    /// Edge-chain tunables.
    pub parameters: ProcessingParameters,
    /// Pull-loop cadence for preview.
    pub interval: Duration,
    /// Per-read bound before a source counts as stalled.
    pub read_timeout: Duration,
}

impl Config {
    /// Load configuration from `VIEWFINDER_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = ProcessingParameters::default();
        Self {
            max_probe_index: env_u32("VIEWFINDER_MAX_PROBE_INDEX", DEFAULT_MAX_PROBE),
            parameters: ProcessingParameters {
                low_threshold: env_u8("VIEWFINDER_LOW_THRESHOLD", defaults.low_threshold),
                high_threshold: env_u8("VIEWFINDER_HIGH_THRESHOLD", defaults.high_threshold),
                blur_kernel_size: env_u32("VIEWFINDER_BLUR_KERNEL", defaults.blur_kernel_size),
                aperture_size: env_u32("VIEWFINDER_APERTURE", defaults.aperture_size),
            },
            interval: Duration::from_millis(env_u64("VIEWFINDER_INTERVAL_MS", 30)),
            read_timeout: Duration::from_millis(env_u64("VIEWFINDER_READ_TIMEOUT_MS", 2000)),
        }
    }
}

fn env_u8(key: &str, default: u8) -> u8 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
