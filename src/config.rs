use crate::convert::{GazeTransform, Identity, LegacyMillimeterScale};
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single `wait_and_drain` call.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(100);

/// Session tuning. `from_env` reads the `GAZESYNC_*` variables; unset or
/// unparsable values fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper bound for one wait on callback data.
    pub wait_timeout: Duration,
    /// Connect to this URL instead of the first enumerated device.
    pub device_url: Option<String>,
    /// Apply the x1000 origin/direction scaling.
    pub legacy_scale: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            device_url: None,
            legacy_scale: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let wait_timeout = read_u64(&lookup, "GAZESYNC_WAIT_TIMEOUT_MS")
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.wait_timeout);
        let device_url = read_string(&lookup, "GAZESYNC_DEVICE_URL");
        let legacy_scale = read_bool(&lookup, "GAZESYNC_LEGACY_SCALE").unwrap_or(defaults.legacy_scale);

        let config = Config {
            wait_timeout,
            device_url,
            legacy_scale,
        };
        log::debug!("Gaze config: {:?}", config);
        config
    }

    /// Transform selected by `legacy_scale`.
    pub fn transform(&self) -> Arc<dyn GazeTransform> {
        if self.legacy_scale {
            Arc::new(LegacyMillimeterScale)
        } else {
            Arc::new(Identity)
        }
    }
}

fn read_bool<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<bool> {
    lookup(name).and_then(|v| {
        let v = v.trim().to_ascii_lowercase();
        match v.as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => {
                log::warn!("Ignoring {}='{}' (expected a boolean)", name, v);
                None
            }
        }
    })
}

fn read_u64<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<u64> {
    lookup(name).and_then(|v| {
        let v = v.trim();
        match v.parse::<u64>() {
            Ok(n) => Some(n),
            Err(_) => {
                log::warn!("Ignoring {}='{}' (expected an integer)", name, v);
                None
            }
        }
    })
}

fn read_string<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
