use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    BIND_ADDR, DEFAULT_PAGE_SIZE, DEFAULT_UNIVERSE_SIZE, MOCK_LATENCY_MS, REFRESH_INTERVAL_SECS,
};

/// User preferences, loaded once at startup and written back only through
/// an explicit save. Unknown keys in the file are configuration mistakes
/// and rejected outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bind_addr: String,
    pub refresh_interval_secs: u64,
    pub mock_latency_ms: u64,
    pub universe_size: usize,
    /// Fixed seed for a reproducible universe; absent means entropy.
    pub seed: Option<u64>,
    pub default_page_size: usize,
    /// Symbols watched from the first refresh on.
    pub watchlist: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: BIND_ADDR.to_string(),
            refresh_interval_secs: REFRESH_INTERVAL_SECS,
            mock_latency_ms: MOCK_LATENCY_MS,
            universe_size: DEFAULT_UNIVERSE_SIZE,
            seed: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            watchlist: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; a missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings at {path:?}"))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings at {path:?}"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("failed to serialise settings")?;
        fs::write(path, raw).with_context(|| format!("failed to write settings at {path:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("stock-dashboard-settings-{name}-{}.json", std::process::id()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/settings.json")).expect("load");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = scratch_path("roundtrip");
        let mut settings = Settings::default();
        settings.universe_size = 123;
        settings.seed = Some(7);
        settings.watchlist = vec!["TECH000".to_string()];

        settings.save(&path).expect("save");
        let loaded = Settings::load(&path).expect("load");
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let path = scratch_path("unknown");
        std::fs::write(&path, r#"{"bind_addr": "127.0.0.1:1", "theme": "dark"}"#).expect("write");
        let result = Settings::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = scratch_path("partial");
        std::fs::write(&path, r#"{"universe_size": 9}"#).expect("write");
        let settings = Settings::load(&path).expect("load");
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.universe_size, 9);
        assert_eq!(settings.bind_addr, BIND_ADDR);
    }
}
