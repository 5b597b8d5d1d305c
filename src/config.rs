//! Engine configuration for Attune
//!
//! Deployment-tunable knobs for the behavior engine. Values come from
//! (highest precedence first): `ATTUNE_*` environment variables, an optional
//! TOML file, then the built-in defaults.

use crate::error::Result;
use crate::types::AdaptationSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Behavior engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum interaction events retained in the local window
    pub recent_window: usize,

    /// Run the learning pass + cache sweep every N interactions
    pub learning_interval: u64,

    /// Inactivity gap that starts a new session (minutes)
    pub session_gap_minutes: i64,

    /// How long a mood observation stays usable for context resolution (minutes)
    pub mood_freshness_minutes: i64,

    /// Trailing window for trending-content aggregation (days)
    pub trending_days: u32,

    /// How many recent interactions the diversity picker inspects
    pub diversity_window: usize,

    /// Interactions fetched from the durable store on load
    pub load_limit: usize,

    /// Default adaptation parameters for new behavior profiles
    pub adaptation: AdaptationSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recent_window: 300,
            learning_interval: 10,
            session_gap_minutes: 30,
            mood_freshness_minutes: 90,
            trending_days: 7,
            diversity_window: 20,
            load_limit: 300,
            adaptation: AdaptationSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file plus `ATTUNE_*` env overrides.
    ///
    /// Missing file keys fall back to defaults; the file itself must parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("ATTUNE").separator("__"))
            .build()?;

        let cfg: EngineConfig = settings.try_deserialize()?;
        debug!("Loaded engine config from {}", path.as_ref().display());
        Ok(cfg)
    }

    /// Load configuration from `ATTUNE_*` env overrides over the defaults
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("ATTUNE").separator("__"))
            .build()?;

        let cfg: EngineConfig = settings.try_deserialize()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.recent_window, 300);
        assert_eq!(cfg.learning_interval, 10);
        assert_eq!(cfg.session_gap_minutes, 30);
        assert_eq!(cfg.trending_days, 7);
        assert_eq!(cfg.diversity_window, 20);
    }

    #[test]
    fn test_from_file_partial_override() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "recent_window = 50").unwrap();
        writeln!(file, "session_gap_minutes = 45").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "[adaptation]").unwrap();
        writeln!(file, "learning_rate = 0.25").unwrap();
        writeln!(file, "adaptation_threshold = 0.3").unwrap();
        writeln!(file, "context_sensitivity = 0.7").unwrap();

        let cfg = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.recent_window, 50);
        assert_eq!(cfg.session_gap_minutes, 45);
        assert!((cfg.adaptation.learning_rate - 0.25).abs() < 1e-6);
        // Untouched keys keep their defaults
        assert_eq!(cfg.learning_interval, 10);
    }
}
