// =============================================================================
// Run Configuration: indicator selection, parameters and pool size
// =============================================================================
//
// Loaded once at startup from an optional JSON file.  All fields carry
// `#[serde(default)]` so a partial file (or `{}`) is a valid configuration.
// `augment --write-config FILE` saves the effective configuration as a
// starting template.
//
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::{Indicator, IndicatorParams};

fn default_indicators() -> Vec<Indicator> {
    Indicator::ALL.to_vec()
}

/// Top-level configuration of one augmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Worker threads; `0` means one per available CPU.
    #[serde(default)]
    pub workers: usize,

    /// Indicators to compute.  Output columns always follow the fixed
    /// order regardless of the order given here.
    #[serde(default = "default_indicators")]
    pub indicators: Vec<Indicator>,

    /// Look-back periods and multipliers.
    #[serde(default)]
    pub params: IndicatorParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            indicators: default_indicators(),
            params: IndicatorParams::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read run config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse run config from {}", path.display()))?;

        info!(
            path = %path.display(),
            workers = config.workers,
            indicators = ?config.indicators,
            "run config loaded"
        );

        Ok(config)
    }

    /// Write the configuration as pretty JSON, replacing `path` through a
    /// `.tmp` sibling so a reader never sees a half-written file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut body =
            serde_json::to_string_pretty(self).context("run config is not serialisable")?;
        body.push('\n');

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, body)
            .and_then(|()| std::fs::rename(&tmp, path))
            .with_context(|| format!("failed to write run config to {}", path.display()))?;

        info!(path = %path.display(), indicators = self.indicators.len(), "run config written");
        Ok(())
    }

    /// Pool size after resolving `0` to the hardware concurrency.
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.workers, 0);
        assert_eq!(cfg.indicators, Indicator::ALL.to_vec());
        assert_eq!(cfg.params.rsi_period, 14);
        assert!(cfg.resolved_workers() >= 1);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RunConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "workers": 3, "indicators": ["rsi", "mfi"], "params": { "mfi_period": 30 } }"#;
        let cfg: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.resolved_workers(), 3);
        assert_eq!(cfg.indicators, vec![Indicator::Rsi, Indicator::Mfi]);
        assert_eq!(cfg.params.mfi_period, 30);
        assert_eq!(cfg.params.atr_period, 14);
    }

    #[test]
    fn unknown_indicator_is_rejected() {
        let json = r#"{ "indicators": ["stoch"] }"#;
        assert!(serde_json::from_str::<RunConfig>(json).is_err());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("augment.json");
        let mut cfg = RunConfig::default();
        cfg.workers = 2;
        cfg.params.bollinger_dev_up = 2.5;
        cfg.save(&path).unwrap();
        assert!(!dir.path().join("augment.json.tmp").exists());
        assert_eq!(RunConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RunConfig::load(dir.path().join("nope.json")).is_err());
    }
}
