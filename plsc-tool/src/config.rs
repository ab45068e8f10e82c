//! TOML Configuration for PLSC Simulations

use anyhow::{bail, Context};
use layers::phy::Demapping;
use serde::{Deserialize, Serialize};

/// Monte-Carlo simulation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    /// Es/N0 points in dB
    #[serde(default = "default_snr_db")]
    pub snr_db: Vec<f32>,
    /// PLHEADERs per SNR point and mode
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Random generator seed
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Constant carrier phase offset in degrees
    #[serde(default)]
    pub phase_offset_deg: f32,
    /// Fixed PLSC to transmit; uniformly random when absent
    #[serde(default)]
    pub plsc: Option<u8>,
    /// Demapping modes to evaluate
    #[serde(default = "default_modes")]
    pub modes: Vec<Demapping>,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

fn default_snr_db() -> Vec<f32> {
    vec![-6.0, -4.0, -2.0, 0.0, 2.0]
}

fn default_trials() -> usize {
    10_000
}

fn default_seed() -> u64 {
    1
}

fn default_modes() -> Vec<Demapping> {
    Demapping::all().to_vec()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            snr_db: default_snr_db(),
            trials: default_trials(),
            seed: default_seed(),
            phase_offset_deg: 0.0,
            plsc: None,
            modes: default_modes(),
            log: LogConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from TOML file
    pub fn from_toml_file(path: &str) -> anyhow::Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid configuration in {}", path))
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: SimConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.snr_db.is_empty() {
            bail!("snr_db must list at least one point");
        }
        if self.trials == 0 {
            bail!("trials must be positive");
        }
        if self.modes.is_empty() {
            bail!("modes must list at least one demapping mode");
        }
        if let Some(plsc) = self.plsc {
            if plsc > common::types::Plsc::MAX {
                bail!("Invalid PLSC: {}", plsc);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimConfig::from_toml_str("").unwrap();
        assert_eq!(config.snr_db, default_snr_db());
        assert_eq!(config.trials, 10_000);
        assert_eq!(config.modes.len(), 3);
        assert_eq!(config.plsc, None);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse() {
        let config = SimConfig::from_toml_str(
            r#"
            snr_db = [-3.0, 0.0]
            trials = 500
            seed = 42
            phase_offset_deg = 30.0
            plsc = 0x31
            modes = ["coherent_soft", "differential"]

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.snr_db, vec![-3.0, 0.0]);
        assert_eq!(config.trials, 500);
        assert_eq!(config.seed, 42);
        assert_eq!(config.plsc, Some(0x31));
        assert_eq!(config.modes, vec![Demapping::CoherentSoft, Demapping::Differential]);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_bundled_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/sim.toml");
        let config = SimConfig::from_toml_file(path).unwrap();
        assert_eq!(config.snr_db.len(), 6);
        assert_eq!(config.modes, Demapping::all().to_vec());
        assert!(SimConfig::from_toml_file("missing.toml").is_err());
    }

    #[test]
    fn test_validation() {
        assert!(SimConfig::from_toml_str("trials = 0").is_err());
        assert!(SimConfig::from_toml_str("plsc = 200").is_err());
        assert!(SimConfig::from_toml_str("snr_db = []").is_err());
        assert!(SimConfig::from_toml_str("modes = [\"coherent_magic\"]").is_err());
    }
}
