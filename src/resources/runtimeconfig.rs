//! Runtime configuration resource.
//!
//! Manages tick and pool settings loaded from an INI configuration file.
//! Provides defaults for safe startup and methods to load/save configuration.
//!
//! # Configuration File Format
//!
//! ```ini
//! [tick]
//! target_tps = 60
//! fixed_delta = 0.02
//! max_fixed_steps = 5
//!
//! [pools]
//! manifest = ./pools.json
//! ```

use std::path::PathBuf;

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::{info, warn};

/// Default safe values for startup
const DEFAULT_TARGET_TPS: u32 = 60;
const DEFAULT_FIXED_DELTA: f32 = 0.02;
const DEFAULT_MAX_FIXED_STEPS: u32 = 5;
const DEFAULT_CONFIG_PATH: &str = "./runtime.ini";

/// Runtime configuration resource.
#[derive(Resource, Debug, Clone)]
pub struct RuntimeConfig {
    /// Frames (ticks) per second targeted by the host loop.
    pub target_tps: u32,
    /// Seconds per fixed-update step.
    pub fixed_delta: f32,
    /// Maximum fixed steps run in one frame.
    pub max_fixed_steps: u32,
    /// Optional pool prewarm manifest.
    pub pool_manifest: Option<PathBuf>,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            target_tps: DEFAULT_TARGET_TPS,
            fixed_delta: DEFAULT_FIXED_DELTA,
            max_fixed_steps: DEFAULT_MAX_FIXED_STEPS,
            pool_manifest: None,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values. Non-positive or
    /// out-of-range values are ignored.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);

        info!(
            "Loaded config: target_tps={}, fixed_delta={}, max_fixed_steps={}, manifest={:?}",
            self.target_tps, self.fixed_delta, self.max_fixed_steps, self.pool_manifest
        );

        Ok(())
    }

    /// Load configuration from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [tick] section
        if let Some(tps) = positive_u32(config, "tick", "target_tps") {
            self.target_tps = tps;
        }
        if let Some(delta) = config.getfloat("tick", "fixed_delta").ok().flatten() {
            if delta > 0.0 {
                self.fixed_delta = delta as f32;
            }
        }
        if let Some(steps) = positive_u32(config, "tick", "max_fixed_steps") {
            self.max_fixed_steps = steps;
        }

        // [pools] section
        if let Some(manifest) = config.get("pools", "manifest") {
            if !manifest.trim().is_empty() {
                self.pool_manifest = Some(PathBuf::from(manifest.trim()));
            }
        }
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        // [tick] section
        config.set("tick", "target_tps", Some(self.target_tps.to_string()));
        config.set("tick", "fixed_delta", Some(self.fixed_delta.to_string()));
        config.set(
            "tick",
            "max_fixed_steps",
            Some(self.max_fixed_steps.to_string()),
        );

        // [pools] section
        if let Some(manifest) = &self.pool_manifest {
            config.set("pools", "manifest", Some(manifest.display().to_string()));
        }

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// Seconds per frame at the target rate.
    pub fn frame_duration(&self) -> f32 {
        1.0 / self.target_tps as f32
    }
}

/// Read an unsigned key that must fit a `u32` and be non-zero.
fn positive_u32(config: &Ini, section: &str, key: &str) -> Option<u32> {
    let value = config.getuint(section, key).ok().flatten()?;
    match u32::try_from(value) {
        Ok(v) if v > 0 => Some(v),
        _ => {
            warn!("config: ignoring [{}] {} = {}", section, key, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::new();
        assert_eq!(config.target_tps, 60);
        assert_eq!(config.max_fixed_steps, 5);
        assert!((config.fixed_delta - 0.02).abs() < f32::EPSILON);
        assert!(config.pool_manifest.is_none());
    }

    #[test]
    fn test_load_from_str_overrides_present_values() {
        let mut config = RuntimeConfig::new();
        config
            .load_from_str("[tick]\nfixed_delta = 0.01\n\n[pools]\nmanifest = ./pools.json\n")
            .unwrap();
        assert!((config.fixed_delta - 0.01).abs() < f32::EPSILON);
        assert_eq!(config.target_tps, 60);
        assert_eq!(config.pool_manifest, Some(PathBuf::from("./pools.json")));
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let mut config = RuntimeConfig::new();
        config
            .load_from_str("[tick]\nfixed_delta = -1\ntarget_tps = 0\nmax_fixed_steps = 0\n")
            .unwrap();
        assert!((config.fixed_delta - 0.02).abs() < f32::EPSILON);
        assert_eq!(config.target_tps, 60);
        assert_eq!(config.max_fixed_steps, 5);
    }

    #[test]
    fn test_out_of_range_values_are_ignored() {
        let mut config = RuntimeConfig::new();
        config
            .load_from_str("[tick]\ntarget_tps = 4294967296\nmax_fixed_steps = 4294967301\n")
            .unwrap();
        assert_eq!(config.target_tps, 60);
        assert_eq!(config.max_fixed_steps, 5);
        assert!(config.frame_duration().is_finite());
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let mut config = RuntimeConfig::with_path("./no/such/runtime.ini");
        assert!(config.load_from_file().is_err());
        assert_eq!(config.target_tps, 60);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let path = std::env::temp_dir().join(format!("gamewire-config-{}.ini", std::process::id()));
        let mut config = RuntimeConfig::with_path(&path);
        config.target_tps = 30;
        config.pool_manifest = Some(PathBuf::from("pools.json"));
        config.save_to_file().unwrap();

        let mut loaded = RuntimeConfig::with_path(&path);
        loaded.load_from_file().unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.target_tps, 30);
        assert_eq!(loaded.pool_manifest, Some(PathBuf::from("pools.json")));
    }
}
