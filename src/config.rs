use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mapper: MapperConfig,
    pub rig: RigConfig,
    pub server: ServerConfig,
    pub replay: ReplayConfig,
}

/// Tuning for turning detector transforms into avatar poses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// input comes from a selfie camera (horizontally flipped)
    pub mirror: bool,
    /// weight of the newest frame, 1.0 = no smoothing
    pub smoothing: f32,
    /// detector units (cm) to scene units
    pub unit_scale: f32,
    /// added to the scene z of the avatar root
    pub depth_bias: f32,
    pub depth_scaling: bool,
    /// detector depth (cm) at which the avatar has unit scale
    pub reference_depth: f32,
    /// floor for the depth used as denominator
    pub min_depth: f32,
    pub max_scale: f32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            mirror: true,
            smoothing: 0.5,
            unit_scale: 0.01,
            depth_bias: -0.5,
            depth_scaling: true,
            reference_depth: 50.0,
            min_depth: 1.0,
            max_scale: 3.0,
        }
    }
}

impl MapperConfig {
    /// Rejects values that would give the avatar a non-positive or non-finite scale
    /// or position.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.unit_scale.is_finite() && self.unit_scale > 0.0,
            "mapper.unit_scale must be positive, got {}",
            self.unit_scale
        );
        ensure!(
            self.depth_bias.is_finite(),
            "mapper.depth_bias must be finite, got {}",
            self.depth_bias
        );
        for (name, value) in [
            ("reference_depth", self.reference_depth),
            ("min_depth", self.min_depth),
            ("max_scale", self.max_scale),
        ] {
            ensure!(
                value.is_finite() && value > 0.0,
                "mapper.{} must be positive, got {}",
                name,
                value
            );
        }
        Ok(())
    }
}

/// Node names resolved once when the avatar is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub root_node: String,
    pub head_node: String,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            root_node: "AvatarRoot".to_string(),
            head_node: "Head".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "tcp://127.0.0.1:54321".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// spacing of synthesized timestamps for recordings without a time column
    pub frame_interval_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 33,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.mapper.validate()?;
        Ok(config)
    }

    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }
}
