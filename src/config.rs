//! Configuration loading for DrishtiSeg

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct DrishtiConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub source: SourceConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub labeling: LabelingConfig,
    /// Semantic class table; index order defines the class ids
    pub labels: Vec<LabelEntry>,
}

/// Network endpoints of the daemon itself
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceConfig {
    /// TCP bind address for labeling requests (default: 0.0.0.0:5601)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// TCP bind address for the fused-cloud broadcast (default: 0.0.0.0:5602)
    #[serde(default = "default_publish_address")]
    pub publish_address: String,
}

/// Upstream observation service connection
#[derive(Clone, Debug, Deserialize)]
pub struct SourceConfig {
    /// Address of the map service that owns the raw waypoint clouds
    #[serde(default = "default_source_address")]
    pub address: String,

    /// Connection timeout in milliseconds (default: 5000)
    #[serde(default = "default_source_timeout")]
    pub timeout_ms: u64,
}

/// Pretrained classifier model
#[derive(Clone, Debug, Deserialize)]
pub struct ModelConfig {
    /// Path to the serialized random forest (JSON)
    pub forest_path: String,
}

/// Supervoxel partitioning parameters
#[derive(Clone, Debug, Deserialize)]
pub struct SegmentationConfig {
    /// Downsampling cell size in meters (default: 0.01)
    #[serde(default = "default_voxel_resolution")]
    pub voxel_resolution: f32,

    /// Supervoxel seed cell size in meters (default: 0.1)
    #[serde(default = "default_seed_resolution")]
    pub seed_resolution: f32,
}

/// Labeling pipeline parameters
#[derive(Clone, Debug, Deserialize)]
pub struct LabelingConfig {
    /// Minimum member count for a voxel to be labeled at all
    #[serde(default = "default_min_point_count")]
    pub min_point_count: usize,

    /// Color sigma of the appearance kernel (Lab units)
    #[serde(default = "default_appearance_color_sigma")]
    pub appearance_color_sigma: f32,

    /// Range sigma of the appearance kernel (meters)
    #[serde(default = "default_appearance_range_sigma")]
    pub appearance_range_sigma: f32,

    /// Potts weight of the appearance term
    #[serde(default = "default_appearance_weight")]
    pub appearance_weight: f32,

    /// Range sigma of the smoothness kernel (meters)
    #[serde(default = "default_smoothness_range_sigma")]
    pub smoothness_range_sigma: f32,

    /// Potts weight of the smoothness term
    #[serde(default = "default_smoothness_weight")]
    pub smoothness_weight: f32,

    /// Mean-field iteration budget (cost/accuracy knob, not a convergence
    /// guarantee)
    #[serde(default = "default_crf_iterations")]
    pub crf_iterations: u32,
}

/// One semantic class: name plus display color
#[derive(Clone, Debug, Deserialize)]
pub struct LabelEntry {
    pub name: String,
    /// Display color as [r, g, b]
    pub color: [u8; 3],
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:5601".to_string()
}
fn default_publish_address() -> String {
    "0.0.0.0:5602".to_string()
}
fn default_source_address() -> String {
    "127.0.0.1:5600".to_string()
}
fn default_source_timeout() -> u64 {
    5000
}
fn default_voxel_resolution() -> f32 {
    0.01
}
fn default_seed_resolution() -> f32 {
    0.1
}
fn default_min_point_count() -> usize {
    10
}
fn default_appearance_color_sigma() -> f32 {
    10.0
}
fn default_appearance_range_sigma() -> f32 {
    0.3
}
fn default_appearance_weight() -> f32 {
    10.0
}
fn default_smoothness_range_sigma() -> f32 {
    0.1
}
fn default_smoothness_weight() -> f32 {
    3.0
}
fn default_crf_iterations() -> u32 {
    5
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            publish_address: default_publish_address(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            address: default_source_address(),
            timeout_ms: default_source_timeout(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            voxel_resolution: default_voxel_resolution(),
            seed_resolution: default_seed_resolution(),
        }
    }
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            min_point_count: default_min_point_count(),
            appearance_color_sigma: default_appearance_color_sigma(),
            appearance_range_sigma: default_appearance_range_sigma(),
            appearance_weight: default_appearance_weight(),
            smoothness_range_sigma: default_smoothness_range_sigma(),
            smoothness_weight: default_smoothness_weight(),
            crf_iterations: default_crf_iterations(),
        }
    }
}

impl DrishtiConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        let config: DrishtiConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check values that would only fail deep inside the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(Error::Config("label table is empty".to_string()));
        }
        if self.segmentation.voxel_resolution <= 0.0 || self.segmentation.seed_resolution <= 0.0 {
            return Err(Error::Config("resolutions must be positive".to_string()));
        }
        let l = &self.labeling;
        for (name, sigma) in [
            ("appearance_color_sigma", l.appearance_color_sigma),
            ("appearance_range_sigma", l.appearance_range_sigma),
            ("smoothness_range_sigma", l.smoothness_range_sigma),
        ] {
            if sigma <= 0.0 {
                return Err(Error::Config(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[model]
forest_path = "models/forest.json"

[[labels]]
name = "floor"
color = [0, 255, 0]

[[labels]]
name = "wall"
color = [255, 0, 0]
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: DrishtiConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.service.bind_address, "0.0.0.0:5601");
        assert_eq!(config.labeling.min_point_count, 10);
        assert_eq!(config.labeling.crf_iterations, 5);
        assert_eq!(config.segmentation.voxel_resolution, 0.01);
        assert_eq!(config.labels.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let toml_content = r#"
[service]
bind_address = "127.0.0.1:7001"

[model]
forest_path = "rf.json"

[labeling]
min_point_count = 25
appearance_weight = 12.5

[[labels]]
name = "floor"
color = [0, 255, 0]
"#;
        let config: DrishtiConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.service.bind_address, "127.0.0.1:7001");
        assert_eq!(config.labeling.min_point_count, 25);
        assert_eq!(config.labeling.appearance_weight, 12.5);
        // Untouched fields keep their defaults
        assert_eq!(config.labeling.smoothness_weight, 3.0);
    }

    #[test]
    fn test_empty_label_table_rejected() {
        let toml_content = r#"
labels = []

[model]
forest_path = "rf.json"
"#;
        let config: DrishtiConfig = toml::from_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = DrishtiConfig::load(file.path()).unwrap();
        assert_eq!(config.model.forest_path, "models/forest.json");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = DrishtiConfig::load("/nonexistent/drishti.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
