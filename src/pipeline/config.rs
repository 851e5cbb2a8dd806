//! Voxelization settings, loadable from JSON

use std::path::Path;

use crate::core::{Error, Result};
use crate::voxel::grid::validate_cell_size;

/// Occupancy classification strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Strategy {
    /// Six-direction ray parity
    #[serde(rename = "parity")]
    Parity,
    /// BVH box overlap with a ray-exit fallback
    #[default]
    #[serde(rename = "bvh-hybrid")]
    BvhHybrid,
}

/// How the repair pass decides which gap cells to add
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapFillMode {
    /// Re-classify every gap cell along the scan axis
    #[default]
    Reclassify,
    /// Add cells bracketed by occupied cells along all three axes, without
    /// further ray casting
    Interpolate,
}

/// Parameters that decide which cells end up occupied
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClassificationParams {
    /// Grid spacing in mesh units
    pub cell_size: f32,
    pub strategy: Strategy,
    /// Parity directions that must vote occupied (1..=6)
    pub axis_threshold: u8,
    /// Extra cells around the mesh bounds on every side
    pub padding: u32,
    /// Run the row repair pass after classification
    pub gap_fill: bool,
    pub gap_fill_mode: GapFillMode,
}

impl Default for ClassificationParams {
    fn default() -> Self {
        Self {
            cell_size: 0.15,
            strategy: Strategy::BvhHybrid,
            axis_threshold: 1,
            padding: 0,
            gap_fill: true,
            gap_fill_mode: GapFillMode::Reclassify,
        }
    }
}

impl ClassificationParams {
    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_gap_fill(mut self, gap_fill: bool) -> Self {
        self.gap_fill = gap_fill;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_cell_size(self.cell_size)?;
        if !(1..=6).contains(&self.axis_threshold) {
            return Err(Error::InvalidConfiguration(format!(
                "axis threshold must be in 1..=6, got {}",
                self.axis_threshold
            )));
        }
        Ok(())
    }
}

/// Classification worker pool sizing
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker threads; 0 picks one per available core
    pub threads: usize,
    /// Lattice points handed to a worker at a time
    pub batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            batch_size: 4096,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfiguration("batch size must be > 0".into()));
        }
        Ok(())
    }
}

/// Per-instance box shape handed to the renderer
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Edge length of each rendered box
    pub box_size: f32,
    /// Corner rounding radius
    pub roundness: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            box_size: 0.1,
            roundness: 0.01,
        }
    }
}

/// Complete voxelizer configuration
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VoxelizerConfig {
    pub classification: ClassificationParams,
    pub workers: WorkerConfig,
    pub render: RenderParams,
}

impl VoxelizerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded voxelizer config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Checks every section; box sizing is checked against the cell size
    pub fn validate(&self) -> Result<()> {
        self.classification.validate()?;
        self.workers.validate()?;
        crate::voxel::instancing::BoxGeometry::new(
            self.render.box_size,
            self.render.roundness,
            self.classification.cell_size,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = VoxelizerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.classification.strategy, Strategy::BvhHybrid);
        assert_eq!(config.classification.axis_threshold, 1);
        assert_eq!(config.classification.padding, 0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = VoxelizerConfig::from_json_str(
            r#"{ "classification": { "cell_size": 0.5, "strategy": "parity", "gap_fill_mode": "interpolate" } }"#,
        )
        .unwrap();
        assert_eq!(config.classification.cell_size, 0.5);
        assert_eq!(config.classification.strategy, Strategy::Parity);
        assert_eq!(config.classification.gap_fill_mode, GapFillMode::Interpolate);
        assert!(config.classification.gap_fill);
        assert_eq!(config.workers, WorkerConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad = [
            r#"{ "classification": { "cell_size": 0.0 } }"#,
            r#"{ "classification": { "cell_size": -1.0 } }"#,
            r#"{ "classification": { "axis_threshold": 7 } }"#,
            r#"{ "classification": { "axis_threshold": 0 } }"#,
            r#"{ "workers": { "batch_size": 0 } }"#,
            r#"{ "render": { "box_size": 0.5 } }"#,
        ];
        for json in bad {
            assert!(
                matches!(VoxelizerConfig::from_json_str(json), Err(Error::InvalidConfiguration(_))),
                "{json}"
            );
        }
        assert!(matches!(
            VoxelizerConfig::from_json_str(r#"{ "classification": { "strategy": "octree" } }"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("voxelizer.json");

        let mut config = VoxelizerConfig::default();
        config.classification.cell_size = 0.25;
        config.classification.strategy = Strategy::Parity;
        config.classification.axis_threshold = 4;
        config.workers.threads = 2;
        config.save(&path).unwrap();

        let loaded = VoxelizerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"parity\""));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            VoxelizerConfig::load(dir.path().join("absent.json")),
            Err(Error::Io(_))
        ));
    }
}
