use crate::generation::errors::{RoadError, RoadResult};
use crate::geometry::polyline::horizontal_distance;
use crate::resources::WorldParams;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// A world to build roads on: terrain, world parameters and settlement records
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Resource)]
pub struct WorldDefinition {
    pub name: String,
    #[validate(nested)]
    pub terrain: TerrainData,
    #[validate(nested)]
    pub params: WorldParams,
    #[validate(nested)]
    pub settlements: Vec<Settlement>,
}

/// Terrain heightmap data
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TerrainData {
    #[validate(range(min = 2, max = 8192))]
    pub width: u32,
    #[validate(range(min = 2, max = 8192))]
    pub height: u32,
    pub heights: Vec<f32>, // Flattened 2D array (row-major)
    #[validate(range(min = 0.1, max = 1000.0))]
    pub scale: f32, // World units per grid cell
}

/// Settlement size class, used for reporting and default radii
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SettlementKind {
    City,
    Town,
    #[default]
    Village,
    Hamlet,
}

impl SettlementKind {
    pub fn from_population(population: u32) -> Self {
        match population {
            p if p >= 2000 => SettlementKind::City,
            p if p >= 500 => SettlementKind::Town,
            p if p >= 100 => SettlementKind::Village,
            _ => SettlementKind::Hamlet,
        }
    }

    pub fn default_radius(self) -> f32 {
        match self {
            SettlementKind::City => 250.0,
            SettlementKind::Town => 120.0,
            SettlementKind::Village => 60.0,
            SettlementKind::Hamlet => 25.0,
        }
    }
}

/// Immutable settlement record fed into graph building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Settlement {
    pub id: u32,
    pub center: Vec3,
    pub population: u32,
    #[validate(range(min = 0.0, max = 10000.0))]
    pub radius: f32,
    #[serde(default)]
    pub kind: SettlementKind,
}

impl Settlement {
    pub fn new(id: u32, center: Vec3, population: u32) -> Self {
        let kind = SettlementKind::from_population(population);
        Self {
            id,
            center,
            population,
            radius: kind.default_radius(),
            kind,
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Horizontal distance between two settlement centres
    pub fn distance_xz(&self, other: &Settlement) -> f32 {
        horizontal_distance(self.center, other.center)
    }
}

impl WorldDefinition {
    /// Create a new world definition with validation
    pub fn new(
        name: String,
        terrain: TerrainData,
        params: WorldParams,
        settlements: Vec<Settlement>,
    ) -> RoadResult<Self> {
        let world = Self {
            name,
            terrain,
            params,
            settlements,
        };

        world.validate().map_err(|e| RoadError::InvalidWorldParams {
            reason: format!("World validation failed: {e}"),
        })?;

        Ok(world)
    }

    /// Load a world from a bincode file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> RoadResult<Self> {
        let file_path = path.as_ref();
        if !file_path.exists() {
            return Err(RoadError::WorldFileNotFound {
                path: file_path.to_path_buf(),
            });
        }

        let data = std::fs::read(file_path)?;

        let (world, _): (WorldDefinition, usize) =
            bincode::serde::decode_from_slice(&data, bincode::config::standard()).map_err(|e| {
                RoadError::CorruptedWorldFile {
                    reason: format!("Failed to deserialize world data: {e}"),
                }
            })?;

        world.validate().map_err(|validation_errors| {
            let error_details = validation_errors
                .field_errors()
                .iter()
                .map(|(field, errors)| {
                    let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                    format!("{field}: {}", error_msgs.join(", "))
                })
                .collect::<Vec<String>>()
                .join("; ");

            RoadError::CorruptedWorldFile {
                reason: format!("World validation failed: {error_details}"),
            }
        })?;

        Ok(world)
    }

    /// Save the world to a bincode file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> RoadResult<()> {
        let file_path = path.as_ref();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let data =
            bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| {
                RoadError::CorruptedWorldFile {
                    reason: format!("Failed to serialize world: {e}"),
                }
            })?;

        std::fs::write(file_path, data)?;

        Ok(())
    }
}

impl TerrainData {
    /// Create a new terrain data with validation
    pub fn new(width: u32, height: u32, heights: Vec<f32>, scale: f32) -> RoadResult<Self> {
        let expected_size = (width * height) as usize;
        if heights.len() != expected_size {
            return Err(RoadError::InvalidWorldParams {
                reason: format!(
                    "Heights array size {} does not match terrain dimensions {}x{} (expected {})",
                    heights.len(),
                    width,
                    height,
                    expected_size
                ),
            });
        }

        let terrain = Self {
            width,
            height,
            heights,
            scale,
        };

        terrain
            .validate()
            .map_err(|e| RoadError::InvalidWorldParams {
                reason: format!("Terrain validation failed: {e}"),
            })?;

        Ok(terrain)
    }

    /// Create flat terrain for testing
    pub fn create_flat(width: u32, height: u32, scale: f32, base_height: f32) -> RoadResult<Self> {
        let heights = vec![base_height; (width * height) as usize];
        Self::new(width, height, heights, scale)
    }

    /// Sample a height function at every grid vertex
    pub fn from_fn(
        width: u32,
        height: u32,
        scale: f32,
        height_fn: impl Fn(f32, f32) -> f32,
    ) -> RoadResult<Self> {
        let mut terrain = Self::create_flat(width, height, scale, 0.0)?;
        for z in 0..height {
            for x in 0..width {
                let (wx, wz) =
                    crate::terrain::coordinates::grid_to_world(&terrain, x as f32, z as f32);
                terrain.heights[(z * width + x) as usize] = height_fn(wx, wz);
            }
        }
        Ok(terrain)
    }

    pub fn world_width(&self) -> f32 {
        self.width as f32 * self.scale
    }

    pub fn world_depth(&self) -> f32 {
        self.height as f32 * self.scale
    }

    pub fn min_max_height(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_data_creation() {
        let terrain = TerrainData::new(2, 2, vec![0.0, 1.0, 2.0, 3.0], 1.0).unwrap();
        assert_eq!(terrain.width, 2);
        assert_eq!(terrain.height, 2);
        assert_eq!(terrain.heights.len(), 4);
        assert_eq!(terrain.min_max_height(), (0.0, 3.0));
    }

    #[test]
    fn test_terrain_data_invalid_size() {
        let result = TerrainData::new(2, 2, vec![0.0, 1.0, 2.0], 1.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_flat_terrain_creation() {
        let terrain = TerrainData::create_flat(3, 3, 2.0, 5.0).unwrap();
        assert_eq!(terrain.heights.len(), 9);
        assert!(terrain.heights.iter().all(|&h| h == 5.0));
        assert_eq!(terrain.world_width(), 6.0);
    }

    #[test]
    fn test_terrain_from_fn_samples_world_positions() {
        // 4x4 at scale 10 spans world x in [-20, 10]
        let terrain = TerrainData::from_fn(4, 4, 10.0, |x, _z| x).unwrap();
        assert_eq!(terrain.heights[0], -20.0);
        assert_eq!(terrain.heights[3], 10.0);
    }

    #[test]
    fn test_settlement_kind_from_population() {
        assert_eq!(SettlementKind::from_population(5000), SettlementKind::City);
        assert_eq!(SettlementKind::from_population(600), SettlementKind::Town);
        assert_eq!(SettlementKind::from_population(150), SettlementKind::Village);
        assert_eq!(SettlementKind::from_population(10), SettlementKind::Hamlet);

        let settlement = Settlement::new(1, Vec3::ZERO, 600);
        assert_eq!(settlement.kind, SettlementKind::Town);
        assert_eq!(settlement.radius, 120.0);
    }

    #[test]
    fn test_world_save_and_load() {
        let terrain = TerrainData::create_flat(4, 4, 10.0, 2.0).unwrap();
        let settlements = vec![
            Settlement::new(0, Vec3::new(-10.0, 2.0, 0.0), 300),
            Settlement::new(1, Vec3::new(10.0, 2.0, 0.0), 800),
        ];
        let world = WorldDefinition::new(
            "test_world".to_string(),
            terrain,
            WorldParams::default(),
            settlements,
        )
        .unwrap();

        let path = std::env::temp_dir().join(format!("waygen_world_{}.bin", std::process::id()));
        world.save_to_file(&path).unwrap();
        let loaded = WorldDefinition::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.name, "test_world");
        assert_eq!(loaded.settlements.len(), 2);
        assert_eq!(loaded.settlements[1].population, 800);
        assert_eq!(loaded.terrain.heights.len(), 16);
    }

    #[test]
    fn test_missing_world_file() {
        let result = WorldDefinition::load_from_file("/nonexistent/world.bin");
        assert!(matches!(result, Err(RoadError::WorldFileNotFound { .. })));
    }
}
