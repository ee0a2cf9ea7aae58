use crate::config::range_types::*;
use crate::generation::errors::{RoadError, RoadResult};
use crate::terrain::constants::*;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// World-wide parameters read once at generation start.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct WorldParams {
    #[validate(range(min = -1000.0, max = 1000.0))]
    pub sea_level: f32,
    /// Side length of the square world in meters, centred on the origin
    #[validate(range(min = 1.0, max = 1_000_000.0))]
    pub terrain_size: f32,
}

impl WorldParams {
    pub fn new(sea_level: f32, terrain_size: f32) -> RoadResult<Self> {
        let params = Self {
            sea_level,
            terrain_size,
        };
        params.validate().map_err(|e| RoadError::InvalidWorldParams {
            reason: e.to_string(),
        })?;
        Ok(params)
    }

    pub fn half_extent(&self) -> f32 {
        self.terrain_size / 2.0
    }

    /// Clamp an XZ position into the world bounds
    pub fn clamp_xz(&self, x: f32, z: f32) -> (f32, f32) {
        let half = self.half_extent();
        (x.clamp(-half, half), z.clamp(-half, half))
    }
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            sea_level: 0.0,
            terrain_size: 10_000.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
// NOTE: When adding new sections, keep the field names stable; they are the TOML table names
pub struct GenerationSettings {
    pub connectivity: ConnectivitySettings,
    pub routing: RoutingSettings,
    pub crossing: CrossingSettings,
    pub elevation: ElevationSettings,
    pub carving: CarvingSettings,
    pub tessellation: TessellationSettings,
    pub graph: GraphSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ConnectivitySettings {
    pub important_population: u32,
    pub regional_radius: f32,
    /// Scales the `1 - d/radius` acceptance probability of regional links
    pub regional_link_scale: f32,
    /// Upper bound on the share of eligible regional pairs that may be linked
    pub max_regional_fraction: f32,
    pub slope_sample_spacing: f32,
    pub water_sample_spacing: f32,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            important_population: IMPORTANT_SETTLEMENT_POPULATION,
            regional_radius: DEFAULT_REGIONAL_RADIUS,
            regional_link_scale: DEFAULT_REGIONAL_LINK_SCALE,
            max_regional_fraction: MAX_REGIONAL_LINK_FRACTION,
            slope_sample_spacing: SLOPE_SAMPLE_SPACING,
            water_sample_spacing: WATER_SAMPLE_SPACING,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RoutingMode {
    /// Straight terrain-following line
    Direct,
    /// Grid A* search
    GridSearch,
    /// Grid search only when the straight line is wet or steep
    #[default]
    Auto,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RoutingSettings {
    pub mode: RoutingMode,
    pub allow_bridges: bool,
    pub direct_step: f32,
    pub clearance: f32,
    pub smooth_direct: bool,
    pub cell_resolution: CellResolution,
    pub max_iterations: IterationCap,
    pub water_cost: f32,
    pub bridge_cost: f32,
    pub steep_cost: f32,
    pub steep_slope_degrees: f32,
    pub search_margin_cells: u32,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            mode: RoutingMode::Auto,
            allow_bridges: true,
            direct_step: DEFAULT_DIRECT_STEP,
            clearance: DEFAULT_ROUTE_CLEARANCE,
            smooth_direct: true,
            cell_resolution: CellResolution::default(),
            max_iterations: IterationCap::default(),
            water_cost: DEFAULT_WATER_COST,
            bridge_cost: DEFAULT_BRIDGE_COST,
            steep_cost: DEFAULT_STEEP_COST,
            steep_slope_degrees: DEFAULT_STEEP_ROUTE_DEGREES,
            search_margin_cells: DEFAULT_SEARCH_MARGIN_CELLS,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CrossingSettings {
    /// Depth below sea level a sample must reach to count as water
    pub water_threshold: f32,
    pub confirm_radius: f32,
    /// Share of radial samples that must also be wet
    pub confirm_ratio: f32,
    pub merge_distance: f32,
}

impl Default for CrossingSettings {
    fn default() -> Self {
        Self {
            water_threshold: DEFAULT_WATER_THRESHOLD,
            confirm_radius: DEFAULT_CONFIRM_RADIUS,
            confirm_ratio: DEFAULT_CONFIRM_RATIO,
            merge_distance: DEFAULT_CROSSING_MERGE_DISTANCE,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ElevationSettings {
    pub max_gradient: GradientLimit,
    pub min_clearance: f32,
    pub max_clearance: ClearanceMeters,
    pub cut_fill_slope_degrees: f32,
    pub min_cut_depth: f32,
    pub max_fill_height: f32,
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            max_gradient: GradientLimit::default(),
            min_clearance: DEFAULT_MIN_CLEARANCE,
            max_clearance: ClearanceMeters::new(DEFAULT_MAX_CLEARANCE),
            cut_fill_slope_degrees: DEFAULT_CUT_FILL_SLOPE_DEGREES,
            min_cut_depth: DEFAULT_MIN_CUT_DEPTH,
            max_fill_height: DEFAULT_MAX_FILL_HEIGHT,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CarvingSettings {
    pub enabled: bool,
    pub shoulder_width: f32,
    /// Blend factor in [0, 1] applied to the falloff-weighted height change
    pub smoothing: f32,
}

impl Default for CarvingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            shoulder_width: DEFAULT_SHOULDER_WIDTH,
            smoothing: DEFAULT_CARVE_SMOOTHING,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TessellationSettings {
    pub subdivision_tolerance: f32,
    pub max_subdivision_depth: SubdivisionDepth,
    pub validation_clearance: f32,
    pub validation_interval: f32,
    pub deck_thickness: f32,
}

impl Default for TessellationSettings {
    fn default() -> Self {
        Self {
            subdivision_tolerance: DEFAULT_SUBDIVISION_TOLERANCE,
            max_subdivision_depth: SubdivisionDepth::default(),
            validation_clearance: DEFAULT_VALIDATION_CLEARANCE,
            validation_interval: DEFAULT_VALIDATION_INTERVAL,
            deck_thickness: DECK_THICKNESS,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GraphSettings {
    pub snap_tolerance: SnapTolerance,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: SnapTolerance::new(DEFAULT_SNAP_TOLERANCE),
        }
    }
}
