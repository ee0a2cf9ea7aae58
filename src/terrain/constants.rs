/// Constants for road network generation

/// Settlement graph defaults
pub const IMPORTANT_SETTLEMENT_POPULATION: u32 = 500;
pub const HIGHWAY_POPULATION: u32 = 1000;
pub const ARTERIAL_POPULATION: u32 = 400;
pub const DEFAULT_REGIONAL_RADIUS: f32 = 1000.0;
pub const DEFAULT_REGIONAL_LINK_SCALE: f32 = 0.6;
pub const MAX_REGIONAL_LINK_FRACTION: f32 = 0.3;
pub const SLOPE_SAMPLE_SPACING: f32 = 100.0;
pub const WATER_SAMPLE_SPACING: f32 = 50.0;
pub const MODERATE_SLOPE_DEGREES: f32 = 10.0;
pub const STEEP_SLOPE_DEGREES: f32 = 20.0;
pub const WATER_PENALTY_MULTIPLIER: f32 = 10.0;

/// Road widths in meters
pub const HIGHWAY_WIDTH: f32 = 18.0;
pub const ARTERIAL_WIDTH: f32 = 12.0;
pub const LOCAL_WIDTH: f32 = 8.0;
pub const LANE_WIDTH: f32 = 4.0;

/// Road surface offsets above terrain in meters
pub const HIGHWAY_SURFACE_OFFSET: f32 = 0.8;
pub const ARTERIAL_SURFACE_OFFSET: f32 = 0.6;
pub const LOCAL_SURFACE_OFFSET: f32 = 0.5;
pub const LANE_SURFACE_OFFSET: f32 = 0.4;

/// Routing defaults
pub const MIN_DIRECT_STEP: f32 = 20.0;
pub const DEFAULT_DIRECT_STEP: f32 = 20.0;
pub const DEFAULT_ROUTE_CLEARANCE: f32 = 0.2;
pub const DEFAULT_STEEP_ROUTE_DEGREES: f32 = 14.0;
pub const DEFAULT_WATER_COST: f32 = 1000.0;
pub const DEFAULT_BRIDGE_COST: f32 = 60.0;
pub const DEFAULT_STEEP_COST: f32 = 80.0;
pub const DEFAULT_SEARCH_MARGIN_CELLS: u32 = 40;

/// Water crossing defaults
pub const DEFAULT_WATER_THRESHOLD: f32 = 0.5;
pub const DEFAULT_CONFIRM_RADIUS: f32 = 10.0;
pub const DEFAULT_CONFIRM_RATIO: f32 = 0.6;
pub const CONFIRM_SAMPLE_COUNT: usize = 8;
pub const DEFAULT_CROSSING_MERGE_DISTANCE: f32 = 100.0;
pub const CROSSING_REFINE_STEPS: u32 = 8;

/// Bridge tier limits and clearances in meters
pub const SHORT_BRIDGE_MAX_SPAN: f32 = 100.0;
pub const MEDIUM_BRIDGE_MAX_SPAN: f32 = 300.0;
pub const LONG_BRIDGE_MAX_SPAN: f32 = 800.0;
pub const SHORT_BRIDGE_CLEARANCE: f32 = 8.0;
pub const MEDIUM_BRIDGE_CLEARANCE: f32 = 12.0;
pub const LONG_BRIDGE_CLEARANCE: f32 = 20.0;
pub const SPANNING_BRIDGE_CLEARANCE: f32 = 25.0;
pub const ARCH_RISE_RATIO: f32 = 0.7;
pub const MIN_CABLE_SAG_RATIO: f32 = 0.05;
pub const MAX_CABLE_SAG_RATIO: f32 = 0.2;
pub const SPANNING_TOWER_INTERVAL: f32 = 300.0;

/// Elevation defaults
pub const DEFAULT_MIN_CLEARANCE: f32 = 0.1;
pub const DEFAULT_MAX_CLEARANCE: f32 = 7.0;
pub const DEFAULT_CUT_FILL_SLOPE_DEGREES: f32 = 8.0;
pub const DEFAULT_MIN_CUT_DEPTH: f32 = 0.3;
pub const DEFAULT_MAX_FILL_HEIGHT: f32 = 6.0;
pub const CUT_FILL_WINDOW: usize = 2;
pub const MAX_GRADIENT_ROUNDS: usize = 4;

/// Carving defaults
pub const DEFAULT_SHOULDER_WIDTH: f32 = 6.0;
pub const DEFAULT_CARVE_SMOOTHING: f32 = 0.85;

/// Tessellation defaults
pub const DEFAULT_SUBDIVISION_TOLERANCE: f32 = 2.0;
pub const DEFAULT_VALIDATION_CLEARANCE: f32 = 0.15;
pub const DEFAULT_VALIDATION_INTERVAL: f32 = 4.0;
pub const VALIDATION_RAISE_EPSILON: f32 = 0.001;
pub const MAX_VALIDATION_PASSES: usize = 4;
pub const DECK_THICKNESS: f32 = 1.2;
pub const PIER_TOP_HALF_WIDTH: f32 = 1.0;
pub const PIER_TAPER: f32 = 1.6;
pub const TOWER_TOP_HALF_WIDTH: f32 = 1.5;
pub const FOUNDATION_DEPTH: f32 = 2.0;

/// Navigation graph defaults
pub const DEFAULT_SNAP_TOLERANCE: f32 = 5.0;

/// Terrain sampling fallback values
pub const FALLBACK_TERRAIN_HEIGHT: f32 = 0.0;
pub const NORMAL_SAMPLE_STEP: f32 = 1.0;
