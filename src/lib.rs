pub mod config;
pub mod crossing;
pub mod elevation;
pub mod generation;
pub mod geometry;
pub mod map;
pub mod resources;
pub mod road_graph;
pub mod routing;
pub mod settlements;
pub mod terrain;
pub mod terrain_generation;

// Selective re-exports for external consumers

// Pipeline entry point and its output
pub use generation::errors::{RoadError, RoadResult};
pub use generation::{GenerationResult, NetworkSnapshot, RoadNetworkGenerator, RoadSegment};

// Inputs
pub use map::{Settlement, TerrainData, WorldDefinition};
pub use resources::{GenerationSettings, WorldParams};
pub use terrain::{TerrainCarve, TerrainQuery};

// Navigation
pub use road_graph::{NavigationStats, RoadGraph};

// Terrain generation - the CLI needs utility functions
pub use terrain_generation::is_suitable_for_settlement;
