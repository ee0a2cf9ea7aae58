use bevy::prelude::*;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoadError {
    // Input-related errors
    #[error("At least 2 settlements are required to build a road network, got {count}")]
    InsufficientInput { count: usize },

    #[error("Invalid world parameters: {reason}")]
    InvalidWorldParams { reason: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // Pipeline errors (recoverable at the segment level)
    #[error("No path found from {from:?} to {to:?} within {iterations} search iterations")]
    NoPathFound { from: Vec3, to: Vec3, iterations: usize },

    #[error("Degenerate geometry for segment {segment}: polyline has {points} point(s)")]
    DegenerateGeometry { segment: usize, points: usize },

    #[error("Terrain backend unavailable, falling back to terrain-free generation")]
    TerrainQueryUnavailable,

    // Fatal errors
    #[error("Terrain carving was requested but no writable terrain was supplied")]
    MissingTerrainForCarving,

    // Graph errors
    #[error("Unknown road graph node {id}")]
    UnknownNode { id: u32 },

    #[error("Unknown road graph edge {id}")]
    UnknownEdge { id: u32 },

    #[error("Edge would connect node {id} to itself")]
    SelfLoopEdge { id: u32 },

    // Config-related errors
    #[error("Failed to get config directory")]
    ConfigDirNotFound,

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize settings: {0}")]
    SerializationFailed(#[from] toml::ser::Error),

    #[error("Failed to deserialize settings: {0}")]
    DeserializationFailed(#[from] toml::de::Error),

    #[error("World file not found at path: {path}")]
    WorldFileNotFound { path: PathBuf },

    #[error("Corrupted world file: {reason}")]
    CorruptedWorldFile { reason: String },
}

impl RoadError {
    /// Whether the pipeline may record this error and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RoadError::InsufficientInput { .. }
                | RoadError::NoPathFound { .. }
                | RoadError::DegenerateGeometry { .. }
                | RoadError::TerrainQueryUnavailable
        )
    }

    /// Attach a segment id to geometry errors raised before the segment was known
    pub fn for_segment(self, id: usize) -> Self {
        match self {
            RoadError::DegenerateGeometry { points, .. } => RoadError::DegenerateGeometry {
                segment: id,
                points,
            },
            other => other,
        }
    }
}

/// Result type alias for all operations
pub type RoadResult<T> = Result<T, RoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_road_error_display() {
        let err = RoadError::InsufficientInput { count: 1 };
        assert!(err.to_string().contains("At least 2 settlements"));

        let err = RoadError::ConfigDirNotFound;
        assert_eq!(err.to_string(), "Failed to get config directory");

        let err = RoadError::DegenerateGeometry {
            segment: 4,
            points: 1,
        };
        assert!(err.to_string().contains("segment 4"));
        assert!(err.for_segment(9).to_string().contains("segment 9"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(RoadError::TerrainQueryUnavailable.is_recoverable());
        assert!(
            RoadError::NoPathFound {
                from: Vec3::ZERO,
                to: Vec3::X,
                iterations: 10
            }
            .is_recoverable()
        );
        assert!(!RoadError::MissingTerrainForCarving.is_recoverable());
        assert!(!RoadError::SelfLoopEdge { id: 3 }.is_recoverable());
    }
}
