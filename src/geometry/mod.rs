pub mod bridge;
pub mod lod;
pub mod mesh;
pub mod polyline;
pub mod ribbon;
pub mod subdivision;
pub mod validation;

pub use bridge::BridgeMeshes;
pub use mesh::{MeshMaterial, RoadMesh};
pub use polyline::Polyline;
pub use validation::ValidationReport;

use crate::crossing::BridgeProfile;
use crate::elevation::lift_to_gradient;
use crate::generation::errors::{RoadError, RoadResult};
use crate::resources::TessellationSettings;
use crate::terrain::TerrainQuery;
use crate::terrain::constants::MAX_VALIDATION_PASSES;
use bevy::prelude::*;

/// A land road after subdivision, validation and meshing
#[derive(Debug, Clone, PartialEq)]
pub struct TessellatedRoad {
    /// Final centreline, including inserted midpoints and validation raises
    pub polyline: Polyline,
    pub mesh: RoadMesh,
    pub segments_raised: usize,
}

/// Grade limit a land road keeps through tessellation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeConstraint {
    pub max_gradient: f32,
    /// First point is pinned, e.g. to a bridge deck
    pub lock_start: bool,
    pub lock_end: bool,
}

impl GradeConstraint {
    pub fn free(max_gradient: f32) -> Self {
        Self {
            max_gradient,
            lock_start: false,
            lock_end: false,
        }
    }

    /// Lock flags for a polyline of `len` points
    pub fn locks(&self, len: usize) -> Vec<bool> {
        let mut locked = vec![false; len];
        if let Some(first) = locked.first_mut() {
            *first = self.lock_start;
        }
        if let Some(last) = locked.last_mut() {
            *last |= self.lock_end;
        }
        locked
    }
}

/// Turns road and bridge polylines into meshes
pub struct GeometryTessellator {
    settings: TessellationSettings,
}

impl GeometryTessellator {
    pub fn new(settings: &TessellationSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    pub fn settings(&self) -> &TessellationSettings {
        &self.settings
    }

    /// Ribbon with upward normals, without touching the terrain
    pub fn tessellate(
        &self,
        points: &[Vec3],
        width: f32,
        material: MeshMaterial,
    ) -> RoadResult<RoadMesh> {
        if points.len() < 2 {
            return Err(RoadError::DegenerateGeometry {
                segment: 0,
                points: points.len(),
            });
        }
        Ok(ribbon::build_ribbon(points, width, material, None))
    }

    pub fn subdivide(
        &self,
        points: &[Vec3],
        terrain: &dyn TerrainQuery,
        surface_offset: f32,
    ) -> Polyline {
        subdivision::subdivide(
            points,
            terrain,
            surface_offset,
            self.settings.subdivision_tolerance,
            self.settings.max_subdivision_depth.get(),
        )
    }

    pub fn validate_clearance(
        &self,
        points: &mut [Vec3],
        width: f32,
        terrain: &dyn TerrainQuery,
        locked: &[bool],
    ) -> ValidationReport {
        validation::validate_clearance(
            points,
            width,
            terrain,
            self.settings.validation_clearance,
            self.settings.validation_interval,
            locked,
        )
    }

    /// Subdivide against the terrain, mesh, then raise and re-mesh until the
    /// surface clears the ground everywhere it is sampled.
    ///
    /// Raises are followed by a raise-only gradient repair, so the result keeps
    /// `grade` wherever the locked ends allow it.
    pub fn tessellate_on_terrain(
        &self,
        points: &[Vec3],
        width: f32,
        surface_offset: f32,
        material: MeshMaterial,
        terrain: &dyn TerrainQuery,
        grade: GradeConstraint,
    ) -> RoadResult<TessellatedRoad> {
        if points.len() < 2 {
            return Err(RoadError::DegenerateGeometry {
                segment: 0,
                points: points.len(),
            });
        }

        let mut polyline = self.subdivide(points, terrain, surface_offset);
        let locked = grade.locks(polyline.len());
        let mut mesh = ribbon::build_ribbon(&polyline, width, material, Some(terrain));
        let mut segments_raised = 0;

        for _ in 0..MAX_VALIDATION_PASSES {
            let report = self.validate_clearance(&mut polyline, width, terrain, &locked);
            if !report.changed() {
                break;
            }
            segments_raised += report.segments_raised;
            lift_to_gradient(&mut polyline, grade.max_gradient, &locked);
            mesh = ribbon::build_ribbon(&polyline, width, material, Some(terrain));
        }

        Ok(TessellatedRoad {
            polyline,
            mesh,
            segments_raised,
        })
    }

    /// Deck, supports and cables for a bridge whose deck heights are already final
    pub fn bridge_meshes(
        &self,
        profile: &BridgeProfile,
        deck: &[Vec3],
        width: f32,
        terrain: Option<&dyn TerrainQuery>,
    ) -> RoadResult<BridgeMeshes> {
        if deck.len() < 2 {
            return Err(RoadError::DegenerateGeometry {
                segment: 0,
                points: deck.len(),
            });
        }
        Ok(bridge::build_bridge(
            profile,
            deck,
            width,
            self.settings.deck_thickness,
            terrain,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlements::RoadType;
    use crate::terrain::FnTerrain;

    fn tessellator() -> GeometryTessellator {
        GeometryTessellator::new(&TessellationSettings::default())
    }

    #[test]
    fn test_tessellate_rejects_single_point() {
        let result =
            tessellator().tessellate(&[Vec3::ZERO], 8.0, MeshMaterial::Road(RoadType::Local));
        assert!(matches!(result, Err(RoadError::DegenerateGeometry { points: 1, .. })));
    }

    #[test]
    fn test_tessellate_two_points() {
        let line = [Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)];
        let mesh = tessellator()
            .tessellate(&line, 8.0, MeshMaterial::Road(RoadType::Local))
            .unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_terrain_tessellation_clears_ground() {
        let terrain = FnTerrain::new(2.0, |x, z| (x * 0.05).sin() * 8.0 + (z * 0.08).cos() * 3.0);
        let points: Vec<Vec3> = (0..=10)
            .map(|i| {
                let x = i as f32 * 30.0;
                Vec3::new(x, terrain.height_at(x, 0.0) + 0.5, 0.0)
            })
            .collect();

        let tessellator = tessellator();
        let road = tessellator
            .tessellate_on_terrain(
                &points,
                8.0,
                0.5,
                MeshMaterial::Road(RoadType::Local),
                &terrain,
                GradeConstraint::free(1.0),
            )
            .unwrap();

        assert!(road.polyline.len() >= points.len());
        assert_eq!(road.mesh.vertex_count(), road.polyline.len() * 2);
        assert_eq!(road.polyline.first().map(|p| p.x), Some(0.0));
        assert_eq!(road.polyline.last().map(|p| p.x), Some(300.0));

        // The result is already valid
        let mut again = road.polyline.clone();
        assert!(!tessellator.validate_clearance(&mut again, 8.0, &terrain, &[]).changed());
    }

    #[test]
    fn test_terrain_tessellation_keeps_grade_and_locked_end() {
        // A bump under a ramp that climbs to a pinned deck end at x = 200
        let terrain = FnTerrain::new(2.0, |x, _| 6.0 * (-((x - 80.0) / 12.0).powi(2)).exp());
        let points: Vec<Vec3> = (0..=10)
            .map(|i| {
                let x = i as f32 * 20.0;
                Vec3::new(x, 0.5 + x * 0.05, 0.0)
            })
            .collect();
        let grade = GradeConstraint {
            max_gradient: 0.15,
            lock_start: false,
            lock_end: true,
        };

        let road = tessellator()
            .tessellate_on_terrain(
                &points,
                8.0,
                0.5,
                MeshMaterial::Road(RoadType::Local),
                &terrain,
                grade,
            )
            .unwrap();

        assert!(road.segments_raised > 0);
        assert_eq!(road.polyline.last(), points.last());
        for pair in road.polyline.windows(2) {
            let run = polyline::horizontal_distance(pair[0], pair[1]);
            assert!((pair[1].y - pair[0].y).abs() <= 0.15 * run + 1e-3, "{pair:?}");
        }
    }
}
