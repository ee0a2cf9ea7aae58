pub mod diagnostics;
pub mod errors;

use crate::crossing::{
    BridgeProfile, BridgeStructure, CrossingClassifier, PolylinePiece, SupportPlacement,
    WaterCrossing, split_at_crossings,
};
use crate::elevation::ElevationAdjuster;
use crate::elevation::carving::{DeckFootprint, carve_polyline};
use crate::geometry::lod::decimate;
use crate::geometry::polyline::{Polyline, horizontal_distance, polyline_length};
use crate::geometry::{GeometryTessellator, GradeConstraint, MeshMaterial, RoadMesh};
use crate::map::Settlement;
use crate::resources::{GenerationSettings, WorldParams};
use crate::road_graph::{EdgeSpec, NavigationStats, RoadGraph};
use crate::routing::{RouteKind, TerrainRouter};
use crate::settlements::{ConnectionKind, PlannedConnection, RoadType, SettlementGraphBuilder};
use crate::terrain::{TerrainCarve, TerrainQuery};
use bevy::prelude::*;
use diagnostics::ConstraintViolation;
use errors::{RoadError, RoadResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Structure details of a bridge segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeInfo {
    pub profile: BridgeProfile,
    pub structure: BridgeStructure,
    pub supports: Vec<SupportPlacement>,
}

/// One built piece of road: a land stretch or a bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    pub id: usize,
    pub from_settlement: u32,
    pub to_settlement: u32,
    pub connection: ConnectionKind,
    pub road_type: RoadType,
    pub width: f32,
    /// Final centreline, heights included
    pub polyline: Polyline,
    pub route_kind: RouteKind,
    pub bridge: Option<BridgeInfo>,
}

impl RoadSegment {
    pub fn is_bridge(&self) -> bool {
        self.bridge.is_some()
    }

    pub fn length(&self) -> f32 {
        polyline_length(&self.polyline)
    }

    /// Coarser centreline for distant rendering
    pub fn lod(&self, level: u32) -> RoadResult<Polyline> {
        decimate(&self.polyline, level).map_err(|e| e.for_segment(self.id))
    }
}

/// Meshes built for one segment, tagged for material and LOD assignment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMesh {
    pub segment_id: usize,
    pub road_type: RoadType,
    pub is_bridge: bool,
    /// Ribbon for land segments; deck, supports and cables for bridges
    pub parts: Vec<RoadMesh>,
}

impl SegmentMesh {
    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(RoadMesh::triangle_count).sum()
    }
}

/// Everything one generation pass produced
#[derive(Debug)]
pub struct GenerationResult {
    /// True when no error was recorded; warnings do not count
    pub success: bool,
    pub road_segments: Vec<RoadSegment>,
    pub navigation_graph: RoadGraph,
    pub meshes: Vec<SegmentMesh>,
    pub errors: Vec<RoadError>,
    pub warnings: Vec<RoadError>,
    pub violations: Vec<ConstraintViolation>,
    pub planned_connections: usize,
}

impl GenerationResult {
    fn empty(snap_tolerance: f32) -> Self {
        Self {
            success: true,
            road_segments: Vec::new(),
            navigation_graph: RoadGraph::new(snap_tolerance),
            meshes: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            violations: Vec::new(),
            planned_connections: 0,
        }
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn bridge_count(&self) -> usize {
        self.road_segments.iter().filter(|s| s.is_bridge()).count()
    }

    /// Road geometry between the graph nodes nearest to `start` and `end`.
    /// Empty when they are not connected.
    pub fn find_path(&self, start: Vec3, end: Vec3) -> Vec<Vec3> {
        let graph = &self.navigation_graph;
        let (Some(from), Some(to)) =
            (graph.nearest_node(start, None), graph.nearest_node(end, None))
        else {
            return Vec::new();
        };
        let Some(path) = graph.find_path(from, to) else {
            return Vec::new();
        };

        let mut points: Vec<Vec3> = Vec::new();
        if let Some(node) = graph.node(from) {
            points.push(node.position);
        }
        for (edge_id, pair) in path.edges.iter().zip(path.nodes.windows(2)) {
            let Some(edge) = graph.edge(*edge_id) else {
                continue;
            };
            let mut waypoints = edge.waypoints.clone();
            if edge.from != pair[0] {
                waypoints.reverse();
            }
            if waypoints.is_empty() {
                waypoints = pair
                    .iter()
                    .filter_map(|id| graph.node(*id).map(|n| n.position))
                    .collect();
            }
            for point in waypoints {
                if points.last().is_none_or(|last| last.distance(point) > 1e-3) {
                    points.push(point);
                }
            }
        }
        points
    }

    pub fn get_navigation_stats(&self) -> NavigationStats {
        self.navigation_graph.get_navigation_stats()
    }

    pub fn to_snapshot(&self, params: &WorldParams) -> NetworkSnapshot {
        NetworkSnapshot {
            params: *params,
            road_segments: self.road_segments.clone(),
            navigation_graph: self.navigation_graph.clone(),
            violations: self.violations.clone(),
        }
    }
}

/// Persisted form of a generated network, without meshes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NetworkSnapshot {
    #[validate(nested)]
    pub params: WorldParams,
    pub road_segments: Vec<RoadSegment>,
    pub navigation_graph: RoadGraph,
    pub violations: Vec<ConstraintViolation>,
}

impl NetworkSnapshot {
    /// Save the snapshot to a bincode file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> RoadResult<()> {
        let file_path = path.as_ref();
        if let Some(parent) = file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let data = bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| {
            RoadError::CorruptedWorldFile {
                reason: format!("Failed to serialize network: {e}"),
            }
        })?;
        std::fs::write(file_path, data)?;
        Ok(())
    }

    /// Load a snapshot from a bincode file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> RoadResult<Self> {
        let file_path = path.as_ref();
        if !file_path.exists() {
            return Err(RoadError::WorldFileNotFound {
                path: file_path.to_path_buf(),
            });
        }

        let data = std::fs::read(file_path)?;
        let (snapshot, _): (NetworkSnapshot, usize) =
            bincode::serde::decode_from_slice(&data, bincode::config::standard()).map_err(|e| {
                RoadError::CorruptedWorldFile {
                    reason: format!("Failed to deserialize network: {e}"),
                }
            })?;

        snapshot.validate().map_err(|e| RoadError::CorruptedWorldFile {
            reason: format!("Network validation failed: {e}"),
        })?;
        Ok(snapshot)
    }
}

/// Runs the whole pipeline: connectivity, routing, crossings, elevation, geometry, graph
pub struct RoadNetworkGenerator {
    params: WorldParams,
    settings: GenerationSettings,
    graph_builder: SettlementGraphBuilder,
    router: TerrainRouter,
    classifier: CrossingClassifier,
    elevation: ElevationAdjuster,
    tessellator: GeometryTessellator,
}

impl RoadNetworkGenerator {
    pub fn new(params: WorldParams, settings: GenerationSettings) -> RoadResult<Self> {
        params.validate().map_err(|e| RoadError::InvalidWorldParams {
            reason: e.to_string(),
        })?;

        Ok(Self {
            graph_builder: SettlementGraphBuilder::new(&params, &settings.connectivity),
            router: TerrainRouter::new(&params, &settings.routing),
            classifier: CrossingClassifier::new(&params, &settings.crossing),
            elevation: ElevationAdjuster::new(&params, &settings.elevation),
            tessellator: GeometryTessellator::new(&settings.tessellation),
            params,
            settings,
        })
    }

    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Build the road network for a set of settlements.
    ///
    /// Failures are recorded per segment and never abort the batch. Without a terrain
    /// the network is still built from straight unsampled lines.
    pub fn generate(
        &self,
        settlements: &[Settlement],
        terrain: Option<&dyn TerrainQuery>,
    ) -> GenerationResult {
        let mut result = GenerationResult::empty(self.settings.graph.snap_tolerance.get());

        if terrain.is_none() {
            warn!("No terrain supplied, generating roads without terrain sampling");
            result.warnings.push(RoadError::TerrainQueryUnavailable);
        }

        let mut valid = Vec::with_capacity(settlements.len());
        for settlement in settlements {
            match settlement.validate() {
                Ok(()) => valid.push(settlement.clone()),
                Err(e) => {
                    warn!("Skipping settlement {}: {}", settlement.id, e);
                    result.warnings.push(RoadError::InvalidArgument {
                        reason: format!("settlement {}: {e}", settlement.id),
                    });
                }
            }
        }

        let plan = match self.graph_builder.build(&valid, terrain) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Road network not generated: {}", e);
                result.errors.push(e);
                result.success = false;
                return result;
            }
        };
        result.planned_connections = plan.connections.len();

        for connection in &plan.connections {
            self.build_connection(connection, terrain, &mut result);
        }

        result.success = result.errors.is_empty();
        info!(
            "Generated {} road segments ({} bridges) from {} connections: \
             {} errors, {} warnings, {} violations",
            result.road_segments.len(),
            result.bridge_count(),
            result.planned_connections,
            result.errors.len(),
            result.warnings.len(),
            result.violations.len()
        );
        result
    }

    /// Road surface height at the land point next to a shore
    fn bank_height(
        &self,
        neighbour: Option<&PolylinePiece>,
        at_end: bool,
        fallback: Vec3,
        road_type: RoadType,
        terrain: &dyn TerrainQuery,
    ) -> f32 {
        let point = neighbour
            .and_then(|piece| {
                if at_end {
                    piece.points.iter().rev().nth(1)
                } else {
                    piece.points.get(1)
                }
            })
            .copied()
            .unwrap_or(fallback);
        terrain.height_at(point.x, point.z) + road_type.surface_offset()
    }

    /// Deck profile for a bridge piece, from the road heights on both banks
    fn bridge_profile(
        &self,
        pieces: &[PolylinePiece],
        k: usize,
        crossing: &WaterCrossing,
        road_type: RoadType,
        terrain: &dyn TerrainQuery,
    ) -> BridgeProfile {
        let previous = k.checked_sub(1).and_then(|i| pieces.get(i));
        let next = pieces.get(k + 1);
        let banks = (
            self.bank_height(previous, true, crossing.start_pos, road_type, terrain),
            self.bank_height(next, false, crossing.end_pos, road_type, terrain),
        );
        let tier = self.classifier.classify(crossing.length);
        BridgeProfile::new(tier, crossing, banks, self.params.sea_level)
    }

    fn build_connection(
        &self,
        connection: &PlannedConnection,
        terrain: Option<&dyn TerrainQuery>,
        result: &mut GenerationResult,
    ) {
        let allow_bridges = self.settings.routing.allow_bridges;
        let road_type = connection.road_type;
        let width = connection.width;

        let outcome = self.router.route(connection.from, connection.to, allow_bridges, terrain);
        if let Some(warning) = outcome.warning {
            result.warnings.push(warning);
        }

        let crossings = match terrain {
            Some(terrain) if allow_bridges => {
                self.classifier.detect_crossings(&outcome.polyline, terrain)
            }
            _ => Vec::new(),
        };
        let pieces = split_at_crossings(&outcome.polyline, &crossings);
        if pieces.is_empty() {
            let error = RoadError::DegenerateGeometry {
                segment: result.road_segments.len(),
                points: outcome.polyline.len(),
            };
            warn!("Skipping connection {} -> {}: {}", connection.from_id, connection.to_id, error);
            result.errors.push(error);
            return;
        }

        // Decks get their heights first and stay fixed while the approaches are adjusted
        let mut profiles: Vec<Option<BridgeProfile>> = Vec::with_capacity(pieces.len());
        let mut combined: Polyline = Vec::new();
        let mut locked: Vec<bool> = Vec::new();
        let mut ranges: Vec<(usize, usize)> = Vec::with_capacity(pieces.len());

        for (k, piece) in pieces.iter().enumerate() {
            let mut points = piece.points.clone();
            let profile = match (piece.crossing.and_then(|i| crossings.get(i)), terrain) {
                (Some(crossing), Some(terrain)) => {
                    let profile = self.bridge_profile(&pieces, k, crossing, road_type, terrain);
                    profile.apply_to_deck(&mut points);
                    Some(profile)
                }
                _ => None,
            };
            let is_bridge = profile.is_some();
            profiles.push(profile);

            let start = match combined.last() {
                Some(last) if horizontal_distance(*last, points[0]) < 1e-3 => {
                    let shared = combined.len() - 1;
                    if is_bridge {
                        combined[shared] = points[0];
                        locked[shared] = true;
                    }
                    combined.extend_from_slice(&points[1..]);
                    locked.extend(std::iter::repeat_n(is_bridge, points.len() - 1));
                    shared
                }
                _ => {
                    let first = combined.len();
                    locked.extend(std::iter::repeat_n(is_bridge, points.len()));
                    combined.extend(points);
                    first
                }
            };
            ranges.push((start, combined.len() - 1));
        }

        let adjusted = self.elevation.adjust(&combined, width, road_type, terrain, &locked);

        for ((start, end), profile) in ranges.into_iter().zip(profiles) {
            let id = result.road_segments.len();
            let points = adjusted[start..=end].to_vec();
            let piece_locked = &locked[start..=end];

            let built = match &profile {
                Some(profile) => {
                    result.violations.extend(
                        self.elevation
                            .check_bridge_clearance(&points, profile.clearance())
                            .into_iter()
                            .map(|v| v.for_segment(id)),
                    );
                    self.tessellator
                        .bridge_meshes(profile, &points, width, terrain)
                        .map(|meshes| (points.clone(), meshes.all().cloned().collect::<Vec<_>>()))
                }
                None => {
                    let material = MeshMaterial::Road(road_type);
                    let grade = GradeConstraint {
                        max_gradient: self.elevation.max_gradient(),
                        lock_start: piece_locked.first().copied().unwrap_or(false),
                        lock_end: piece_locked.last().copied().unwrap_or(false),
                    };
                    let built = match terrain {
                        Some(terrain) => self
                            .tessellator
                            .tessellate_on_terrain(
                                &points,
                                width,
                                road_type.surface_offset(),
                                material,
                                terrain,
                                grade,
                            )
                            .map(|road| (road.polyline, vec![road.mesh])),
                        None => self
                            .tessellator
                            .tessellate(&points, width, material)
                            .map(|mesh| (points.clone(), vec![mesh])),
                    };
                    // Diagnostics describe the road that is actually emitted
                    if let Ok((polyline, _)) = &built {
                        let final_locked = grade.locks(polyline.len());
                        result.violations.extend(
                            self.elevation
                                .check_constraints(polyline, terrain, &final_locked)
                                .into_iter()
                                .map(|v| v.for_segment(id)),
                        );
                    }
                    built
                }
            };

            let (polyline, parts) = match built {
                Ok(built) => built,
                Err(e) => {
                    let error = e.for_segment(id);
                    warn!("Skipping segment {}: {}", id, error);
                    result.errors.push(error);
                    continue;
                }
            };

            let bridge = profile.map(|profile| BridgeInfo {
                structure: profile.tier.structure(),
                supports: profile.supports(&polyline, terrain),
                profile,
            });
            let is_bridge = bridge.is_some();

            let (Some(first), Some(last)) = (polyline.first().copied(), polyline.last().copied())
            else {
                continue;
            };
            let mut spec = EdgeSpec::new(road_type)
                .with_waypoints(polyline.clone())
                .bridge(is_bridge)
                .segment(id);
            spec.width = width;
            match result.navigation_graph.add_edge_between(first, last, spec) {
                Ok(_) => {}
                Err(e @ RoadError::SelfLoopEdge { .. }) => {
                    debug!(
                        "Segment {} is shorter than the snap tolerance, not added to the graph",
                        id
                    );
                    result.warnings.push(e);
                }
                Err(e) => result.errors.push(e),
            }

            debug!(
                "Segment {}: {} {} road, {} points, {:.0}m{}",
                id,
                connection.kind,
                road_type,
                polyline.len(),
                polyline_length(&polyline),
                if is_bridge { " (bridge)" } else { "" }
            );

            result.meshes.push(SegmentMesh {
                segment_id: id,
                road_type,
                is_bridge,
                parts,
            });
            result.road_segments.push(RoadSegment {
                id,
                from_settlement: connection.from_id,
                to_settlement: connection.to_id,
                connection: connection.kind,
                road_type,
                width,
                polyline,
                route_kind: outcome.kind,
                bridge,
            });
        }
    }

    /// Lower terrain under every land segment. Cells under bridge decks are left alone.
    ///
    /// Returns the number of cells changed. Fails when carving is enabled but no writable
    /// terrain is supplied.
    pub fn carve_terrain(
        &self,
        result: &GenerationResult,
        terrain: Option<&mut dyn TerrainCarve>,
    ) -> RoadResult<usize> {
        if !self.settings.carving.enabled {
            debug!("Terrain carving disabled");
            return Ok(0);
        }
        let terrain = terrain.ok_or(RoadError::MissingTerrainForCarving)?;

        let shoulder = self.settings.carving.shoulder_width;
        let exclusions: Vec<DeckFootprint> = result
            .road_segments
            .iter()
            .filter(|segment| segment.is_bridge())
            .map(|segment| DeckFootprint {
                points: segment.polyline.clone(),
                half_width: segment.width * 0.5 + shoulder,
            })
            .collect();

        let mut changed = 0;
        for segment in result.road_segments.iter().filter(|s| !s.is_bridge()) {
            changed += carve_polyline(
                terrain,
                &segment.polyline,
                segment.width,
                segment.road_type.surface_offset(),
                &self.settings.carving,
                &exclusions,
            );
        }

        info!(
            "Carved {} terrain cells under {} land segments",
            changed,
            result.road_segments.len() - exclusions.len()
        );
        Ok(changed)
    }
}
