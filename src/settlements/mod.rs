use crate::generation::errors::{RoadError, RoadResult};
use crate::geometry::polyline::resample_line;
use crate::map::Settlement;
use crate::resources::{ConnectivitySettings, WorldParams};
use crate::terrain::TerrainQuery;
use crate::terrain::constants::*;
use bevy::prelude::*;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub mod union_find;

use union_find::UnionFind;

/// Road class, which drives width, surface offset and graph metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum RoadType {
    #[display("highway")]
    Highway,
    #[display("arterial")]
    Arterial,
    #[display("local")]
    Local,
    #[display("lane")]
    Lane,
}

impl RoadType {
    pub fn from_combined_population(population: u32) -> Self {
        match population {
            p if p >= HIGHWAY_POPULATION => RoadType::Highway,
            p if p >= ARTERIAL_POPULATION => RoadType::Arterial,
            _ => RoadType::Local,
        }
    }

    pub fn width(self) -> f32 {
        match self {
            RoadType::Highway => HIGHWAY_WIDTH,
            RoadType::Arterial => ARTERIAL_WIDTH,
            RoadType::Local => LOCAL_WIDTH,
            RoadType::Lane => LANE_WIDTH,
        }
    }

    /// Height of the road surface above untouched terrain
    pub fn surface_offset(self) -> f32 {
        match self {
            RoadType::Highway => HIGHWAY_SURFACE_OFFSET,
            RoadType::Arterial => ARTERIAL_SURFACE_OFFSET,
            RoadType::Local => LOCAL_SURFACE_OFFSET,
            RoadType::Lane => LANE_SURFACE_OFFSET,
        }
    }
}

/// Weighted settlement pair considered for the spanning tree
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEdge {
    pub from_index: usize,
    pub to_index: usize,
    pub from_id: u32,
    pub to_id: u32,
    pub euclidean_distance: f32,
    pub terrain_penalty: f32,
    pub water_penalty: f32,
    pub weight: f32,
}

/// Why a connection was added to the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum ConnectionKind {
    #[display("spanning")]
    Spanning,
    #[display("important")]
    Important,
    #[display("regional")]
    Regional,
}

/// A settlement pair selected for routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedConnection {
    pub from_index: usize,
    pub to_index: usize,
    pub from_id: u32,
    pub to_id: u32,
    pub from: Vec3,
    pub to: Vec3,
    pub road_type: RoadType,
    pub width: f32,
    pub kind: ConnectionKind,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectivityPlan {
    pub connections: Vec<PlannedConnection>,
    pub candidate_count: usize,
    pub spanning_edge_count: usize,
}

impl ConnectivityPlan {
    pub fn count_of(&self, kind: ConnectionKind) -> usize {
        self.connections.iter().filter(|c| c.kind == kind).count()
    }
}

/// Plans which settlement pairs get a road
pub struct SettlementGraphBuilder {
    params: WorldParams,
    settings: ConnectivitySettings,
}

impl SettlementGraphBuilder {
    pub fn new(params: &WorldParams, settings: &ConnectivitySettings) -> Self {
        Self {
            params: *params,
            settings: settings.clone(),
        }
    }

    /// Build all pairwise candidates with their weights
    pub fn candidate_edges(
        &self,
        settlements: &[Settlement],
        terrain: Option<&dyn TerrainQuery>,
    ) -> Vec<CandidateEdge> {
        let n = settlements.len();
        let mut candidates = Vec::with_capacity(n * n.saturating_sub(1) / 2);

        for i in 0..n {
            for j in (i + 1)..n {
                candidates.push(self.candidate_edge(settlements, i, j, terrain));
            }
        }

        candidates
    }

    fn candidate_edge(
        &self,
        settlements: &[Settlement],
        i: usize,
        j: usize,
        terrain: Option<&dyn TerrainQuery>,
    ) -> CandidateEdge {
        let a = &settlements[i];
        let b = &settlements[j];
        let distance = a.distance_xz(b);
        let combined = a.population.saturating_add(b.population).max(1);
        let discount = 1.0 / (combined as f32 / 100.0);

        let (terrain_penalty, crosses_water) = match terrain {
            Some(terrain) => (
                self.terrain_difficulty(a.center, b.center, terrain),
                self.crosses_water(a.center, b.center, terrain),
            ),
            None => (0.0, false),
        };

        let base = distance * discount + terrain_penalty;
        let water_penalty = if crosses_water {
            base * WATER_PENALTY_MULTIPLIER
        } else {
            0.0
        };

        CandidateEdge {
            from_index: i,
            to_index: j,
            from_id: a.id,
            to_id: b.id,
            euclidean_distance: distance,
            terrain_penalty,
            water_penalty,
            weight: base + water_penalty,
        }
    }

    /// Average penalised slope along the straight line between two points
    pub fn terrain_difficulty(&self, from: Vec3, to: Vec3, terrain: &dyn TerrainQuery) -> f32 {
        let samples = resample_line(from, to, self.settings.slope_sample_spacing);
        let total: f32 = samples
            .iter()
            .map(|p| {
                let slope = terrain.slope_at(p.x, p.z);
                if slope > STEEP_SLOPE_DEGREES {
                    slope * 2.0
                } else if slope > MODERATE_SLOPE_DEGREES {
                    slope
                } else {
                    0.0
                }
            })
            .sum();
        total / samples.len() as f32
    }

    /// Whether any sample of the straight line lies below sea level
    pub fn crosses_water(&self, from: Vec3, to: Vec3, terrain: &dyn TerrainQuery) -> bool {
        resample_line(from, to, self.settings.water_sample_spacing)
            .iter()
            .any(|p| terrain.height_at(p.x, p.z) < self.params.sea_level)
    }

    /// Kruskal over candidates sorted by ascending weight
    pub fn minimum_spanning_tree(
        &self,
        settlement_count: usize,
        candidates: &[CandidateEdge],
    ) -> Vec<CandidateEdge> {
        let mut sorted: Vec<&CandidateEdge> = candidates.iter().collect();
        sorted.sort_by(|a, b| {
            a.weight
                .total_cmp(&b.weight)
                .then(a.from_index.cmp(&b.from_index))
                .then(a.to_index.cmp(&b.to_index))
        });

        let target = settlement_count.saturating_sub(1);
        let mut uf = UnionFind::new(settlement_count);
        let mut accepted = Vec::with_capacity(target);

        for candidate in sorted {
            if accepted.len() == target {
                break;
            }
            if uf.union(candidate.from_index, candidate.to_index) {
                accepted.push(candidate.clone());
            }
        }

        if accepted.len() < target {
            warn!(
                "Spanning tree incomplete: {} of {} edges accepted",
                accepted.len(),
                target
            );
        }

        accepted
    }

    /// Extra links on top of the spanning tree, as index pairs with their reason
    pub fn secondary_connections(
        &self,
        settlements: &[Settlement],
        existing: &[(usize, usize)],
    ) -> Vec<(usize, usize, ConnectionKind)> {
        let mut linked: HashSet<(usize, usize)> =
            existing.iter().map(|&(a, b)| ordered_pair(a, b)).collect();
        let mut extra = Vec::new();
        let n = settlements.len();

        let important = self.settings.important_population;
        for i in 0..n {
            for j in (i + 1)..n {
                if settlements[i].population >= important
                    && settlements[j].population >= important
                    && linked.insert((i, j))
                {
                    extra.push((i, j, ConnectionKind::Important));
                }
            }
        }

        let radius = self.settings.regional_radius;
        let mut eligible: Vec<(usize, usize, f32)> = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let distance = settlements[i].distance_xz(&settlements[j]);
                if distance <= radius && !linked.contains(&(i, j)) {
                    eligible.push((i, j, distance));
                }
            }
        }
        eligible.sort_by(|a, b| a.2.total_cmp(&b.2).then((a.0, a.1).cmp(&(b.0, b.1))));

        let cap = (eligible.len() as f32 * self.settings.max_regional_fraction).floor() as usize;
        let mut regional = 0;
        for (i, j, distance) in eligible {
            if regional >= cap {
                break;
            }
            let probability = (1.0 - distance / radius) * self.settings.regional_link_scale;
            if regional_link_hash(settlements[i].center, settlements[j].center) < probability {
                linked.insert((i, j));
                extra.push((i, j, ConnectionKind::Regional));
                regional += 1;
            }
        }

        extra
    }

    /// Plan the full connection set for a list of settlements
    pub fn build(
        &self,
        settlements: &[Settlement],
        terrain: Option<&dyn TerrainQuery>,
    ) -> RoadResult<ConnectivityPlan> {
        if settlements.len() < 2 {
            return Err(RoadError::InsufficientInput {
                count: settlements.len(),
            });
        }

        let candidates = self.candidate_edges(settlements, terrain);
        let mst = self.minimum_spanning_tree(settlements.len(), &candidates);
        let existing: Vec<(usize, usize)> =
            mst.iter().map(|e| (e.from_index, e.to_index)).collect();

        let mut connections: Vec<PlannedConnection> = mst
            .iter()
            .map(|e| self.plan(settlements, e.from_index, e.to_index, ConnectionKind::Spanning))
            .collect();
        connections.extend(
            self.secondary_connections(settlements, &existing)
                .into_iter()
                .map(|(i, j, kind)| self.plan(settlements, i, j, kind)),
        );

        let plan = ConnectivityPlan {
            candidate_count: candidates.len(),
            spanning_edge_count: mst.len(),
            connections,
        };

        info!(
            "Planned {} connections for {} settlements ({} spanning, {} important, {} regional)",
            plan.connections.len(),
            settlements.len(),
            plan.spanning_edge_count,
            plan.count_of(ConnectionKind::Important),
            plan.count_of(ConnectionKind::Regional)
        );

        Ok(plan)
    }

    fn plan(
        &self,
        settlements: &[Settlement],
        i: usize,
        j: usize,
        kind: ConnectionKind,
    ) -> PlannedConnection {
        let a = &settlements[i];
        let b = &settlements[j];
        let road_type =
            RoadType::from_combined_population(a.population.saturating_add(b.population));
        PlannedConnection {
            from_index: i,
            to_index: j,
            from_id: a.id,
            to_id: b.id,
            from: a.center,
            to: b.center,
            road_type,
            width: road_type.width(),
            kind,
        }
    }
}

fn ordered_pair(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

fn position_key(p: Vec3) -> u64 {
    ((p.x.to_bits() as u64) << 32) | p.z.to_bits() as u64
}

/// Deterministic value in [0, 1) for an unordered pair of positions
pub fn regional_link_hash(a: Vec3, b: Vec3) -> f32 {
    let (ka, kb) = {
        let (ka, kb) = (position_key(a), position_key(b));
        if ka <= kb { (ka, kb) } else { (kb, ka) }
    };
    let hash = splitmix64(splitmix64(ka) ^ kb.rotate_left(29));
    (hash >> 40) as f32 / (1u64 << 24) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FnTerrain;

    fn builder() -> SettlementGraphBuilder {
        SettlementGraphBuilder::new(&WorldParams::default(), &ConnectivitySettings::default())
    }

    fn is_connected(count: usize, edges: &[CandidateEdge]) -> bool {
        let mut uf = UnionFind::new(count);
        for e in edges {
            uf.union(e.from_index, e.to_index);
        }
        uf.components() == 1
    }

    #[test]
    fn test_road_type_lookup() {
        assert_eq!(RoadType::from_combined_population(1200), RoadType::Highway);
        assert_eq!(RoadType::from_combined_population(1000), RoadType::Highway);
        assert_eq!(RoadType::from_combined_population(400), RoadType::Arterial);
        assert_eq!(RoadType::from_combined_population(399), RoadType::Local);
        assert_eq!(RoadType::Highway.width(), 18.0);
        assert_eq!(RoadType::Arterial.width(), 12.0);
        assert_eq!(RoadType::Local.width(), 8.0);
        assert_eq!(RoadType::Highway.to_string(), "highway");
    }

    #[test]
    fn test_two_settlements_make_one_highway() {
        let settlements = vec![
            Settlement::new(1, Vec3::new(0.0, 10.0, 0.0), 600),
            Settlement::new(2, Vec3::new(5000.0, 12.0, 0.0), 600),
        ];
        let terrain = FnTerrain::new(10.0, |_, _| 10.0);
        let plan = builder().build(&settlements, Some(&terrain)).unwrap();

        // Both are important but already joined by the spanning edge
        assert_eq!(plan.connections.len(), 1);
        assert_eq!(plan.spanning_edge_count, 1);
        let connection = &plan.connections[0];
        assert_eq!(connection.road_type, RoadType::Highway);
        assert_eq!(connection.width, 18.0);
    }

    #[test]
    fn test_insufficient_input() {
        let settlements = vec![Settlement::new(1, Vec3::ZERO, 100)];
        let result = builder().build(&settlements, None);
        assert!(matches!(result, Err(RoadError::InsufficientInput { count: 1 })));
    }

    #[test]
    fn test_mst_is_spanning_for_scattered_settlements() {
        let settlements: Vec<Settlement> = (0..12)
            .map(|i| {
                let angle = i as f32 * 0.9;
                let radius = 300.0 + i as f32 * 150.0;
                Settlement::new(
                    i,
                    Vec3::new(angle.cos() * radius, 5.0, angle.sin() * radius),
                    50 + i * 37,
                )
            })
            .collect();
        let builder = builder();
        let candidates = builder.candidate_edges(&settlements, None);
        assert_eq!(candidates.len(), 66);

        let mst = builder.minimum_spanning_tree(settlements.len(), &candidates);
        assert_eq!(mst.len(), 11);
        assert!(is_connected(settlements.len(), &mst));
    }

    #[test]
    fn test_water_penalty_steers_spanning_tree() {
        let settlements = vec![
            Settlement::new(0, Vec3::new(0.0, 10.0, 0.0), 2000),
            Settlement::new(1, Vec3::new(1000.0, 10.0, 300.0), 50),
            Settlement::new(2, Vec3::new(2000.0, 10.0, 0.0), 2000),
        ];
        let builder = builder();

        // On dry land the cheap direct link between the two cities wins
        let dry = FnTerrain::new(10.0, |_, _| 10.0);
        let mst =
            builder.minimum_spanning_tree(3, &builder.candidate_edges(&settlements, Some(&dry)));
        assert!(mst.iter().any(|e| (e.from_index, e.to_index) == (0, 2)));

        // A lake on the direct line makes the detour through the village cheaper
        let lake = FnTerrain::new(10.0, |x, z| {
            if Vec2::new(x - 1000.0, z).length() < 100.0 { -10.0 } else { 10.0 }
        });
        let candidates = builder.candidate_edges(&settlements, Some(&lake));
        let direct = candidates
            .iter()
            .find(|e| (e.from_index, e.to_index) == (0, 2))
            .unwrap();
        assert!(direct.water_penalty > 0.0);

        let mut pairs: Vec<(usize, usize)> = builder
            .minimum_spanning_tree(3, &candidates)
            .iter()
            .map(|e| (e.from_index, e.to_index))
            .collect();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_terrain_difficulty_penalises_slopes() {
        let builder = builder();
        let gentle = FnTerrain::new(10.0, |x, _| x * 0.05);
        let steep = FnTerrain::new(10.0, |x, _| x * 0.6);
        let a = Vec3::ZERO;
        let b = Vec3::new(1000.0, 0.0, 0.0);

        assert_eq!(builder.terrain_difficulty(a, b, &gentle), 0.0);
        // atan(0.6) is about 31 degrees, counted twice
        let cost = builder.terrain_difficulty(a, b, &steep);
        assert!((cost - 62.0).abs() < 1.0, "cost was {cost}");
    }

    #[test]
    fn test_regional_hash_is_symmetric_and_bounded() {
        let a = Vec3::new(12.5, 0.0, -40.0);
        let b = Vec3::new(300.0, 7.0, 95.25);
        let h = regional_link_hash(a, b);
        assert_eq!(h, regional_link_hash(b, a));
        assert!((0.0..1.0).contains(&h));
        assert_ne!(h, regional_link_hash(a, Vec3::new(301.0, 7.0, 95.25)));
    }

    #[test]
    fn test_secondary_connections_are_bounded_and_reproducible() {
        let settlements: Vec<Settlement> = (0..20)
            .map(|i| {
                Settlement::new(
                    i,
                    Vec3::new((i % 5) as f32 * 180.0, 0.0, (i / 5) as f32 * 170.0),
                    120,
                )
            })
            .collect();
        let builder = builder();
        let first = builder.build(&settlements, None).unwrap();
        let second = builder.build(&settlements, None).unwrap();
        assert_eq!(first.connections, second.connections);

        // Nobody is important, so every extra link is regional
        assert_eq!(first.count_of(ConnectionKind::Important), 0);
        let spanning: Vec<(usize, usize)> = first
            .connections
            .iter()
            .filter(|c| c.kind == ConnectionKind::Spanning)
            .map(|c| (c.from_index, c.to_index))
            .collect();
        let extra = builder.secondary_connections(&settlements, &spanning);
        let eligible = (0..20)
            .flat_map(|i| ((i + 1)..20).map(move |j| (i, j)))
            .filter(|&(i, j)| settlements[i].distance_xz(&settlements[j]) <= 1000.0)
            .filter(|pair| !spanning.contains(pair))
            .count();
        assert!(extra.len() <= (eligible as f32 * 0.3).floor() as usize);
    }

    #[test]
    fn test_important_settlements_are_interlinked() {
        let settlements = vec![
            Settlement::new(0, Vec3::new(0.0, 0.0, 0.0), 800),
            Settlement::new(1, Vec3::new(3000.0, 0.0, 0.0), 300),
            Settlement::new(2, Vec3::new(6000.0, 0.0, 0.0), 900),
        ];
        let plan = builder().build(&settlements, None).unwrap();
        let important: Vec<&PlannedConnection> = plan
            .connections
            .iter()
            .filter(|c| c.kind == ConnectionKind::Important)
            .collect();
        assert_eq!(important.len(), 1);
        assert_eq!((important[0].from_id, important[0].to_id), (0, 2));
        assert_eq!(important[0].road_type, RoadType::Highway);
    }
}
