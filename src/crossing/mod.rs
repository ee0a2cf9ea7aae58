use crate::geometry::polyline::{Polyline, cumulative_distances, horizontal_distance};
use crate::resources::{CrossingSettings, WorldParams};
use crate::terrain::TerrainQuery;
use crate::terrain::constants::*;
use bevy::prelude::*;
use derive_more::Display;
use serde::{Deserialize, Serialize};

pub mod bridge_profile;

pub use bridge_profile::{BridgeProfile, SupportKind, SupportPlacement};

/// A maximal run of polyline samples over water.
///
/// `start_index` and `end_index` are the first and last wet vertices of the input
/// polyline. `start_pos` and `end_pos` are the refined shore points, which lie on the
/// polyline between the wet run and its dry neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterCrossing {
    pub start_index: usize,
    pub end_index: usize,
    pub start_pos: Vec3,
    pub end_pos: Vec3,
    /// Along-path horizontal length between the shore points
    pub length: f32,
    pub start_distance: f32,
    pub end_distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum BridgeTier {
    #[display("short")]
    Short,
    #[display("medium")]
    Medium,
    #[display("long")]
    Long,
    #[display("spanning")]
    Spanning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum BridgeStructure {
    #[display("beam")]
    Beam,
    #[display("arch")]
    Arch,
    #[display("suspension")]
    Suspension,
    #[display("cable-stayed")]
    CableStayed,
}

impl BridgeTier {
    pub fn from_span(span: f32) -> Self {
        if span <= SHORT_BRIDGE_MAX_SPAN {
            BridgeTier::Short
        } else if span <= MEDIUM_BRIDGE_MAX_SPAN {
            BridgeTier::Medium
        } else if span <= LONG_BRIDGE_MAX_SPAN {
            BridgeTier::Long
        } else {
            BridgeTier::Spanning
        }
    }

    /// Minimum deck height above sea level
    pub fn clearance(self) -> f32 {
        match self {
            BridgeTier::Short => SHORT_BRIDGE_CLEARANCE,
            BridgeTier::Medium => MEDIUM_BRIDGE_CLEARANCE,
            BridgeTier::Long => LONG_BRIDGE_CLEARANCE,
            BridgeTier::Spanning => SPANNING_BRIDGE_CLEARANCE,
        }
    }

    pub fn structure(self) -> BridgeStructure {
        match self {
            BridgeTier::Short => BridgeStructure::Beam,
            BridgeTier::Medium => BridgeStructure::Arch,
            BridgeTier::Long => BridgeStructure::Suspension,
            BridgeTier::Spanning => BridgeStructure::CableStayed,
        }
    }

    /// Support positions as fractions of the span, with their kind
    pub fn support_layout(self, span: f32) -> Vec<(f32, SupportKind)> {
        match self {
            BridgeTier::Short => vec![(0.0, SupportKind::Pillar), (1.0, SupportKind::Pillar)],
            BridgeTier::Medium => vec![
                (0.0, SupportKind::Pillar),
                (0.5, SupportKind::Pillar),
                (1.0, SupportKind::Pillar),
            ],
            BridgeTier::Long => vec![(0.0, SupportKind::Tower), (1.0, SupportKind::Tower)],
            BridgeTier::Spanning => {
                let count = ((span / SPANNING_TOWER_INTERVAL).floor() as usize).max(2);
                (0..count)
                    .map(|i| (i as f32 / (count - 1) as f32, SupportKind::Tower))
                    .collect()
            }
        }
    }
}

/// A contiguous piece of a routed polyline, either on land or on a bridge deck
#[derive(Debug, Clone, PartialEq)]
pub struct PolylinePiece {
    pub points: Polyline,
    /// Index into the crossing list when this piece is a bridge
    pub crossing: Option<usize>,
}

/// Detects water crossings and assigns bridge tiers
pub struct CrossingClassifier {
    params: WorldParams,
    settings: CrossingSettings,
}

impl CrossingClassifier {
    pub fn new(params: &WorldParams, settings: &CrossingSettings) -> Self {
        Self {
            params: *params,
            settings: settings.clone(),
        }
    }

    pub fn classify(&self, span: f32) -> BridgeTier {
        BridgeTier::from_span(span)
    }

    /// Deep enough below sea level, and confirmed by the surrounding ring of samples
    pub fn is_water_at(&self, x: f32, z: f32, terrain: &dyn TerrainQuery) -> bool {
        let sea = self.params.sea_level;
        let threshold = self.settings.water_threshold;
        if terrain.height_at(x, z) >= sea - threshold {
            return false;
        }

        let radius = self.settings.confirm_radius;
        let wet = (0..CONFIRM_SAMPLE_COUNT)
            .filter(|i| {
                let angle = *i as f32 / CONFIRM_SAMPLE_COUNT as f32 * std::f32::consts::TAU;
                let h = terrain.height_at(x + angle.cos() * radius, z + angle.sin() * radius);
                h < sea + threshold
            })
            .count();

        wet as f32 / CONFIRM_SAMPLE_COUNT as f32 >= self.settings.confirm_ratio
    }

    /// Scan a polyline for water runs, refine their shores and merge close ones
    pub fn detect_crossings(
        &self,
        polyline: &[Vec3],
        terrain: &dyn TerrainQuery,
    ) -> Vec<WaterCrossing> {
        if polyline.len() < 2 {
            return Vec::new();
        }

        let wet: Vec<bool> = polyline
            .iter()
            .map(|p| self.is_water_at(p.x, p.z, terrain))
            .collect();
        let along = cumulative_distances(polyline);

        let mut crossings: Vec<WaterCrossing> = Vec::new();
        let mut i = 0;
        while i < wet.len() {
            if !wet[i] {
                i += 1;
                continue;
            }
            let start = i;
            while i + 1 < wet.len() && wet[i + 1] {
                i += 1;
            }
            let end = i;
            i += 1;

            let start_pos = if start > 0 {
                self.refine_shore(polyline[start - 1], polyline[start], terrain)
            } else {
                polyline[0]
            };
            let end_pos = if end + 1 < polyline.len() {
                self.refine_shore(polyline[end + 1], polyline[end], terrain)
            } else {
                polyline[end]
            };

            let start_distance = if start > 0 {
                along[start - 1] + horizontal_distance(polyline[start - 1], start_pos)
            } else {
                0.0
            };
            let end_distance = along[end] + horizontal_distance(polyline[end], end_pos);

            let crossing = WaterCrossing {
                start_index: start,
                end_index: end,
                start_pos,
                end_pos,
                length: end_distance - start_distance,
                start_distance,
                end_distance,
            };

            match crossings.last_mut() {
                Some(previous)
                    if crossing.start_distance - previous.end_distance
                        < self.settings.merge_distance =>
                {
                    debug!(
                        "Merging crossings {:.1}m apart",
                        crossing.start_distance - previous.end_distance
                    );
                    previous.end_index = crossing.end_index;
                    previous.end_pos = crossing.end_pos;
                    previous.end_distance = crossing.end_distance;
                    previous.length = previous.end_distance - previous.start_distance;
                }
                _ => crossings.push(crossing),
            }
        }

        if !crossings.is_empty() {
            debug!(
                "Detected {} water crossing(s): {:?}",
                crossings.len(),
                crossings.iter().map(|c| c.length).collect::<Vec<_>>()
            );
        }

        crossings
    }

    /// Bisect between a dry and a wet point to locate the shore
    fn refine_shore(&self, dry: Vec3, wet: Vec3, terrain: &dyn TerrainQuery) -> Vec3 {
        let (mut lo, mut hi) = (dry, wet);
        for _ in 0..CROSSING_REFINE_STEPS {
            let mid = lo.lerp(hi, 0.5);
            if self.is_water_at(mid.x, mid.z, terrain) {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        lo.lerp(hi, 0.5)
    }
}

/// Cut a polyline into land and bridge pieces that share their boundary points
pub fn split_at_crossings(polyline: &[Vec3], crossings: &[WaterCrossing]) -> Vec<PolylinePiece> {
    let mut pieces = Vec::new();
    let mut current: Polyline = Vec::new();
    let mut cursor = 0;

    for (index, crossing) in crossings.iter().enumerate() {
        let start = crossing.start_index.min(polyline.len());
        let end = crossing.end_index.min(polyline.len().saturating_sub(1));

        current.extend_from_slice(&polyline[cursor.min(start)..start]);
        current.push(crossing.start_pos);
        push_piece(&mut pieces, std::mem::take(&mut current), None);

        let mut deck = vec![crossing.start_pos];
        if start <= end {
            deck.extend_from_slice(&polyline[start..=end]);
        }
        deck.push(crossing.end_pos);
        push_piece(&mut pieces, deck, Some(index));

        current.push(crossing.end_pos);
        cursor = end + 1;
    }

    if cursor < polyline.len() {
        current.extend_from_slice(&polyline[cursor..]);
    }
    push_piece(&mut pieces, current, None);

    pieces
}

fn push_piece(pieces: &mut Vec<PolylinePiece>, points: Polyline, crossing: Option<usize>) {
    let mut deduped: Polyline = Vec::with_capacity(points.len());
    for p in points {
        if deduped
            .last()
            .is_none_or(|last: &Vec3| horizontal_distance(*last, p) > 1e-3)
        {
            deduped.push(p);
        }
    }
    if deduped.len() >= 2 {
        pieces.push(PolylinePiece {
            points: deduped,
            crossing,
        });
    }
}
