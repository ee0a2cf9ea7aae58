use crate::generation::diagnostics::{ConstraintViolation, ViolationKind};
use crate::geometry::polyline::{Polyline, horizontal_distance};
use crate::resources::{ElevationSettings, WorldParams};
use crate::settlements::RoadType;
use crate::terrain::TerrainQuery;
use crate::terrain::constants::{CUT_FILL_WINDOW, MAX_GRADIENT_ROUNDS};
use bevy::prelude::*;

pub mod carving;

const GRADIENT_EPSILON: f32 = 1e-3;
const CLEARANCE_EPSILON: f32 = 1e-3;

/// Fits road heights to terrain under gradient and clearance limits
pub struct ElevationAdjuster {
    params: WorldParams,
    settings: ElevationSettings,
}

impl ElevationAdjuster {
    pub fn new(params: &WorldParams, settings: &ElevationSettings) -> Self {
        Self {
            params: *params,
            settings: settings.clone(),
        }
    }

    pub fn max_gradient(&self) -> f32 {
        self.settings.max_gradient.get()
    }

    /// Naive road surface height: the highest ground under the road plus the type offset
    pub fn target_height(
        &self,
        point: Vec3,
        right: Vec3,
        width: f32,
        road_type: RoadType,
        terrain: &dyn TerrainQuery,
    ) -> f32 {
        let centre = terrain.height_at(point.x, point.z);
        let half = right * (width * 0.5);
        let left_edge = terrain.height_at(point.x - half.x, point.z - half.z);
        let right_edge = terrain.height_at(point.x + half.x, point.z + half.z);
        let edge_floor = left_edge.max(right_edge) + self.settings.min_clearance;
        (centre + road_type.surface_offset()).max(edge_floor)
    }

    /// Fit a polyline's heights to terrain, respecting locked points such as bridge decks
    pub fn adjust(
        &self,
        polyline: &[Vec3],
        width: f32,
        road_type: RoadType,
        terrain: Option<&dyn TerrainQuery>,
        locked: &[bool],
    ) -> Polyline {
        let mut points = polyline.to_vec();
        let is_locked = |i: usize| locked.get(i).copied().unwrap_or(false);

        if let Some(terrain) = terrain {
            let ground: Vec<f32> = points.iter().map(|p| terrain.height_at(p.x, p.z)).collect();
            let targets: Vec<f32> = (0..points.len())
                .map(|i| {
                    let right = lateral_direction(&points, i);
                    self.target_height(points[i], right, width, road_type, terrain)
                })
                .collect();

            let window_offset = road_type.surface_offset();
            for i in 0..points.len() {
                if is_locked(i) {
                    continue;
                }
                let slope = terrain.slope_at(points[i].x, points[i].z);
                let mut target = targets[i];
                if slope > self.settings.cut_fill_slope_degrees {
                    target = self.cut_or_fill(&ground, i, target, window_offset);
                }
                let low = ground[i] + self.settings.min_clearance;
                let high = ground[i] + self.settings.max_clearance.get();
                points[i].y = target.clamp(low, high.max(low));
            }
        }

        let rounds = self.clamp_gradient(&mut points, locked);
        debug!(
            "Adjusted {} points ({} locked) in {} gradient round(s)",
            points.len(),
            locked.iter().filter(|l| **l).count(),
            rounds
        );
        points
    }

    /// Replace a steep-ground target with a grade line taken from the neighbouring ground
    fn cut_or_fill(&self, ground: &[f32], i: usize, target: f32, offset: f32) -> f32 {
        let lo = i.saturating_sub(CUT_FILL_WINDOW);
        let hi = (i + CUT_FILL_WINDOW).min(ground.len() - 1);
        let window = &ground[lo..=hi];
        let reference = window.iter().sum::<f32>() / window.len() as f32 + offset;

        if reference < target {
            if target - reference > self.settings.min_cut_depth {
                reference.max(ground[i] + self.settings.min_clearance)
            } else {
                target
            }
        } else {
            reference.min(ground[i] + self.settings.max_fill_height)
        }
    }

    /// Forward then backward gradient clamp, repeated while locked points leave residual excess.
    /// Returns the number of rounds run.
    pub fn clamp_gradient(&self, points: &mut [Vec3], locked: &[bool]) -> usize {
        let limit = self.max_gradient();
        let is_locked = |i: usize| locked.get(i).copied().unwrap_or(false);
        let mut rounds = 0;

        while rounds < MAX_GRADIENT_ROUNDS {
            rounds += 1;

            for i in 1..points.len() {
                if is_locked(i) {
                    continue;
                }
                let max_rise = limit * horizontal_distance(points[i - 1], points[i]);
                let previous = points[i - 1].y;
                points[i].y = points[i].y.clamp(previous - max_rise, previous + max_rise);
            }

            for i in (0..points.len().saturating_sub(1)).rev() {
                if is_locked(i) {
                    continue;
                }
                let max_rise = limit * horizontal_distance(points[i], points[i + 1]);
                let next = points[i + 1].y;
                points[i].y = points[i].y.clamp(next - max_rise, next + max_rise);
            }

            if locked.iter().all(|l| !*l) || self.max_gradient_excess(points) <= GRADIENT_EPSILON {
                break;
            }
        }

        rounds
    }

    fn max_gradient_excess(&self, points: &[Vec3]) -> f32 {
        let limit = self.max_gradient();
        points
            .windows(2)
            .map(|pair| {
                (pair[1].y - pair[0].y).abs() - limit * horizontal_distance(pair[0], pair[1])
            })
            .fold(0.0, f32::max)
    }

    /// Report gradient and clearance limits the polyline still breaks
    pub fn check_constraints(
        &self,
        polyline: &[Vec3],
        terrain: Option<&dyn TerrainQuery>,
        locked: &[bool],
    ) -> Vec<ConstraintViolation> {
        let limit = self.max_gradient();
        let is_locked = |i: usize| locked.get(i).copied().unwrap_or(false);
        let mut violations = Vec::new();

        for pair in polyline.windows(2) {
            let run = horizontal_distance(pair[0], pair[1]);
            let rise = (pair[1].y - pair[0].y).abs();
            if rise > limit * run + GRADIENT_EPSILON {
                let measured = if run > f32::EPSILON { rise / run } else { f32::INFINITY };
                violations.push(ConstraintViolation::new(
                    ViolationKind::Gradient,
                    pair[0].lerp(pair[1], 0.5),
                    measured,
                    limit,
                ));
            }
        }

        if let Some(terrain) = terrain {
            for (i, p) in polyline.iter().enumerate() {
                if is_locked(i) {
                    continue;
                }
                let clearance = p.y - terrain.height_at(p.x, p.z);
                if clearance < self.settings.min_clearance - CLEARANCE_EPSILON {
                    violations.push(ConstraintViolation::new(
                        ViolationKind::ClearanceLow,
                        *p,
                        clearance,
                        self.settings.min_clearance,
                    ));
                } else if clearance > self.settings.max_clearance.get() + CLEARANCE_EPSILON {
                    violations.push(ConstraintViolation::new(
                        ViolationKind::ClearanceHigh,
                        *p,
                        clearance,
                        self.settings.max_clearance.get(),
                    ));
                }
            }
        }

        violations
    }

    /// Report deck points lower than the bridge's required water clearance
    pub fn check_bridge_clearance(
        &self,
        deck: &[Vec3],
        clearance: f32,
    ) -> Vec<ConstraintViolation> {
        let required = self.params.sea_level + clearance;
        deck.iter()
            .filter(|p| p.y < required - CLEARANCE_EPSILON)
            .map(|p| {
                ConstraintViolation::new(
                    ViolationKind::BridgeClearance,
                    *p,
                    p.y - self.params.sea_level,
                    clearance,
                )
            })
            .collect()
    }
}

/// Raise-only gradient repair: lift points until no unlocked point sits more than
/// `limit` per metre below a neighbour. Clearance can only improve.
///
/// One forward and one backward pass settle every pair an unlocked point can fix.
/// Returns the number of points lifted.
pub fn lift_to_gradient(points: &mut [Vec3], limit: f32, locked: &[bool]) -> usize {
    let is_locked = |i: usize| locked.get(i).copied().unwrap_or(false);
    let mut lifted = vec![false; points.len()];

    for i in 1..points.len() {
        let floor = points[i - 1].y - limit * horizontal_distance(points[i - 1], points[i]);
        if !is_locked(i) && points[i].y < floor {
            points[i].y = floor;
            lifted[i] = true;
        }
    }
    for i in (0..points.len().saturating_sub(1)).rev() {
        let floor = points[i + 1].y - limit * horizontal_distance(points[i], points[i + 1]);
        if !is_locked(i) && points[i].y < floor {
            points[i].y = floor;
            lifted[i] = true;
        }
    }

    lifted.into_iter().filter(|l| *l).count()
}

/// Horizontal unit vector to the right of the travel direction at vertex `i`
pub fn lateral_direction(points: &[Vec3], i: usize) -> Vec3 {
    let forward = crate::geometry::ribbon::forward_at(points, i);
    let right = forward.cross(Vec3::Y);
    Vec3::new(right.x, 0.0, right.z).normalize_or(Vec3::X)
}
