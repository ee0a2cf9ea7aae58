use super::polyline::horizontal_distance;
use crate::terrain::TerrainQuery;
use crate::terrain::constants::VALIDATION_RAISE_EPSILON;
use bevy::prelude::*;

/// Outcome of one validation pass over a road polyline
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValidationReport {
    pub segments_raised: usize,
    /// Offending segments left alone because an endpoint is locked
    pub segments_blocked: usize,
    pub max_deficit: f32,
}

impl ValidationReport {
    pub fn changed(&self) -> bool {
        self.segments_raised > 0
    }
}

/// Largest amount terrain pokes above `clearance` below the road surface on one segment.
///
/// Samples every `interval` metres along the centreline and both edges.
fn segment_deficit(
    a: Vec3,
    b: Vec3,
    half_width: f32,
    terrain: &dyn TerrainQuery,
    clearance: f32,
    interval: f32,
) -> f32 {
    let length = horizontal_distance(a, b);
    let samples = ((length / interval.max(0.1)).ceil() as usize).max(1);
    let direction = Vec3::new(b.x - a.x, 0.0, b.z - a.z).normalize_or(Vec3::X);
    let right = direction.cross(Vec3::Y).normalize_or(Vec3::Z);

    let mut deficit = f32::NEG_INFINITY;
    for k in 0..=samples {
        let t = k as f32 / samples as f32;
        let centre = a.lerp(b, t);
        for offset in [0.0, -half_width, half_width] {
            let sample = centre + right * offset;
            let needed = terrain.height_at(sample.x, sample.z) + clearance;
            deficit = deficit.max(needed - centre.y);
        }
    }
    deficit
}

/// Raise segments whose surface dips under terrain plus `clearance`.
///
/// Both endpoints of an offending segment go up by its deficit plus a millimetre, so
/// the whole segment clears. Raising only ever helps neighbouring segments, so a second
/// pass over the result changes nothing. Segments touching a `locked` point are counted
/// as blocked and not moved.
pub fn validate_clearance(
    points: &mut [Vec3],
    width: f32,
    terrain: &dyn TerrainQuery,
    clearance: f32,
    interval: f32,
    locked: &[bool],
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let half_width = width * 0.5;
    let is_locked = |i: usize| locked.get(i).copied().unwrap_or(false);

    for i in 0..points.len().saturating_sub(1) {
        let deficit =
            segment_deficit(points[i], points[i + 1], half_width, terrain, clearance, interval);
        if deficit > 0.0 && (is_locked(i) || is_locked(i + 1)) {
            report.segments_blocked += 1;
            report.max_deficit = report.max_deficit.max(deficit);
        } else if deficit > 0.0 {
            let raise = deficit + VALIDATION_RAISE_EPSILON;
            points[i].y += raise;
            points[i + 1].y += raise;
            report.segments_raised += 1;
            report.max_deficit = report.max_deficit.max(deficit);
        }
    }

    if report.changed() {
        debug!(
            "Validation raised {} segment(s), worst deficit {:.3}m",
            report.segments_raised, report.max_deficit
        );
    }
    report
}
