use super::polyline::Polyline;
use crate::terrain::TerrainQuery;
use bevy::prelude::*;

/// Split segments whose midpoint strays from the terrain.
///
/// A segment is halved when the terrain surface at its midpoint differs from the
/// interpolated road height by more than `tolerance`. Inserted midpoints stay on the
/// road line, so grades set by elevation adjustment are unchanged and later clearance
/// raises get finer segments to work with. Each original segment is split at most
/// `max_depth` levels deep, so the result has at most `2^max_depth` pieces per input segment.
pub fn subdivide(
    points: &[Vec3],
    terrain: &dyn TerrainQuery,
    surface_offset: f32,
    tolerance: f32,
    max_depth: u32,
) -> Polyline {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut result = vec![*first];
    let mut stack: Vec<(Vec3, Vec3, u32)> = Vec::new();

    for pair in points.windows(2) {
        stack.push((pair[0], pair[1], 0));

        while let Some((a, b, depth)) = stack.pop() {
            let mid = (a + b) * 0.5;
            let surface = terrain.height_at(mid.x, mid.z) + surface_offset;

            if depth < max_depth && (surface - mid.y).abs() > tolerance {
                // Right half first so the left half pops next
                stack.push((mid, b, depth + 1));
                stack.push((a, mid, depth + 1));
            } else {
                result.push(b);
            }
        }
    }

    result
}
