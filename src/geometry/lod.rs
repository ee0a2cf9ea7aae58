use super::polyline::Polyline;
use crate::generation::errors::{RoadError, RoadResult};
use bevy::prelude::*;

/// Keep every `2^level`-th point, always keeping both ends.
///
/// Level 0 returns the polyline unchanged.
pub fn decimate(points: &[Vec3], level: u32) -> RoadResult<Polyline> {
    if points.len() < 2 {
        return Err(RoadError::DegenerateGeometry {
            segment: 0,
            points: points.len(),
        });
    }

    let step = 1usize.checked_shl(level).unwrap_or(usize::MAX).max(1);
    let last = points.len() - 1;

    let mut result: Polyline = points.iter().step_by(step).copied().collect();
    if last % step != 0 {
        result.push(points[last]);
    }
    Ok(result)
}

/// Decimated copies for levels `0..levels`
pub fn lod_chain(points: &[Vec3], levels: u32) -> RoadResult<Vec<Polyline>> {
    (0..levels.max(1)).map(|level| decimate(points, level)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Polyline {
        (0..n).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_level_zero_is_identity() {
        let points = line(7);
        assert_eq!(decimate(&points, 0).unwrap(), points);
    }

    #[test]
    fn test_keeps_endpoints() {
        let points = line(10);
        let level1 = decimate(&points, 1).unwrap();
        let xs: Vec<f32> = level1.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0, 6.0, 8.0, 9.0]);

        let level2 = decimate(&points, 2).unwrap();
        let xs: Vec<f32> = level2.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 4.0, 8.0, 9.0]);

        // Coarser than the polyline itself
        assert_eq!(decimate(&points, 10).unwrap(), vec![points[0], points[9]]);
    }

    #[test]
    fn test_degenerate_input() {
        assert!(matches!(
            decimate(&line(1), 1),
            Err(RoadError::DegenerateGeometry { points: 1, .. })
        ));
        assert!(decimate(&[], 0).is_err());
    }

    #[test]
    fn test_lod_chain_shrinks() {
        let chain = lod_chain(&line(33), 4).unwrap();
        let lengths: Vec<usize> = chain.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![33, 17, 9, 5]);
    }
}
