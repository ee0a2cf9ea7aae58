use bevy::prelude::*;

/// Ordered sequence of world points along a road centreline.
pub type Polyline = Vec<Vec3>;

/// Distance between two points projected onto the XZ plane
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(b.x - a.x, b.z - a.z).length()
}

/// Full 3D length of a polyline
pub fn polyline_length(points: &[Vec3]) -> f32 {
    points.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

/// Length of a polyline projected onto the XZ plane
pub fn horizontal_length(points: &[Vec3]) -> f32 {
    points
        .windows(2)
        .map(|pair| horizontal_distance(pair[0], pair[1]))
        .sum()
}

/// Cumulative horizontal distance at every vertex, starting at 0
pub fn cumulative_distances(points: &[Vec3]) -> Vec<f32> {
    let mut distances = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            total += horizontal_distance(points[i - 1], *point);
        }
        distances.push(total);
    }
    distances
}

/// Point at a given horizontal distance along the polyline, clamped to its ends
pub fn point_at_distance(points: &[Vec3], distance: f32) -> Option<Vec3> {
    let first = *points.first()?;
    if distance <= 0.0 {
        return Some(first);
    }

    let mut travelled = 0.0;
    for pair in points.windows(2) {
        let step = horizontal_distance(pair[0], pair[1]);
        if travelled + step >= distance && step > f32::EPSILON {
            let t = (distance - travelled) / step;
            return Some(pair[0].lerp(pair[1], t));
        }
        travelled += step;
    }

    points.last().copied()
}

/// Closest point to `p` on segment `a`-`b` in the XZ plane, with its segment parameter
pub fn closest_point_on_segment_xz(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ab = Vec2::new(b.x - a.x, b.z - a.z);
    let ap = Vec2::new(p.x - a.x, p.z - a.z);
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return (a, 0.0);
    }
    let t = (ap.dot(ab) / len_sq).clamp(0.0, 1.0);
    (a.lerp(b, t), t)
}

/// Horizontal distance from `p` to the nearest point of the polyline
pub fn distance_to_polyline_xz(p: Vec3, points: &[Vec3]) -> Option<f32> {
    match points {
        [] => None,
        [only] => Some(horizontal_distance(p, *only)),
        _ => points
            .windows(2)
            .map(|pair| {
                let (closest, _) = closest_point_on_segment_xz(p, pair[0], pair[1]);
                horizontal_distance(p, closest)
            })
            .min_by(f32::total_cmp),
    }
}

/// Uniformly resample the straight line between two points in XZ, with at least 2 samples
pub fn resample_line(start: Vec3, end: Vec3, step: f32) -> Polyline {
    let length = horizontal_distance(start, end);
    let segments = ((length / step.max(f32::EPSILON)).ceil() as usize).max(1);
    (0..=segments)
        .map(|i| start.lerp(end, i as f32 / segments as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_ignore_height_in_horizontal_mode() {
        let points = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(3.0, 4.0, 4.0),
            Vec3::new(3.0, 4.0, 10.0),
        ];
        assert!((horizontal_length(&points) - 11.0).abs() < 1e-5);
        assert!(polyline_length(&points) > horizontal_length(&points));
        assert_eq!(cumulative_distances(&points), vec![0.0, 5.0, 11.0]);
    }

    #[test]
    fn test_point_at_distance() {
        let points = vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 10.0)];
        assert_eq!(point_at_distance(&points, 5.0), Some(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(point_at_distance(&points, 15.0), Some(Vec3::new(10.0, 0.0, 5.0)));
        assert_eq!(point_at_distance(&points, 100.0), Some(Vec3::new(10.0, 0.0, 10.0)));
        assert_eq!(point_at_distance(&[], 1.0), None);
    }

    #[test]
    fn test_distance_to_polyline() {
        let points = vec![Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0)];
        let d = distance_to_polyline_xz(Vec3::new(50.0, 30.0, 7.0), &points).unwrap();
        assert!((d - 7.0).abs() < 1e-5);
        let d = distance_to_polyline_xz(Vec3::new(-3.0, 0.0, 4.0), &points).unwrap();
        assert!((d - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_resample_line_has_endpoints() {
        let line = resample_line(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), 20.0);
        assert_eq!(line.len(), 6);
        assert_eq!(line[0], Vec3::ZERO);
        assert_eq!(line[5], Vec3::new(100.0, 0.0, 0.0));

        let short = resample_line(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 20.0);
        assert_eq!(short.len(), 2);
    }
}
