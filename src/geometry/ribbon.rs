use super::mesh::{MeshMaterial, RoadMesh};
use super::polyline::cumulative_distances;
use crate::terrain::TerrainQuery;
use bevy::prelude::*;

/// Direction of travel at vertex `i`.
///
/// End vertices use their only segment. Interior vertices average the normalized
/// incoming and outgoing directions; a full reversal falls back to the incoming one.
pub fn forward_at(points: &[Vec3], i: usize) -> Vec3 {
    let n = points.len();
    if n < 2 || i >= n {
        return Vec3::X;
    }

    let incoming = (i > 0).then(|| (points[i] - points[i - 1]).normalize_or_zero());
    let outgoing = (i + 1 < n).then(|| (points[i + 1] - points[i]).normalize_or_zero());

    let direction = match (incoming, outgoing) {
        (Some(a), Some(b)) => {
            let blended = a + b;
            if blended.length_squared() > 1e-6 { blended } else { a }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => Vec3::X,
    };
    direction.normalize_or(Vec3::X)
}

/// Horizontal unit vector to the right of travel at vertex `i`
pub fn right_at(points: &[Vec3], i: usize) -> Vec3 {
    let forward = forward_at(points, i);
    let right = forward.cross(Vec3::Y);
    let flat = Vec3::new(right.x, 0.0, right.z);
    if flat.length_squared() > 1e-10 {
        flat.normalize()
    } else {
        // Vertical travel
        Vec3::Z
    }
}

/// Build a flat strip of `width` along `points`, two vertices per point.
///
/// Triangles wind counter-clockwise seen from above. With a terrain the vertex normals
/// follow the ground, otherwise they point straight up. V runs along the road in units
/// of its width.
pub fn build_ribbon(
    points: &[Vec3],
    width: f32,
    material: MeshMaterial,
    terrain: Option<&dyn TerrainQuery>,
) -> RoadMesh {
    let mut mesh = RoadMesh::new(material);
    if points.len() < 2 {
        return mesh;
    }

    let half = width * 0.5;
    let along = cumulative_distances(points);
    let v_scale = if width > f32::EPSILON { 1.0 / width } else { 1.0 };

    for (i, point) in points.iter().enumerate() {
        let right = right_at(points, i);
        let normal = terrain
            .map(|terrain| terrain.normal_at(point.x, point.z))
            .unwrap_or(Vec3::Y);
        let v = along[i] * v_scale;
        mesh.push_vertex(*point - right * half, normal, Vec2::new(0.0, v));
        mesh.push_vertex(*point + right * half, normal, Vec2::new(1.0, v));
    }

    for i in 0..points.len() as u32 - 1 {
        let left0 = i * 2;
        let right0 = left0 + 1;
        let left1 = left0 + 2;
        let right1 = left0 + 3;
        mesh.push_triangle(left0, right0, left1);
        mesh.push_triangle(left1, right0, right1);
    }

    mesh
}
