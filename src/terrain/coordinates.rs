use super::constants::FALLBACK_TERRAIN_HEIGHT;
use crate::map::TerrainData;

/// Grid coordinates (unsigned integers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub x: u32,
    pub z: u32,
}

impl GridCoord {
    pub fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }

    /// Check if these coordinates are valid for the given terrain
    pub fn is_valid_for(&self, terrain: &TerrainData) -> bool {
        self.x < terrain.width && self.z < terrain.height
    }
}

/// Convert world coordinates to grid coordinates, accounting for terrain centering
pub fn world_to_grid(terrain: &TerrainData, world_x: f32, world_z: f32) -> (f32, f32) {
    let center_x_offset = terrain.world_width() / 2.0;
    let center_z_offset = terrain.world_depth() / 2.0;

    let grid_x = (world_x + center_x_offset) / terrain.scale;
    let grid_z = (world_z + center_z_offset) / terrain.scale;
    (grid_x, grid_z)
}

/// Convert grid coordinates to world coordinates, accounting for terrain centering
pub fn grid_to_world(terrain: &TerrainData, grid_x: f32, grid_z: f32) -> (f32, f32) {
    let center_x_offset = terrain.world_width() / 2.0;
    let center_z_offset = terrain.world_depth() / 2.0;

    let world_x = grid_x * terrain.scale - center_x_offset;
    let world_z = grid_z * terrain.scale - center_z_offset;
    (world_x, world_z)
}

/// Get height at exact grid position (no interpolation)
pub fn get_height_at_grid(terrain: &TerrainData, x: u32, z: u32) -> Option<f32> {
    if x >= terrain.width || z >= terrain.height {
        return None;
    }
    let index = (z * terrain.width + x) as usize;
    terrain.heights.get(index).copied()
}

/// Bilinear height lookup that clamps to the terrain edge instead of failing.
pub fn get_height_at_world_clamped(terrain: &TerrainData, world_x: f32, world_z: f32) -> f32 {
    let (grid_x, grid_z) = world_to_grid(terrain, world_x, world_z);
    let max_x = terrain.width.saturating_sub(1) as f32;
    let max_z = terrain.height.saturating_sub(1) as f32;
    bilinear(terrain, grid_x.clamp(0.0, max_x), grid_z.clamp(0.0, max_z))
}

fn bilinear(terrain: &TerrainData, grid_x: f32, grid_z: f32) -> f32 {
    let x0 = grid_x.floor() as u32;
    let z0 = grid_z.floor() as u32;
    let x1 = (x0 + 1).min(terrain.width - 1);
    let z1 = (z0 + 1).min(terrain.height - 1);

    let fx = grid_x - x0 as f32;
    let fz = grid_z - z0 as f32;

    let sample = |x, z| get_height_at_grid(terrain, x, z).unwrap_or(FALLBACK_TERRAIN_HEIGHT);
    let h00 = sample(x0, z0);
    let h10 = sample(x1, z0);
    let h01 = sample(x0, z1);
    let h11 = sample(x1, z1);

    let h0 = h00 * (1.0 - fx) + h10 * fx;
    let h1 = h01 * (1.0 - fx) + h11 * fx;

    h0 * (1.0 - fz) + h1 * fz
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_transformations() {
        // 3x3 terrain with scale 1.0 spans (-1.5, -1.5) to (1.5, 1.5)
        let terrain = TerrainData::create_flat(3, 3, 1.0, 0.0).unwrap();

        let (grid_x, grid_z) = world_to_grid(&terrain, 0.0, 0.0);
        assert_eq!(grid_x, 1.5);
        assert_eq!(grid_z, 1.5);

        let (world_x, world_z) = grid_to_world(&terrain, 1.5, 1.5);
        assert_eq!(world_x, 0.0);
        assert_eq!(world_z, 0.0);

        assert!(GridCoord::new(2, 2).is_valid_for(&terrain));
        assert!(!GridCoord::new(3, 1).is_valid_for(&terrain));
    }

    #[test]
    fn test_height_lookups() {
        let heights = vec![
            0.0, 1.0, 2.0, // z=0 row
            3.0, 4.0, 5.0, // z=1 row
            6.0, 7.0, 8.0, // z=2 row
        ];
        let terrain = TerrainData::new(3, 3, heights, 1.0).unwrap();

        assert_eq!(get_height_at_grid(&terrain, 0, 0), Some(0.0));
        assert_eq!(get_height_at_grid(&terrain, 1, 1), Some(4.0));
        assert_eq!(get_height_at_grid(&terrain, 3, 0), None);

        assert_eq!(get_height_at_world_clamped(&terrain, -1.5, -1.5), 0.0);
        // World (0,0) is grid (1.5,1.5): average of 4, 5, 7, 8
        assert_eq!(get_height_at_world_clamped(&terrain, 0.0, 0.0), 6.0);
    }

    #[test]
    fn test_clamped_lookup_outside_bounds() {
        let heights = vec![0.0, 1.0, 2.0, 3.0];
        let terrain = TerrainData::new(2, 2, heights, 10.0).unwrap();

        // Far outside the (-10,-10)..(10,10) footprint clamps to the nearest corner
        assert_eq!(get_height_at_world_clamped(&terrain, -500.0, -500.0), 0.0);
        assert_eq!(get_height_at_world_clamped(&terrain, 500.0, 500.0), 3.0);
    }
}
