use crate::map::TerrainData;
use bevy::prelude::*;

pub mod constants;
pub mod coordinates;

use constants::NORMAL_SAMPLE_STEP;
use coordinates::{GridCoord, get_height_at_world_clamped, grid_to_world, world_to_grid};

/// Read-only terrain oracle consumed by every generation stage.
///
/// Only `height_at` and `cell_size` are required. Slopes and normals fall back to
/// central finite differences of `height_at`.
pub trait TerrainQuery {
    fn height_at(&self, x: f32, z: f32) -> f32;

    fn cell_size(&self) -> f32;

    /// Slope angle in degrees at a world position
    fn slope_at(&self, x: f32, z: f32) -> f32 {
        let step = self.cell_size().max(NORMAL_SAMPLE_STEP);
        let dx = (self.height_at(x + step, z) - self.height_at(x - step, z)) / (2.0 * step);
        let dz = (self.height_at(x, z + step) - self.height_at(x, z - step)) / (2.0 * step);
        (dx * dx + dz * dz).sqrt().atan().to_degrees()
    }

    /// Upward unit surface normal at a world position
    fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        let step = self.cell_size().max(NORMAL_SAMPLE_STEP);
        let dx = (self.height_at(x + step, z) - self.height_at(x - step, z)) / (2.0 * step);
        let dz = (self.height_at(x, z + step) - self.height_at(x, z - step)) / (2.0 * step);
        Vec3::new(-dx, 1.0, -dz).normalize_or(Vec3::Y)
    }
}

/// Write access to a terrain height grid. Only terrain carving holds this.
pub trait TerrainCarve: TerrainQuery {
    /// Grid dimensions in cells (x, z)
    fn grid_size(&self) -> (u32, u32);

    fn cell_center(&self, cell: GridCoord) -> Vec2;

    fn world_to_cell(&self, x: f32, z: f32) -> Option<GridCoord>;

    fn height_at_cell(&self, cell: GridCoord) -> Option<f32>;

    fn set_height_at(&mut self, cell_x: u32, cell_z: u32, height: f32) -> bool;
}

impl TerrainQuery for TerrainData {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        get_height_at_world_clamped(self, x, z)
    }

    fn cell_size(&self) -> f32 {
        self.scale
    }
}

impl TerrainCarve for TerrainData {
    fn grid_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn cell_center(&self, cell: GridCoord) -> Vec2 {
        let (x, z) = grid_to_world(self, cell.x as f32, cell.z as f32);
        Vec2::new(x, z)
    }

    fn world_to_cell(&self, x: f32, z: f32) -> Option<GridCoord> {
        let (grid_x, grid_z) = world_to_grid(self, x, z);
        let cell = GridCoord::new(grid_x.round().max(0.0) as u32, grid_z.round().max(0.0) as u32);
        (grid_x >= -0.5 && grid_z >= -0.5 && cell.is_valid_for(self)).then_some(cell)
    }

    fn height_at_cell(&self, cell: GridCoord) -> Option<f32> {
        coordinates::get_height_at_grid(self, cell.x, cell.z)
    }

    fn set_height_at(&mut self, cell_x: u32, cell_z: u32, height: f32) -> bool {
        if cell_x >= self.width || cell_z >= self.height {
            return false;
        }
        let index = (cell_z * self.width + cell_x) as usize;
        match self.heights.get_mut(index) {
            Some(cell) => {
                *cell = height;
                true
            }
            None => false,
        }
    }
}

/// Procedural terrain backed by a height closure.
pub struct FnTerrain<F> {
    height_fn: F,
    cell_size: f32,
}

impl<F: Fn(f32, f32) -> f32> FnTerrain<F> {
    pub fn new(cell_size: f32, height_fn: F) -> Self {
        Self {
            height_fn,
            cell_size,
        }
    }
}

impl<F: Fn(f32, f32) -> f32> TerrainQuery for FnTerrain<F> {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        (self.height_fn)(x, z)
    }

    fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

/// Flat terrain at a fixed height
pub fn flat_terrain(height: f32) -> FnTerrain<impl Fn(f32, f32) -> f32> {
    FnTerrain::new(10.0, move |_, _| height)
}
