use crate::generation::errors::RoadError;
use crate::geometry::polyline::{Polyline, horizontal_distance, resample_line};
use crate::resources::{RoutingMode, RoutingSettings, WorldParams};
use crate::terrain::TerrainQuery;
use crate::terrain::constants::MIN_DIRECT_STEP;
use bevy::prelude::*;
use derive_more::Display;
use pathfinding::prelude::astar;
use serde::{Deserialize, Serialize};

/// How a route polyline was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum RouteKind {
    #[display("direct")]
    Direct,
    #[display("grid")]
    GridSearch,
    /// Grid search gave up and a straight two-point line was used instead
    #[display("fallback")]
    StraightFallback,
    /// No terrain was available, heights are interpolated between the endpoints
    #[display("unsampled")]
    Unsampled,
}

#[derive(Debug)]
pub struct RouteOutcome {
    pub polyline: Polyline,
    pub kind: RouteKind,
    /// Grid cells expanded by the search, 0 for direct routes
    pub expansions: usize,
    pub warning: Option<RoadError>,
}

/// A cell of the routing grid, relative to the search window origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteCell {
    pub x: i32,
    pub z: i32,
}

impl RouteCell {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Rectangular window of the XZ plane searched by the grid router
#[derive(Debug, Clone, Copy)]
struct SearchWindow {
    origin: Vec2,
    cell: f32,
    cells_x: i32,
    cells_z: i32,
}

impl SearchWindow {
    fn cell_of(&self, p: Vec3) -> RouteCell {
        let x = ((p.x - self.origin.x) / self.cell).floor() as i32;
        let z = ((p.z - self.origin.y) / self.cell).floor() as i32;
        RouteCell::new(x.clamp(0, self.cells_x - 1), z.clamp(0, self.cells_z - 1))
    }

    fn centre(&self, cell: RouteCell) -> Vec2 {
        self.origin + Vec2::new(cell.x as f32 + 0.5, cell.z as f32 + 0.5) * self.cell
    }

    fn contains(&self, cell: RouteCell) -> bool {
        cell.x >= 0 && cell.z >= 0 && cell.x < self.cells_x && cell.z < self.cells_z
    }
}

const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Finds terrain-aware polylines between two world points
pub struct TerrainRouter {
    params: WorldParams,
    settings: RoutingSettings,
}

impl TerrainRouter {
    pub fn new(params: &WorldParams, settings: &RoutingSettings) -> Self {
        Self {
            params: *params,
            settings: settings.clone(),
        }
    }

    pub fn settings(&self) -> &RoutingSettings {
        &self.settings
    }

    /// Route between two points using the configured mode
    pub fn route(
        &self,
        start: Vec3,
        end: Vec3,
        allow_bridges: bool,
        terrain: Option<&dyn TerrainQuery>,
    ) -> RouteOutcome {
        let Some(terrain) = terrain else {
            return RouteOutcome {
                polyline: resample_line(start, end, self.direct_step()),
                kind: RouteKind::Unsampled,
                expansions: 0,
                warning: None,
            };
        };

        let use_grid = match self.settings.mode {
            RoutingMode::Direct => false,
            RoutingMode::GridSearch => true,
            RoutingMode::Auto => self.needs_grid_search(start, end, terrain),
        };

        if use_grid {
            self.route_grid(start, end, allow_bridges, terrain)
        } else {
            RouteOutcome {
                polyline: self.route_direct(start, end, terrain),
                kind: RouteKind::Direct,
                expansions: 0,
                warning: None,
            }
        }
    }

    fn direct_step(&self) -> f32 {
        self.settings.direct_step.max(MIN_DIRECT_STEP)
    }

    fn surface_height(&self, terrain: &dyn TerrainQuery, x: f32, z: f32) -> f32 {
        terrain.height_at(x, z) + self.settings.clearance
    }

    /// Whether the straight line touches water or steep ground
    pub fn needs_grid_search(&self, start: Vec3, end: Vec3, terrain: &dyn TerrainQuery) -> bool {
        resample_line(start, end, self.direct_step()).iter().any(|p| {
            terrain.height_at(p.x, p.z) < self.params.sea_level
                || terrain.slope_at(p.x, p.z) > self.settings.steep_slope_degrees
        })
    }

    /// Uniformly resampled straight line following the terrain surface
    pub fn route_direct(&self, start: Vec3, end: Vec3, terrain: &dyn TerrainQuery) -> Polyline {
        let mut points = resample_line(start, end, self.direct_step());
        for p in points.iter_mut() {
            p.y = self.surface_height(terrain, p.x, p.z);
        }

        if self.settings.smooth_direct && points.len() > 2 {
            let heights: Vec<f32> = points.iter().map(|p| p.y).collect();
            for i in 1..points.len() - 1 {
                let averaged = (heights[i - 1] + heights[i] + heights[i + 1]) / 3.0;
                let floor = self.surface_height(terrain, points[i].x, points[i].z);
                points[i].y = averaged.max(floor);
            }
        }

        points
    }

    fn search_window(&self, start: Vec3, end: Vec3) -> SearchWindow {
        let cell = self.settings.cell_resolution.get();
        let margin = self.settings.search_margin_cells as f32 * cell;
        let half = self.params.half_extent();

        let min_x = (start.x.min(end.x) - margin).max(-half).min(start.x.min(end.x));
        let min_z = (start.z.min(end.z) - margin).max(-half).min(start.z.min(end.z));
        let max_x = (start.x.max(end.x) + margin).min(half).max(start.x.max(end.x));
        let max_z = (start.z.max(end.z) + margin).min(half).max(start.z.max(end.z));

        SearchWindow {
            origin: Vec2::new(min_x, min_z),
            cell,
            cells_x: (((max_x - min_x) / cell).ceil() as i32).max(1),
            cells_z: (((max_z - min_z) / cell).ceil() as i32).max(1),
        }
    }

    /// Cost of stepping onto `to_centre`, excluding the distance term
    fn terrain_cost(
        &self,
        terrain: &dyn TerrainQuery,
        to_centre: Vec2,
        allow_bridges: bool,
    ) -> f32 {
        let mut cost = 0.0;
        if terrain.height_at(to_centre.x, to_centre.y) < self.params.sea_level {
            cost += if allow_bridges {
                self.settings.bridge_cost
            } else {
                self.settings.water_cost
            };
        }
        let slope = terrain.slope_at(to_centre.x, to_centre.y);
        if slope > self.settings.steep_slope_degrees {
            cost += self.settings.steep_cost * slope / 45.0;
        }
        cost
    }

    /// Eight-connected A* over a grid window around both endpoints
    pub fn route_grid(
        &self,
        start: Vec3,
        end: Vec3,
        allow_bridges: bool,
        terrain: &dyn TerrainQuery,
    ) -> RouteOutcome {
        let window = self.search_window(start, end);
        let start_cell = window.cell_of(start);
        let goal_cell = window.cell_of(end);
        let cap = self.settings.max_iterations.get();

        if start_cell == goal_cell {
            return RouteOutcome {
                polyline: self.endpoints_only(start, end, terrain),
                kind: RouteKind::GridSearch,
                expansions: 0,
                warning: None,
            };
        }

        let goal_centre = window.centre(goal_cell);
        let mut expansions = 0usize;
        let mut exhausted = false;

        let result = astar(
            &start_cell,
            |cell| {
                if expansions >= cap {
                    exhausted = true;
                    return Vec::new();
                }
                expansions += 1;

                let from_centre = window.centre(*cell);
                NEIGHBOUR_OFFSETS
                    .iter()
                    .map(|(dx, dz)| RouteCell::new(cell.x + dx, cell.z + dz))
                    .filter(|next| window.contains(*next))
                    .map(|next| {
                        let to_centre = window.centre(next);
                        let cost = from_centre.distance(to_centre)
                            + self.terrain_cost(terrain, to_centre, allow_bridges);
                        (next, to_centimetres_ceil(cost))
                    })
                    .collect::<Vec<_>>()
            },
            |cell| (window.centre(*cell).distance(goal_centre) * 100.0).floor() as u64,
            |cell| *cell == goal_cell,
        );

        match result {
            Some((cells, cost)) => {
                let last = cells.len() - 1;
                let polyline = cells
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        let xz = match i {
                            0 => Vec2::new(start.x, start.z),
                            i if i == last => Vec2::new(end.x, end.z),
                            _ => window.centre(*cell),
                        };
                        Vec3::new(xz.x, self.surface_height(terrain, xz.x, xz.y), xz.y)
                    })
                    .collect();

                debug!(
                    "Grid route found: {} cells, cost {:.1}, {} expansions",
                    cells.len(),
                    cost as f32 / 100.0,
                    expansions
                );

                RouteOutcome {
                    polyline,
                    kind: RouteKind::GridSearch,
                    expansions,
                    warning: None,
                }
            }
            None => {
                warn!(
                    "Grid search from {:?} to {:?} stopped after {} expansions (cap hit: {}), \
                     using straight line",
                    start,
                    end,
                    expansions,
                    exhausted
                );
                RouteOutcome {
                    polyline: self.endpoints_only(start, end, terrain),
                    kind: RouteKind::StraightFallback,
                    expansions,
                    warning: Some(RoadError::NoPathFound {
                        from: start,
                        to: end,
                        iterations: expansions,
                    }),
                }
            }
        }
    }

    fn endpoints_only(&self, start: Vec3, end: Vec3, terrain: &dyn TerrainQuery) -> Polyline {
        [start, end]
            .iter()
            .map(|p| Vec3::new(p.x, self.surface_height(terrain, p.x, p.z), p.z))
            .collect()
    }
}

fn to_centimetres_ceil(cost: f32) -> u64 {
    (cost.max(0.0) * 100.0).ceil() as u64
}

/// Length of a route relative to the straight-line distance between its ends
pub fn detour_ratio(polyline: &[Vec3]) -> Option<f32> {
    let (first, last) = (polyline.first()?, polyline.last()?);
    let straight = horizontal_distance(*first, *last);
    (straight > f32::EPSILON)
        .then(|| crate::geometry::polyline::horizontal_length(polyline) / straight)
}
