use crate::geometry::polyline::{
    Polyline, closest_point_on_segment_xz, distance_to_polyline_xz, horizontal_distance,
};
use crate::resources::CarvingSettings;
use crate::terrain::{TerrainCarve, TerrainQuery};
use crate::terrain::coordinates::GridCoord;
use bevy::prelude::*;

/// Horizontal footprint of a bridge deck. Terrain under it is never carved.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckFootprint {
    pub points: Polyline,
    pub half_width: f32,
}

impl DeckFootprint {
    fn covers(&self, p: Vec3) -> bool {
        distance_to_polyline_xz(p, &self.points).is_some_and(|d| d <= self.half_width)
    }
}

/// Closest centreline point in XZ, returning the distance and the road height there
fn closest_on_centreline(p: Vec3, centreline: &[Vec3]) -> Option<(f32, f32)> {
    if let [only] = centreline {
        return Some((horizontal_distance(p, *only), only.y));
    }
    centreline
        .windows(2)
        .map(|pair| {
            let (closest, _) = closest_point_on_segment_xz(p, pair[0], pair[1]);
            (horizontal_distance(p, closest), closest.y)
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

/// Lower terrain along a road so its bed sits under the surface.
///
/// Cells within `width / 2` of the centreline get the full change, cells out to the
/// shoulder fade off quadratically. Terrain is only ever lowered. Returns the number of
/// cells changed.
pub fn carve_polyline(
    terrain: &mut dyn TerrainCarve,
    centreline: &[Vec3],
    width: f32,
    road_offset: f32,
    settings: &CarvingSettings,
    exclusions: &[DeckFootprint],
) -> usize {
    if centreline.is_empty() {
        return 0;
    }

    let half_width = width * 0.5;
    let shoulder = settings.shoulder_width.max(f32::EPSILON);
    let reach = half_width + shoulder;
    let smoothing = settings.smoothing.clamp(0.0, 1.0);

    let (grid_w, grid_h) = terrain.grid_size();
    let cell = terrain.cell_size();
    let origin = terrain.cell_center(GridCoord::new(0, 0));

    let (min, max) = centreline.iter().fold(
        (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
        |(lo, hi), p| (lo.min(Vec2::new(p.x, p.z)), hi.max(Vec2::new(p.x, p.z))),
    );
    let to_index = |value: f32, origin: f32, count: u32| -> u32 {
        (((value - origin) / cell).max(0.0) as u32).min(count.saturating_sub(1))
    };
    let (lo, hi) = (min - Vec2::splat(reach), max + Vec2::splat(reach + cell));
    let x_range = to_index(lo.x, origin.x, grid_w)..=to_index(hi.x, origin.x, grid_w);
    let z_range = to_index(lo.y, origin.y, grid_h)..=to_index(hi.y, origin.y, grid_h);

    let mut changed = 0;
    for cz in z_range {
        for cx in x_range.clone() {
            let coord = GridCoord::new(cx, cz);
            let centre = terrain.cell_center(coord);
            let p = Vec3::new(centre.x, 0.0, centre.y);

            let Some((distance, road_height)) = closest_on_centreline(p, centreline) else {
                continue;
            };
            if distance > reach || exclusions.iter().any(|deck| deck.covers(p)) {
                continue;
            }

            let weight = if distance <= half_width {
                1.0
            } else {
                let t = (distance - half_width) / shoulder;
                (1.0 - t) * (1.0 - t)
            };

            let Some(current) = terrain.height_at_cell(coord) else {
                continue;
            };
            let bed = road_height - road_offset;
            if current <= bed {
                continue;
            }

            let lowered = current + (bed - current) * weight * smoothing;
            if current - lowered > 1e-4 && terrain.set_height_at(cx, cz, lowered) {
                changed += 1;
            }
        }
    }

    debug!("Carved {} terrain cells along a {:.1}m wide road", changed, width);
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TerrainData;

    fn settings() -> CarvingSettings {
        CarvingSettings {
            enabled: true,
            shoulder_width: 6.0,
            smoothing: 1.0,
        }
    }

    #[test]
    fn test_carving_lowers_ground_under_road() {
        // 64 x 64 cells of 2m, ground at 5m
        let mut terrain = TerrainData::create_flat(64, 64, 2.0, 5.0).unwrap();
        let road = vec![Vec3::new(-40.0, 4.0, 0.0), Vec3::new(40.0, 4.0, 0.0)];

        let changed = carve_polyline(&mut terrain, &road, 8.0, 0.5, &settings(), &[]);
        assert!(changed > 0);

        // Under the road the bed sits at surface minus offset
        assert!((terrain.height_at(0.0, 0.0) - 3.5).abs() < 1e-3);
        // Beyond the shoulder nothing changes
        assert_eq!(terrain.height_at(0.0, 20.0), 5.0);
        // Inside the shoulder the change fades
        let shoulder = terrain.height_at(0.0, 8.0);
        assert!(shoulder > 3.5 && shoulder < 5.0);
    }

    #[test]
    fn test_carving_never_raises_terrain() {
        let mut terrain = TerrainData::create_flat(32, 32, 2.0, 0.0).unwrap();
        let road = vec![Vec3::new(-20.0, 5.0, 0.0), Vec3::new(20.0, 5.0, 0.0)];
        let changed = carve_polyline(&mut terrain, &road, 8.0, 0.5, &settings(), &[]);
        assert_eq!(changed, 0);
        assert!(terrain.heights.iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_carving_skips_bridge_footprint() {
        let mut terrain = TerrainData::create_flat(64, 64, 2.0, 5.0).unwrap();
        let road = vec![Vec3::new(-40.0, 4.0, 0.0), Vec3::new(40.0, 4.0, 0.0)];
        let deck = DeckFootprint {
            points: vec![Vec3::new(-10.0, 12.0, 0.0), Vec3::new(10.0, 12.0, 0.0)],
            half_width: 6.0,
        };

        carve_polyline(&mut terrain, &road, 8.0, 0.5, &settings(), &[deck]);
        assert_eq!(terrain.height_at(0.0, 0.0), 5.0);
        assert!((terrain.height_at(-30.0, 0.0) - 3.5).abs() < 1e-3);
    }
}
