use super::mesh::{MeshMaterial, RoadMesh};
use super::polyline::{cumulative_distances, point_at_distance};
use super::ribbon::{build_ribbon, right_at};
use crate::crossing::{BridgeProfile, BridgeTier, SupportKind, SupportPlacement};
use crate::terrain::TerrainQuery;
use crate::terrain::constants::{PIER_TAPER, PIER_TOP_HALF_WIDTH, TOWER_TOP_HALF_WIDTH};
use bevy::prelude::*;

const CABLE_SAMPLES: usize = 24;
const CABLE_THICKNESS: f32 = 0.4;
const HANGER_EVERY: usize = 3;
const STAYS_PER_SIDE: usize = 4;

/// All meshes making up one bridge
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeMeshes {
    pub deck: RoadMesh,
    pub supports: Vec<RoadMesh>,
    pub cables: Vec<RoadMesh>,
}

impl BridgeMeshes {
    pub fn all(&self) -> impl Iterator<Item = &RoadMesh> {
        std::iter::once(&self.deck)
            .chain(self.supports.iter())
            .chain(self.cables.iter())
    }

    pub fn triangle_count(&self) -> usize {
        self.all().map(RoadMesh::triangle_count).sum()
    }
}

/// Deck slab: top surface, underside, side skirts and end caps
pub fn deck_mesh(deck: &[Vec3], width: f32, thickness: f32) -> RoadMesh {
    let mut mesh = build_ribbon(deck, width, MeshMaterial::BridgeDeck, None);
    if deck.len() < 2 {
        return mesh;
    }

    let half = width * 0.5;
    let down = Vec3::Y * thickness;

    // Underside: same strip lowered, wound the other way
    let lowered: Vec<Vec3> = deck.iter().map(|p| *p - down).collect();
    let mut underside = build_ribbon(&lowered, width, MeshMaterial::BridgeDeck, None);
    for normal in &mut underside.normals {
        *normal = [0.0, -1.0, 0.0];
    }
    for tri in underside.indices.chunks_mut(3) {
        tri.swap(1, 2);
    }
    mesh.append(&underside);

    let edges: Vec<(Vec3, Vec3)> = deck
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let right = right_at(deck, i) * half;
            (*p - right, *p + right)
        })
        .collect();

    for pair in edges.windows(2) {
        let ((left0, right0), (left1, right1)) = (pair[0], pair[1]);
        mesh.push_quad([left0, left1, left1 - down, left0 - down]);
        mesh.push_quad([right1, right0, right0 - down, right1 - down]);
    }

    if let (Some(&(left, right)), Some(&(end_left, end_right))) = (edges.first(), edges.last()) {
        mesh.push_quad([left, left - down, right - down, right]);
        mesh.push_quad([end_right, end_right - down, end_left - down, end_left]);
    }

    mesh
}

/// Four tapered sides and a cap, axis-aligned in XZ
fn push_column(mesh: &mut RoadMesh, centre: Vec2, base: f32, top: f32, top_half_width: f32) {
    let bottom_half_width = top_half_width * PIER_TAPER;
    let bottom = Vec3::new(centre.x, base, centre.y);
    let upper = Vec3::new(centre.x, top, centre.y);

    for outward in [Vec3::X, Vec3::NEG_X, Vec3::Z, Vec3::NEG_Z] {
        let across = Vec3::Y.cross(outward);
        mesh.push_quad([
            bottom + (outward - across) * bottom_half_width,
            bottom + (outward + across) * bottom_half_width,
            upper + (outward + across) * top_half_width,
            upper + (outward - across) * top_half_width,
        ]);
    }

    let h = top_half_width;
    mesh.push_quad([
        upper + Vec3::new(-h, 0.0, -h),
        upper + Vec3::new(-h, 0.0, h),
        upper + Vec3::new(h, 0.0, h),
        upper + Vec3::new(h, 0.0, -h),
    ]);
}

/// Pier under the deck, or a pair of tower legs either side of it with a crossbeam
pub fn support_mesh(
    placement: &SupportPlacement,
    right: Vec3,
    deck_half_width: f32,
    thickness: f32,
) -> RoadMesh {
    match placement.kind {
        SupportKind::Pillar => {
            let mut mesh = RoadMesh::new(MeshMaterial::Pier);
            let centre = Vec2::new(placement.position.x, placement.position.z);
            let top = (placement.top - thickness).max(placement.base);
            push_column(&mut mesh, centre, placement.base, top, PIER_TOP_HALF_WIDTH);
            mesh
        }
        SupportKind::Tower => {
            let mut mesh = RoadMesh::new(MeshMaterial::Tower);
            let offset = right * (deck_half_width + TOWER_TOP_HALF_WIDTH * PIER_TAPER);
            for side in [-1.0_f32, 1.0] {
                let leg = placement.position + offset * side;
                push_column(
                    &mut mesh,
                    Vec2::new(leg.x, leg.z),
                    placement.base,
                    placement.top,
                    TOWER_TOP_HALF_WIDTH,
                );
            }

            // Crossbeam just under the tower tops
            let beam_top = placement.top - TOWER_TOP_HALF_WIDTH;
            let beam_bottom = beam_top - TOWER_TOP_HALF_WIDTH * 2.0;
            let (a, b) = (placement.position - offset, placement.position + offset);
            let [a_top, b_top] = [a, b].map(|p| Vec3::new(p.x, beam_top, p.z));
            let [a_bottom, b_bottom] = [a, b].map(|p| Vec3::new(p.x, beam_bottom, p.z));
            mesh.push_quad([a_bottom, b_bottom, b_top, a_top]);
            mesh.push_quad([b_bottom, a_bottom, a_top, b_top]);
            mesh
        }
    }
}

/// Thin strip following `points`, `across` wide, visible from both sides
fn strip_mesh(points: &[Vec3], across: Vec3) -> RoadMesh {
    let mut mesh = RoadMesh::new(MeshMaterial::Cable);
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        mesh.push_quad([a - across, b - across, b, a]);
        mesh.push_quad([b - across, a - across, a, b]);
    }
    mesh
}

/// Main cables and hangers of a suspension bridge, or the stays of a cable-stayed one
pub fn cable_meshes(profile: &BridgeProfile, deck: &[Vec3], deck_half_width: f32) -> Vec<RoadMesh> {
    let along = cumulative_distances(deck);
    let total = along.last().copied().unwrap_or(0.0);
    if deck.len() < 2 || total <= f32::EPSILON {
        return Vec::new();
    }
    let right = overall_right(deck);

    match profile.tier {
        BridgeTier::Long => {
            let mut meshes = Vec::new();
            for side in [-1.0_f32, 1.0] {
                let offset = right * deck_half_width * side;
                let mut cable = Vec::with_capacity(CABLE_SAMPLES + 1);
                let mut hangers = Vec::new();
                for k in 0..=CABLE_SAMPLES {
                    let t = k as f32 / CABLE_SAMPLES as f32;
                    let (Some(on_deck), Some(height)) =
                        (point_at_distance(deck, total * t), profile.cable_height_at(t))
                    else {
                        continue;
                    };
                    let anchor = on_deck + offset;
                    let top = Vec3::new(anchor.x, height, anchor.z);
                    cable.push(top);
                    if k % HANGER_EVERY == 0 && k != 0 && k != CABLE_SAMPLES {
                        let deck_point = Vec3::new(anchor.x, profile.deck_height_at(t), anchor.z);
                        hangers.push([deck_point, top]);
                    }
                }
                let mut mesh = strip_mesh(&cable, Vec3::Y * CABLE_THICKNESS);
                let along_deck = Vec3::Y.cross(right) * CABLE_THICKNESS * 0.5;
                for hanger in hangers {
                    mesh.append(&strip_mesh(&hanger, along_deck));
                }
                meshes.push(mesh);
            }
            meshes
        }
        BridgeTier::Spanning => {
            let layout = profile.tier.support_layout(profile.span);
            let spacing = if layout.len() > 1 { 1.0 / (layout.len() - 1) as f32 } else { 1.0 };
            let mut meshes = Vec::new();
            for (t_tower, _) in layout {
                let Some(base) = point_at_distance(deck, total * t_tower) else {
                    continue;
                };
                let mut mesh = RoadMesh::new(MeshMaterial::Cable);
                for side in [-1.0_f32, 1.0] {
                    let offset = right * deck_half_width * side;
                    let top = Vec3::new(
                        base.x,
                        profile.deck_height_at(t_tower) + profile.tower_height(),
                        base.z,
                    ) + offset;
                    for s in 1..=STAYS_PER_SIDE {
                        let reach = spacing * 0.5 * s as f32 / STAYS_PER_SIDE as f32;
                        for t in [t_tower - reach, t_tower + reach] {
                            if !(0.0..=1.0).contains(&t) {
                                continue;
                            }
                            if let Some(on_deck) = point_at_distance(deck, total * t) {
                                let height = profile.deck_height_at(t);
                                let anchor = Vec3::new(on_deck.x, height, on_deck.z) + offset;
                                let stay = strip_mesh(&[top, anchor], Vec3::Y * CABLE_THICKNESS);
                                mesh.append(&stay);
                            }
                        }
                    }
                }
                meshes.push(mesh);
            }
            meshes
        }
        BridgeTier::Short | BridgeTier::Medium => Vec::new(),
    }
}

/// Right vector of the straight line from the first to the last deck point
fn overall_right(deck: &[Vec3]) -> Vec3 {
    match (deck.first(), deck.last()) {
        (Some(first), Some(last)) => right_at(&[*first, *last], 0),
        _ => Vec3::Z,
    }
}

/// Deck, supports and cables for one bridge
pub fn build_bridge(
    profile: &BridgeProfile,
    deck: &[Vec3],
    width: f32,
    thickness: f32,
    terrain: Option<&dyn TerrainQuery>,
) -> BridgeMeshes {
    let half = width * 0.5;
    let right = overall_right(deck);
    let supports = profile
        .supports(deck, terrain)
        .iter()
        .map(|placement| support_mesh(placement, right, half, thickness))
        .collect();

    BridgeMeshes {
        deck: deck_mesh(deck, width, thickness),
        supports,
        cables: cable_meshes(profile, deck, half),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossing::WaterCrossing;
    use crate::terrain::FnTerrain;

    fn profile(span: f32) -> (BridgeProfile, Vec<Vec3>) {
        let crossing = WaterCrossing {
            start_index: 0,
            end_index: 2,
            start_pos: Vec3::ZERO,
            end_pos: Vec3::new(span, 0.0, 0.0),
            length: span,
            start_distance: 0.0,
            end_distance: span,
        };
        let tier = BridgeTier::from_span(span);
        let profile = BridgeProfile::new(tier, &crossing, (2.0, 2.0), 0.0);
        let mut deck: Vec<Vec3> =
            (0..=10).map(|i| Vec3::new(span * i as f32 / 10.0, 0.0, 0.0)).collect();
        profile.apply_to_deck(&mut deck);
        (profile, deck)
    }

    #[test]
    fn test_deck_is_closed_box() {
        let (_, deck) = profile(60.0);
        let mesh = deck_mesh(&deck, 8.0, 1.2);
        // Top and bottom strips, two skirts per segment, two end caps
        let segments = deck.len() - 1;
        assert_eq!(mesh.triangle_count(), segments * 2 * 2 + segments * 2 * 2 + 4);

        let (lo, hi) = mesh.bounds().unwrap();
        assert!((hi.y - lo.y - 1.2).abs() < 1e-3);
        assert!((hi.z - lo.z - 8.0).abs() < 1e-3);
    }

    #[test]
    fn test_skirts_face_outward() {
        let deck = vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)];
        let mesh = deck_mesh(&deck, 4.0, 1.0);
        let normals: Vec<Vec3> =
            (0..mesh.triangle_count()).filter_map(|i| mesh.face_normal(i)).collect();
        assert!(normals.iter().any(|n| n.z > 0.99));
        assert!(normals.iter().any(|n| n.z < -0.99));
        assert!(normals.iter().any(|n| n.x > 0.99));
        assert!(normals.iter().any(|n| n.x < -0.99));
        assert!(normals.iter().any(|n| n.y < -0.99));
    }

    #[test]
    fn test_pier_reaches_foundation() {
        let placement = SupportPlacement {
            kind: SupportKind::Pillar,
            position: Vec3::new(5.0, 10.0, 0.0),
            top: 10.0,
            base: -8.0,
        };
        let mesh = support_mesh(&placement, Vec3::Z, 4.0, 1.2);
        let (lo, hi) = mesh.bounds().unwrap();
        assert_eq!(lo.y, -8.0);
        assert!((hi.y - 8.8).abs() < 1e-4);
        // Wider at the base
        assert!((hi.x - lo.x - 2.0 * PIER_TOP_HALF_WIDTH * PIER_TAPER).abs() < 1e-4);
        assert_eq!(mesh.material, MeshMaterial::Pier);
    }

    #[test]
    fn test_suspension_bridge_parts() {
        let (profile, deck) = profile(500.0);
        let terrain = FnTerrain::new(10.0, |_, _| -10.0);
        let bridge = build_bridge(&profile, &deck, 12.0, 1.2, Some(&terrain));

        assert_eq!(bridge.supports.len(), 2);
        assert!(bridge.supports.iter().all(|m| m.material == MeshMaterial::Tower));
        assert_eq!(bridge.cables.len(), 2);

        // Tower tops are above the cable anchor at the deck ends
        let tower_top = bridge.supports[0].bounds().unwrap().1.y;
        assert!(tower_top >= profile.deck_height_at(0.0) + profile.tower_height() - 1e-3);
        assert!(bridge.triangle_count() > bridge.deck.triangle_count());
    }

    #[test]
    fn test_short_bridge_has_no_cables() {
        let (profile, deck) = profile(60.0);
        let bridge = build_bridge(&profile, &deck, 8.0, 1.2, None);
        assert!(bridge.cables.is_empty());
        assert_eq!(bridge.supports.len(), 2);
    }

    #[test]
    fn test_cable_stayed_has_stays_per_tower() {
        let (profile, deck) = profile(900.0);
        let cables = cable_meshes(&profile, &deck, 6.0);
        assert_eq!(cables.len(), profile.tier.support_layout(900.0).len());
        assert!(cables.iter().all(|m| !m.is_empty()));
    }
}
