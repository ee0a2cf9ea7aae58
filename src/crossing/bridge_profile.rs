use super::{BridgeTier, WaterCrossing};
use crate::geometry::polyline::{cumulative_distances, point_at_distance};
use crate::terrain::TerrainQuery;
use crate::terrain::constants::*;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportKind {
    Pillar,
    Tower,
}

/// A pier or tower standing under (or above) the deck
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportPlacement {
    pub kind: SupportKind,
    /// Deck point the support attaches to
    pub position: Vec3,
    pub top: f32,
    pub base: f32,
}

/// Vertical profile of one bridge: deck heights, supports and cables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeProfile {
    pub tier: BridgeTier,
    pub span: f32,
    pub sea_level: f32,
    pub start_deck: f32,
    pub end_deck: f32,
}

impl BridgeProfile {
    /// Deck ends sit at the bank road height, never below the tier's water clearance
    pub fn new(
        tier: BridgeTier,
        crossing: &WaterCrossing,
        bank_heights: (f32, f32),
        sea_level: f32,
    ) -> Self {
        let minimum = sea_level + tier.clearance();
        Self {
            tier,
            span: crossing.length,
            sea_level,
            start_deck: bank_heights.0.max(minimum),
            end_deck: bank_heights.1.max(minimum),
        }
    }

    pub fn clearance(&self) -> f32 {
        self.tier.clearance()
    }

    pub fn arch_rise(&self) -> f32 {
        match self.tier {
            BridgeTier::Medium => self.clearance() * ARCH_RISE_RATIO,
            _ => 0.0,
        }
    }

    /// Deck height at fraction `t` of the span
    pub fn deck_height_at(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let base = self.start_deck + (self.end_deck - self.start_deck) * t;
        base + self.arch_rise() * 4.0 * t * (1.0 - t)
    }

    /// Lowest point of the main cable above the deck, for suspension bridges
    pub fn cable_sag(&self) -> Option<f32> {
        if self.tier != BridgeTier::Long {
            return None;
        }
        let progress = ((self.span - MEDIUM_BRIDGE_MAX_SPAN)
            / (LONG_BRIDGE_MAX_SPAN - MEDIUM_BRIDGE_MAX_SPAN))
            .clamp(0.0, 1.0);
        let ratio = MIN_CABLE_SAG_RATIO + (MAX_CABLE_SAG_RATIO - MIN_CABLE_SAG_RATIO) * progress;
        Some(self.clearance() * ratio)
    }

    /// Tower height above the deck
    pub fn tower_height(&self) -> f32 {
        match self.tier {
            BridgeTier::Long | BridgeTier::Spanning => self.clearance() * 1.5,
            _ => 0.0,
        }
    }

    /// Main cable height at fraction `t`, hanging between the tower tops
    pub fn cable_height_at(&self, t: f32) -> Option<f32> {
        let sag = self.cable_sag()?;
        let t = t.clamp(0.0, 1.0);
        let drop = (2.0 * t - 1.0).powi(2);
        Some(self.deck_height_at(t) + sag + (self.tower_height() - sag) * drop)
    }

    /// Overwrite deck heights along a deck polyline by travelled fraction
    pub fn apply_to_deck(&self, deck: &mut [Vec3]) {
        let along = cumulative_distances(deck);
        let total = along.last().copied().unwrap_or(0.0);
        for (point, distance) in deck.iter_mut().zip(along) {
            let t = if total > f32::EPSILON { distance / total } else { 0.0 };
            point.y = self.deck_height_at(t);
        }
    }

    /// Support positions along the deck, with foundations below the ground or river bed
    pub fn supports(
        &self,
        deck: &[Vec3],
        terrain: Option<&dyn TerrainQuery>,
    ) -> Vec<SupportPlacement> {
        let along = cumulative_distances(deck);
        let total = along.last().copied().unwrap_or(0.0);

        self.tier
            .support_layout(self.span)
            .into_iter()
            .filter_map(|(t, kind)| {
                let point = point_at_distance(deck, total * t)?;
                let deck_height = self.deck_height_at(t);
                let ground = terrain
                    .map(|terrain| terrain.height_at(point.x, point.z))
                    .unwrap_or(self.sea_level)
                    .min(deck_height);
                let top = match kind {
                    SupportKind::Pillar => deck_height,
                    SupportKind::Tower => deck_height + self.tower_height(),
                };
                Some(SupportPlacement {
                    kind,
                    position: Vec3::new(point.x, deck_height, point.z),
                    top,
                    base: ground - FOUNDATION_DEPTH,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FnTerrain;

    fn crossing(length: f32) -> WaterCrossing {
        WaterCrossing {
            start_index: 1,
            end_index: 3,
            start_pos: Vec3::new(0.0, 0.0, 0.0),
            end_pos: Vec3::new(length, 0.0, 0.0),
            length,
            start_distance: 10.0,
            end_distance: 10.0 + length,
        }
    }

    #[test]
    fn test_deck_never_below_clearance() {
        let cases = [(60.0, 1.0, 30.0), (150.0, -2.0, 4.0), (500.0, 0.5, 0.5)];
        for (span, low_bank, high_bank) in cases {
            let tier = BridgeTier::from_span(span);
            let profile = BridgeProfile::new(tier, &crossing(span), (low_bank, high_bank), 0.0);
            for i in 0..=20 {
                let t = i as f32 / 20.0;
                assert!(profile.deck_height_at(t) >= tier.clearance() - 1e-4);
            }
        }
    }

    #[test]
    fn test_deck_meets_high_bank() {
        let profile = BridgeProfile::new(BridgeTier::Short, &crossing(60.0), (2.0, 30.0), 0.0);
        assert_eq!(profile.deck_height_at(0.0), 8.0);
        assert_eq!(profile.deck_height_at(1.0), 30.0);
        assert!((profile.deck_height_at(0.5) - 19.0).abs() < 1e-4);
    }

    #[test]
    fn test_arch_rises_mid_span() {
        let profile = BridgeProfile::new(BridgeTier::Medium, &crossing(150.0), (0.0, 0.0), 0.0);
        let rise = 12.0 * 0.7;
        assert!((profile.deck_height_at(0.5) - (12.0 + rise)).abs() < 1e-4);
        assert_eq!(profile.deck_height_at(0.0), 12.0);
    }

    #[test]
    fn test_cable_sag_grows_with_span() {
        let short = BridgeProfile::new(BridgeTier::Long, &crossing(320.0), (0.0, 0.0), 0.0);
        let long = BridgeProfile::new(BridgeTier::Long, &crossing(780.0), (0.0, 0.0), 0.0);
        let (a, b) = (short.cable_sag().unwrap(), long.cable_sag().unwrap());
        assert!(a < b);
        assert!(a >= 20.0 * 0.05 && b <= 20.0 * 0.2);

        // Cable hangs from tower tops down to the sag point
        assert!((long.cable_height_at(0.0).unwrap() - (20.0 + long.tower_height())).abs() < 1e-4);
        assert!((long.cable_height_at(0.5).unwrap() - (20.0 + b)).abs() < 1e-4);
        assert!(BridgeProfile::new(BridgeTier::Medium, &crossing(150.0), (0.0, 0.0), 0.0)
            .cable_sag()
            .is_none());
    }

    #[test]
    fn test_supports_reach_below_river_bed() {
        let terrain = FnTerrain::new(10.0, |_, _| -6.0);
        let deck = vec![Vec3::ZERO, Vec3::new(75.0, 0.0, 0.0), Vec3::new(150.0, 0.0, 0.0)];
        let profile = BridgeProfile::new(BridgeTier::Medium, &crossing(150.0), (1.0, 1.0), 0.0);
        let supports = profile.supports(&deck, Some(&terrain));

        assert_eq!(supports.len(), 3);
        assert!((supports[1].position.x - 75.0).abs() < 1e-4);
        for support in &supports {
            assert_eq!(support.kind, SupportKind::Pillar);
            assert_eq!(support.base, -8.0);
            assert!(support.top >= 12.0);
        }
    }

    #[test]
    fn test_apply_to_deck() {
        let profile = BridgeProfile::new(BridgeTier::Short, &crossing(40.0), (0.0, 16.0), 0.0);
        let mut deck = vec![Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0), Vec3::new(40.0, 0.0, 0.0)];
        profile.apply_to_deck(&mut deck);
        assert_eq!(deck[0].y, 8.0);
        assert!((deck[1].y - 12.0).abs() < 1e-4);
        assert_eq!(deck[2].y, 16.0);
    }
}
