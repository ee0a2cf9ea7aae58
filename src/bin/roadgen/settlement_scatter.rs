use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use waygen::terrain::TerrainQuery;
use waygen::{Settlement, TerrainData, is_suitable_for_settlement};

/// Fraction of the half extent kept clear of the map border
const BORDER_MARGIN: f32 = 0.1;
const ATTEMPTS_PER_SETTLEMENT: u32 = 200;

pub struct ScatterConfig {
    pub count: u32,
    pub population_range: (u32, u32),
    /// Minimum horizontal distance between settlement centres
    pub min_spacing: f32,
    pub max_slope_degrees: f32,
    pub seed: u32,
}

/// Place settlements on dry, gentle ground with a seeded RNG.
///
/// Populations are drawn log-uniformly so a map gets a few towns and many villages.
pub fn scatter_settlements(
    terrain: &TerrainData,
    sea_level: f32,
    config: &ScatterConfig,
) -> Vec<Settlement> {
    let mut rng = Pcg64::seed_from_u64(config.seed as u64);
    let mut settlements: Vec<Settlement> = Vec::new();

    let half_x = terrain.world_width() * 0.5 * (1.0 - BORDER_MARGIN);
    let half_z = terrain.world_depth() * 0.5 * (1.0 - BORDER_MARGIN);
    let (min_pop, max_pop) = config.population_range;
    let (ln_min, ln_max) = ((min_pop.max(1) as f32).ln(), (max_pop.max(1) as f32).ln());

    println!("Scattering {} settlements...", config.count);

    let max_attempts = config.count * ATTEMPTS_PER_SETTLEMENT;
    let mut attempts = 0;
    while settlements.len() < config.count as usize && attempts < max_attempts {
        attempts += 1;

        let x = rng.gen_range(-half_x..=half_x);
        let z = rng.gen_range(-half_z..=half_z);
        if !is_suitable_for_settlement(terrain, sea_level, x, z, config.max_slope_degrees) {
            continue;
        }

        let center = Vec3::new(x, terrain.height_at(x, z), z);
        let crowded = settlements
            .iter()
            .any(|s| Vec2::new(s.center.x - x, s.center.z - z).length() < config.min_spacing);
        if crowded {
            continue;
        }

        let population = rng.gen_range(ln_min..=ln_max).exp().round() as u32;
        let population = population.clamp(min_pop, max_pop);
        let settlement = Settlement::new(settlements.len() as u32, center, population);
        println!(
            "  {:?} #{} at ({:.1}, {:.1}, {:.1}) population {}",
            settlement.kind, settlement.id, center.x, center.y, center.z, settlement.population
        );
        settlements.push(settlement);
    }

    if settlements.len() < config.count as usize {
        println!(
            "Warning: Only found {} suitable settlement sites out of {} requested",
            settlements.len(),
            config.count
        );
    }

    settlements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(count: u32, seed: u32) -> ScatterConfig {
        ScatterConfig {
            count,
            population_range: (50, 5000),
            min_spacing: 150.0,
            max_slope_degrees: 12.0,
            seed,
        }
    }

    #[test]
    fn test_scatter_on_flat_land() {
        let terrain = TerrainData::create_flat(100, 100, 20.0, 10.0).unwrap();
        let settlements = scatter_settlements(&terrain, 0.0, &config(8, 42));

        assert_eq!(settlements.len(), 8);
        for (i, s) in settlements.iter().enumerate() {
            assert_eq!(s.id, i as u32);
            assert!((50..=5000).contains(&s.population));
            assert!(s.center.x.abs() <= 1000.0 && s.center.z.abs() <= 1000.0);
            assert!((s.center.y - 10.0).abs() < 1e-3);
        }
        for a in &settlements {
            for b in &settlements {
                if a.id != b.id {
                    assert!(a.distance_xz(b) >= 150.0);
                }
            }
        }
    }

    #[test]
    fn test_scatter_is_deterministic() {
        let terrain = TerrainData::create_flat(64, 64, 20.0, 10.0).unwrap();
        let first = scatter_settlements(&terrain, 0.0, &config(5, 7));
        let second = scatter_settlements(&terrain, 0.0, &config(5, 7));
        assert_eq!(first, second);
    }

    #[test]
    fn test_flooded_map_has_no_sites() {
        let terrain = TerrainData::create_flat(32, 32, 20.0, -5.0).unwrap();
        assert!(scatter_settlements(&terrain, 0.0, &config(4, 1)).is_empty());
    }
}
