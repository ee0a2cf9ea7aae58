use crate::generation::errors::RoadResult;
use crate::map::TerrainData;
use crate::terrain::TerrainQuery;
use crate::terrain::coordinates::grid_to_world;
use noise::{MultiFractal, NoiseFn, Perlin, RidgedMulti};

/// Terrain generation algorithms
#[derive(Debug, Clone)]
pub enum TerrainAlgorithm {
    Flat {
        height: f32,
    },
    Perlin {
        base_height: f32,
        amplitude: f32,
        frequency: f32,
        octaves: u32,
    },
    Ridged {
        base_height: f32,
        amplitude: f32,
        frequency: f32,
        octaves: u32,
    },
    /// Gentle noise land cut by a meandering river channel running along z
    River {
        base_height: f32,
        amplitude: f32,
        channel_width: f32,
        channel_depth: f32,
        meander: f32,
    },
}

/// Main terrain generator struct
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    pub seed: u32,
    pub algorithm: TerrainAlgorithm,
}

impl TerrainGenerator {
    /// Create a new terrain generator
    pub fn new(seed: u32, algorithm: TerrainAlgorithm) -> Self {
        Self { seed, algorithm }
    }

    /// Generate terrain using the configured algorithm
    pub fn generate(&self, width: u32, height: u32, scale: f32) -> RoadResult<TerrainData> {
        let mut terrain = TerrainData::create_flat(width, height, scale, 0.0)?;

        match &self.algorithm {
            TerrainAlgorithm::Flat { height } => {
                terrain.heights.fill(*height);
            }
            TerrainAlgorithm::Perlin {
                base_height,
                amplitude,
                frequency,
                octaves,
            } => {
                let perlin = Perlin::new(self.seed);
                fill_from_world(&mut terrain, |x, z| {
                    base_height + fractal_perlin(&perlin, x, z, *frequency, *octaves) * amplitude
                });
            }
            TerrainAlgorithm::Ridged {
                base_height,
                amplitude,
                frequency,
                octaves,
            } => {
                let ridged = RidgedMulti::<Perlin>::new(self.seed)
                    .set_octaves(*octaves as usize)
                    .set_frequency(*frequency as f64);
                fill_from_world(&mut terrain, |x, z| {
                    base_height + (ridged.get([x as f64, z as f64]) as f32) * amplitude
                });
            }
            TerrainAlgorithm::River {
                base_height,
                amplitude,
                channel_width,
                channel_depth,
                meander,
            } => {
                let perlin = Perlin::new(self.seed);
                let depth_below_land = base_height + channel_depth;
                fill_from_world(&mut terrain, |x, z| {
                    let land = base_height + fractal_perlin(&perlin, x, z, 0.002, 3) * amplitude;
                    let centre = (z * 0.0015).sin() * meander;
                    let offset = (x - centre).abs();
                    if offset >= *channel_width {
                        return land;
                    }
                    // Smooth cosine bank profile down to the bed
                    let t = offset / channel_width;
                    let blend = 0.5 - 0.5 * (t * std::f32::consts::PI).cos();
                    let bed = land - depth_below_land;
                    bed + (land - bed) * blend.powi(3)
                });
            }
        }

        Ok(terrain)
    }
}

fn fractal_perlin(perlin: &Perlin, x: f32, z: f32, frequency: f32, octaves: u32) -> f32 {
    let mut noise_value = 0.0;
    let mut current_amplitude = 1.0;
    let mut current_frequency = frequency as f64;

    for _ in 0..octaves {
        let sample = perlin.get([x as f64 * current_frequency, z as f64 * current_frequency]);
        noise_value += sample * current_amplitude;
        current_amplitude *= 0.5; // Persistence
        current_frequency *= 2.0; // Lacunarity
    }

    noise_value as f32
}

fn fill_from_world(terrain: &mut TerrainData, height_fn: impl Fn(f32, f32) -> f32) {
    for z in 0..terrain.height {
        for x in 0..terrain.width {
            let (wx, wz) = grid_to_world(terrain, x as f32, z as f32);
            let index = (z * terrain.width + x) as usize;
            terrain.heights[index] = height_fn(wx, wz);
        }
    }
}

/// Get a predefined terrain preset
pub fn get_terrain_preset(name: &str, seed: Option<u32>) -> Option<TerrainGenerator> {
    let seed = seed.unwrap_or_else(rand::random);

    match name {
        "flat" => Some(TerrainGenerator::new(
            seed,
            TerrainAlgorithm::Flat { height: 10.0 },
        )),
        "hills" => Some(TerrainGenerator::new(
            seed,
            TerrainAlgorithm::Perlin {
                base_height: 25.0,
                amplitude: 40.0,
                frequency: 0.0015,
                octaves: 4,
            },
        )),
        "mountains" => Some(TerrainGenerator::new(
            seed,
            TerrainAlgorithm::Ridged {
                base_height: 40.0,
                amplitude: 120.0,
                frequency: 0.0008,
                octaves: 5,
            },
        )),
        "river" => Some(TerrainGenerator::new(
            seed,
            TerrainAlgorithm::River {
                base_height: 12.0,
                amplitude: 10.0,
                channel_width: 90.0,
                channel_depth: 6.0,
                meander: 300.0,
            },
        )),
        "archipelago" => Some(TerrainGenerator::new(
            seed,
            TerrainAlgorithm::Perlin {
                base_height: 2.0,
                amplitude: 30.0,
                frequency: 0.001,
                octaves: 3,
            },
        )),
        _ => None,
    }
}

/// Check if a position is dry and gentle enough to host a settlement
pub fn is_suitable_for_settlement(
    terrain: &dyn TerrainQuery,
    sea_level: f32,
    world_x: f32,
    world_z: f32,
    max_slope_degrees: f32,
) -> bool {
    let height = terrain.height_at(world_x, world_z);
    height > sea_level + 1.0 && terrain.slope_at(world_x, world_z) <= max_slope_degrees
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FnTerrain;

    #[test]
    fn test_flat_terrain_generation() {
        let generator = TerrainGenerator::new(12345, TerrainAlgorithm::Flat { height: 5.0 });

        let terrain = generator
            .generate(10, 10, 1.0)
            .expect("Terrain generation should succeed with valid parameters");

        assert_eq!(terrain.width, 10);
        assert_eq!(terrain.height, 10);
        assert_eq!(terrain.heights.len(), 100);
        assert!(terrain.heights.iter().all(|&h| h == 5.0));
    }

    #[test]
    fn test_perlin_terrain_generation() {
        let generator = TerrainGenerator::new(
            12345,
            TerrainAlgorithm::Perlin {
                base_height: 0.0,
                amplitude: 10.0,
                frequency: 0.1,
                octaves: 2,
            },
        );

        let terrain = generator.generate(8, 8, 1.0).unwrap();
        assert_eq!(terrain.heights.len(), 64);

        let first_height = terrain.heights[0];
        let has_variation = terrain
            .heights
            .iter()
            .any(|&h| (h - first_height).abs() > 0.1);
        assert!(has_variation, "Perlin noise should create height variation");
    }

    #[test]
    fn test_river_channel_dips_below_sea_level() {
        let generator = TerrainGenerator::new(
            7,
            TerrainAlgorithm::River {
                base_height: 12.0,
                amplitude: 0.0,
                channel_width: 60.0,
                channel_depth: 6.0,
                meander: 0.0,
            },
        );
        let terrain = generator.generate(64, 64, 10.0).unwrap();

        // Channel centre sits on x = 0; land far away keeps its base height
        assert!(terrain.height_at(0.0, 0.0) < -5.0);
        assert!((terrain.height_at(-200.0, 0.0) - 12.0).abs() < 1e-3);
        assert!((terrain.height_at(200.0, 50.0) - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_terrain_presets() {
        for name in ["flat", "hills", "mountains", "river", "archipelago"] {
            let preset = get_terrain_preset(name, Some(123)).expect("preset should exist");
            assert_eq!(preset.seed, 123);
        }
        assert!(get_terrain_preset("invalid", Some(123)).is_none());
    }

    #[test]
    fn test_settlement_suitability() {
        let flat = FnTerrain::new(1.0, |_, _| 5.0);
        assert!(is_suitable_for_settlement(&flat, 0.0, 0.0, 0.0, 10.0));
        assert!(!is_suitable_for_settlement(&flat, 10.0, 0.0, 0.0, 10.0));

        let steep = FnTerrain::new(1.0, |x, _| 50.0 + x * 2.0);
        assert!(!is_suitable_for_settlement(&steep, 0.0, 0.0, 0.0, 30.0));
    }
}
