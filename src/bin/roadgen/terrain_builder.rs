use waygen::terrain_generation::{TerrainAlgorithm, TerrainGenerator, get_terrain_preset};
use waygen::{RoadError, RoadResult};

const DEFAULT_AMPLITUDE: f32 = 40.0;
const DEFAULT_FREQUENCY: f32 = 0.0015;
const DEFAULT_OCTAVES: u32 = 4;

pub struct TerrainBuilder {
    terrain_type: String,
    seed: Option<u32>,
    amplitude: f32,
    frequency: f32,
    octaves: u32,
}

impl TerrainBuilder {
    pub fn new(terrain_type: String) -> Self {
        Self {
            terrain_type,
            seed: None,
            amplitude: DEFAULT_AMPLITUDE,
            frequency: DEFAULT_FREQUENCY,
            octaves: DEFAULT_OCTAVES,
        }
    }

    pub fn seed(mut self, seed: Option<u32>) -> Self {
        self.seed = seed;
        self
    }

    pub fn amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves;
        self
    }

    fn has_manual_parameters(&self) -> bool {
        self.amplitude != DEFAULT_AMPLITUDE
            || self.frequency != DEFAULT_FREQUENCY
            || self.octaves != DEFAULT_OCTAVES
    }

    pub fn build(self) -> RoadResult<TerrainGenerator> {
        let seed = self.seed.unwrap_or_else(rand::random);

        if let Some(mut generator) = get_terrain_preset(&self.terrain_type, Some(seed)) {
            if self.has_manual_parameters() {
                generator.algorithm = self.override_preset_params(generator.algorithm);
            }
            return Ok(generator);
        }

        let algorithm = match self.terrain_type.as_str() {
            "perlin" => TerrainAlgorithm::Perlin {
                base_height: self.amplitude * 0.5,
                amplitude: self.amplitude,
                frequency: self.frequency,
                octaves: self.octaves,
            },
            "ridged" => TerrainAlgorithm::Ridged {
                base_height: self.amplitude * 0.3,
                amplitude: self.amplitude,
                frequency: self.frequency,
                octaves: self.octaves,
            },
            _ => {
                return Err(RoadError::InvalidArgument {
                    reason: format!(
                        "Unknown terrain type: '{}'. Available presets: flat, hills, mountains, \
                         river, archipelago. Custom algorithms: perlin, ridged",
                        self.terrain_type
                    ),
                });
            }
        };

        Ok(TerrainGenerator::new(seed, algorithm))
    }

    fn announce_custom_parameters(&self) {
        println!(
            "Using custom parameters with '{}' terrain type: \
             amplitude={}, frequency={}, octaves={}",
            self.terrain_type, self.amplitude, self.frequency, self.octaves
        );
    }

    fn override_preset_params(&self, algorithm: TerrainAlgorithm) -> TerrainAlgorithm {
        match algorithm {
            TerrainAlgorithm::Perlin { base_height, .. } => {
                self.announce_custom_parameters();
                TerrainAlgorithm::Perlin {
                    base_height,
                    amplitude: self.amplitude,
                    frequency: self.frequency,
                    octaves: self.octaves,
                }
            }
            TerrainAlgorithm::Ridged { base_height, .. } => {
                self.announce_custom_parameters();
                TerrainAlgorithm::Ridged {
                    base_height,
                    amplitude: self.amplitude,
                    frequency: self.frequency,
                    octaves: self.octaves,
                }
            }
            TerrainAlgorithm::River {
                base_height,
                channel_width,
                channel_depth,
                meander,
                ..
            } => {
                println!("Warning: Only amplitude is used for 'river' terrain type");
                TerrainAlgorithm::River {
                    base_height,
                    amplitude: self.amplitude,
                    channel_width,
                    channel_depth,
                    meander,
                }
            }
            flat @ TerrainAlgorithm::Flat { .. } => {
                println!(
                    "Warning: Manual terrain parameters (amplitude, frequency, octaves) \
                     are ignored for 'flat' terrain type"
                );
                flat
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_builder_default() {
        let generator = TerrainBuilder::new("hills".to_string())
            .seed(Some(12345))
            .build()
            .unwrap();
        assert_eq!(generator.seed, 12345);
    }

    #[test]
    fn test_terrain_builder_with_manual_params() {
        let generator = TerrainBuilder::new("hills".to_string())
            .seed(Some(12345))
            .amplitude(100.0)
            .frequency(0.002)
            .octaves(6)
            .build()
            .unwrap();

        match generator.algorithm {
            TerrainAlgorithm::Perlin {
                amplitude,
                frequency,
                octaves,
                ..
            } => {
                assert_eq!(amplitude, 100.0);
                assert_eq!(frequency, 0.002);
                assert_eq!(octaves, 6);
            }
            _ => panic!("Expected Perlin algorithm"),
        }
    }

    #[test]
    fn test_terrain_builder_custom_algorithm() {
        let generator = TerrainBuilder::new("ridged".to_string())
            .seed(Some(7))
            .amplitude(80.0)
            .build()
            .unwrap();
        assert_eq!(generator.seed, 7);
        assert!(matches!(
            generator.algorithm,
            TerrainAlgorithm::Ridged { amplitude, .. } if amplitude == 80.0
        ));
    }

    #[test]
    fn test_flat_ignores_manual_params() {
        let generator = TerrainBuilder::new("flat".to_string())
            .seed(Some(1))
            .amplitude(5.0)
            .build()
            .unwrap();
        assert!(matches!(generator.algorithm, TerrainAlgorithm::Flat { .. }));
    }

    #[test]
    fn test_terrain_builder_unknown_type() {
        assert!(TerrainBuilder::new("valleys".to_string()).build().is_err());
    }
}
