//! Seed types for initializing particle simulations.

use rand::{
    Rng, SeedableRng,
    distributions::{Distribution, Uniform},
    rngs::StdRng,
};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::compute::Vec2;

fn default_position_range() -> (f32, f32) {
    (0.25, 0.75)
}

fn default_velocity_range() -> (f32, f32) {
    (-0.5, 0.5)
}

/// Complete seed specification for simulation initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    /// Pattern to use for seeding.
    pub pattern: Pattern,
}

/// Initial particle layouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Pattern {
    /// Positions and velocities drawn uniformly per axis.
    UniformRandom {
        /// Per-axis position range.
        #[serde(default = "default_position_range")]
        position_range: (f32, f32),
        /// Per-axis velocity range.
        #[serde(default = "default_velocity_range")]
        velocity_range: (f32, f32),
        /// Random seed.
        seed: u64,
    },
    /// Uniform positions with zero-mean normally distributed velocities.
    GaussianVelocities {
        /// Per-axis position range.
        #[serde(default = "default_position_range")]
        position_range: (f32, f32),
        /// Standard deviation of each velocity component.
        speed_sigma: f32,
        /// Random seed.
        seed: u64,
    },
    /// Explicit particle table.
    Custom {
        /// One entry per particle.
        particles: Vec<ParticleSpec>,
    },
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::UniformRandom {
            position_range: default_position_range(),
            velocity_range: default_velocity_range(),
            seed: 0,
        }
    }
}

/// Specification for a single particle in a `Custom` pattern.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParticleSpec {
    pub position: (f32, f32),
    pub velocity: (f32, f32),
}

impl Seed {
    /// Generate initial positions and velocities for `count` particles.
    pub fn generate(&self, count: usize) -> Result<(Vec<Vec2>, Vec<Vec2>), ConfigError> {
        match &self.pattern {
            Pattern::UniformRandom {
                position_range,
                velocity_range,
                seed,
            } => {
                let positions = uniform_distribution("position", *position_range)?;
                let velocities = uniform_distribution("velocity", *velocity_range)?;
                let mut rng = StdRng::seed_from_u64(*seed);
                Ok(sample_particles(&mut rng, count, &positions, &velocities))
            }
            Pattern::GaussianVelocities {
                position_range,
                speed_sigma,
                seed,
            } => {
                if !(speed_sigma.is_finite() && *speed_sigma >= 0.0) {
                    return Err(ConfigError::InvalidSigma(*speed_sigma));
                }
                let positions = uniform_distribution("position", *position_range)?;
                let velocities = Normal::new(0.0f32, *speed_sigma)
                    .map_err(|_| ConfigError::InvalidSigma(*speed_sigma))?;
                let mut rng = StdRng::seed_from_u64(*seed);
                Ok(sample_particles(&mut rng, count, &positions, &velocities))
            }
            Pattern::Custom { particles } => {
                if particles.len() != count {
                    return Err(ConfigError::SeedCountMismatch {
                        expected: count,
                        found: particles.len(),
                    });
                }
                Ok(particles
                    .iter()
                    .map(|p| (Vec2::from(p.position), Vec2::from(p.velocity)))
                    .unzip())
            }
        }
    }
}

fn uniform_distribution(
    name: &'static str,
    (min, max): (f32, f32),
) -> Result<Uniform<f32>, ConfigError> {
    if !(min.is_finite() && max.is_finite() && min <= max && (max - min).is_finite()) {
        return Err(ConfigError::InvalidRange { name, min, max });
    }
    Ok(Uniform::new_inclusive(min, max))
}

fn sample_particles<R, P, V>(
    rng: &mut R,
    count: usize,
    positions: &P,
    velocities: &V,
) -> (Vec<Vec2>, Vec<Vec2>)
where
    R: Rng,
    P: Distribution<f32>,
    V: Distribution<f32>,
{
    (0..count)
        .map(|_| {
            let position = Vec2::new(positions.sample(rng), positions.sample(rng));
            let velocity = Vec2::new(velocities.sample(rng), velocities.sample(rng));
            (position, velocity)
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ranges() {
        let (positions, velocities) = Seed::default().generate(200).unwrap();
        assert_eq!(positions.len(), 200);
        assert_eq!(velocities.len(), 200);

        for p in &positions {
            assert!((0.25..=0.75).contains(&p.x) && (0.25..=0.75).contains(&p.y));
        }
        for v in &velocities {
            assert!((-0.5..=0.5).contains(&v.x) && (-0.5..=0.5).contains(&v.y));
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let seed = Seed {
            pattern: Pattern::UniformRandom {
                position_range: (0.25, 0.75),
                velocity_range: (-0.1, 0.1),
                seed: 42,
            },
        };
        let a = seed.generate(16).unwrap();
        let b = seed.generate(16).unwrap();
        assert_eq!(a, b);

        let other = Seed {
            pattern: Pattern::UniformRandom {
                position_range: (0.25, 0.75),
                velocity_range: (-0.1, 0.1),
                seed: 43,
            },
        };
        assert_ne!(a.0, other.generate(16).unwrap().0);
    }

    #[test]
    fn test_gaussian_velocities() {
        let seed = Seed {
            pattern: Pattern::GaussianVelocities {
                position_range: (0.4, 0.6),
                speed_sigma: 0.05,
                seed: 7,
            },
        };
        let (positions, velocities) = seed.generate(2000).unwrap();
        assert!(positions.iter().all(|p| (0.4..=0.6).contains(&p.x)));

        let mean_vx = velocities.iter().map(|v| v.x).sum::<f32>() / velocities.len() as f32;
        assert!(mean_vx.abs() < 0.01, "mean vx = {mean_vx}");
    }

    #[test]
    fn test_custom_pattern() {
        let seed = Seed {
            pattern: Pattern::Custom {
                particles: vec![
                    ParticleSpec {
                        position: (0.3, 0.5),
                        velocity: (0.1, 0.0),
                    },
                    ParticleSpec {
                        position: (0.7, 0.5),
                        velocity: (-0.1, 0.0),
                    },
                ],
            },
        };
        let (positions, velocities) = seed.generate(2).unwrap();
        assert_eq!(positions[1], Vec2::new(0.7, 0.5));
        assert_eq!(velocities[0], Vec2::new(0.1, 0.0));

        assert!(matches!(
            seed.generate(3),
            Err(ConfigError::SeedCountMismatch {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_invalid_range_rejected() {
        let seed = Seed {
            pattern: Pattern::UniformRandom {
                position_range: (0.8, 0.2),
                velocity_range: (-0.5, 0.5),
                seed: 0,
            },
        };
        assert!(matches!(
            seed.generate(4),
            Err(ConfigError::InvalidRange {
                name: "position",
                ..
            })
        ));
    }

    #[test]
    fn test_overflowing_range_rejected() {
        let seed = Seed {
            pattern: Pattern::UniformRandom {
                position_range: (-f32::MAX, f32::MAX),
                velocity_range: (-0.5, 0.5),
                seed: 0,
            },
        };
        assert!(matches!(
            seed.generate(4),
            Err(ConfigError::InvalidRange {
                name: "position",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_sigma_rejected() {
        let seed = Seed {
            pattern: Pattern::GaussianVelocities {
                position_range: (0.25, 0.75),
                speed_sigma: -1.0,
                seed: 0,
            },
        };
        assert!(matches!(seed.generate(4), Err(ConfigError::InvalidSigma(_))));
    }

    #[test]
    fn test_json_round_trip_tagged() {
        let json = r#"{"pattern": {"type": "UniformRandom", "seed": 5}}"#;
        let seed: Seed = serde_json::from_str(json).unwrap();
        match seed.pattern {
            Pattern::UniformRandom {
                position_range,
                velocity_range,
                seed,
            } => {
                assert_eq!(position_range, (0.25, 0.75));
                assert_eq!(velocity_range, (-0.5, 0.5));
                assert_eq!(seed, 5);
            }
            other => panic!("unexpected pattern {other:?}"),
        }
    }
}
