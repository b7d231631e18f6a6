//! Configuration types for particle simulation parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of particles. Fixed for the lifetime of a run.
    pub particle_count: usize,
    /// Particle radius shared by every particle, in domain units.
    pub radius: f32,
    /// Fixed time step used when no wall clock drives the simulation.
    pub dt: f32,
    /// Pairwise collision parameters.
    #[serde(default)]
    pub collision: CollisionConfig,
    /// Wall-clock frame timing.
    #[serde(default)]
    pub clock: ClockConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: 64,
            radius: 0.035,
            dt: 1.0 / 60.0,
            collision: CollisionConfig::default(),
            clock: ClockConfig::default(),
        }
    }
}

/// Pairwise collision parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionConfig {
    /// Factor applied to every pair impulse before accumulation.
    pub impulse_scale: f32,
    /// Separations below this contribute nothing.
    pub min_distance: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            impulse_scale: 0.5,
            min_distance: 1e-6,
        }
    }
}

/// Frame timing parameters for wall-clock driven runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Upper bound on a single frame's dt in seconds. `None` disables clamping.
    #[serde(default)]
    pub max_dt: Option<f32>,
}

impl SimulationConfig {
    /// Inner edge of the interaction shell (inclusive).
    #[inline]
    pub fn shell_inner(&self) -> f32 {
        self.radius
    }

    /// Outer edge of the interaction shell (exclusive).
    #[inline]
    pub fn shell_outer(&self) -> f32 {
        2.0 * self.radius
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::InvalidParticleCount);
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ConfigError::InvalidRadius(self.radius));
        }
        if !(self.dt.is_finite() && self.dt >= 0.0) {
            return Err(ConfigError::InvalidTimeStep(self.dt));
        }
        if !self.collision.impulse_scale.is_finite() {
            return Err(ConfigError::InvalidImpulseScale(self.collision.impulse_scale));
        }
        let min_distance = self.collision.min_distance;
        if !(min_distance.is_finite() && min_distance >= 0.0 && min_distance < self.radius) {
            return Err(ConfigError::InvalidMinDistance(min_distance));
        }
        if let Some(max_dt) = self.clock.max_dt {
            if !(max_dt.is_finite() && max_dt > 0.0) {
                return Err(ConfigError::InvalidMaxDt(max_dt));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Particle count must be non-zero")]
    InvalidParticleCount,
    #[error("Radius must be positive and finite, got {0}")]
    InvalidRadius(f32),
    #[error("Time step must be non-negative and finite, got {0}")]
    InvalidTimeStep(f32),
    #[error("Impulse scale must be finite, got {0}")]
    InvalidImpulseScale(f32),
    #[error("Minimum collision distance must be in [0, radius), got {0}")]
    InvalidMinDistance(f32),
    #[error("Maximum frame dt must be positive and finite, got {0}")]
    InvalidMaxDt(f32),
    #[error("Got {positions} positions but {velocities} velocities")]
    BufferLengthMismatch { positions: usize, velocities: usize },
    #[error("Seed defines {found} particles but configuration expects {expected}")]
    SeedCountMismatch { expected: usize, found: usize },
    #[error("Invalid {name} range [{min}, {max}]")]
    InvalidRange {
        name: &'static str,
        min: f32,
        max: f32,
    },
    #[error("Velocity standard deviation must be non-negative and finite, got {0}")]
    InvalidSigma(f32),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
