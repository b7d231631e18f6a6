//! CPU Propagator - Main simulation driver.
//!
//! Orchestrates the per-frame pass pipeline:
//! collision -> boundary -> integrate -> presented.

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::schema::{ConfigError, SimulationConfig};

use super::{
    CollisionParams, Quantity, SimulationState, Vec2, in_domain, integrate_positions_into,
    resolve_boundaries_into, resolve_collisions_into,
};

/// Stage of the frame pipeline a propagator is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FramePhase {
    #[default]
    Idle,
    /// velocity.back <- collisions(position.front, velocity.front), then swap velocity.
    CollisionPass,
    /// velocity.back <- reflect(position.front, velocity.front), then swap velocity.
    BoundaryPass,
    /// position.back <- position.front + dt * velocity.front, then swap position.
    IntegratePass,
    /// position.front holds the frame's result.
    Presented,
}

impl FramePhase {
    /// Passes run by every frame, in order.
    pub const PIPELINE: [FramePhase; 3] = [
        FramePhase::CollisionPass,
        FramePhase::BoundaryPass,
        FramePhase::IntegratePass,
    ];

    /// The quantity whose buffers a pass writes and swaps.
    pub fn target(self) -> Option<Quantity> {
        match self {
            FramePhase::CollisionPass | FramePhase::BoundaryPass => Some(Quantity::Velocity),
            FramePhase::IntegratePass => Some(Quantity::Position),
            FramePhase::Idle | FramePhase::Presented => None,
        }
    }
}

/// Errors that abort a frame before any pass runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("Time step must be non-negative and finite, got {0}")]
    InvalidTimeStep(f32),
    #[error("State holds {found} particles but the propagator expects {expected}")]
    ParticleCountMismatch { expected: usize, found: usize },
    #[error("State holds {positions} positions but {velocities} velocities")]
    BufferLengthMismatch { positions: usize, velocities: usize },
}

/// Check that a frame can run on `state` with `dt`.
pub fn validate_frame(
    config: &SimulationConfig,
    state: &SimulationState,
    dt: f32,
) -> Result<(), SimulationError> {
    if !(dt.is_finite() && dt >= 0.0) {
        return Err(SimulationError::InvalidTimeStep(dt));
    }
    let found = state.particle_count();
    if found != config.particle_count {
        return Err(SimulationError::ParticleCountMismatch {
            expected: config.particle_count,
            found,
        });
    }
    let velocities = state.velocities().len();
    if velocities != found {
        return Err(SimulationError::BufferLengthMismatch {
            positions: found,
            velocities,
        });
    }
    Ok(())
}

/// CPU-based particle propagator.
pub struct CpuPropagator {
    config: SimulationConfig,
    params: CollisionParams,
    phase: FramePhase,
}

impl CpuPropagator {
    /// Create new propagator from configuration.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "CPU propagator: {} particles, radius {}",
            config.particle_count, config.radius
        );

        let params = CollisionParams::from(&config);
        Ok(Self {
            config,
            params,
            phase: FramePhase::Idle,
        })
    }

    /// Advance one frame by `dt` seconds.
    pub fn step(&mut self, state: &mut SimulationState, dt: f32) -> Result<(), SimulationError> {
        validate_frame(&self.config, state, dt)?;

        for phase in FramePhase::PIPELINE {
            self.phase = phase;
            trace!("frame {}: {:?}", state.frame, phase);
            match phase {
                FramePhase::CollisionPass => self.collision_pass(state),
                FramePhase::BoundaryPass => self.boundary_pass(state),
                FramePhase::IntegratePass => self.integrate_pass(state, dt),
                FramePhase::Idle | FramePhase::Presented => {}
            }
        }

        self.phase = FramePhase::Presented;
        state.time += dt;
        state.frame += 1;
        Ok(())
    }

    /// Run `frames` frames with the configured fixed `dt`.
    pub fn run(&mut self, state: &mut SimulationState, frames: u64) -> Result<(), SimulationError> {
        let dt = self.config.dt;
        for _ in 0..frames {
            self.step(state, dt)?;
        }
        debug!("Ran {} frames, t = {:.4}s", frames, state.time);
        Ok(())
    }

    /// Pairwise collision pass over the velocity buffers.
    pub fn collision_pass(&self, state: &mut SimulationState) {
        let store = &mut state.store;
        let positions = store.position.front();
        let (velocities, output) = store.velocity.split_mut();
        resolve_collisions_into(positions, velocities, output, &self.params);
        store.swap(Quantity::Velocity);
    }

    /// Boundary reflection pass over the velocity buffers.
    pub fn boundary_pass(&self, state: &mut SimulationState) {
        let store = &mut state.store;
        let positions = store.position.front();
        let (velocities, output) = store.velocity.split_mut();
        resolve_boundaries_into(positions, velocities, output);
        store.swap(Quantity::Velocity);
    }

    /// Position integration pass.
    pub fn integrate_pass(&self, state: &mut SimulationState, dt: f32) {
        let store = &mut state.store;
        let velocities = store.velocity.front();
        let (positions, output) = store.position.split_mut();
        integrate_positions_into(positions, velocities, output, dt);
        store.swap(Quantity::Position);
    }

    /// Current pipeline stage.
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Get configuration reference.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

/// Simulation statistics for monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Sum of `0.5 * |v|^2` over all particles (unit mass).
    pub kinetic_energy: f32,
    /// Sum of velocities (unit mass).
    pub momentum: Vec2,
    pub mean_speed: f32,
    pub max_speed: f32,
    /// Mean position.
    pub centroid: Vec2,
    /// Particles currently outside the unit square.
    pub out_of_bounds: usize,
}

impl SimulationStats {
    /// Compute statistics from state.
    pub fn from_state(state: &SimulationState) -> Self {
        let mut kinetic_energy = 0.0f32;
        let mut momentum = Vec2::ZERO;
        let mut speed_sum = 0.0f32;
        let mut max_speed = 0.0f32;
        let mut position_sum = Vec2::ZERO;
        let mut out_of_bounds = 0usize;

        for (&p, &v) in state.positions().iter().zip(state.velocities()) {
            let speed_sq = v.length_squared();
            let speed = speed_sq.sqrt();
            kinetic_energy += 0.5 * speed_sq;
            momentum += v;
            speed_sum += speed;
            max_speed = max_speed.max(speed);
            position_sum += p;
            if !in_domain(p) {
                out_of_bounds += 1;
            }
        }

        let count = state.particle_count().max(1) as f32;
        Self {
            kinetic_energy,
            momentum,
            mean_speed: speed_sum / count,
            max_speed,
            centroid: (1.0 / count) * position_sum,
            out_of_bounds,
        }
    }
}
