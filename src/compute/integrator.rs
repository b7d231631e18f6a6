//! Explicit Euler position update.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use super::Vec2;

/// Advance one position by `dt`.
#[inline]
pub fn integrate_position(position: Vec2, velocity: Vec2, dt: f32) -> Vec2 {
    position + dt * velocity
}

/// Integrate pass: `output[i] = positions[i] + dt * velocities[i]`.
///
/// Positions are not wrapped or clamped; the boundary pass keeps particles
/// heading back into the domain instead.
pub fn integrate_positions_into(
    positions: &[Vec2],
    velocities: &[Vec2],
    output: &mut [Vec2],
    dt: f32,
) {
    debug_assert_eq!(positions.len(), velocities.len());
    debug_assert_eq!(positions.len(), output.len());

    #[cfg(not(target_arch = "wasm32"))]
    {
        output
            .par_iter_mut()
            .zip(positions.par_iter().zip(velocities.par_iter()))
            .for_each(|(out, (&p, &v))| *out = integrate_position(p, v, dt));
    }

    #[cfg(target_arch = "wasm32")]
    {
        for (out, (&p, &v)) in output.iter_mut().zip(positions.iter().zip(velocities)) {
            *out = integrate_position(p, v, dt);
        }
    }
}
