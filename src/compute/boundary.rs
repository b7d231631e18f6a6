//! Boundary reflection at the edges of the unit square.
//!
//! A particle outside `[0, 1]` on an axis gets that axis' velocity pointed
//! back into the domain. Positions are never clamped; a particle that has
//! overshot keeps moving inward until it re-enters.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use super::Vec2;

/// Lower edge of the domain on both axes.
pub const DOMAIN_MIN: f32 = 0.0;
/// Upper edge of the domain on both axes.
pub const DOMAIN_MAX: f32 = 1.0;

/// Reflect a single velocity component against the domain edges.
#[inline]
fn reflect_axis(position: f32, velocity: f32) -> f32 {
    if position > DOMAIN_MAX {
        -velocity.abs()
    } else if position < DOMAIN_MIN {
        velocity.abs()
    } else {
        velocity
    }
}

/// Velocity of one particle after boundary reflection.
#[inline]
pub fn reflect_velocity(position: Vec2, velocity: Vec2) -> Vec2 {
    Vec2::new(
        reflect_axis(position.x, velocity.x),
        reflect_axis(position.y, velocity.y),
    )
}

/// Whether `position` lies inside the closed unit square.
#[inline]
pub fn in_domain(position: Vec2) -> bool {
    let range = DOMAIN_MIN..=DOMAIN_MAX;
    range.contains(&position.x) && range.contains(&position.y)
}

/// Boundary pass: write reflected velocities for every particle into `output`.
pub fn resolve_boundaries_into(positions: &[Vec2], velocities: &[Vec2], output: &mut [Vec2]) {
    debug_assert_eq!(positions.len(), velocities.len());
    debug_assert_eq!(positions.len(), output.len());

    #[cfg(not(target_arch = "wasm32"))]
    {
        output
            .par_iter_mut()
            .zip(positions.par_iter().zip(velocities.par_iter()))
            .for_each(|(out, (&p, &v))| *out = reflect_velocity(p, v));
    }

    #[cfg(target_arch = "wasm32")]
    {
        for (out, (&p, &v)) in output.iter_mut().zip(positions.iter().zip(velocities)) {
            *out = reflect_velocity(p, v);
        }
    }
}
