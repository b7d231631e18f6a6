//! Pairwise collision resolution.
//!
//! For every particle `i` the pass sums one contribution per particle `j`
//! (including `i` itself) into a zeroed accumulator:
//!
//! - `j == i`: the particle's own velocity, exactly once.
//! - `j` inside the interaction shell `[radius, 2 * radius)`:
//!   `-impulse_scale * |dot(d, w) / |d|^2| * d` with `d = p_j - p_i` and
//!   `w = v_j - v_i`.
//! - anything else: zero.
//!
//! The impulse is applied to `i` only and carries no mass term. Particle
//! `j` computes its own one-sided impulse in its own row of the pass, so
//! the two are not constrained to cancel and momentum is not conserved.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use crate::schema::SimulationConfig;

use super::Vec2;

/// Parameters read by the collision pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionParams {
    /// Inner shell edge (inclusive).
    pub shell_inner: f32,
    /// Outer shell edge (exclusive).
    pub shell_outer: f32,
    pub impulse_scale: f32,
    pub min_distance: f32,
}

impl From<&SimulationConfig> for CollisionParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            shell_inner: config.shell_inner(),
            shell_outer: config.shell_outer(),
            impulse_scale: config.collision.impulse_scale,
            min_distance: config.collision.min_distance,
        }
    }
}

/// Where a pair separation falls relative to the interaction shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separation {
    /// Centers (nearly) coincide; no direction to push along.
    Degenerate,
    /// Closer than `radius`.
    Overlapping,
    /// In `[radius, 2 * radius)`.
    Shell,
    /// At or beyond `2 * radius`.
    Apart,
}

impl CollisionParams {
    #[inline]
    pub fn classify(&self, distance: f32) -> Separation {
        if distance < self.min_distance {
            Separation::Degenerate
        } else if distance < self.shell_inner {
            Separation::Overlapping
        } else if distance < self.shell_outer {
            Separation::Shell
        } else {
            Separation::Apart
        }
    }
}

/// Impulse contributed to particle `i` by a distinct particle `j`.
#[inline]
pub fn pair_impulse(
    position_i: Vec2,
    velocity_i: Vec2,
    position_j: Vec2,
    velocity_j: Vec2,
    params: &CollisionParams,
) -> Vec2 {
    let position_diff = position_j - position_i;
    let distance_sq = position_diff.length_squared();

    if params.classify(distance_sq.sqrt()) != Separation::Shell {
        return Vec2::ZERO;
    }

    let velocity_diff = velocity_j - velocity_i;
    let rate = (position_diff.dot(velocity_diff) / distance_sq).abs();
    (-params.impulse_scale * rate) * position_diff
}

/// Contribution of pair `(i, j)` to the accumulator of particle `i`.
#[inline]
pub fn pair_contribution(
    i: usize,
    j: usize,
    positions: &[Vec2],
    velocities: &[Vec2],
    params: &CollisionParams,
) -> Vec2 {
    if i == j {
        return velocities[i];
    }
    pair_impulse(positions[i], velocities[i], positions[j], velocities[j], params)
}

/// Sum every contribution to particle `i`.
#[inline]
fn accumulate_row(
    i: usize,
    positions: &[Vec2],
    velocities: &[Vec2],
    params: &CollisionParams,
) -> Vec2 {
    let mut sum = Vec2::ZERO;
    for j in 0..positions.len() {
        sum += pair_contribution(i, j, positions, velocities, params);
    }
    sum
}

/// Collision pass: clear `output`, then accumulate all pair contributions.
///
/// O(N^2) pair evaluations. Rows are independent, so native builds spread
/// them across the rayon pool.
pub fn resolve_collisions_into(
    positions: &[Vec2],
    velocities: &[Vec2],
    output: &mut [Vec2],
    params: &CollisionParams,
) {
    debug_assert_eq!(positions.len(), velocities.len());
    debug_assert_eq!(positions.len(), output.len());

    output.fill(Vec2::ZERO);

    #[cfg(not(target_arch = "wasm32"))]
    {
        output.par_iter_mut().enumerate().for_each(|(i, acc)| {
            *acc += accumulate_row(i, positions, velocities, params);
        });
    }

    #[cfg(target_arch = "wasm32")]
    {
        for (i, acc) in output.iter_mut().enumerate() {
            *acc += accumulate_row(i, positions, velocities, params);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(radius: f32) -> CollisionParams {
        CollisionParams {
            shell_inner: radius,
            shell_outer: 2.0 * radius,
            impulse_scale: 0.5,
            min_distance: 1e-6,
        }
    }

    #[test]
    fn test_classify_shell_edges() {
        let p = params(0.25);
        assert_eq!(p.classify(0.0), Separation::Degenerate);
        assert_eq!(p.classify(0.1), Separation::Overlapping);
        // Inner edge is closed, outer edge is open.
        assert_eq!(p.classify(0.25), Separation::Shell);
        assert_eq!(p.classify(0.4), Separation::Shell);
        assert_eq!(p.classify(0.5), Separation::Apart);
        assert_eq!(p.classify(0.9), Separation::Apart);
    }

    #[test]
    fn test_params_take_shell_from_config() {
        let config = SimulationConfig {
            radius: 0.05,
            ..SimulationConfig::default()
        };
        let p = CollisionParams::from(&config);

        assert_eq!(p.shell_inner, config.shell_inner());
        assert_eq!(p.shell_outer, config.shell_outer());
        assert_eq!(p.classify(config.shell_inner()), Separation::Shell);
        assert_eq!(p.classify(config.shell_outer()), Separation::Apart);
    }

    #[test]
    fn test_impulse_at_exact_edges() {
        let p = params(0.25);
        let origin = Vec2::ZERO;
        let v_i = Vec2::new(0.1, 0.0);
        let v_j = Vec2::new(-0.1, 0.0);

        let at_inner = pair_impulse(origin, v_i, Vec2::new(0.25, 0.0), v_j, &p);
        assert!(at_inner.x < 0.0, "impulse at r should fire: {at_inner:?}");

        let at_outer = pair_impulse(origin, v_i, Vec2::new(0.5, 0.0), v_j, &p);
        assert_eq!(at_outer, Vec2::ZERO);
    }

    #[test]
    fn test_far_pair_contributes_nothing() {
        let p = params(0.035);
        let impulse = pair_impulse(
            Vec2::new(0.2, 0.5),
            Vec2::new(0.1, 0.0),
            Vec2::new(0.2 + 2.5 * 0.035, 0.5),
            Vec2::new(-0.1, 0.0),
            &p,
        );
        assert_eq!(impulse, Vec2::ZERO);
    }

    #[test]
    fn test_overlapping_pair_contributes_nothing() {
        let p = params(0.035);
        let impulse = pair_impulse(
            Vec2::new(0.5, 0.5),
            Vec2::new(0.1, 0.0),
            Vec2::new(0.5 + 0.5 * 0.035, 0.5),
            Vec2::new(-0.1, 0.0),
            &p,
        );
        assert_eq!(impulse, Vec2::ZERO);
    }

    #[test]
    fn test_coincident_pair_is_finite() {
        let positions = [Vec2::new(0.5, 0.5), Vec2::new(0.5, 0.5)];
        let velocities = [Vec2::new(0.1, 0.0), Vec2::new(-0.1, 0.0)];
        let mut output = [Vec2::ZERO; 2];

        resolve_collisions_into(&positions, &velocities, &mut output, &params(0.035));

        assert!(output.iter().all(|v| v.is_finite()));
        assert_eq!(output, velocities);
    }

    #[test]
    fn test_head_on_impulses_are_opposite() {
        let radius = 0.035;
        let p = params(radius);
        let p0 = Vec2::new(0.3, 0.5);
        let p1 = Vec2::new(0.3 + 1.5 * radius, 0.5);
        let v0 = Vec2::new(0.1, 0.0);
        let v1 = Vec2::new(-0.1, 0.0);

        let on_0 = pair_impulse(p0, v0, p1, v1, &p);
        let on_1 = pair_impulse(p1, v1, p0, v0, &p);

        assert!(on_0.x < 0.0);
        assert!(on_1.x > 0.0);
        assert_eq!(on_0.y, 0.0);
        assert_eq!(on_1.y, 0.0);
        // Symmetric setup: 0.5 * |(-0.2 * d) / d^2| * d = 0.1 in magnitude.
        assert!((on_0.x + 0.1).abs() < 1e-5, "{on_0:?}");
        assert!((on_1.x - 0.1).abs() < 1e-5, "{on_1:?}");
    }

    #[test]
    fn test_impulse_repels_even_when_separating() {
        // The magnitude uses |dot|, so receding pairs are still pushed apart.
        let p = params(0.035);
        let impulse = pair_impulse(
            Vec2::new(0.3, 0.5),
            Vec2::new(-0.1, 0.0),
            Vec2::new(0.35, 0.5),
            Vec2::new(0.1, 0.0),
            &p,
        );
        assert!(impulse.x < 0.0);
    }

    #[test]
    fn test_single_particle_is_identity() {
        let positions = [Vec2::new(0.4, 0.6)];
        let velocities = [Vec2::new(0.25, -0.125)];
        let mut output = [Vec2::new(9.0, 9.0)];

        resolve_collisions_into(&positions, &velocities, &mut output, &params(0.035));

        assert_eq!(output[0], velocities[0]);
    }

    #[test]
    fn test_isolated_particle_keeps_velocity() {
        let radius = 0.035;
        let positions = [
            Vec2::new(0.3, 0.5),
            Vec2::new(0.3 + 1.5 * radius, 0.5),
            Vec2::new(0.8, 0.8),
        ];
        let velocities = [
            Vec2::new(0.1, 0.0),
            Vec2::new(-0.1, 0.0),
            Vec2::new(0.05, -0.07),
        ];
        let mut output = [Vec2::ZERO; 3];

        resolve_collisions_into(&positions, &velocities, &mut output, &params(radius));

        assert_eq!(output[2], velocities[2]);
        assert_ne!(output[0], velocities[0]);
        assert_ne!(output[1], velocities[1]);
    }

    #[test]
    fn test_contributions_sum_over_neighbours() {
        // Two symmetric neighbours on either side cancel on the middle particle.
        let radius = 0.1;
        let positions = [
            Vec2::new(0.35, 0.5),
            Vec2::new(0.5, 0.5),
            Vec2::new(0.65, 0.5),
        ];
        let velocities = [Vec2::new(0.2, 0.0), Vec2::ZERO, Vec2::new(-0.2, 0.0)];
        let mut output = [Vec2::ZERO; 3];

        resolve_collisions_into(&positions, &velocities, &mut output, &params(radius));

        assert!(output[1].x.abs() < 1e-6, "{:?}", output[1]);
        assert_eq!(output[1].y, 0.0);
    }
}
