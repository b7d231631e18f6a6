//! Compute module - State buffers and simulation passes.

mod boundary;
mod clock;
mod collision;
mod integrator;
mod propagator;
mod state;
mod vec2;

pub mod gpu;

pub use boundary::*;
pub use clock::*;
pub use collision::*;
pub use integrator::*;
pub use propagator::*;
pub use state::*;
pub use vec2::*;
