//! Ping-pong particle simulation.
//!
//! N particles in the unit square, with position and velocity held in
//! double-buffered arrays. Every frame runs three data-parallel passes,
//! each reading the front buffers and writing a back buffer that is then
//! swapped in:
//!
//! 1. pairwise collision (O(N^2), one-sided impulses in a `[r, 2r)` shell),
//! 2. boundary reflection,
//! 3. position integration.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration types and seeding for simulations
//! - `compute`: State buffers, passes, CPU and GPU propagators
//!
//! # Example
//!
//! ```rust,no_run
//! use particle_pingpong::{
//!     schema::{SimulationConfig, Seed},
//!     compute::{CpuPropagator, SimulationState},
//! };
//!
//! let config = SimulationConfig::default();
//! let mut state = SimulationState::from_seed(&Seed::default(), &config)?;
//!
//! let mut propagator = CpuPropagator::new(config)?;
//! propagator.run(&mut state, 100)?;
//!
//! for p in state.positions() {
//!     println!("{:.3} {:.3}", p.x, p.y);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod schema;

// WebAssembly bindings (only for wasm32 target)
#[cfg(target_arch = "wasm32")]
pub mod wasm;

// Re-export commonly used types
pub use compute::{CpuPropagator, FrameClock, SimulationState, SimulationStats, Vec2};
pub use schema::{Pattern, Seed, SimulationConfig};
