//! Schema module - Configuration and seeding types for particle simulations.

mod config;
mod seed;

pub use config::*;
pub use seed::*;
