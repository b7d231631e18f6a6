//! GPU Compute Backend
//!
//! Runs the frame pipeline as WebGPU (wgpu) compute passes over
//! ping-ponged storage buffers.

mod propagator;

pub use propagator::GpuPropagator;

use crate::compute::SimulationError;
use crate::schema::ConfigError;

/// Error type for GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("Readback channel closed before the buffer was mapped")]
    ReadbackChannelClosed,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
