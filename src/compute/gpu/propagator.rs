//! GPU Propagator - GPU-accelerated particle simulation.
//!
//! Each quantity owns two storage buffers. A pass binds the front buffers
//! read-only and the back buffer of its target read-write; swapping is a
//! flip of the front index. All passes of a frame go into one command
//! encoder, so wgpu orders them and inserts the barriers between them.

use log::{info, trace};

use super::GpuError;
use crate::compute::{FramePhase, Quantity, SimulationState, Vec2, validate_frame};
use crate::schema::SimulationConfig;

// Embed shader sources at compile time
const COLLISION_SHADER: &str = include_str!("shaders/collision.wgsl");
const BOUNDARY_SHADER: &str = include_str!("shaders/boundary.wgsl");
const INTEGRATE_SHADER: &str = include_str!("shaders/integrate.wgsl");

const WORKGROUP_SIZE: u32 = 64;

/// Uniform buffer struct shared by all pass shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct PassParams {
    particle_count: u32,
    radius: f32,
    impulse_scale: f32,
    min_distance: f32,
    dt: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

const _: () = assert!(
    std::mem::size_of::<PassParams>() == 32,
    "size of PassParams does not match WGSL"
);

/// GPU-based particle propagator using WebGPU compute shaders.
pub struct GpuPropagator {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: SimulationConfig,

    // Compute pipelines
    collision_pipeline: wgpu::ComputePipeline,
    boundary_pipeline: wgpu::ComputePipeline,
    integrate_pipeline: wgpu::ComputePipeline,

    // Shared by all three pipelines: params, position in, velocity in, output.
    bind_group_layout: wgpu::BindGroupLayout,

    // GPU buffers
    params_buffer: wgpu::Buffer,
    position_buffers: [wgpu::Buffer; 2],
    velocity_buffers: [wgpu::Buffer; 2],
    staging_buffer: wgpu::Buffer,

    // Front indices into the buffer pairs
    position_front: usize,
    velocity_front: usize,

    phase: FramePhase,
}

impl GpuPropagator {
    /// Create a new GPU propagator.
    pub async fn new(config: SimulationConfig) -> Result<Self, GpuError> {
        config.validate()?;

        // 1. Create wgpu instance
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // 2. Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!(
            "GPU propagator: {} particles on {} ({:?})",
            config.particle_count, adapter_info.name, adapter_info.backend
        );

        // 3. Request device and queue
        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Particle GPU"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await?;

        // 4. Create bind group layout and pipelines
        let bind_group_layout = create_pass_bind_group_layout(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Pass Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            ..Default::default()
        });

        let collision_pipeline =
            create_pass_pipeline(&device, &pipeline_layout, "Collision", COLLISION_SHADER);
        let boundary_pipeline =
            create_pass_pipeline(&device, &pipeline_layout, "Boundary", BOUNDARY_SHADER);
        let integrate_pipeline =
            create_pass_pipeline(&device, &pipeline_layout, "Integrate", INTEGRATE_SHADER);

        // 5. Create GPU buffers
        let quantity_size = (config.particle_count * std::mem::size_of::<Vec2>()) as u64;

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pass Params"),
            size: std::mem::size_of::<PassParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let position_buffers = [
            create_state_buffer(&device, "Position Buffer A", quantity_size),
            create_state_buffer(&device, "Position Buffer B", quantity_size),
        ];
        let velocity_buffers = [
            create_state_buffer(&device, "Velocity Buffer A", quantity_size),
            create_state_buffer(&device, "Velocity Buffer B", quantity_size),
        ];
        // Positions followed by velocities.
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: 2 * quantity_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            config,
            collision_pipeline,
            boundary_pipeline,
            integrate_pipeline,
            bind_group_layout,
            params_buffer,
            position_buffers,
            velocity_buffers,
            staging_buffer,
            position_front: 0,
            velocity_front: 0,
            phase: FramePhase::Idle,
        })
    }

    /// Copy the front buffers of `state` into the GPU front buffers.
    pub fn upload(&mut self, state: &SimulationState) {
        self.position_front = 0;
        self.velocity_front = 0;
        self.queue.write_buffer(
            &self.position_buffers[0],
            0,
            bytemuck::cast_slice(state.positions()),
        );
        self.queue.write_buffer(
            &self.velocity_buffers[0],
            0,
            bytemuck::cast_slice(state.velocities()),
        );
    }

    /// Perform one frame, reading the result back into `state`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn step(&mut self, state: &mut SimulationState, dt: f32) -> Result<(), GpuError> {
        self.submit_frame(state, dt)?;
        self.read_state_back(state)?;
        self.present(state, dt);
        Ok(())
    }

    /// Perform one frame, awaiting the readback into `state`.
    ///
    /// `state` is left untouched unless the whole frame succeeds.
    #[cfg(target_arch = "wasm32")]
    pub async fn step(&mut self, state: &mut SimulationState, dt: f32) -> Result<(), GpuError> {
        self.submit_frame(state, dt)?;
        self.read_state_async(state).await?;
        self.present(state, dt);
        Ok(())
    }

    /// Upload `state`, encode the pass pipeline and submit it.
    fn submit_frame(&mut self, state: &SimulationState, dt: f32) -> Result<(), GpuError> {
        validate_frame(&self.config, state, dt)?;

        // Upload current state to GPU
        self.upload(state);

        let params = PassParams {
            particle_count: self.config.particle_count as u32,
            radius: self.config.radius,
            impulse_scale: self.config.collision.impulse_scale,
            min_distance: self.config.collision.min_distance,
            dt,
            _pad0: 0.0,
            _pad1: 0.0,
            _pad2: 0.0,
        };
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let workgroups = (self.config.particle_count as u32).div_ceil(WORKGROUP_SIZE);

        for phase in FramePhase::PIPELINE {
            self.phase = phase;
            trace!("frame {}: {:?}", state.frame, phase);

            let p = self.position_front;
            let v = self.velocity_front;
            let (pipeline, output) = match phase {
                FramePhase::CollisionPass => {
                    (&self.collision_pipeline, &self.velocity_buffers[1 - v])
                }
                FramePhase::BoundaryPass => (&self.boundary_pipeline, &self.velocity_buffers[1 - v]),
                FramePhase::IntegratePass => {
                    (&self.integrate_pipeline, &self.position_buffers[1 - p])
                }
                FramePhase::Idle | FramePhase::Presented => continue,
            };

            // Accumulation target starts from zero.
            if phase == FramePhase::CollisionPass {
                encoder.clear_buffer(output, 0, None);
            }

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Pass Bind Group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: self.position_buffers[p].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.velocity_buffers[v].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: output.as_entire_binding(),
                    },
                ],
            });

            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Particle Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(workgroups, 1, 1);
            }

            // Swap
            match phase.target() {
                Some(Quantity::Position) => self.position_front = 1 - p,
                Some(Quantity::Velocity) => self.velocity_front = 1 - v,
                None => {}
            }
        }

        // Copy fronts to staging buffer
        let quantity_size = (self.config.particle_count * std::mem::size_of::<Vec2>()) as u64;
        encoder.copy_buffer_to_buffer(
            &self.position_buffers[self.position_front],
            0,
            &self.staging_buffer,
            0,
            quantity_size,
        );
        encoder.copy_buffer_to_buffer(
            &self.velocity_buffers[self.velocity_front],
            0,
            &self.staging_buffer,
            quantity_size,
            quantity_size,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn present(&mut self, state: &mut SimulationState, dt: f32) {
        self.phase = FramePhase::Presented;
        state.time += dt;
        state.frame += 1;
    }

    /// Run `frames` frames with the configured fixed `dt`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn run(&mut self, state: &mut SimulationState, frames: u64) -> Result<(), GpuError> {
        let dt = self.config.dt;
        for _ in 0..frames {
            self.step(state, dt)?;
        }
        Ok(())
    }

    /// Current pipeline stage.
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Get configuration reference.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Synchronous readback for native targets.
    #[cfg(not(target_arch = "wasm32"))]
    fn read_state_back(&self, state: &mut SimulationState) -> Result<(), GpuError> {
        let buffer_slice = self.staging_buffer.slice(..);

        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device.poll(wgpu::PollType::wait_indefinitely()).ok();
        rx.recv().map_err(|_| GpuError::ReadbackChannelClosed)??;

        {
            let data = buffer_slice.get_mapped_range();
            copy_readback(bytemuck::cast_slice(&data), state);
        }

        self.staging_buffer.unmap();
        Ok(())
    }

    /// Async readback for WASM - properly awaits buffer mapping.
    #[cfg(target_arch = "wasm32")]
    async fn read_state_async(&self, state: &mut SimulationState) -> Result<(), GpuError> {
        let buffer_slice = self.staging_buffer.slice(..);

        let (sender, receiver) = futures_channel::oneshot::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        // The browser polls WebGPU on its own
        receiver
            .await
            .map_err(|_| GpuError::ReadbackChannelClosed)??;

        {
            let data = buffer_slice.get_mapped_range();
            copy_readback(bytemuck::cast_slice(&data), state);
        }

        self.staging_buffer.unmap();
        Ok(())
    }
}

/// Split a staging readback into the state's front position and velocity buffers.
fn copy_readback(result: &[Vec2], state: &mut SimulationState) {
    let n = state.particle_count();
    let (positions, velocities) = result.split_at(n);
    state.store.position.front_mut().copy_from_slice(positions);
    state.store.velocity.front_mut().copy_from_slice(velocities);
}

fn create_state_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    })
}

fn create_pass_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    name: &str,
    source: &str,
) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{name} Shader")),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{name} Pipeline")),
        layout: Some(layout),
        module: &module,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_pass_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Pass Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            storage_entry(1, true),
            storage_entry(2, true),
            storage_entry(3, false),
        ],
    })
}
