//! WebAssembly bindings for the particle simulation.
//!
//! Provides thin wrappers around the CPU and GPU propagators for browser
//! environments. The page's animation callback drives `tick` with its
//! timestamp and draws from `positions`.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{
    compute::{
        CpuPropagator, FrameClock, SimulationState, SimulationStats, Vec2, gpu::GpuPropagator,
    },
    schema::{Seed, SimulationConfig},
};

/// Initialize WASM module with panic hook and logging.
#[wasm_bindgen(start)]
pub fn init() {
    // Set panic hook for better error messages in browser
    console_error_panic_hook::set_once();

    // Initialize WASM logger
    wasm_logger::init(wasm_logger::Config::default());
}

fn parse_inputs(config_json: &str, seed_json: &str) -> Result<(SimulationConfig, Seed), JsValue> {
    let config = SimulationConfig::from_json_str(config_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid config: {e}")))?;

    let seed: Seed = serde_json::from_str(seed_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid seed JSON: {e}")))?;

    Ok((config, seed))
}

fn seed_state(seed: &Seed, config: &SimulationConfig) -> Result<SimulationState, JsValue> {
    SimulationState::from_seed(seed, config)
        .map_err(|e| JsValue::from_str(&format!("Invalid seed: {e}")))
}

/// Flat `[x0, y0, x1, y1, ...]` copy of the current positions.
fn positions_array(state: &SimulationState) -> js_sys::Float32Array {
    js_sys::Float32Array::from(bytemuck::cast_slice::<Vec2, f32>(state.positions()))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

/// Serializable snapshot of simulation state.
#[derive(Serialize)]
struct StateSnapshot<'a> {
    positions: &'a [Vec2],
    velocities: &'a [Vec2],
    time: f32,
    frame: u64,
}

impl<'a> From<&'a SimulationState> for StateSnapshot<'a> {
    fn from(state: &'a SimulationState) -> Self {
        Self {
            positions: state.positions(),
            velocities: state.velocities(),
            time: state.time,
            frame: state.frame,
        }
    }
}

/// WebAssembly wrapper for the CPU propagator.
#[wasm_bindgen]
pub struct WasmSimulation {
    propagator: CpuPropagator,
    state: SimulationState,
    clock: FrameClock,
}

#[wasm_bindgen]
impl WasmSimulation {
    /// Create new simulation from JSON configuration and seed.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, seed_json: &str) -> Result<WasmSimulation, JsValue> {
        let (config, seed) = parse_inputs(config_json, seed_json)?;
        let state = seed_state(&seed, &config)?;
        let clock = FrameClock::new(&config.clock);
        let propagator =
            CpuPropagator::new(config).map_err(|e| JsValue::from_str(&e.to_string()))?;

        Ok(WasmSimulation {
            propagator,
            state,
            clock,
        })
    }

    /// Advance one frame by `dt` seconds.
    #[wasm_bindgen]
    pub fn step(&mut self, dt: f32) -> Result<(), JsValue> {
        self.propagator
            .step(&mut self.state, dt)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Advance one frame using an animation-callback timestamp in milliseconds.
    #[wasm_bindgen]
    pub fn tick(&mut self, timestamp_ms: f64) -> Result<(), JsValue> {
        let dt = self.clock.tick_millis(timestamp_ms);
        self.step(dt)
    }

    /// Current positions as `[x0, y0, x1, y1, ...]`.
    #[wasm_bindgen]
    pub fn positions(&self) -> js_sys::Float32Array {
        positions_array(&self.state)
    }

    /// Get current simulation state as JSON.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        to_js(&StateSnapshot::from(&self.state))
    }

    /// Get simulation statistics as JSON.
    #[wasm_bindgen(js_name = getStats)]
    pub fn get_stats(&self) -> Result<JsValue, JsValue> {
        to_js(&SimulationStats::from_state(&self.state))
    }

    /// Reset simulation with new seed.
    #[wasm_bindgen]
    pub fn reset(&mut self, seed_json: &str) -> Result<(), JsValue> {
        let seed: Seed = serde_json::from_str(seed_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid seed JSON: {e}")))?;

        self.state = seed_state(&seed, self.propagator.config())?;
        self.clock.reset();
        Ok(())
    }

    /// Particle radius, for drawing.
    #[wasm_bindgen(getter)]
    pub fn radius(&self) -> f32 {
        self.propagator.config().radius
    }

    #[wasm_bindgen(js_name = particleCount)]
    pub fn particle_count(&self) -> usize {
        self.state.particle_count()
    }

    #[wasm_bindgen(js_name = getTime)]
    pub fn get_time(&self) -> f32 {
        self.state.time
    }

    #[wasm_bindgen(js_name = getFrame)]
    pub fn get_frame(&self) -> u64 {
        self.state.frame
    }
}

// ============================================================================
// GPU Propagator (WebGPU)
// ============================================================================

/// WebAssembly wrapper for the GPU propagator.
#[wasm_bindgen]
pub struct WasmGpuSimulation {
    propagator: GpuPropagator,
    state: SimulationState,
    clock: FrameClock,
}

#[wasm_bindgen]
impl WasmGpuSimulation {
    /// Create new GPU simulation from JSON configuration and seed.
    ///
    /// This is async because GPU initialization requires async adapter/device requests.
    #[wasm_bindgen(constructor)]
    pub async fn new(config_json: &str, seed_json: &str) -> Result<WasmGpuSimulation, JsValue> {
        let (config, seed) = parse_inputs(config_json, seed_json)?;
        let state = seed_state(&seed, &config)?;
        let clock = FrameClock::new(&config.clock);

        let propagator = GpuPropagator::new(config)
            .await
            .map_err(|e| JsValue::from_str(&format!("GPU initialization failed: {e}")))?;

        Ok(WasmGpuSimulation {
            propagator,
            state,
            clock,
        })
    }

    /// Advance one frame by `dt` seconds (async to allow GPU readback).
    #[wasm_bindgen]
    pub async fn step(&mut self, dt: f32) -> Result<(), JsValue> {
        self.propagator
            .step(&mut self.state, dt)
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Advance one frame using an animation-callback timestamp in milliseconds.
    #[wasm_bindgen]
    pub async fn tick(&mut self, timestamp_ms: f64) -> Result<(), JsValue> {
        let dt = self.clock.tick_millis(timestamp_ms);
        self.step(dt).await
    }

    /// Current positions as `[x0, y0, x1, y1, ...]`.
    #[wasm_bindgen]
    pub fn positions(&self) -> js_sys::Float32Array {
        positions_array(&self.state)
    }

    /// Get current simulation state as JSON.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        to_js(&StateSnapshot::from(&self.state))
    }

    /// Get simulation statistics as JSON.
    #[wasm_bindgen(js_name = getStats)]
    pub fn get_stats(&self) -> Result<JsValue, JsValue> {
        to_js(&SimulationStats::from_state(&self.state))
    }

    /// Reset simulation with new seed.
    #[wasm_bindgen]
    pub fn reset(&mut self, seed_json: &str) -> Result<(), JsValue> {
        let seed: Seed = serde_json::from_str(seed_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid seed JSON: {e}")))?;

        self.state = seed_state(&seed, self.propagator.config())?;
        self.clock.reset();
        Ok(())
    }

    /// Particle radius, for drawing.
    #[wasm_bindgen(getter)]
    pub fn radius(&self) -> f32 {
        self.propagator.config().radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    const CONFIG: &str = r#"{"particle_count": 2, "radius": 0.1, "dt": 0.0}"#;
    const SEED: &str = r#"{"pattern": {"type": "Custom", "particles": [
        {"position": [0.2, 0.5], "velocity": [0.0, 0.0]},
        {"position": [0.8, 0.5], "velocity": [0.0, 0.0]}
    ]}}"#;

    #[wasm_bindgen_test]
    fn test_cpu_simulation_steps() {
        let mut sim = WasmSimulation::new(CONFIG, SEED).unwrap();
        sim.step(0.0).unwrap();

        assert_eq!(sim.particle_count(), 2);
        assert_eq!(sim.get_frame(), 1);
        assert_eq!(sim.positions().to_vec(), vec![0.2, 0.5, 0.8, 0.5]);
    }

    #[wasm_bindgen_test]
    fn test_first_tick_is_zero_dt() {
        let mut sim = WasmSimulation::new(CONFIG, SEED).unwrap();
        sim.tick(1000.0).unwrap();

        assert_eq!(sim.get_time(), 0.0);
        assert_eq!(sim.get_frame(), 1);
    }

    #[wasm_bindgen_test]
    fn test_invalid_config_rejected() {
        let config = r#"{"particle_count": 0, "radius": 0.1, "dt": 0.01}"#;
        assert!(WasmSimulation::new(config, SEED).is_err());
    }
}
