//! Particle simulation CLI - Run simulations from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use particle_pingpong::{
    compute::{CpuPropagator, SimulationState, SimulationStats, gpu::GpuPropagator},
    schema::{Seed, SimulationConfig},
};

/// Either backend behind one `step` call.
enum Backend {
    Cpu(CpuPropagator),
    Gpu(Box<GpuPropagator>),
}

impl Backend {
    fn step(&mut self, state: &mut SimulationState, dt: f32) -> Result<(), String> {
        match self {
            Backend::Cpu(p) => p.step(state, dt).map_err(|e| e.to_string()),
            Backend::Gpu(p) => p.step(state, dt).map_err(|e| e.to_string()),
        }
    }
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [frames] [--gpu]", args[0]);
        eprintln!();
        eprintln!("Run a particle simulation from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to simulation configuration file");
        eprintln!("  frames       Number of frames to simulate (default: 100)");
        eprintln!("  --gpu        Use the wgpu compute backend");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let use_gpu = args.iter().any(|a| a == "--gpu");
    let config_path = PathBuf::from(&args[1]);
    let frames: u64 = args
        .get(2)
        .filter(|s| !s.starts_with("--"))
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);

    // Load configuration
    let config = SimulationConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    // Load or create seed
    let seed_path = config_path.with_extension("seed.json");
    let seed: Seed = if seed_path.exists() {
        let seed_str = fs::read_to_string(&seed_path).unwrap_or_else(|e| {
            eprintln!("Error reading seed file: {}", e);
            std::process::exit(1);
        });
        serde_json::from_str(&seed_str).unwrap_or_else(|e| {
            eprintln!("Error parsing seed: {}", e);
            std::process::exit(1);
        })
    } else {
        Seed::default()
    };

    println!("Particle Simulation");
    println!("===================");
    println!("Particles: {}", config.particle_count);
    println!("Radius: {}", config.radius);
    println!("dt: {}", config.dt);
    println!("Frames: {}", frames);
    println!("Backend: {}", if use_gpu { "GPU" } else { "CPU" });
    println!();

    // Initialize
    let mut state = SimulationState::from_seed(&seed, &config).unwrap_or_else(|e| {
        eprintln!("Error seeding state: {}", e);
        std::process::exit(1);
    });
    let initial_stats = SimulationStats::from_state(&state);
    print_stats("Initial state", &initial_stats);

    // Create propagator
    let dt = config.dt;
    let mut backend = if use_gpu {
        match pollster::block_on(GpuPropagator::new(config)) {
            Ok(p) => Backend::Gpu(Box::new(p)),
            Err(e) => {
                eprintln!("Error creating GPU propagator: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match CpuPropagator::new(config) {
            Ok(p) => Backend::Cpu(p),
            Err(e) => {
                eprintln!("Error creating propagator: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Run simulation
    println!("Running simulation...");
    let start = Instant::now();

    for i in 0..frames {
        if let Err(e) = backend.step(&mut state, dt) {
            eprintln!("Simulation aborted at frame {}: {}", i, e);
            std::process::exit(1);
        }

        // Print progress every 10%
        if (i + 1) % (frames / 10).max(1) == 0 {
            let stats = SimulationStats::from_state(&state);
            let elapsed = start.elapsed().as_secs_f32();
            let frames_per_sec = (i + 1) as f32 / elapsed;
            println!(
                "  Frame {}/{}: energy={:.6}, out of bounds={}, {:.1} frames/s",
                i + 1,
                frames,
                stats.kinetic_energy,
                stats.out_of_bounds,
                frames_per_sec
            );
        }
    }

    let elapsed = start.elapsed();
    let final_stats = SimulationStats::from_state(&state);

    println!();
    print_stats("Final state", &final_stats);
    println!(
        "Time: {:.2}s ({:.1} frames/s)",
        elapsed.as_secs_f32(),
        frames as f32 / elapsed.as_secs_f32()
    );
}

fn print_stats(title: &str, stats: &SimulationStats) {
    println!("{}:", title);
    println!("  Kinetic energy: {:.6}", stats.kinetic_energy);
    println!(
        "  Momentum: ({:.6}, {:.6})",
        stats.momentum.x, stats.momentum.y
    );
    println!(
        "  Speed: mean {:.6}, max {:.6}",
        stats.mean_speed, stats.max_speed
    );
    println!("  Out of bounds: {}", stats.out_of_bounds);
    println!();
}

fn print_example_config() {
    let config = SimulationConfig::default();
    let seed = Seed::default();

    match (
        serde_json::to_string_pretty(&config),
        serde_json::to_string_pretty(&seed),
    ) {
        (Ok(config_json), Ok(seed_json)) => {
            println!("Example configuration (config.json):");
            println!("{}", config_json);
            println!();
            println!("Example seed (config.seed.json):");
            println!("{}", seed_json);
        }
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        }
    }
}
