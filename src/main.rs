//! Headless particle run: drives a system for a number of fixed-step frames
//! and reports how much data reached the sink.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ember::gpu::{GpuContext, GpuParticleSink};
use ember::prelude::*;
use ember::SyncStats;

#[derive(Parser, Debug)]
#[command(name = "ember-demo", about = "Run an ember particle system without a window")]
struct Cli {
    /// JSON system configuration. Without it a single fire emitter is used.
    config: Option<PathBuf>,

    /// Number of frames to simulate.
    #[arg(short, long, default_value_t = 300)]
    frames: u64,

    /// Simulated frames per second.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Seed for the spawn RNG (overrides the configuration).
    #[arg(long)]
    seed: Option<u64>,

    /// Upload into real GPU buffers instead of an in-memory mirror.
    #[arg(long)]
    gpu: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let mut config = match &cli.config {
        Some(path) => SystemConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SystemConfig::from_json(FIRE_JSON)?,
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let mut system = ParticleSystem::from_config(&config)?;
    system.attach_shading(ShadingState::new(ShadingHandles {
        shader: ResourceHandle(1),
        noise_texture: ResourceHandle(2),
        sprite_texture: ResourceHandle(3),
    }));

    let totals = if cli.gpu {
        let context = GpuContext::headless_blocking().context("acquiring GPU device")?;
        let mut sink = GpuParticleSink::new(context);
        let totals = run(&mut system, &mut sink, &cli)?;
        report_poll(sink.context().device.poll(wgpu::Maintain::Wait));
        totals
    } else {
        run(&mut system, &mut RecordingSink::new(), &cli)?
    };

    let full: usize = system
        .emitters()
        .map(|(_, e)| e.capacity() * Channel::ALL.iter().map(|c| c.stride()).sum::<usize>())
        .sum();
    log::info!(
        "{} frames: {} particles spawned, {} uploads, {} floats sent ({:.1}% of full re-uploads)",
        cli.frames,
        totals.spawned,
        totals.sync.uploads,
        totals.sync.floats,
        100.0 * totals.sync.floats as f64 / (full as f64 * cli.frames.max(1) as f64)
    );
    Ok(())
}

/// Warn when submissions are still in flight after the final wait.
fn report_poll(result: wgpu::MaintainResult) -> bool {
    let drained = result.is_queue_empty();
    if !drained {
        log::warn!("GPU queue still busy after final poll; last uploads may not have landed");
    }
    drained
}

#[derive(Default)]
struct Totals {
    spawned: usize,
    sync: SyncStats,
}

fn run<S: ParticleSink>(system: &mut ParticleSystem, sink: &mut S, cli: &Cli) -> Result<Totals> {
    let mut time = Time::new();
    let mut totals = Totals::default();
    let step = 1.0 / cli.fps.max(1.0);
    let report_every = (cli.fps.round() as u64).max(1);

    for frame in 1..=cli.frames {
        let ctx = time.advance(step);
        let stats = system.update(&ctx)?;
        let sync = system.sync(sink);

        totals.spawned += stats.spawned;
        totals.sync.rebuilt_channels += sync.rebuilt_channels;
        totals.sync.uploads += sync.uploads;
        totals.sync.floats += sync.floats;

        if frame % report_every == 0 {
            log::info!(
                "t={:.2}s frame {}: spawned {}, throttled {}, uploaded {} floats",
                ctx.cumulative_time,
                frame,
                stats.spawned,
                stats.throttled,
                sync.floats
            );
        }
    }
    Ok(totals)
}

const FIRE_JSON: &str = r##"{
    "emitters": [
        {
            "name": "fire",
            "capacity": 20000,
            "spawn_rate": 2000,
            "position": { "path": "lissajous", "horizontal_speed": 1.5, "vertical_speed": 1.33, "amplitude": [20, 10, 5] },
            "lifetime": { "value": 1.2, "distribution": 0.4 },
            "initial_velocity": { "value": [0, 0.1, 0], "distribution": 0.05 },
            "color": { "value": "#ffb347", "end": "#400000" },
            "size": { "value": 0.3, "end": 0.05 }
        }
    ]
}"##;
