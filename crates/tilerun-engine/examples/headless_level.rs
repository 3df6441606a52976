//! Run a level without a renderer and report what happened.
//!
//! Run with:
//!   cargo run --example headless_level -p tilerun-engine [-- path/to/level.json]
//!
//! Set `RUST_LOG=tilerun_engine=debug` to watch state transitions.

use std::path::PathBuf;

use anyhow::{bail, Context as _};
use tilerun_engine::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Ticks before giving up on a round.
const MAX_TICKS: u64 = 60 * 60;

/// Hold right, hopping every second.
fn scripted_input(tick: u64) -> PlayerInput {
    PlayerInput {
        right: true,
        jump: tick % 60 == 0,
        ..Default::default()
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/levels/level1.json")));
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("reading level {}", path.display()))?;
    let level = LevelDescriptor::from_json(&json).context("parsing level")?;

    let recorder = EventRecorder::new();
    let world = WorldBuilder::new(Services::recording(&recorder))
        .build(&level)
        .context("building world")?;
    let mut sim = Simulation::new(world, TickConfig::default());

    while sim.tick_count() < MAX_TICKS && !sim.is_round_over() {
        sim.set_input(scripted_input(sim.tick_count()));
        let report = sim.tick();
        if report.dispatch.errors > 0 {
            bail!("tick {}: {} unclassified contacts", report.tick, report.dispatch.errors);
        }
        for id in &report.removed {
            info!(tick = report.tick, ?id, "entity removed");
        }
    }

    let player = sim.world().player().context("player missing")?;
    info!(
        ticks = sim.tick_count(),
        seconds = sim.sim_time(),
        x = player.position().x,
        grown = player.is_grown(),
        dead = player.is_dead(),
        "round finished"
    );

    println!("score: {}", recorder.score());
    println!("entities left: {}", sim.world().entity_count());
    for event in [
        SoundEvent::Stomp,
        SoundEvent::Kick,
        SoundEvent::Coin,
        SoundEvent::BreakBlock,
        SoundEvent::Bump,
        SoundEvent::PowerUpAppear,
        SoundEvent::PowerUpConsumed,
        SoundEvent::Shrink,
        SoundEvent::Death,
    ] {
        let n = recorder.count(event);
        if n > 0 {
            println!("{event:?}: {n}");
        }
    }
    Ok(())
}
