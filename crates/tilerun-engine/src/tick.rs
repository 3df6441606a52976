//! Fixed-timestep simulation driver.
//!
//! The [`Simulation`] advances a [`GameWorld`] one fixed tick at a time. Each
//! tick:
//!
//! 1. The latest [`PlayerInput`] is applied as impulses.
//! 2. Physics steps; contact reactions run inside the step and may only change
//!    state.
//! 3. The structural pass rebuilds and destroys bodies, removes finished
//!    entities and materialises at most one queued item.
//! 4. Every entity runs its logical update.
//! 5. Sleeping enemies near the player wake up.
//!
//! Simulation time is `tick_count * fixed_dt` rather than an accumulated sum.
//! [`Simulation::advance`] adapts a variable frame delta to fixed ticks.
//!
//! # Example
//!
//! ```
//! use tilerun_engine::prelude::*;
//!
//! let mut level = LevelDescriptor::empty();
//! level.push("ground", MapObject::rect(0.0, 0.0, 640.0, 16.0));
//! let world = WorldBuilder::new(Services::silent()).build(&level).unwrap();
//!
//! let mut sim = Simulation::new(world, TickConfig::default());
//! sim.run_ticks(30);
//! assert_eq!(sim.tick_count(), 30);
//! assert!(!sim.is_round_over());
//! ```

use serde::{Deserialize, Serialize};
use tilerun_arena::handle::EntityId;
use tracing::{debug, trace};

use crate::dispatch::DispatchSummary;
use crate::entity::PlayerInput;
use crate::view::EntityView;
use crate::world::GameWorld;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    /// Enemies closer than this (metres, to the player's right) wake up.
    pub activation_range: f32,
    /// Upper bound on ticks run by one [`Simulation::advance`] call.
    pub max_ticks_per_advance: u32,
}

impl Default for TickConfig {
    /// 60 Hz, 6 velocity and 2 position iterations.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            velocity_iterations: 6,
            position_iterations: 2,
            activation_range: 2.24,
            max_ticks_per_advance: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Begun contacts delivered by the step.
    pub contacts: usize,
    pub dispatch: DispatchSummary,
    pub removed: Vec<EntityId>,
    pub spawned: Option<EntityId>,
    pub woken: usize,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub struct Simulation {
    world: GameWorld,
    config: TickConfig,
    input: PlayerInput,
    tick_counter: u64,
    accumulator: f64,
}

impl Simulation {
    /// Wrap a built world.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(mut world: GameWorld, config: TickConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        world
            .physics_mut()
            .set_solver_iterations(config.velocity_iterations, config.position_iterations);
        Self {
            world,
            config,
            input: PlayerInput::default(),
            tick_counter: 0,
            accumulator: 0.0,
        }
    }

    /// Input applied at the start of every following tick until changed.
    pub fn set_input(&mut self, input: PlayerInput) {
        self.input = input;
    }

    pub fn input(&self) -> PlayerInput {
        self.input
    }

    /// Run one fixed tick.
    pub fn tick(&mut self) -> TickReport {
        let dt = self.config.fixed_dt as f32;
        self.tick_counter += 1;

        self.world.apply_input(self.input);
        let (contacts, dispatch) = self.world.step(dt);
        let structural = self.world.structural_pass();
        self.world.update(dt);
        let woken = self.world.wake_enemies(self.config.activation_range);

        let report = TickReport {
            tick: self.tick_counter,
            contacts,
            dispatch,
            removed: structural.removed,
            spawned: structural.spawned,
            woken,
        };
        trace!(?report, "tick");
        report
    }

    /// Run `n` ticks.
    pub fn run_ticks(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Feed a variable frame delta; runs as many whole ticks as fit, up to
    /// [`TickConfig::max_ticks_per_advance`]. Returns the ticks run.
    pub fn advance(&mut self, frame_dt: f64) -> u32 {
        if !(frame_dt.is_finite() && frame_dt > 0.0) {
            return 0;
        }
        self.accumulator += frame_dt;
        let mut ran = 0;
        while self.accumulator >= self.config.fixed_dt && ran < self.config.max_ticks_per_advance {
            self.tick();
            self.accumulator -= self.config.fixed_dt;
            ran += 1;
        }
        if ran == self.config.max_ticks_per_advance && self.accumulator >= self.config.fixed_dt {
            debug!(dropped = self.accumulator, "frame too long; dropping backlog");
            self.accumulator = 0.0;
        }
        ran
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulated seconds since start.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.config.fixed_dt
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn world(&self) -> &GameWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut GameWorld {
        &mut self.world
    }

    pub fn is_round_over(&self) -> bool {
        self.world.is_round_over()
    }

    pub fn views(&self) -> Vec<EntityView> {
        self.world.views()
    }
}
