//! `Engine`: the façade that owns world, gene arena, rng, params, history
//! and diagnostics, and exposes the single blocking `tick()` call, in the
//! shape of a bundled world+rng environment that `Deref`s to the world.

use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::gene::GeneArena;
use crate::history::{History, TickStats};
use crate::params::Params;
use crate::presets::genesis_default;
use crate::rng::Lcg;
use crate::scheduler::{tick as scheduler_tick, ScheduleState};
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Cap on diagnostics retained per tick; generous enough that a healthy
/// run never drops any, bounded so a pathological one can't grow this
/// without limit.
const DIAGNOSTICS_CAP: usize = 256;

/// Owns every piece of mutable engine state and exposes `tick()` as the
/// engine's sole entry point; no hidden global/singleton state. `Deref`s
/// to [`World`] for read-only access to cells and the bug list.
#[derive(Debug, Serialize, Deserialize)]
pub struct Engine {
    world: World,
    arena: GeneArena,
    rng: Lcg,
    params: Params,
    schedule: ScheduleState,
    history: History,
    #[serde(skip, default = "default_diagnostics")]
    diagnostics: DiagnosticLog,
}

fn default_diagnostics() -> DiagnosticLog {
    DiagnosticLog::with_capacity(DIAGNOSTICS_CAP)
}

impl Engine {
    /// Builds a fresh engine from `params`, genesis-seeds "bug one" at
    /// world center, and seeds the RNG from `seed`. This is the engine's
    /// sole entropy source; no other seed is ever consulted.
    pub fn new(seed: u64, params: Params) -> Self {
        let mut world = World::new(params.wx, params.wy);
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(seed);
        genesis_default(&mut world, &mut arena, &mut rng);

        Self {
            world,
            arena,
            rng,
            params,
            schedule: ScheduleState::default(),
            history: History::new(),
            diagnostics: DiagnosticLog::with_capacity(DIAGNOSTICS_CAP),
        }
    }

    /// Builds an engine with the default genesis preset and reference
    /// parameter values.
    pub fn genesis(seed: u64) -> Self {
        Self::new(seed, Params::default())
    }

    /// Advances the simulation by exactly one tick: dynamic-challenge
    /// schedule, bug actions (senses, decide, dispatch), food dynamics,
    /// then records this tick's stats. Cannot fail; `tick()` never
    /// returns a `Result`.
    pub fn tick(&mut self) {
        scheduler_tick(
            &mut self.world,
            &mut self.arena,
            &mut self.rng,
            &mut self.diagnostics,
            &mut self.params,
            &mut self.schedule,
            &mut self.history,
        );
    }

    /// Read-only view of the world: cell grid and bug list.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Mutable access to the scheduler scalars the dynamic-challenge
    /// schedule tunes, for callers that want to override a preset's
    /// defaults (e.g. tests exercising a specific schedule stage).
    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub fn today(&self) -> i64 {
        self.world.today
    }

    /// The `hist[LHIST]` ring of per-tick statistics.
    pub fn history(&self) -> &[TickStats] {
        self.history.window()
    }

    pub fn latest_stats(&self) -> &TickStats {
        self.history.get(self.world.today)
    }

    /// Diagnostics recorded during the most recently completed tick
    /// (self-repaired invariant violations); cleared at the start of
    /// every `tick()` call.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    pub fn diagnostics_dropped(&self) -> u64 {
        self.diagnostics.dropped()
    }
}

impl Deref for Engine {
    type Target = World;

    fn deref(&self) -> &Self::Target {
        &self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_engine_starts_with_one_bug() {
        let engine = Engine::genesis(54321);
        assert_eq!(engine.world().len(), 1);
        assert_eq!(engine.today(), 0);
    }

    #[test]
    fn tick_advances_today_and_deref_sees_world() {
        let mut engine = Engine::genesis(1);
        engine.tick();
        assert_eq!(engine.today(), 1);
        assert_eq!(engine.len(), engine.world().len());
    }

    #[test]
    fn lone_bug_survives_2000_ticks_and_stays_above_diethin() {
        let mut engine = Engine::genesis(54321);
        for _ in 0..2000 {
            engine.tick();
            assert!(engine.world().len() >= 1, "lone bug must not die");
        }
        let id = engine.world().head().unwrap();
        assert!(engine.world().get(id).weight() > engine.params().diethin);
    }

    #[test]
    fn determinism_same_seed_same_history() {
        let mut a = Engine::genesis(42);
        let mut b = Engine::genesis(42);
        for _ in 0..5000 {
            a.tick();
            b.tick();
        }
        for i in 0..crate::constants::LHIST as i64 {
            assert_eq!(
                a.history()[i as usize].n_bugs,
                b.history()[i as usize].n_bugs
            );
            assert_eq!(
                a.history()[i as usize].avgfood,
                b.history()[i as usize].avgfood
            );
        }
    }

    #[test]
    fn population_grows_from_genesis_by_20k_ticks() {
        let mut engine = Engine::genesis(42);
        for _ in 0..20_000 {
            engine.tick();
        }
        assert!(engine.world().len() >= 2);
    }
}
