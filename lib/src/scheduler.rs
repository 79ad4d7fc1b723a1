//! Tick orchestration and the dynamic-challenge schedule.

use crate::action::{self, ActionOutcome};
use crate::diagnostics::DiagnosticLog;
use crate::food::grow_food;
use crate::gene::GeneArena;
use crate::history::{History, TickStats};
use crate::params::Params;
use crate::rng::Lcg;
use crate::world::World;
use serde::{Deserialize, Serialize};

/// Latched one-shot flags for the population-triggered schedule stages.
/// Read as a level condition ("when pop > 1000") the "stage" numbering
/// and the later seasonal drift rules (which expect `foodhump` to
/// evolve instead of being pinned) only make sense if each stage fires
/// once, the first time its population threshold is crossed; see
/// DESIGN.md.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScheduleState {
    stage1_fired: bool,
    stage2_fired: bool,
    stage3_fired: bool,
}

fn apply_schedule(world: &World, params: &mut Params, state: &mut ScheduleState) {
    let pop = world.len() as i64;
    let today = world.today;
    let season = params.season;

    if !state.stage1_fired && pop > 1000 {
        params.foodhump = 10.0;
        state.stage1_fired = true;
    }
    if !state.stage2_fired && pop > 10000 {
        params.safety = false;
        state.stage2_fired = true;
    }
    if !state.stage3_fired && pop > 15000 {
        params.leak = 0;
        state.stage3_fired = true;
    }

    match today {
        3000 => params.forcemate = 0x10,
        4000 => params.forcemate = 0x30,
        5000 => params.forcemate = 0x70,
        6000 => params.forcemate = 0x71,
        7000 => params.forcemate = 0x73,
        8000 => params.forcemate = 0x77,
        9000 => params.forcemate = 0x7F,
        10000 => params.costmate = 24,
        11000 => params.costmate = 48,
        12000 => params.costmate = 96,
        13000 => params.costmate = 144,
        _ => {}
    }

    if today > season && today % 32 == 0 {
        if params.agediv < 30 {
            params.foodhump *= 1.001;
        } else if params.agediv > 300 {
            params.foodhump /= 1.001;
        }
    }

    if today > 0 && today % season == 0 {
        let year = today / season;
        params.forcemate = if year % 2 == 0 { 0x70 } else { 0x7F };
    }

    if today > season && pop < 1000 {
        params.forcemate = 0x70;
    }
}

fn age_of_oldest(world: &World) -> i64 {
    match world.head() {
        Some(id) => world.today - world.get(id).birthday,
        None => 0,
    }
}

/// Re-evaluates the minimum-divide-age regulator.
fn update_agediv(world: &World, params: &mut Params) {
    let pop = world.len() as i64;
    let oldest = age_of_oldest(world);

    if pop > 2 * params.target_pop {
        params.agediv += 1;
    }
    if world.today % 8 == 0 {
        params.agediv += 1;
    }
    if pop < params.target_pop || params.agediv > oldest {
        params.agediv -= 1;
    }
    if pop > params.pop_hardlimit {
        params.agediv = oldest;
    }
    params.agediv = params.agediv.max(0);
}

/// Walks the bug list head to tail, applying [`action::act`] to each bug
/// still alive. Caches the next-bug cursor fresh every step, so a
/// newborn appended after the current cursor is visited later in the
/// same tick, and `kill_bug` can rewrite the cursor if the cached next
/// bug dies as someone else's collision partner.
fn move_bugs(
    world: &mut World,
    arena: &mut GeneArena,
    rng: &mut Lcg,
    diagnostics: &mut DiagnosticLog,
    params: &Params,
) -> TickStats {
    let mut stats = TickStats::default();
    let mut cursor = world.head();

    while let Some(id) = cursor {
        let mut next = world.next_of(id);
        let outcome: ActionOutcome = action::act(world, arena, rng, diagnostics, params, &mut next, id);
        if outcome.moved {
            stats.movement += 1;
        }
        if outcome.collision {
            stats.collisions += 1;
        }
        if outcome.starved {
            stats.starvations += 1;
        }
        stats.births += outcome.births as i64;
        cursor = next;
    }

    stats
}

/// Advances the engine by one tick: schedule, bug actions, food
/// dynamics, then the history record.
pub fn tick(
    world: &mut World,
    arena: &mut GeneArena,
    rng: &mut Lcg,
    diagnostics: &mut DiagnosticLog,
    params: &mut Params,
    schedule: &mut ScheduleState,
    history: &mut History,
) {
    world.today += 1;
    diagnostics.clear();

    apply_schedule(world, params, schedule);
    update_agediv(world, params);

    let mut stats = move_bugs(world, arena, rng, diagnostics, params);
    let totals = grow_food(world, params);

    stats.n_bugs = world.len() as i64;
    let cells = world.wx as i64 * world.wy as i64;
    stats.avgfood = if cells > 0 { totals.total_food * 1024 / cells } else { 0 };
    stats.avggenes = if stats.n_bugs > 0 {
        totals.total_genes * 1024 / stats.n_bugs
    } else {
        0
    };
    stats.avgweight = if stats.n_bugs > 0 {
        let total_weight: i64 = world
            .ids_in_order()
            .iter()
            .map(|&id| world.get(id).weight())
            .sum();
        total_weight * 1024 / stats.n_bugs
    } else {
        0
    };

    history.record(world.today, stats);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::from_chromosomes;
    use crate::bug::Bug;
    use crate::constants::NDEC;
    use crate::diagnostics::DiagnosticLog;
    use crate::ethnicity::Ethnicity;
    use crate::gene::new_const_chromosome;
    use crate::hex::Pos;

    fn mk_bug(arena: &mut GeneArena, uid: u64, pos: Pos, weight: i64) -> Bug {
        let eth = Ethnicity::genesis_red_max(uid);
        let chromosomes: [(u32, u32); NDEC] =
            std::array::from_fn(|_| (new_const_chromosome(arena, 0), new_const_chromosome(arena, 0)));
        let brain = from_chromosomes(arena, chromosomes, eth, 3, 0);
        let matebrain = crate::brain::copy_brain(arena, &brain);
        Bug::new(uid, 0, pos, 0, weight, brain, matebrain)
    }

    #[test]
    fn tick_advances_today_and_records_history() {
        let mut world = World::new(20, 20);
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(1);
        let mut diags = DiagnosticLog::with_capacity(32);
        let mut params = Params::default();
        let mut schedule = ScheduleState::default();
        let mut history = History::new();

        let bug = mk_bug(&mut arena, 1, Pos::new(5, 5), 10_000_000);
        world.spawn(bug);

        tick(
            &mut world,
            &mut arena,
            &mut rng,
            &mut diags,
            &mut params,
            &mut schedule,
            &mut history,
        );

        assert_eq!(world.today, 1);
        assert_eq!(history.get(1).n_bugs, world.len() as i64);
    }

    #[test]
    fn schedule_sets_forcemate_at_exact_tick() {
        let mut world = World::new(4, 4);
        world.today = 2999;
        let mut params = Params::default();
        let mut state = ScheduleState::default();
        world.today += 1;
        apply_schedule(&world, &mut params, &mut state);
        assert_eq!(params.forcemate, 0x10);
    }

    #[test]
    fn agediv_never_goes_negative() {
        let world = World::new(4, 4);
        let mut params = Params::default();
        for _ in 0..50 {
            update_agediv(&world, &mut params);
        }
        assert!(params.agediv >= 0);
    }
}
