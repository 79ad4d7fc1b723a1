//! Per-bug action execution: cost accounting, movement/combat, mating and
//! division.

use crate::brain::{
    build_family, copy_brain, dispose_brain, Brain, DecisionGenes, DIVIDE, EAT, MATE, MOVE, SLEEP,
    TURN_CCW, TURN_CW,
};
use crate::bug::{ActLog, Bug};
use crate::constants::NDEC;
use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::ethnicity::{assimilate, Ethnicity};
use crate::gene::{clone_chain, GeneArena};
use crate::hex::{normalize_face, step};
use crate::params::Params;
use crate::rng::Lcg;
use crate::sense::gather_senses;
use crate::world::{BugId, World};

const FM_MATE_REQUIRED: u8 = 0x01;
const FM_MARK_SELF_CLONE: u8 = 0x02;
const FM_MATE_PENALTY_SUBTRACT: u8 = 0x04;
const FM_MATE_PENALTY_DIVIDE: u8 = 0x08;
const FM_AGE_GATE: u8 = 0x10;
const FM_AGE_PENALTY_SUBTRACT: u8 = 0x20;
const FM_AGE_PENALTY_DIVIDE: u8 = 0x40;

/// Divide's child-placement direction offsets, relative to the parent's
/// facing, for children `1..divide-1`.
const DIVIDE_DELTA: [i32; 6] = [3, -2, 2, -1, 1, 0];

/// What happened this tick for one bug, for the scheduler's stats feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionOutcome {
    pub moved: bool,
    pub collision: bool,
    pub starved: bool,
    pub births: u32,
}

fn pay(bug: &mut Bug, base_cost: i64, nom: i64) {
    let cost = base_cost * bug.weight().max(1) / nom;
    bug.set_weight((bug.weight() - cost).max(0));
}

/// Upkeep cost for carrying genes past `geneknee`, charged once per tick
/// regardless of the chosen action.
fn gene_upkeep_cost(ngenes: usize, params: &Params) -> i64 {
    let excess = (ngenes as i64 - params.geneknee).max(0);
    excess * params.nom / params.genecost
}

/// Runs one bug's full per-tick step: history shift, sensing, decision,
/// dispatch, gene upkeep, and the post-dispatch starvation check.
/// `cursor` is the scheduler's cached next-bug pointer, rewritten
/// by `World::kill_bug` if this bug or its collision partner dies.
pub fn act(
    world: &mut World,
    arena: &mut GeneArena,
    rng: &mut Lcg,
    diagnostics: &mut DiagnosticLog,
    params: &Params,
    cursor: &mut Option<BugId>,
    id: BugId,
) -> ActionOutcome {
    world.get_mut(id).shift_history();
    let senses = gather_senses(world, id);
    let act_idx = {
        let brain = &world.get(id).brain;
        brain.decide(arena, &senses, rng, diagnostics)
    };
    world.get_mut(id).pos[0].act = act_idx;

    let mut outcome = ActionOutcome::default();
    let mut still_alive = true;

    match act_idx {
        SLEEP => pay(world.get_mut(id), params.sleep_cost, params.nom),
        EAT => do_eat(world, id, params),
        TURN_CW => {
            let f = world.get(id).face();
            world.get_mut(id).pos[0].face = crate::hex::turn_cw(f);
            pay(world.get_mut(id), params.turn_cost, params.nom);
        }
        TURN_CCW => {
            let f = world.get(id).face();
            world.get_mut(id).pos[0].face = crate::hex::turn_ccw(f);
            pay(world.get_mut(id), params.turn_cost, params.nom);
        }
        MOVE => still_alive = do_move(world, arena, rng, params, cursor, id, &mut outcome),
        MATE => do_mate(world, arena, rng, diagnostics, params, id),
        DIVIDE => outcome.births = do_divide(world, arena, rng, params, id),
        _ => unreachable!("Brain::decide never returns outside 0..=DIVIDE"),
    }

    if still_alive {
        let upkeep = gene_upkeep_cost(world.get(id).brain.ngenes, params);
        if upkeep > 0 {
            let w = (world.get(id).weight() - upkeep).max(0);
            world.get_mut(id).set_weight(w);
        }
        if world.get(id).weight() <= 0 {
            diagnostics.push(Diagnostic::WeightClampedToOne { bug: world.get(id).uid });
            world.get_mut(id).set_weight(1);
        }
        if world.get(id).weight() < params.diethin {
            world.kill_bug(id, arena, cursor);
            outcome.starved = true;
        }
    }

    outcome
}

fn do_eat(world: &mut World, id: BugId, params: &Params) {
    let pos = world.get(id).position();
    let weight = world.get(id).weight();
    let desired = weight * params.eatlimit_num / 1024;
    let cell = world.cell_mut(pos);
    let intake = desired.min(cell.food);
    let overeat_penalty = (desired - intake).max(0);
    cell.food -= intake;
    let bug = world.get_mut(id);
    let gained = (bug.weight() + intake - overeat_penalty).min(params.masscap);
    bug.set_weight(gained);
    pay(bug, params.eat_cost, params.nom);
}

/// Returns whether the acting bug is still alive after this step.
fn do_move(
    world: &mut World,
    arena: &mut GeneArena,
    rng: &mut Lcg,
    params: &Params,
    cursor: &mut Option<BugId>,
    id: BugId,
    outcome: &mut ActionOutcome,
) -> bool {
    let face = world.get(id).face();
    let from = world.get(id).position();
    let to = step(from, face, world.wx, world.wy);
    pay(world.get_mut(id), params.move_cost, params.nom);

    let defender = world.cell(to).bug;
    match defender {
        None => {
            world.relocate(id, to);
            world.get_mut(id).moves += 1;
            outcome.moved = true;
            true
        }
        Some(defender_id) if params.safety => {
            let _ = defender_id;
            true
        }
        Some(defender_id) => resolve_combat(world, arena, rng, params, cursor, id, defender_id, to, outcome),
    }
}

fn resolve_combat(
    world: &mut World,
    arena: &mut GeneArena,
    rng: &mut Lcg,
    params: &Params,
    cursor: &mut Option<BugId>,
    attacker_id: BugId,
    defender_id: BugId,
    to: crate::hex::Pos,
    outcome: &mut ActionOutcome,
) -> bool {
    let attacker_face = world.get(attacker_id).face();
    let defender_face = world.get(defender_id).face();
    let rf = normalize_face(defender_face - attacker_face);
    let defender_weight = world.get(defender_id).weight();
    let defender_defends = world.get(defender_id).defends;
    let attacker_kills = world.get(attacker_id).kills;

    let mut m = match rf {
        0 => defender_weight * (defender_defends / 2 + 1) / 128,
        1 | -1 => defender_weight * (defender_defends / 4 + 1) / 1024,
        2 | -2 => defender_weight * (defender_defends / 8 + 1) / 8192 - attacker_kills,
        _ => defender_weight / 65536 - attacker_kills * attacker_kills,
    };
    m = m.max(0);

    let attacker_weight = world.get(attacker_id).weight();
    let r = rng.next_bounded(m + attacker_weight / 1024);

    outcome.collision = true;
    if r > m {
        world.get_mut(attacker_id).kills += 1;
        world.kill_bug(defender_id, arena, cursor);
        world.relocate(attacker_id, to);
        pay(world.get_mut(attacker_id), params.fight_cost, params.nom);
        true
    } else {
        world.get_mut(defender_id).defends += 1;
        world.get_mut(defender_id).shift_history();
        world.get_mut(defender_id).pos[0].act = ActLog::Defend as usize;
        world.kill_bug(attacker_id, arena, cursor);
        false
    }
}

fn do_mate(
    world: &mut World,
    arena: &mut GeneArena,
    rng: &mut Lcg,
    diagnostics: &mut DiagnosticLog,
    params: &Params,
    id: BugId,
) {
    let face = world.get(id).face();
    let from = world.get(id).position();
    let to = step(from, face, world.wx, world.wy);
    let partner_id = world.cell(to).bug;

    match partner_id {
        Some(partner_id) => {
            let partner_senses = gather_senses(world, partner_id);
            let response = {
                let brain = &world.get(partner_id).brain;
                brain.mate_response(arena, &partner_senses, rng, diagnostics)
            };
            if response > 0 {
                let new_self_matebrain = copy_brain(arena, &world.get(partner_id).brain);
                let new_partner_matebrain = copy_brain(arena, &world.get(id).brain);

                let self_old_uid = world.get(id).matebrain.eth.uid;
                let partner_old_uid = world.get(partner_id).matebrain.eth.uid;

                let old_self_matebrain = std::mem::replace(&mut world.get_mut(id).matebrain, new_self_matebrain);
                dispose_brain(arena, &old_self_matebrain);
                let old_partner_matebrain =
                    std::mem::replace(&mut world.get_mut(partner_id).matebrain, new_partner_matebrain);
                dispose_brain(arena, &old_partner_matebrain);

                if self_old_uid != world.get(id).matebrain.eth.uid {
                    world.get_mut(id).mate_success += 1;
                } else {
                    world.get_mut(id).mate_repeat += 1;
                }
                if partner_old_uid != world.get(partner_id).matebrain.eth.uid {
                    world.get_mut(partner_id).mate_success += 1;
                } else {
                    world.get_mut(partner_id).mate_repeat += 1;
                }

                world.get_mut(partner_id).shift_history();
                world.get_mut(partner_id).pos[0].act = ActLog::Mated as usize;
                world.get_mut(id).pos[0].act = ActLog::Mated as usize;
            } else {
                world.get_mut(id).mate_fails += 1;
            }
        }
        None => world.get_mut(id).mate_fails += 1,
    }

    pay(world.get_mut(id), params.costmate, params.nom);
}

fn apply_gate_penalty(bug: &mut Bug, divide_cost: i64, divide: i64, subtract: bool, divide_by: bool) {
    if divide_by {
        bug.set_weight(bug.weight() / divide.max(1));
    }
    if subtract {
        bug.set_weight(bug.weight() - divide_cost);
    }
}

fn crossover_chromosomes(arena: &mut GeneArena, parent: &Brain, mate: &Brain, rng: &mut Lcg) -> [DecisionGenes; NDEC] {
    std::array::from_fn(|i| {
        let (a_src, a_eth) = if rng.next_bounded(2) == 0 {
            (parent.act[i].a, parent.act[i].ea)
        } else {
            (parent.act[i].b, parent.act[i].eb)
        };
        let (b_src, b_eth) = if rng.next_bounded(2) == 0 {
            (mate.act[i].a, mate.act[i].ea)
        } else {
            (mate.act[i].b, mate.act[i].eb)
        };
        DecisionGenes {
            a: clone_chain(arena, a_src),
            b: clone_chain(arena, b_src),
            ea: a_eth,
            eb: b_eth,
        }
    })
}

/// Returns the number of children actually born.
fn do_divide(world: &mut World, arena: &mut GeneArena, rng: &mut Lcg, params: &Params, id: BugId) -> u32 {
    let today = world.today;
    let birthday = world.get(id).birthday;
    let divide = world.get(id).brain.divide;
    let forcemate = params.forcemate;

    if forcemate & FM_AGE_GATE != 0 && today - birthday < params.agediv {
        let bug = world.get_mut(id);
        apply_gate_penalty(
            bug,
            params.divide_cost,
            divide,
            forcemate & FM_AGE_PENALTY_SUBTRACT != 0,
            forcemate & FM_AGE_PENALTY_DIVIDE != 0,
        );
        bug.set_weight(bug.weight().max(params.diethin));
        pay(bug, params.sleep_cost, params.nom);
        return 0;
    }

    let self_cloned = world.get(id).brain.eth.uid == world.get(id).matebrain.eth.uid;
    if forcemate & FM_MATE_REQUIRED != 0 && self_cloned {
        let bug = world.get_mut(id);
        apply_gate_penalty(
            bug,
            params.divide_cost,
            divide,
            forcemate & FM_MATE_PENALTY_SUBTRACT != 0,
            forcemate & FM_MATE_PENALTY_DIVIDE != 0,
        );
        bug.set_weight(bug.weight().max(params.diethin));
        pay(bug, params.sleep_cost, params.nom);
        return 0;
    }

    let weight = world.get(id).weight();
    let child_mass = weight / divide - params.divide_cost;
    world.get_mut(id).set_weight(child_mass);
    if child_mass < params.diethin {
        return 0;
    }

    let face = world.get(id).face();
    let from = world.get(id).position();
    let wy = world.wy;

    let mut births = 0u32;
    for k in 1..(divide as usize) {
        let delta = DIVIDE_DELTA[k - 1];
        let target = step(from, face + delta, world.wx, world.wy);
        if world.cell(target).bug.is_some() {
            continue;
        }

        let parent_eth = world.get(id).brain.eth;
        let mate_eth = world.get(id).matebrain.eth;
        let (r, g, b) = assimilate(parent_eth, mate_eth, target.y, wy);
        let uid = world.next_uid();
        let eth = Ethnicity::new(r, g, b, uid);

        let generation = world.get(id).brain.generation.max(world.get(id).matebrain.generation) + 1;
        let child_divide = if rng.next_bounded(2) == 0 {
            world.get(id).brain.divide
        } else {
            world.get(id).matebrain.divide
        };
        let expression = rng.next_bounded(256) as u8;
        let family = {
            let parent = &world.get(id).brain;
            let mate = &world.get(id).matebrain;
            build_family(parent, mate)
        };
        let act = {
            let parent = &world.get(id).brain;
            let mate = &world.get(id).matebrain;
            crossover_chromosomes(arena, parent, mate, rng)
        };
        let mut brain = Brain {
            act,
            family,
            eth,
            generation,
            divide: child_divide,
            ngenes: 0,
            expression,
        };
        brain.recount_genes(arena);
        let matebrain = copy_brain(arena, &brain);

        let mut child = Bug::new(uid, today, target, face, child_mass, brain, matebrain);

        if rng.next_bounded(4) == 0 {
            child.matebrain.mutate(arena, rng);
        }
        if rng.next_bounded(8) == 0 {
            child.brain.mutate(arena, rng);
        }

        world.spawn(child);
        world.get_mut(id).offspring += 1;
        births += 1;
    }

    if forcemate & FM_MARK_SELF_CLONE != 0 {
        let self_uid = world.get(id).brain.eth.uid;
        world.get_mut(id).matebrain.eth.uid = self_uid;
    }

    births
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::from_chromosomes;
    use crate::diagnostics::DiagnosticLog;
    use crate::ethnicity::Ethnicity;
    use crate::gene::new_const_chromosome;
    use crate::hex::Pos;

    fn mk_bug(arena: &mut GeneArena, uid: u64, pos: Pos, weight: i64, const_val: i64) -> Bug {
        let eth = Ethnicity::genesis_red_max(uid);
        let chromosomes: [(u32, u32); NDEC] = std::array::from_fn(|_| {
            (
                new_const_chromosome(arena, const_val),
                new_const_chromosome(arena, const_val),
            )
        });
        let brain = from_chromosomes(arena, chromosomes, eth, 3, 0);
        let matebrain = copy_brain(arena, &brain);
        Bug::new(uid, 0, pos, 0, weight, brain, matebrain)
    }

    #[test]
    fn sleep_pays_scaled_cost() {
        let mut world = World::new(20, 20);
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(1);
        let mut diags = DiagnosticLog::with_capacity(8);
        let params = Params::default();
        // SLEEP=0 is the argmax when every chromosome is a tied constant.
        let bug = mk_bug(&mut arena, 1, Pos::new(5, 5), 200_000, 0);
        let id = world.spawn(bug);
        let mut cursor = None;
        let before = world.get(id).weight();
        act(&mut world, &mut arena, &mut rng, &mut diags, &params, &mut cursor, id);
        assert!(world.get(id).weight() < before);
    }

    #[test]
    fn eat_applies_overeat_penalty_when_food_scarce() {
        let mut world = World::new(20, 20);
        let mut arena = GeneArena::new();
        let params = Params::default();
        let bug = mk_bug(&mut arena, 1, Pos::new(5, 5), 200_000, 0);
        let id = world.spawn(bug);
        world.cell_mut(Pos::new(5, 5)).food = 0;
        let before = world.get(id).weight();
        do_eat(&mut world, id, &params);
        // desired = 200_000*205/1024 > 0 = cell.food, so full desired is a
        // weight penalty with zero intake.
        assert!(world.get(id).weight() < before);
        assert_eq!(world.cell(Pos::new(5, 5)).food, 0);
    }

    #[test]
    fn eat_never_pushes_weight_above_masscap() {
        let mut world = World::new(20, 20);
        let mut arena = GeneArena::new();
        let params = Params::default();
        let bug = mk_bug(&mut arena, 1, Pos::new(5, 5), params.masscap - 10, 0);
        let id = world.spawn(bug);
        world.cell_mut(Pos::new(5, 5)).food = params.foodcap * 5;
        do_eat(&mut world, id, &params);
        assert!(world.get(id).weight() <= params.masscap);
    }

    #[test]
    fn move_into_empty_cell_relocates() {
        let mut world = World::new(20, 20);
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(1);
        let params = Params::default();
        let bug = mk_bug(&mut arena, 1, Pos::new(5, 5), 200_000, 0);
        let id = world.spawn(bug);
        let mut outcome = ActionOutcome::default();
        let mut cursor = None;
        let alive = do_move(&mut world, &mut arena, &mut rng, &params, &mut cursor, id, &mut outcome);
        assert!(alive);
        assert!(outcome.moved);
        assert_eq!(world.cell(Pos::new(5, 5)).bug, None);
    }

    #[test]
    fn divide_with_insufficient_mass_has_zero_births() {
        let mut world = World::new(20, 20);
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(1);
        let params = Params::default();
        let bug = mk_bug(&mut arena, 1, Pos::new(5, 5), 10, 0);
        let id = world.spawn(bug);
        let births = do_divide(&mut world, &mut arena, &mut rng, &params, id);
        assert_eq!(births, 0);
        assert!(world.get(id).weight() < 0);
    }

    #[test]
    fn divide_with_sufficient_mass_spawns_children() {
        let mut world = World::new(20, 20);
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(1);
        let params = Params::default();
        let bug = mk_bug(&mut arena, 1, Pos::new(5, 5), 100_000_000, 0);
        let id = world.spawn(bug);
        let before_len = world.len();
        let births = do_divide(&mut world, &mut arena, &mut rng, &params, id);
        assert!(births > 0);
        assert_eq!(world.len(), before_len + births as usize);
    }
}
