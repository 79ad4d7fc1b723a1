//! Genesis construction: seeds "bug one" at the world center.

use crate::brain::{copy_brain, from_chromosomes};
use crate::bug::Bug;
use crate::constants::{DIETHIN, NDEC};
use crate::ethnicity::Ethnicity;
use crate::gene::{GeneArena, GeneKind, GeneNode};
use crate::hex::Pos;
use crate::rng::Lcg;
use crate::world::World;

fn sense_gene(arena: &mut GeneArena, si: usize, c1: i64, c2: i64) -> u32 {
    arena.alloc(GeneNode::leaf(GeneKind::Sense, si, c1, c2))
}

fn const_gene(arena: &mut GeneArena, c1: i64) -> u32 {
    arena.alloc(GeneNode::leaf(GeneKind::Const, 0, c1, 0))
}

/// Hand-authored starting chromosome pair for each of the eight decisions
/// (`Some((sense_index, c1, c2))` for a `Sense` leaf, `None` for a flat
/// `Const` bias taken from `FLAT_BIAS`). Genesis genetics are left
/// unspecified beyond "a reasonable starting brain"; these values are
/// invented to make bug one eat and chase food ahead of it,
/// stay still otherwise, and mate/divide once its own condition senses
/// (indices 57/58 from `sense.rs`) say it can afford to.
const GENESIS_TABLE: [(Option<(usize, i64, i64)>, Option<(usize, i64, i64)>); NDEC] = [
    (None, None),                                   // SLEEP
    (Some((0, 1024, 0)), Some((0, 896, 64))),        // EAT: self-cell food
    (None, None),                                    // TURN_CW
    (None, None),                                    // TURN_CCW
    (Some((4, 1024, 0)), Some((4, 960, 0))),         // MOVE: food one step ahead
    (Some((58, 512, -256)), Some((58, 448, -192))),  // MATE: own weight/DIETHIN
    (Some((57, 1024, 0)), Some((57, 1024, 64))),     // DIVIDE: can-afford-a-child
    (None, None),                                    // MATE_RESPONSE
];

const FLAT_BIAS: [i64; NDEC] = [-100, 0, -200, -200, 0, 0, 0, 200];

fn build_chromosome(arena: &mut GeneArena, desc: Option<(usize, i64, i64)>, flat: i64) -> u32 {
    match desc {
        Some((si, c1, c2)) => sense_gene(arena, si, c1, c2),
        None => const_gene(arena, flat),
    }
}

/// Builds "bug one": world-center position, east-facing, weight
/// `DIETHIN*256`, `divide=3`, red-max ethnicity, the genesis chromosome
/// table above, and a matebrain that starts as a copy of its own brain
/// and is then mutated once.
pub fn genesis_default(world: &mut World, arena: &mut GeneArena, rng: &mut Lcg) {
    let uid = world.next_uid();
    let eth = Ethnicity::genesis_red_max(uid);

    let chromosomes: [(u32, u32); NDEC] = std::array::from_fn(|i| {
        let (a_spec, b_spec) = GENESIS_TABLE[i];
        (
            build_chromosome(arena, a_spec, FLAT_BIAS[i]),
            build_chromosome(arena, b_spec, FLAT_BIAS[i]),
        )
    });

    let brain = from_chromosomes(arena, chromosomes, eth, 3, 0b0111_1111);
    let mut matebrain = copy_brain(arena, &brain);
    matebrain.mutate(arena, rng);

    let pos = Pos::new(world.wx / 2, world.wy / 2);
    let weight = DIETHIN * 256;
    let bug = Bug::new(uid, 0, pos, 0, weight, brain, matebrain);
    world.spawn(bug);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_spawns_exactly_one_bug_at_center() {
        let mut world = World::new(20, 16);
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(1);
        genesis_default(&mut world, &mut arena, &mut rng);
        assert_eq!(world.len(), 1);
        let id = world.head().unwrap();
        assert_eq!(world.get(id).position(), Pos::new(10, 8));
        assert_eq!(world.get(id).weight(), DIETHIN * 256);
    }

    #[test]
    fn genesis_brain_and_matebrain_share_uid_but_differ_structurally() {
        let mut world = World::new(20, 16);
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(7);
        genesis_default(&mut world, &mut arena, &mut rng);
        let id = world.head().unwrap();
        let bug = world.get(id);
        // Not yet mated with anyone else, so the self-clone uid check holds.
        assert_eq!(bug.brain.eth.uid, bug.matebrain.eth.uid);
    }
}
