//! Assembles a bug's 60-entry sense vector from its neighborhood and
//! self-state.
//!
//! Cells 6-9 ("2-left-forward", "2-right-forward") are read as two
//! composed two-step paths -- `step(f-1) . step(f-1)` and
//! `step(f-1) . step(f)` -- mirrored on the right with `f+1`, which keeps
//! the twelve-cell fan left/right symmetric and uses only `face +/- k`
//! compositions for `k in -2..=2` (see DESIGN.md for the recorded
//! decision).

use crate::brain::family_match;
use crate::constants::{DIETHIN, DIVIDE_COST, NACT, NSENSES};
use crate::hex::{normalize_face, step, Pos};
use crate::world::{BugId, World};

/// Cell-to-family-match-level assignment: self=0, one step ahead=1,
/// two-ahead-and-the-flanks=2, everything else=3.
const LEVELS: [u8; 12] = [0, 1, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3];

fn cell_targets(p: Pos, f: i32, wx: i32, wy: i32) -> [Pos; 12] {
    let s = |from: Pos, face: i32| step(from, face, wx, wy);
    [
        p,
        s(p, f),
        s(s(p, f), f),
        s(p, f - 1),
        s(p, f + 1),
        s(s(s(p, f), f), f),
        s(s(p, f - 1), f - 1),
        s(s(p, f + 1), f + 1),
        s(s(p, f - 1), f),
        s(s(p, f + 1), f),
        s(s(p, f - 2), f - 2),
        s(s(p, f + 2), f + 2),
    ]
}

/// Builds the sense vector seen by `self_id` this tick.
pub fn gather_senses(world: &World, self_id: BugId) -> [i64; NSENSES] {
    let bug = world.get(self_id);
    let face = bug.face();
    let self_w = bug.normalization_weight();
    let targets = cell_targets(bug.position(), face, world.wx, world.wy);

    let mut senses = [0i64; NSENSES];
    for (k, &target) in targets.iter().enumerate() {
        let cell = world.cell(target);
        let occupant = cell.bug.filter(|&oid| oid != self_id);

        let food_sense = cell.food * 1024 / self_w;
        let (mass_sense, face_sense) = match occupant {
            Some(oid) => {
                let other = world.get(oid);
                let mass = other.normalization_weight() * 1024 / self_w;
                let rel_face = normalize_face(other.face() - face) as i64 * 1024;
                (mass, rel_face)
            }
            None => (0, 0),
        };
        let family_sense = if LEVELS[k] == 0 {
            1024
        } else {
            match occupant {
                Some(oid) => family_match(&bug.brain, &world.get(oid).brain, LEVELS[k]),
                None => 0,
            }
        };

        senses[k * 4] = food_sense;
        senses[k * 4 + 1] = mass_sense;
        senses[k * 4 + 2] = face_sense;
        senses[k * 4 + 3] = family_sense;
    }

    for i in 0..NACT {
        senses[48 + i] = bug.time_since_act(i);
    }

    let w = bug.normalization_weight();
    senses[57] = (w / bug.brain.divide - DIVIDE_COST) * 1024 / DIETHIN;
    senses[58] = w * 1024 / DIETHIN;
    senses[59] = world.today - bug.birthday;

    senses
}
