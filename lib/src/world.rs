//! The cell grid and the intrusive, ordered bug list: ownership and
//! kill-during-iteration semantics.

use crate::brain::dispose_brain;
use crate::bug::Bug;
use crate::constants::{FOODSTART, FOOD_HARD_CAP};
use crate::gene::GeneArena;
use crate::hex::Pos;
use serde::{Deserialize, Serialize};

pub type BugId = u32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cell {
    pub food: i64,
    pub bug: Option<BugId>,
    pub nearest: i32,
}

impl Cell {
    fn fresh() -> Self {
        Self {
            food: FOODSTART,
            bug: None,
            nearest: -1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Slot {
    bug: Option<Bug>,
    next: Option<BugId>,
    prev: Option<BugId>,
}

/// Owns the cell grid, the bug arena, and the insertion-ordered bug list.
/// Bug-list order equals uid order at genesis and stays monotonic for all
/// descendants, since births always append at the tail.
#[derive(Debug, Serialize, Deserialize)]
pub struct World {
    pub wx: i32,
    pub wy: i32,
    pub cells: Vec<Cell>,
    slots: Vec<Slot>,
    free: Vec<BugId>,
    head: Option<BugId>,
    tail: Option<BugId>,
    len: usize,
    pub uid_counter: u64,
    pub today: i64,
}

impl World {
    pub fn new(wx: i32, wy: i32) -> Self {
        Self {
            wx,
            wy,
            cells: vec![Cell::fresh(); (wx * wy) as usize],
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            uid_counter: 0,
            today: 0,
        }
    }

    pub fn idx(&self, pos: Pos) -> usize {
        (pos.y * self.wx + pos.x) as usize
    }

    pub fn cell(&self, pos: Pos) -> &Cell {
        &self.cells[self.idx(pos)]
    }

    pub fn cell_mut(&mut self, pos: Pos) -> &mut Cell {
        let i = self.idx(pos);
        &mut self.cells[i]
    }

    pub fn next_uid(&mut self) -> u64 {
        let u = self.uid_counter;
        self.uid_counter += 1;
        u
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<BugId> {
        self.head
    }

    pub fn next_of(&self, id: BugId) -> Option<BugId> {
        self.slots[id as usize].next
    }

    pub fn get(&self, id: BugId) -> &Bug {
        self.slots[id as usize]
            .bug
            .as_ref()
            .expect("dangling BugId: bug was killed while still referenced")
    }

    pub fn get_mut(&mut self, id: BugId) -> &mut Bug {
        self.slots[id as usize]
            .bug
            .as_mut()
            .expect("dangling BugId: bug was killed while still referenced")
    }

    /// Appends a newly-created bug at the tail of the bug list and
    /// occupies its cell. Occupancy invariant: the cell at `bug.position()`
    /// must be empty, or this panics.
    pub fn spawn(&mut self, bug: Bug) -> BugId {
        let pos = bug.position();
        debug_assert!(self.cell(pos).bug.is_none(), "spawn onto occupied cell");

        let id = if let Some(id) = self.free.pop() {
            self.slots[id as usize] = Slot {
                bug: Some(bug),
                next: None,
                prev: self.tail,
            };
            id
        } else {
            self.slots.push(Slot {
                bug: Some(bug),
                next: None,
                prev: self.tail,
            });
            (self.slots.len() - 1) as BugId
        };

        match self.tail {
            Some(t) => self.slots[t as usize].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;

        let cidx = self.idx(pos);
        self.cells[cidx].bug = Some(id);
        id
    }

    /// Moves `id`'s occupancy from its current cell to `new_pos`, which
    /// must be empty.
    pub fn relocate(&mut self, id: BugId, new_pos: Pos) {
        let old_pos = self.get(id).position();
        let old_idx = self.idx(old_pos);
        self.cells[old_idx].bug = None;
        let new_idx = self.idx(new_pos);
        debug_assert!(self.cells[new_idx].bug.is_none(), "relocate onto occupied cell");
        self.cells[new_idx].bug = Some(id);
        self.get_mut(id).pos[0].pos = new_pos;
    }

    /// Kills `id`: converts its remaining weight into cell food, clears
    /// the cell's bug handle, releases every gene owned by its brain and
    /// matebrain, splices it out of the bug list, and -- if it is the
    /// bug the scheduler is currently iterating -- rewrites `cursor` to
    /// the cached next bug first, so the walk survives.
    pub fn kill_bug(&mut self, id: BugId, arena: &mut GeneArena, cursor: &mut Option<BugId>) {
        let slot_next = self.slots[id as usize].next;
        let slot_prev = self.slots[id as usize].prev;

        if *cursor == Some(id) {
            *cursor = slot_next;
        }

        match slot_prev {
            Some(p) => self.slots[p as usize].next = slot_next,
            None => self.head = slot_next,
        }
        match slot_next {
            Some(n) => self.slots[n as usize].prev = slot_prev,
            None => self.tail = slot_prev,
        }

        let bug = self.slots[id as usize]
            .bug
            .take()
            .expect("kill_bug on an already-dead BugId");

        let pos = bug.position();
        let leftover = bug.weight().max(0);
        let cidx = self.idx(pos);
        self.cells[cidx].food = (self.cells[cidx].food + leftover).min(FOOD_HARD_CAP);
        self.cells[cidx].bug = None;

        dispose_brain(arena, &bug.brain);
        dispose_brain(arena, &bug.matebrain);

        self.free.push(id);
        self.len -= 1;
    }

    /// Single-step nearest-bug pass: `0` if occupied, `-1` otherwise. The
    /// engine defines no iterative dilation.
    pub fn recompute_nearest(&mut self) {
        for c in self.cells.iter_mut() {
            c.nearest = if c.bug.is_some() { 0 } else { -1 };
        }
    }

    /// Snapshot of bug ids in list order, for read-only views/tests.
    pub fn ids_in_order(&self) -> Vec<BugId> {
        let mut ids = Vec::with_capacity(self.len);
        let mut cur = self.head;
        while let Some(id) = cur {
            ids.push(id);
            cur = self.slots[id as usize].next;
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::from_chromosomes;
    use crate::constants::NDEC;
    use crate::ethnicity::Ethnicity;
    use crate::gene::new_const_chromosome;

    fn mk_bug(arena: &mut GeneArena, uid: u64, pos: Pos) -> Bug {
        let eth = Ethnicity::genesis_red_max(uid);
        let chromosomes: [(u32, u32); NDEC] =
            std::array::from_fn(|_| (new_const_chromosome(arena, 0), new_const_chromosome(arena, 0)));
        let brain = from_chromosomes(arena, chromosomes, eth, 3, 0);
        let matebrain = crate::brain::copy_brain(arena, &brain);
        Bug::new(uid, 0, pos, 0, 200_000, brain, matebrain)
    }

    #[test]
    fn spawn_occupies_cell_and_appends_to_tail() {
        let mut world = World::new(10, 10);
        let mut arena = GeneArena::new();
        let b1 = mk_bug(&mut arena, 1, Pos::new(0, 0));
        let id1 = world.spawn(b1);
        let b2 = mk_bug(&mut arena, 2, Pos::new(1, 1));
        let id2 = world.spawn(b2);
        assert_eq!(world.ids_in_order(), vec![id1, id2]);
        assert_eq!(world.cell(Pos::new(0, 0)).bug, Some(id1));
        assert_eq!(world.cell(Pos::new(1, 1)).bug, Some(id2));
    }

    #[test]
    fn kill_bug_frees_cell_and_splices_list() {
        let mut world = World::new(10, 10);
        let mut arena = GeneArena::new();
        let b1 = mk_bug(&mut arena, 1, Pos::new(0, 0));
        let id1 = world.spawn(b1);
        let b2 = mk_bug(&mut arena, 2, Pos::new(1, 1));
        let id2 = world.spawn(b2);

        let mut cursor = Some(id1);
        world.kill_bug(id1, &mut arena, &mut cursor);
        assert_eq!(cursor, Some(id2));
        assert_eq!(world.cell(Pos::new(0, 0)).bug, None);
        assert_eq!(world.ids_in_order(), vec![id2]);
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn kill_bug_converts_weight_to_food() {
        let mut world = World::new(10, 10);
        let mut arena = GeneArena::new();
        let b1 = mk_bug(&mut arena, 1, Pos::new(3, 3));
        let before_food = world.cell(Pos::new(3, 3)).food;
        let id1 = world.spawn(b1);
        let w = world.get(id1).weight();
        let mut cursor = None;
        world.kill_bug(id1, &mut arena, &mut cursor);
        assert_eq!(world.cell(Pos::new(3, 3)).food, before_food + w);
    }

    #[test]
    fn nearest_single_step_only() {
        let mut world = World::new(4, 4);
        let mut arena = GeneArena::new();
        let b1 = mk_bug(&mut arena, 1, Pos::new(0, 0));
        world.spawn(b1);
        world.recompute_nearest();
        assert_eq!(world.cell(Pos::new(0, 0)).nearest, 0);
        assert_eq!(world.cell(Pos::new(1, 0)).nearest, -1);
    }
}
