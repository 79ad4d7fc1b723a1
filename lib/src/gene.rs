//! Expression-tree genes: an arena of nodes carrying both the evaluation
//! tree (`prod`/`sum` children) and the enumeration chain (`next`/`prev`)
//! a chromosome needs for mutation.
//!
//! An arena of small-integer-indexed nodes is used instead of two parallel
//! structures: it keeps snapshot/copy cheap, which matters for a
//! reproduction-heavy workload.

use crate::constants::NSENSES;
use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::rng::Lcg;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index into a [`GeneArena`]. `u32` keeps snapshots compact; a crate this
/// long-lived never approaches `u32::MAX` live genes.
pub type GeneId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneKind {
    Const = 1,
    Sense = 2,
    Limit = 3,
    Compare = 4,
    Match = 5,
}

impl GeneKind {
    fn from_i64(v: i64) -> Self {
        match ((v - 1).rem_euclid(5)) + 1 {
            1 => GeneKind::Const,
            2 => GeneKind::Sense,
            3 => GeneKind::Limit,
            4 => GeneKind::Compare,
            _ => GeneKind::Match,
        }
    }

    fn as_i64(self) -> i64 {
        self as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneNode {
    pub kind: GeneKind,
    pub si: usize,
    pub c1: i64,
    pub c2: i64,
    pub prod: Option<GeneId>,
    pub sum: Option<GeneId>,
    next: Option<GeneId>,
    prev: Option<GeneId>,
}

impl GeneNode {
    pub fn leaf(kind: GeneKind, si: usize, c1: i64, c2: i64) -> Self {
        Self {
            kind,
            si,
            c1,
            c2,
            prod: None,
            sum: None,
            next: None,
            prev: None,
        }
    }
}

/// Owning store of every gene node in the engine. Chromosome roots are
/// just `GeneId`s into this arena; freeing never happens except through
/// [`GeneArena::free`], so chain and tree pointers stay valid as long as
/// the arena does.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeneArena {
    slots: Vec<Option<GeneNode>>,
    free: Vec<GeneId>,
}

impl GeneArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: GeneNode) -> GeneId {
        if let Some(id) = self.free.pop() {
            self.slots[id as usize] = Some(node);
            id
        } else {
            self.slots.push(Some(node));
            (self.slots.len() - 1) as GeneId
        }
    }

    pub fn free(&mut self, id: GeneId) {
        self.slots[id as usize] = None;
        self.free.push(id);
    }

    pub fn get(&self, id: GeneId) -> &GeneNode {
        self.slots[id as usize]
            .as_ref()
            .expect("dangling GeneId: gene was freed while still referenced")
    }

    pub fn get_mut(&mut self, id: GeneId) -> &mut GeneNode {
        self.slots[id as usize]
            .as_mut()
            .expect("dangling GeneId: gene was freed while still referenced")
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

/// Allocates a single-node chromosome: `Const` with weight `c1`.
pub fn new_const_chromosome(arena: &mut GeneArena, c1: i64) -> GeneId {
    arena.alloc(GeneNode::leaf(GeneKind::Const, 0, c1, 0))
}

/// Collects the chain starting at `head`, in chain order.
pub fn chain_ids(arena: &GeneArena, head: GeneId) -> Vec<GeneId> {
    let mut ids = Vec::new();
    let mut cur = Some(head);
    while let Some(id) = cur {
        ids.push(id);
        cur = arena.get(id).next;
    }
    ids
}

pub fn chain_len(arena: &GeneArena, head: GeneId) -> usize {
    chain_ids(arena, head).len()
}

/// Appends `new_id` to the end of the chain rooted at `head`.
pub fn append_to_chain(arena: &mut GeneArena, head: GeneId, new_id: GeneId) {
    let mut tail = head;
    while let Some(next) = arena.get(tail).next {
        tail = next;
    }
    arena.get_mut(tail).next = Some(new_id);
    arena.get_mut(new_id).prev = Some(tail);
}

/// Picks a uniformly random gene from the chain rooted at `head`.
pub fn random_gene_in_chain(arena: &GeneArena, head: GeneId, rng: &mut Lcg) -> GeneId {
    let ids = chain_ids(arena, head);
    let idx = rng.next_bounded(ids.len() as i64) as usize;
    ids[idx]
}

/// Deep-copies the whole chain (and the tree it encodes) rooted at
/// `head`, preserving chain order exactly. Used by chromosome copy on
/// divide and by `copy_brain`.
pub fn clone_chain(arena: &mut GeneArena, head: GeneId) -> GeneId {
    let old_ids = chain_ids(arena, head);
    let mut map: HashMap<GeneId, GeneId> = HashMap::with_capacity(old_ids.len());
    let mut new_ids = Vec::with_capacity(old_ids.len());
    for &old in &old_ids {
        let src = arena.get(old).clone();
        let new_id = arena.alloc(GeneNode::leaf(src.kind, src.si, src.c1, src.c2));
        map.insert(old, new_id);
        new_ids.push(new_id);
    }
    for (i, &old) in old_ids.iter().enumerate() {
        let src = arena.get(old).clone();
        let new_id = new_ids[i];
        let node = arena.get_mut(new_id);
        node.prod = src.prod.map(|id| map[&id]);
        node.sum = src.sum.map(|id| map[&id]);
        node.prev = if i > 0 { Some(new_ids[i - 1]) } else { None };
        node.next = new_ids.get(i + 1).copied();
    }
    map[&head]
}

/// Frees every node reachable from `root` (inclusive), splicing each out
/// of its chain first. Never removes a chromosome's chain root: callers
/// only ever pass a `prod`/`sum` child, never a chain head.
pub fn disposebranch(arena: &mut GeneArena, root: Option<GeneId>) -> usize {
    let Some(root) = root else { return 0 };
    let mut stack = vec![root];
    let mut removed = 0;
    while let Some(id) = stack.pop() {
        let node = arena.get(id).clone();
        if let Some(p) = node.prod {
            stack.push(p);
        }
        if let Some(s) = node.sum {
            stack.push(s);
        }
        if let Some(p) = node.prev {
            arena.get_mut(p).next = node.next;
        }
        if let Some(n) = node.next {
            arena.get_mut(n).prev = node.prev;
        }
        arena.free(id);
        removed += 1;
    }
    removed
}

/// Frees an entire chromosome, chain root included. For chromosome
/// teardown only (bug death) -- never call this on a gene still reachable
/// from elsewhere.
pub fn dispose_chromosome(arena: &mut GeneArena, head: GeneId) {
    for id in chain_ids(arena, head) {
        arena.free(id);
    }
}

fn limit_ramp(x: i64, c1: i64, c2: i64) -> i64 {
    if c1 == c2 {
        return 512;
    }
    if c1 < c2 {
        if x <= c1 {
            0
        } else if x >= c2 {
            1024
        } else {
            (x - c1) * 1024 / (c2 - c1)
        }
    } else if x <= c2 {
        1024
    } else if x >= c1 {
        0
    } else {
        1024 - (x - c2) * 1024 / (c1 - c2)
    }
}

/// Evaluates the tree rooted at `id` against `senses`, depth-first,
/// dispatching on node kind.
///
/// `si` out of `[0, NSENSES)` is repaired in place to a freshly drawn
/// valid index and reported on `diagnostics`.
///
/// `Compare` has no formula of its own here: the reference source's
/// `Compare` arm falls through into `Match` with no terminator, so the
/// value it would have computed is always immediately overwritten. This
/// reproduces that observable behavior rather than the apparently
/// intended one (see DESIGN.md for the recorded decision).
pub fn evaluate(
    arena: &mut GeneArena,
    id: GeneId,
    senses: &[i64],
    rng: &mut Lcg,
    diagnostics: &mut DiagnosticLog,
) -> i64 {
    let si = arena.get(id).si;
    let si = if si >= NSENSES {
        let repaired = rng.next_bounded(NSENSES as i64) as usize;
        diagnostics.push(Diagnostic::GeneSenseIndexRepaired {
            gene: id,
            old_si: si,
            new_si: repaired,
        });
        arena.get_mut(id).si = repaired;
        repaired
    } else {
        si
    };

    let node = arena.get(id).clone();
    let mut value = match node.kind {
        GeneKind::Const => node.c1,
        GeneKind::Sense => senses[si] * node.c1 / 1024 + node.c2,
        GeneKind::Limit => limit_ramp(senses[si], node.c1, node.c2),
        GeneKind::Compare | GeneKind::Match => {
            let other = senses[node.c2.rem_euclid(NSENSES as i64) as usize];
            1024 - ((senses[si] - other) * node.c1).abs() / 1024
        }
    };
    if matches!(node.kind, GeneKind::Compare | GeneKind::Match) {
        value = value.max(0);
    }

    if let Some(prod) = node.prod {
        value = value * evaluate(arena, prod, senses, rng, diagnostics) / 1024;
    }
    if let Some(sum) = node.sum {
        value += evaluate(arena, sum, senses, rng, diagnostics);
    }
    value
}

fn tweak_edit(arena: &mut GeneArena, gene: GeneId, rng: &mut Lcg) {
    match rng.next_bounded(4) {
        0 => {
            let bump = 1 + rng.next_bounded(4);
            let node = arena.get_mut(gene);
            node.kind = GeneKind::from_i64(node.kind.as_i64() + bump);
        }
        1 => {
            let mut delta = rng.next_bounded(NSENSES as i64 + 6) - 3;
            if delta == 0 {
                delta = 6;
            }
            let node = arena.get_mut(gene);
            node.si = (node.si as i64 + delta).rem_euclid(NSENSES as i64) as usize;
        }
        2 => {
            let scale = 1024 + rng.next_bounded(256) - 128;
            let add = rng.next_bounded(128) - 64;
            let node = arena.get_mut(gene);
            node.c1 = node.c1 * scale / 1024 + add;
        }
        _ => {
            let scale = 1024 + rng.next_bounded(256) - 128;
            let add = rng.next_bounded(128) - 64;
            let node = arena.get_mut(gene);
            node.c2 = node.c2 * scale / 1024 + add;
        }
    }
}

/// Repeatedly tweaks `gene` in place with geometrically decaying
/// probability.
pub fn tweak(arena: &mut GeneArena, gene: GeneId, rng: &mut Lcg) {
    let mut rt = 1 + rng.next_bounded(255);
    while rt < 256 {
        tweak_edit(arena, gene, rng);
        rt *= 2;
    }
}

/// Walks down the tree from `selected`, randomly choosing `prod` or `sum`
/// at each node until a null child is found, and grafts a copy of
/// `selected` there. Appends the new node to the end of the chain and
/// returns its id.
pub fn add_gene(arena: &mut GeneArena, head: GeneId, selected: GeneId, rng: &mut Lcg) -> GeneId {
    let src = arena.get(selected).clone();
    let new_id = arena.alloc(GeneNode::leaf(src.kind, src.si, src.c1, src.c2));

    let mut cur = selected;
    loop {
        let choose_prod = rng.next_bounded(2) == 0;
        let slot = if choose_prod {
            arena.get(cur).prod
        } else {
            arena.get(cur).sum
        };
        match slot {
            None => {
                if choose_prod {
                    arena.get_mut(cur).prod = Some(new_id);
                } else {
                    arena.get_mut(cur).sum = Some(new_id);
                }
                break;
            }
            Some(child) => cur = child,
        }
    }
    append_to_chain(arena, head, new_id);
    new_id
}

/// Removes `gene`'s `prod` or `sum` subtree (randomly, if both are
/// present) and returns the number of nodes removed. Never touches
/// `gene` itself, so the chain root is never detached.
pub fn prune(arena: &mut GeneArena, gene: GeneId, rng: &mut Lcg) -> usize {
    let node = arena.get(gene).clone();
    let (target, was_prod) = match (node.prod, node.sum) {
        (Some(p), Some(s)) => {
            if rng.next_bounded(2) == 0 {
                (Some(p), true)
            } else {
                (Some(s), false)
            }
        }
        (Some(p), None) => (Some(p), true),
        (None, Some(s)) => (Some(s), false),
        (None, None) => (None, true),
    };
    if target.is_some() {
        if was_prod {
            arena.get_mut(gene).prod = None;
        } else {
            arena.get_mut(gene).sum = None;
        }
    }
    disposebranch(arena, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Lcg;

    #[test]
    fn const_gene_evaluates_to_c1() {
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(1);
        let mut diags = DiagnosticLog::with_capacity(8);
        let g = new_const_chromosome(&mut arena, 42);
        assert_eq!(evaluate(&mut arena, g, &[0; NSENSES], &mut rng, &mut diags), 42);
    }

    #[test]
    fn limit_mirrors_when_inverted() {
        assert_eq!(limit_ramp(0, 0, 1024), 0);
        assert_eq!(limit_ramp(1024, 0, 1024), 1024);
        assert_eq!(limit_ramp(512, 0, 1024), 512);
        assert_eq!(limit_ramp(0, 1024, 0), 1024);
        assert_eq!(limit_ramp(1024, 1024, 0), 0);
        assert_eq!(limit_ramp(5, 5, 5), 512);
    }

    #[test]
    fn prod_and_sum_compose() {
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(1);
        let mut diags = DiagnosticLog::with_capacity(8);
        let root = new_const_chromosome(&mut arena, 1024);
        let prod = arena.alloc(GeneNode::leaf(GeneKind::Const, 0, 2048, 0));
        let sum = arena.alloc(GeneNode::leaf(GeneKind::Const, 0, 7, 0));
        arena.get_mut(root).prod = Some(prod);
        arena.get_mut(root).sum = Some(sum);
        // root=1024, *2048/1024=2048, +7 = 2055
        assert_eq!(
            evaluate(&mut arena, root, &[0; NSENSES], &mut rng, &mut diags),
            2055
        );
    }

    #[test]
    fn clone_chain_preserves_order_and_structure() {
        let mut arena = GeneArena::new();
        let a = new_const_chromosome(&mut arena, 1);
        let b = arena.alloc(GeneNode::leaf(GeneKind::Sense, 0, 2, 0));
        append_to_chain(&mut arena, a, b);
        arena.get_mut(a).prod = Some(b);

        let clone = clone_chain(&mut arena, a);
        let orig_ids = chain_ids(&arena, a);
        let clone_ids = chain_ids(&arena, clone);
        assert_eq!(orig_ids.len(), clone_ids.len());
        assert_ne!(orig_ids[0], clone_ids[0]);
        assert_eq!(arena.get(clone_ids[0]).c1, arena.get(orig_ids[0]).c1);
        assert_eq!(arena.get(clone).prod, Some(clone_ids[1]));
    }

    #[test]
    fn disposebranch_never_frees_none() {
        let mut arena = GeneArena::new();
        assert_eq!(disposebranch(&mut arena, None), 0);
    }

    #[test]
    fn prune_removes_only_child_subtree() {
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(3);
        let root = new_const_chromosome(&mut arena, 1);
        let child = arena.alloc(GeneNode::leaf(GeneKind::Const, 0, 2, 0));
        let grandchild = arena.alloc(GeneNode::leaf(GeneKind::Const, 0, 3, 0));
        arena.get_mut(root).sum = Some(child);
        arena.get_mut(child).sum = Some(grandchild);
        append_to_chain(&mut arena, root, child);
        append_to_chain(&mut arena, root, grandchild);

        let removed = prune(&mut arena, root, &mut rng);
        assert_eq!(removed, 2);
        assert_eq!(arena.get(root).sum, None);
        assert_eq!(chain_ids(&arena, root), vec![root]);
    }

    #[test]
    fn add_gene_grows_chain_by_one() {
        let mut arena = GeneArena::new();
        let mut rng = Lcg::new(9);
        let root = new_const_chromosome(&mut arena, 5);
        let before = chain_len(&arena, root);
        add_gene(&mut arena, root, root, &mut rng);
        assert_eq!(chain_len(&arena, root), before + 1);
    }
}
