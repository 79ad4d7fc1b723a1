//! Diploid decision brain: two chromosomes per decision, a chromosome
//! selector bitmap, ancestry window, and the top-level mutation operator.

use crate::constants::{FAMHIST, NDEC};
use crate::diagnostics::DiagnosticLog;
use crate::ethnicity::Ethnicity;
use crate::gene::{
    add_gene, chain_len, clone_chain, dispose_chromosome, evaluate, prune, random_gene_in_chain,
    tweak, GeneArena, GeneId,
};
use crate::rng::Lcg;
use serde::{Deserialize, Serialize};

/// Decisions, in `act` index order (`NDEC=8`).
pub const SLEEP: usize = 0;
pub const EAT: usize = 1;
pub const TURN_CW: usize = 2;
pub const TURN_CCW: usize = 3;
pub const MOVE: usize = 4;
pub const MATE: usize = 5;
pub const DIVIDE: usize = 6;
pub const MATE_RESPONSE: usize = 7;

/// One diploid chromosome pair for a single decision, with the ethnicity
/// stamp of whichever parent's mutation last touched each side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecisionGenes {
    pub a: GeneId,
    pub b: GeneId,
    pub ea: Ethnicity,
    pub eb: Ethnicity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brain {
    pub act: [DecisionGenes; NDEC],
    pub family: [Ethnicity; FAMHIST],
    pub eth: Ethnicity,
    pub generation: u32,
    /// Number of pieces `Divide` splits into; bounded to `[2,7]`.
    pub divide: i64,
    /// `Σ` chain lengths across every chromosome this brain owns.
    pub ngenes: usize,
    /// Bit `i` selects chromosome A for decision `i` (0..=6) if set, else B.
    pub expression: u8,
}

impl Brain {
    /// Recomputes `ngenes` from the arena; used after construction and in
    /// invariant checks.
    pub fn recount_genes(&mut self, arena: &GeneArena) {
        self.ngenes = self
            .act
            .iter()
            .map(|d| chain_len(arena, d.a) + chain_len(arena, d.b))
            .sum();
    }

    /// Evaluates decisions `0..=6` and returns the index of the winner,
    /// ties going to the smallest index.
    pub fn decide(
        &self,
        arena: &mut GeneArena,
        senses: &[i64],
        rng: &mut Lcg,
        diagnostics: &mut DiagnosticLog,
    ) -> usize {
        let mut best_i = 0usize;
        let mut best_v = i64::MIN;
        for i in 0..=DIVIDE {
            let use_a = (self.expression >> i) & 1 == 1;
            let head = if use_a { self.act[i].a } else { self.act[i].b };
            let v = evaluate(arena, head, senses, rng, diagnostics);
            if v > best_v {
                best_v = v;
                best_i = i;
            }
        }
        best_i
    }

    /// Sums both the A and B mate-response chromosomes, seen from the
    /// responder's own senses.
    pub fn mate_response(
        &self,
        arena: &mut GeneArena,
        senses: &[i64],
        rng: &mut Lcg,
        diagnostics: &mut DiagnosticLog,
    ) -> i64 {
        let d = &self.act[MATE_RESPONSE];
        evaluate(arena, d.a, senses, rng, diagnostics) + evaluate(arena, d.b, senses, rng, diagnostics)
    }

    /// Top-level mutation operator: a geometrically-decaying number of
    /// single mutations.
    pub fn mutate(&mut self, arena: &mut GeneArena, rng: &mut Lcg) {
        let mut r = 1 + rng.next_bounded(16383);
        while r < 16384 {
            self.mutate_once(arena, rng);
            r *= 2;
        }
    }

    fn mutate_once(&mut self, arena: &mut GeneArena, rng: &mut Lcg) {
        let n = rng.next_bounded(NDEC as i64 + 1);
        if n as usize == NDEC {
            let delta = rng.next_bounded(3) - 1;
            self.divide = bounce(self.divide + delta, 2, 7);
            return;
        }
        let dec = n as usize;
        let use_a = rng.next_bounded(2) == 0;
        let chain_head = {
            let entry = &mut self.act[dec];
            if use_a {
                entry.ea = self.eth;
                entry.a
            } else {
                entry.eb = self.eth;
                entry.b
            }
        };
        let gene = random_gene_in_chain(arena, chain_head, rng);

        if rng.next_bounded(2) == 0 {
            tweak(arena, gene, rng);
        } else if rng.next_bounded(4) < 3 {
            let new_id = add_gene(arena, chain_head, gene, rng);
            self.ngenes += 1;
            if rng.next_bounded(2) == 0 {
                tweak(arena, new_id, rng);
            }
        } else {
            let removed = prune(arena, gene, rng);
            self.ngenes -= removed;
        }
    }
}

/// Reflects a value back into `[lo, hi]` instead of clamping -- the
/// reference source calls this "bounce"; since a single mutation only
/// ever moves `divide` by at most one step from an already-valid value,
/// this is observationally identical to a clamp here, but is expressed
/// as a reflection in case the step size ever grows.
fn bounce(v: i64, lo: i64, hi: i64) -> i64 {
    if v < lo {
        lo + (lo - v)
    } else if v > hi {
        hi - (v - hi)
    } else {
        v
    }
    .clamp(lo, hi)
}

/// Builds the `family` ancestry window for a new child: slot 0 is the
/// mother, slot 1 the father, and each deeper generation doubles into the
/// next pair of slots by copying forward from both parents' own windows.
pub fn build_family(parent: &Brain, mate: &Brain) -> [Ethnicity; FAMHIST] {
    let mut fam = [parent.eth; FAMHIST];
    fam[0] = parent.eth;
    fam[1] = mate.eth;
    let mut k = 1usize;
    while 2 * k < FAMHIST {
        fam[2 * k] = parent.family[k - 1];
        if 2 * k + 1 < FAMHIST {
            fam[2 * k + 1] = mate.family[k - 1];
        }
        k += 1;
    }
    fam
}

fn count_intersection(xs: &[Ethnicity], ys: &[Ethnicity]) -> usize {
    let set: std::collections::HashSet<u64> = ys.iter().map(|e| e.uid).collect();
    xs.iter().filter(|e| set.contains(&e.uid)).count()
}

/// Family-uid similarity between two brains at cell-level `level`
/// (0=self, 1=one step ahead, 2=two-ahead/flanks, 3=everything else),
/// clamped into `[0, 1024]`.
pub fn family_match(a: &Brain, b: &Brain, level: u8) -> i64 {
    if level == 0 {
        return 1024;
    }
    let parent_matches = count_intersection(&a.family[0..2], &b.family[0..2]);
    if parent_matches >= 2 {
        return 1024;
    }
    let mut score = parent_matches as i64 * 256;
    if level >= 2 {
        score += count_intersection(&a.family[2..6], &b.family[2..6]) as i64 * 64;
    }
    if level >= 3 {
        score += count_intersection(&a.family[6..14], &b.family[6..14]) as i64 * 16;
        score += count_intersection(&a.family[14..30], &b.family[14..30]) as i64 * 4;
        score += count_intersection(&a.family[30..63], &b.family[30..63]) as i64;
    }
    score.min(1024)
}

/// Structural deep copy: every chromosome chain is cloned gene-by-gene in
/// chain order.
pub fn copy_brain(arena: &mut GeneArena, src: &Brain) -> Brain {
    let mut act = [DecisionGenes {
        a: 0,
        b: 0,
        ea: src.eth,
        eb: src.eth,
    }; NDEC];
    for i in 0..NDEC {
        act[i] = DecisionGenes {
            a: clone_chain(arena, src.act[i].a),
            b: clone_chain(arena, src.act[i].b),
            ea: src.act[i].ea,
            eb: src.act[i].eb,
        };
    }
    Brain {
        act,
        family: src.family,
        eth: src.eth,
        generation: src.generation,
        divide: src.divide,
        ngenes: src.ngenes,
        expression: src.expression,
    }
}

/// Frees every gene owned by `brain`. Callers must ensure no other brain
/// still shares these chains (they never do: every copy is a deep copy).
pub fn dispose_brain(arena: &mut GeneArena, brain: &Brain) {
    for d in brain.act.iter() {
        dispose_chromosome(arena, d.a);
        dispose_chromosome(arena, d.b);
    }
}

/// Builds a brain from `NDEC` already-allocated `(a, b)` chromosome pairs,
/// e.g. from a hand-authored genesis table (see `presets`).
pub fn from_chromosomes(
    arena: &GeneArena,
    chromosomes: [(GeneId, GeneId); NDEC],
    eth: Ethnicity,
    divide: i64,
    expression: u8,
) -> Brain {
    let act: Vec<DecisionGenes> = chromosomes
        .into_iter()
        .map(|(a, b)| DecisionGenes { a, b, ea: eth, eb: eth })
        .collect();
    let act: [DecisionGenes; NDEC] = act.try_into().unwrap();
    let mut brain = Brain {
        act,
        family: [eth; FAMHIST],
        eth,
        generation: 0,
        divide,
        ngenes: 0,
        expression,
    };
    brain.recount_genes(arena);
    brain
}
