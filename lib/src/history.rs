//! Per-tick statistics ring, indexed by `today mod LHIST`.

use crate::constants::LHIST;
use serde::{Deserialize, Serialize};

/// One tick's worth of population/environment statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TickStats {
    pub n_bugs: i64,
    pub movement: i64,
    pub collisions: i64,
    pub starvations: i64,
    pub births: i64,
    /// ×1024 fixed point.
    pub avgweight: i64,
    pub avgfood: i64,
    pub avggenes: i64,
}

/// Fixed-length ring of the last `LHIST` ticks' stats, overwritten in
/// place at `today mod LHIST` each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    hist: Vec<TickStats>,
}

impl History {
    pub fn new() -> Self {
        Self {
            hist: vec![TickStats::default(); LHIST],
        }
    }

    pub fn record(&mut self, today: i64, stats: TickStats) {
        self.hist[(today.rem_euclid(LHIST as i64)) as usize] = stats;
    }

    pub fn get(&self, today: i64) -> &TickStats {
        &self.hist[(today.rem_euclid(LHIST as i64)) as usize]
    }

    pub fn window(&self) -> &[TickStats] {
        &self.hist
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_get_round_trip() {
        let mut h = History::new();
        let stats = TickStats {
            n_bugs: 5,
            ..Default::default()
        };
        h.record(3, stats);
        assert_eq!(h.get(3).n_bugs, 5);
    }

    #[test]
    fn wraps_around_lhist() {
        let mut h = History::new();
        h.record(0, TickStats { n_bugs: 1, ..Default::default() });
        h.record(LHIST as i64, TickStats { n_bugs: 2, ..Default::default() });
        assert_eq!(h.get(0).n_bugs, 2);
    }
}
