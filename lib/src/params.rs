//! Runtime configuration: every named constant from the data model plus
//! the scheduler's mutable scalars, built as configuration-by-value
//! rather than a config-file layer.

use crate::constants::*;
use serde::{Deserialize, Serialize};

/// All tunable quantities the engine reads. `Default` reproduces the
/// reference values; presets and the simulator CLI build a `Params` by
/// starting from `Params::default()` and overriding fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Params {
    pub wx: i32,
    pub wy: i32,
    pub season: i64,

    pub foodcap: i64,
    pub foodgrow: i64,
    pub foodspread: i64,
    pub foodstart: i64,
    pub fooddecay: i64,
    pub food_hard_cap: i64,

    pub nom: i64,
    pub sleep_cost: i64,
    pub eat_cost: i64,
    pub turn_cost: i64,
    pub move_cost: i64,
    pub fight_cost: i64,
    pub divide_cost: i64,

    pub diethin: i64,
    pub masscap: i64,
    pub eatlimit_num: i64,

    pub genecost: i64,
    pub geneknee: i64,

    pub ethnic_dur: i64,
    pub pop_hardlimit: i64,

    /// Minimum age (in ticks) before `Divide` is honored, when
    /// `forcemate`'s age-gate bit is set. Re-evaluated every tick by the
    /// scheduler's age-of-oldest regulator.
    pub agediv: i64,
    /// Bitmap gating/penalizing `Divide` and `Mate`.
    pub forcemate: u8,
    /// Seasonal food-growth-shape multiplier (`fgf`).
    pub foodhump: f64,
    /// Current per-use cost of `Mate`, retuned by the dynamic schedule.
    pub costmate: i64,
    /// Population the `agediv` regulator holds steady toward.
    pub target_pop: i64,
    /// Nearest-bug-distance threshold past which a cell still grows food
    /// normally; negative means "always grow" until the schedule lowers
    /// it (`nearest` is only ever `0` or `-1`, so only the sign of `leak`
    /// is ever observable — see DESIGN.md).
    pub leak: i64,
    /// When set, `Move` into an occupied cell stops instead of fighting.
    pub safety: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            wx: WX,
            wy: WY,
            season: SEASON,

            foodcap: FOODCAP,
            foodgrow: FOODGROW,
            foodspread: FOODSPREAD,
            foodstart: FOODSTART,
            fooddecay: FOODDECAY,
            food_hard_cap: FOOD_HARD_CAP,

            nom: NOM,
            sleep_cost: SLEEP_COST,
            eat_cost: EAT_COST,
            turn_cost: TURN_COST,
            move_cost: MOVE_COST,
            fight_cost: FIGHT_COST,
            divide_cost: DIVIDE_COST,

            diethin: DIETHIN,
            masscap: MASSCAP,
            eatlimit_num: EATLIMIT_NUM,

            genecost: GENECOST,
            geneknee: GENEKNEE,

            ethnic_dur: ETHNIC_DUR,
            pop_hardlimit: POP_HARDLIMIT,

            agediv: 0,
            forcemate: 0,
            foodhump: 1.0,
            costmate: MATE_COST_INITIAL,
            target_pop: 1000,
            leak: -1,
            safety: true,
        }
    }
}
