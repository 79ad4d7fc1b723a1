//! Reference constant values from the data model.
//!
//! These are the defaults `Params` is built from; nothing in the engine
//! reads them directly except `Params::default()` and `presets`.

/// World width in cells.
pub const WX: i32 = 192;
/// World height in cells.
pub const WY: i32 = 160;

/// Ticks per simulated year.
pub const SEASON: i64 = 32_768;

/// Soft food ceiling per cell (×1024 fixed point).
pub const FOODCAP: i64 = 1_024_000;
/// Growth multiplier numerator (per 1024).
pub const FOODGROW: i64 = 1044;
/// Per-mille transfer rate to neighboring cells.
pub const FOODSPREAD: i64 = 10;
/// Initial food level for freshly-reset cells.
pub const FOODSTART: i64 = 128_000;
/// Over-cap decay rate (per 1024).
pub const FOODDECAY: i64 = 115;
/// Hard ceiling on cell food, independent of the soft cap.
pub const FOOD_HARD_CAP: i64 = 10 * FOODCAP;

/// Nominal bug mass the costs below are calibrated against.
pub const NOM: i64 = 1024;

pub const SLEEP_COST: i64 = 12;
pub const EAT_COST: i64 = 48;
pub const TURN_COST: i64 = 16;
pub const MOVE_COST: i64 = 96;
pub const FIGHT_COST: i64 = 36;
pub const MATE_COST_INITIAL: i64 = 12;
/// Weight charged to the parent per child produced by `Divide`.
pub const DIVIDE_COST: i64 = 25_600;

/// Weight below which a bug starves.
pub const DIETHIN: i64 = 102_400;
/// Hard ceiling on bug weight.
pub const MASSCAP: i64 = 10_240_000;
/// Eat intake fraction of weight, as a numerator over 1024.
pub const EATLIMIT_NUM: i64 = 205;

/// Upkeep cost rate for carrying genes past `GENEKNEE` (weight units per
/// `GENECOST` excess genes, charged once per tick alongside the decision's
/// nominal cost -- see `action::gene_upkeep_cost`).
pub const GENECOST: i64 = 128;
/// Gene count below which no upkeep is charged.
pub const GENEKNEE: i64 = 96;

/// Length of a bug's position/action history ring.
pub const POSHISTORY: usize = 32;
/// Length of a brain's family-ancestry window.
pub const FAMHIST: usize = 126;
/// Length of the engine-wide tick-statistics ring.
pub const LHIST: usize = 1024;

/// Count of decisions a brain holds chromosome pairs for (0..=6 are
/// self-decisions, 7 is the mate-response chromosome).
pub const NDEC: usize = 8;
/// Count of loggable action indices (the 7 real decisions plus two
/// logging-only outcomes, `Mated` and `Defend`).
pub const NACT: usize = 9;

/// Ticks over which ethnicity channels must sum to at least this much.
pub const ETHNIC_DUR: i64 = 120;

/// Sense vector length: 12 cells × 4 senses, plus NACT time-since-act
/// senses, plus the three scalar self-senses.
pub const NSENSES: usize = 12 * 4 + NACT + 3;
pub const NSENSECELLS: usize = 12;

/// Hard population ceiling that forces the age-of-oldest regulator.
pub const POP_HARDLIMIT: i64 = 20_000;
