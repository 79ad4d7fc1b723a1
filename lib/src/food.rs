//! Seasonal food growth, spread and decay. The single floating-point
//! computation in the engine lives here (`fgf`).

use crate::hex::step;
use crate::params::Params;
use crate::world::World;

const ROT: [i64; 4] = [988, 973, 1012, 1023];
/// All six hex facings, in the order growth spreads to neighbors.
const DIRECTIONS: [i32; 6] = [0, 1, 2, 3, -2, -1];

/// Per-tick aggregates gathered during the food pass, for the history
/// ring.
#[derive(Debug, Default, Clone, Copy)]
pub struct FoodTotals {
    pub total_food: i64,
    pub total_bugs: i64,
    pub total_genes: i64,
}

fn growth_multiplier(x: i32, y: i32, wx: i32, wy: i32, today: i64, params: &Params) -> i64 {
    let sax = (x as i64 + today * wx as i64 / params.season).rem_euclid(wx as i64);
    let fgf = 0.1
        + params.foodhump * (std::f64::consts::PI * sax as f64 / wx as f64).sin()
            * (0.51 - 0.5 * (6.0 * std::f64::consts::PI * y as f64 / wy as f64).cos());
    (((params.foodgrow - 1024) as f64 * fgf).round() as i64) + 1024
}

/// Whether a cell's nearest-bug value puts it outside the "leak shadow":
/// not near a bug, or near one but past the configured `leak` threshold.
fn outside_leak_shadow(nearest: i32, leak: i64) -> bool {
    nearest == -1 || nearest as i64 > leak
}

/// Runs one tick of food growth, decay and spread over the whole grid,
/// row-major as the determinism contract requires.
pub fn grow_food(world: &mut World, params: &Params) -> FoodTotals {
    world.recompute_nearest();
    let mut totals = FoodTotals::default();

    for y in 0..world.wy {
        for x in 0..world.wx {
            let pos = crate::hex::Pos::new(x, y);
            let nearest = world.cell(pos).nearest;
            let g = growth_multiplier(x, y, world.wx, world.wy, world.today, params);

            let mut food = world.cell(pos).food;
            if outside_leak_shadow(nearest, params.leak) {
                food = food * g / 1024;
            } else {
                food = food * ROT[0] / 1024;
            }

            if food > params.foodcap {
                food -= (food - params.foodcap) * params.fooddecay / 1024;
            }
            food = food.min(params.food_hard_cap);
            world.cell_mut(pos).food = food;

            for &face in DIRECTIONS.iter() {
                let np = step(pos, face, world.wx, world.wy);
                let current = world.cell(pos).food;
                let neighbor = world.cell(np);
                if neighbor.food < current / 16 && outside_leak_shadow(neighbor.nearest, params.leak) {
                    let t = current * params.foodspread / 1024;
                    world.cell_mut(pos).food = (world.cell(pos).food - t).max(0);
                    world.cell_mut(np).food = (world.cell(np).food + t).min(params.food_hard_cap);
                }
            }

            totals.total_food += world.cell(pos).food;
            if let Some(bug_id) = world.cell(pos).bug {
                totals.total_bugs += 1;
                totals.total_genes += world.get(bug_id).brain.ngenes as i64;
            }
        }
    }

    totals
}
