#![no_main]

use hexbugs_core::engine::Engine;
use hexbugs_core::hex::Pos;
use libfuzzer_sys::fuzz_target;
use memory_stats::memory_stats;
use std::time::{Duration, Instant};

fn seed_from_bytes(data: &[u8]) -> u64 {
    data.iter()
        .fold(0x9e3779b97f4a7c15u64, |acc, &b| {
            acc.wrapping_mul(1099511628211).wrapping_add(b as u64)
        })
}

/// Checks the universal invariants that must hold after every tick: one
/// bug per occupied cell, cell/bug occupancy agreement, food bounds,
/// and brain gene-count bookkeeping.
fn check_invariants(engine: &Engine) {
    let world = engine.world();
    let mut occupied = 0usize;
    for y in 0..world.wy {
        for x in 0..world.wx {
            let pos = Pos::new(x, y);
            let cell = world.cell(pos);
            assert!(cell.food >= 0 && cell.food <= engine.params().food_hard_cap);
            if let Some(id) = cell.bug {
                occupied += 1;
                assert_eq!(world.get(id).position(), pos);
            }
        }
    }
    assert_eq!(occupied, world.len());

    for id in world.ids_in_order() {
        let bug = world.get(id);
        assert!(bug.weight() >= 1);
        assert!(bug.brain.ngenes >= 1);
    }
}

// Seeds an engine from fuzzer-provided bytes and runs tick() in a loop,
// asserting the universal invariants every tick instead of relying on a
// crash to surface a bug. Runs under a bounded-memory watchdog.
fuzz_target!(|data: &[u8]| {
    let seed = seed_from_bytes(data);
    let mut engine = Engine::genesis(seed);

    std::thread::spawn(|| loop {
        if let Some(usage) = memory_stats() {
            if usage.physical_mem > 512 * 1024 * 1024 {
                panic!("Current memory usage exceeds limit: {:?}", usage);
            }
        } else {
            panic!("Couldn't get the current memory usage");
        }
        std::thread::sleep(Duration::from_secs(1));
    });

    let mut last_log = Instant::now();
    let mut i: usize = 0;
    while engine.world().len() > 0 && i < 20_000 {
        engine.tick();
        check_invariants(&engine);

        let now = Instant::now();
        if i % 1000 == 0 || now - last_log > Duration::from_secs(5) {
            println!(
                "tick {}, population: {}, food diagnostics dropped: {}",
                engine.today(),
                engine.world().len(),
                engine.diagnostics_dropped(),
            );
            last_log = now;
        }
        i += 1;
    }
});
