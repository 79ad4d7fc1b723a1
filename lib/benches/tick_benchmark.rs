use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hexbugs_core::constants::NSENSES;
use hexbugs_core::diagnostics::DiagnosticLog;
use hexbugs_core::engine::Engine;
use hexbugs_core::gene::{evaluate, new_const_chromosome, GeneArena, GeneKind, GeneNode};
use hexbugs_core::rng::Lcg;

fn tick_lone_bug(c: &mut Criterion) {
    let mut engine = Engine::genesis(0xff);
    c.bench_function("tick (lone bug)", |b| {
        b.iter(|| black_box(engine.tick()))
    });
}

fn tick_grown_population(c: &mut Criterion) {
    let mut engine = Engine::genesis(0xff);
    for _ in 0..3000 {
        engine.tick();
    }
    c.bench_function("tick (grown population)", |b| {
        b.iter(|| black_box(engine.tick()))
    });
}

fn gene_eval_shallow(c: &mut Criterion) {
    let mut arena = GeneArena::new();
    let mut rng = Lcg::new(1);
    let mut diags = DiagnosticLog::with_capacity(8);
    let senses = [512i64; NSENSES];
    let g = new_const_chromosome(&mut arena, 42);

    c.bench_function("gene eval (const leaf)", |b| {
        b.iter(|| black_box(evaluate(&mut arena, g, &senses, &mut rng, &mut diags)))
    });
}

fn gene_eval_deep(c: &mut Criterion) {
    let mut arena = GeneArena::new();
    let mut rng = Lcg::new(1);
    let mut diags = DiagnosticLog::with_capacity(8);
    let senses = [512i64; NSENSES];

    let root = new_const_chromosome(&mut arena, 100);
    let mut cur = root;
    for i in 0..64 {
        let next = arena.alloc(GeneNode::leaf(GeneKind::Sense, i % NSENSES, 100, 10));
        arena.get_mut(cur).sum = Some(next);
        cur = next;
    }

    c.bench_function("gene eval (64-deep sum chain)", |b| {
        b.iter(|| black_box(evaluate(&mut arena, root, &senses, &mut rng, &mut diags)))
    });
}

criterion_group!(
    benches,
    tick_lone_bug,
    tick_grown_population,
    gene_eval_shallow,
    gene_eval_deep
);
criterion_main!(benches);
