use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use ssipp::bellman;
use ssipp::heuristic::ZeroHeuristic;
use ssipp::ssp::{Ssp, TabularSsp};
use ssipp::value_table::{ValueTable, ValueTableBuilder};

fn random_model(num_states: usize) -> TabularSsp {
    let mut rng = ChaCha20Rng::seed_from_u64(42);
    TabularSsp::random(num_states, 4, 8, &mut rng).unwrap()
}

fn bench_update_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("bellman_update_sweep");
    for size in [100, 1_000, 10_000] {
        let ssp = random_model(size);
        let states: Vec<usize> = (0..size).filter(|s| !ssp.is_goal(s)).collect();
        let table = ValueTable::new(ZeroHeuristic);
        group.bench_with_input(BenchmarkId::from_parameter(size), &states, |b, states| {
            b.iter(|| {
                for s in states {
                    black_box(bellman::update(&ssp, &table, s));
                }
            })
        });
    }
    group.finish();
}

fn bench_read_policy(c: &mut Criterion) {
    let ssp = random_model(1_000);
    let states: Vec<usize> = (0..1_000).filter(|s| !ssp.is_goal(s)).collect();
    let mut group = c.benchmark_group("bellman_min_q_read_policy");
    for memoize in [true, false] {
        let table: ValueTable<usize> = ValueTableBuilder::new()
            .memoize_reads(memoize)
            .build(|s: &usize| (*s % 7) as f64);
        group.bench_with_input(BenchmarkId::from_parameter(memoize), &states, |b, states| {
            b.iter(|| {
                for s in states {
                    black_box(bellman::min_q_value(&ssp, &table, s));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_update_sweep, bench_read_policy);
criterion_main!(benches);
