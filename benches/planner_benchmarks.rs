use std::rc::Rc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ssipp::config::SolverConfig;
use ssipp::planner::{LabeledSsipp, Lrtdp, OptimalPlanner, ValueIteration};
use ssipp::short_sighted::S4pStrategy;
use ssipp::ssp::grid::Cell;
use ssipp::ssp::GridWorld;
use ssipp::value_table::ValueTable;

fn world(side: i32) -> GridWorld {
    let walls: Vec<Cell> = (1..side - 1).map(|r| (r, side / 2)).collect();
    GridWorld::new(side, side, (0, 0), (side - 1, side - 1), 0.1).with_walls(walls)
}

fn table(world: &GridWorld) -> Rc<ValueTable<Cell>> {
    let w = world.clone();
    Rc::new(ValueTable::new(move |s: &Cell| w.manhattan(s)))
}

fn bench_optimal_planners(c: &mut Criterion) {
    let config = SolverConfig::default().with_epsilon(1e-4);
    let mut group = c.benchmark_group("grid_optimal_solution");
    group.sample_size(10);
    for side in [8, 16] {
        let grid = Rc::new(world(side));
        group.bench_with_input(BenchmarkId::new("vi", side), &grid, |b, grid| {
            b.iter(|| {
                ValueIteration::new(&**grid, table(grid), &config)
                    .optimal_solution()
                    .unwrap()
            })
        });
        group.bench_with_input(BenchmarkId::new("lrtdp", side), &grid, |b, grid| {
            b.iter(|| {
                Lrtdp::new(&**grid, table(grid), &config)
                    .optimal_solution()
                    .unwrap()
            })
        });
        for strategy in [S4pStrategy::MaxDepth(4), S4pStrategy::TrajectoryProbability(0.1)] {
            let id = BenchmarkId::new(format!("labeled_ssipp/{}", strategy), side);
            group.bench_with_input(id, &grid, |b, grid| {
                b.iter(|| {
                    LabeledSsipp::new(Rc::clone(grid), table(grid), strategy, &config)
                        .optimal_solution()
                        .unwrap()
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_optimal_planners);
criterion_main!(benches);
