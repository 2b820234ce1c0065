use std::rc::Rc;
use std::time::Duration;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use super::lrtdp::check_solved;
use super::simulator::{evaluate_round_from, simulate_round_from};
use super::*;
use crate::bellman;
use crate::config::{PlannerSpec, SolverConfig};
use crate::error::SolverError;
use crate::heuristic::{ConstantHeuristic, ZeroHeuristic};
use crate::short_sighted::{S4pStrategy, StateKind};
use crate::ssp::grid::Cell;
use crate::ssp::{GridWorld, Ssp, TabularSsp, TabularSspBuilder};
use crate::value_table::{ValueTable, ValueTableBuilder, DEFAULT_DEAD_END_VALUE};

fn zero_table() -> Rc<ValueTable<usize>> {
    Rc::new(ValueTable::new(ZeroHeuristic))
}

fn chain(len: usize) -> TabularSsp {
    let mut b = TabularSspBuilder::new(len).goal(len - 1);
    for s in 0..len - 1 {
        b = b.action(s, 1.0, &[(s + 1, 1.0)]);
    }
    b.build().unwrap()
}

/// 0 retries a coin flip (cost 1) or pays 3 to reach the goal directly.
fn retry() -> TabularSsp {
    TabularSspBuilder::new(2)
        .goal(1)
        .action(0, 1.0, &[(1, 0.5), (0, 0.5)])
        .action(0, 3.0, &[(1, 1.0)])
        .build()
        .unwrap()
}

fn grid() -> GridWorld {
    GridWorld::new(4, 4, (0, 0), (3, 3), 0.1).with_walls([(1, 1), (2, 1)])
}

fn grid_table(world: &GridWorld) -> Rc<ValueTable<Cell>> {
    let w = world.clone();
    Rc::new(ValueTable::new(move |s: &Cell| w.manhattan(s)))
}

fn tight() -> SolverConfig {
    SolverConfig::default().with_epsilon(1e-6).with_seed(11)
}

fn vi_value<P: Ssp>(ssp: P, config: &SolverConfig) -> f64 {
    let table = Rc::new(ValueTable::new(ZeroHeuristic));
    ValueIteration::new(ssp, table, config)
        .optimal_solution()
        .unwrap()
}

#[test]
fn test_vi_solves_retry() {
    let ssp = retry();
    let table = zero_table();
    let mut vi = ValueIteration::new(&ssp, Rc::clone(&table), &tight());
    assert_abs_diff_eq!(vi.optimal_solution().unwrap(), 2.0, epsilon = 1e-4);
    assert!(vi.is_converged());
    assert_eq!(vi.decide_action(&0).unwrap(), Some(0));
    assert_eq!(vi.evaluate_action(&0).unwrap(), Some(0));
    assert_eq!(vi.decide_action(&1).unwrap(), None);
}

#[test]
fn test_vi_residuals_within_epsilon() {
    let config = SolverConfig::default().with_epsilon(1e-5);
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    for _ in 0..20 {
        let ssp = TabularSsp::random(10, 3, 3, &mut rng).unwrap();
        let table = zero_table();
        let mut vi = ValueIteration::new(&ssp, Rc::clone(&table), &config);
        vi.solve().unwrap();
        for s in ssp.reachable_states() {
            if ssp.is_goal(&s) {
                continue;
            }
            let r = bellman::residual(&ssp, &table, &s, false);
            assert!(r <= 1e-5 + 1e-9, "residual {} at {}", r, s);
        }
    }
}

#[test]
fn test_vi_values_dead_ends() {
    let ssp = TabularSspBuilder::new(3)
        .goal(2)
        .action(0, 1.0, &[(1, 0.5), (2, 0.5)])
        .action(1, 1.0, &[(1, 1.0)])
        .build()
        .unwrap();
    let table = zero_table();
    let mut vi = ValueIteration::new(&ssp, Rc::clone(&table), &tight());
    vi.solve().unwrap();
    assert_eq!(table.get(&1), table.dead_end_value());
    assert_abs_diff_eq!(table.get(&0), 1.0 + 0.5 * 500.0, epsilon = 1e-6);
}

#[test]
fn test_check_solved_labels_consistent_envelope() {
    let ssp = chain(3);
    let table = zero_table();
    let solved = SolvedSet::new();
    table.update(&0, 2.0);
    table.update(&1, 1.0);
    assert!(check_solved(&ssp, &table, &solved, &0, 1e-6).unwrap());
    assert!(solved.contains(&0));
    assert!(solved.contains(&1));
    assert!(!solved.contains(&2));
}

#[test]
fn test_check_solved_failure_backs_up_envelope() {
    let ssp = chain(3);
    let table = zero_table();
    let solved = SolvedSet::new();
    assert!(!check_solved(&ssp, &table, &solved, &0, 1e-6).unwrap());
    assert!(solved.is_empty());
    assert_eq!(table.get(&0), 1.0);
}

#[test]
fn test_check_solved_labels_dead_ends() {
    let ssp = TabularSspBuilder::new(2).goal(1).build().unwrap();
    let table = zero_table();
    let solved = SolvedSet::new();
    assert!(!check_solved(&ssp, &table, &solved, &0, 1e-6).unwrap());
    assert!(solved.contains(&0));
    assert_eq!(table.get(&0), table.dead_end_value());
}

#[test]
fn test_lrtdp_solved_states_are_stable() {
    let config = tight();
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    for _ in 0..15 {
        let ssp = TabularSsp::random(8, 3, 3, &mut rng).unwrap();
        let table = zero_table();
        let mut lrtdp = Lrtdp::new(&ssp, Rc::clone(&table), &config);
        lrtdp.solve(&ssp.s0()).unwrap();
        for s in 0..ssp.num_states() {
            if !lrtdp.solved().contains(&s) || ssp.is_goal(&s) {
                continue;
            }
            let before = table.get(&s);
            bellman::update(&ssp, &table, &s);
            assert!((table.get(&s) - before).abs() <= 1e-6 + 1e-9);
        }
    }
}

#[test]
fn test_lrtdp_matches_value_iteration() {
    let config = tight();
    let mut rng = ChaCha20Rng::seed_from_u64(17);
    for _ in 0..15 {
        let ssp = TabularSsp::random(8, 3, 3, &mut rng).unwrap();
        let expected = vi_value(&ssp, &config);
        let mut lrtdp = Lrtdp::new(&ssp, zero_table(), &config);
        assert_relative_eq!(lrtdp.optimal_solution().unwrap(), expected, max_relative = 1e-3);
    }
}

#[test]
fn test_lrtdp_optimal_decision_is_solved() {
    let ssp = retry();
    let mut lrtdp = Lrtdp::new(&ssp, zero_table(), &tight());
    assert_eq!(lrtdp.decide_action(&0).unwrap(), Some(0));
    assert!(lrtdp.is_solved(&0));
    assert!(lrtdp.trials() > 0);
}

#[test]
fn test_lrtdp_modes() {
    let ssp = chain(6);
    let mut replanner =
        Lrtdp::new(&ssp, zero_table(), &SolverConfig::default()).with_mode(LrtdpMode::Replanner);
    assert_eq!(replanner.decide_action(&0).unwrap(), Some(0));
    assert_eq!(replanner.trials(), 1);

    let table = zero_table();
    let mut greedy = Lrtdp::new(&ssp, Rc::clone(&table), &SolverConfig::default())
        .with_mode(LrtdpMode::Greedy);
    assert_eq!(greedy.decide_action(&0).unwrap(), Some(0));
    assert_eq!(greedy.trials(), 0);
    assert!(greedy.train_for(Duration::from_secs(5)).unwrap());
    assert_abs_diff_eq!(table.get(&0), 5.0, epsilon = 1e-9);
}

#[test]
fn test_lrtdp_evaluation_gives_up_on_unknown_states() {
    let ssp = chain(4);
    let lrtdp = Lrtdp::new(&ssp, zero_table(), &SolverConfig::default());
    assert!(matches!(
        lrtdp.evaluate_action(&0),
        Err(SolverError::PlannerGaveUp(_))
    ));
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    let summary = evaluate_round_from(&ssp, &lrtdp, &0, 10, &mut rng).unwrap();
    assert_eq!(summary.status, EndOfRoundStatus::GaveUp);
    assert_eq!(summary.turns, 0);
}

#[test]
fn test_lrtdp_labels_hopeless_states_with_table_entry() {
    let ssp = chain(3);
    let table: Rc<ValueTable<usize>> = Rc::new(
        ValueTableBuilder::new()
            .memoize_reads(false)
            .build(ConstantHeuristic(DEFAULT_DEAD_END_VALUE)),
    );
    let mut lrtdp = Lrtdp::new(&ssp, Rc::clone(&table), &SolverConfig::default());
    assert_eq!(lrtdp.decide_action(&0).unwrap(), None);
    assert!(lrtdp.is_solved(&0));
    assert_eq!(table.find(&0), Some(DEFAULT_DEAD_END_VALUE));
    assert_eq!(lrtdp.evaluate_action(&0).unwrap(), None);
}

#[test]
fn test_lrtdp_trace_cap_still_visits_the_start() {
    let ssp = chain(3);
    let table = zero_table();
    let config = SolverConfig {
        max_trace_len: 0,
        ..SolverConfig::default()
    };
    let mut lrtdp = Lrtdp::new(&ssp, Rc::clone(&table), &config);
    lrtdp.trial(&0).unwrap();
    assert!(table.find(&0).is_some_and(|v| v >= 1.0));
    assert!(!lrtdp.is_solved(&0));
}

#[test]
fn test_lrtdp_runs_are_reproducible() {
    let mut rng = ChaCha20Rng::seed_from_u64(23);
    let ssp = TabularSsp::random(12, 3, 4, &mut rng).unwrap();
    let run = || {
        let mut lrtdp = Lrtdp::new(&ssp, zero_table(), &tight());
        let v = lrtdp.optimal_solution().unwrap();
        (v, lrtdp.trials())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_ssipp_reuses_short_sighted_ssp() {
    let ssp = chain(10);
    let mut ssipp = Ssipp::new(
        &ssp,
        zero_table(),
        S4pStrategy::MaxDepth(3),
        &SolverConfig::default(),
    );
    assert_eq!(ssipp.decide_action(&0).unwrap(), Some(0));
    assert_eq!(ssipp.rebuilds(), 1);
    assert_eq!(ssipp.decide_action(&2).unwrap(), Some(2));
    assert_eq!(ssipp.rebuilds(), 1);
    assert_eq!(
        ssipp.current_short_sighted().and_then(|s4p| s4p.kind(&3)),
        Some(StateKind::Fringe)
    );
    ssipp.decide_action(&3).unwrap();
    assert_eq!(ssipp.rebuilds(), 2);
    ssipp.init_round();
    assert!(ssipp.current_short_sighted().is_none());
    assert_eq!(ssipp.decide_action(&9).unwrap(), None);
    assert_eq!(ssipp.rebuilds(), 2);
}

#[test]
fn test_ssipp_skips_dead_ends() {
    let ssp = TabularSspBuilder::new(2).goal(1).build().unwrap();
    let mut ssipp = Ssipp::new(&ssp, zero_table(), S4pStrategy::default(), &tight());
    assert_eq!(ssipp.decide_action(&0).unwrap(), None);
    assert_eq!(ssipp.rebuilds(), 0);
}

#[test]
fn test_ssipp_reaches_grid_goal() {
    let world = grid();
    for kind in [EmbeddedKind::Lrtdp, EmbeddedKind::Vi] {
        for strategy in [
            S4pStrategy::MaxDepth(2),
            S4pStrategy::TrajectoryProbability(0.2),
            S4pStrategy::Greedy(6),
        ] {
            let mut ssipp = Ssipp::new(&world, grid_table(&world), strategy, &tight())
                .with_embedded(kind);
            let mut rng = ChaCha20Rng::seed_from_u64(1);
            let summary = simulate_round_from(&world, &mut ssipp, &world.s0(), 200, &mut rng)
                .unwrap();
            assert_eq!(summary.status, EndOfRoundStatus::Goal, "{} {}", kind, strategy);
            assert!(summary.turns >= 6);
        }
    }
}

#[test]
fn test_ssipp_training_converges_on_chain() {
    let ssp = chain(8);
    let table = zero_table();
    let mut ssipp = Ssipp::new(&ssp, Rc::clone(&table), S4pStrategy::MaxDepth(2), &tight());
    assert!(ssipp.train_for(Duration::from_secs(10)).unwrap());
    assert_abs_diff_eq!(table.get(&0), 7.0, epsilon = 1e-9);
    assert_eq!(ssipp.evaluate_action(&0).unwrap(), Some(0));
}

#[test]
fn test_ssipp_training_respects_budget() {
    // The pit at (0, 1) is hit often enough that no long goal streak forms.
    let world = GridWorld::new(1, 3, (0, 0), (0, 2), 0.0).with_pits([(0, 1)]);
    let mut ssipp = Ssipp::new(&world, grid_table(&world), S4pStrategy::MaxDepth(2), &tight());
    assert!(!ssipp.train_for(Duration::from_millis(50)).unwrap());
}

#[test]
fn test_labeled_ssipp_matches_value_iteration() {
    let config = tight();
    let mut rng = ChaCha20Rng::seed_from_u64(29);
    for strategy in [
        S4pStrategy::MaxDepth(2),
        S4pStrategy::TrajectoryProbability(0.3),
        S4pStrategy::Greedy(4),
    ] {
        for _ in 0..5 {
            let ssp = Rc::new(TabularSsp::random(8, 3, 3, &mut rng).unwrap());
            let expected = vi_value(&*ssp, &config);
            let mut planner = LabeledSsipp::new(Rc::clone(&ssp), zero_table(), strategy, &config);
            let v = planner.optimal_solution().unwrap();
            assert_relative_eq!(v, expected, max_relative = 1e-3);
            assert!(planner.is_solved(&ssp.s0()));
        }
    }
}

#[test]
fn test_labeled_ssipp_decision_solves_state_first() {
    let config = tight();
    let mut rng = ChaCha20Rng::seed_from_u64(31);
    for _ in 0..8 {
        let ssp = Rc::new(TabularSsp::random(8, 3, 3, &mut rng).unwrap());
        let s0 = ssp.s0();
        let vi_table = zero_table();
        let expected = ValueIteration::new(&*ssp, Rc::clone(&vi_table), &config)
            .optimal_solution()
            .unwrap();

        let mut planner =
            LabeledSsipp::new(Rc::clone(&ssp), zero_table(), S4pStrategy::MaxDepth(2), &config);
        assert!(!planner.is_replanner());
        let action = planner.decide_action(&s0).unwrap();
        assert!(planner.is_solved(&s0));
        assert!(!planner.is_replanner());
        if ssp.is_goal(&s0) {
            assert_eq!(action, None);
            continue;
        }
        assert!(planner.rounds() > 0);
        assert_relative_eq!(planner.value(&s0), expected, max_relative = 1e-3);
        if let Some(a) = action {
            let q = bellman::q_value(&*ssp, &vi_table, &s0, &a);
            assert_relative_eq!(q, expected, max_relative = 1e-3);
        }
    }
}

#[test]
fn test_labeled_ssipp_as_replanner_defers_labeling() {
    let ssp = Rc::new(chain(8));
    let mut planner = LabeledSsipp::new(
        Rc::clone(&ssp),
        zero_table(),
        S4pStrategy::MaxDepth(2),
        &tight(),
    )
    .with_replanner(true);
    assert_eq!(planner.decide_action(&0).unwrap(), Some(0));
    assert_eq!(planner.rounds(), 0);
    assert!(!planner.is_solved(&0));

    planner.init_round();
    let mut rng = ChaCha20Rng::seed_from_u64(4);
    let summary = simulate_round_from(&*ssp, &mut planner, &0, 100, &mut rng).unwrap();
    assert_eq!(summary.status, EndOfRoundStatus::Goal);
    assert_eq!(planner.rounds(), 0);
    assert!(planner.is_solved(&6));
    assert!(planner.is_replanner());
}

#[test]
fn test_labeled_ssipp_on_grid() {
    let world = Rc::new(grid());
    let config = tight();
    let expected = vi_value(&*world, &config);
    let mut planner = LabeledSsipp::new(
        Rc::clone(&world),
        grid_table(&world),
        S4pStrategy::MaxDepth(2),
        &config,
    )
    .with_embedded(EmbeddedKind::Vi);
    assert!(planner.train_for(Duration::from_secs(30)).unwrap());
    assert_relative_eq!(planner.value(&world.s0()), expected, max_relative = 1e-3);
    assert!(planner.rounds() > 0);

    // A solved root is acted on without planning.
    let rounds = planner.rounds();
    let mut rng = ChaCha20Rng::seed_from_u64(2);
    let summary = simulate_round_from(&*world, &mut planner, &world.s0(), 100, &mut rng).unwrap();
    assert_eq!(summary.status, EndOfRoundStatus::Goal);
    assert_eq!(planner.rounds(), rounds);
}

#[test]
fn test_simulator_statuses() {
    let ssp = chain(4);
    let mut rng = ChaCha20Rng::seed_from_u64(0);

    let mut random = RandomPlanner::new(&ssp, 0);
    let summary = simulate_round_from(&ssp, &mut random, &0, 10, &mut rng).unwrap();
    assert_eq!(summary.status, EndOfRoundStatus::Goal);
    assert_eq!(summary.turns, 3);
    assert_abs_diff_eq!(summary.cost, 3.0);

    let summary = simulate_round_from(&ssp, &mut random, &0, 2, &mut rng).unwrap();
    assert_eq!(summary.status, EndOfRoundStatus::MaxTurns);
    assert_eq!(summary.turns, 2);

    let stuck = TabularSspBuilder::new(3)
        .goal(2)
        .action(0, 1.0, &[(1, 1.0)])
        .build()
        .unwrap();
    let mut greedy = GreedyPlanner::new(&stuck, zero_table());
    let summary = simulate_round_from(&stuck, &mut greedy, &0, 10, &mut rng).unwrap();
    assert_eq!(summary.status, EndOfRoundStatus::DeadEnd);
    assert_eq!(summary.turns, 1);
}

#[test]
fn test_simulator_propagates_deadline() {
    let ssp = chain(1000);
    let mut lrtdp = Lrtdp::new(&ssp, zero_table(), &SolverConfig::default());
    let _guard = crate::deadline::arm(Duration::ZERO);
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    let res = simulate_round_from(&ssp, &mut lrtdp, &0, 100, &mut rng);
    assert!(matches!(res, Err(SolverError::DeadlineReached)));
}

#[test]
fn test_factory_planners_reach_the_goal() {
    let ssp = Rc::new(retry());
    for name in [
        "random",
        "greedy",
        "vi",
        "lrtdp",
        "glrtdp",
        "ssipp:lrtdp:max_depth:2",
        "ssipp:0.001:vi:min_prob_traj:0.1",
        "labeledssipp:greedy:3",
        "labeledssipp:vi:random_max_depth:1,3",
    ] {
        let spec: PlannerSpec = name.parse().unwrap();
        let mut planner =
            create_planner(Rc::clone(&ssp), &spec, ZeroHeuristic, &tight()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let summary = simulate_round_from(&*ssp, &mut *planner, &0, 500, &mut rng).unwrap();
        assert_eq!(summary.status, EndOfRoundStatus::Goal, "{}", name);
    }
}

#[test]
fn test_factory_rejects_invalid_config() {
    let ssp = Rc::new(retry());
    let res = create_planner(
        ssp,
        &PlannerSpec::Vi,
        ZeroHeuristic,
        &SolverConfig::default().with_epsilon(-1.0),
    );
    assert!(matches!(res, Err(SolverError::InvalidConfig(_))));
}

#[test]
fn test_solved_set_is_shared_by_clones() {
    let a: SolvedSet<u8> = SolvedSet::new();
    let b = a.clone();
    assert!(a.insert(3));
    assert!(!b.insert(3));
    assert_eq!(b.len(), 1);
    b.clear();
    assert!(a.is_empty());
}
