//! The three construction strategies.
//!
//! All of them insert a successor into the S4P as soon as it is generated,
//! before its own status is decided. If a budget stops the construction, the
//! states still waiting in the frontier are closed as fringe, which keeps
//! every internal state's successors inside the S4P.

use super::{BuildBudget, ShortSightedSsp, StateKind};
use crate::deadline::Ticker;
use crate::error::Result;
use crate::prob_dist::{HashDist, ProbDist, VecDist};
use crate::ssp::Ssp;
use crate::value_table::ValueTable;
use log::{debug, warn};
use ordered_float::OrderedFloat;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Instant;

/// Polls the build budget and the global deadline.
struct BuildClock {
    started: Instant,
    budget: BuildBudget,
    ticker: Ticker,
}

impl BuildClock {
    fn start(budget: &BuildBudget) -> Self {
        Self {
            started: Instant::now(),
            budget: *budget,
            ticker: Ticker::default(),
        }
    }

    /// Whether the S4P, currently of `size` states, must stop growing.
    fn exhausted(&mut self, size: usize) -> Result<bool> {
        self.ticker.tick()?;
        let too_big = self.budget.max_states.is_some_and(|max| size >= max);
        let too_slow = self
            .budget
            .max_time
            .is_some_and(|max| self.started.elapsed() >= max);
        Ok(too_big || too_slow)
    }
}

/// Heap entry ordered by `priority`, earliest insertion first on ties.
struct Entry<S, K> {
    priority: K,
    seq: Reverse<u64>,
    state: S,
}

impl<S, K: Ord> PartialEq for Entry<S, K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<S, K: Ord> Eq for Entry<S, K> {}

impl<S, K: Ord> PartialOrd for Entry<S, K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S, K: Ord> Ord for Entry<S, K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Max-heap of entries with a FIFO tie-break.
struct Frontier<S, K> {
    heap: BinaryHeap<Entry<S, K>>,
    next_seq: u64,
}

impl<S, K: Ord> Frontier<S, K> {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    fn push(&mut self, state: S, priority: K) {
        self.heap.push(Entry {
            priority,
            seq: Reverse(self.next_seq),
            state,
        });
        self.next_seq += 1;
    }

    fn pop(&mut self) -> Option<(S, K)> {
        self.heap.pop().map(|e| (e.state, e.priority))
    }
}

impl<P: Ssp> ShortSightedSsp<P> {
    /// Adds `s` as internal if it is new. Returns whether it was new.
    fn insert_state(&mut self, s: &P::State) -> bool {
        if self.members.contains_key(s) {
            false
        } else {
            self.members.insert(s.clone(), StateKind::Internal);
            true
        }
    }

    fn set_kind(&mut self, s: &P::State, kind: StateKind) {
        self.members.insert(s.clone(), kind);
    }

    /// Closes a non-root state without applicable actions as fringe, priced
    /// at the dead-end value.
    fn close_dead_end(&mut self, s: &P::State) {
        self.set_kind(s, StateKind::Fringe);
        self.table.update(s, self.table.dead_end_value());
    }

    /// Closes a state left in the frontier by an interrupted construction.
    fn force_close(&mut self, s: &P::State) {
        if self.kind(s) != Some(StateKind::Internal) {
            return;
        }
        if !self.base.is_goal(s) && !self.base.has_applicable_actions(s) {
            self.close_dead_end(s);
        } else {
            self.set_kind(s, StateKind::Fringe);
        }
    }

    /// Inserts every successor of `s` that is new, calling `on_new` for each.
    fn expand_state<F>(&mut self, s: &P::State, dist: &mut VecDist<P::State>, mut on_new: F)
    where
        F: FnMut(&mut Self, P::State),
    {
        let actions: Vec<P::Action> = self.base.applicable_actions(s).collect();
        for a in &actions {
            self.base.expand(a, s, dist);
            for (succ, _) in dist.iter() {
                if self.insert_state(succ) {
                    on_new(self, succ.clone());
                }
            }
        }
    }

    fn log_built(&self) {
        debug!(
            "built {}: {} states, {} fringe",
            self.name,
            self.members.len(),
            self.fringe_states().count()
        );
        if self.truncated {
            warn!("construction of {} was cut short by its budget", self.name);
        }
    }

    /// Breadth-first S4P holding every state at most `max_depth` steps away
    /// from `root`.
    ///
    /// States at depth `max_depth` and original goals are fringe.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DeadlineReached`](crate::error::SolverError::DeadlineReached)
    /// if the armed deadline expires during construction.
    ///
    /// # Panics
    ///
    /// Panics if `max_depth` is zero.
    pub fn max_depth(
        base: P,
        root: P::State,
        table: Rc<ValueTable<P::State>>,
        max_depth: usize,
        budget: &BuildBudget,
    ) -> Result<Self> {
        assert!(max_depth > 0, "max depth must be positive");
        let mut s4p = Self::empty(base, root.clone(), table, "max-depth S4P");
        let mut clock = BuildClock::start(budget);
        let mut dist = VecDist::new();
        let mut queue: VecDeque<(P::State, usize)> = VecDeque::new();

        s4p.insert_state(&root);
        queue.push_back((root, 0));
        let mut popped = 0usize;
        while let Some((s, depth)) = queue.pop_front() {
            if popped > 0 && clock.exhausted(s4p.members.len())? {
                queue.push_front((s, depth));
                s4p.truncated = true;
                break;
            }
            popped += 1;

            if s4p.base.is_goal(&s) {
                s4p.set_kind(&s, StateKind::Fringe);
            } else if !s4p.base.has_applicable_actions(&s) {
                if popped > 1 {
                    s4p.close_dead_end(&s);
                }
            } else if depth >= max_depth {
                s4p.set_kind(&s, StateKind::Fringe);
            } else {
                s4p.expand_state(&s, &mut dist, |_, succ| queue.push_back((succ, depth + 1)));
            }
        }
        for (s, _) in queue {
            s4p.force_close(&s);
        }
        s4p.log_built();
        Ok(s4p)
    }

    /// S4P holding every state reachable from `root` through a trajectory of
    /// probability at least `min_p`.
    ///
    /// States are expanded by decreasing trajectory probability. A state
    /// first reached with probability below `min_p` is fringe; it is reopened
    /// if a later trajectory reaches it with probability at least `min_p`.
    /// Original goals are never reopened.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DeadlineReached`](crate::error::SolverError::DeadlineReached)
    /// if the armed deadline expires during construction.
    ///
    /// # Panics
    ///
    /// Panics if `min_p` is not in `(0, 1]`.
    pub fn trajectory_based(
        base: P,
        root: P::State,
        table: Rc<ValueTable<P::State>>,
        min_p: f64,
        budget: &BuildBudget,
    ) -> Result<Self> {
        assert!(
            min_p > 0.0 && min_p <= 1.0,
            "minimum trajectory probability must be in (0, 1], got {}",
            min_p
        );
        let mut s4p = Self::empty(base, root.clone(), table, "trajectory-based S4P");
        let mut clock = BuildClock::start(budget);
        let mut dist = HashDist::new();
        // (still open, best trajectory probability)
        let mut info: HashMap<P::State, (bool, f64)> = HashMap::new();
        let mut frontier: Frontier<P::State, OrderedFloat<f64>> = Frontier::new();

        s4p.insert_state(&root);
        info.insert(root.clone(), (true, 1.0));
        frontier.push(root.clone(), OrderedFloat(1.0));
        let mut popped = 0usize;
        while let Some((s, OrderedFloat(p))) = frontier.pop() {
            if popped > 0 && clock.exhausted(s4p.members.len())? {
                frontier.push(s, OrderedFloat(p));
                s4p.truncated = true;
                break;
            }
            popped += 1;

            match info.get_mut(&s) {
                Some(entry) if entry.0 => entry.0 = false,
                // Stale duplicate of an already expanded state.
                _ => continue,
            }
            if s4p.base.is_goal(&s) {
                s4p.set_kind(&s, StateKind::Fringe);
                continue;
            }
            if !s4p.base.has_applicable_actions(&s) {
                if s != root {
                    s4p.close_dead_end(&s);
                }
                continue;
            }

            let actions: Vec<P::Action> = s4p.base.applicable_actions(&s).collect();
            for a in &actions {
                s4p.base.expand(a, &s, &mut dist);
                for (succ, ps) in dist.iter() {
                    let q = p * ps;
                    if s4p.insert_state(succ) {
                        if s4p.base.is_goal(succ) || q < min_p {
                            s4p.set_kind(succ, StateKind::Fringe);
                            info.insert(succ.clone(), (false, q));
                        } else {
                            info.insert(succ.clone(), (true, q));
                            frontier.push(succ.clone(), OrderedFloat(q));
                        }
                    } else if !s4p.base.is_goal(succ) {
                        let Some(entry) = info.get_mut(succ) else {
                            continue;
                        };
                        if q >= min_p && q > entry.1 {
                            entry.1 = q;
                            if !entry.0 {
                                entry.0 = true;
                                s4p.members.insert(succ.clone(), StateKind::Internal);
                            }
                            frontier.push(succ.clone(), OrderedFloat(q));
                        }
                    }
                }
            }
        }
        while let Some((s, _)) = frontier.pop() {
            if let Some(entry) = info.get_mut(&s) {
                if entry.0 {
                    entry.0 = false;
                    s4p.force_close(&s);
                }
            }
        }
        s4p.log_built();
        Ok(s4p)
    }

    /// S4P grown by always expanding the open state with the lowest current
    /// value estimate, up to `max_states` states.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DeadlineReached`](crate::error::SolverError::DeadlineReached)
    /// if the armed deadline expires during construction.
    ///
    /// # Panics
    ///
    /// Panics if `max_states` is zero.
    pub fn greedy(
        base: P,
        root: P::State,
        table: Rc<ValueTable<P::State>>,
        max_states: usize,
        budget: &BuildBudget,
    ) -> Result<Self> {
        assert!(max_states > 0, "max states must be positive");
        let budget = BuildBudget {
            max_states: Some(budget.max_states.map_or(max_states, |m| m.min(max_states))),
            max_time: budget.max_time,
        };
        let mut s4p = Self::empty(base, root.clone(), table, "greedy S4P");
        let mut clock = BuildClock::start(&budget);
        let mut dist = VecDist::new();
        let mut frontier: Frontier<P::State, Reverse<OrderedFloat<f64>>> = Frontier::new();

        s4p.insert_state(&root);
        let v = s4p.table.value(&root);
        frontier.push(root, Reverse(OrderedFloat(v)));
        let mut popped = 0usize;
        while let Some((s, priority)) = frontier.pop() {
            if popped > 0 && clock.exhausted(s4p.members.len())? {
                frontier.push(s, priority);
                s4p.truncated = true;
                break;
            }
            popped += 1;

            if s4p.base.is_goal(&s) {
                s4p.set_kind(&s, StateKind::Fringe);
            } else if !s4p.base.has_applicable_actions(&s) {
                if popped > 1 {
                    s4p.close_dead_end(&s);
                }
            } else {
                s4p.expand_state(&s, &mut dist, |s4p, succ| {
                    if s4p.base.is_goal(&succ) {
                        s4p.set_kind(&succ, StateKind::Fringe);
                    } else {
                        let v = s4p.table.value(&succ);
                        frontier.push(succ, Reverse(OrderedFloat(v)));
                    }
                });
            }
        }
        while let Some((s, _)) = frontier.pop() {
            s4p.force_close(&s);
        }
        s4p.log_built();
        Ok(s4p)
    }
}
