//! Heuristic-seeded value function table.
//!
//! The table maps states to cost-to-go estimates. Entries are created lazily,
//! seeded by a [`Heuristic`], and overwritten in place by Bellman backups.
//! No entry is ever removed during a solve.
//!
//! The table is shared between a planner and the short-sighted SSPs it
//! builds, so its methods take `&self` and keep the map behind a `RefCell`.
//! A borrow is never held across a call into the heuristic.
//!
//! # Read policy
//!
//! [`ValueTable::value`] is the read path used by Bellman backups. With
//! `memoize_reads` enabled (the default) a miss stores the heuristic estimate,
//! exactly like [`ValueTable::get`]. With it disabled a miss returns the
//! estimate without storing it, which keeps memory bounded by the states
//! actually updated but recomputes the heuristic on every miss.
//! [`ValueTable::peek`] never stores regardless of the policy.

use crate::config::SolverConfig;
use crate::heuristic::Heuristic;
use std::cell::RefCell;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};

/// Finite value standing for "practically unsolvable".
pub const DEFAULT_DEAD_END_VALUE: f64 = 500.0;

/// Initial number of entries the table reserves room for.
pub const DEFAULT_TABLE_CAPACITY: usize = 1 << 10;

/// Builder for [`ValueTable`].
#[derive(Debug, Clone)]
pub struct ValueTableBuilder<H> {
    capacity: usize,
    hasher: H,
    memoize_reads: bool,
    dead_end_value: f64,
}

impl Default for ValueTableBuilder<RandomState> {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TABLE_CAPACITY,
            hasher: RandomState::new(),
            memoize_reads: true,
            dead_end_value: DEFAULT_DEAD_END_VALUE,
        }
    }
}

impl ValueTableBuilder<RandomState> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Builder initialized from the table-related fields of `config`.
    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new()
            .with_capacity(config.table_capacity)
            .memoize_reads(config.memoize_reads)
            .with_dead_end_value(config.dead_end_value)
    }
}

impl<H: BuildHasher> ValueTableBuilder<H> {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Uses `hasher` to hash states.
    pub fn with_hasher<T: BuildHasher>(self, hasher: T) -> ValueTableBuilder<T> {
        ValueTableBuilder {
            capacity: self.capacity,
            hasher,
            memoize_reads: self.memoize_reads,
            dead_end_value: self.dead_end_value,
        }
    }

    /// Whether [`ValueTable::value`] stores the heuristic estimate on a miss.
    pub fn memoize_reads(mut self, memoize: bool) -> Self {
        self.memoize_reads = memoize;
        self
    }

    /// # Panics
    ///
    /// Panics if `value` is not finite and positive.
    pub fn with_dead_end_value(mut self, value: f64) -> Self {
        assert!(
            value.is_finite() && value > 0.0,
            "dead-end value must be finite and positive"
        );
        self.dead_end_value = value;
        self
    }

    pub fn build<S, E>(self, heuristic: E) -> ValueTable<S, H>
    where
        S: Hash + Eq,
        E: Heuristic<S> + 'static,
    {
        ValueTable {
            entries: RefCell::new(HashMap::with_capacity_and_hasher(self.capacity, self.hasher)),
            heuristic: Box::new(heuristic),
            memoize_reads: self.memoize_reads,
            dead_end_value: self.dead_end_value,
        }
    }
}

/// A table of state values seeded by a heuristic.
///
/// # Examples
///
/// ```
/// use ssipp::value_table::ValueTable;
///
/// let table: ValueTable<u32> = ValueTable::new(|s: &u32| *s as f64);
/// assert_eq!(table.find(&3), None);
/// assert_eq!(table.value(&3), 3.0);
/// assert_eq!(table.find(&3), Some(3.0));
/// table.update(&3, 1.5);
/// assert_eq!(table.get(&3), 1.5);
/// ```
pub struct ValueTable<S, H = RandomState> {
    entries: RefCell<HashMap<S, f64, H>>,
    heuristic: Box<dyn Heuristic<S>>,
    memoize_reads: bool,
    dead_end_value: f64,
}

impl<S: Hash + Eq> ValueTable<S, RandomState> {
    /// Table with default settings seeded by `heuristic`.
    pub fn new<E: Heuristic<S> + 'static>(heuristic: E) -> Self {
        ValueTableBuilder::new().build(heuristic)
    }
}

impl<S: Hash + Eq + Clone, H: BuildHasher> ValueTable<S, H> {
    /// Stored value of `s`, if any. Never inserts.
    pub fn find(&self, s: &S) -> Option<f64> {
        self.entries.borrow().get(s).copied()
    }

    /// Stored value of `s`, inserting the heuristic estimate on a miss.
    pub fn get(&self, s: &S) -> f64 {
        if let Some(v) = self.find(s) {
            return v;
        }
        let h = self.heuristic.estimate(s);
        *self.entries.borrow_mut().entry(s.clone()).or_insert(h)
    }

    /// Read path of the Bellman operators; see the module docs for the
    /// memoization policy.
    pub fn value(&self, s: &S) -> f64 {
        if self.memoize_reads {
            self.get(s)
        } else {
            self.peek(s)
        }
    }

    /// Stored value of `s`, or its heuristic estimate. Never inserts.
    pub fn peek(&self, s: &S) -> f64 {
        match self.find(s) {
            Some(v) => v,
            None => self.heuristic.estimate(s),
        }
    }

    /// Overwrites (or inserts) the value of `s`.
    pub fn update(&self, s: &S, v: f64) {
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(s) {
            Some(slot) => *slot = v,
            None => {
                entries.insert(s.clone(), v);
            }
        }
    }

    /// Whether `s` has a stored entry.
    pub fn contains(&self, s: &S) -> bool {
        self.entries.borrow().contains_key(s)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Heuristic estimate of `s`, ignoring any stored entry.
    pub fn heuristic(&self, s: &S) -> f64 {
        self.heuristic.estimate(s)
    }

    /// Cap applied to every Q-value and value.
    pub fn dead_end_value(&self) -> f64 {
        self.dead_end_value
    }

    /// Whether [`ValueTable::value`] stores heuristic estimates on a miss.
    pub fn memoizes_reads(&self) -> bool {
        self.memoize_reads
    }

    /// Copy of every stored entry, in unspecified order.
    pub fn entries(&self) -> Vec<(S, f64)> {
        self.entries
            .borrow()
            .iter()
            .map(|(s, v)| (s.clone(), *v))
            .collect()
    }
}

impl<S: fmt::Debug, H> fmt::Display for ValueTable<S, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        writeln!(f, "value table ({} entries)", entries.len())?;
        for (s, v) in entries.iter() {
            writeln!(f, "  {:?} -> {}", s, v)?;
        }
        Ok(())
    }
}

impl<S, H> fmt::Debug for ValueTable<S, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTable")
            .field("len", &self.entries.borrow().len())
            .field("memoize_reads", &self.memoize_reads)
            .field("dead_end_value", &self.dead_end_value)
            .finish()
    }
}
