//! Discrete probability distributions over successor states.
//!
//! Four interchangeable backings implement [`ProbDist`]:
//!
//! | Backing | Merges duplicates | Notes |
//! |---|---|---|
//! | [`BoundedDist`] | no | fixed capacity, panics when full |
//! | [`VecDist`] | no | growable vector |
//! | [`MapDist`] | yes | ordered by event |
//! | [`HashDist`] | yes | ordered by first insertion |
//!
//! Non-merging backings may yield the same event several times; consumers
//! that need the exact probability of one event must sum the entries or use a
//! merging backing.

use rand::{Rng, RngCore};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Default capacity of [`BoundedDist`].
pub const DEFAULT_BOUNDED_CAPACITY: usize = 128;

/// Tolerance when validating a single probability mass.
const MASS_TOLERANCE: f64 = 1e-9;

/// A finite distribution of events with probability mass.
pub trait ProbDist<T> {
    /// Adds `mass` for `event`.
    ///
    /// # Panics
    ///
    /// Panics if `mass` is negative, not finite, or larger than one.
    fn insert(&mut self, event: T, mass: f64);

    /// Removes every entry.
    fn clear(&mut self);

    /// Number of stored entries (not distinct events for non-merging backings).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over `(event, mass)` entries.
    fn iter(&self) -> Box<dyn Iterator<Item = (&T, f64)> + '_>;

    /// Whether inserting an already present event adds to its entry.
    fn merges_duplicates(&self) -> bool;

    /// Sum of all stored masses.
    fn normalizing_constant(&self) -> f64 {
        self.iter().map(|(_, p)| p).sum()
    }

    /// Draws one event with probability proportional to its mass.
    ///
    /// `normalizing_constant` is the total mass, usually `1.0`. Returns `None`
    /// when the distribution is empty.
    fn sample<'a>(&'a self, rng: &mut dyn RngCore, normalizing_constant: f64) -> Option<&'a T> {
        let mut r = rng.gen::<f64>() * normalizing_constant;
        let mut last = None;
        for (event, p) in self.iter() {
            if r < p {
                return Some(event);
            }
            r -= p;
            last = Some(event);
        }
        // Rounding left a sliver of mass unassigned.
        last
    }
}

fn check_mass(mass: f64) {
    assert!(
        mass.is_finite() && mass >= 0.0 && mass <= 1.0 + MASS_TOLERANCE,
        "probability mass must be in [0, 1], got {}",
        mass
    );
}

/// Fixed-capacity, non-merging distribution.
#[derive(Debug, Clone)]
pub struct BoundedDist<T, const N: usize = DEFAULT_BOUNDED_CAPACITY> {
    entries: Vec<(T, f64)>,
}

impl<T, const N: usize> BoundedDist<T, N> {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(N),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for BoundedDist<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> ProbDist<T> for BoundedDist<T, N> {
    /// # Panics
    ///
    /// Panics when the distribution already holds `N` entries.
    fn insert(&mut self, event: T, mass: f64) {
        check_mass(mass);
        assert!(
            self.entries.len() < N,
            "bounded distribution overflow: capacity is {}",
            N
        );
        self.entries.push((event, mass));
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&T, f64)> + '_> {
        Box::new(self.entries.iter().map(|(e, p)| (e, *p)))
    }

    fn merges_duplicates(&self) -> bool {
        false
    }
}

/// Growable, non-merging distribution.
#[derive(Debug, Clone)]
pub struct VecDist<T> {
    entries: Vec<(T, f64)>,
}

impl<T> VecDist<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }
}

impl<T> Default for VecDist<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ProbDist<T> for VecDist<T> {
    fn insert(&mut self, event: T, mass: f64) {
        check_mass(mass);
        self.entries.push((event, mass));
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&T, f64)> + '_> {
        Box::new(self.entries.iter().map(|(e, p)| (e, *p)))
    }

    fn merges_duplicates(&self) -> bool {
        false
    }
}

/// Merging distribution iterated in event order.
#[derive(Debug, Clone)]
pub struct MapDist<T: Ord> {
    entries: BTreeMap<T, f64>,
}

impl<T: Ord> MapDist<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Merged probability of `event`, zero if absent.
    pub fn probability(&self, event: &T) -> f64 {
        self.entries.get(event).copied().unwrap_or(0.0)
    }
}

impl<T: Ord> Default for MapDist<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> ProbDist<T> for MapDist<T> {
    fn insert(&mut self, event: T, mass: f64) {
        check_mass(mass);
        *self.entries.entry(event).or_insert(0.0) += mass;
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&T, f64)> + '_> {
        Box::new(self.entries.iter().map(|(e, p)| (e, *p)))
    }

    fn merges_duplicates(&self) -> bool {
        true
    }
}

/// Merging distribution iterated in first-insertion order.
///
/// Iteration order is deterministic, which keeps sampling reproducible under
/// a seeded generator.
#[derive(Debug, Clone)]
pub struct HashDist<T: Hash + Eq> {
    index: HashMap<T, usize>,
    entries: Vec<(T, f64)>,
}

impl<T: Hash + Eq + Clone> HashDist<T> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Merged probability of `event`, zero if absent.
    pub fn probability(&self, event: &T) -> f64 {
        self.index
            .get(event)
            .map(|&i| self.entries[i].1)
            .unwrap_or(0.0)
    }
}

impl<T: Hash + Eq + Clone> Default for HashDist<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> ProbDist<T> for HashDist<T> {
    fn insert(&mut self, event: T, mass: f64) {
        check_mass(mass);
        match self.index.entry(event) {
            Entry::Occupied(slot) => self.entries[*slot.get()].1 += mass,
            Entry::Vacant(slot) => {
                self.entries.push((slot.key().clone(), mass));
                slot.insert(self.entries.len() - 1);
            }
        }
    }

    fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&T, f64)> + '_> {
        Box::new(self.entries.iter().map(|(e, p)| (e, *p)))
    }

    fn merges_duplicates(&self) -> bool {
        true
    }
}
