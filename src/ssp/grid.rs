//! A slippery grid world, expanded lazily.
//!
//! The agent moves in the four compass directions. With probability
//! `1 - slip` it goes where intended; otherwise it slides to one of the two
//! perpendicular directions. Moves into walls or off the grid leave it in
//! place. Pits have no applicable action and are dead ends.

use crate::prob_dist::ProbDist;
use crate::ssp::Ssp;
use std::collections::HashSet;

/// A cell of the grid, `(row, col)`.
pub type Cell = (i32, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GridAction {
    North,
    South,
    East,
    West,
}

impl GridAction {
    pub const ALL: [GridAction; 4] = [
        GridAction::North,
        GridAction::South,
        GridAction::East,
        GridAction::West,
    ];

    fn delta(self) -> (i32, i32) {
        match self {
            GridAction::North => (-1, 0),
            GridAction::South => (1, 0),
            GridAction::East => (0, 1),
            GridAction::West => (0, -1),
        }
    }

    fn perpendicular(self) -> [GridAction; 2] {
        match self {
            GridAction::North | GridAction::South => [GridAction::East, GridAction::West],
            GridAction::East | GridAction::West => [GridAction::North, GridAction::South],
        }
    }
}

/// A rectangular grid world SSP with unit move costs.
#[derive(Debug, Clone)]
pub struct GridWorld {
    rows: i32,
    cols: i32,
    start: Cell,
    goal: Cell,
    slip: f64,
    walls: HashSet<Cell>,
    pits: HashSet<Cell>,
}

impl GridWorld {
    /// # Panics
    ///
    /// Panics if the grid is empty, `slip` is outside `[0, 1]`, or the start
    /// or goal cell is off the grid.
    pub fn new(rows: i32, cols: i32, start: Cell, goal: Cell, slip: f64) -> Self {
        assert!(rows > 0 && cols > 0, "grid must be non-empty");
        assert!((0.0..=1.0).contains(&slip), "slip must be a probability");
        let world = Self {
            rows,
            cols,
            start,
            goal,
            slip,
            walls: HashSet::new(),
            pits: HashSet::new(),
        };
        assert!(world.on_grid(start) && world.on_grid(goal));
        world
    }

    pub fn with_walls(mut self, walls: impl IntoIterator<Item = Cell>) -> Self {
        self.walls.extend(walls);
        self
    }

    pub fn with_pits(mut self, pits: impl IntoIterator<Item = Cell>) -> Self {
        self.pits.extend(pits);
        self
    }

    /// Manhattan distance to the goal, an admissible heuristic for unit costs.
    pub fn manhattan(&self, s: &Cell) -> f64 {
        ((s.0 - self.goal.0).abs() + (s.1 - self.goal.1).abs()) as f64
    }

    fn on_grid(&self, c: Cell) -> bool {
        c.0 >= 0 && c.0 < self.rows && c.1 >= 0 && c.1 < self.cols
    }

    fn step(&self, from: Cell, dir: GridAction) -> Cell {
        let (dr, dc) = dir.delta();
        let to = (from.0 + dr, from.1 + dc);
        if self.on_grid(to) && !self.walls.contains(&to) {
            to
        } else {
            from
        }
    }
}

impl Ssp for GridWorld {
    type State = Cell;
    type Action = GridAction;

    fn name(&self) -> &str {
        "grid"
    }

    fn s0(&self) -> Cell {
        self.start
    }

    fn is_goal(&self, s: &Cell) -> bool {
        *s == self.goal
    }

    fn is_applicable(&self, s: &Cell, _a: &GridAction) -> bool {
        !self.pits.contains(s)
    }

    fn applicable_actions<'a>(&'a self, s: &'a Cell) -> Box<dyn Iterator<Item = GridAction> + 'a> {
        if self.pits.contains(s) {
            Box::new(std::iter::empty())
        } else {
            Box::new(GridAction::ALL.into_iter())
        }
    }

    fn expand(&self, a: &GridAction, s: &Cell, out: &mut dyn ProbDist<Cell>) {
        out.clear();
        if self.slip < 1.0 {
            out.insert(self.step(*s, *a), 1.0 - self.slip);
        }
        if self.slip > 0.0 {
            for side in a.perpendicular() {
                out.insert(self.step(*s, side), self.slip / 2.0);
            }
        }
    }

    fn cost(&self, _s: &Cell, _a: &GridAction) -> f64 {
        1.0
    }

    fn terminal_cost(&self, _s: &Cell) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prob_dist::HashDist;

    #[test]
    fn test_walls_and_borders_block() {
        let g = GridWorld::new(2, 2, (0, 0), (1, 1), 0.0).with_walls([(0, 1)]);
        let mut d = HashDist::new();
        g.expand(&GridAction::East, &(0, 0), &mut d);
        assert_eq!(d.probability(&(0, 0)), 1.0);
        g.expand(&GridAction::South, &(0, 0), &mut d);
        assert_eq!(d.probability(&(1, 0)), 1.0);
    }

    #[test]
    fn test_slip_spreads_mass() {
        let g = GridWorld::new(3, 3, (1, 1), (0, 0), 0.2);
        let mut d = HashDist::new();
        g.expand(&GridAction::North, &(1, 1), &mut d);
        assert!((d.probability(&(0, 1)) - 0.8).abs() < 1e-12);
        assert!((d.probability(&(1, 2)) - 0.1).abs() < 1e-12);
        assert!((d.probability(&(1, 0)) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_pits_have_no_actions() {
        let g = GridWorld::new(1, 3, (0, 0), (0, 2), 0.0).with_pits([(0, 1)]);
        assert!(!g.has_applicable_actions(&(0, 1)));
        assert!(g.has_applicable_actions(&(0, 0)));
        let reachable: Vec<Cell> = g.reachable_states().collect();
        assert_eq!(reachable, vec![(0, 0), (0, 1)]);
    }
}
