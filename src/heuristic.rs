//! Heuristics seeding the value table.

/// An estimate `H(s) >= 0` of the cost to reach a goal from `s`.
pub trait Heuristic<S> {
    fn estimate(&self, s: &S) -> f64;
}

/// `H(s) = 0` for every state. Admissible for any SSP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroHeuristic;

impl<S> Heuristic<S> for ZeroHeuristic {
    fn estimate(&self, _s: &S) -> f64 {
        0.0
    }
}

/// The same estimate for every state.
#[derive(Debug, Clone, Copy)]
pub struct ConstantHeuristic(pub f64);

impl<S> Heuristic<S> for ConstantHeuristic {
    fn estimate(&self, _s: &S) -> f64 {
        self.0
    }
}

impl<S, F> Heuristic<S> for F
where
    F: Fn(&S) -> f64,
{
    fn estimate(&self, s: &S) -> f64 {
        self(s)
    }
}
