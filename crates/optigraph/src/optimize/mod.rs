//! Optimizer boundary.
//!
//! The search treats the minimizer as a black box: it receives box bounds, an
//! objective `f(x) -> f64` (which may mutate state behind it, e.g. a topology's
//! parameters), optional equality constraints and a convergence/time budget,
//! and returns the best point it found. Non-convergence within the budget is
//! not an error; the best point so far is accepted.

mod hybrid;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cfg::{DEFAULT_MAX_TIME, DEFAULT_XTOL};

pub use hybrid::GlobalLocal;

/// Function minimized by an [`Optimizer`].
pub trait Objective {
    fn dim(&self) -> usize;

    fn value(&mut self, x: &[f64]) -> f64;

    /// Append residuals that should vanish at the optimum. None by default.
    fn equality_residuals(&mut self, _x: &[f64], _out: &mut Vec<f64>) {}
}

/// Box constraints, one interval per coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    /// `[0, 1]` on every coordinate.
    pub fn unit(dim: usize) -> Self {
        Self {
            lower: vec![0.0; dim],
            upper: vec![1.0; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn clamp(&self, x: &mut [f64]) {
        for ((v, lo), hi) in x.iter_mut().zip(&self.lower).zip(&self.upper) {
            *v = v.clamp(*lo, *hi);
        }
    }
}

/// Optimizer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptCfg {
    /// Stop local refinement once the simplex is narrower than this on every axis.
    pub xtol: f64,
    /// Wall-clock budget of one `minimize` call, in milliseconds.
    pub max_time_ms: u64,
    /// Uniform samples drawn by the global phase.
    pub global_samples: usize,
    /// Hard cap on objective evaluations.
    pub max_evaluations: usize,
    /// Weight of the squared equality residuals.
    pub penalty: f64,
    pub seed: u64,
}

impl OptCfg {
    pub fn max_time(&self) -> Duration {
        Duration::from_millis(self.max_time_ms)
    }
}

impl Default for OptCfg {
    fn default() -> Self {
        Self {
            xtol: DEFAULT_XTOL,
            max_time_ms: DEFAULT_MAX_TIME.as_millis() as u64,
            global_samples: 32,
            max_evaluations: 20_000,
            penalty: 10.0,
            seed: 0x5eed,
        }
    }
}

/// Result of one `minimize` call.
#[derive(Clone, Debug, PartialEq)]
pub struct OptOutcome {
    pub x: Vec<f64>,
    /// Objective value at `x`, without constraint penalties.
    pub value: f64,
    pub evaluations: usize,
    /// False when the budget ran out before the tolerance was met.
    pub converged: bool,
}

/// Bounded minimizer. Implementations must leave the objective evaluated at
/// the returned point last, so side effects reflect the result.
pub trait Optimizer: Sync {
    fn minimize(&self, objective: &mut dyn Objective, bounds: &Bounds, x0: &[f64]) -> OptOutcome;
}

#[cfg(test)]
mod tests;
