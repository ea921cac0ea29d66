//! Global sampling followed by bounded Nelder–Mead refinement.
//!
//! - Global: evaluate `x0` and `global_samples` uniform points in the box
//!   (seeded `StdRng`), keep the best.
//! - Local: Nelder–Mead from that point; every trial point is clamped to the
//!   box. Stops when the simplex spread drops below `xtol` (converged), or
//!   the time/evaluation budget runs out (best so far, not converged).
//! - Equality residuals enter as `penalty · Σ r²`.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use super::{Bounds, Objective, OptCfg, OptOutcome, Optimizer};

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;
/// Initial simplex edge as a fraction of each coordinate's range.
const INITIAL_STEP: f64 = 0.1;

/// The shipped optimizer.
#[derive(Clone, Debug, Default)]
pub struct GlobalLocal {
    pub cfg: OptCfg,
}

impl GlobalLocal {
    pub fn new(cfg: OptCfg) -> Self {
        Self { cfg }
    }
}

/// Objective plus penalty bookkeeping and budget accounting.
struct Penalized<'a> {
    obj: &'a mut dyn Objective,
    penalty: f64,
    residuals: Vec<f64>,
    evaluations: usize,
    max_evaluations: usize,
    deadline: Instant,
}

impl Penalized<'_> {
    fn eval(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        let v = self.obj.value(x);
        if !v.is_finite() || v == f64::MAX {
            return f64::MAX;
        }
        self.residuals.clear();
        self.obj.equality_residuals(x, &mut self.residuals);
        let pen: f64 = self.residuals.iter().map(|r| r * r).sum();
        let total = v + self.penalty * pen;
        if total.is_finite() {
            total
        } else {
            f64::MAX
        }
    }

    fn exhausted(&self) -> bool {
        self.evaluations >= self.max_evaluations || Instant::now() >= self.deadline
    }
}

impl Optimizer for GlobalLocal {
    fn minimize(&self, objective: &mut dyn Objective, bounds: &Bounds, x0: &[f64]) -> OptOutcome {
        let dim = bounds.dim();
        debug_assert_eq!(dim, x0.len());
        let mut f = Penalized {
            obj: objective,
            penalty: self.cfg.penalty,
            residuals: Vec::new(),
            evaluations: 0,
            max_evaluations: self.cfg.max_evaluations.max(1),
            deadline: Instant::now() + self.cfg.max_time(),
        };

        let mut best_x = x0.to_vec();
        bounds.clamp(&mut best_x);
        let mut best_f = f.eval(&best_x);

        let converged = if dim == 0 {
            true
        } else {
            let mut rng = StdRng::seed_from_u64(self.cfg.seed);
            let mut x = vec![0.0; dim];
            for _ in 0..self.cfg.global_samples {
                if f.exhausted() {
                    break;
                }
                for (k, v) in x.iter_mut().enumerate() {
                    *v = rng.gen_range(bounds.lower[k]..=bounds.upper[k]);
                }
                let fx = f.eval(&x);
                if fx < best_f {
                    best_f = fx;
                    best_x.copy_from_slice(&x);
                }
            }
            let (x, fx, converged) = self.nelder_mead(&mut f, bounds, best_x, best_f);
            best_x = x;
            best_f = fx;
            converged
        };
        trace!(
            evaluations = f.evaluations,
            penalized = best_f,
            converged,
            "minimize done"
        );

        // Final evaluation leaves the objective's side effects at `best_x`.
        let value = f.obj.value(&best_x);
        OptOutcome {
            x: best_x,
            value,
            evaluations: f.evaluations + 1,
            converged,
        }
    }
}

impl GlobalLocal {
    fn nelder_mead(
        &self,
        f: &mut Penalized<'_>,
        bounds: &Bounds,
        start: Vec<f64>,
        f_start: f64,
    ) -> (Vec<f64>, f64, bool) {
        let n = start.len();
        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        for k in 0..n {
            let mut v = start.clone();
            let step = INITIAL_STEP * (bounds.upper[k] - bounds.lower[k]);
            v[k] = if v[k] + step <= bounds.upper[k] {
                v[k] + step
            } else {
                v[k] - step
            };
            let fv = f.eval(&v);
            simplex.push((v, fv));
        }
        simplex.push((start, f_start));

        loop {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            if spread(&simplex) < self.cfg.xtol {
                let (x, fx) = simplex.swap_remove(0);
                return (x, fx, true);
            }
            if f.exhausted() {
                let (x, fx) = simplex.swap_remove(0);
                return (x, fx, false);
            }

            let mut centroid = vec![0.0; n];
            for (v, _) in &simplex[..n] {
                for (c, x) in centroid.iter_mut().zip(v) {
                    *c += x / n as f64;
                }
            }
            let worst_f = simplex[n].1;
            let toward = |from: &[f64], to: &[f64], t: f64| -> Vec<f64> {
                let mut p: Vec<f64> = from.iter().zip(to).map(|(a, b)| a + t * (b - a)).collect();
                bounds.clamp(&mut p);
                p
            };

            let xr = toward(&centroid, &simplex[n].0, -REFLECT);
            let fr = f.eval(&xr);
            if fr < simplex[0].1 {
                let xe = toward(&centroid, &xr, EXPAND);
                let fe = f.eval(&xe);
                simplex[n] = if fe < fr { (xe, fe) } else { (xr, fr) };
                continue;
            }
            if fr < simplex[n - 1].1 {
                simplex[n] = (xr, fr);
                continue;
            }
            let xc = if fr < worst_f {
                toward(&centroid, &xr, CONTRACT)
            } else {
                toward(&centroid, &simplex[n].0, CONTRACT)
            };
            let fc = f.eval(&xc);
            if fc < fr.min(worst_f) {
                simplex[n] = (xc, fc);
                continue;
            }
            let best = simplex[0].0.clone();
            for (v, fv) in simplex.iter_mut().skip(1) {
                *v = toward(&best, v, SHRINK);
                *fv = f.eval(v);
            }
        }
    }
}

/// Largest coordinate distance of any vertex from the best vertex.
fn spread(simplex: &[(Vec<f64>, f64)]) -> f64 {
    let best = &simplex[0].0;
    simplex[1..]
        .iter()
        .flat_map(|(v, _)| v.iter().zip(best).map(|(a, b)| (a - b).abs()))
        .fold(0.0, f64::max)
}
