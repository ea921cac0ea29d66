//! Deviation objective: distance between the realized matrix and a target.
//!
//! `deviation = Σ_{i,j} |realized[i][j] − target[i][j]|`, where `realized` is
//! the truth matrix or the amplitude matrix depending on the target kind. A
//! topology that fails the sift scores `MAX_DEVIATION` and the amplitude stage
//! never runs for it.

use std::sync::Arc;

use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::cfg::MAX_DEVIATION;
use crate::error::TopologyError;
use crate::optimize::{Bounds, Objective, OptOutcome, Optimizer};
use crate::topology::{AmplitudeMatrix, Topology, TruthMatrix, LOGICAL_LINES};

/// Which realized matrix a target is compared against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Truth,
    Amplitude,
}

/// Target matrix plus its kind. Read-only once built; shared through `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    kind: TargetKind,
    matrix: DMatrix<Complex64>,
}

impl Target {
    pub fn truth(m: TruthMatrix) -> Self {
        Self {
            kind: TargetKind::Truth,
            matrix: DMatrix::from_fn(LOGICAL_LINES, LOGICAL_LINES, |i, j| m[(i, j)]),
        }
    }

    pub fn amplitude(m: AmplitudeMatrix) -> Self {
        Self {
            kind: TargetKind::Amplitude,
            matrix: m,
        }
    }

    /// Build from a square matrix as read from a file. A truth target keeps the
    /// leading 4×4 block.
    pub fn from_matrix(kind: TargetKind, m: DMatrix<Complex64>) -> Result<Self, TopologyError> {
        match kind {
            TargetKind::Truth => {
                if m.nrows() < LOGICAL_LINES || m.ncols() < LOGICAL_LINES {
                    return Err(TopologyError::TooFewPorts { ports: m.nrows() });
                }
                Ok(Self {
                    kind,
                    matrix: m.view((0, 0), (LOGICAL_LINES, LOGICAL_LINES)).into_owned(),
                })
            }
            TargetKind::Amplitude => Ok(Self { kind, matrix: m }),
        }
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn matrix(&self) -> &DMatrix<Complex64> {
        &self.matrix
    }
}

/// All-zero truth target.
impl Default for Target {
    fn default() -> Self {
        Self::truth(TruthMatrix::zeros())
    }
}

fn distance<'a>(
    realized: impl Iterator<Item = &'a Complex64>,
    target: impl Iterator<Item = &'a Complex64>,
) -> f64 {
    let d: f64 = realized.zip(target).map(|(r, t)| (r - t).norm()).sum();
    if d.is_finite() {
        d
    } else {
        MAX_DEVIATION
    }
}

impl Topology {
    /// Deviation of the current parameters from the topology's target.
    pub fn deviation(&mut self) -> f64 {
        if !self.sift() {
            return MAX_DEVIATION;
        }
        let target = Arc::clone(self.target());
        match target.kind() {
            TargetKind::Truth => match self.truth_matrix() {
                Ok(truth) => distance(truth.iter(), target.matrix().iter()),
                Err(_) => MAX_DEVIATION,
            },
            TargetKind::Amplitude => match self.amplitude_matrix() {
                Ok(a) if a.shape() == target.matrix().shape() => {
                    distance(a.iter(), target.matrix().iter())
                }
                _ => MAX_DEVIATION,
            },
        }
    }
}

/// Equality residuals of a unitary amplitude matrix: column norms minus one,
/// then `|⟨col k1, col k2⟩|` for every `k1 < k2`.
pub fn unitarity_residuals(a: &AmplitudeMatrix, out: &mut Vec<f64>) {
    let n = a.ncols();
    for k in 0..n {
        out.push(a.column(k).iter().map(|z| z.norm_sqr()).sum::<f64>() - 1.0);
    }
    for k1 in 0..n {
        for k2 in k1 + 1..n {
            let inner: Complex64 = a
                .column(k1)
                .iter()
                .zip(a.column(k2).iter())
                .map(|(x, y)| x * y.conj())
                .sum();
            out.push(inner.norm());
        }
    }
}

/// Optimizer adapter: evaluating writes the candidate parameters into the
/// topology and returns its deviation.
pub struct TopologyObjective<'a> {
    topology: &'a mut Topology,
    unitarity: bool,
}

impl<'a> TopologyObjective<'a> {
    pub fn new(topology: &'a mut Topology, unitarity: bool) -> Self {
        Self {
            topology,
            unitarity,
        }
    }
}

impl Objective for TopologyObjective<'_> {
    fn dim(&self) -> usize {
        self.topology.params().len()
    }

    fn value(&mut self, x: &[f64]) -> f64 {
        if self.topology.set_params(x).is_err() {
            return MAX_DEVIATION;
        }
        self.topology.deviation()
    }

    fn equality_residuals(&mut self, x: &[f64], out: &mut Vec<f64>) {
        if !self.unitarity || self.topology.set_params(x).is_err() {
            return;
        }
        if let Ok(a) = self.topology.amplitude_matrix() {
            unitarity_residuals(&a, out);
        }
    }
}

/// Reset parameters, minimize the deviation over `[0, 1]^n`, and leave the
/// best parameters found in `topology`.
pub fn tune(topology: &mut Topology, optimizer: &dyn Optimizer, unitarity: bool) -> OptOutcome {
    topology.reset_params();
    let x0 = topology.params().to_vec();
    let bounds = Bounds::unit(x0.len());
    let outcome = optimizer.minimize(&mut TopologyObjective::new(topology, unitarity), &bounds, &x0);
    if topology.set_params(&outcome.x).is_err() {
        topology.reset_params();
    }
    outcome
}
