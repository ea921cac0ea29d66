//! A tuned topology with its deviation, and its serializable report.

use serde::{Deserialize, Serialize};

use crate::topology::{ElementCounts, ElementKind, Topology};

/// A topology whose parameters were tuned, with the deviation they reach.
#[derive(Clone, Debug)]
pub struct Scored {
    pub topology: Topology,
    pub deviation: f64,
    pub converged: bool,
}

impl Scored {
    /// Strictly better than `current`; ties keep the earlier result.
    pub fn improves_on(&self, current: Option<&Scored>) -> bool {
        current.map_or(true, |best| self.deviation < best.deviation)
    }

    /// Snapshot with the amplitude and truth matrices evaluated at the tuned
    /// parameters. Complex entries are `[re, im]`.
    pub fn report(&self) -> ScoredReport {
        let mut t = self.topology.clone();
        let amplitude = t.amplitude_matrix().ok().map(|m| {
            m.row_iter()
                .map(|row| row.iter().map(|z| [z.re, z.im]).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        });
        let truth = t.truth_matrix().ok().map(|m| {
            m.row_iter()
                .map(|row| row.iter().map(|z| [z.re, z.im]).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        });
        ScoredReport {
            ports: t.ports(),
            counts: t.counts(),
            edges: t.edges().to_vec(),
            kinds: t.kinds().to_vec(),
            params: t.params().to_vec(),
            deviation: self.deviation,
            converged: self.converged,
            amplitude,
            truth,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredReport {
    pub ports: usize,
    pub counts: ElementCounts,
    pub edges: Vec<usize>,
    pub kinds: Vec<ElementKind>,
    pub params: Vec<f64>,
    pub deviation: f64,
    pub converged: bool,
    pub amplitude: Option<Vec<Vec<[f64; 2]>>>,
    pub truth: Option<Vec<Vec<[f64; 2]>>>,
}
