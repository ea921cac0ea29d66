//! Truth matrix builder: four logical lines folded onto the physical ports.

use nalgebra::Matrix4;
use num_complex::Complex64;

use crate::error::TopologyError;

use super::amplitude::AmplitudeMatrix;
use super::types::Topology;

/// Logical lines of the two-qubit gate, independent of the port count.
pub const LOGICAL_LINES: usize = 4;

/// 4×4 complex matrix realized by the circuit on the logical lines.
pub type TruthMatrix = Matrix4<Complex64>;

/// For truth cell (i, j), the ports `[a0, a1, a2, a3]` combined as
/// `A[a0][a1]·A[a2][a3] + A[a0][a3]·A[a2][a1]`.
pub const TRANSLATION: [[[usize; 4]; 4]; 4] = [
    [[1, 1, 3, 3], [1, 1, 2, 3], [0, 1, 3, 3], [0, 1, 2, 3]],
    [[1, 1, 3, 2], [1, 1, 2, 2], [0, 1, 3, 2], [0, 1, 2, 2]],
    [[1, 0, 3, 3], [1, 0, 2, 3], [0, 0, 3, 3], [0, 0, 2, 3]],
    [[1, 0, 3, 2], [1, 0, 2, 2], [0, 0, 3, 2], [0, 0, 2, 2]],
];

/// Fold an amplitude matrix into the truth matrix. Needs at least four ports.
pub fn truth_from_amplitudes(a: &AmplitudeMatrix) -> Result<TruthMatrix, TopologyError> {
    if a.nrows() < LOGICAL_LINES || a.ncols() < LOGICAL_LINES {
        return Err(TopologyError::TooFewPorts { ports: a.nrows() });
    }
    Ok(Matrix4::from_fn(|i, j| {
        let [a0, a1, a2, a3] = TRANSLATION[i][j];
        a[(a0, a1)] * a[(a2, a3)] + a[(a0, a3)] * a[(a2, a1)]
    }))
}

impl Topology {
    pub fn truth_matrix(&mut self) -> Result<TruthMatrix, TopologyError> {
        if self.ports() < LOGICAL_LINES {
            return Err(TopologyError::TooFewPorts {
                ports: self.ports(),
            });
        }
        truth_from_amplitudes(&self.amplitude_matrix()?)
    }
}
