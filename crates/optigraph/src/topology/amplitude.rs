//! Amplitude builder: element transfer coefficients and the P×P amplitude matrix.

use std::f64::consts::TAU;

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::error::TopologyError;

use super::types::{ElementKind, Topology, TrajectoryMap};

/// P×P complex matrix; entry (i, j) sums the amplitudes of all trajectories
/// from input port i to output port j.
pub type AmplitudeMatrix = DMatrix<Complex64>;

/// Transfer coefficient of one element for entry port `input` and exit port
/// `output` (both 0 or 1). `params` is the element's slot: `[t]` for the
/// beamsplitter and coupler, `[φ, α]` for the waveplate. Values are clamped to
/// [0, 1].
pub fn transfer(kind: ElementKind, params: &[f64], input: usize, output: usize) -> Complex64 {
    debug_assert!(input < 2 && output < 2, "element ports are 0 or 1");
    debug_assert_eq!(params.len(), kind.param_width());
    let straight = input == output;
    match kind {
        ElementKind::Beamsplitter => {
            let t = params[0].clamp(0.0, 1.0);
            match (input, output) {
                (1, 1) => Complex64::new(-t.sqrt(), 0.0),
                _ if straight => Complex64::new(t.sqrt(), 0.0),
                _ => Complex64::new((1.0 - t).sqrt(), 0.0),
            }
        }
        ElementKind::DirectionalCoupler => {
            let t = params[0].clamp(0.0, 1.0);
            if straight {
                Complex64::new(t.sqrt(), 0.0)
            } else {
                // √(1−t)·e^{iπ/2}
                Complex64::new(0.0, (1.0 - t).sqrt())
            }
        }
        ElementKind::Waveplate => {
            let phase = Complex64::from_polar(1.0, TAU * params[0].clamp(0.0, 1.0));
            let alpha = TAU * params[1].clamp(0.0, 1.0);
            let (s, c) = alpha.sin_cos();
            match (input, output) {
                (0, 0) => phase * (c * c) + s * s,
                (1, 1) => phase * (s * s) + c * c,
                _ => (phase - 1.0) * (c * s),
            }
        }
    }
}

/// Product of transfer coefficients along one trajectory, in visit order.
/// Consecutive pairs `(path[k], path[k+1])` for odd `k` are (entry, exit) ports
/// of the same element. A direct port-to-port wire has amplitude 1.
pub fn trajectory_amplitude(topology: &Topology, path: &[usize]) -> Complex64 {
    let mut amp = Complex64::new(1.0, 0.0);
    let mut k = 1;
    while k + 1 < path.len() {
        let (entry, exit) = (path[k], path[k + 1]);
        debug_assert_eq!(entry / 2, exit / 2, "entry and exit on different elements");
        amp *= topology.transfer_coefficient(entry / 2, entry % 2, exit % 2);
        k += 2;
    }
    amp
}

fn cell_amplitude(t: &Topology, map: &TrajectoryMap, input: usize, output: usize) -> Complex64 {
    map.get(input, output)
        .iter()
        .map(|path| trajectory_amplitude(t, path))
        .sum()
}

impl Topology {
    /// Transfer coefficient of element `element` from port `input` to port `output`.
    pub fn transfer_coefficient(&self, element: usize, input: usize, output: usize) -> Complex64 {
        transfer(
            self.kinds()[element],
            self.element_params(element),
            input,
            output,
        )
    }

    /// Summed amplitude from input port `input` to output port `output`; zero
    /// when no trajectory joins them.
    pub fn amplitude(&mut self, input: usize, output: usize) -> Result<Complex64, TopologyError> {
        self.with_trajectories(|t, map| cell_amplitude(t, map, input, output))
    }

    pub fn amplitude_matrix(&mut self) -> Result<AmplitudeMatrix, TopologyError> {
        self.with_trajectories(|t, map| {
            let p = t.ports();
            DMatrix::from_fn(p, p, |i, j| cell_amplitude(t, map, i, j))
        })
    }
}
