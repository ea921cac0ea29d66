//! Sift filter: reject topologies whose trajectory sets cannot feed the
//! logical cells, before any amplitude or optimizer work.
//!
//! The test is necessary, not sufficient. A cell (i, j) with table entry
//! `[a0, a1, a2, a3]` passes when `(T(a0,a1) ∨ T(a2,a3)) ∧ (T(a0,a3) ∨ T(a2,a1))`,
//! where `T(x,y)` means the trajectory set from x to y is non-empty.

use tracing::debug;

use super::truth::{LOGICAL_LINES, TRANSLATION};
use super::types::{Topology, TrajectoryMap};

/// Which logical cells the sift must check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SiftMask([[bool; LOGICAL_LINES]; LOGICAL_LINES]);

impl SiftMask {
    /// Check every logical cell.
    pub fn all() -> Self {
        Self([[true; LOGICAL_LINES]; LOGICAL_LINES])
    }

    pub fn from_cells(cells: [[bool; LOGICAL_LINES]; LOGICAL_LINES]) -> Self {
        Self(cells)
    }

    /// Leading 4×4 block of a row-major `ports × ports` 0/1 matrix. Cells the
    /// matrix does not cover stay set.
    pub fn from_port_matrix(ports: usize, entries: &[bool]) -> Self {
        let mut cells = [[true; LOGICAL_LINES]; LOGICAL_LINES];
        for (i, row) in cells.iter_mut().enumerate().take(ports) {
            for (j, cell) in row.iter_mut().enumerate().take(ports) {
                if let Some(&bit) = entries.get(i * ports + j) {
                    *cell = bit;
                }
            }
        }
        Self(cells)
    }

    pub fn get(&self, i: usize, j: usize) -> bool {
        self.0[i][j]
    }
}

impl Default for SiftMask {
    fn default() -> Self {
        Self::all()
    }
}

/// Apply the sift condition to a trajectory map. Short-circuits on the first
/// failing cell.
pub fn sift_map(map: &TrajectoryMap, mask: &SiftMask) -> bool {
    if map.ports() < LOGICAL_LINES {
        return false;
    }
    for (i, row) in TRANSLATION.iter().enumerate() {
        for (j, &[a0, a1, a2, a3]) in row.iter().enumerate() {
            if !mask.get(i, j) {
                continue;
            }
            let direct = map.has_path(a0, a1) || map.has_path(a2, a3);
            let crossed = map.has_path(a0, a3) || map.has_path(a2, a1);
            if !(direct && crossed) {
                return false;
            }
        }
    }
    true
}

impl Topology {
    /// Sift over every logical cell. Builds the trajectory map if needed.
    pub fn sift(&mut self) -> bool {
        self.sift_masked(&SiftMask::all())
    }

    /// Sift over the cells selected by `mask`. A routing cycle counts as a
    /// rejection.
    pub fn sift_masked(&mut self, mask: &SiftMask) -> bool {
        if self.ports() < LOGICAL_LINES {
            return false;
        }
        match self.with_trajectories(|_, map| sift_map(map, mask)) {
            Ok(ok) => ok,
            Err(e) => {
                debug!(error = %e, "sift rejected topology");
                false
            }
        }
    }
}
