//! Circuit topology: the graph model and the per-topology evaluation stages.
//!
//! Node layout
//! - `[0, 2Q)`: element ports, two per element (`2e` and `2e + 1`).
//! - `[2Q, 2Q + P)`: circuit ports. As an edge source the node is an input
//!   port; as an edge destination it is the output port with the same offset.
//!
//! Stages, each a small file:
//! - `paths.rs`: enumerate light paths (trajectories) per input/output pair.
//! - `amplitude.rs`: element transfer coefficients and the amplitude matrix.
//! - `truth.rs`: fold amplitudes into the 4×4 logical truth matrix.
//! - `sift.rs`: structural pre-filter on trajectory existence.

mod amplitude;
mod paths;
mod sift;
mod truth;
mod types;

pub use amplitude::{trajectory_amplitude, transfer, AmplitudeMatrix};
pub use paths::enumerate_trajectories;
pub use sift::{sift_map, SiftMask};
pub use truth::{truth_from_amplitudes, TruthMatrix, LOGICAL_LINES, TRANSLATION};
pub use types::{ElementCounts, ElementKind, ParamSlot, Topology, Trajectory, TrajectoryMap};

#[cfg(test)]
mod tests;
