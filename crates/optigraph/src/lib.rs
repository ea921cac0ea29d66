//! Topology search for linear-optical circuits built from one-qubit elements.
//!
//! A candidate circuit is a directed graph over circuit ports and element
//! ports. For each candidate the crate enumerates light paths, assembles a
//! port-to-port amplitude matrix, folds it into a 4×4 logical truth matrix,
//! sifts out structurally hopeless graphs, and tunes element parameters to
//! minimize the deviation from a target.
//!
//! Layout
//! - `topology`: the graph model plus trajectory, amplitude, truth and sift stages.
//! - `deviation`: targets and the objective handed to the optimizer.
//! - `optimize`: the optimizer boundary and the shipped global+local minimizer.
//! - `enumerate`: templates and backtracking completion of edge assignments.
//! - `scheduler`: coordinator/worker protocol distributing templates.
//! - `batch`: shared-memory scoring of topology batches and exhaustive sifting.
//! - `io`: batch file, matrix and sifter argument formats.

pub mod batch;
pub mod cfg;
pub mod deviation;
pub mod enumerate;
pub mod error;
pub mod io;
pub mod observe;
pub mod optimize;
pub mod scheduler;
pub mod scored;
pub mod topology;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use num_complex::Complex64;

/// Common exports for callers driving a search.
pub mod prelude {
    pub use crate::deviation::{Target, TargetKind};
    pub use crate::enumerate::{
        enumerate_templates, for_each_completion, search_best, SearchCfg, SearchContext, Template,
    };
    pub use crate::error::{FormatError, SchedulerError, SiftArgsError, TopologyError};
    pub use crate::observe::{Counters, NoopObserver, Observer};
    pub use crate::optimize::{Bounds, GlobalLocal, Objective, OptCfg, OptOutcome, Optimizer};
    pub use crate::scheduler::{run_local, SearchSummary};
    pub use crate::scored::Scored;
    pub use crate::topology::{
        AmplitudeMatrix, ElementCounts, ElementKind, SiftMask, Topology, TrajectoryMap,
        TruthMatrix,
    };
    pub use num_complex::Complex64;
}
