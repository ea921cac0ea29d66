//! Typed messages exchanged between the coordinator and its workers.

use crate::scored::Scored;

/// Coordinator to worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// Search the template with this index.
    Task(usize),
    /// No work left; answer with `Finished` and stop.
    Shutdown,
}

/// Worker to coordinator.
#[derive(Clone, Debug)]
pub enum WorkerMessage {
    /// Request for work, carrying the worker's best deviation so far. Also
    /// marks the previous task (if any) as done.
    Ready { worker: usize, best: Option<f64> },
    /// Acknowledges `Shutdown` with the worker's final best topology.
    Finished { worker: usize, best: Option<Scored> },
}

