//! Error types shared by the topology model, the file formats and the scheduler.
//!
//! Structural infeasibility is not an error: a topology that fails the sift
//! scores `f64::MAX` and is skipped. The variants here cover malformed input and
//! broken invariants only.

use thiserror::Error;

/// Construction or mutation of a [`crate::topology::Topology`] failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("a topology needs at least one port")]
    NoPorts,
    #[error("edges has length {got}, expected ports + 2 * elements = {expected}")]
    EdgeCount { expected: usize, got: usize },
    #[error("edge {node} -> {dest} leaves the node range 0..{nodes}")]
    EdgeOutOfRange {
        node: usize,
        dest: usize,
        nodes: usize,
    },
    #[error("node {dest} is the destination of both {first} and {second}")]
    EdgeCollision {
        dest: usize,
        first: usize,
        second: usize,
    },
    #[error("port and element counts overflow the node index range")]
    SizeOverflow,
    #[error("kind sequence does not match the element counts")]
    KindMismatch,
    #[error("parameter vector has length {got}, expected {expected}")]
    ParamCount { expected: usize, got: usize },
    #[error("{ports} ports cannot carry the 4-line logical matrix")]
    TooFewPorts { ports: usize },
    #[error("routing re-enters element {element} on a single path")]
    RoutingCycle { element: usize },
}

/// Parsing of the batch input file, a target matrix, or an edges line failed.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("input is empty")]
    Empty,
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("target matrix has {got} rows, expected {expected}")]
    TargetRows { expected: usize, got: usize },
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FormatError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Sifter argument errors; each maps to a distinct process exit code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SiftArgsError {
    #[error("not enough arguments: expected P BS DC W followed by a P x P matrix")]
    TooFewArguments,
    #[error("sift matrix missing")]
    MatrixMissing,
    #[error("sift matrix incomplete: got {got} of {expected} entries")]
    MatrixIncomplete { expected: usize, got: usize },
    #[error("argument {index} ({token:?}) is not a non-negative integer")]
    NotAnInteger { index: usize, token: String },
    #[error("{ports} ports with {elements:?} elements overflow the node index range")]
    TooLarge {
        ports: usize,
        elements: [usize; 3],
    },
}

impl SiftArgsError {
    /// Exit code reported by the sifter front-end.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TooFewArguments => 1,
            Self::MatrixMissing => 2,
            Self::MatrixIncomplete { .. } => 3,
            Self::NotAnInteger { .. } => 4,
            Self::TooLarge { .. } => 5,
        }
    }
}

/// Master/worker protocol failure. Always fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("worker {worker} disconnected")]
    WorkerLost { worker: usize },
    #[error("every worker disconnected before acknowledging shutdown")]
    WorkersLost,
    #[error("coordinator disconnected")]
    CoordinatorLost,
    #[error("protocol violation: {0}")]
    Protocol(String),
}
