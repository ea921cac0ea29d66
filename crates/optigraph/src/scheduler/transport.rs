//! Transport seam between the state machines and whatever carries messages.
//!
//! The state machines only see these traits. The in-process implementation
//! uses one `mpsc` channel into the coordinator and one per worker back.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::error::SchedulerError;

use super::messages::{Assignment, WorkerMessage};

/// Coordinator side: receive from any worker, send to one.
pub trait CoordinatorLink {
    fn workers(&self) -> usize;

    /// Block until some worker reports.
    fn recv(&mut self) -> Result<WorkerMessage, SchedulerError>;

    fn send(&mut self, worker: usize, assignment: Assignment) -> Result<(), SchedulerError>;
}

/// Worker side: report to the coordinator, wait for the next assignment.
pub trait WorkerLink {
    fn id(&self) -> usize;

    fn report(&mut self, msg: WorkerMessage) -> Result<(), SchedulerError>;

    /// Block until the coordinator answers.
    fn next(&mut self) -> Result<Assignment, SchedulerError>;
}

pub struct ChannelCoordinator {
    rx: Receiver<WorkerMessage>,
    txs: Vec<Sender<Assignment>>,
}

pub struct ChannelWorker {
    id: usize,
    tx: Sender<WorkerMessage>,
    rx: Receiver<Assignment>,
}

/// Wire a coordinator to `workers` workers over in-process channels.
pub fn channel_links(workers: usize) -> (ChannelCoordinator, Vec<ChannelWorker>) {
    let (up_tx, up_rx) = mpsc::channel();
    let mut txs = Vec::with_capacity(workers);
    let mut links = Vec::with_capacity(workers);
    for id in 0..workers {
        let (down_tx, down_rx) = mpsc::channel();
        txs.push(down_tx);
        links.push(ChannelWorker {
            id,
            tx: up_tx.clone(),
            rx: down_rx,
        });
    }
    (ChannelCoordinator { rx: up_rx, txs }, links)
}

impl CoordinatorLink for ChannelCoordinator {
    fn workers(&self) -> usize {
        self.txs.len()
    }

    fn recv(&mut self) -> Result<WorkerMessage, SchedulerError> {
        self.rx.recv().map_err(|_| SchedulerError::WorkersLost)
    }

    fn send(&mut self, worker: usize, assignment: Assignment) -> Result<(), SchedulerError> {
        let tx = self
            .txs
            .get(worker)
            .ok_or_else(|| SchedulerError::Protocol(format!("unknown worker {worker}")))?;
        tx.send(assignment)
            .map_err(|_| SchedulerError::WorkerLost { worker })
    }
}

impl WorkerLink for ChannelWorker {
    fn id(&self) -> usize {
        self.id
    }

    fn report(&mut self, msg: WorkerMessage) -> Result<(), SchedulerError> {
        self.tx
            .send(msg)
            .map_err(|_| SchedulerError::CoordinatorLost)
    }

    fn next(&mut self) -> Result<Assignment, SchedulerError> {
        self.rx.recv().map_err(|_| SchedulerError::CoordinatorLost)
    }
}
