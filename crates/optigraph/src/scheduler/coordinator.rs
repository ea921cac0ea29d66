//! Coordinator state machine and its driver loop.

use tracing::{info, trace};

use crate::error::SchedulerError;
use crate::scored::Scored;

use super::messages::{Assignment, WorkerMessage};
use super::transport::CoordinatorLink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Working,
    ShutdownSent,
    Finished,
}

/// Hands out template indices on request, each exactly once, and answers
/// with `Shutdown` once they run out.
#[derive(Clone, Debug)]
pub struct Coordinator {
    templates: usize,
    next: usize,
    outstanding: Vec<Option<usize>>,
    phase: Vec<Phase>,
    best_reported: Option<f64>,
}

impl Coordinator {
    pub fn new(templates: usize, workers: usize) -> Self {
        Self {
            templates,
            next: 0,
            outstanding: vec![None; workers],
            phase: vec![Phase::Working; workers],
            best_reported: None,
        }
    }

    fn check_worker(&self, worker: usize) -> Result<(), SchedulerError> {
        if worker >= self.phase.len() {
            return Err(SchedulerError::Protocol(format!("unknown worker {worker}")));
        }
        Ok(())
    }

    /// Handle a `Ready` report: the worker's previous task is done and it gets
    /// the next index, or `Shutdown` when none is left.
    pub fn on_ready(
        &mut self,
        worker: usize,
        best: Option<f64>,
    ) -> Result<Assignment, SchedulerError> {
        self.check_worker(worker)?;
        if self.phase[worker] != Phase::Working {
            return Err(SchedulerError::Protocol(format!(
                "worker {worker} reported ready after shutdown"
            )));
        }
        self.outstanding[worker] = None;
        if let Some(d) = best {
            if self.best_reported.map_or(true, |b| d < b) {
                self.best_reported = Some(d);
            }
        }
        if self.next < self.templates {
            let index = self.next;
            self.next += 1;
            self.outstanding[worker] = Some(index);
            Ok(Assignment::Task(index))
        } else {
            self.phase[worker] = Phase::ShutdownSent;
            Ok(Assignment::Shutdown)
        }
    }

    /// Handle a `Finished` acknowledgment.
    pub fn on_finished(&mut self, worker: usize) -> Result<(), SchedulerError> {
        self.check_worker(worker)?;
        if self.phase[worker] != Phase::ShutdownSent {
            return Err(SchedulerError::Protocol(format!(
                "worker {worker} finished without a shutdown"
            )));
        }
        self.phase[worker] = Phase::Finished;
        Ok(())
    }

    /// Every worker acknowledged shutdown.
    pub fn is_done(&self) -> bool {
        self.phase.iter().all(|p| *p == Phase::Finished)
    }

    /// Template currently held by `worker`.
    pub fn outstanding(&self, worker: usize) -> Option<usize> {
        self.outstanding.get(worker).copied().flatten()
    }

    /// Indices handed out so far.
    pub fn assigned(&self) -> usize {
        self.next
    }

    /// Lowest deviation seen in any `Ready` report.
    pub fn best_reported(&self) -> Option<f64> {
        self.best_reported
    }
}

/// Result of a coordinator run.
#[derive(Clone, Debug, Default)]
pub struct CoordinatorOutcome {
    pub best: Option<Scored>,
    pub best_reported: Option<f64>,
}

/// Serve `templates` indices over `link` until every worker has finished.
/// The final best merges the workers' results; ties keep the earliest
/// acknowledgment.
pub fn run_coordinator(
    link: &mut dyn CoordinatorLink,
    templates: usize,
) -> Result<CoordinatorOutcome, SchedulerError> {
    let mut c = Coordinator::new(templates, link.workers());
    let mut best: Option<Scored> = None;
    while !c.is_done() {
        let msg = link.recv()?;
        match msg {
            WorkerMessage::Ready { worker, best } => {
                let assignment = c.on_ready(worker, best)?;
                trace!(worker, ?assignment, "assigned");
                link.send(worker, assignment)?;
            }
            WorkerMessage::Finished { worker, best: theirs } => {
                c.on_finished(worker)?;
                info!(worker, deviation = ?theirs.as_ref().map(|s| s.deviation), "worker finished");
                if let Some(s) = theirs {
                    if s.improves_on(best.as_ref()) {
                        best = Some(s);
                    }
                }
            }
        }
    }
    Ok(CoordinatorOutcome {
        best,
        best_reported: c.best_reported(),
    })
}
