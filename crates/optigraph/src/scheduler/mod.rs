//! Distributed scheduler: a coordinator hands templates to workers on request.
//!
//! Protocol
//! - A worker sends `Ready` with its best deviation so far; the coordinator
//!   answers with the next unassigned template index, or `Shutdown` once all
//!   indices are out. A worker therefore holds at most one task, and no index
//!   is handed out twice.
//! - On `Shutdown` the worker replies `Finished` with its best topology and
//!   exits. The coordinator stops after every worker has finished.
//! - A lost peer is fatal to the run; there is no retry.
//!
//! The state machines speak through `CoordinatorLink` / `WorkerLink`;
//! `run_local` wires them over in-process channels and worker threads.

mod coordinator;
mod messages;
mod transport;
mod worker;

use std::thread;

use tracing::info;

use crate::enumerate::{SearchContext, Template};
use crate::error::SchedulerError;
use crate::scored::Scored;

pub use coordinator::{run_coordinator, Coordinator, CoordinatorOutcome};
pub use messages::{Assignment, WorkerMessage};
pub use transport::{channel_links, ChannelCoordinator, ChannelWorker, CoordinatorLink, WorkerLink};
pub use worker::run_worker;

/// Outcome of a scheduled search.
#[derive(Clone, Debug)]
pub struct SearchSummary {
    pub best: Option<Scored>,
    /// Lowest deviation the workers reported while asking for work.
    pub best_reported: Option<f64>,
    pub templates: usize,
    pub workers: usize,
}

/// Search `templates` with `workers` threads (at least one) and a coordinator
/// on the calling thread.
pub fn run_local(
    templates: &[Template],
    workers: usize,
    ctx: &SearchContext<'_>,
) -> Result<SearchSummary, SchedulerError> {
    let workers = workers.max(1);
    info!(templates = templates.len(), workers, "scheduling");
    let (mut coordinator, links) = channel_links(workers);
    let outcome = thread::scope(|s| {
        let handles: Vec<_> = links
            .into_iter()
            .map(|mut link| {
                let ctx = *ctx;
                s.spawn(move || run_worker(&mut link, templates, &ctx))
            })
            .collect();
        let served = run_coordinator(&mut coordinator, templates.len());
        // Unblocks workers still waiting for an assignment.
        drop(coordinator);
        let mut lost = None;
        for (worker, h) in handles.into_iter().enumerate() {
            match h.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    lost.get_or_insert(e);
                }
                Err(_) => {
                    lost.get_or_insert(SchedulerError::WorkerLost { worker });
                }
            }
        }
        match lost {
            Some(e) => Err(e),
            None => served,
        }
    })?;
    info!(
        deviation = ?outcome.best.as_ref().map(|b| b.deviation),
        "search finished"
    );
    Ok(SearchSummary {
        best: outcome.best,
        best_reported: outcome.best_reported,
        templates: templates.len(),
        workers,
    })
}
