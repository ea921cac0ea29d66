//! Worker loop: request, search, repeat until shutdown.

use tracing::debug;

use crate::enumerate::{search_best, SearchContext, Template};
use crate::error::SchedulerError;
use crate::scored::Scored;

use super::messages::{Assignment, WorkerMessage};
use super::transport::WorkerLink;

/// Run one worker against `link`. Each task index selects a template from
/// `templates`; the worker's best carries over between tasks and is sent back
/// with `Finished`.
pub fn run_worker(
    link: &mut dyn WorkerLink,
    templates: &[Template],
    ctx: &SearchContext<'_>,
) -> Result<(), SchedulerError> {
    let id = link.id();
    let mut best: Option<Scored> = None;
    loop {
        link.report(WorkerMessage::Ready {
            worker: id,
            best: best.as_ref().map(|s| s.deviation),
        })?;
        match link.next()? {
            Assignment::Task(index) => {
                let template = templates.get(index).ok_or_else(|| {
                    SchedulerError::Protocol(format!("template index {index} out of range"))
                })?;
                debug!(worker = id, index, %template, "task");
                best = search_best(0, template, best, ctx);
                ctx.observer.on_unit_done();
            }
            Assignment::Shutdown => {
                link.report(WorkerMessage::Finished { worker: id, best })?;
                return Ok(());
            }
        }
    }
}
