//! Shared-memory tier: score a batch of full topologies, or sift every
//! completion of a template list, in parallel.
//!
//! Each iteration owns its `Topology`. The only shared mutable state is the
//! best record (behind a lock, compared before replacing) and the observer's
//! atomic counters. `par_bridge` serializes pulls from the input stream.

use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::enumerate::{for_each_completion, tune_kinds, SearchContext, Template};
use crate::error::FormatError;
use crate::io::{BatchHeader, EdgeLine};
use crate::observe::Observer;
use crate::scored::Scored;
use crate::topology::{SiftMask, Topology};

/// Result of [`score_batch`].
#[derive(Clone, Debug, Default)]
pub struct BatchOutcome {
    pub best: Option<Scored>,
    /// Input line of the best topology.
    pub best_line: Option<usize>,
    pub lines: u64,
    pub sifted: u64,
}

#[derive(Default)]
struct Shared {
    best: Option<(usize, Scored)>,
    lines: u64,
    sifted: u64,
}

impl Shared {
    /// Lower deviation wins; on a tie the earlier input line wins, so the
    /// result does not depend on scheduling.
    fn offer(&mut self, line: usize, cand: Scored) {
        let better = match &self.best {
            None => true,
            Some((l, b)) => {
                cand.deviation < b.deviation || (cand.deviation == b.deviation && line < *l)
            }
        };
        if better {
            self.best = Some((line, cand));
        }
    }
}

/// Tune every topology line (all distinct kind sequences) and keep the best.
/// The first malformed line aborts the batch.
pub fn score_batch<I>(
    lines: I,
    header: BatchHeader,
    ctx: &SearchContext<'_>,
) -> Result<BatchOutcome, FormatError>
where
    I: Iterator<Item = Result<EdgeLine, FormatError>> + Send,
{
    let shared = Mutex::new(Shared::default());
    let canonical = header.counts.canonical_kinds();
    lines.par_bridge().try_for_each(|item| -> Result<(), FormatError> {
        let EdgeLine { line, edges } = item?;
        let mut t = Topology::new(header.ports, header.counts, edges)
            .map_err(|e| FormatError::malformed(line, e.to_string()))?
            .with_target(Arc::clone(ctx.target));
        ctx.observer.on_generated();
        let passed = t.sift();
        let mut local = None;
        if passed {
            ctx.observer.on_sifted();
            tune_kinds(&mut t, &canonical, ctx, &mut local);
        } else {
            debug!(line, "sift rejected");
        }
        let mut s = shared.lock();
        s.lines += 1;
        s.sifted += u64::from(passed);
        if let Some(cand) = local {
            s.offer(line, cand);
        }
        drop(s);
        ctx.observer.on_unit_done();
        Ok(())
    })?;
    let s = shared.into_inner();
    info!(lines = s.lines, sifted = s.sifted, "batch scored");
    let (best_line, best) = match s.best {
        Some((line, b)) => (Some(line), Some(b)),
        None => (None, None),
    };
    Ok(BatchOutcome {
        best,
        best_line,
        lines: s.lines,
        sifted: s.sifted,
    })
}

/// Complete every template without optimizing; call `emit` with the edges of
/// each completion that passes the masked sift. Returns the number emitted.
/// `emit` runs concurrently and must do its own locking.
pub fn sift_exhaustive(
    templates: &[Template],
    mask: &SiftMask,
    emit: &(dyn Fn(&[usize]) + Sync),
    observer: &dyn Observer,
) -> u64 {
    let total = templates
        .par_iter()
        .map(|template| {
            let mut passed = 0u64;
            for_each_completion(template, |edges| {
                observer.on_generated();
                let Ok(mut t) = Topology::new(template.ports(), template.counts(), edges.to_vec())
                else {
                    return;
                };
                if t.sift_masked(mask) {
                    observer.on_sifted();
                    emit(edges);
                    passed += 1;
                }
            });
            observer.on_unit_done();
            passed
        })
        .sum();
    info!(templates = templates.len(), passed = total, "sift finished");
    total
}
