//! Best-topology search over the completions of one template.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cfg::{DEFAULT_TEMPLATE_DEPTH, MAX_DEVIATION};
use crate::deviation::{tune, Target};
use crate::observe::Observer;
use crate::optimize::{OptCfg, Optimizer};
use crate::scored::Scored;
use crate::topology::{ElementKind, Topology};

use super::completion::run;
use super::template::Template;

/// Search configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCfg {
    /// Circuit input ports fixed per template.
    pub template_depth: usize,
    /// Add unitarity equality constraints to every optimization.
    pub unitarity: bool,
    pub optimizer: OptCfg,
}

impl Default for SearchCfg {
    fn default() -> Self {
        Self {
            template_depth: DEFAULT_TEMPLATE_DEPTH,
            unitarity: false,
            optimizer: OptCfg::default(),
        }
    }
}

/// Everything a search over one template reads but does not own.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub target: &'a Arc<Target>,
    pub cfg: &'a SearchCfg,
    pub optimizer: &'a dyn Optimizer,
    pub observer: &'a dyn Observer,
}

/// Complete `template` from node `start`, sift every completion, tune each
/// distinct kind sequence of the survivors and return the best result.
///
/// `current` is the best known so far; a candidate replaces it only with a
/// strictly lower deviation.
pub fn search_best(
    start: usize,
    template: &Template,
    current: Option<Scored>,
    ctx: &SearchContext<'_>,
) -> Option<Scored> {
    let mut best = current;
    let canonical = template.counts().canonical_kinds();
    let mut visit = |edges: &[usize]| {
        ctx.observer.on_generated();
        let mut t = match Topology::new(template.ports(), template.counts(), edges.to_vec()) {
            Ok(t) => t.with_target(Arc::clone(ctx.target)),
            Err(e) => {
                debug!(error = %e, "skipping invalid completion");
                return;
            }
        };
        if !t.sift() {
            return;
        }
        ctx.observer.on_sifted();
        tune_kinds(&mut t, &canonical, ctx, &mut best);
    };
    run(template, start, &mut visit);
    best
}

/// Tune every distinct kind sequence of a sifted topology, replacing `best`
/// on strict improvement.
pub(crate) fn tune_kinds(
    t: &mut Topology,
    canonical: &[ElementKind],
    ctx: &SearchContext<'_>,
    best: &mut Option<Scored>,
) {
    let mut kinds = canonical.to_vec();
    let mut seen: HashSet<Vec<ElementKind>> = HashSet::new();
    loop {
        if seen.insert(kinds.clone()) && t.set_kinds(&kinds).is_ok() {
            let outcome = tune(t, ctx.optimizer, ctx.cfg.unitarity);
            let cand = Scored {
                topology: t.clone(),
                deviation: outcome.value,
                converged: outcome.converged,
            };
            if cand.deviation < MAX_DEVIATION && cand.improves_on(best.as_ref()) {
                debug!(deviation = cand.deviation, edges = ?cand.topology.edges(), "improved");
                ctx.observer.on_improved(cand.deviation);
                *best = Some(cand);
            }
        }
        if !next_permutation(&mut kinds) {
            break;
        }
    }
}

/// Rearrange into the next lexicographic permutation. Returns false (and
/// leaves the slice sorted) after the last one.
pub(crate) fn next_permutation<T: Ord>(v: &mut [T]) -> bool {
    let Some(i) = v.windows(2).rposition(|w| w[0] < w[1]) else {
        v.reverse();
        return false;
    };
    let j = v
        .iter()
        .rposition(|x| v[i] < *x)
        .unwrap_or(i + 1);
    v.swap(i, j);
    v[i + 1..].reverse();
    true
}
