//! Partially assigned edge arrays and shallow template generation.

use std::fmt;

use crate::error::TopologyError;
use crate::topology::ElementCounts;

/// A topology whose edges are only partly assigned. Unassigned nodes are
/// `None`; `busy[d]` marks destinations already taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    ports: usize,
    counts: ElementCounts,
    edges: Vec<Option<usize>>,
    busy: Vec<bool>,
}

impl Template {
    /// Template with no edge assigned.
    pub fn empty(ports: usize, counts: ElementCounts) -> Result<Self, TopologyError> {
        if ports == 0 {
            return Err(TopologyError::NoPorts);
        }
        let nodes = counts
            .checked_node_count(ports)
            .ok_or(TopologyError::SizeOverflow)?;
        Ok(Self {
            ports,
            counts,
            edges: vec![None; nodes],
            busy: vec![false; nodes],
        })
    }

    pub fn ports(&self) -> usize {
        self.ports
    }

    pub fn counts(&self) -> ElementCounts {
        self.counts
    }

    /// 2Q: first circuit-port node.
    pub fn element_ports(&self) -> usize {
        2 * self.counts.total()
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Option<usize>] {
        &self.edges
    }

    pub fn is_busy(&self, dest: usize) -> bool {
        self.busy[dest]
    }

    /// Fix `node -> dest`. A node that was already assigned is re-routed.
    pub fn assign(&mut self, node: usize, dest: usize) -> Result<(), TopologyError> {
        let nodes = self.edges.len();
        if node >= nodes || dest >= nodes {
            return Err(TopologyError::EdgeOutOfRange { node, dest, nodes });
        }
        if self.edges[node] == Some(dest) {
            return Ok(());
        }
        if self.busy[dest] {
            let first = self
                .edges
                .iter()
                .position(|&d| d == Some(dest))
                .unwrap_or(node);
            return Err(TopologyError::EdgeCollision {
                dest,
                first,
                second: node,
            });
        }
        self.clear(node);
        self.set(node, dest);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.edges.iter().all(Option::is_some)
    }

    /// The full edge array, if every node is assigned.
    pub fn complete_edges(&self) -> Option<Vec<usize>> {
        self.edges.iter().copied().collect()
    }

    pub(crate) fn set(&mut self, node: usize, dest: usize) {
        debug_assert!(self.edges[node].is_none() && !self.busy[dest]);
        self.edges[node] = Some(dest);
        self.busy[dest] = true;
    }

    pub(crate) fn clear(&mut self, node: usize) {
        if let Some(dest) = self.edges[node].take() {
            self.busy[dest] = false;
        }
    }
}

/// Assigned destinations, `-` for open nodes.
impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, e) in self.edges.iter().enumerate() {
            if k > 0 {
                write!(f, " ")?;
            }
            match e {
                Some(d) => write!(f, "{d}")?,
                None => write!(f, "-")?,
            }
        }
        Ok(())
    }
}

/// Number of templates fixing `depth` input ports out of `nodes` free
/// destinations: `nodes! / (nodes - depth)!`. Saturates on overflow.
pub fn template_count(nodes: usize, depth: usize) -> u128 {
    if depth > nodes {
        return 0;
    }
    (nodes - depth + 1..=nodes).fold(1u128, |acc, n| acc.saturating_mul(n as u128))
}

/// Smallest input-port depth whose template count reaches `min_templates`,
/// capped at `ports`.
pub fn depth_for(ports: usize, nodes: usize, min_templates: u128) -> usize {
    (0..=ports)
        .find(|&k| template_count(nodes, k) >= min_templates)
        .unwrap_or(ports)
}

/// All templates obtained by routing the first `depth` circuit input ports of
/// `base` to every free destination. Ports `base` already fixes are kept.
pub fn enumerate_templates(depth: usize, base: &Template) -> Vec<Template> {
    let first = base.element_ports();
    let last = first + depth.min(base.ports());
    let mut out = Vec::new();
    let mut work = base.clone();
    expand(&mut work, first, last, &mut out);
    out
}

fn expand(t: &mut Template, node: usize, last: usize, out: &mut Vec<Template>) {
    if node == last {
        out.push(t.clone());
        return;
    }
    if t.edges[node].is_some() {
        expand(t, node + 1, last, out);
        return;
    }
    for dest in 0..t.node_count() {
        if t.busy[dest] {
            continue;
        }
        t.set(node, dest);
        expand(t, node + 1, last, out);
        t.clear(node);
    }
}
