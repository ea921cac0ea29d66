//! Backtracking completion of a template into full edge arrays.
//!
//! Nodes are visited in index order. Nodes the template fixes are skipped.
//! An open element port `m` may only route to a node `>= (m / 2) * 2 + 2`,
//! i.e. a later element or a circuit port, so every completion is acyclic.
//! Open circuit input ports may route to any free node.

use super::template::Template;

/// Call `visit` once per complete edge array reachable from `template`;
/// returns how many were produced.
pub fn for_each_completion(template: &Template, mut visit: impl FnMut(&[usize])) -> u64 {
    run(template, 0, &mut visit)
}

/// Completion starting at node `start`. Every node below `start` must already
/// be assigned; otherwise nothing is produced.
pub(crate) fn run(template: &Template, start: usize, visit: &mut dyn FnMut(&[usize])) -> u64 {
    let edges = template.edges();
    if edges[..start.min(edges.len())].iter().any(Option::is_none) {
        return 0;
    }
    let mut c = Completion {
        element_ports: template.element_ports(),
        edges: edges.iter().map(|e| e.unwrap_or(usize::MAX)).collect(),
        fixed: edges.iter().map(Option::is_some).collect(),
        busy: (0..edges.len()).map(|d| template.is_busy(d)).collect(),
        visit,
        count: 0,
    };
    c.step(start);
    c.count
}

struct Completion<'v> {
    element_ports: usize,
    edges: Vec<usize>,
    fixed: Vec<bool>,
    busy: Vec<bool>,
    visit: &'v mut dyn FnMut(&[usize]),
    count: u64,
}

impl Completion<'_> {
    fn step(&mut self, node: usize) {
        let n = self.edges.len();
        if node == n {
            self.count += 1;
            (self.visit)(&self.edges);
            return;
        }
        if self.fixed[node] {
            self.step(node + 1);
            return;
        }
        let lo = if node < self.element_ports {
            (node / 2) * 2 + 2
        } else {
            0
        };
        for dest in lo..n {
            if self.busy[dest] {
                continue;
            }
            self.busy[dest] = true;
            self.edges[node] = dest;
            self.step(node + 1);
            self.busy[dest] = false;
        }
        self.edges[node] = usize::MAX;
    }
}
