//! Trajectory engine: depth-first enumeration of light paths.
//!
//! From every circuit input port, follow its edge. Landing on an element port
//! branches into both ports of that element (the element is a two-way
//! splitter); landing on a circuit port ends the path, which is recorded under
//! (start port, end port).

use crate::error::TopologyError;

use super::types::{Topology, TrajectoryMap};

/// Enumerate all trajectories of `topology`.
///
/// Fails with `RoutingCycle` if some path re-enters an element it already
/// passed through; such routing never reaches an output and the recursion
/// would not terminate. Enumerated topologies never hit this because element
/// ports only route forward.
pub fn enumerate_trajectories(topology: &Topology) -> Result<TrajectoryMap, TopologyError> {
    PathRunner::new(topology).run()
}

/// DFS runner carrying the running path and the elements on it.
struct PathRunner<'a> {
    t: &'a Topology,
    element_ports: usize,
    map: TrajectoryMap,
    path: Vec<usize>,
    on_path: Vec<bool>,
}

impl<'a> PathRunner<'a> {
    fn new(t: &'a Topology) -> Self {
        Self {
            t,
            element_ports: t.element_ports(),
            map: TrajectoryMap::new(t.ports()),
            path: Vec::with_capacity(2 * t.element_total() + 2),
            on_path: vec![false; t.element_total()],
        }
    }

    fn run(mut self) -> Result<TrajectoryMap, TopologyError> {
        for port in 0..self.t.ports() {
            self.walk(self.element_ports + port)?;
            debug_assert!(self.path.is_empty());
        }
        Ok(self.map)
    }

    fn walk(&mut self, node: usize) -> Result<(), TopologyError> {
        let dest = self.t.edges()[node];
        self.path.push(node);
        self.path.push(dest);
        let res = if dest < self.element_ports {
            let element = dest / 2;
            if self.on_path[element] {
                Err(TopologyError::RoutingCycle { element })
            } else {
                self.on_path[element] = true;
                let res = self
                    .walk(2 * element)
                    .and_then(|()| self.walk(2 * element + 1));
                self.on_path[element] = false;
                res
            }
        } else {
            let start = self.path[0] - self.element_ports;
            let end = dest - self.element_ports;
            self.map.insert(start, end, self.path.clone());
            Ok(())
        };
        self.path.truncate(self.path.len() - 2);
        res
    }
}
