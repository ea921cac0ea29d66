//! Data types for the topology model.
//!
//! `Topology` owns its edges, kind sequence and parameters. The trajectory map
//! is a cache: it is dropped whenever the edges change and rebuilt on demand.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cfg::DEFAULT_PARAM;
use crate::deviation::Target;
use crate::error::TopologyError;

use super::paths::enumerate_trajectories;

/// One-qubit optical element kinds. Order matters: kind sequences are
/// permuted lexicographically starting from the sorted sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Beamsplitter,
    DirectionalCoupler,
    Waveplate,
}

impl ElementKind {
    /// Number of parameter slots the element consumes.
    pub fn param_width(self) -> usize {
        match self {
            Self::Beamsplitter | Self::DirectionalCoupler => 1,
            Self::Waveplate => 2,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Beamsplitter => "bs",
            Self::DirectionalCoupler => "dc",
            Self::Waveplate => "wp",
        }
    }
}

/// How many elements of each kind a circuit carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementCounts {
    pub beamsplitters: usize,
    pub couplers: usize,
    pub waveplates: usize,
}

impl ElementCounts {
    pub fn new(beamsplitters: usize, couplers: usize, waveplates: usize) -> Self {
        Self {
            beamsplitters,
            couplers,
            waveplates,
        }
    }

    /// Q: total number of elements.
    pub fn total(&self) -> usize {
        self.beamsplitters + self.couplers + self.waveplates
    }

    /// Length of the parameter vector.
    pub fn param_count(&self) -> usize {
        self.beamsplitters + self.couplers + 2 * self.waveplates
    }

    /// `ports + 2Q`, or `None` when it does not fit in `usize`. The parameter
    /// length never exceeds `2Q`, so [`Self::total`] and [`Self::param_count`]
    /// cannot overflow once this has returned `Some`.
    pub fn checked_node_count(&self, ports: usize) -> Option<usize> {
        self.beamsplitters
            .checked_add(self.couplers)?
            .checked_add(self.waveplates)?
            .checked_mul(2)?
            .checked_add(ports)
    }

    /// Sorted kind sequence: beamsplitters, then couplers, then waveplates.
    pub fn canonical_kinds(&self) -> Vec<ElementKind> {
        let mut kinds = Vec::with_capacity(self.total());
        kinds.extend(std::iter::repeat(ElementKind::Beamsplitter).take(self.beamsplitters));
        kinds.extend(std::iter::repeat(ElementKind::DirectionalCoupler).take(self.couplers));
        kinds.extend(std::iter::repeat(ElementKind::Waveplate).take(self.waveplates));
        kinds
    }

    fn of_kinds(kinds: &[ElementKind]) -> Self {
        let mut c = Self::default();
        for k in kinds {
            match k {
                ElementKind::Beamsplitter => c.beamsplitters += 1,
                ElementKind::DirectionalCoupler => c.couplers += 1,
                ElementKind::Waveplate => c.waveplates += 1,
            }
        }
        c
    }
}

/// Location of one element's parameters inside the parameter vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamSlot {
    pub start: usize,
    pub width: usize,
}

impl ParamSlot {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.width
    }
}

fn slot_table(kinds: &[ElementKind]) -> Vec<ParamSlot> {
    let mut start = 0;
    kinds
        .iter()
        .map(|k| {
            let slot = ParamSlot {
                start,
                width: k.param_width(),
            };
            start += slot.width;
            slot
        })
        .collect()
}

/// Ordered node sequence `[input, dest, exit, dest, …, exit, dest]`.
pub type Trajectory = Vec<usize>;

/// P×P table of distinct trajectories, indexed by (input port, output port).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrajectoryMap {
    ports: usize,
    cells: Vec<BTreeSet<Trajectory>>,
}

impl TrajectoryMap {
    pub fn new(ports: usize) -> Self {
        Self {
            ports,
            cells: vec![BTreeSet::new(); ports * ports],
        }
    }

    pub fn ports(&self) -> usize {
        self.ports
    }

    pub fn get(&self, input: usize, output: usize) -> &BTreeSet<Trajectory> {
        &self.cells[input * self.ports + output]
    }

    /// Whether at least one trajectory joins `input` to `output`.
    pub fn has_path(&self, input: usize, output: usize) -> bool {
        !self.get(input, output).is_empty()
    }

    /// Returns false if the trajectory was already present.
    pub fn insert(&mut self, input: usize, output: usize, path: Trajectory) -> bool {
        self.cells[input * self.ports + output].insert(path)
    }

    /// Total number of trajectories over all cells.
    pub fn total(&self) -> usize {
        self.cells.iter().map(BTreeSet::len).sum()
    }

    /// Iterate `(input, output, trajectories)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &BTreeSet<Trajectory>)> + '_ {
        let p = self.ports;
        self.cells
            .iter()
            .enumerate()
            .map(move |(k, set)| (k / p, k % p, set))
    }
}

/// One candidate circuit: ports, elements, edges, parameters and target.
#[derive(Clone, Debug)]
pub struct Topology {
    ports: usize,
    counts: ElementCounts,
    kinds: Vec<ElementKind>,
    slots: Vec<ParamSlot>,
    edges: Vec<usize>,
    params: Vec<f64>,
    target: Arc<Target>,
    trajectories: Option<TrajectoryMap>,
}

impl Topology {
    /// Build a fully routed topology. `edges[i]` is the destination of node `i`;
    /// the assignment must be injective over `0..ports + 2Q`.
    pub fn new(
        ports: usize,
        counts: ElementCounts,
        edges: Vec<usize>,
    ) -> Result<Self, TopologyError> {
        if ports == 0 {
            return Err(TopologyError::NoPorts);
        }
        let nodes = counts
            .checked_node_count(ports)
            .ok_or(TopologyError::SizeOverflow)?;
        check_edges(nodes, &edges)?;
        let kinds = counts.canonical_kinds();
        Ok(Self {
            ports,
            counts,
            slots: slot_table(&kinds),
            kinds,
            edges,
            params: vec![DEFAULT_PARAM; counts.param_count()],
            target: Arc::new(Target::default()),
            trajectories: None,
        })
    }

    pub fn with_target(mut self, target: Arc<Target>) -> Self {
        self.target = target;
        self
    }

    /// P: number of circuit ports.
    pub fn ports(&self) -> usize {
        self.ports
    }

    pub fn counts(&self) -> ElementCounts {
        self.counts
    }

    /// Q: number of elements.
    pub fn element_total(&self) -> usize {
        self.kinds.len()
    }

    /// 2Q: the first circuit-port node index.
    pub fn element_ports(&self) -> usize {
        2 * self.kinds.len()
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[usize] {
        &self.edges
    }

    pub fn kinds(&self) -> &[ElementKind] {
        &self.kinds
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn target(&self) -> &Arc<Target> {
        &self.target
    }

    pub fn set_target(&mut self, target: Arc<Target>) {
        self.target = target;
    }

    /// Parameter slot of element `element`.
    pub fn slot(&self, element: usize) -> ParamSlot {
        self.slots[element]
    }

    /// Parameters consumed by element `element`.
    pub fn element_params(&self, element: usize) -> &[f64] {
        &self.params[self.slots[element].range()]
    }

    /// Replace the edges; the trajectory map is invalidated.
    pub fn set_edges(&mut self, edges: Vec<usize>) -> Result<(), TopologyError> {
        check_edges(self.edges.len(), &edges)?;
        self.edges = edges;
        self.trajectories = None;
        Ok(())
    }

    /// Reassign element kinds. The multiset must match the counts. Trajectories
    /// depend only on edges and stay valid; the slot table is rebuilt.
    pub fn set_kinds(&mut self, kinds: &[ElementKind]) -> Result<(), TopologyError> {
        if ElementCounts::of_kinds(kinds) != self.counts {
            return Err(TopologyError::KindMismatch);
        }
        self.kinds.clear();
        self.kinds.extend_from_slice(kinds);
        self.slots = slot_table(&self.kinds);
        Ok(())
    }

    pub fn set_params(&mut self, params: &[f64]) -> Result<(), TopologyError> {
        if params.len() != self.params.len() {
            return Err(TopologyError::ParamCount {
                expected: self.params.len(),
                got: params.len(),
            });
        }
        self.params.copy_from_slice(params);
        Ok(())
    }

    pub fn reset_params(&mut self) {
        self.params.fill(DEFAULT_PARAM);
    }

    /// Circuit-port offset of `node`, or None for element ports.
    pub fn port_of(&self, node: usize) -> Option<usize> {
        node.checked_sub(self.element_ports())
            .filter(|&p| p < self.ports)
    }

    /// Trajectory map for the current edges, enumerated on first use.
    pub fn trajectories(&mut self) -> Result<&TrajectoryMap, TopologyError> {
        let map = match self.trajectories.take() {
            Some(map) => map,
            None => enumerate_trajectories(self)?,
        };
        Ok(self.trajectories.insert(map))
    }

    /// Cached trajectory map, if built for the current edges.
    pub fn cached_trajectories(&self) -> Option<&TrajectoryMap> {
        self.trajectories.as_ref()
    }

    /// Run `f` with read access to both the topology and its trajectory map.
    pub(crate) fn with_trajectories<R>(
        &mut self,
        f: impl FnOnce(&Self, &TrajectoryMap) -> R,
    ) -> Result<R, TopologyError> {
        let map = match self.trajectories.take() {
            Some(map) => map,
            None => enumerate_trajectories(self)?,
        };
        let out = f(self, &map);
        self.trajectories = Some(map);
        Ok(out)
    }
}

fn check_edges(nodes: usize, edges: &[usize]) -> Result<(), TopologyError> {
    if edges.len() != nodes {
        return Err(TopologyError::EdgeCount {
            expected: nodes,
            got: edges.len(),
        });
    }
    let mut source_of: Vec<Option<usize>> = vec![None; nodes];
    for (node, &dest) in edges.iter().enumerate() {
        if dest >= nodes {
            return Err(TopologyError::EdgeOutOfRange { node, dest, nodes });
        }
        if let Some(first) = source_of[dest] {
            return Err(TopologyError::EdgeCollision {
                dest,
                first,
                second: node,
            });
        }
        source_of[dest] = Some(node);
    }
    Ok(())
}

/// Edges on the first line, kind tags on the second.
impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.edges {
            write!(f, "{e} ")?;
        }
        writeln!(f)?;
        for k in &self.kinds {
            write!(f, "{} ", k.tag())?;
        }
        Ok(())
    }
}
