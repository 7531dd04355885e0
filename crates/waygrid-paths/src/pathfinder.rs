use std::time::{Duration, Instant};

use waygrid_core::Error;

/// A node with an associated cost, returned from Dijkstra map queries.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceNode {
    pub node: usize,
    pub cost: f64,
}

/// Sentinel cost meaning "unreachable" in Dijkstra maps.
pub const UNREACHABLE: f64 = f64::INFINITY;

/// Elapsed-time checks run once per this many frontier expansions.
pub(crate) const TIMEOUT_CHECK_INTERVAL: u64 = 64;

// ---------------------------------------------------------------------------
// Internal node for priority-queue searches
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct Node {
    pub(crate) g: f64,
    pub(crate) f: f64,
    pub(crate) parent: usize,
    pub(crate) generation: u32,
    pub(crate) open: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            g: 0.0,
            f: 0.0,
            parent: usize::MAX,
            generation: 0,
            open: false,
        }
    }
}

/// Reference into the node array, ordered by `f` for use in `BinaryHeap`.
///
/// Entries with equal `f` pop most-recently-discovered-first: `seq` is a
/// monotone insertion counter and larger values win. This is the engine's
/// documented tie-breaking rule.
#[derive(Clone, Copy)]
pub(crate) struct NodeRef {
    pub(crate) idx: usize,
    pub(crate) f: f64,
    pub(crate) seq: u64,
}

impl Ord for NodeRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse so BinaryHeap (max-heap) pops smallest f first.
        other
            .f
            .total_cmp(&self.f)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for NodeRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for NodeRef {}

// ---------------------------------------------------------------------------
// Pathfinder
// ---------------------------------------------------------------------------

/// Central coordinator for single-graph searches.
///
/// `Pathfinder` owns all internal caches (node arrays, component labels,
/// traversal stacks, neighbor scratch buffer) so that repeated queries on
/// graphs of the same size incur no allocations after warm-up. An optional
/// wall-clock budget bounds every search started through it; exceeding the
/// budget fails with [`Error::Timeout`], which is never conflated with
/// [`Error::NoPathFound`].
pub struct Pathfinder {
    pub(crate) len: usize,
    // A* caches
    pub(crate) astar_nodes: Vec<Node>,
    pub(crate) astar_generation: u32,
    pub(crate) seq: u64,
    // Dijkstra caches
    pub(crate) dijkstra_nodes: Vec<Node>,
    pub(crate) dijkstra_generation: u32,
    pub(crate) dijkstra_results: Vec<DistanceNode>,
    pub(crate) dijkstra_map: Vec<f64>,
    // Component / SCC caches
    pub(crate) cc_labels: Vec<i32>,
    pub(crate) cc_stack: Vec<usize>,
    pub(crate) scc_stack: Vec<(usize, bool)>,
    pub(crate) scc_order: Vec<usize>,
    // shared scratch buffer for neighbor queries
    pub(crate) nbuf: Vec<(usize, f64)>,
    time_limit: Option<Duration>,
}

impl Pathfinder {
    /// Create a `Pathfinder` with caches sized for `size` nodes.
    pub fn new(size: usize) -> Self {
        Self {
            len: size,
            astar_nodes: vec![Node::default(); size],
            astar_generation: 0,
            seq: 0,
            dijkstra_nodes: vec![Node::default(); size],
            dijkstra_generation: 0,
            dijkstra_results: Vec::new(),
            dijkstra_map: vec![UNREACHABLE; size],
            cc_labels: vec![-1; size],
            cc_stack: Vec::new(),
            scc_stack: Vec::new(),
            scc_order: Vec::new(),
            nbuf: Vec::with_capacity(8),
            time_limit: None,
        }
    }

    /// Bound every subsequent search by a wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Replace or clear the wall-clock budget.
    pub fn set_time_limit(&mut self, limit: Option<Duration>) {
        self.time_limit = limit;
    }

    /// The active wall-clock budget, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Number of nodes the caches are sized for.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Resize caches for a graph of `size` nodes.
    ///
    /// If the new size fits within existing capacity, caches are kept and
    /// only generation counters are bumped so stale entries are ignored.
    /// Otherwise caches are reallocated.
    pub fn set_size(&mut self, size: usize) {
        let capacity = self.astar_nodes.len();
        self.len = size;

        if size <= capacity {
            self.astar_generation = self.astar_generation.wrapping_add(1);
            self.dijkstra_generation = self.dijkstra_generation.wrapping_add(1);
            self.dijkstra_results.clear();
            return;
        }

        self.astar_nodes.clear();
        self.astar_nodes.resize(size, Node::default());
        self.astar_generation = 0;

        self.dijkstra_nodes.clear();
        self.dijkstra_nodes.resize(size, Node::default());
        self.dijkstra_generation = 0;
        self.dijkstra_results.clear();
        self.dijkstra_map.clear();
        self.dijkstra_map.resize(size, UNREACHABLE);

        self.cc_labels.clear();
        self.cc_labels.resize(size, -1);
        self.cc_stack.clear();
        self.scc_stack.clear();
        self.scc_order.clear();
    }

    /// Grow caches if the graph is larger than the last query's.
    pub(crate) fn ensure_size(&mut self, size: usize) {
        if size != self.len {
            self.set_size(size);
        }
    }

    /// The instant at which in-flight searches must give up, if a budget
    /// is set.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.time_limit.map(|limit| Instant::now() + limit)
    }
}

/// Assert that `path` has the expected length.
///
/// This guards internal algorithm invariants (padded multi-agent paths,
/// reconstructed search results), not caller input: a mismatch indicates a
/// bug, aborts debug builds, and surfaces as [`Error::Contract`] in
/// release builds.
pub fn ensure_path_length(path: &[usize], length: usize) -> Result<(), Error> {
    debug_assert_eq!(
        path.len(),
        length,
        "path has length {}, expected {length}",
        path.len()
    );
    if path.len() != length {
        return Err(Error::Contract(format!(
            "path has length {}, expected {length}",
            path.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_size_smaller_preserves_capacity() {
        let mut pf = Pathfinder::new(400);
        pf.set_size(25);
        assert_eq!(pf.size(), 25);
        assert_eq!(pf.astar_nodes.len(), 400);
        assert!(pf.astar_generation > 0 || pf.dijkstra_generation > 0);
    }

    #[test]
    fn set_size_larger_reallocates() {
        let mut pf = Pathfinder::new(25);
        pf.set_size(400);
        assert_eq!(pf.size(), 400);
        assert_eq!(pf.astar_nodes.len(), 400);
        assert_eq!(pf.dijkstra_map.len(), 400);
        assert_eq!(pf.cc_labels.len(), 400);
    }

    #[test]
    fn noderef_orders_smallest_f_first() {
        let mut heap = std::collections::BinaryHeap::new();
        heap.push(NodeRef { idx: 0, f: 2.0, seq: 0 });
        heap.push(NodeRef { idx: 1, f: 1.0, seq: 1 });
        heap.push(NodeRef { idx: 2, f: 1.0, seq: 2 });
        // Smallest f wins; equal f pops most-recently-discovered-first.
        assert_eq!(heap.pop().unwrap().idx, 2);
        assert_eq!(heap.pop().unwrap().idx, 1);
        assert_eq!(heap.pop().unwrap().idx, 0);
    }

    #[test]
    fn ensure_path_length_contract() {
        assert!(ensure_path_length(&[0, 1, 2], 3).is_ok());
        #[cfg(not(debug_assertions))]
        assert!(matches!(
            ensure_path_length(&[0, 1], 3),
            Err(Error::Contract(_))
        ));
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn distance_node_round_trip() {
        let node = DistanceNode { node: 7, cost: 4.5 };
        let json = serde_json::to_string(&node).unwrap();
        let back: DistanceNode = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }
}
