//! The abstract graph contract consumed by every search algorithm.

use crate::error::Error;

/// Shared contract for weighted graphs with integer node indices.
///
/// Nodes are `usize` indices in `[0, size())`. Implementations append
/// neighbors into a caller-supplied buffer so that hot search loops incur
/// no per-query allocations.
///
/// # Trait hierarchy
///
/// | Requirement | Used by |
/// |---|---|
/// | `neighbors` | components, SCC, cost/validity checks |
/// | `estimate` + `min_weight` | A*, MAPF |
/// | `pause_cost_at` + `edge_collision` | MAPF |
pub trait Graph {
    /// Total node count, constant between structural mutations.
    fn size(&self) -> usize;

    /// Append the neighbors of `node` into `buf` as `(target, weight)`
    /// pairs. The caller clears `buf` before calling.
    ///
    /// With `reversed = false` these are outgoing edges; with
    /// `reversed = true`, incoming edges presented as outgoing (used by
    /// reverse-reachability passes). Edges into or out of blocked nodes
    /// must not appear.
    fn neighbors(&self, node: usize, reversed: bool, buf: &mut Vec<(usize, f64)>);

    /// Lower bound on the distance between two nodes, in steps.
    ///
    /// Must satisfy `estimate(a, b) * min_weight() <= true cost(a, b)`
    /// for every pair (admissible), and `estimate(n, n) == 0`.
    /// Coordinate-free graphs may return 0.
    fn estimate(&self, a: usize, b: usize) -> f64;

    /// Whether edges are directed. Fixed for the graph's lifetime;
    /// governs which connectivity analysis applies.
    fn is_directed(&self) -> bool;

    /// The minimum finite weight currently in the graph, used to scale
    /// the heuristic estimate.
    fn min_weight(&self) -> f64;

    /// Whether nodes carry 2D coordinates.
    fn has_coordinates(&self) -> bool {
        false
    }

    /// Whether `node` participates in traversal. Blocked grid nodes
    /// return false; graphs without obstacles keep the default.
    fn is_traversable(&self, _node: usize) -> bool {
        true
    }

    /// The global pause-action cost charged when an agent waits in place
    /// for one time step.
    fn pause_cost(&self) -> f64;

    /// The pause-action cost at a specific node, per the active policy.
    fn pause_cost_at(&self, _node: usize) -> f64 {
        self.pause_cost()
    }

    /// Whether two agents may not traverse the same edge in opposite
    /// directions during the same time step.
    fn edge_collision(&self) -> bool;

    /// Human-readable label for a node. Defaults to its index.
    fn node_label(&self, node: usize) -> String {
        node.to_string()
    }

    /// True iff there is an edge from `a` to `b`.
    fn adjacent(&self, a: usize, b: usize) -> bool {
        if a >= self.size() || b >= self.size() {
            return false;
        }
        let mut buf = Vec::new();
        self.neighbors(a, false, &mut buf);
        buf.iter().any(|&(n, _)| n == b)
    }

    /// Sum the edge weights along `path`.
    ///
    /// A path of length ≤ 1 costs 0. Fails with [`Error::InvalidPath`]
    /// at the first consecutive pair with no connecting edge.
    fn calculate_cost(&self, path: &[usize]) -> Result<f64, Error> {
        if let Some(&n) = path.iter().find(|&&n| n >= self.size()) {
            return Err(Error::InvalidArgument(format!(
                "path contains node {n} but the graph has {} nodes",
                self.size()
            )));
        }
        let mut cost = 0.0;
        let mut buf = Vec::new();
        for pair in path.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            buf.clear();
            self.neighbors(from, false, &mut buf);
            match buf.iter().find(|&&(n, _)| n == to) {
                Some(&(_, w)) => cost += w,
                None => return Err(Error::InvalidPath { from, to }),
            }
        }
        Ok(cost)
    }

    /// True iff every consecutive pair in `path` is adjacent under the
    /// current graph state. Recomputed on demand, never cached.
    fn is_valid_path(&self, path: &[usize]) -> bool {
        if path.iter().any(|&n| n >= self.size()) {
            return false;
        }
        path.windows(2).all(|pair| self.adjacent(pair[0], pair[1]))
    }

    /// Render a path using [`node_label`](Self::node_label).
    fn path_to_string(&self, path: &[usize]) -> String {
        path.iter()
            .map(|&n| self.node_label(n))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Per-graph multi-agent policy state: pause-action pricing and the
/// edge-collision rule. Owned by each concrete graph and mutated only
/// through the guarded setters.
#[derive(Debug, Clone)]
pub struct MapfConfig {
    pause_cost: f64,
    edge_collision: bool,
}

impl Default for MapfConfig {
    fn default() -> Self {
        Self {
            pause_cost: 1.0,
            edge_collision: false,
        }
    }
}

impl MapfConfig {
    /// Set the global pause-action cost. Rejects negative or non-finite
    /// values; never clamps.
    pub fn set_pause_cost(&mut self, cost: f64) -> Result<(), Error> {
        if !cost.is_finite() || cost < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "pause action cost must be non-negative, got {cost}"
            )));
        }
        self.pause_cost = cost;
        Ok(())
    }

    /// The global pause-action cost.
    pub fn pause_cost(&self) -> f64 {
        self.pause_cost
    }

    /// Toggle the edge-collision rule. Takes effect for subsequent MAPF
    /// calls only.
    pub fn set_edge_collision(&mut self, on: bool) {
        self.edge_collision = on;
    }

    /// Whether the edge-collision rule is active.
    pub fn edge_collision(&self) -> bool {
        self.edge_collision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapf_config_defaults() {
        let cfg = MapfConfig::default();
        assert_eq!(cfg.pause_cost(), 1.0);
        assert!(!cfg.edge_collision());
    }

    #[test]
    fn negative_pause_cost_rejected() {
        let mut cfg = MapfConfig::default();
        assert!(cfg.set_pause_cost(-0.5).is_err());
        assert!(cfg.set_pause_cost(f64::NAN).is_err());
        // value is unchanged, not clamped
        assert_eq!(cfg.pause_cost(), 1.0);
        cfg.set_pause_cost(2.5).unwrap();
        assert_eq!(cfg.pause_cost(), 2.5);
    }
}
