//! A generic edge-weighted graph backed by adjacency lists.

use crate::error::Error;
use crate::graph::{Graph, MapfConfig};

/// A directed or undirected graph over `size` integer nodes with
/// non-negative edge weights.
///
/// Directed graphs keep a mirrored in-edge list so that the reversed
/// neighbor view needed by strongly-connected-component analysis costs
/// nothing to produce. The graph is coordinate-free, so the heuristic
/// estimate is 0 and A* degrades to uniform-cost search.
#[derive(Debug, Clone)]
pub struct AdjacencyList {
    directed: bool,
    out_edges: Vec<Vec<(usize, f64)>>,
    in_edges: Vec<Vec<(usize, f64)>>,
    min_weight: f64,
    mapf: MapfConfig,
}

impl AdjacencyList {
    /// Create a graph with `size` nodes and no edges.
    pub fn new(size: usize, directed: bool) -> Self {
        Self {
            directed,
            out_edges: vec![Vec::new(); size],
            in_edges: if directed { vec![Vec::new(); size] } else { Vec::new() },
            min_weight: 1.0,
            mapf: MapfConfig::default(),
        }
    }

    /// Add an edge from `from` to `to` with the given weight. On an
    /// undirected graph the edge is traversable both ways.
    ///
    /// Rejects out-of-range nodes and negative or non-finite weights.
    pub fn add_edge(&mut self, from: usize, to: usize, weight: f64) -> Result<(), Error> {
        let size = self.out_edges.len();
        if from >= size || to >= size {
            return Err(Error::InvalidArgument(format!(
                "edge ({from}, {to}) out of range for graph of {size} nodes"
            )));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "edge weight must be non-negative, got {weight}"
            )));
        }
        self.out_edges[from].push((to, weight));
        if self.directed {
            self.in_edges[to].push((from, weight));
        } else if from != to {
            self.out_edges[to].push((from, weight));
        }
        if weight < self.min_weight {
            self.min_weight = weight;
        }
        Ok(())
    }

    /// Total number of stored edges (an undirected edge counts once).
    pub fn edge_count(&self) -> usize {
        let stored: usize = self.out_edges.iter().map(Vec::len).sum();
        if self.directed {
            stored
        } else {
            // Self-loops are stored once, other edges twice.
            let loops = self
                .out_edges
                .iter()
                .enumerate()
                .flat_map(|(n, es)| es.iter().filter(move |&&(t, _)| t == n))
                .count();
            (stored - loops) / 2 + loops
        }
    }

    /// Set the global pause-action cost. Rejects negative values.
    pub fn set_pause_cost(&mut self, cost: f64) -> Result<(), Error> {
        self.mapf.set_pause_cost(cost)
    }

    /// Toggle the edge-collision rule for subsequent MAPF calls.
    pub fn set_edge_collision(&mut self, on: bool) {
        self.mapf.set_edge_collision(on);
    }
}

impl Graph for AdjacencyList {
    fn size(&self) -> usize {
        self.out_edges.len()
    }

    fn neighbors(&self, node: usize, reversed: bool, buf: &mut Vec<(usize, f64)>) {
        let edges = if reversed && self.directed {
            &self.in_edges[node]
        } else {
            &self.out_edges[node]
        };
        buf.extend_from_slice(edges);
    }

    fn estimate(&self, _a: usize, _b: usize) -> f64 {
        0.0
    }

    fn is_directed(&self) -> bool {
        self.directed
    }

    fn min_weight(&self) -> f64 {
        self.min_weight
    }

    fn pause_cost(&self) -> f64 {
        self.mapf.pause_cost()
    }

    fn edge_collision(&self) -> bool {
        self.mapf.edge_collision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undirected_edges_are_symmetric() {
        let mut g = AdjacencyList::new(3, false);
        g.add_edge(0, 1, 1.0).unwrap();
        g.add_edge(1, 2, 2.0).unwrap();
        assert!(g.adjacent(0, 1) && g.adjacent(1, 0));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.calculate_cost(&[0, 1, 2]).unwrap(), 3.0);
        assert_eq!(g.calculate_cost(&[2, 1, 0]).unwrap(), 3.0);
    }

    #[test]
    fn directed_edges_expose_reverse_view() {
        let mut g = AdjacencyList::new(3, true);
        g.add_edge(0, 1, 1.0).unwrap();
        g.add_edge(1, 2, 4.0).unwrap();
        assert!(g.adjacent(0, 1));
        assert!(!g.adjacent(1, 0));

        let mut buf = Vec::new();
        g.neighbors(2, true, &mut buf);
        assert_eq!(buf, vec![(1, 4.0)]);
        assert!(g.calculate_cost(&[2, 1]).is_err());
    }

    #[test]
    fn invalid_edges_rejected() {
        let mut g = AdjacencyList::new(2, false);
        assert!(g.add_edge(0, 5, 1.0).is_err());
        assert!(g.add_edge(0, 1, -1.0).is_err());
        assert!(g.add_edge(0, 1, f64::INFINITY).is_err());
    }

    #[test]
    fn min_weight_follows_cheapest_edge() {
        let mut g = AdjacencyList::new(3, true);
        g.add_edge(0, 1, 5.0).unwrap();
        assert_eq!(g.min_weight(), 1.0);
        g.add_edge(1, 2, 0.5).unwrap();
        assert_eq!(g.min_weight(), 0.5);
    }

    #[test]
    fn degenerate_paths_are_valid() {
        let g = AdjacencyList::new(2, false);
        assert!(g.is_valid_path(&[0]));
        assert!(g.is_valid_path(&[]));
        assert_eq!(g.calculate_cost(&[1]).unwrap(), 0.0);
        assert!(!g.is_valid_path(&[0, 1]));
        assert!(!g.is_valid_path(&[7]));
    }

    #[test]
    fn default_node_labels() {
        let g = AdjacencyList::new(3, false);
        assert_eq!(g.node_label(2), "2");
        assert_eq!(g.path_to_string(&[0, 1, 2]), "0 -> 1 -> 2");
    }
}
