//! A rectangular, node-weighted, undirected grid.

use crate::error::Error;
use crate::geom::{Point, manhattan};
use crate::graph::{Graph, MapfConfig};

/// The traversal cost of a grid node.
///
/// `Blocked` marks an impassable obstacle; `Cost(w)` with `w >= 0` is the
/// cost of entering the node.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Weight {
    Blocked,
    Cost(f64),
}

impl Weight {
    /// Whether this node is an impassable obstacle.
    #[inline]
    pub fn is_blocked(self) -> bool {
        matches!(self, Weight::Blocked)
    }

    /// The entering cost, or `None` for a blocked node.
    #[inline]
    pub fn cost(self) -> Option<f64> {
        match self {
            Weight::Blocked => None,
            Weight::Cost(w) => Some(w),
        }
    }
}

/// How the pause action is priced on a grid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PauseCostPolicy {
    /// One global cost for every node.
    #[default]
    Uniform,
    /// The cost of pausing at a node equals the node's own weight.
    /// Blocked nodes price at 0.
    NodeWeight,
}

/// An undirected grid graph with per-node weights and obstacles.
///
/// Node `i` sits at `(i % width, i / width)`. Moving onto a node costs
/// that node's weight; blocked nodes are absent from every neighbor
/// list. Movement is 4-directional (cardinal).
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    weights: Vec<Weight>,
    min_weight: f64,
    pause_policy: PauseCostPolicy,
    mapf: MapfConfig,
}

impl Grid {
    /// Create a grid with every node at weight 1 and no obstacles.
    pub fn new(width: i32, height: i32) -> Self {
        debug_assert!(width > 0 && height > 0, "grid dimensions must be positive");
        Self {
            width,
            height,
            weights: vec![Weight::Cost(1.0); (width * height) as usize],
            min_weight: 1.0,
            pause_policy: PauseCostPolicy::default(),
            mapf: MapfConfig::default(),
        }
    }

    /// Create a grid from an explicit weight vector of length
    /// `width * height`.
    pub fn from_weights(width: i32, height: i32, weights: Vec<Weight>) -> Result<Self, Error> {
        if weights.len() != (width * height) as usize {
            return Err(Error::InvalidArgument(format!(
                "expected {} weights for a {width}x{height} grid, got {}",
                width * height,
                weights.len()
            )));
        }
        validate_weights(&weights)?;
        let mut grid = Self {
            width,
            height,
            weights,
            min_weight: 1.0,
            pause_policy: PauseCostPolicy::default(),
            mapf: MapfConfig::default(),
        };
        grid.rescan_min_weight();
        Ok(grid)
    }

    /// Grid width in nodes.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in nodes.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Convert a point to a node index. Returns `None` if out of bounds.
    #[inline]
    pub fn idx(&self, p: Point) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x >= self.width || p.y >= self.height {
            return None;
        }
        Some((p.y * self.width + p.x) as usize)
    }

    /// Convert a node index back to its point.
    #[inline]
    pub fn point(&self, node: usize) -> Point {
        Point::new(node as i32 % self.width, node as i32 / self.width)
    }

    /// The weight of a node.
    pub fn weight(&self, node: usize) -> Weight {
        self.weights[node]
    }

    /// All node weights, in index order.
    pub fn weights(&self) -> &[Weight] {
        &self.weights
    }

    /// Whether a node is an impassable obstacle.
    pub fn has_obstacle(&self, node: usize) -> bool {
        self.weights[node].is_blocked()
    }

    /// Mark a node as an impassable obstacle.
    pub fn add_obstacle(&mut self, node: usize) -> Result<(), Error> {
        self.update_weight(node, Weight::Blocked)
    }

    /// Reopen a node at weight 1.
    pub fn remove_obstacle(&mut self, node: usize) -> Result<(), Error> {
        self.update_weight(node, Weight::Cost(1.0))
    }

    /// Reset every node to weight 1, removing all obstacles.
    pub fn clear_weights(&mut self) {
        self.weights.fill(Weight::Cost(1.0));
        self.min_weight = 1.0;
    }

    /// Set the weight of a single node.
    ///
    /// Rejects out-of-range nodes and negative or non-finite costs.
    pub fn update_weight(&mut self, node: usize, w: Weight) -> Result<(), Error> {
        if node >= self.weights.len() {
            return Err(Error::InvalidArgument(format!(
                "node {node} out of range for grid of {} nodes",
                self.weights.len()
            )));
        }
        validate_weight(w)?;
        let old = self.weights[node];
        self.weights[node] = w;
        match w {
            Weight::Cost(c) if c <= self.min_weight => self.min_weight = c,
            _ => {
                // The previous minimum may have been overwritten.
                if old.cost().is_some_and(|c| c <= self.min_weight) {
                    self.rescan_min_weight();
                }
            }
        }
        Ok(())
    }

    /// Replace all node weights at once.
    pub fn set_weights(&mut self, weights: Vec<Weight>) -> Result<(), Error> {
        if weights.len() != self.weights.len() {
            return Err(Error::InvalidArgument(format!(
                "expected {} weights, got {}",
                self.weights.len(),
                weights.len()
            )));
        }
        validate_weights(&weights)?;
        self.weights = weights;
        self.rescan_min_weight();
        Ok(())
    }

    /// The active pause-cost policy.
    pub fn pause_cost_policy(&self) -> PauseCostPolicy {
        self.pause_policy
    }

    /// Select how pause actions are priced.
    pub fn set_pause_cost_policy(&mut self, policy: PauseCostPolicy) {
        self.pause_policy = policy;
    }

    /// Set the global pause-action cost. Rejects negative values.
    pub fn set_pause_cost(&mut self, cost: f64) -> Result<(), Error> {
        self.mapf.set_pause_cost(cost)
    }

    /// Toggle the edge-collision rule for subsequent MAPF calls.
    pub fn set_edge_collision(&mut self, on: bool) {
        self.mapf.set_edge_collision(on);
    }

    fn rescan_min_weight(&mut self) {
        self.min_weight = self
            .weights
            .iter()
            .filter_map(|w| w.cost())
            .fold(f64::INFINITY, f64::min);
        if !self.min_weight.is_finite() {
            // All nodes blocked; nothing traversable, scale is moot.
            self.min_weight = 1.0;
        }
    }
}

fn validate_weight(w: Weight) -> Result<(), Error> {
    match w {
        Weight::Cost(c) if !c.is_finite() || c < 0.0 => Err(Error::InvalidArgument(format!(
            "node weight must be non-negative, got {c}"
        ))),
        _ => Ok(()),
    }
}

fn validate_weights(weights: &[Weight]) -> Result<(), Error> {
    weights.iter().try_for_each(|&w| validate_weight(w))
}

impl Graph for Grid {
    fn size(&self) -> usize {
        self.weights.len()
    }

    fn neighbors(&self, node: usize, reversed: bool, buf: &mut Vec<(usize, f64)>) {
        let Some(own_cost) = self.weights[node].cost() else {
            return;
        };
        let p = self.point(node);
        for np in p.neighbors_4() {
            let Some(ni) = self.idx(np) else {
                continue;
            };
            if let Some(w) = self.weights[ni].cost() {
                // A reversed edge is traversed into this node, so it is
                // priced at this node's own entering cost.
                buf.push((ni, if reversed { own_cost } else { w }));
            }
        }
    }

    fn estimate(&self, a: usize, b: usize) -> f64 {
        manhattan(self.point(a), self.point(b)) as f64
    }

    fn is_directed(&self) -> bool {
        false
    }

    fn min_weight(&self) -> f64 {
        self.min_weight
    }

    fn has_coordinates(&self) -> bool {
        true
    }

    fn is_traversable(&self, node: usize) -> bool {
        !self.weights[node].is_blocked()
    }

    fn pause_cost(&self) -> f64 {
        self.mapf.pause_cost()
    }

    fn pause_cost_at(&self, node: usize) -> f64 {
        match self.pause_policy {
            PauseCostPolicy::Uniform => self.mapf.pause_cost(),
            PauseCostPolicy::NodeWeight => self.weights[node].cost().unwrap_or(0.0),
        }
    }

    fn edge_collision(&self) -> bool {
        self.mapf.edge_collision()
    }

    fn node_label(&self, node: usize) -> String {
        self.point(node).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idx_point_round_trip() {
        let g = Grid::new(4, 3);
        assert_eq!(g.size(), 12);
        assert_eq!(g.idx(Point::new(2, 1)), Some(6));
        assert_eq!(g.point(6), Point::new(2, 1));
        assert_eq!(g.idx(Point::new(4, 0)), None);
        assert_eq!(g.idx(Point::new(-1, 0)), None);
    }

    #[test]
    fn neighbors_use_entering_cost() {
        let mut g = Grid::new(3, 1);
        g.update_weight(1, Weight::Cost(5.0)).unwrap();
        let mut buf = Vec::new();
        g.neighbors(0, false, &mut buf);
        assert_eq!(buf, vec![(1, 5.0)]);
        // Reversed edges are priced at the queried node's own cost.
        buf.clear();
        g.neighbors(1, true, &mut buf);
        assert!(buf.contains(&(0, 5.0)) && buf.contains(&(2, 5.0)));
    }

    #[test]
    fn obstacles_excluded_from_neighbor_lists() {
        let mut g = Grid::new(3, 1);
        g.add_obstacle(1).unwrap();
        let mut buf = Vec::new();
        g.neighbors(0, false, &mut buf);
        assert!(buf.is_empty());
        // A blocked node itself has no outgoing edges.
        g.neighbors(1, false, &mut buf);
        assert!(buf.is_empty());
        assert!(!g.adjacent(0, 1));

        g.remove_obstacle(1).unwrap();
        assert!(g.adjacent(0, 1));
    }

    #[test]
    fn min_weight_tracks_mutations() {
        let mut g = Grid::new(2, 2);
        assert_eq!(g.min_weight(), 1.0);
        g.update_weight(0, Weight::Cost(0.25)).unwrap();
        assert_eq!(g.min_weight(), 0.25);
        // Overwriting the minimum forces a rescan.
        g.update_weight(0, Weight::Cost(3.0)).unwrap();
        assert_eq!(g.min_weight(), 1.0);
        g.add_obstacle(1).unwrap();
        assert_eq!(g.min_weight(), 1.0);
        g.clear_weights();
        assert_eq!(g.min_weight(), 1.0);
        assert!(!g.has_obstacle(1));
    }

    #[test]
    fn negative_weights_rejected() {
        let mut g = Grid::new(2, 1);
        assert!(g.update_weight(0, Weight::Cost(-2.0)).is_err());
        assert!(g.set_weights(vec![Weight::Cost(1.0), Weight::Cost(-1.0)]).is_err());
        assert!(g.update_weight(5, Weight::Cost(1.0)).is_err());
    }

    #[test]
    fn calculate_cost_sums_entering_weights() {
        let mut g = Grid::new(3, 1);
        g.update_weight(1, Weight::Cost(2.0)).unwrap();
        g.update_weight(2, Weight::Cost(4.0)).unwrap();
        assert_eq!(g.calculate_cost(&[0, 1, 2]).unwrap(), 6.0);
        assert_eq!(g.calculate_cost(&[0]).unwrap(), 0.0);
        // Non-adjacent pair fails with the offending edge.
        assert_eq!(
            g.calculate_cost(&[0, 2]),
            Err(Error::InvalidPath { from: 0, to: 2 })
        );
        assert!(g.is_valid_path(&[0, 1, 2]));
        assert!(!g.is_valid_path(&[0, 2]));
    }

    #[test]
    fn pause_cost_policies() {
        let mut g = Grid::new(2, 1);
        g.update_weight(1, Weight::Cost(3.0)).unwrap();
        assert_eq!(g.pause_cost_at(1), 1.0);

        g.set_pause_cost_policy(PauseCostPolicy::NodeWeight);
        assert_eq!(g.pause_cost_at(0), 1.0);
        assert_eq!(g.pause_cost_at(1), 3.0);
        g.add_obstacle(1).unwrap();
        assert_eq!(g.pause_cost_at(1), 0.0);

        g.set_pause_cost_policy(PauseCostPolicy::Uniform);
        g.set_pause_cost(0.5).unwrap();
        assert_eq!(g.pause_cost_at(1), 0.5);
        assert!(g.set_pause_cost(-1.0).is_err());
    }

    #[test]
    fn node_labels_render_coordinates() {
        let g = Grid::new(3, 2);
        assert_eq!(g.node_label(4), "(1, 1)");
        assert_eq!(g.path_to_string(&[0, 1]), "(0, 0) -> (1, 0)");
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn weight_round_trip() {
        let w = Weight::Cost(2.5);
        let json = serde_json::to_string(&w).unwrap();
        let back: Weight = serde_json::from_str(&json).unwrap();
        assert_eq!(w, back);
        let blocked: Weight = serde_json::from_str("\"Blocked\"").unwrap();
        assert!(blocked.is_blocked());
    }
}
