use std::collections::BinaryHeap;
use std::time::Instant;

use waygrid_core::{Error, Graph};

use crate::Pathfinder;
use crate::pathfinder::{NodeRef, TIMEOUT_CHECK_INTERVAL, UNREACHABLE};

enum Outcome {
    Found,
    Exhausted,
    TimedOut,
}

impl Pathfinder {
    /// Compute a minimum-cost path from `start` to `end` using A*.
    ///
    /// The frontier is ordered by `g + estimate(n, end) * min_weight()`,
    /// which never overestimates as long as the graph's heuristic is
    /// admissible. Equal-priority entries pop
    /// most-recently-discovered-first.
    ///
    /// Returns the full path including both endpoints. Fails with
    /// [`Error::NoPathFound`] when `end` is proven unreachable and with
    /// [`Error::Timeout`] when the wall-clock budget elapses first — the
    /// two are never conflated.
    pub fn find_path<G: Graph>(
        &mut self,
        graph: &G,
        start: usize,
        end: usize,
    ) -> Result<Vec<usize>, Error> {
        let size = graph.size();
        if start >= size || end >= size {
            return Err(Error::InvalidArgument(format!(
                "start {start} / end {end} out of range for graph of {size} nodes"
            )));
        }
        self.ensure_size(size);

        if !graph.is_traversable(start) || !graph.is_traversable(end) {
            return Err(Error::NoPathFound);
        }
        if start == end {
            return Ok(vec![start]);
        }

        // Bump generation to lazily invalidate all nodes.
        self.astar_generation = self.astar_generation.wrapping_add(1);
        let cur_gen = self.astar_generation;
        let min_weight = graph.min_weight();

        {
            let node = &mut self.astar_nodes[start];
            node.g = 0.0;
            node.f = graph.estimate(start, end) * min_weight;
            node.parent = usize::MAX;
            node.generation = cur_gen;
            node.open = true;
        }

        let mut open: BinaryHeap<NodeRef> = BinaryHeap::new();
        open.push(NodeRef {
            idx: start,
            f: self.astar_nodes[start].f,
            seq: self.seq,
        });
        self.seq += 1;

        let deadline = self.deadline();
        let mut pops: u64 = 0;
        let mut nbuf = std::mem::take(&mut self.nbuf);

        let outcome = 'search: loop {
            if pops % TIMEOUT_CHECK_INTERVAL == 0
                && deadline.is_some_and(|d| Instant::now() >= d)
            {
                break 'search Outcome::TimedOut;
            }

            let Some(current) = open.pop() else {
                break 'search Outcome::Exhausted;
            };
            pops += 1;

            let ci = current.idx;

            // Skip stale entries.
            if self.astar_nodes[ci].generation != cur_gen || !self.astar_nodes[ci].open {
                continue;
            }

            if ci == end {
                break 'search Outcome::Found;
            }

            self.astar_nodes[ci].open = false;
            let current_g = self.astar_nodes[ci].g;

            nbuf.clear();
            graph.neighbors(ci, false, &mut nbuf);

            for &(ni, weight) in nbuf.iter() {
                let tentative_g = current_g + weight;

                let n = &mut self.astar_nodes[ni];
                if n.generation == cur_gen {
                    // Already discovered this generation.
                    if tentative_g >= n.g {
                        continue;
                    }
                } else {
                    n.generation = cur_gen;
                    n.g = UNREACHABLE;
                }

                n.g = tentative_g;
                n.f = tentative_g + graph.estimate(ni, end) * min_weight;
                n.parent = ci;
                n.open = true;

                open.push(NodeRef {
                    idx: ni,
                    f: n.f,
                    seq: self.seq,
                });
                self.seq += 1;
            }
        };

        self.nbuf = nbuf;

        match outcome {
            Outcome::TimedOut => Err(Error::Timeout),
            Outcome::Exhausted => Err(Error::NoPathFound),
            Outcome::Found => {
                // Reconstruct by walking the parent chain.
                let mut path = Vec::new();
                let mut ci = end;
                while ci != usize::MAX {
                    path.push(ci);
                    ci = self.astar_nodes[ci].parent;
                }
                path.reverse();
                Ok(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use waygrid_core::{AdjacencyList, Grid, Weight};

    #[test]
    fn line_graph_shortest_path() {
        let mut g = AdjacencyList::new(3, false);
        g.add_edge(0, 1, 1.0).unwrap();
        g.add_edge(1, 2, 1.0).unwrap();

        let mut pf = Pathfinder::new(g.size());
        let path = pf.find_path(&g, 0, 2).unwrap();
        assert_eq!(path, vec![0, 1, 2]);
        assert_eq!(g.calculate_cost(&path).unwrap(), 2.0);
    }

    #[test]
    fn prefers_cheap_detour_over_heavy_edge() {
        // 0 -> 3 directly costs 10; via 1 and 2 costs 3.
        let mut g = AdjacencyList::new(4, true);
        g.add_edge(0, 3, 10.0).unwrap();
        g.add_edge(0, 1, 1.0).unwrap();
        g.add_edge(1, 2, 1.0).unwrap();
        g.add_edge(2, 3, 1.0).unwrap();

        let mut pf = Pathfinder::new(g.size());
        let path = pf.find_path(&g, 0, 3).unwrap();
        assert_eq!(path, vec![0, 1, 2, 3]);
    }

    #[test]
    fn grid_path_routes_around_obstacles() {
        // 3x3 grid with a wall through the middle column except the top.
        let mut g = Grid::new(3, 3);
        g.add_obstacle(4).unwrap();
        g.add_obstacle(7).unwrap();

        let mut pf = Pathfinder::new(g.size());
        let path = pf.find_path(&g, 3, 5).unwrap();
        assert_eq!(path, vec![3, 0, 1, 2, 5]);
        assert!(g.is_valid_path(&path));
    }

    #[test]
    fn weighted_grid_avoids_expensive_cells() {
        let mut g = Grid::new(3, 2);
        g.update_weight(1, Weight::Cost(10.0)).unwrap();

        let mut pf = Pathfinder::new(g.size());
        // Straight line 0-1-2 costs 11; the detour through the second row
        // costs 3.
        let path = pf.find_path(&g, 0, 2).unwrap();
        assert_eq!(path, vec![0, 3, 4, 5, 2]);
        assert_eq!(g.calculate_cost(&path).unwrap(), 4.0);
    }

    #[test]
    fn unreachable_is_no_path_not_timeout() {
        let mut g = Grid::new(3, 1);
        g.add_obstacle(1).unwrap();

        let mut pf = Pathfinder::new(g.size());
        assert_eq!(pf.find_path(&g, 0, 2), Err(Error::NoPathFound));
        // Blocked endpoints are unreachable by the edge-exclusion contract.
        assert_eq!(pf.find_path(&g, 1, 2), Err(Error::NoPathFound));
    }

    #[test]
    fn degenerate_and_invalid_queries() {
        let g = Grid::new(2, 2);
        let mut pf = Pathfinder::new(g.size());
        assert_eq!(pf.find_path(&g, 3, 3).unwrap(), vec![3]);
        assert!(matches!(
            pf.find_path(&g, 0, 9),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_budget_times_out() {
        let g = Grid::new(8, 8);
        let mut pf = Pathfinder::new(g.size()).with_time_limit(Duration::ZERO);
        assert_eq!(pf.find_path(&g, 0, 63), Err(Error::Timeout));

        pf.set_time_limit(None);
        assert!(pf.find_path(&g, 0, 63).is_ok());
    }

    #[test]
    fn reuses_caches_across_queries() {
        let g = Grid::new(4, 4);
        let mut pf = Pathfinder::new(g.size());
        for _ in 0..3 {
            let path = pf.find_path(&g, 0, 15).unwrap();
            assert_eq!(path.len(), 7);
            assert_eq!(g.calculate_cost(&path).unwrap(), 6.0);
        }
    }
}
