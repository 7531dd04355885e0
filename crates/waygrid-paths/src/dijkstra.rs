use std::collections::BinaryHeap;

use waygrid_core::Graph;

use crate::Pathfinder;
use crate::pathfinder::{DistanceNode, NodeRef, UNREACHABLE};

impl Pathfinder {
    /// Compute a multi-source Dijkstra distance map.
    ///
    /// Every source starts at cost 0. Expansion stops once the cumulative
    /// cost exceeds `max_cost` (pass [`UNREACHABLE`] for no ceiling).
    /// Out-of-range and blocked sources are skipped. Returns the reached
    /// nodes in settling order.
    pub fn distance_map<G: Graph>(
        &mut self,
        graph: &G,
        sources: &[usize],
        max_cost: f64,
    ) -> &[DistanceNode] {
        self.ensure_size(graph.size());

        // Reset the flat cost map.
        for v in self.dijkstra_map.iter_mut() {
            *v = UNREACHABLE;
        }
        self.dijkstra_results.clear();

        self.dijkstra_generation = self.dijkstra_generation.wrapping_add(1);
        let cur_gen = self.dijkstra_generation;

        let mut open: BinaryHeap<NodeRef> = BinaryHeap::new();

        for &src in sources {
            if src >= graph.size() || !graph.is_traversable(src) {
                continue;
            }
            let n = &mut self.dijkstra_nodes[src];
            n.g = 0.0;
            n.f = 0.0;
            n.generation = cur_gen;
            n.open = true;
            self.dijkstra_map[src] = 0.0;
            open.push(NodeRef {
                idx: src,
                f: 0.0,
                seq: self.seq,
            });
            self.seq += 1;
        }

        let mut nbuf = std::mem::take(&mut self.nbuf);

        while let Some(current) = open.pop() {
            let ci = current.idx;
            let cn = &self.dijkstra_nodes[ci];
            if cn.generation != cur_gen || !cn.open {
                continue;
            }
            let current_g = cn.g;
            self.dijkstra_nodes[ci].open = false;

            self.dijkstra_results.push(DistanceNode {
                node: ci,
                cost: current_g,
            });

            nbuf.clear();
            graph.neighbors(ci, false, &mut nbuf);

            for &(ni, weight) in nbuf.iter() {
                let tentative = current_g + weight;
                if tentative > max_cost {
                    continue;
                }

                let n = &mut self.dijkstra_nodes[ni];
                if n.generation == cur_gen {
                    if tentative >= n.g {
                        continue;
                    }
                } else {
                    n.generation = cur_gen;
                    n.g = UNREACHABLE;
                }

                n.g = tentative;
                n.f = tentative;
                n.open = true;
                self.dijkstra_map[ni] = tentative;
                open.push(NodeRef {
                    idx: ni,
                    f: tentative,
                    seq: self.seq,
                });
                self.seq += 1;
            }
        }

        self.nbuf = nbuf;
        &self.dijkstra_results
    }

    /// Query the cost at a specific node after a
    /// [`distance_map`](Self::distance_map) call.
    ///
    /// Returns [`UNREACHABLE`] if the node is out of range or was not
    /// reached.
    pub fn distance_at(&self, node: usize) -> f64 {
        if node < self.dijkstra_map.len() {
            self.dijkstra_map[node]
        } else {
            UNREACHABLE
        }
    }
}
