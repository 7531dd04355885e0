//! Undirected connected-component analysis.

use waygrid_core::{Error, Graph};

use crate::Pathfinder;

impl Pathfinder {
    /// Partition an undirected graph into connected components.
    ///
    /// Two nodes share a component iff a traversal path exists between
    /// them. Non-traversable (blocked) nodes are excluded from the
    /// partition entirely. Members are sorted ascending and groups come
    /// out ordered by their smallest member, so the output is
    /// deterministic for a given graph state.
    ///
    /// Fails with [`Error::InvalidArgument`] on a directed graph; use
    /// [`find_scc`](Self::find_scc) there instead.
    pub fn find_components<G: Graph>(&mut self, graph: &G) -> Result<Vec<Vec<usize>>, Error> {
        if graph.is_directed() {
            return Err(Error::InvalidArgument(
                "find_components requires an undirected graph".into(),
            ));
        }
        let size = graph.size();
        self.ensure_size(size);

        for v in self.cc_labels.iter_mut() {
            *v = -1;
        }

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut nbuf = std::mem::take(&mut self.nbuf);

        for start in 0..size {
            if self.cc_labels[start] >= 0 || !graph.is_traversable(start) {
                continue;
            }
            let label = groups.len() as i32;

            // Iterative flood fill from `start`.
            let mut group = Vec::new();
            self.cc_stack.clear();
            self.cc_stack.push(start);
            self.cc_labels[start] = label;

            while let Some(ci) = self.cc_stack.pop() {
                group.push(ci);
                nbuf.clear();
                graph.neighbors(ci, false, &mut nbuf);

                for &(ni, _) in nbuf.iter() {
                    if self.cc_labels[ni] < 0 {
                        self.cc_labels[ni] = label;
                        self.cc_stack.push(ni);
                    }
                }
            }

            group.sort_unstable();
            groups.push(group);
        }

        self.nbuf = nbuf;
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waygrid_core::{AdjacencyList, Grid};

    #[test]
    fn obstacle_splits_grid() {
        // 4x1 line with node 2 blocked: {0, 1} and {3}.
        let mut g = Grid::new(4, 1);
        g.add_obstacle(2).unwrap();

        let mut pf = Pathfinder::new(g.size());
        let groups = pf.find_components(&g).unwrap();
        assert_eq!(groups, vec![vec![0, 1], vec![3]]);
    }

    #[test]
    fn open_grid_is_one_component() {
        let g = Grid::new(3, 3);
        let mut pf = Pathfinder::new(g.size());
        let groups = pf.find_components(&g).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn isolated_nodes_form_singletons() {
        let mut g = AdjacencyList::new(5, false);
        g.add_edge(0, 1, 1.0).unwrap();
        g.add_edge(3, 4, 1.0).unwrap();

        let mut pf = Pathfinder::new(g.size());
        let groups = pf.find_components(&g).unwrap();
        assert_eq!(groups, vec![vec![0, 1], vec![2], vec![3, 4]]);
    }

    #[test]
    fn every_node_appears_exactly_once() {
        let mut g = Grid::new(4, 4);
        g.add_obstacle(5).unwrap();
        g.add_obstacle(6).unwrap();

        let mut pf = Pathfinder::new(g.size());
        let groups = pf.find_components(&g).unwrap();
        let mut seen: Vec<usize> = groups.into_iter().flatten().collect();
        seen.sort_unstable();
        let expected: Vec<usize> = (0..16).filter(|&n| n != 5 && n != 6).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn rejects_directed_graphs() {
        let g = AdjacencyList::new(3, true);
        let mut pf = Pathfinder::new(g.size());
        assert!(matches!(
            pf.find_components(&g),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn mutation_changes_result_on_recompute() {
        let mut g = Grid::new(3, 1);
        g.add_obstacle(1).unwrap();
        let mut pf = Pathfinder::new(g.size());
        assert_eq!(pf.find_components(&g).unwrap().len(), 2);

        g.remove_obstacle(1).unwrap();
        assert_eq!(pf.find_components(&g).unwrap().len(), 1);
    }
}
