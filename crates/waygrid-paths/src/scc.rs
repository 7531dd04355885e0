//! Strongly-connected-component analysis for directed graphs.

use waygrid_core::{Error, Graph};

use crate::Pathfinder;

impl Pathfinder {
    /// Partition a directed graph into strongly connected components.
    ///
    /// Two nodes share a component iff each is reachable from the other.
    /// Uses Kosaraju's two-pass scheme: an iterative postorder over the
    /// forward graph, then flood fills over the reversed neighbor view in
    /// reverse finishing order. Members are sorted ascending and groups
    /// are ordered by their smallest member.
    ///
    /// Fails with [`Error::InvalidArgument`] on an undirected graph; use
    /// [`find_components`](Self::find_components) there instead.
    pub fn find_scc<G: Graph>(&mut self, graph: &G) -> Result<Vec<Vec<usize>>, Error> {
        if !graph.is_directed() {
            return Err(Error::InvalidArgument(
                "find_scc requires a directed graph".into(),
            ));
        }
        let size = graph.size();
        self.ensure_size(size);

        let mut nbuf = std::mem::take(&mut self.nbuf);

        // Pass 1: postorder finishing times on the forward graph.
        // cc_labels doubles as the visited marker.
        for v in self.cc_labels.iter_mut() {
            *v = -1;
        }
        self.scc_order.clear();
        for root in 0..size {
            if self.cc_labels[root] >= 0 || !graph.is_traversable(root) {
                continue;
            }
            self.scc_stack.clear();
            self.scc_stack.push((root, false));

            while let Some((node, expanded)) = self.scc_stack.pop() {
                if expanded {
                    self.scc_order.push(node);
                    continue;
                }
                if self.cc_labels[node] >= 0 {
                    continue;
                }
                self.cc_labels[node] = 0;
                self.scc_stack.push((node, true));

                nbuf.clear();
                graph.neighbors(node, false, &mut nbuf);
                for &(ni, _) in nbuf.iter() {
                    if self.cc_labels[ni] < 0 {
                        self.scc_stack.push((ni, false));
                    }
                }
            }
        }

        // Pass 2: flood fill the reversed graph in reverse finishing
        // order; each fill closes over exactly one component.
        for v in self.cc_labels.iter_mut() {
            *v = -1;
        }
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in (0..self.scc_order.len()).rev() {
            let root = self.scc_order[i];
            if self.cc_labels[root] >= 0 {
                continue;
            }
            let label = groups.len() as i32;

            let mut group = Vec::new();
            self.cc_stack.clear();
            self.cc_stack.push(root);
            self.cc_labels[root] = label;

            while let Some(ci) = self.cc_stack.pop() {
                group.push(ci);
                nbuf.clear();
                graph.neighbors(ci, true, &mut nbuf);
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

        groups.sort_unstable_by_key(|group| group[0]);
        self.nbuf = nbuf;
        Ok(groups)
    }
}
