//! Multi-agent pathfinding (MAPF) with conflict-based coordination.
//!
//! The solver plans each agent independently with a time-expanded A*,
//! then resolves pairwise conflicts by branching on constraints until a
//! collision-free joint solution emerges or the time budget runs out.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

use waygrid_core::{Error, Graph};

use crate::pathfinder::TIMEOUT_CHECK_INTERVAL;
use crate::ensure_path_length;

/// Per-agent movement restrictions accumulated by the coordination loop.
#[derive(Clone, Default)]
struct ConstraintSet {
    /// `(node, time)` — the agent may not occupy `node` at `time`.
    vertex: HashSet<(usize, usize)>,
    /// `(from, to, time)` — the agent may not leave `from` toward `to`
    /// at `time`.
    edge: HashSet<(usize, usize, usize)>,
}

impl ConstraintSet {
    /// The last time step any constraint still applies at.
    fn latest_time(&self) -> usize {
        let v = self.vertex.iter().map(|&(_, t)| t).max().unwrap_or(0);
        let e = self.edge.iter().map(|&(_, _, t)| t + 1).max().unwrap_or(0);
        v.max(e)
    }

    /// The earliest time the agent may settle on its goal for good.
    fn earliest_goal_time(&self, goal: usize) -> usize {
        self.vertex
            .iter()
            .filter(|&&(n, _)| n == goal)
            .map(|&(_, t)| t + 1)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug)]
enum Conflict {
    Vertex { a: usize, b: usize, node: usize, time: usize },
    Edge { a: usize, b: usize, from: usize, to: usize, time: usize },
}

// ---------------------------------------------------------------------------
// Constraint-tree node
// ---------------------------------------------------------------------------

struct CtNode {
    cost: f64,
    seq: u64,
    paths: Vec<Vec<usize>>,
    costs: Vec<f64>,
    constraints: Vec<ConstraintSet>,
}

impl Ord for CtNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap on cost; equal costs expand oldest-first.
        other
            .cost
            .total_cmp(&self.cost)
            .then(other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for CtNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CtNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CtNode {}

/// A `(node, time)` state reference for the time-expanded low-level
/// search, ordered like the single-agent frontier (smallest `f`, ties
/// most-recently-discovered-first).
#[derive(Clone, Copy)]
struct TimedNode {
    f: f64,
    seq: u64,
    node: usize,
    time: usize,
    g: f64,
}

impl Ord for TimedNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for TimedNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimedNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for TimedNode {}

// ---------------------------------------------------------------------------
// Mapf
// ---------------------------------------------------------------------------

/// Conflict-based multi-agent path solver.
///
/// Time is modeled as discrete steps; at each step every agent either
/// moves along an edge (cost = edge weight) or pauses in place (cost =
/// the graph's pause-action cost for that node). No two agents may
/// occupy the same node at the same step, and when the graph's
/// edge-collision rule is on, no two agents may cross the same edge in
/// opposite directions during the same step.
///
/// Conflicts are selected deterministically: joint time steps are
/// scanned ascending, agent pairs in index order, vertex conflicts
/// before edge conflicts at the same step; the first hit is branched
/// into two child constraint sets.
///
/// The solver targets practical completeness under a wall-clock budget:
/// an individually unreachable goal is reported as
/// [`Error::NoPathFound`], while instances whose agents can never get
/// out of each other's way surface as [`Error::Timeout`] once the
/// budget elapses.
pub struct Mapf {
    time_limit: Duration,
    max_length: Option<usize>,
}

impl Default for Mapf {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(1),
            max_length: None,
        }
    }
}

impl Mapf {
    /// Create a solver with a 1-second time budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Cap the base length of individual plans. Defaults to twice the
    /// graph size.
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    /// The active wall-clock budget.
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Find a collision-free path per agent, `starts[i]` to `goals[i]`.
    ///
    /// All returned paths have equal length; agents that arrive early
    /// pause at their goal. Mismatched input lengths, out-of-range
    /// nodes and duplicate starts or goals are rejected with
    /// [`Error::InvalidArgument`].
    pub fn solve<G: Graph>(
        &self,
        graph: &G,
        starts: &[usize],
        goals: &[usize],
    ) -> Result<Vec<Vec<usize>>, Error> {
        if starts.len() != goals.len() {
            return Err(Error::InvalidArgument(format!(
                "{} starts but {} goals",
                starts.len(),
                goals.len()
            )));
        }
        if starts.is_empty() {
            return Ok(Vec::new());
        }
        let size = graph.size();
        for (&start, &goal) in starts.iter().zip(goals) {
            if start >= size || goal >= size {
                return Err(Error::InvalidArgument(format!(
                    "agent endpoints ({start}, {goal}) out of range for graph of {size} nodes"
                )));
            }
            if !graph.is_traversable(start) || !graph.is_traversable(goal) {
                return Err(Error::NoPathFound);
            }
        }
        if starts.iter().collect::<HashSet<_>>().len() != starts.len() {
            return Err(Error::InvalidArgument("duplicate start nodes".into()));
        }
        if goals.iter().collect::<HashSet<_>>().len() != goals.len() {
            return Err(Error::InvalidArgument("duplicate goal nodes".into()));
        }

        let deadline = Instant::now() + self.time_limit;
        let horizon_base = self.max_length.unwrap_or(2 * size.max(4));
        let edge_collision = graph.edge_collision();

        log::debug!(
            "mapf: planning {} agents (edge collision {edge_collision})",
            starts.len()
        );

        // Root of the constraint tree: independent plans.
        let constraints = vec![ConstraintSet::default(); starts.len()];
        let mut paths = Vec::with_capacity(starts.len());
        let mut costs = Vec::with_capacity(starts.len());
        for (agent, (&start, &goal)) in starts.iter().zip(goals).enumerate() {
            let planned =
                plan_agent(graph, start, goal, &constraints[agent], horizon_base, deadline)?;
            match planned {
                Some((path, cost)) => {
                    paths.push(path);
                    costs.push(cost);
                }
                None => return Err(Error::NoPathFound),
            }
        }

        let mut open: BinaryHeap<CtNode> = BinaryHeap::new();
        let mut seq = 0u64;
        open.push(CtNode {
            cost: costs.iter().sum(),
            seq,
            paths,
            costs,
            constraints,
        });
        seq += 1;

        while let Some(node) = open.pop() {
            if Instant::now() >= deadline {
                return Err(Error::Timeout);
            }

            let Some(conflict) = first_conflict(&node.paths, edge_collision) else {
                return finalize(node.paths);
            };
            log::trace!("mapf: splitting on {conflict:?}");

            for (agent, vertex, edge) in branches(&conflict) {
                let mut constraints = node.constraints.clone();
                if let Some(vc) = vertex {
                    constraints[agent].vertex.insert(vc);
                }
                if let Some(ec) = edge {
                    constraints[agent].edge.insert(ec);
                }
                let planned = plan_agent(
                    graph,
                    starts[agent],
                    goals[agent],
                    &constraints[agent],
                    horizon_base,
                    deadline,
                )?;
                // A child whose constraints admit no plan is pruned.
                if let Some((path, cost)) = planned {
                    let mut paths = node.paths.clone();
                    let mut costs = node.costs.clone();
                    paths[agent] = path;
                    costs[agent] = cost;
                    open.push(CtNode {
                        cost: costs.iter().sum(),
                        seq,
                        paths,
                        costs,
                        constraints,
                    });
                    seq += 1;
                }
            }
        }

        Err(Error::NoPathFound)
    }
}

/// The two child constraint additions for a conflict:
/// `(agent, vertex constraint, edge constraint)`.
#[allow(clippy::type_complexity)]
fn branches(
    conflict: &Conflict,
) -> [(usize, Option<(usize, usize)>, Option<(usize, usize, usize)>); 2] {
    match *conflict {
        Conflict::Vertex { a, b, node, time } => {
            [(a, Some((node, time)), None), (b, Some((node, time)), None)]
        }
        Conflict::Edge { a, b, from, to, time } => {
            [(a, None, Some((from, to, time))), (b, None, Some((to, from, time)))]
        }
    }
}

/// Find the first conflict between any pair of (implicitly goal-padded)
/// paths, or `None` if the joint solution is collision-free.
fn first_conflict(paths: &[Vec<usize>], edge_collision: bool) -> Option<Conflict> {
    let max_len = paths.iter().map(Vec::len).max()?;
    let pos = |agent: usize, t: usize| {
        let path = &paths[agent];
        path[t.min(path.len() - 1)]
    };

    for t in 0..max_len {
        for a in 0..paths.len() {
            for b in a + 1..paths.len() {
                if pos(a, t) == pos(b, t) {
                    return Some(Conflict::Vertex {
                        a,
                        b,
                        node: pos(a, t),
                        time: t,
                    });
                }
            }
        }
        if edge_collision && t + 1 < max_len {
            for a in 0..paths.len() {
                for b in a + 1..paths.len() {
                    let (ua, va) = (pos(a, t), pos(a, t + 1));
                    let (ub, vb) = (pos(b, t), pos(b, t + 1));
                    if ua != va && ua == vb && va == ub {
                        return Some(Conflict::Edge {
                            a,
                            b,
                            from: ua,
                            to: va,
                            time: t,
                        });
                    }
                }
            }
        }
    }
    None
}

/// Pad all paths to equal length with pauses at the goal.
fn finalize(mut paths: Vec<Vec<usize>>) -> Result<Vec<Vec<usize>>, Error> {
    let max_len = paths.iter().map(Vec::len).max().unwrap_or(0);
    for path in paths.iter_mut() {
        let Some(&goal) = path.last() else {
            return Err(Error::Contract("agent plan is empty".into()));
        };
        path.resize(max_len, goal);
        ensure_path_length(path, max_len)?;
    }
    Ok(paths)
}

/// Time-expanded A* for a single agent under a constraint set.
///
/// States are `(node, time)` pairs; each expansion either moves along an
/// edge or pauses in place. Returns `Ok(None)` when no plan satisfies
/// the constraints within the horizon.
fn plan_agent<G: Graph>(
    graph: &G,
    start: usize,
    goal: usize,
    cons: &ConstraintSet,
    horizon_base: usize,
    deadline: Instant,
) -> Result<Option<(Vec<usize>, f64)>, Error> {
    let horizon = horizon_base + cons.latest_time() + 1;
    let earliest_goal = cons.earliest_goal_time(goal);
    let min_weight = graph.min_weight();

    let mut open: BinaryHeap<TimedNode> = BinaryHeap::new();
    let mut best: HashMap<(usize, usize), f64> = HashMap::new();
    let mut parent: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
    let mut seq = 0u64;
    let mut nbuf: Vec<(usize, f64)> = Vec::with_capacity(8);

    best.insert((start, 0), 0.0);
    open.push(TimedNode {
        f: graph.estimate(start, goal) * min_weight,
        seq,
        node: start,
        time: 0,
        g: 0.0,
    });
    seq += 1;

    let mut pops: u64 = 0;
    while let Some(current) = open.pop() {
        if pops % TIMEOUT_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
            return Err(Error::Timeout);
        }
        pops += 1;

        let state = (current.node, current.time);
        if best.get(&state).is_some_and(|&g| g < current.g) {
            continue; // stale
        }

        if current.node == goal && current.time >= earliest_goal {
            let mut path = Vec::with_capacity(current.time + 1);
            let mut s = state;
            loop {
                path.push(s.0);
                match parent.get(&s) {
                    Some(&p) => s = p,
                    None => break,
                }
            }
            path.reverse();
            return Ok(Some((path, current.g)));
        }

        if current.time >= horizon {
            continue;
        }
        let t_next = current.time + 1;

        // Pause in place.
        if !cons.vertex.contains(&(current.node, t_next)) {
            push_state(
                &mut open,
                &mut best,
                &mut parent,
                &mut seq,
                graph.estimate(current.node, goal) * min_weight,
                current.node,
                t_next,
                current.g + graph.pause_cost_at(current.node),
                state,
            );
        }

        // Move along an edge.
        nbuf.clear();
        graph.neighbors(current.node, false, &mut nbuf);
        for &(ni, weight) in nbuf.iter() {
            if cons.vertex.contains(&(ni, t_next))
                || cons.edge.contains(&(current.node, ni, current.time))
            {
                continue;
            }
            push_state(
                &mut open,
                &mut best,
                &mut parent,
                &mut seq,
                graph.estimate(ni, goal) * min_weight,
                ni,
                t_next,
                current.g + weight,
                state,
            );
        }
    }

    Ok(None)
}

#[allow(clippy::too_many_arguments)]
fn push_state(
    open: &mut BinaryHeap<TimedNode>,
    best: &mut HashMap<(usize, usize), f64>,
    parent: &mut HashMap<(usize, usize), (usize, usize)>,
    seq: &mut u64,
    h: f64,
    node: usize,
    time: usize,
    g: f64,
    from: (usize, usize),
) {
    let state = (node, time);
    if best.get(&state).is_some_and(|&old| g >= old) {
        return;
    }
    best.insert(state, g);
    parent.insert(state, from);
    open.push(TimedNode {
        f: g + h,
        seq: *seq,
        node,
        time,
        g,
    });
    *seq += 1;
}
