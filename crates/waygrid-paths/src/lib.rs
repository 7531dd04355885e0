//! Search algorithms for the waygrid pathfinding engine.
//!
//! This crate implements the query side of the engine on top of the
//! `waygrid-core` graph model:
//!
//! - **A\*** minimum-cost paths with a wall-clock budget
//!   ([`Pathfinder::find_path`])
//! - **Connected components** of undirected graphs
//!   ([`Pathfinder::find_components`])
//! - **Strongly connected components** of directed graphs
//!   ([`Pathfinder::find_scc`])
//! - **Dijkstra** multi-source distance maps
//!   ([`Pathfinder::distance_map`])
//! - **Multi-agent pathfinding** with vertex and optional edge
//!   collision avoidance ([`Mapf::solve`])
//!
//! Single-graph queries go through [`Pathfinder`], which owns and reuses
//! internal caches so that repeated queries incur no allocations after
//! warm-up. [`Mapf`] coordinates many time-expanded searches and is
//! bounded by its own time budget.
//!
//! # Outcome taxonomy
//!
//! | Result | Meaning |
//! |---|---|
//! | `Ok(path)` | minimum-cost route found |
//! | `Err(NoPathFound)` | proven unreachable |
//! | `Err(Timeout)` | budget elapsed, retry with a larger one |

mod astar;
mod components;
mod dijkstra;
mod mapf;
mod pathfinder;
mod scc;

pub use mapf::Mapf;
pub use pathfinder::{DistanceNode, Pathfinder, UNREACHABLE, ensure_path_length};
