//! **waygrid-core** — graph and grid model for the waygrid pathfinding
//! engine.
//!
//! This crate defines the contract every search algorithm operates on:
//! the [`Graph`] trait (node enumeration, buffered neighbor retrieval,
//! heuristic estimation, weight semantics), two concrete implementations
//! ([`Grid`] and [`AdjacencyList`]), and the closed [`Error`] taxonomy.
//!
//! The search algorithms themselves live in the `waygrid-paths` crate.

pub mod adjacency;
pub mod error;
pub mod geom;
pub mod graph;
pub mod grid;

pub use adjacency::AdjacencyList;
pub use error::Error;
pub use geom::{Point, chebyshev, manhattan};
pub use graph::{Graph, MapfConfig};
pub use grid::{Grid, PauseCostPolicy, Weight};
