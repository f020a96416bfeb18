//! Cartesian genetic programming over a grid of typed operators.
//!
//! An operator catalog and a category dependency graph are resolved once into
//! a placement map that fixes, per column, which operators may sit there and
//! which earlier nodes each input slot may read. Creators, mutators and the
//! recombinator only ever draw genes from those bounds; the decoder extracts
//! the active subgraph an external engine executes.

pub mod config;
pub mod engines;
pub mod error;
pub mod functions;
pub mod types;

pub use engines::generation::{Configuration, Decoder, Genome};
pub use engines::placement::{DependencyGraph, PlacementMap};
pub use error::{CgpError, Result};
pub use functions::{OperatorCatalog, OperatorDescriptor};
