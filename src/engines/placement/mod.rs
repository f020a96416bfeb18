pub mod dependency_graph;
pub mod placement_map;
pub mod presets;

pub use dependency_graph::{DepNodeId, DependencyGraph, DependencyNode};
pub use placement_map::{ColumnAssignment, InputBounds, PlacementMap};
