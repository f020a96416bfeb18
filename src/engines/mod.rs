pub mod generation;
pub mod placement;
