pub mod catalog;
pub mod traits;

pub use catalog::{OperatorCatalog, OperatorDescriptor};
pub use traits::OperatorDefinition;
