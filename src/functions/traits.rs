use crate::types::{Category, Gene, ParameterKind};
use std::collections::BTreeSet;

/// Base trait for everything that can be placed into a grid node.
///
/// The embedding application implements this for its concrete operators; the
/// catalog only keeps the static description, never the operator itself.
pub trait OperatorDefinition: Send + Sync {
    /// Unique name, used for lookups and diagnostics
    fn name(&self) -> &str;

    /// Number of node references the operator consumes
    fn input_count(&self) -> usize;

    /// Ordered discrete values per parameter slot
    fn parameter_bounds(&self) -> Vec<Vec<Gene>>;

    /// Kind of each parameter slot. Defaults to continuous.
    fn parameter_kinds(&self) -> Vec<ParameterKind> {
        vec![ParameterKind::Continuous; self.parameter_bounds().len()]
    }

    /// Categories this operator belongs to
    fn categories(&self) -> BTreeSet<Category>;
}
