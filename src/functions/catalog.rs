use super::traits::OperatorDefinition;
use crate::error::{CgpError, Result};
use crate::types::{Category, Gene, OperatorId, ParameterKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Static description of one operator as the grid sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorDescriptor {
    pub id: OperatorId,
    pub name: String,
    pub input_count: usize,
    pub parameter_bounds: Vec<Vec<Gene>>,
    pub parameter_kinds: Vec<ParameterKind>,
    pub categories: BTreeSet<Category>,
}

impl OperatorDescriptor {
    /// Descriptor without parameters or categories; the id is assigned on registration
    pub fn new(name: &str, input_count: usize) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            input_count,
            parameter_bounds: Vec::new(),
            parameter_kinds: Vec::new(),
            categories: BTreeSet::new(),
        }
    }

    pub fn with_parameter(mut self, values: Vec<Gene>, kind: ParameterKind) -> Self {
        self.parameter_bounds.push(values);
        self.parameter_kinds.push(kind);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.insert(category);
        self
    }

    /// Tag-set intersection with a single dependency category
    pub fn matches(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_bounds.len()
    }
}

impl OperatorDefinition for OperatorDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_count(&self) -> usize {
        self.input_count
    }

    fn parameter_bounds(&self) -> Vec<Vec<Gene>> {
        self.parameter_bounds.clone()
    }

    fn parameter_kinds(&self) -> Vec<ParameterKind> {
        self.parameter_kinds.clone()
    }

    fn categories(&self) -> BTreeSet<Category> {
        self.categories.clone()
    }
}

/// Registry of every operator available to the grid.
///
/// Ids are dense (`0..len`) and follow registration order, so a function gene
/// holds the id directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorCatalog {
    operators: Vec<OperatorDescriptor>,
    #[serde(skip)]
    by_name: HashMap<String, OperatorId>,
}

impl OperatorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a list of definitions in order
    pub fn from_definitions<D: OperatorDefinition>(definitions: &[D]) -> Result<Self> {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.register(definition)?;
        }
        Ok(catalog)
    }

    pub fn register<D: OperatorDefinition + ?Sized>(&mut self, definition: &D) -> Result<OperatorId> {
        let name = definition.name().to_string();
        if self.get_by_name(&name).is_some() {
            return Err(CgpError::Configuration(format!(
                "Operator '{}' registered twice",
                name
            )));
        }

        let parameter_bounds = definition.parameter_bounds();
        let parameter_kinds = definition.parameter_kinds();
        if parameter_kinds.len() != parameter_bounds.len() {
            return Err(CgpError::Configuration(format!(
                "Operator '{}' declares {} parameter kinds for {} parameters",
                name,
                parameter_kinds.len(),
                parameter_bounds.len()
            )));
        }
        if let Some(slot) = parameter_bounds.iter().position(|values| values.is_empty()) {
            return Err(CgpError::EmptyBounds(format!(
                "parameter {} of operator '{}' has no values",
                slot, name
            )));
        }

        let id = self.operators.len();
        self.operators.push(OperatorDescriptor {
            id,
            name: name.clone(),
            input_count: definition.input_count(),
            parameter_bounds,
            parameter_kinds,
            categories: definition.categories(),
        });
        self.by_name.insert(name, id);
        Ok(id)
    }

    pub fn get(&self, id: OperatorId) -> Option<&OperatorDescriptor> {
        self.operators.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&OperatorDescriptor> {
        // by_name is skipped by serde, fall back to a scan after deserialization
        match self.by_name.get(name) {
            Some(&id) => self.operators.get(id),
            None => self.operators.iter().find(|op| op.name == name),
        }
    }

    /// Descriptor addressed by a function gene
    pub fn descriptor_of_gene(&self, gene: Gene) -> Result<&OperatorDescriptor> {
        if gene < 0.0 || gene.fract() != 0.0 {
            return Err(CgpError::BoundsViolation(format!(
                "{} is not an operator id",
                gene
            )));
        }
        self.get(gene as OperatorId).ok_or_else(|| {
            CgpError::BoundsViolation(format!("unknown operator id {}", gene))
        })
    }

    pub fn input_count_of(&self, id: OperatorId) -> Result<usize> {
        self.get(id)
            .map(|op| op.input_count)
            .ok_or_else(|| CgpError::BoundsViolation(format!("unknown operator id {}", id)))
    }

    /// Operators carrying the given category
    pub fn matching(&self, category: Category) -> Vec<OperatorId> {
        self.operators
            .iter()
            .filter(|op| op.matches(category))
            .map(|op| op.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperatorDescriptor> {
        self.operators.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = OperatorId> {
        0..self.operators.len()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn max_input_count(&self) -> usize {
        self.operators.iter().map(|op| op.input_count).max().unwrap_or(0)
    }

    pub fn max_parameter_count(&self) -> usize {
        self.operators
            .iter()
            .map(|op| op.parameter_count())
            .max()
            .unwrap_or(0)
    }

    pub fn name_of(&self, id: OperatorId) -> &str {
        self.get(id).map(|op| op.name.as_str()).unwrap_or("?")
    }
}

impl PartialEq for OperatorCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.operators == other.operators
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold() -> OperatorDescriptor {
        OperatorDescriptor::new("Threshold", 1)
            .with_parameter(vec![0.0, 64.0, 128.0, 255.0], ParameterKind::Continuous)
            .with_category(Category::ImageToRegion)
            .with_category(Category::Threshold)
    }

    #[test]
    fn test_catalog_assigns_dense_ids() {
        let mut catalog = OperatorCatalog::new();
        let a = catalog.register(&threshold()).unwrap();
        let b = catalog
            .register(&OperatorDescriptor::new("Opening", 1).with_category(Category::RegionToRegion))
            .unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(catalog.get_by_name("Opening").unwrap().id, 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut catalog = OperatorCatalog::new();
        catalog.register(&threshold()).unwrap();
        assert!(catalog.register(&threshold()).is_err());
    }

    #[test]
    fn test_empty_parameter_bounds_rejected() {
        let mut catalog = OperatorCatalog::new();
        let op = OperatorDescriptor::new("Broken", 1).with_parameter(vec![], ParameterKind::Categorical);
        assert!(matches!(catalog.register(&op), Err(CgpError::EmptyBounds(_))));
    }

    #[test]
    fn test_multi_category_matching() {
        let catalog = OperatorCatalog::from_definitions(&[threshold()]).unwrap();
        assert_eq!(catalog.matching(Category::Threshold), vec![0]);
        assert_eq!(catalog.matching(Category::ImageToRegion), vec![0]);
        assert!(catalog.matching(Category::RegionToRegion).is_empty());
    }

    #[test]
    fn test_descriptor_of_gene() {
        let catalog = OperatorCatalog::from_definitions(&[threshold()]).unwrap();
        assert_eq!(catalog.descriptor_of_gene(0.0).unwrap().name, "Threshold");
        assert!(catalog.descriptor_of_gene(1.0).is_err());
        assert!(catalog.descriptor_of_gene(-1.0).is_err());
        assert!(catalog.descriptor_of_gene(0.5).is_err());
    }
}
