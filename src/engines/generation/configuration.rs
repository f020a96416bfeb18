use super::genome::{GeneAddress, Genome};
use crate::engines::placement::PlacementMap;
use crate::error::{CgpError, Result};
use crate::functions::catalog::{OperatorCatalog, OperatorDescriptor};
use crate::types::{Gene, GenomeLayout, NodeRef, OperatorId, ParameterKind, SearchSpace};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::ops::Range;

/// Scalar grid geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridGeometry {
    pub rows: usize,
    pub columns: usize,
    pub levels_back: usize,
    /// Input genes per node (the widest operator's arity at least)
    pub input_count: usize,
    /// Parameter genes per node (the widest operator's parameter count at least)
    pub parameter_count: usize,
    pub program_input_count: usize,
    pub outputs_count: usize,
}

/// What a gene position stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneRole {
    Input { node: usize, slot: usize },
    Operator { node: usize },
    Parameter { node: usize, slot: usize },
    /// Kind marker of a parameter slot (step-size metadata)
    Metadata { node: usize, slot: usize },
    Output { index: usize },
}

/// Grid geometry, genome addressing and the placement map that decides what
/// each gene may hold.
///
/// Built once per run through `ConfigurationBuilder`, read-only afterwards and
/// safe to share between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    geometry: GridGeometry,
    layout: GenomeLayout,
    search_space: SearchSpace,
    step_size_metadata: bool,
    self_adaptive: bool,
    crossover_columns: Vec<usize>,
    placement: PlacementMap,
    /// First node number of every column, plus the total node count
    column_starts: Vec<usize>,
}

pub struct ConfigurationBuilder {
    geometry: GridGeometry,
    layout: GenomeLayout,
    search_space: SearchSpace,
    step_size_metadata: bool,
    self_adaptive: bool,
    crossover_columns: Vec<usize>,
    placement: Option<PlacementMap>,
}

impl ConfigurationBuilder {
    pub fn layout(mut self, layout: GenomeLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn search_space(mut self, search_space: SearchSpace) -> Self {
        self.search_space = search_space;
        self
    }

    pub fn step_size_metadata(mut self, enabled: bool) -> Self {
        self.step_size_metadata = enabled;
        self
    }

    pub fn self_adaptive(mut self, enabled: bool) -> Self {
        self.self_adaptive = enabled;
        self
    }

    /// Columns at which the recombinator switches to the next parent
    pub fn crossover_columns(mut self, cuts: Vec<usize>) -> Self {
        self.crossover_columns = cuts;
        self
    }

    pub fn placement_map(mut self, placement: PlacementMap) -> Self {
        self.placement = Some(placement);
        self
    }

    /// Validate the geometry and run both placement phases
    pub fn build(self) -> Result<Configuration> {
        let g = self.geometry;
        if g.levels_back < 1 {
            return Err(CgpError::Configuration("levels_back must be at least 1".to_string()));
        }
        if g.outputs_count < 1 {
            return Err(CgpError::Configuration("outputs_count must be at least 1".to_string()));
        }
        if g.rows < 1 || g.columns < 1 {
            return Err(CgpError::Configuration(format!(
                "grid needs at least one row and one column, got {}x{}",
                g.rows, g.columns
            )));
        }
        let mut placement = self
            .placement
            .ok_or_else(|| CgpError::Configuration("placement map is missing".to_string()))?;

        let catalog = placement.catalog();
        if g.input_count < catalog.max_input_count() {
            return Err(CgpError::Configuration(format!(
                "input_count {} is below the widest operator arity {}",
                g.input_count,
                catalog.max_input_count()
            )));
        }
        if g.parameter_count < catalog.max_parameter_count() {
            return Err(CgpError::Configuration(format!(
                "parameter_count {} is below the largest operator parameter count {}",
                g.parameter_count,
                catalog.max_parameter_count()
            )));
        }
        let lowest = -(g.program_input_count as NodeRef);
        for id in placement.graph().input_nodes() {
            if let Some(input) = placement.graph().node(id).and_then(|n| n.program_input) {
                if input < lowest {
                    return Err(CgpError::Graph(format!(
                        "input placeholder {} outside the {} program inputs",
                        input, g.program_input_count
                    )));
                }
            }
        }
        if self.crossover_columns.windows(2).any(|w| w[0] >= w[1])
            || self.crossover_columns.iter().any(|&c| c == 0 || c >= g.columns)
        {
            return Err(CgpError::Configuration(format!(
                "crossover columns {:?} must be strictly increasing inside 1..{}",
                self.crossover_columns, g.columns
            )));
        }

        let operator_bounds = placement.initialize_operator_bounds(g.columns)?;
        let mut column_starts = Vec::with_capacity(g.columns + 1);
        let mut next = 0;
        for column in 0..g.columns {
            column_starts.push(next);
            next += match self.layout {
                GenomeLayout::Linear => g.rows,
                GenomeLayout::Columnar => operator_bounds[column].len(),
            };
        }
        column_starts.push(next);

        let ranges: Vec<Range<NodeRef>> = column_starts
            .windows(2)
            .map(|w| w[0] as NodeRef..w[1] as NodeRef)
            .collect();
        placement.initialize(&ranges)?;

        Ok(Configuration {
            geometry: g,
            layout: self.layout,
            search_space: self.search_space,
            step_size_metadata: self.step_size_metadata,
            self_adaptive: self.self_adaptive,
            crossover_columns: self.crossover_columns,
            placement,
            column_starts,
        })
    }
}

impl Configuration {
    pub fn builder(geometry: GridGeometry) -> ConfigurationBuilder {
        ConfigurationBuilder {
            geometry,
            layout: GenomeLayout::Linear,
            search_space: SearchSpace::Full,
            step_size_metadata: false,
            self_adaptive: false,
            crossover_columns: Vec::new(),
            placement: None,
        }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn layout(&self) -> GenomeLayout {
        self.layout
    }

    pub fn search_space(&self) -> SearchSpace {
        self.search_space
    }

    pub fn step_size_metadata(&self) -> bool {
        self.step_size_metadata
    }

    pub fn self_adaptive(&self) -> bool {
        self.self_adaptive
    }

    pub fn crossover_columns(&self) -> &[usize] {
        &self.crossover_columns
    }

    pub fn placement(&self) -> &PlacementMap {
        &self.placement
    }

    pub fn catalog(&self) -> &OperatorCatalog {
        self.placement.catalog()
    }

    // ---- geometry ----

    pub fn columns(&self) -> usize {
        self.geometry.columns
    }

    pub fn input_count(&self) -> usize {
        self.geometry.input_count
    }

    pub fn parameter_count(&self) -> usize {
        self.geometry.parameter_count
    }

    pub fn outputs_count(&self) -> usize {
        self.geometry.outputs_count
    }

    /// Parameter genes per node, metadata included
    pub fn parameter_gene_count(&self) -> usize {
        if self.step_size_metadata {
            self.geometry.parameter_count * 2
        } else {
            self.geometry.parameter_count
        }
    }

    pub fn node_length(&self) -> usize {
        self.geometry.input_count + 1 + self.parameter_gene_count()
    }

    pub fn nodes_count(&self) -> usize {
        self.column_starts[self.geometry.columns]
    }

    /// Nodes in a column: the row count, or the operator count for columnar genomes
    pub fn column_width(&self, column: usize) -> usize {
        self.column_starts[column + 1] - self.column_starts[column]
    }

    pub fn node_range_of_column(&self, column: usize) -> Range<usize> {
        self.column_starts[column]..self.column_starts[column + 1]
    }

    pub fn column_of(&self, node: usize) -> Result<usize> {
        if node >= self.nodes_count() {
            return Err(CgpError::GenomeShape(format!(
                "node {} outside the {} grid nodes",
                node,
                self.nodes_count()
            )));
        }
        Ok(match self.layout {
            GenomeLayout::Linear => node / self.geometry.rows,
            GenomeLayout::Columnar => {
                let mut remaining = node;
                let mut column = 0;
                while remaining >= self.column_width(column) {
                    remaining -= self.column_width(column);
                    column += 1;
                }
                column
            }
        })
    }

    // ---- addressing ----

    /// Offset of a node record inside its gene vector
    pub fn node_index(&self, node: usize) -> Result<usize> {
        Ok(self.node_address(node)?.offset)
    }

    pub fn operator_index(&self, node: usize) -> Result<usize> {
        Ok(self.node_index(node)? + self.geometry.input_count)
    }

    pub fn parameter_index(&self, node: usize) -> Result<usize> {
        Ok(self.operator_index(node)? + 1)
    }

    pub fn node_address(&self, node: usize) -> Result<GeneAddress> {
        let column = self.column_of(node)?;
        Ok(match self.layout {
            GenomeLayout::Linear => GeneAddress::new(0, node * self.node_length()),
            GenomeLayout::Columnar => GeneAddress::new(
                column,
                (node - self.column_starts[column]) * self.node_length(),
            ),
        })
    }

    pub fn input_address(&self, node: usize, slot: usize) -> Result<GeneAddress> {
        let base = self.node_address(node)?;
        Ok(GeneAddress::new(base.vector, base.offset + slot))
    }

    pub fn operator_address(&self, node: usize) -> Result<GeneAddress> {
        let base = self.node_address(node)?;
        Ok(GeneAddress::new(base.vector, base.offset + self.geometry.input_count))
    }

    pub fn parameter_address(&self, node: usize, slot: usize) -> Result<GeneAddress> {
        let op = self.operator_address(node)?;
        Ok(GeneAddress::new(op.vector, op.offset + 1 + slot))
    }

    /// Kind marker of a parameter slot; only present with step-size metadata
    pub fn metadata_address(&self, node: usize, slot: usize) -> Result<GeneAddress> {
        if !self.step_size_metadata {
            return Err(CgpError::GenomeShape("genome stores no parameter metadata".to_string()));
        }
        self.parameter_address(node, self.geometry.parameter_count + slot)
    }

    pub fn output_address(&self, index: usize) -> Result<GeneAddress> {
        if index >= self.geometry.outputs_count {
            return Err(CgpError::GenomeShape(format!("no output gene {}", index)));
        }
        Ok(match self.layout {
            GenomeLayout::Linear => GeneAddress::new(0, self.nodes_count() * self.node_length() + index),
            GenomeLayout::Columnar => {
                let last = self.geometry.columns - 1;
                GeneAddress::new(last, self.column_width(last) * self.node_length() + index)
            }
        })
    }

    /// Total gene count
    pub fn length(&self) -> usize {
        self.node_length() * self.nodes_count() + self.geometry.outputs_count
    }

    /// Lengths of the gene vectors of a well-formed genome
    pub fn vector_lengths(&self) -> Vec<usize> {
        match self.layout {
            GenomeLayout::Linear => vec![self.length()],
            GenomeLayout::Columnar => (0..self.geometry.columns)
                .map(|c| {
                    let outputs = if c + 1 == self.geometry.columns {
                        self.geometry.outputs_count
                    } else {
                        0
                    };
                    self.column_width(c) * self.node_length() + outputs
                })
                .collect(),
        }
    }

    /// Gene range of one column's node records (outputs excluded)
    pub fn column_gene_range(&self, column: usize) -> (usize, Range<usize>) {
        let len = self.column_width(column) * self.node_length();
        match self.layout {
            GenomeLayout::Linear => {
                let start = self.column_starts[column] * self.node_length();
                (0, start..start + len)
            }
            GenomeLayout::Columnar => (column, 0..len),
        }
    }

    pub fn role_of(&self, address: GeneAddress) -> Result<GeneRole> {
        let node_len = self.node_length();
        let (first_node, node_genes) = match self.layout {
            GenomeLayout::Linear if address.vector == 0 => (0, self.nodes_count() * node_len),
            GenomeLayout::Columnar if address.vector < self.geometry.columns => (
                self.column_starts[address.vector],
                self.column_width(address.vector) * node_len,
            ),
            _ => return Err(CgpError::GenomeShape(format!("no gene vector {}", address.vector))),
        };

        if address.offset >= node_genes {
            let index = address.offset - node_genes;
            let holds_outputs = self.layout == GenomeLayout::Linear
                || address.vector + 1 == self.geometry.columns;
            if holds_outputs && index < self.geometry.outputs_count {
                return Ok(GeneRole::Output { index });
            }
            return Err(CgpError::GenomeShape(format!("no gene at {:?}", address)));
        }

        let node = first_node + address.offset / node_len;
        let within = address.offset % node_len;
        let inputs = self.geometry.input_count;
        let params = self.geometry.parameter_count;
        Ok(if within < inputs {
            GeneRole::Input { node, slot: within }
        } else if within == inputs {
            GeneRole::Operator { node }
        } else if within - inputs - 1 < params {
            GeneRole::Parameter { node, slot: within - inputs - 1 }
        } else {
            GeneRole::Metadata { node, slot: within - inputs - 1 - params }
        })
    }

    pub fn is_input_gene(&self, address: GeneAddress) -> bool {
        matches!(self.role_of(address), Ok(GeneRole::Input { .. }))
    }

    pub fn is_operator_gene(&self, address: GeneAddress) -> bool {
        matches!(self.role_of(address), Ok(GeneRole::Operator { .. }))
    }

    pub fn is_parameter_gene(&self, address: GeneAddress) -> bool {
        matches!(self.role_of(address), Ok(GeneRole::Parameter { .. }))
    }

    // ---- bounds ----

    pub fn operator_bounds(&self, column: usize) -> &[OperatorId] {
        self.placement
            .operator_bounds()
            .get(column)
            .map(|ops| ops.as_slice())
            .unwrap_or(&[])
    }

    /// Legal references of every input slot of `op` in `column`
    pub fn slot_bounds(&self, column: usize, op: OperatorId) -> Result<&[Vec<NodeRef>]> {
        self.placement
            .input_bounds()
            .get(column)
            .and_then(|ops| ops.get(&op))
            .map(|slots| slots.as_slice())
            .ok_or_else(|| {
                CgpError::BoundsViolation(format!(
                    "operator '{}' is not placed in column {}",
                    self.catalog().name_of(op),
                    column
                ))
            })
    }

    pub fn input_bounds(&self, column: usize, op: OperatorId, slot: usize) -> Result<&[NodeRef]> {
        self.slot_bounds(column, op)?
            .get(slot)
            .map(|refs| refs.as_slice())
            .ok_or_else(|| {
                CgpError::BoundsViolation(format!(
                    "operator '{}' has no input slot {}",
                    self.catalog().name_of(op),
                    slot
                ))
            })
    }

    pub fn parameter_bounds(&self, op: OperatorId) -> Result<&[Vec<Gene>]> {
        self.placement.parameter_bounds(op)
    }

    pub fn parameter_kinds(&self, op: OperatorId) -> Result<&[ParameterKind]> {
        self.descriptor(op).map(|d| d.parameter_kinds.as_slice())
    }

    pub fn program_output_bounds(&self) -> &[NodeRef] {
        self.placement.program_output_bounds()
    }

    pub fn descriptor(&self, op: OperatorId) -> Result<&OperatorDescriptor> {
        self.catalog()
            .get(op)
            .ok_or_else(|| CgpError::BoundsViolation(format!("unknown operator id {}", op)))
    }

    /// Operator chosen by a node's function gene
    pub fn operator_of(&self, genome: &Genome, node: usize) -> Result<OperatorId> {
        let gene = genome.get(self.operator_address(node)?)?;
        Ok(self.catalog().descriptor_of_gene(gene)?.id)
    }

    /// Fails unless the genome's layout and vector lengths match this configuration
    pub fn check_shape(&self, genome: &Genome) -> Result<()> {
        if genome.layout() != self.layout {
            return Err(CgpError::GenomeShape(format!(
                "{:?} genome for a {:?} configuration",
                genome.layout(),
                self.layout
            )));
        }
        let expected = self.vector_lengths();
        if genome.vector_lengths() != expected {
            return Err(CgpError::GenomeShape(format!(
                "vector lengths {:?}, expected {:?}",
                genome.vector_lengths(),
                expected
            )));
        }
        Ok(())
    }
}

impl Hash for Configuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.geometry.hash(state);
        self.layout.hash(state);
        self.search_space.hash(state);
        self.step_size_metadata.hash(state);
        self.self_adaptive.hash(state);
        self.crossover_columns.hash(state);
        self.column_starts.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::placement::presets;
    use crate::functions::catalog::OperatorDescriptor;
    use crate::types::Category;

    fn catalog() -> OperatorCatalog {
        OperatorCatalog::from_definitions(&[
            OperatorDescriptor::new("Gauss", 1)
                .with_parameter(vec![1.0, 3.0, 5.0], ParameterKind::Continuous)
                .with_category(Category::ImageToImage),
            OperatorDescriptor::new("Median", 1)
                .with_parameter(vec![3.0, 5.0], ParameterKind::Continuous)
                .with_category(Category::ImageToImage),
            OperatorDescriptor::new("Threshold", 1)
                .with_parameter(vec![64.0, 128.0], ParameterKind::Continuous)
                .with_category(Category::ImageToRegion),
            OperatorDescriptor::new("Opening", 1)
                .with_parameter(vec![3.0, 5.0], ParameterKind::Categorical)
                .with_category(Category::RegionToRegion),
        ])
        .unwrap()
    }

    fn geometry() -> GridGeometry {
        GridGeometry {
            rows: 2,
            columns: 4,
            levels_back: 1,
            input_count: 2,
            parameter_count: 1,
            program_input_count: 1,
            outputs_count: 1,
        }
    }

    fn build(layout: GenomeLayout, metadata: bool) -> Configuration {
        let placement = PlacementMap::new(catalog(), presets::filter_threshold_morphology().unwrap()).unwrap();
        Configuration::builder(geometry())
            .layout(layout)
            .step_size_metadata(metadata)
            .placement_map(placement)
            .build()
            .unwrap()
    }

    #[test]
    fn test_linear_lengths() {
        let config = build(GenomeLayout::Linear, false);
        assert_eq!(config.node_length(), 4);
        assert_eq!(config.nodes_count(), 8);
        assert_eq!(config.length(), 33);
        assert_eq!(config.column_of(5).unwrap(), 2);
        assert_eq!(config.output_address(0).unwrap(), GeneAddress::new(0, 32));
    }

    #[test]
    fn test_columnar_widths_follow_operator_counts() {
        let config = build(GenomeLayout::Columnar, false);
        // Gauss and Median share the first column
        assert_eq!(config.column_width(0), 2);
        assert_eq!(config.column_width(1), 1);
        assert_eq!(config.nodes_count(), 5);
        assert_eq!(config.column_of(2).unwrap(), 1);
        assert_eq!(config.column_of(4).unwrap(), 3);
        assert_eq!(config.vector_lengths(), vec![8, 4, 4, 5]);
        assert_eq!(config.node_address(3).unwrap(), GeneAddress::new(2, 0));
    }

    #[test]
    fn test_metadata_doubles_parameter_block() {
        let config = build(GenomeLayout::Linear, true);
        assert_eq!(config.node_length(), 5);
        assert_eq!(config.metadata_address(1, 0).unwrap(), GeneAddress::new(0, 9));
        assert_eq!(
            config.role_of(GeneAddress::new(0, 9)).unwrap(),
            GeneRole::Metadata { node: 1, slot: 0 }
        );
    }

    #[test]
    fn test_roles() {
        let config = build(GenomeLayout::Linear, false);
        assert_eq!(config.role_of(GeneAddress::new(0, 5)).unwrap(), GeneRole::Input { node: 1, slot: 1 });
        assert!(config.is_operator_gene(GeneAddress::new(0, 6)));
        assert!(config.is_parameter_gene(GeneAddress::new(0, 7)));
        assert_eq!(config.role_of(GeneAddress::new(0, 32)).unwrap(), GeneRole::Output { index: 0 });
        assert!(config.role_of(GeneAddress::new(0, 33)).is_err());
    }

    #[test]
    fn test_geometry_validation() {
        let placement = PlacementMap::new(catalog(), presets::filter_threshold_morphology().unwrap()).unwrap();
        let mut bad = geometry();
        bad.levels_back = 0;
        assert!(Configuration::builder(bad).placement_map(placement.clone()).build().is_err());

        let mut bad = geometry();
        bad.outputs_count = 0;
        assert!(Configuration::builder(bad).placement_map(placement.clone()).build().is_err());

        assert!(matches!(
            Configuration::builder(geometry()).build(),
            Err(CgpError::Configuration(_))
        ));

        assert!(Configuration::builder(geometry())
            .crossover_columns(vec![2, 1])
            .placement_map(placement)
            .build()
            .is_err());
    }

    #[test]
    fn test_equal_configurations() {
        assert_eq!(build(GenomeLayout::Linear, false), build(GenomeLayout::Linear, false));
        assert_ne!(build(GenomeLayout::Linear, false), build(GenomeLayout::Columnar, false));
    }
}
