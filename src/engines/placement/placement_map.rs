use super::dependency_graph::{DepNodeId, DependencyGraph};
use crate::error::{CgpError, Result};
use crate::functions::catalog::OperatorCatalog;
use crate::types::{Gene, NodeRef, OperatorId};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Range;

/// Legal predecessors per column, operator and input slot
pub type InputBounds = Vec<BTreeMap<OperatorId, Vec<Vec<NodeRef>>>>;

/// Which dependency node a column was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnAssignment {
    pub column: usize,
    pub node: DepNodeId,
}

/// Resolves the operator catalog and dependency graph into per-column
/// operator lists and per-slot legal predecessor lists.
///
/// Built in two phases, both driven by the owning `Configuration`:
/// 1. `initialize_operator_bounds` prunes the graph and assigns one column per
///    category instance (layout independent).
/// 2. `initialize` receives the node-id range of every column, which depends
///    on the genome layout, and computes input and output bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementMap {
    catalog: OperatorCatalog,
    graph: DependencyGraph,
    operator_bounds: Vec<Vec<OperatorId>>,
    assignments: Vec<ColumnAssignment>,
    input_bounds: InputBounds,
    program_output_bounds: Vec<NodeRef>,
    initialized: bool,
}

impl PlacementMap {
    pub fn new(catalog: OperatorCatalog, graph: DependencyGraph) -> Result<Self> {
        if catalog.is_empty() {
            return Err(CgpError::EmptyCatalog);
        }
        if graph.outputs().is_empty() {
            return Err(CgpError::Graph("dependency graph has no output nodes".to_string()));
        }
        Ok(Self {
            catalog,
            graph,
            operator_bounds: Vec::new(),
            assignments: Vec::new(),
            input_bounds: Vec::new(),
            program_output_bounds: Vec::new(),
            initialized: false,
        })
    }

    /// Phase one: prune, check connectivity and assign columns
    pub fn initialize_operator_bounds(&mut self, column_count: usize) -> Result<&[Vec<OperatorId>]> {
        self.prune()?;

        let required = self.graph.estimate_column_count();
        if column_count < required {
            return Err(CgpError::InsufficientColumns {
                columns: column_count,
                required,
            });
        }

        self.operator_bounds = vec![Vec::new(); column_count];
        self.assignments.clear();

        let mut column = 0;
        for (_, layer) in self.graph.layers() {
            for node in layer {
                self.assign(column, node)?;
                column += 1;
            }
        }

        let cyclic_outputs: Vec<DepNodeId> = self
            .graph
            .outputs()
            .iter()
            .copied()
            .filter(|&id| self.graph.node(id).map(|n| !n.is_input()).unwrap_or(false))
            .collect();
        if column < column_count && cyclic_outputs.is_empty() {
            return Err(CgpError::Graph(
                "no non-input output node available to fill the remaining columns".to_string(),
            ));
        }
        for node in cyclic_outputs.iter().cycle() {
            if column >= column_count {
                break;
            }
            self.assign(column, *node)?;
            column += 1;
        }

        self.check_all_operators_placed()?;

        log::debug!(
            "Assigned {} columns: {:?}",
            column_count,
            self.operator_bounds
        );
        Ok(&self.operator_bounds)
    }

    /// Drop nodes no output depends on and nodes without any operator, then
    /// verify forward and backward reachability still agree
    fn prune(&mut self) -> Result<()> {
        let reachable: HashSet<DepNodeId> = self.graph.traverse_backward().into_iter().collect();
        let unreachable: Vec<DepNodeId> = self
            .graph
            .nodes()
            .map(|n| n.id)
            .filter(|id| !reachable.contains(id))
            .collect();
        for id in unreachable {
            log::debug!("Dropping dependency node {:?}: no output consumes it", id);
            self.graph.remove(id);
        }

        let unsupported: Vec<DepNodeId> = self
            .graph
            .nodes()
            .filter(|n| !n.is_input() && self.catalog.matching(n.category).is_empty())
            .map(|n| n.id)
            .collect();
        for id in unsupported {
            log::debug!("Pruning dependency node {:?}: no operator in the catalog", id);
            self.graph.remove(id);
        }
        self.graph.remove_orphan_inputs();

        let forward: HashSet<DepNodeId> = self.graph.traverse_forward().into_iter().collect();
        let backward: HashSet<DepNodeId> = self.graph.traverse_backward().into_iter().collect();
        if forward != backward || backward.is_empty() {
            return Err(CgpError::DisconnectedGraph {
                forward: forward.len(),
                backward: backward.len(),
            });
        }
        Ok(())
    }

    fn assign(&mut self, column: usize, node: DepNodeId) -> Result<()> {
        let category = self
            .graph
            .node(node)
            .map(|n| n.category)
            .ok_or_else(|| CgpError::Graph(format!("node {:?} vanished during placement", node)))?;
        let operators = self.catalog.matching(category);
        if operators.is_empty() {
            return Err(CgpError::EmptyBounds(format!(
                "column {} ({:?}) has no operator",
                column, category
            )));
        }
        self.operator_bounds[column] = operators;
        self.assignments.push(ColumnAssignment { column, node });
        Ok(())
    }

    fn check_all_operators_placed(&self) -> Result<()> {
        let placed: HashSet<OperatorId> = self.operator_bounds.iter().flatten().copied().collect();
        let unmapped: Vec<String> = self
            .catalog
            .iter()
            .filter(|op| {
                self.graph
                    .nodes()
                    .any(|n| !n.is_input() && op.matches(n.category))
            })
            .filter(|op| !placed.contains(&op.id))
            .map(|op| op.name.clone())
            .collect();
        if !unmapped.is_empty() {
            return Err(CgpError::UnmappedOperators(unmapped));
        }
        Ok(())
    }

    /// Phase two: input and output bounds from the node-id range of each column
    pub fn initialize(&mut self, column_ranges: &[Range<NodeRef>]) -> Result<()> {
        if column_ranges.len() != self.operator_bounds.len() {
            return Err(CgpError::Configuration(format!(
                "{} column ranges for {} columns",
                column_ranges.len(),
                self.operator_bounds.len()
            )));
        }

        let operator_node_ids = self.operator_node_ids(column_ranges);
        let mut input_bounds: InputBounds = vec![BTreeMap::new(); self.operator_bounds.len()];

        for assignment in &self.assignments {
            let column = assignment.column;
            let node = self
                .graph
                .node(assignment.node)
                .ok_or_else(|| CgpError::Graph(format!("node {:?} vanished during placement", assignment.node)))?;
            let first_in_column = column_ranges[column].start;

            for &op in &self.operator_bounds[column] {
                let input_count = self.catalog.input_count_of(op)?;
                let mut slots = Vec::with_capacity(input_count);
                for slot in 0..input_count {
                    let sources: Vec<DepNodeId> = match &node.and_dependencies {
                        Some(and_slots) => and_slots.get(slot).cloned().ok_or_else(|| {
                            CgpError::Configuration(format!(
                                "operator '{}' has {} inputs but its dependency node declares {} slots",
                                self.catalog.name_of(op),
                                input_count,
                                and_slots.len()
                            ))
                        })?,
                        None => self.graph.children(node.id),
                    };

                    let mut legal: BTreeSet<NodeRef> = BTreeSet::new();
                    for source in sources {
                        let Some(source_node) = self.graph.node(source) else {
                            continue;
                        };
                        if let Some(program_input) = source_node.program_input {
                            legal.insert(program_input);
                            continue;
                        }
                        for producer in self.catalog.matching(source_node.category) {
                            if let Some(ids) = operator_node_ids.get(&producer) {
                                // only earlier columns, no cycles by construction
                                legal.extend(ids.iter().copied().filter(|&id| id < first_in_column));
                            }
                        }
                    }

                    if legal.is_empty() {
                        return Err(CgpError::EmptyBounds(format!(
                            "column {}, operator '{}', input slot {} has no legal predecessor",
                            column,
                            self.catalog.name_of(op),
                            slot
                        )));
                    }
                    slots.push(legal.into_iter().collect());
                }
                input_bounds[column].insert(op, slots);
            }
        }

        let outputs: HashSet<DepNodeId> = self.graph.outputs().iter().copied().collect();
        let mut program_outputs: BTreeSet<NodeRef> = BTreeSet::new();
        for assignment in self.assignments.iter().filter(|a| outputs.contains(&a.node)) {
            for op in &self.operator_bounds[assignment.column] {
                if let Some(ids) = operator_node_ids.get(op) {
                    program_outputs.extend(ids.iter().copied());
                }
            }
        }
        if program_outputs.is_empty() {
            return Err(CgpError::EmptyBounds("program outputs have no legal source".to_string()));
        }

        self.input_bounds = input_bounds;
        self.program_output_bounds = program_outputs.into_iter().collect();
        self.initialized = true;

        log::info!(
            "Placement map ready: {} columns, {} operators placed, {} legal program outputs",
            self.operator_bounds.len(),
            self.operator_bounds.iter().flatten().collect::<HashSet<_>>().len(),
            self.program_output_bounds.len()
        );
        Ok(())
    }

    /// Union of the node-id ranges of every column containing each operator
    fn operator_node_ids(&self, column_ranges: &[Range<NodeRef>]) -> BTreeMap<OperatorId, BTreeSet<NodeRef>> {
        let mut map: BTreeMap<OperatorId, BTreeSet<NodeRef>> = BTreeMap::new();
        for (column, operators) in self.operator_bounds.iter().enumerate() {
            for &op in operators {
                map.entry(op).or_default().extend(column_ranges[column].clone());
            }
        }
        map
    }

    pub fn catalog(&self) -> &OperatorCatalog {
        &self.catalog
    }

    /// The graph after pruning (before phase one: as supplied)
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn operator_bounds(&self) -> &[Vec<OperatorId>] {
        &self.operator_bounds
    }

    pub fn assignments(&self) -> &[ColumnAssignment] {
        &self.assignments
    }

    pub fn input_bounds(&self) -> &InputBounds {
        &self.input_bounds
    }

    pub fn program_output_bounds(&self) -> &[NodeRef] {
        &self.program_output_bounds
    }

    pub fn parameter_bounds(&self, op: OperatorId) -> Result<&[Vec<Gene>]> {
        self.catalog
            .get(op)
            .map(|d| d.parameter_bounds.as_slice())
            .ok_or_else(|| CgpError::BoundsViolation(format!("unknown operator id {}", op)))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::placement::presets;
    use crate::functions::catalog::OperatorDescriptor;
    use crate::types::{Category, ParameterKind};

    fn image_catalog() -> OperatorCatalog {
        OperatorCatalog::from_definitions(&[
            OperatorDescriptor::new("GaussFilter", 1)
                .with_parameter(vec![1.0, 3.0, 5.0], ParameterKind::Continuous)
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

    fn linear_ranges(columns: usize, rows: i64) -> Vec<Range<NodeRef>> {
        (0..columns as i64).map(|c| c * rows..(c + 1) * rows).collect()
    }

    #[test]
    fn test_filter_threshold_morphology_columns() {
        let graph = presets::filter_threshold_morphology().unwrap();
        let mut map = PlacementMap::new(image_catalog(), graph).unwrap();
        let bounds = map.initialize_operator_bounds(4).unwrap().to_vec();
        assert_eq!(bounds, vec![vec![0], vec![1], vec![2], vec![2]]);

        map.initialize(&linear_ranges(4, 2)).unwrap();
        let inputs = map.input_bounds();
        // filters read the image only
        assert_eq!(inputs[0][&0][0], vec![-1]);
        // thresholds read filters or the image
        assert_eq!(inputs[1][&1][0], vec![-1, 0, 1]);
        // the cycled morphology column may read any earlier threshold
        assert_eq!(inputs[3][&2][0], vec![2, 3]);
        assert_eq!(map.program_output_bounds(), &[4, 5, 6, 7]);
    }

    #[test]
    fn test_insufficient_columns() {
        let graph = presets::filter_threshold_morphology().unwrap();
        let mut map = PlacementMap::new(image_catalog(), graph).unwrap();
        let err = map.initialize_operator_bounds(2).unwrap_err();
        assert!(matches!(err, CgpError::InsufficientColumns { columns: 2, required: 3 }));
    }

    #[test]
    fn test_missing_link_disconnects_graph() {
        // no ImageToRegion operator: the region stage loses its only producer
        let catalog = OperatorCatalog::from_definitions(&[
            OperatorDescriptor::new("GaussFilter", 1).with_category(Category::ImageToImage),
            OperatorDescriptor::new("Opening", 1).with_category(Category::RegionToRegion),
        ])
        .unwrap();
        let graph = presets::filter_threshold_morphology().unwrap();
        let mut map = PlacementMap::new(catalog, graph).unwrap();
        assert!(matches!(
            map.initialize_operator_bounds(4),
            Err(CgpError::DisconnectedGraph { .. })
        ));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let graph = presets::images_only().unwrap();
        assert!(matches!(
            PlacementMap::new(OperatorCatalog::new(), graph),
            Err(CgpError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_and_dependencies_restrict_each_slot() {
        let catalog = OperatorCatalog::from_definitions(&[
            OperatorDescriptor::new("Gauss", 1).with_category(Category::ImageToImage),
            OperatorDescriptor::new("Threshold", 1).with_category(Category::ImageToRegion),
            OperatorDescriptor::new("ReduceDomain", 2).with_category(Category::ImageAndRegionToRegion),
        ])
        .unwrap();
        let mut graph = DependencyGraph::new();
        let image = graph.add_input(-1).unwrap();
        let img2img = graph.add_node(Category::ImageToImage);
        let img2r = graph.add_node(Category::ImageToRegion);
        let mixed = graph.add_node(Category::ImageAndRegionToRegion);
        graph.add_child(img2img, image).unwrap();
        graph.add_child(img2r, img2img).unwrap();
        graph.add_and_dependencies(mixed, vec![vec![img2img], vec![img2r]]).unwrap();
        graph.set_outputs(vec![mixed]).unwrap();

        let mut map = PlacementMap::new(catalog, graph).unwrap();
        map.initialize_operator_bounds(3).unwrap();
        map.initialize(&linear_ranges(3, 2)).unwrap();
        let slots = &map.input_bounds()[2][&2];
        assert_eq!(slots[0], vec![0, 1]);
        assert_eq!(slots[1], vec![2, 3]);
    }

    #[test]
    fn test_implicit_input_feeds_cycled_columns() {
        let catalog = OperatorCatalog::from_definitions(&[
            OperatorDescriptor::new("Gauss", 1).with_category(Category::ImageToImage),
        ])
        .unwrap();
        let mut graph = DependencyGraph::new();
        let img2img = graph.add_node(Category::ImageToImage);
        graph.set_outputs(vec![img2img]).unwrap();
        let mut map = PlacementMap::new(catalog, graph).unwrap();
        map.initialize_operator_bounds(2).unwrap();
        // the implicit placeholder feeds the first column
        map.initialize(&linear_ranges(2, 3)).unwrap();
        assert_eq!(map.input_bounds()[0][&0][0], vec![-1]);
        assert_eq!(map.input_bounds()[1][&0][0], vec![-1]);
    }
}
