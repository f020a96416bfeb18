use super::configuration::Configuration;
use super::genome::Genome;
use crate::error::{CgpError, Result};
use crate::types::{gene_to_ref, Gene, NodeRef, OperatorId};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Key under which program inputs are grouped in a `ColumnNodeMap`
pub const PROGRAM_INPUT_COLUMN: i64 = -1;

/// Active nodes grouped by column, ascending
pub type ColumnNodeMap = BTreeMap<i64, Vec<NodeRef>>;

/// Nodes reachable backward from the output genes, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveNodes {
    order: Vec<NodeRef>,
    set: HashSet<NodeRef>,
}

impl ActiveNodes {
    fn insert(&mut self, node: NodeRef) -> bool {
        if self.set.insert(node) {
            self.order.push(node);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.set.contains(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Active grid nodes (program inputs left out), ascending
    pub fn grid_nodes(&self) -> Vec<usize> {
        let mut nodes: Vec<usize> = self.order.iter().filter(|&&n| n >= 0).map(|&n| n as usize).collect();
        nodes.sort_unstable();
        nodes
    }

    pub fn as_set(&self) -> &HashSet<NodeRef> {
        &self.set
    }
}

/// Active node to the active nodes it reads, in input slot order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionTree {
    edges: BTreeMap<NodeRef, Vec<NodeRef>>,
}

impl ExecutionTree {
    pub fn dependencies(&self, node: NodeRef) -> Option<&[NodeRef]> {
        self.edges.get(&node).map(|d| d.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeRef, &[NodeRef])> {
        self.edges.iter().map(|(&n, d)| (n, d.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Dependency edges `input -> node` between active nodes
    pub fn to_graph(&self) -> DiGraphMap<NodeRef, ()> {
        let mut graph = DiGraphMap::with_capacity(self.edges.len(), self.edges.len());
        for (&node, deps) in &self.edges {
            graph.add_node(node);
            for &dep in deps.iter().filter(|d| self.edges.contains_key(d)) {
                graph.add_edge(dep, node, ());
            }
        }
        graph
    }

    /// Dependencies before dependents. A cycle can only come from a genome
    /// that violates its bounds.
    pub fn topological_order(&self) -> Result<Vec<NodeRef>> {
        toposort(&self.to_graph(), None).map_err(|cycle| {
            CgpError::BoundsViolation(format!(
                "execution tree has a cycle through node {}",
                cycle.node_id()
            ))
        })
    }
}

/// What the execution engine needs to run one active grid node
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNode {
    pub node: NodeRef,
    pub operator: OperatorId,
    pub inputs: Vec<NodeRef>,
    pub parameters: Vec<Gene>,
}

/// Extracts the active subgraph of a genome. Holds no state, every call is
/// independent.
pub struct Decoder<'a> {
    config: &'a Configuration,
}

impl<'a> Decoder<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Node references held by the output genes
    pub fn output_nodes(&self, genome: &Genome) -> Result<Vec<NodeRef>> {
        (0..self.config.outputs_count())
            .map(|i| Ok(gene_to_ref(genome.get(self.config.output_address(i)?)?)))
            .collect()
    }

    pub fn active_nodes(&self, genome: &Genome) -> Result<ActiveNodes> {
        self.active_nodes_with(genome, false)
    }

    /// Breadth-first from the outputs through the populated inputs of each node
    pub fn active_nodes_with(&self, genome: &Genome, exclude_program_inputs: bool) -> Result<ActiveNodes> {
        self.config.check_shape(genome)?;
        let mut visited = ActiveNodes::default();
        let mut queue: VecDeque<NodeRef> = VecDeque::new();
        for output in self.output_nodes(genome)? {
            self.check_reference(output)?;
            if visited.insert(output) {
                queue.push_back(output);
            }
        }

        while let Some(node) = queue.pop_front() {
            if node < 0 {
                continue;
            }
            for input in self.populated_inputs(genome, node)? {
                if visited.insert(input) {
                    queue.push_back(input);
                }
            }
        }

        if exclude_program_inputs {
            let mut grid = ActiveNodes::default();
            for node in visited.iter().filter(|&n| n >= 0) {
                grid.insert(node);
            }
            return Ok(grid);
        }
        Ok(visited)
    }

    /// References in the first `input_count(operator)` input genes of a node
    fn populated_inputs(&self, genome: &Genome, node: NodeRef) -> Result<Vec<NodeRef>> {
        let index = self.grid_node(node)?;
        let op = self.config.operator_of(genome, index)?;
        let arity = self.config.catalog().input_count_of(op)?;
        (0..arity)
            .map(|slot| {
                let reference = gene_to_ref(genome.get(self.config.input_address(index, slot)?)?);
                self.check_reference(reference)?;
                Ok(reference)
            })
            .collect()
    }

    fn grid_node(&self, node: NodeRef) -> Result<usize> {
        self.check_reference(node)?;
        if node < 0 {
            return Err(CgpError::BoundsViolation(format!("{} is a program input", node)));
        }
        Ok(node as usize)
    }

    fn check_reference(&self, node: NodeRef) -> Result<()> {
        let lowest = -(self.config.geometry().program_input_count as NodeRef);
        if node < lowest || node >= self.config.nodes_count() as NodeRef {
            return Err(CgpError::BoundsViolation(format!(
                "reference {} outside [{}, {})",
                node,
                lowest,
                self.config.nodes_count()
            )));
        }
        Ok(())
    }

    /// Each active node mapped to its inputs that are active too
    pub fn execution_tree(&self, genome: &Genome, active: Option<&ActiveNodes>) -> Result<ExecutionTree> {
        let computed;
        let active = match active {
            Some(active) => active,
            None => {
                computed = self.active_nodes(genome)?;
                &computed
            }
        };

        let mut edges = BTreeMap::new();
        for node in active.iter() {
            let deps = if node < 0 {
                Vec::new()
            } else {
                self.populated_inputs(genome, node)?
                    .into_iter()
                    .filter(|input| active.contains(*input))
                    .collect()
            };
            edges.insert(node, deps);
        }
        Ok(ExecutionTree { edges })
    }

    pub fn column_node_map(&self, genome: &Genome) -> Result<ColumnNodeMap> {
        let active = self.active_nodes(genome)?;
        let mut map = ColumnNodeMap::new();
        for node in active.iter() {
            let column = if node < 0 {
                PROGRAM_INPUT_COLUMN
            } else {
                self.config.column_of(node as usize)? as i64
            };
            map.entry(column).or_default().push(node);
        }
        for nodes in map.values_mut() {
            nodes.sort_unstable();
        }
        Ok(map)
    }

    /// Active grid nodes in execution order with their operator and parameters
    pub fn decode(&self, genome: &Genome) -> Result<Vec<DecodedNode>> {
        let tree = self.execution_tree(genome, None)?;
        let mut decoded = Vec::new();
        for node in tree.topological_order()? {
            if node < 0 {
                continue;
            }
            let index = node as usize;
            let operator = self.config.operator_of(genome, index)?;
            let count = self.config.descriptor(operator)?.parameter_count();
            let parameters = (0..count)
                .map(|slot| genome.get(self.config.parameter_address(index, slot)?))
                .collect::<Result<Vec<_>>>()?;
            decoded.push(DecodedNode {
                node,
                operator,
                inputs: self.populated_inputs(genome, node)?,
                parameters,
            });
        }
        Ok(decoded)
    }

    /// One line per row, active nodes wrapped in `{{ }}`
    pub fn render_grid(&self, genome: &Genome) -> Result<String> {
        let active = self.active_nodes(genome)?;
        let catalog = self.config.catalog();
        let columns = self.config.columns();
        let height = (0..columns).map(|c| self.config.column_width(c)).max().unwrap_or(0);

        let mut cells = vec![vec![String::new(); columns]; height];
        for column in 0..columns {
            for (row, node) in self.config.node_range_of_column(column).enumerate() {
                let op = self.config.operator_of(genome, node)?;
                let cell = format!("{}:{}", node, catalog.name_of(op));
                cells[row][column] = if active.contains(node as NodeRef) {
                    format!("{{{{{}}}}}", cell)
                } else {
                    cell
                };
            }
        }

        let width = cells.iter().flatten().map(|c| c.len()).max().unwrap_or(0);
        let mut out = String::new();
        for row in cells {
            let line: Vec<String> = row.iter().map(|c| format!("{:<width$}", c, width = width)).collect();
            out.push_str(line.join(" | ").trim_end());
            out.push('\n');
        }
        out.push_str(&format!("outputs: {:?}\n", self.output_nodes(genome)?));
        log::debug!("Rendered grid:\n{}", out);
        Ok(out)
    }
}
