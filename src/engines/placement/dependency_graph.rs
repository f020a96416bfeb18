use crate::error::{CgpError, Result};
use crate::types::{Category, NodeRef};
use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Bfs, IntoNeighbors, Reversed, VisitMap, Visitable};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Index of a node inside a `DependencyGraph`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepNodeId(pub usize);

/// One category instance in the dependency graph.
///
/// The same category may appear several times (e.g. a first and a final
/// region-to-region stage), each instance gets its own column. Edges live in
/// the owning graph, see `DependencyGraph::children` and `parents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub id: DepNodeId,
    pub category: Category,
    /// Set for input placeholders: the program input this placeholder stands for
    pub program_input: Option<NodeRef>,
    /// Per input slot OR-sets, for operators combining heterogeneous inputs in a fixed order
    pub and_dependencies: Option<Vec<Vec<DepNodeId>>>,
}

impl DependencyNode {
    pub fn is_input(&self) -> bool {
        self.program_input.is_some()
    }
}

/// Category-level DAG describing which categories may feed which.
///
/// Edges point from consumer (parent) to producer (child). Output nodes are the
/// roots, input placeholders are the leaves. Neighbour lists keep the order in
/// which edges were added, removals included.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<DepNodeId, DependencyNode>,
    edges: DiGraphMap<DepNodeId, ()>,
    outputs: Vec<DepNodeId>,
    next_id: usize,
}

impl PartialEq for DependencyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
            && self.outputs == other.outputs
            && self.next_id == other.next_id
            && self.edges.all_edges().eq(other.edges.all_edges())
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category node
    pub fn add_node(&mut self, category: Category) -> DepNodeId {
        self.push(category, None)
    }

    /// Add a placeholder for program input `program_input` (-1, -2, ...)
    pub fn add_input(&mut self, program_input: NodeRef) -> Result<DepNodeId> {
        if program_input >= 0 {
            return Err(CgpError::Graph(format!(
                "program input identifiers are negative, got {}",
                program_input
            )));
        }
        Ok(self.push(Category::Input, Some(program_input)))
    }

    fn push(&mut self, category: Category, program_input: Option<NodeRef>) -> DepNodeId {
        let id = DepNodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            DependencyNode {
                id,
                category,
                program_input,
                and_dependencies: None,
            },
        );
        self.edges.add_node(id);
        id
    }

    /// Declare that `parent` may consume the output of `child`
    pub fn add_child(&mut self, parent: DepNodeId, child: DepNodeId) -> Result<()> {
        if self.live(parent)?.is_input() {
            return Err(CgpError::Graph(format!(
                "input placeholder {:?} cannot consume other nodes",
                parent
            )));
        }
        self.live(child)?;
        if self.edges.contains_edge(parent, child) {
            return Ok(());
        }
        if parent == child || has_path_connecting(&self.edges, child, parent, None) {
            return Err(CgpError::Graph(format!(
                "edge {:?} -> {:?} would close a cycle",
                parent, child
            )));
        }
        self.edges.add_edge(parent, child, ());
        Ok(())
    }

    /// Per-slot dependencies: slot `j` of every operator placed for `node` may only
    /// read from the nodes in `slots[j]`. Every listed node also becomes a child.
    pub fn add_and_dependencies(&mut self, node: DepNodeId, slots: Vec<Vec<DepNodeId>>) -> Result<()> {
        self.live(node)?;
        for slot in &slots {
            if slot.is_empty() {
                return Err(CgpError::Graph(format!(
                    "and-dependency slot of {:?} is empty",
                    node
                )));
            }
            for &child in slot {
                self.add_child(node, child)?;
            }
        }
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.and_dependencies = Some(slots);
        }
        Ok(())
    }

    /// Set the output nodes. Every non-input leaf reachable from them gets an
    /// implicit placeholder for program input -1.
    pub fn set_outputs(&mut self, outputs: Vec<DepNodeId>) -> Result<()> {
        if outputs.is_empty() {
            return Err(CgpError::Graph("a dependency graph needs at least one output node".to_string()));
        }
        for &output in &outputs {
            self.live(output)?;
        }
        self.outputs = outputs;

        let leaves: Vec<DepNodeId> = self
            .traverse_backward()
            .into_iter()
            .filter(|&id| self.is_leaf(id) && !self.nodes[&id].is_input())
            .collect();
        if !leaves.is_empty() {
            let placeholder = match self.input_placeholder(-1) {
                Some(id) => id,
                None => self.add_input(-1)?,
            };
            for leaf in leaves {
                self.add_child(leaf, placeholder)?;
            }
        }
        Ok(())
    }

    fn input_placeholder(&self, program_input: NodeRef) -> Option<DepNodeId> {
        self.nodes()
            .find(|node| node.program_input == Some(program_input))
            .map(|node| node.id)
    }

    fn live(&self, id: DepNodeId) -> Result<&DependencyNode> {
        match self.nodes.get(&id) {
            Some(node) => Ok(node),
            None if id.0 < self.next_id => Err(CgpError::Graph(format!("node {:?} was removed", id))),
            None => Err(CgpError::Graph(format!("unknown node {:?}", id))),
        }
    }

    pub fn node(&self, id: DepNodeId) -> Option<&DependencyNode> {
        self.nodes.get(&id)
    }

    /// All nodes that have not been removed, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    /// Nodes `id` may consume, in the order they were added
    pub fn children(&self, id: DepNodeId) -> Vec<DepNodeId> {
        self.neighbours(id, Direction::Outgoing)
    }

    /// Nodes consuming `id`, in the order they were added
    pub fn parents(&self, id: DepNodeId) -> Vec<DepNodeId> {
        self.neighbours(id, Direction::Incoming)
    }

    fn neighbours(&self, id: DepNodeId, direction: Direction) -> Vec<DepNodeId> {
        if !self.edges.contains_node(id) {
            return Vec::new();
        }
        self.edges.neighbors_directed(id, direction).collect()
    }

    pub fn is_leaf(&self, id: DepNodeId) -> bool {
        self.children(id).is_empty()
    }

    pub fn outputs(&self) -> &[DepNodeId] {
        &self.outputs
    }

    pub fn input_nodes(&self) -> Vec<DepNodeId> {
        self.nodes().filter(|node| node.is_input()).map(|node| node.id).collect()
    }

    /// Remove a node and every edge and and-dependency entry referring to it
    pub fn remove(&mut self, id: DepNodeId) {
        if self.nodes.remove(&id).is_none() {
            return;
        }
        for parent in self.parents(id) {
            if let Some(slots) = self.nodes.get_mut(&parent).and_then(|p| p.and_dependencies.as_mut()) {
                for slot in slots.iter_mut() {
                    slot.retain(|&c| c != id);
                }
            }
        }
        // `GraphMap::remove_node` swap-removes neighbour entries, so rebuild to
        // keep every remaining neighbour list in insertion order
        let mut edges = DiGraphMap::with_capacity(self.nodes.len(), self.edges.edge_count());
        for &node in self.nodes.keys() {
            edges.add_node(node);
        }
        for (parent, child, _) in self.edges.all_edges() {
            if parent != id && child != id {
                edges.add_edge(parent, child, ());
            }
        }
        self.edges = edges;
        self.outputs.retain(|&o| o != id);
    }

    /// Remove input placeholders no remaining node consumes
    pub fn remove_orphan_inputs(&mut self) {
        let orphans: Vec<DepNodeId> = self
            .nodes()
            .filter(|node| node.is_input() && self.parents(node.id).is_empty())
            .map(|node| node.id)
            .collect();
        for orphan in orphans {
            self.remove(orphan);
        }
    }

    /// Breadth-first from the input placeholders, following parent edges
    pub fn traverse_forward(&self) -> Vec<DepNodeId> {
        breadth_first(Reversed(&self.edges), self.input_nodes())
    }

    /// Breadth-first from the output nodes, following child edges
    pub fn traverse_backward(&self) -> Vec<DepNodeId> {
        breadth_first(&self.edges, self.outputs.clone())
    }

    /// 0 for leaves and for nodes consuming only input placeholders,
    /// otherwise one more than the highest child
    pub fn height(&self, id: DepNodeId) -> usize {
        let mut memo = HashMap::new();
        self.height_memo(id, &mut memo)
    }

    fn height_memo(&self, id: DepNodeId, memo: &mut HashMap<DepNodeId, usize>) -> usize {
        if let Some(&height) = memo.get(&id) {
            return height;
        }
        let children = self.children(id);
        let all_inputs = children
            .iter()
            .all(|c| self.nodes.get(c).map(|n| n.is_input()).unwrap_or(true));
        let height = if all_inputs {
            0
        } else {
            children
                .iter()
                .map(|&c| self.height_memo(c, memo))
                .max()
                .unwrap_or(0)
                + 1
        };
        memo.insert(id, height);
        height
    }

    /// Non-input nodes grouped by height, ascending; backward traversal order within a layer
    pub fn layers(&self) -> BTreeMap<usize, Vec<DepNodeId>> {
        let mut memo = HashMap::new();
        let mut layers: BTreeMap<usize, Vec<DepNodeId>> = BTreeMap::new();
        for id in self.traverse_backward() {
            if self.nodes.get(&id).map(|n| n.is_input()).unwrap_or(true) {
                continue;
            }
            let height = self.height_memo(id, &mut memo);
            layers.entry(height).or_default().push(id);
        }
        layers
    }

    /// Number of columns a grid needs at minimum for this graph
    pub fn estimate_column_count(&self) -> usize {
        self.nodes().filter(|node| !node.is_input()).count()
    }

    /// DOT rendering for diagnostics
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph dependencies {\n");
        for node in self.nodes() {
            let label = match node.program_input {
                Some(input) => format!("Input {}", input),
                None => format!("{:?}", node.category),
            };
            dot.push_str(&format!("  n{} [label=\"{}\"];\n", node.id.0, label));
        }
        for (parent, child, _) in self.edges.all_edges() {
            dot.push_str(&format!("  n{} -> n{};\n", parent.0, child.0));
        }
        dot.push_str("}\n");
        dot
    }
}

/// Visit order of a breadth-first walk seeded with every node of `seeds`
fn breadth_first<G>(graph: G, seeds: Vec<DepNodeId>) -> Vec<DepNodeId>
where
    G: IntoNeighbors<NodeId = DepNodeId> + Visitable,
{
    let mut seeds = seeds.into_iter();
    let Some(first) = seeds.next() else {
        return Vec::new();
    };
    let mut bfs = Bfs::new(graph, first);
    for seed in seeds {
        if bfs.discovered.visit(seed) {
            bfs.stack.push_back(seed);
        }
    }
    let mut order = Vec::new();
    while let Some(node) = bfs.next(graph) {
        order.push(node);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn chain() -> (DependencyGraph, DepNodeId, DepNodeId, DepNodeId) {
        let mut graph = DependencyGraph::new();
        let input = graph.add_input(-1).unwrap();
        let img2img = graph.add_node(Category::ImageToImage);
        let img2r = graph.add_node(Category::ImageToRegion);
        graph.add_child(img2img, input).unwrap();
        graph.add_child(img2r, img2img).unwrap();
        graph.add_child(img2r, input).unwrap();
        graph.set_outputs(vec![img2r]).unwrap();
        (graph, input, img2img, img2r)
    }

    #[test]
    fn test_heights_ignore_input_children() {
        let (graph, _, img2img, img2r) = chain();
        assert_eq!(graph.height(img2img), 0);
        assert_eq!(graph.height(img2r), 1);
    }

    #[test]
    fn test_layers_skip_inputs() {
        let (graph, _, img2img, img2r) = chain();
        let layers = graph.layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[&0], vec![img2img]);
        assert_eq!(layers[&1], vec![img2r]);
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut graph, _, img2img, img2r) = chain();
        assert!(graph.add_child(img2img, img2r).is_err());
        assert!(graph.add_child(img2r, img2r).is_err());
    }

    #[test]
    fn test_implicit_input_for_leaves() {
        let mut graph = DependencyGraph::new();
        let r2r = graph.add_node(Category::RegionToRegion);
        graph.set_outputs(vec![r2r]).unwrap();
        let inputs = graph.input_nodes();
        assert_eq!(inputs.len(), 1);
        assert_eq!(graph.node(inputs[0]).unwrap().program_input, Some(-1));
        assert_eq!(graph.children(r2r), inputs);
    }

    #[test]
    fn test_remove_detaches_edges() {
        let (mut graph, input, img2img, img2r) = chain();
        graph.remove(img2img);
        assert!(graph.node(img2img).is_none());
        assert_eq!(graph.children(img2r), vec![input]);
        assert_eq!(graph.parents(input), vec![img2r]);
    }

    #[test]
    fn test_remove_keeps_neighbour_order() {
        let mut graph = DependencyGraph::new();
        let r2r = graph.add_node(Category::RegionToRegion);
        let first = graph.add_node(Category::ImageToRegion);
        let second = graph.add_node(Category::ImageToRegion);
        let third = graph.add_node(Category::ImageToRegion);
        for child in [first, second, third] {
            graph.add_child(r2r, child).unwrap();
        }
        graph.remove(first);
        assert_eq!(graph.children(r2r), vec![second, third]);
        assert!(graph.parents(first).is_empty());
    }

    #[test]
    fn test_backward_traversal_starts_from_every_output() {
        let mut graph = DependencyGraph::new();
        let input = graph.add_input(-1).unwrap();
        let left = graph.add_node(Category::ImageToImage);
        let right = graph.add_node(Category::ImageToRegion);
        graph.add_child(left, input).unwrap();
        graph.add_child(right, input).unwrap();
        graph.set_outputs(vec![left, right]).unwrap();
        assert_eq!(graph.traverse_backward(), vec![left, right, input]);
        assert_eq!(graph.traverse_forward(), vec![input, left, right]);
    }

    #[test]
    fn test_traversals_agree_on_connected_graph() {
        let (graph, _, _, _) = chain();
        let forward: HashSet<_> = graph.traverse_forward().into_iter().collect();
        let backward: HashSet<_> = graph.traverse_backward().into_iter().collect();
        assert_eq!(forward, backward);
        assert_eq!(graph.estimate_column_count(), 2);
    }

    #[test]
    fn test_positive_input_id_rejected() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_input(0).is_err());
    }
}
