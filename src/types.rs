use serde::{Deserialize, Serialize};

/// Numeric value stored in a genome position
pub type Gene = f64;

/// Reference held by an input or output gene.
/// Values >= 0 address a grid node, values < 0 address a program input (-1, -2, ...).
pub type NodeRef = i64;

/// Dense identifier handed out by the operator catalog
pub type OperatorId = usize;

/// Operator classification used to constrain legal connections.
/// An operator may carry several categories; a dependency node carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    ImageToImage,
    ImageToRegion,
    RegionToRegion,
    ImageAndRegionToRegion,
    EdgeAmpAndRegionToRegion,
    InputImageAndRegionToRegion,
    ImageToXldContData,
    EdgeAmplitude,
    Threshold,
    Filter,
    Input,              // program input placeholder
    Custom(u16),        // application-defined
}

/// How a parameter's ordered bound list is explored by step-size aware mutators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    Continuous,  // ordered values, neighbours are similar
    Categorical, // unordered choices
}

impl ParameterKind {
    /// Marker written into the metadata half of a node's parameter block
    pub fn marker(&self) -> Gene {
        match self {
            ParameterKind::Continuous => 0.0,
            ParameterKind::Categorical => 1.0,
        }
    }
}

/// Physical layout of a genome's genes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenomeLayout {
    Linear,   // one flat vector, outputs trail the grid
    Columnar, // one vector per column, outputs trail the last column
}

/// Which genes mutators are allowed to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSpace {
    Full,
    ParametersOnly,
}

/// Convert a gene holding a node reference into a `NodeRef`
pub fn gene_to_ref(gene: Gene) -> NodeRef {
    gene.round() as NodeRef
}

/// Convert a node reference into the gene that stores it
pub fn ref_to_gene(node: NodeRef) -> Gene {
    node as Gene
}
