use thiserror::Error;

#[derive(Error, Debug)]
pub enum CgpError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dependency graph error: {0}")]
    Graph(String),

    #[error(
        "Dependency graph is disconnected: forward pass reached {forward} nodes, backward pass reached {backward}. \
         This typically happens when a category that only links two others has no operator in the catalog"
    )]
    DisconnectedGraph { forward: usize, backward: usize },

    #[error("Column count {columns} is too small: every one of the {required} operator categories needs its own column")]
    InsufficientColumns { columns: usize, required: usize },

    #[error("Operators not mapped to any column: {0:?}")]
    UnmappedOperators(Vec<String>),

    #[error("Operator catalog is empty")]
    EmptyCatalog,

    #[error("Empty bounds: {0}")]
    EmptyBounds(String),

    #[error("Bounds violation: {0}")]
    BoundsViolation(String),

    #[error("Genome shape mismatch: {0}")]
    GenomeShape(String),

    #[error("Mutation error: {0}")]
    Mutation(String),

    #[error("Random source error: {0}")]
    Random(String),

    #[error("Validity tester failed: {0}")]
    Validity(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, CgpError>;
