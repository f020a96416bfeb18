pub mod configuration;
pub mod creators;
pub mod decoder;
pub mod gene_writer;
pub mod genome;
pub mod mutators;
pub mod random;
pub mod recombinator;
pub mod validation;

pub use configuration::{Configuration, ConfigurationBuilder, GeneRole, GridGeometry};
pub use creators::{
    create_population, CreationOutcome, Creator, ExhaustiveCreator, RandomCreator, ValidityCreator,
    ValidityTester,
};
pub use decoder::{ActiveNodes, ColumnNodeMap, DecodedNode, Decoder, ExecutionTree};
pub use gene_writer::GeneWriter;
pub use genome::{GeneAddress, Genes, Genome};
pub use mutators::{Mutator, MutatorKind};
pub use random::RandomSource;
pub use recombinator::ColumnRecombinator;
