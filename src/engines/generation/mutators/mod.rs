//! Genetic operators producing a child genome from a parent.
//!
//! Every mutator clones its parent and returns the child; the parent is never
//! touched. Genes are only ever resampled from the placement bounds held by the
//! `Configuration`, with one exception: `PointMutator` perturbs parameter genes
//! with unconstrained Gaussian noise.
//!
//! Output genes are structural: whenever a mutator touches one it resamples
//! it from the program output bounds. In the parameters-only search space no
//! mutator changes input, function or output genes.

pub mod active_node;
pub mod gaussian;
pub mod point;
pub mod single_pass;
pub mod until_active;

pub use active_node::ActiveNodeMutator;
pub use gaussian::{CustomProbabilisticMutator, ProbabilisticMutator, SelfAdaptiveMutator};
pub use point::PointMutator;
pub use single_pass::{MutationSchedule, SinglePassMutator};
pub use until_active::{MutationSite, UntilActiveMutator};

use super::configuration::Configuration;
use super::genome::Genome;
use super::random::RandomSource;
use crate::error::Result;

pub trait Mutator: Send + Sync {
    fn mutate<R: RandomSource + ?Sized>(&self, parent: &Genome, config: &Configuration, rng: &mut R) -> Result<Genome>;
}

/// Runtime choice of mutator, built from `MutationConfig`
#[derive(Debug, Clone)]
pub enum MutatorKind {
    Point(PointMutator),
    ActiveNode(ActiveNodeMutator),
    UntilActive(UntilActiveMutator),
    Probabilistic(ProbabilisticMutator),
    CustomProbabilistic(CustomProbabilisticMutator),
    SelfAdaptive(SelfAdaptiveMutator),
    SinglePass(SinglePassMutator),
}

impl MutatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            MutatorKind::Point(_) => "point",
            MutatorKind::ActiveNode(_) => "active_node",
            MutatorKind::UntilActive(_) => "until_active",
            MutatorKind::Probabilistic(_) => "probabilistic",
            MutatorKind::CustomProbabilistic(_) => "custom_probabilistic",
            MutatorKind::SelfAdaptive(_) => "self_adaptive",
            MutatorKind::SinglePass(_) => "single_pass",
        }
    }
}

impl Mutator for MutatorKind {
    fn mutate<R: RandomSource + ?Sized>(&self, parent: &Genome, config: &Configuration, rng: &mut R) -> Result<Genome> {
        match self {
            MutatorKind::Point(m) => m.mutate(parent, config, rng),
            MutatorKind::ActiveNode(m) => m.mutate(parent, config, rng),
            MutatorKind::UntilActive(m) => m.mutate(parent, config, rng),
            MutatorKind::Probabilistic(m) => m.mutate(parent, config, rng),
            MutatorKind::CustomProbabilistic(m) => m.mutate(parent, config, rng),
            MutatorKind::SelfAdaptive(m) => m.mutate(parent, config, rng),
            MutatorKind::SinglePass(m) => m.mutate(parent, config, rng),
        }
    }
}
