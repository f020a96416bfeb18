use super::Mutator;
use crate::engines::generation::configuration::Configuration;
use crate::engines::generation::gene_writer::GeneWriter;
use crate::engines::generation::genome::Genome;
use crate::engines::generation::random::RandomSource;
use crate::error::{CgpError, Result};
use crate::types::SearchSpace;

/// Classic per-gene mutation: every gene mutates with probability `rate`.
///
/// Input and output genes are resampled, a function gene is redrawn from its
/// column (a changed operator resamples the node's inputs and parameters),
/// parameter genes get `N(0, 1)` noise added without any bound check.
#[derive(Debug, Clone)]
pub struct PointMutator {
    rate: f64,
}

impl PointMutator {
    pub fn new(rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(CgpError::Mutation(format!("mutation rate {} is not a probability", rate)));
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl Mutator for PointMutator {
    fn mutate<R: RandomSource + ?Sized>(&self, parent: &Genome, config: &Configuration, rng: &mut R) -> Result<Genome> {
        config.check_shape(parent)?;
        let full = config.search_space() == SearchSpace::Full;
        let mut child = parent.clone();

        for node in 0..config.nodes_count() {
            let mut op = config.operator_of(&child, node)?;

            if full && rng.next_f64() < self.rate {
                let mut writer = GeneWriter::new(config, &mut child);
                let new_op = writer.sample_operator(node, rng)?;
                if new_op != op {
                    writer.sample_inputs(node, new_op, rng)?;
                    writer.sample_parameters(node, new_op, rng)?;
                    continue;
                }
                op = new_op;
            }

            if full {
                let arity = config.catalog().input_count_of(op)?;
                for slot in 0..arity {
                    if rng.next_f64() < self.rate {
                        GeneWriter::new(config, &mut child).sample_input(node, op, slot, rng)?;
                    }
                }
            }

            let parameters = config.descriptor(op)?.parameter_count();
            for slot in 0..parameters {
                if rng.next_f64() < self.rate {
                    let address = config.parameter_address(node, slot)?;
                    let value = child.get(address)? + rng.gaussian(0.0, 1.0)?;
                    child.set(address, value)?;
                }
            }
        }

        if full {
            for index in 0..config.outputs_count() {
                if rng.next_f64() < self.rate {
                    GeneWriter::new(config, &mut child).sample_output(index, rng)?;
                }
            }
        }
        Ok(child)
    }
}
