use super::Mutator;
use crate::engines::generation::configuration::Configuration;
use crate::engines::generation::decoder::Decoder;
use crate::engines::generation::gene_writer::GeneWriter;
use crate::engines::generation::genome::Genome;
use crate::engines::generation::random::RandomSource;
use crate::error::{CgpError, Result};
use crate::types::SearchSpace;

/// Mutates exactly one active node. Three independent rolls (in percent)
/// decide whether one input, the operator and one parameter change.
#[derive(Debug, Clone)]
pub struct ActiveNodeMutator {
    input_probability: usize,
    operator_probability: usize,
    parameter_probability: usize,
}

impl ActiveNodeMutator {
    /// Probabilities as `[input, operator, parameter]`, each in `0..=100`
    pub fn new(probabilities: [usize; 3]) -> Result<Self> {
        if let Some(p) = probabilities.iter().find(|&&p| p > 100) {
            return Err(CgpError::Mutation(format!("category probability {} exceeds 100", p)));
        }
        Ok(Self {
            input_probability: probabilities[0],
            operator_probability: probabilities[1],
            parameter_probability: probabilities[2],
        })
    }

    fn roll<R: RandomSource + ?Sized>(rng: &mut R, percent: usize) -> Result<bool> {
        Ok(rng.next_index(100)? < percent)
    }
}

impl Mutator for ActiveNodeMutator {
    fn mutate<R: RandomSource + ?Sized>(&self, parent: &Genome, config: &Configuration, rng: &mut R) -> Result<Genome> {
        let active = Decoder::new(config).active_nodes_with(parent, true)?.grid_nodes();
        if active.is_empty() {
            return Err(CgpError::Mutation("genome has no active grid node".to_string()));
        }
        let full = config.search_space() == SearchSpace::Full;
        let node = *rng.choose(&active)?;
        let mut child = parent.clone();
        let mut writer = GeneWriter::new(config, &mut child);
        let mut op = config.operator_of(parent, node)?;

        if Self::roll(rng, self.input_probability)? && full {
            let arity = config.catalog().input_count_of(op)?;
            if arity > 0 {
                let slot = rng.next_index(arity)?;
                writer.sample_input(node, op, slot, rng)?;
            }
        }

        if Self::roll(rng, self.operator_probability)? && full {
            op = writer.sample_operator(node, rng)?;
            writer.sample_inputs(node, op, rng)?;
            writer.sample_parameters(node, op, rng)?;
        }

        if Self::roll(rng, self.parameter_probability)? {
            let count = config.descriptor(op)?.parameter_count();
            if count > 0 {
                let slot = rng.next_index(count)?;
                writer.sample_parameter(node, op, slot, rng)?;
            }
        }
        Ok(child)
    }
}
