use super::Mutator;
use crate::engines::generation::configuration::Configuration;
use crate::engines::generation::gene_writer::GeneWriter;
use crate::engines::generation::genome::Genome;
use crate::engines::generation::random::RandomSource;
use crate::error::{CgpError, Result};
use crate::types::SearchSpace;
use std::fmt;
use std::sync::Arc;

/// Maps generations without improvement to a mutation probability
pub type MutationSchedule = Arc<dyn Fn(usize) -> f64 + Send + Sync>;

/// `0.3 + min(0.1 * x, 0.6)`: 30% after an improvement, rising to 90%
pub fn default_schedule() -> MutationSchedule {
    Arc::new(|stale: usize| 0.3 + (0.1 * stale as f64).min(0.6))
}

/// One sweep over every node and output. Each gene mutates with the
/// probability the schedule gives for the current stagnation.
#[derive(Clone)]
pub struct SinglePassMutator {
    schedule: MutationSchedule,
    probability: f64,
}

impl fmt::Debug for SinglePassMutator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinglePassMutator")
            .field("probability", &self.probability)
            .finish()
    }
}

impl Default for SinglePassMutator {
    fn default() -> Self {
        Self {
            probability: 0.3,
            schedule: default_schedule(),
        }
    }
}

impl SinglePassMutator {
    pub fn new(schedule: MutationSchedule) -> Result<Self> {
        let mut mutator = Self {
            schedule,
            probability: 0.0,
        };
        mutator.adapt(0)?;
        Ok(mutator)
    }

    /// Recompute the probability for `generations_without_improvement`
    pub fn adapt(&mut self, generations_without_improvement: usize) -> Result<f64> {
        let p = (self.schedule)(generations_without_improvement);
        if !(0.0..=1.0).contains(&p) {
            return Err(CgpError::Mutation(format!("{} is not a valid probability", p)));
        }
        self.probability = p;
        Ok(p)
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl Mutator for SinglePassMutator {
    fn mutate<R: RandomSource + ?Sized>(&self, parent: &Genome, config: &Configuration, rng: &mut R) -> Result<Genome> {
        config.check_shape(parent)?;
        let full = config.search_space() == SearchSpace::Full;
        let p = self.probability;
        let mut child = parent.clone();
        let mut writer = GeneWriter::new(config, &mut child);

        for node in 0..config.nodes_count() {
            let mut op = config.operator_of(parent, node)?;
            let mutate_operator = rng.next_f64() < p;
            let mut forced = false;
            if mutate_operator && full {
                let new_op = writer.sample_operator(node, rng)?;
                forced = new_op != op;
                op = new_op;
            }

            if full {
                for slot in 0..config.catalog().input_count_of(op)? {
                    if forced || rng.next_f64() < p {
                        writer.sample_input(node, op, slot, rng)?;
                    }
                }
            }

            if forced {
                writer.sample_parameters(node, op, rng)?;
            } else {
                for slot in 0..config.descriptor(op)?.parameter_count() {
                    if rng.next_f64() < p {
                        writer.sample_parameter(node, op, slot, rng)?;
                    }
                }
            }
        }

        if full {
            for index in 0..config.outputs_count() {
                if rng.next_f64() < p {
                    writer.sample_output(index, rng)?;
                }
            }
        }
        Ok(child)
    }
}
