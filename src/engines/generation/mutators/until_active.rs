use super::Mutator;
use crate::engines::generation::configuration::Configuration;
use crate::engines::generation::decoder::Decoder;
use crate::engines::generation::gene_writer::GeneWriter;
use crate::engines::generation::genome::{GeneAddress, Genome};
use crate::engines::generation::random::RandomSource;
use crate::error::{CgpError, Result};
use crate::types::{gene_to_ref, ref_to_gene, Gene, SearchSpace};

/// Safety cap on single-gene mutations per call
pub const MAX_ATTEMPTS: usize = 10_000;

/// The gene whose mutation ended an `UntilActiveMutator` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationSite {
    pub node: usize,
    pub address: GeneAddress,
    pub previous: Gene,
    pub value: Gene,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Input(usize),
    Operator,
    Parameter(usize),
}

/// Mutates one random gene at a time until a node active in the parent has
/// been hit, so every call changes the phenotype.
///
/// With `single_active` any node may be picked and mutations of inactive
/// nodes accumulate in the child; otherwise only active nodes are picked.
#[derive(Debug, Clone)]
pub struct UntilActiveMutator {
    single_active: bool,
}

impl UntilActiveMutator {
    pub fn new(single_active: bool) -> Self {
        Self { single_active }
    }

    /// Like `mutate`, also reporting which gene ended the search
    pub fn mutate_traced<R: RandomSource + ?Sized>(
        &self,
        parent: &Genome,
        config: &Configuration,
        rng: &mut R,
    ) -> Result<(Genome, MutationSite)> {
        let active = Decoder::new(config).active_nodes_with(parent, true)?;
        let active_nodes = active.grid_nodes();
        if active_nodes.is_empty() {
            return Err(CgpError::Mutation("genome has no active grid node".to_string()));
        }
        let pool: Vec<usize> = if self.single_active {
            (0..config.nodes_count()).collect()
        } else {
            active_nodes
        };
        let full = config.search_space() == SearchSpace::Full;
        let mut child = parent.clone();

        for _ in 0..MAX_ATTEMPTS {
            let node = *rng.choose(&pool)?;
            let Some(site) = self.mutate_gene(&mut child, config, node, full, rng)? else {
                continue;
            };
            if active.contains(node as i64) {
                return Ok((child, site));
            }
        }
        Err(CgpError::Mutation(format!(
            "no active node mutated within {} attempts",
            MAX_ATTEMPTS
        )))
    }

    /// Change one gene of `node` to a different legal value. `None` when the
    /// drawn gene has no alternative.
    fn mutate_gene<R: RandomSource + ?Sized>(
        &self,
        genome: &mut Genome,
        config: &Configuration,
        node: usize,
        full: bool,
        rng: &mut R,
    ) -> Result<Option<MutationSite>> {
        let column = config.column_of(node)?;
        let op = config.operator_of(genome, node)?;
        let arity = config.catalog().input_count_of(op)?;
        let parameters = config.descriptor(op)?.parameter_count();

        let mut targets: Vec<Target> = (0..parameters).map(Target::Parameter).collect();
        if full {
            targets.extend((0..arity).map(Target::Input));
            targets.push(Target::Operator);
        }
        if targets.is_empty() {
            return Ok(None);
        }

        let (address, alternatives): (GeneAddress, Vec<Gene>) = match *rng.choose(&targets)? {
            Target::Input(slot) => {
                let address = config.input_address(node, slot)?;
                let current = gene_to_ref(genome.get(address)?);
                let others = config
                    .input_bounds(column, op, slot)?
                    .iter()
                    .filter(|&&r| r != current)
                    .map(|&r| ref_to_gene(r))
                    .collect();
                (address, others)
            }
            Target::Operator => {
                let address = config.operator_address(node)?;
                let others = config
                    .operator_bounds(column)
                    .iter()
                    .filter(|&&o| o != op)
                    .map(|&o| o as Gene)
                    .collect();
                (address, others)
            }
            Target::Parameter(slot) => {
                let address = config.parameter_address(node, slot)?;
                let current = genome.get(address)?;
                let others = config.parameter_bounds(op)?[slot]
                    .iter()
                    .filter(|&&v| v != current)
                    .copied()
                    .collect();
                (address, others)
            }
        };

        if alternatives.is_empty() {
            return Ok(None);
        }
        let previous = genome.get(address)?;
        let value = *rng.choose(&alternatives)?;
        genome.set(address, value)?;

        if config.is_operator_gene(address) {
            let new_op = value as usize;
            let mut writer = GeneWriter::new(config, genome);
            writer.sample_inputs(node, new_op, rng)?;
            writer.sample_parameters(node, new_op, rng)?;
        }
        Ok(Some(MutationSite {
            node,
            address,
            previous,
            value,
        }))
    }
}

impl Mutator for UntilActiveMutator {
    fn mutate<R: RandomSource + ?Sized>(&self, parent: &Genome, config: &Configuration, rng: &mut R) -> Result<Genome> {
        Ok(self.mutate_traced(parent, config, rng)?.0)
    }
}
