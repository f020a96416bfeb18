use super::configuration::Configuration;
use super::genome::Genome;
use super::random::RandomSource;
use crate::error::Result;
use crate::types::{ref_to_gene, OperatorId};

/// Writes bounds-respecting values into a genome's node records.
///
/// Shared by every creator and mutator so that operator, input, parameter and
/// output genes are always sampled from the same placement bounds.
pub struct GeneWriter<'a> {
    config: &'a Configuration,
    genome: &'a mut Genome,
}

impl<'a> GeneWriter<'a> {
    pub fn new(config: &'a Configuration, genome: &'a mut Genome) -> Self {
        Self { config, genome }
    }

    /// Operator, inputs and parameters of one node
    pub fn sample_node<R: RandomSource + ?Sized>(&mut self, node: usize, rng: &mut R) -> Result<OperatorId> {
        let op = self.sample_operator(node, rng)?;
        self.sample_inputs(node, op, rng)?;
        self.sample_parameters(node, op, rng)?;
        Ok(op)
    }

    /// Draw the function gene from the node's column operators
    pub fn sample_operator<R: RandomSource + ?Sized>(&mut self, node: usize, rng: &mut R) -> Result<OperatorId> {
        let column = self.config.column_of(node)?;
        let op = *rng.choose(self.config.operator_bounds(column))?;
        self.write_operator(node, op)?;
        Ok(op)
    }

    pub fn write_operator(&mut self, node: usize, op: OperatorId) -> Result<()> {
        let address = self.config.operator_address(node)?;
        self.genome.set(address, op as f64)
    }

    /// Populated input slots get a legal reference, unused slots are zeroed
    pub fn sample_inputs<R: RandomSource + ?Sized>(&mut self, node: usize, op: OperatorId, rng: &mut R) -> Result<()> {
        let column = self.config.column_of(node)?;
        let slots = self.config.slot_bounds(column, op)?;
        for slot in 0..self.config.input_count() {
            let value = match slots.get(slot) {
                Some(bounds) => ref_to_gene(*rng.choose(bounds)?),
                None => 0.0,
            };
            self.genome.set(self.config.input_address(node, slot)?, value)?;
        }
        Ok(())
    }

    /// Resample a single populated input slot
    pub fn sample_input<R: RandomSource + ?Sized>(
        &mut self,
        node: usize,
        op: OperatorId,
        slot: usize,
        rng: &mut R,
    ) -> Result<()> {
        let column = self.config.column_of(node)?;
        let value = ref_to_gene(*rng.choose(self.config.input_bounds(column, op, slot)?)?);
        self.genome.set(self.config.input_address(node, slot)?, value)
    }

    /// Parameter slots of `op` get a value from their bound list, unused slots
    /// are zeroed. With step-size metadata the kind markers are rewritten too.
    pub fn sample_parameters<R: RandomSource + ?Sized>(&mut self, node: usize, op: OperatorId, rng: &mut R) -> Result<()> {
        let bounds = self.config.parameter_bounds(op)?;
        let kinds = self.config.parameter_kinds(op)?;
        for slot in 0..self.config.parameter_count() {
            let value = match bounds.get(slot) {
                Some(values) => *rng.choose(values)?,
                None => 0.0,
            };
            self.genome.set(self.config.parameter_address(node, slot)?, value)?;
            if self.config.step_size_metadata() {
                let marker = kinds.get(slot).map(|k| k.marker()).unwrap_or(0.0);
                self.genome.set(self.config.metadata_address(node, slot)?, marker)?;
            }
        }
        Ok(())
    }

    pub fn sample_parameter<R: RandomSource + ?Sized>(
        &mut self,
        node: usize,
        op: OperatorId,
        slot: usize,
        rng: &mut R,
    ) -> Result<()> {
        let bounds = self.config.parameter_bounds(op)?;
        if let Some(values) = bounds.get(slot) {
            let value = *rng.choose(values)?;
            self.genome.set(self.config.parameter_address(node, slot)?, value)?;
        }
        Ok(())
    }

    pub fn sample_outputs<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        for index in 0..self.config.outputs_count() {
            self.sample_output(index, rng)?;
        }
        Ok(())
    }

    pub fn sample_output<R: RandomSource + ?Sized>(&mut self, index: usize, rng: &mut R) -> Result<()> {
        let value = ref_to_gene(*rng.choose(self.config.program_output_bounds())?);
        self.genome.set(self.config.output_address(index)?, value)
    }
}
