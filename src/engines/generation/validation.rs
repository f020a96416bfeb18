use super::configuration::Configuration;
use super::genome::{Genome, STEP_SIZE_MAX, STEP_SIZE_MIN};
use crate::error::{CgpError, Result};
use crate::types::gene_to_ref;

impl Configuration {
    /// Check a genome against the structural bounds: shape, function genes,
    /// populated input genes, output genes and the step-size interval.
    ///
    /// A failure means a creator or mutator produced an illegal gene; nothing
    /// is clamped.
    pub fn validate_genome(&self, genome: &Genome) -> Result<()> {
        self.check_shape(genome)?;

        for node in 0..self.nodes_count() {
            let column = self.column_of(node)?;
            let op = self.operator_of(genome, node)?;
            if !self.operator_bounds(column).contains(&op) {
                return Err(CgpError::BoundsViolation(format!(
                    "node {} holds operator '{}' which is not legal in column {}",
                    node,
                    self.catalog().name_of(op),
                    column
                )));
            }
            for (slot, legal) in self.slot_bounds(column, op)?.iter().enumerate() {
                let reference = gene_to_ref(genome.get(self.input_address(node, slot)?)?);
                if !legal.contains(&reference) {
                    return Err(CgpError::BoundsViolation(format!(
                        "node {} input {} references {}, legal: {:?}",
                        node, slot, reference, legal
                    )));
                }
            }
        }

        for index in 0..self.outputs_count() {
            let reference = gene_to_ref(genome.get(self.output_address(index)?)?);
            if !self.program_output_bounds().contains(&reference) {
                return Err(CgpError::BoundsViolation(format!(
                    "output {} references {}, which cannot be a program output",
                    index, reference
                )));
            }
        }

        if self.self_adaptive() {
            match genome.step_size() {
                Some(s) if s > STEP_SIZE_MIN && s < STEP_SIZE_MAX => {}
                other => {
                    return Err(CgpError::BoundsViolation(format!(
                        "step size {:?} outside ({}, {})",
                        other, STEP_SIZE_MIN, STEP_SIZE_MAX
                    )))
                }
            }
        }
        Ok(())
    }

    /// Check that every populated parameter gene is one of its listed values.
    /// Genomes mutated with unconstrained Gaussian noise fail this on purpose.
    pub fn validate_parameters(&self, genome: &Genome) -> Result<()> {
        for node in 0..self.nodes_count() {
            let op = self.operator_of(genome, node)?;
            for (slot, values) in self.parameter_bounds(op)?.iter().enumerate() {
                let value = genome.get(self.parameter_address(node, slot)?)?;
                if !values.contains(&value) {
                    return Err(CgpError::BoundsViolation(format!(
                        "node {} parameter {} = {} not in {:?}",
                        node, slot, value, values
                    )));
                }
            }
        }
        Ok(())
    }
}
