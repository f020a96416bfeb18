use crate::error::{CgpError, Result};
use crate::types::{Gene, GenomeLayout};
use serde::{Deserialize, Serialize};

/// Lower bound of the self-adaptive step size (never reached)
pub const STEP_SIZE_MIN: f64 = 1.0;
/// Upper bound of the self-adaptive step size (never reached)
pub const STEP_SIZE_MAX: f64 = 5.0;
/// Step size given to freshly created self-adaptive genomes
pub const INITIAL_STEP_SIZE: f64 = 2.5;

/// Position of one gene: which gene vector, and the offset inside it.
/// Linear genomes only have vector 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneAddress {
    pub vector: usize,
    pub offset: usize,
}

impl GeneAddress {
    pub fn new(vector: usize, offset: usize) -> Self {
        Self { vector, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Genes {
    Linear(Vec<Gene>),
    Columnar(Vec<Vec<Gene>>),
}

/// Numeric encoding of a whole candidate program.
///
/// A genome is a grid of fixed-size node records followed by the output
/// genes. Each node record holds, in order:
/// - `input_count` input genes (node references, negative for program inputs)
/// - one function gene (an operator id)
/// - `parameter_count` parameter genes, followed by as many kind markers when
///   step-size metadata is enabled
///
/// # Layouts
///
/// - **Linear**: one flat vector, outputs trail the last node.
/// - **Columnar**: one vector per column, outputs trail the last column.
///
/// All addressing goes through `Configuration`, which knows the geometry. The
/// genome itself only stores values and, for self-adaptive runs, the current
/// mutation step size as a named field rather than a trailing gene.
///
/// Genomes are values: mutators and the recombinator clone their parents and
/// return new genomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    genes: Genes,
    step_size: Option<f64>,
}

impl Genome {
    pub fn linear(genes: Vec<Gene>) -> Self {
        Self {
            genes: Genes::Linear(genes),
            step_size: None,
        }
    }

    pub fn columnar(columns: Vec<Vec<Gene>>) -> Self {
        Self {
            genes: Genes::Columnar(columns),
            step_size: None,
        }
    }

    /// All-zero genome with the given vector lengths
    pub fn zeroed(layout: GenomeLayout, vector_lengths: &[usize]) -> Self {
        match layout {
            GenomeLayout::Linear => Self::linear(vec![0.0; vector_lengths.iter().sum()]),
            GenomeLayout::Columnar => {
                Self::columnar(vector_lengths.iter().map(|&len| vec![0.0; len]).collect())
            }
        }
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = Some(step_size);
        self
    }

    pub fn layout(&self) -> GenomeLayout {
        match self.genes {
            Genes::Linear(_) => GenomeLayout::Linear,
            Genes::Columnar(_) => GenomeLayout::Columnar,
        }
    }

    pub fn genes(&self) -> &Genes {
        &self.genes
    }

    /// Gene vectors; a linear genome is a single vector
    pub fn vectors(&self) -> &[Vec<Gene>] {
        match &self.genes {
            Genes::Linear(genes) => std::slice::from_ref(genes),
            Genes::Columnar(columns) => columns,
        }
    }

    pub fn vectors_mut(&mut self) -> &mut [Vec<Gene>] {
        match &mut self.genes {
            Genes::Linear(genes) => std::slice::from_mut(genes),
            Genes::Columnar(columns) => columns,
        }
    }

    pub fn get(&self, address: GeneAddress) -> Result<Gene> {
        self.vectors()
            .get(address.vector)
            .and_then(|v| v.get(address.offset))
            .copied()
            .ok_or_else(|| CgpError::GenomeShape(format!("no gene at {:?}", address)))
    }

    pub fn set(&mut self, address: GeneAddress, value: Gene) -> Result<()> {
        let slot = self
            .vectors_mut()
            .get_mut(address.vector)
            .and_then(|v| v.get_mut(address.offset))
            .ok_or_else(|| CgpError::GenomeShape(format!("no gene at {:?}", address)))?;
        *slot = value;
        Ok(())
    }

    /// Total number of genes (the step size is not a gene)
    pub fn len(&self) -> usize {
        self.vectors().iter().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vector_lengths(&self) -> Vec<usize> {
        self.vectors().iter().map(|v| v.len()).collect()
    }

    /// All genes in address order
    pub fn flatten(&self) -> Vec<Gene> {
        self.vectors().iter().flatten().copied().collect()
    }

    pub fn step_size(&self) -> Option<f64> {
        self.step_size
    }

    pub fn set_step_size(&mut self, step_size: Option<f64>) {
        self.step_size = step_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_addressing() {
        let mut genome = Genome::zeroed(GenomeLayout::Linear, &[6]);
        genome.set(GeneAddress::new(0, 4), 3.0).unwrap();
        assert_eq!(genome.get(GeneAddress::new(0, 4)).unwrap(), 3.0);
        assert!(genome.get(GeneAddress::new(1, 0)).is_err());
        assert!(genome.set(GeneAddress::new(0, 6), 1.0).is_err());
        assert_eq!(genome.len(), 6);
    }

    #[test]
    fn test_columnar_vectors() {
        let genome = Genome::columnar(vec![vec![1.0, 2.0], vec![3.0, 4.0, 5.0]]);
        assert_eq!(genome.layout(), GenomeLayout::Columnar);
        assert_eq!(genome.vector_lengths(), vec![2, 3]);
        assert_eq!(genome.flatten(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(genome.get(GeneAddress::new(1, 2)).unwrap(), 5.0);
    }

    #[test]
    fn test_step_size_is_not_a_gene() {
        let genome = Genome::linear(vec![0.0; 4]).with_step_size(INITIAL_STEP_SIZE);
        assert_eq!(genome.len(), 4);
        assert_eq!(genome.step_size(), Some(2.5));
    }
}
