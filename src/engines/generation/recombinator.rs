use super::configuration::Configuration;
use super::genome::Genome;
use crate::error::{CgpError, Result};

/// Column-granularity crossover.
///
/// With cut columns `c1 < c2 < ...` the child takes columns `[0, c1)` from the
/// first parent, `[c1, c2)` from the second and so on. Whole columns are
/// copied, so every gene stays legal. Outputs and the step size come from the
/// parent supplying the last column.
#[derive(Debug, Clone, Default)]
pub struct ColumnRecombinator;

impl ColumnRecombinator {
    pub fn new() -> Self {
        Self
    }

    /// Which parent supplies each column
    pub fn donors(config: &Configuration) -> Vec<usize> {
        let cuts = config.crossover_columns();
        (0..config.columns())
            .map(|column| cuts.iter().filter(|&&cut| cut <= column).count())
            .collect()
    }

    pub fn recombine(&self, parents: &[&Genome], config: &Configuration) -> Result<Genome> {
        let expected = config.crossover_columns().len() + 1;
        if parents.len() != expected {
            return Err(CgpError::Mutation(format!(
                "{} crossover columns need {} parents, got {}",
                config.crossover_columns().len(),
                expected,
                parents.len()
            )));
        }
        for parent in parents {
            config.check_shape(parent)?;
        }

        let donors = Self::donors(config);
        let last = donors.last().copied().unwrap_or(0);
        let mut child = parents[last].clone();
        for (column, &donor) in donors.iter().enumerate() {
            if donor == last {
                continue;
            }
            let (vector, range) = config.column_gene_range(column);
            let source = &parents[donor].vectors()[vector][range.clone()];
            child.vectors_mut()[vector][range].copy_from_slice(source);
        }
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::configuration::GridGeometry;
    use crate::engines::generation::creators::{Creator, RandomCreator};
    use crate::engines::placement::{presets, PlacementMap};
    use crate::functions::catalog::{OperatorCatalog, OperatorDescriptor};
    use crate::types::{Category, GenomeLayout, ParameterKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(layout: GenomeLayout, cuts: Vec<usize>) -> Configuration {
        let catalog = OperatorCatalog::from_definitions(&[
            OperatorDescriptor::new("Gauss", 1)
                .with_parameter(vec![1.0, 3.0, 5.0], ParameterKind::Continuous)
                .with_category(Category::ImageToImage),
            OperatorDescriptor::new("Mean", 1)
                .with_parameter(vec![3.0, 5.0], ParameterKind::Continuous)
                .with_category(Category::ImageToImage),
        ])
        .unwrap();
        let placement = PlacementMap::new(catalog, presets::images_only().unwrap()).unwrap();
        Configuration::builder(GridGeometry {
            rows: 2,
            columns: 5,
            levels_back: 1,
            input_count: 1,
            parameter_count: 1,
            program_input_count: 1,
            outputs_count: 1,
        })
        .layout(layout)
        .crossover_columns(cuts)
        .placement_map(placement)
        .build()
        .unwrap()
    }

    #[test]
    fn test_columns_copied_whole() {
        for layout in [GenomeLayout::Linear, GenomeLayout::Columnar] {
            let config = config(layout, vec![2, 4]);
            let mut rng = StdRng::seed_from_u64(61);
            let parents: Vec<Genome> = (0..3)
                .map(|_| RandomCreator::new().create(&config, &mut rng).unwrap())
                .collect();
            let refs: Vec<&Genome> = parents.iter().collect();
            let child = ColumnRecombinator::new().recombine(&refs, &config).unwrap();

            assert_eq!(ColumnRecombinator::donors(&config), vec![0, 0, 1, 1, 2]);
            for (column, donor) in ColumnRecombinator::donors(&config).into_iter().enumerate() {
                let (vector, range) = config.column_gene_range(column);
                assert_eq!(
                    child.vectors()[vector][range.clone()],
                    parents[donor].vectors()[vector][range]
                );
            }
            let output = config.output_address(0).unwrap();
            assert_eq!(child.get(output).unwrap(), parents[2].get(output).unwrap());
            config.validate_genome(&child).unwrap();
        }
    }

    #[test]
    fn test_parent_count_checked() {
        let config = config(GenomeLayout::Linear, vec![3]);
        let mut rng = StdRng::seed_from_u64(62);
        let parent = RandomCreator::new().create(&config, &mut rng).unwrap();
        assert!(ColumnRecombinator::new().recombine(&[&parent], &config).is_err());
    }
}
