use super::configuration::Configuration;
use super::gene_writer::GeneWriter;
use super::genome::{Genome, INITIAL_STEP_SIZE};
use super::random::RandomSource;
use crate::error::Result;
use crate::types::OperatorId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Default attempt budget of `ValidityCreator`
pub const DEFAULT_VALIDITY_ATTEMPTS: usize = 500;

/// Produces new genomes that respect the configuration's placement bounds
pub trait Creator: Send + Sync {
    fn create<R: RandomSource + ?Sized>(&self, config: &Configuration, rng: &mut R) -> Result<Genome>;
}

fn blank(config: &Configuration) -> Genome {
    let genome = Genome::zeroed(config.layout(), &config.vector_lengths());
    if config.self_adaptive() {
        genome.with_step_size(INITIAL_STEP_SIZE)
    } else {
        genome
    }
}

fn standard<'a>(solution: &'a Option<Genome>, config: &Configuration) -> Result<Option<&'a Genome>> {
    match solution {
        Some(genome) => {
            config.check_shape(genome)?;
            Ok(Some(genome))
        }
        None => Ok(None),
    }
}

/// One operator per node drawn uniformly from its column; inputs, parameters
/// and outputs drawn uniformly from their bounds. Inactive nodes are fully
/// populated too.
#[derive(Debug, Clone, Default)]
pub struct RandomCreator {
    standard_solution: Option<Genome>,
}

impl RandomCreator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always return `genome` instead of sampling
    pub fn with_standard_solution(genome: Genome) -> Self {
        Self {
            standard_solution: Some(genome),
        }
    }
}

impl Creator for RandomCreator {
    fn create<R: RandomSource + ?Sized>(&self, config: &Configuration, rng: &mut R) -> Result<Genome> {
        if let Some(genome) = standard(&self.standard_solution, config)? {
            return Ok(genome.clone());
        }
        let mut genome = blank(config);
        let mut writer = GeneWriter::new(config, &mut genome);
        for node in 0..config.nodes_count() {
            writer.sample_node(node, rng)?;
        }
        writer.sample_outputs(rng)?;
        Ok(genome)
    }
}

/// Walks every column's operators across consecutive nodes so each legal
/// operator appears at least once per column.
///
/// A column with fewer nodes than legal operators keeps only the first
/// `width` operators; the rest are left out of the genome with a warning.
/// [`ExhaustiveCreator::missing_operators`] lists them per column.
#[derive(Debug, Clone, Default)]
pub struct ExhaustiveCreator {
    standard_solution: Option<Genome>,
}

impl ExhaustiveCreator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_standard_solution(genome: Genome) -> Self {
        Self {
            standard_solution: Some(genome),
        }
    }

    /// Operators that do not fit their column, as `(column, operators)`
    pub fn missing_operators(config: &Configuration) -> Vec<(usize, Vec<OperatorId>)> {
        (0..config.columns())
            .filter_map(|column| {
                let operators = config.operator_bounds(column);
                let width = config.column_width(column);
                (width < operators.len()).then(|| (column, operators[width..].to_vec()))
            })
            .collect()
    }
}

impl Creator for ExhaustiveCreator {
    fn create<R: RandomSource + ?Sized>(&self, config: &Configuration, rng: &mut R) -> Result<Genome> {
        if let Some(genome) = standard(&self.standard_solution, config)? {
            return Ok(genome.clone());
        }
        for (column, missing) in Self::missing_operators(config) {
            log::warn!(
                "Column {} holds {} nodes, operators {:?} will be missing",
                column,
                config.column_width(column),
                missing
            );
        }
        let mut genome = blank(config);
        let mut writer = GeneWriter::new(config, &mut genome);
        for column in 0..config.columns() {
            let operators = config.operator_bounds(column);
            for (k, node) in config.node_range_of_column(column).enumerate() {
                let op = operators[k % operators.len()];
                writer.write_operator(node, op)?;
                writer.sample_inputs(node, op, rng)?;
                writer.sample_parameters(node, op, rng)?;
            }
        }
        writer.sample_outputs(rng)?;
        Ok(genome)
    }
}

/// Externally supplied acceptance test for freshly created genomes
pub trait ValidityTester: Send + Sync {
    fn is_valid(&self, genome: &Genome) -> anyhow::Result<bool>;
}

impl<F> ValidityTester for F
where
    F: Fn(&Genome) -> bool + Send + Sync,
{
    fn is_valid(&self, genome: &Genome) -> anyhow::Result<bool> {
        Ok(self(genome))
    }
}

/// Result of a bounded creation attempt
#[derive(Debug, Clone, PartialEq)]
pub enum CreationOutcome {
    Valid(Genome),
    /// The budget ran out; holds the last attempt
    Exhausted(Genome),
}

impl CreationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, CreationOutcome::Valid(_))
    }

    pub fn into_genome(self) -> Genome {
        match self {
            CreationOutcome::Valid(genome) | CreationOutcome::Exhausted(genome) => genome,
        }
    }
}

/// Repeats random creation until the tester accepts a genome or the attempt
/// budget is spent
pub struct ValidityCreator<T: ValidityTester> {
    tester: T,
    max_attempts: usize,
    inner: RandomCreator,
}

impl<T: ValidityTester> ValidityCreator<T> {
    pub fn new(tester: T) -> Self {
        Self {
            tester,
            max_attempts: DEFAULT_VALIDITY_ATTEMPTS,
            inner: RandomCreator::new(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn create_checked<R: RandomSource + ?Sized>(
        &self,
        config: &Configuration,
        rng: &mut R,
    ) -> Result<CreationOutcome> {
        let mut last = None;
        for _ in 0..self.max_attempts {
            let genome = self.inner.create(config, rng)?;
            if self.tester.is_valid(&genome)? {
                return Ok(CreationOutcome::Valid(genome));
            }
            last = Some(genome);
        }
        log::warn!("No valid genome within {} attempts, keeping the last one", self.max_attempts);
        match last {
            Some(genome) => Ok(CreationOutcome::Exhausted(genome)),
            None => Ok(CreationOutcome::Exhausted(self.inner.create(config, rng)?)),
        }
    }
}

impl<T: ValidityTester> Creator for ValidityCreator<T> {
    fn create<R: RandomSource + ?Sized>(&self, config: &Configuration, rng: &mut R) -> Result<Genome> {
        Ok(self.create_checked(config, rng)?.into_genome())
    }
}

/// `size` genomes built in parallel, individual `i` from a `StdRng` seeded `seed + i`
pub fn create_population<C: Creator>(
    creator: &C,
    config: &Configuration,
    size: usize,
    seed: u64,
) -> Result<Vec<Genome>> {
    let population = (0..size)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            creator.create(config, &mut rng)
        })
        .collect::<Result<Vec<_>>>()?;
    log::info!("Created population of {} genomes (seed {})", population.len(), seed);
    Ok(population)
}
