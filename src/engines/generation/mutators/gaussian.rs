use super::Mutator;
use crate::engines::generation::configuration::Configuration;
use crate::engines::generation::gene_writer::GeneWriter;
use crate::engines::generation::genome::{Genome, STEP_SIZE_MAX, STEP_SIZE_MIN};
use crate::engines::generation::random::RandomSource;
use crate::error::{CgpError, Result};
use crate::types::{Gene, ParameterKind, SearchSpace};

/// A gene mutates when `N(0, sigma)` exceeds this value
pub const MUTATION_THRESHOLD: f64 = 2.0;

/// Learning rate of the self-adaptive step-size update
const ADAPTATION_RATE: f64 = 0.22;

/// Keeps adapted step sizes strictly inside the open interval
const BOUNDARY_MARGIN: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Variant {
    /// threshold rule everywhere, walk deviation scaled by the spread of the bound list
    Threshold,
    /// exponential input rule, walk deviation `n / 25 * sigma`
    Custom,
}

fn fires<R: RandomSource + ?Sized>(rng: &mut R, sigma: f64) -> Result<bool> {
    Ok(rng.gaussian(0.0, sigma)? > MUTATION_THRESHOLD)
}

/// Position of the step size inside `[STEP_SIZE_MIN, STEP_SIZE_MAX]`, kept off both ends
fn relative_step(sigma: f64) -> f64 {
    let ratio = (sigma - STEP_SIZE_MIN) / (STEP_SIZE_MAX - STEP_SIZE_MIN);
    ratio.clamp(0.000001, 0.999999)
}

/// Index of the value in `values` closest to `current`
fn nearest_index(values: &[Gene], current: Gene) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (*a - current)
                .abs()
                .partial_cmp(&(*b - current).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Gaussian step over the index of an ordered bound list, rounded and clamped
fn walk<R: RandomSource + ?Sized>(rng: &mut R, values: &[Gene], current: Gene, sigma: f64, variant: Variant) -> Result<Gene> {
    let n = values.len();
    if n < 2 {
        return Ok(values.first().copied().unwrap_or(current));
    }
    let mu = nearest_index(values, current) as f64;
    let deviation = match variant {
        Variant::Threshold => {
            let spread: f64 = (0..n).map(|i| (i as f64 - mu).powi(2)).sum::<f64>() / n as f64;
            (relative_step(sigma) + 0.4) * spread.sqrt()
        }
        Variant::Custom => n as f64 / 25.0 * sigma,
    };
    let index = rng.gaussian(mu, deviation)?.round().clamp(0.0, (n - 1) as f64) as usize;
    Ok(values[index])
}

fn gaussian_pass<R: RandomSource + ?Sized>(
    parent: &Genome,
    config: &Configuration,
    rng: &mut R,
    sigma: f64,
    variant: Variant,
) -> Result<Genome> {
    config.check_shape(parent)?;
    let full = config.search_space() == SearchSpace::Full;
    let mut child = parent.clone();

    for node in 0..config.nodes_count() {
        let op = config.operator_of(&child, node)?;

        if full {
            for slot in 0..config.catalog().input_count_of(op)? {
                let mutate = match variant {
                    Variant::Threshold => fires(rng, sigma)?,
                    Variant::Custom => {
                        let g = rng.gaussian(0.0, sigma)?;
                        rng.next_f64() <= 0.02 * 1.48f64.powf(g - 5.0)
                    }
                };
                if mutate {
                    GeneWriter::new(config, &mut child).sample_input(node, op, slot, rng)?;
                }
            }
        }

        let bounds = config.parameter_bounds(op)?;
        for (slot, values) in bounds.iter().enumerate() {
            let kind = if config.step_size_metadata() {
                let marker = child.get(config.metadata_address(node, slot)?)?;
                Some(if marker == ParameterKind::Continuous.marker() {
                    ParameterKind::Continuous
                } else {
                    ParameterKind::Categorical
                })
            } else {
                None
            };
            let address = config.parameter_address(node, slot)?;
            match kind {
                Some(ParameterKind::Continuous) => {
                    let value = walk(rng, values, child.get(address)?, sigma, variant)?;
                    child.set(address, value)?;
                }
                _ => {
                    if fires(rng, sigma)? {
                        child.set(address, *rng.choose(values)?)?;
                    }
                }
            }
        }
    }

    if full {
        for index in 0..config.outputs_count() {
            if fires(rng, sigma)? {
                GeneWriter::new(config, &mut child).sample_output(index, rng)?;
            }
        }
    }
    Ok(child)
}

fn check_sigma(sigma: f64) -> Result<f64> {
    if !(sigma > 0.0 && sigma.is_finite()) {
        return Err(CgpError::Mutation(format!("sigma must be positive, got {}", sigma)));
    }
    Ok(sigma)
}

/// Every input, parameter and output gene mutates when `N(0, sigma) > 2`.
/// Function genes are left alone. With step-size metadata, continuous
/// parameters always take a Gaussian step along their bound list.
#[derive(Debug, Clone)]
pub struct ProbabilisticMutator {
    sigma: f64,
}

impl ProbabilisticMutator {
    pub fn new(sigma: f64) -> Result<Self> {
        Ok(Self { sigma: check_sigma(sigma)? })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl Mutator for ProbabilisticMutator {
    fn mutate<R: RandomSource + ?Sized>(&self, parent: &Genome, config: &Configuration, rng: &mut R) -> Result<Genome> {
        gaussian_pass(parent, config, rng, self.sigma, Variant::Threshold)
    }
}

/// Like `ProbabilisticMutator` but inputs mutate with probability
/// `0.02 * 1.48^(g - 5)`, `g ~ N(0, sigma)`, and parameter steps scale with
/// the length of the bound list.
#[derive(Debug, Clone)]
pub struct CustomProbabilisticMutator {
    sigma: f64,
}

impl CustomProbabilisticMutator {
    pub fn new(sigma: f64) -> Result<Self> {
        Ok(Self { sigma: check_sigma(sigma)? })
    }
}

impl Mutator for CustomProbabilisticMutator {
    fn mutate<R: RandomSource + ?Sized>(&self, parent: &Genome, config: &Configuration, rng: &mut R) -> Result<Genome> {
        gaussian_pass(parent, config, rng, self.sigma, Variant::Custom)
    }
}

/// Probabilistic mutation whose sigma lives in the genome and is adapted
/// before every use.
#[derive(Debug, Clone, Default)]
pub struct SelfAdaptiveMutator;

impl SelfAdaptiveMutator {
    pub fn new() -> Self {
        Self
    }

    /// Logistic update of the step size; the result stays strictly inside
    /// `(STEP_SIZE_MIN, STEP_SIZE_MAX)`
    pub fn adapt_step_size<R: RandomSource + ?Sized>(step_size: f64, rng: &mut R) -> Result<f64> {
        let p = relative_step(step_size);
        let g = rng.gaussian(0.0, 1.0)?.clamp(-3.0, 3.0) / 6.0 + 0.5;
        let adapted = (1.0 / ((1.0 + (1.0 - p) / p) * (-ADAPTATION_RATE * g).exp())).min(1.0);
        let sigma = STEP_SIZE_MIN + (STEP_SIZE_MAX - STEP_SIZE_MIN) * adapted;
        Ok(if sigma <= STEP_SIZE_MIN {
            STEP_SIZE_MIN + BOUNDARY_MARGIN
        } else if sigma >= STEP_SIZE_MAX {
            STEP_SIZE_MAX - BOUNDARY_MARGIN
        } else {
            sigma
        })
    }
}

impl Mutator for SelfAdaptiveMutator {
    fn mutate<R: RandomSource + ?Sized>(&self, parent: &Genome, config: &Configuration, rng: &mut R) -> Result<Genome> {
        let step_size = parent
            .step_size()
            .ok_or_else(|| CgpError::Mutation("self-adaptive mutation needs a genome step size".to_string()))?;
        let sigma = Self::adapt_step_size(step_size, rng)?;
        log::debug!("Step size {:.4} -> {:.4}", step_size, sigma);
        let mut child = gaussian_pass(parent, config, rng, sigma, Variant::Threshold)?;
        child.set_step_size(Some(sigma));
        Ok(child)
    }
}
