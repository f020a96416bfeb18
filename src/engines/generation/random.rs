use crate::error::{CgpError, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Randomness the creators and mutators draw from.
///
/// Implemented for every `rand::Rng`; tests and callers normally pass a seeded
/// `StdRng`. Sources are not shared between threads, each caller owns one.
pub trait RandomSource {
    /// Uniform integer in `[0, n)`
    fn next_index(&mut self, n: usize) -> Result<usize>;

    /// Uniform float in `[0, 1)`
    fn next_f64(&mut self) -> f64;

    fn gaussian(&mut self, mean: f64, std_dev: f64) -> Result<f64>;

    fn choose<'a, T>(&mut self, values: &'a [T]) -> Result<&'a T> {
        let index = self.next_index(values.len())?;
        Ok(&values[index])
    }
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn next_index(&mut self, n: usize) -> Result<usize> {
        if n == 0 {
            return Err(CgpError::Random("cannot draw from an empty range".to_string()));
        }
        Ok(self.gen_range(0..n))
    }

    fn next_f64(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn gaussian(&mut self, mean: f64, std_dev: f64) -> Result<f64> {
        if !(std_dev >= 0.0 && std_dev.is_finite() && mean.is_finite()) {
            return Err(CgpError::Random(format!(
                "N({}, {}) needs a finite mean and a finite non-negative deviation",
                mean, std_dev
            )));
        }
        let normal = Normal::new(mean, std_dev)
            .map_err(|e| CgpError::Random(format!("N({}, {}): {}", mean, std_dev, e)))?;
        Ok(normal.sample(self))
    }
}
