use super::traits::{ConfigSection, FieldKind, FieldSpec};
use crate::engines::generation::creators::{ValidityCreator, ValidityTester};
use crate::engines::generation::mutators::{
    ActiveNodeMutator, CustomProbabilisticMutator, MutatorKind, PointMutator, ProbabilisticMutator,
    SelfAdaptiveMutator, SinglePassMutator, UntilActiveMutator,
};
use crate::error::CgpError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStrategy {
    Point,
    ActiveNode,
    UntilActive,
    Probabilistic,
    CustomProbabilistic,
    SelfAdaptive,
    SinglePass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    pub strategy: MutationStrategy,
    /// Per-gene probability of the point mutator
    pub mutation_rate: f64,
    /// `[input, operator, parameter]` in percent, for the active node mutator
    pub category_probabilities: [usize; 3],
    /// Until-active mutator: pick any node instead of active nodes only
    pub single_active: bool,
    /// Temperature of the Gaussian-threshold mutators
    pub sigma: f64,
    pub validity_attempts: usize,
    pub seed: u64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            strategy: MutationStrategy::UntilActive,
            mutation_rate: 0.05,
            category_probabilities: [30, 10, 60],
            single_active: true,
            sigma: 2.0,
            validity_attempts: 500,
            seed: 42,
        }
    }
}

impl MutationConfig {
    pub fn build_mutator(&self) -> Result<MutatorKind, CgpError> {
        self.validate()?;
        Ok(match self.strategy {
            MutationStrategy::Point => MutatorKind::Point(PointMutator::new(self.mutation_rate)?),
            MutationStrategy::ActiveNode => {
                MutatorKind::ActiveNode(ActiveNodeMutator::new(self.category_probabilities)?)
            }
            MutationStrategy::UntilActive => {
                MutatorKind::UntilActive(UntilActiveMutator::new(self.single_active))
            }
            MutationStrategy::Probabilistic => {
                MutatorKind::Probabilistic(ProbabilisticMutator::new(self.sigma)?)
            }
            MutationStrategy::CustomProbabilistic => {
                MutatorKind::CustomProbabilistic(CustomProbabilisticMutator::new(self.sigma)?)
            }
            MutationStrategy::SelfAdaptive => MutatorKind::SelfAdaptive(SelfAdaptiveMutator::new()),
            MutationStrategy::SinglePass => MutatorKind::SinglePass(SinglePassMutator::default()),
        })
    }

    /// Validity creator spending at most `validity_attempts` draws per genome
    pub fn build_validity_creator<T: ValidityTester>(&self, tester: T) -> Result<ValidityCreator<T>, CgpError> {
        self.validate()?;
        Ok(ValidityCreator::new(tester).with_max_attempts(self.validity_attempts))
    }
}

impl ConfigSection for MutationConfig {
    fn section_name() -> &'static str {
        "mutation"
    }

    fn validate(&self) -> Result<(), CgpError> {
        if self.mutation_rate < 0.0 || self.mutation_rate > 1.0 {
            return Err(CgpError::Configuration(
                "Mutation rate must be between 0 and 1".to_string()
            ));
        }
        if self.category_probabilities.iter().any(|&p| p > 100) {
            return Err(CgpError::Configuration(
                "Category probabilities are percentages (0-100)".to_string()
            ));
        }
        if !(self.sigma > 0.0) {
            return Err(CgpError::Configuration(
                "Sigma must be positive".to_string()
            ));
        }
        if self.validity_attempts < 1 {
            return Err(CgpError::Configuration(
                "validity_attempts must be at least 1".to_string()
            ));
        }
        Ok(())
    }

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new(
                "strategy",
                FieldKind::choice(&[
                    "point",
                    "active_node",
                    "until_active",
                    "probabilistic",
                    "custom_probabilistic",
                    "self_adaptive",
                    "single_pass",
                ]),
                "Mutator to use",
            ),
            FieldSpec::new("mutation_rate", FieldKind::Probability, "Per-gene mutation probability"),
            FieldSpec::new(
                "category_probabilities",
                FieldKind::Percentages { len: 3 },
                "Input, operator and parameter mutation chance in percent",
            ),
            FieldSpec::new("single_active", FieldKind::Flag, "Mutate any node until an active one is hit"),
            FieldSpec::new("sigma", FieldKind::Positive, "Gaussian mutation temperature"),
            FieldSpec::new(
                "validity_attempts",
                FieldKind::Count { min: 1, max: None },
                "Attempts of the validity creator",
            ),
            FieldSpec::new("seed", FieldKind::Seed, "Base seed for population creation"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::Genome;

    #[test]
    fn test_every_strategy_builds() {
        for strategy in [
            MutationStrategy::Point,
            MutationStrategy::ActiveNode,
            MutationStrategy::UntilActive,
            MutationStrategy::Probabilistic,
            MutationStrategy::CustomProbabilistic,
            MutationStrategy::SelfAdaptive,
            MutationStrategy::SinglePass,
        ] {
            let config = MutationConfig {
                strategy,
                ..MutationConfig::default()
            };
            let mutator = config.build_mutator().unwrap();
            assert_eq!(serde_json::to_value(strategy).unwrap(), serde_json::json!(mutator.name()));

            let manifest = config.to_manifest().unwrap();
            assert!(manifest.violations().is_empty(), "{:?}", manifest.violations());
        }
    }

    #[test]
    fn test_manifest_flags_rejected_values() {
        let config = MutationConfig {
            sigma: -1.0,
            category_probabilities: [0, 101, 0],
            ..MutationConfig::default()
        };
        assert_eq!(
            config.to_manifest().unwrap().violations(),
            vec![
                "mutation.category_probabilities = [0,101,0]".to_string(),
                "mutation.sigma = -1.0".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalid_values() {
        let config = MutationConfig {
            mutation_rate: 1.2,
            ..MutationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MutationConfig {
            category_probabilities: [0, 101, 0],
            ..MutationConfig::default()
        };
        assert!(config.build_mutator().is_err());

        let config = MutationConfig {
            validity_attempts: 0,
            ..MutationConfig::default()
        };
        assert!(config.build_validity_creator(|_: &Genome| true).is_err());
    }

    #[test]
    fn test_validity_creator_uses_attempt_budget() {
        let config = MutationConfig {
            validity_attempts: 7,
            ..MutationConfig::default()
        };
        let creator = config.build_validity_creator(|_: &Genome| true).unwrap();
        assert_eq!(creator.max_attempts(), 7);
        assert_eq!(
            MutationConfig::default().build_validity_creator(|_: &Genome| true).unwrap().max_attempts(),
            500
        );
    }
}
