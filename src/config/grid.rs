use super::traits::{ConfigSection, FieldKind, FieldSpec};
use crate::engines::generation::configuration::{Configuration, GridGeometry};
use crate::engines::placement::PlacementMap;
use crate::error::CgpError;
use crate::types::{GenomeLayout, SearchSpace};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows: usize,
    pub columns: usize,
    pub levels_back: usize,
    pub input_count: usize,
    pub parameter_count: usize,
    pub program_input_count: usize,
    pub outputs_count: usize,
    pub layout: GenomeLayout,
    pub search_space: SearchSpace,
    pub step_size_metadata: bool,
    pub self_adaptive: bool,
    pub crossover_columns: Vec<usize>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 3,
            columns: 10,
            levels_back: 1,
            input_count: 2,
            parameter_count: 4,
            program_input_count: 1,
            outputs_count: 1,
            layout: GenomeLayout::Linear,
            search_space: SearchSpace::Full,
            step_size_metadata: false,
            self_adaptive: false,
            crossover_columns: Vec::new(),
        }
    }
}

impl GridConfig {
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry {
            rows: self.rows,
            columns: self.columns,
            levels_back: self.levels_back,
            input_count: self.input_count,
            parameter_count: self.parameter_count,
            program_input_count: self.program_input_count,
            outputs_count: self.outputs_count,
        }
    }

    /// Engine configuration for this section and the given placement map
    pub fn build(&self, placement: PlacementMap) -> Result<Configuration, CgpError> {
        self.validate()?;
        Configuration::builder(self.geometry())
            .layout(self.layout)
            .search_space(self.search_space)
            .step_size_metadata(self.step_size_metadata)
            .self_adaptive(self.self_adaptive)
            .crossover_columns(self.crossover_columns.clone())
            .placement_map(placement)
            .build()
    }
}

impl ConfigSection for GridConfig {
    fn section_name() -> &'static str {
        "grid"
    }

    fn validate(&self) -> Result<(), CgpError> {
        if self.levels_back < 1 {
            return Err(CgpError::Configuration(
                "levels_back must be at least 1".to_string()
            ));
        }
        if self.outputs_count < 1 {
            return Err(CgpError::Configuration(
                "outputs_count must be at least 1".to_string()
            ));
        }
        if self.rows < 1 || self.columns < 1 {
            return Err(CgpError::Configuration(
                "Grid needs at least one row and one column".to_string()
            ));
        }
        if self.program_input_count < 1 {
            return Err(CgpError::Configuration(
                "program_input_count must be at least 1".to_string()
            ));
        }
        if self.crossover_columns.windows(2).any(|w| w[0] >= w[1])
            || self.crossover_columns.iter().any(|&c| c == 0 || c >= self.columns)
        {
            return Err(CgpError::Configuration(
                "crossover_columns must be strictly increasing and inside the grid".to_string()
            ));
        }
        Ok(())
    }

    fn fields() -> Vec<FieldSpec> {
        let count = |min| FieldKind::Count { min, max: None };
        vec![
            FieldSpec::new("rows", count(1), "Nodes per column (linear layout)"),
            FieldSpec::new("columns", count(1), "Columns in the grid"),
            FieldSpec::new("levels_back", count(1), "Connectivity window"),
            FieldSpec::new("input_count", count(0), "Input genes per node"),
            FieldSpec::new("parameter_count", count(0), "Parameter genes per node"),
            FieldSpec::new("program_input_count", count(1), "External program inputs"),
            FieldSpec::new("outputs_count", count(1), "Output genes"),
            FieldSpec::new("layout", FieldKind::choice(&["linear", "columnar"]), "Genome layout"),
            FieldSpec::new("search_space", FieldKind::choice(&["full", "parameters_only"]), "Genes open to mutation"),
            FieldSpec::new("step_size_metadata", FieldKind::Flag, "Store parameter kind markers per node"),
            FieldSpec::new("self_adaptive", FieldKind::Flag, "Carry a mutation step size in every genome"),
            FieldSpec::new("crossover_columns", FieldKind::Columns, "Columns where recombination switches parent"),
        ]
    }
}
