use crate::error::CgpError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One table of the TOML configuration (`[grid]`, `[mutation]`)
pub trait ConfigSection: Serialize + DeserializeOwned + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), CgpError>;

    /// Kind and description of every key of the section
    fn fields() -> Vec<FieldSpec>;

    /// Field listing with the default and the current value of each key
    fn to_manifest(&self) -> Result<ConfigManifest, CgpError> {
        let current = serde_json::to_value(self)?;
        let defaults = serde_json::to_value(Self::default())?;
        let fields = Self::fields()
            .into_iter()
            .map(|spec| FieldManifest {
                name: spec.name.to_string(),
                default: defaults.get(spec.name).cloned().unwrap_or(Value::Null),
                value: current.get(spec.name).cloned().unwrap_or(Value::Null),
                kind: spec.kind,
                description: spec.description.to_string(),
            })
            .collect();
        Ok(ConfigManifest {
            section: title(Self::section_name()),
            fields,
        })
    }
}

fn title(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Accepted values of a configuration key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Count { min: usize, max: Option<usize> },
    /// Closed interval `[0, 1]`
    Probability,
    /// Finite and strictly positive
    Positive,
    Flag,
    Choice { options: Vec<String> },
    /// Strictly increasing grid column indices
    Columns,
    Percentages { len: usize },
    Seed,
}

impl FieldKind {
    pub fn choice(options: &[&str]) -> Self {
        FieldKind::Choice {
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn admits(&self, value: &Value) -> bool {
        match self {
            FieldKind::Count { min, max } => value
                .as_u64()
                .map(|v| v as usize >= *min && max.map_or(true, |m| v as usize <= m))
                .unwrap_or(false),
            FieldKind::Probability => value.as_f64().map_or(false, |v| (0.0..=1.0).contains(&v)),
            FieldKind::Positive => value.as_f64().map_or(false, |v| v > 0.0 && v.is_finite()),
            FieldKind::Flag => value.is_boolean(),
            FieldKind::Choice { options } => value
                .as_str()
                .map_or(false, |v| options.iter().any(|o| o == v)),
            FieldKind::Columns => match value.as_array() {
                Some(items) => {
                    let columns: Option<Vec<u64>> = items.iter().map(Value::as_u64).collect();
                    columns.map_or(false, |c| c.windows(2).all(|w| w[0] < w[1]))
                }
                None => false,
            },
            FieldKind::Percentages { len } => value.as_array().map_or(false, |items| {
                items.len() == *len && items.iter().all(|p| p.as_u64().map_or(false, |p| p <= 100))
            }),
            FieldKind::Seed => value.as_u64().is_some(),
        }
    }
}

/// Static description of a key, see [`ConfigSection::fields`]
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self { name, kind, description }
    }
}

/// Field listing of a configuration section, for tooling and docs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigManifest {
    pub section: String,
    pub fields: Vec<FieldManifest>,
}

impl ConfigManifest {
    /// `section.key = value` for every current value its kind rejects
    pub fn violations(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| !f.kind.admits(&f.value))
            .map(|f| format!("{}.{} = {}", self.section.to_lowercase(), f.name, f.value))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldManifest {
    pub name: String,
    pub kind: FieldKind,
    pub default: Value,
    pub value: Value,
    pub description: String,
}
