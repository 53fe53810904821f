//! Hyperparameter search space of a sweep document.

use crate::error::LaunchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single candidate value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Numeric view (ints widen to float).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    // Numeric values compare by value so a sampled `32.0` matches `32`.
    fn matches(&self, other: &ParamValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) if *v != 0.0 && v.abs() < 1e-3 => write!(f, "{v:e}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// Sampling distribution of a continuous range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    Uniform,
    LogUniformValues,
    IntUniform,
}

impl Distribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::LogUniformValues => "log_uniform_values",
            Self::IntUniform => "int_uniform",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    /// Enumerated candidates.
    Values { values: Vec<ParamValue> },
    /// Continuous `[min, max]` range.
    Range {
        min: f64,
        max: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distribution: Option<Distribution>,
    },
    /// A single value held constant across trials.
    Fixed { value: ParamValue },
}

impl ParamSpec {
    pub fn values(values: impl IntoIterator<Item = ParamValue>) -> Self {
        Self::Values {
            values: values.into_iter().collect(),
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self::Range {
            min,
            max,
            distribution: None,
        }
    }

    pub fn log_range(min: f64, max: f64) -> Self {
        Self::Range {
            min,
            max,
            distribution: Some(Distribution::LogUniformValues),
        }
    }

    fn validate(&self, name: &str) -> Result<(), LaunchError> {
        match self {
            Self::Values { values } if values.is_empty() => Err(LaunchError::invalid_sweep(
                format!("parameter '{name}' has an empty value set"),
            )),
            Self::Values { .. } | Self::Fixed { .. } => Ok(()),
            Self::Range {
                min,
                max,
                distribution,
            } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err(LaunchError::invalid_sweep(format!(
                        "parameter '{name}' has a non-finite bound"
                    )));
                }
                if min > max {
                    return Err(LaunchError::invalid_sweep(format!(
                        "parameter '{name}' has min {min} greater than max {max}"
                    )));
                }
                match distribution {
                    Some(Distribution::LogUniformValues) if *min <= 0.0 => {
                        Err(LaunchError::invalid_sweep(format!(
                            "parameter '{name}' uses a log distribution with non-positive min {min}"
                        )))
                    }
                    Some(Distribution::IntUniform) if min.fract() != 0.0 || max.fract() != 0.0 => {
                        Err(LaunchError::invalid_sweep(format!(
                            "parameter '{name}' uses int_uniform with fractional bounds"
                        )))
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    /// Whether `value` lies in this domain.
    pub fn contains(&self, value: &ParamValue) -> bool {
        match self {
            Self::Values { values } => values.iter().any(|v| v.matches(value)),
            Self::Fixed { value: fixed } => fixed.matches(value),
            Self::Range {
                min,
                max,
                distribution,
            } => match value.as_f64() {
                Some(v) if v >= *min && v <= *max => {
                    distribution != &Some(Distribution::IntUniform) || v.fract() == 0.0
                }
                _ => false,
            },
        }
    }

    /// Number of distinct candidates, or `None` for continuous ranges.
    pub fn cardinality(&self) -> Option<u64> {
        match self {
            Self::Values { values } => Some(values.len() as u64),
            Self::Fixed { .. } => Some(1),
            Self::Range { .. } => None,
        }
    }
}

/// Parameter name → domain, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SweepSpace {
    params: BTreeMap<String, ParamSpec>,
}

/// A sampled parameter set, as the sweep service hands it to a trial.
pub type Assignment = BTreeMap<String, ParamValue>;

impl SweepSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: ParamSpec) {
        self.params.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.get(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamSpec)> {
        self.params.iter()
    }

    /// Check every parameter's domain.
    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.params.is_empty() {
            return Err(LaunchError::invalid_sweep("search space is empty"));
        }
        for (name, spec) in &self.params {
            spec.validate(name)?;
        }
        Ok(())
    }

    /// Size of the full grid, or `None` when any parameter is continuous.
    pub fn grid_size(&self) -> Option<u64> {
        self.params
            .values()
            .try_fold(1u64, |acc, spec| Some(acc.saturating_mul(spec.cardinality()?)))
    }

    /// Confirm a sampled set covers exactly this space and stays in bounds.
    pub fn check_assignment(&self, assignment: &Assignment) -> Result<(), LaunchError> {
        if let Some(name) = assignment.keys().find(|k| !self.params.contains_key(*k)) {
            return Err(LaunchError::invalid_sweep(format!(
                "assignment names unknown parameter '{name}'"
            )));
        }
        for (name, spec) in &self.params {
            match assignment.get(name) {
                Some(value) if spec.contains(value) => {}
                Some(value) => {
                    return Err(LaunchError::invalid_sweep(format!(
                        "value {value} for '{name}' is outside its domain"
                    )));
                }
                None => {
                    return Err(LaunchError::invalid_sweep(format!(
                        "assignment is missing parameter '{name}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Trainer flags for a sampled set, `--name=value` in name order.
    pub fn trial_args(&self, assignment: &Assignment) -> Result<Vec<String>, LaunchError> {
        self.check_assignment(assignment)?;
        Ok(assignment
            .iter()
            .map(|(name, value)| format!("--{name}={value}"))
            .collect())
    }
}
