//! The sweep document read by the external sweep service.

use super::space::SweepSpace;
use crate::error::LaunchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

const REDACTED: &str = "********";

/// Root of a sweep YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepDocument {
    pub general: GeneralSection,
    #[serde(default)]
    pub fixed: FixedSection,
    pub sweep: SweepSection,
}

/// Run metadata shared by every trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSection {
    /// Tracking project the trials report into.
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Tracking service credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub output_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Pretrained checkpoint the classifier starts from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretrained_dir: Option<PathBuf>,
}

/// Settings held constant across trials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_epochs: Option<u32>,
    /// Evaluate every N optimizer steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_stopping: Option<EarlyStopping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swa: Option<SwaSchedule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopping {
    pub metric: String,
    /// Evaluations without improvement before stopping.
    pub patience: u32,
    #[serde(default)]
    pub goal: Goal,
}

/// Stochastic weight averaging schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwaSchedule {
    /// Epoch at which averaging starts.
    pub start_epoch: u32,
    pub lr: f64,
    #[serde(default = "default_anneal_epochs")]
    pub anneal_epochs: u32,
}

fn default_anneal_epochs() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    #[default]
    Maximize,
    Minimize,
}

impl Goal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maximize => "maximize",
            Self::Minimize => "minimize",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search strategy requested from the sweep service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Grid,
    Random,
    Bayes,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Random => "random",
            Self::Bayes => "bayes",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepMetric {
    pub name: String,
    #[serde(default)]
    pub goal: Goal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSection {
    pub method: SearchMethod,
    pub metric: SweepMetric,
    pub parameters: SweepSpace,
}

impl SweepDocument {
    pub fn from_yaml_str(text: &str) -> Result<Self, LaunchError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, LaunchError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, LaunchError> {
        let text = std::fs::read_to_string(path)?;
        let doc = Self::from_yaml_str(&text)?;
        debug!(
            path = %path.display(),
            parameters = doc.sweep.parameters.len(),
            "Loaded sweep document"
        );
        Ok(doc)
    }

    pub fn save(&self, path: &Path) -> Result<(), LaunchError> {
        let text = self.to_yaml_string()?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Semantic checks the YAML parser cannot express.
    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.general.project.trim().is_empty() {
            return Err(LaunchError::invalid_sweep("general.project is empty"));
        }
        if self.sweep.metric.name.trim().is_empty() {
            return Err(LaunchError::invalid_sweep("sweep.metric.name is empty"));
        }

        self.sweep.parameters.validate()?;

        if self.sweep.method == SearchMethod::Grid && self.sweep.parameters.grid_size().is_none() {
            return Err(LaunchError::invalid_sweep(
                "grid search needs enumerated values for every parameter",
            ));
        }

        if let Some(early) = &self.fixed.early_stopping {
            if early.patience == 0 {
                return Err(LaunchError::invalid_sweep(
                    "fixed.early_stopping.patience must be positive",
                ));
            }
        }

        if let Some(swa) = &self.fixed.swa {
            if !(swa.lr.is_finite() && swa.lr > 0.0) {
                return Err(LaunchError::invalid_sweep("fixed.swa.lr must be positive"));
            }
            if let Some(epochs) = self.fixed.num_epochs {
                if swa.start_epoch >= epochs {
                    return Err(LaunchError::invalid_sweep(format!(
                        "fixed.swa.start_epoch {} is outside the {epochs}-epoch budget",
                        swa.start_epoch
                    )));
                }
            }
        }

        Ok(())
    }

    /// Copy with credentials masked, for display.
    pub fn redacted(&self) -> Self {
        let mut doc = self.clone();
        if doc.general.api_key.is_some() {
            doc.general.api_key = Some(REDACTED.to_string());
        }
        doc
    }
}
