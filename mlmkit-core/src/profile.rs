//! Model profiles: the fixed hyperparameter bundle for each pretraining model.

use crate::error::LaunchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Architecture family understood by the trainer's `--model_type` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Bert,
    Nezha,
}

impl ModelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bert => "bert",
            Self::Nezha => "nezha",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six model identifiers the launcher accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelName {
    #[serde(rename = "bert-base")]
    BertBase,
    #[serde(rename = "nezha-base")]
    NezhaBase,
    #[serde(rename = "macbert-base")]
    MacbertBase,
    #[serde(rename = "bert-large")]
    BertLarge,
    #[serde(rename = "nezha-large")]
    NezhaLarge,
    #[serde(rename = "macbert-large")]
    MacbertLarge,
}

impl ModelName {
    pub const ALL: [ModelName; 6] = [
        Self::BertBase,
        Self::NezhaBase,
        Self::MacbertBase,
        Self::BertLarge,
        Self::NezhaLarge,
        Self::MacbertLarge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BertBase => "bert-base",
            Self::NezhaBase => "nezha-base",
            Self::MacbertBase => "macbert-base",
            Self::BertLarge => "bert-large",
            Self::NezhaLarge => "nezha-large",
            Self::MacbertLarge => "macbert-large",
        }
    }

    /// Accepted identifiers, in table order.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|name| name.as_str()).collect()
    }

    /// The profile for this model.
    pub const fn profile(self) -> ModelProfile {
        match self {
            Self::BertBase => BASE.with(self, ModelType::Bert, 40),
            Self::NezhaBase => BASE.with(self, ModelType::Nezha, 35),
            Self::MacbertBase => BASE.with(self, ModelType::Bert, 40),
            Self::BertLarge => LARGE.with(self, ModelType::Bert, 35),
            Self::NezhaLarge => LARGE.with(self, ModelType::Nezha, 35),
            Self::MacbertLarge => LARGE.with(self, ModelType::Bert, 35),
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| LaunchError::unknown_model(s))
    }
}

/// Resolved hyperparameters for one pretraining run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub model_name: ModelName,
    pub model_type: ModelType,
    pub batch_size: u32,
    pub gradient_accumulation_steps: u32,
    pub num_epochs: u32,
    pub learning_rate: f64,
    pub min_learning_rate: f64,
    /// Whether an adversarial FGM pass follows the base pass.
    pub train_fgm: bool,
}

impl ModelProfile {
    const fn with(self, model_name: ModelName, model_type: ModelType, num_epochs: u32) -> Self {
        Self {
            model_name,
            model_type,
            num_epochs,
            ..self
        }
    }

    /// Samples consumed per optimizer step.
    pub fn effective_batch_size(&self) -> u32 {
        self.batch_size * self.gradient_accumulation_steps
    }
}

// Shared settings of the base- and large-sized models. Name, type and epoch
// count are filled in per model.
const BASE: ModelProfile = ModelProfile {
    model_name: ModelName::BertBase,
    model_type: ModelType::Bert,
    batch_size: 256,
    gradient_accumulation_steps: 2,
    num_epochs: 40,
    learning_rate: 1.5e-4,
    min_learning_rate: 4e-5,
    train_fgm: true,
};

const LARGE: ModelProfile = ModelProfile {
    model_name: ModelName::BertLarge,
    model_type: ModelType::Bert,
    batch_size: 96,
    gradient_accumulation_steps: 6,
    num_epochs: 35,
    learning_rate: 1.2e-4,
    min_learning_rate: 4e-5,
    train_fgm: false,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_names() {
        for name in ModelName::ALL {
            let parsed: ModelName = name.as_str().parse().unwrap();
            assert_eq!(parsed, name);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("BERT-BASE".parse::<ModelName>().is_err());
        assert!(" bert-base".parse::<ModelName>().is_err());
        assert!("".parse::<ModelName>().is_err());
    }

    #[test]
    fn test_profile_carries_its_name() {
        for name in ModelName::ALL {
            assert_eq!(name.profile().model_name, name);
        }
    }

    #[test]
    fn test_fgm_only_for_base_models() {
        let with_fgm: Vec<_> = ModelName::ALL
            .into_iter()
            .filter(|n| n.profile().train_fgm)
            .map(|n| n.as_str())
            .collect();
        assert_eq!(with_fgm, vec!["bert-base", "nezha-base", "macbert-base"]);
    }

    #[test]
    fn test_effective_batch_size() {
        assert_eq!(ModelName::BertBase.profile().effective_batch_size(), 512);
        assert_eq!(ModelName::NezhaLarge.profile().effective_batch_size(), 576);
    }

    #[test]
    fn test_model_name_serde() {
        let json = serde_json::to_string(&ModelName::MacbertLarge).unwrap();
        assert_eq!(json, "\"macbert-large\"");
        let parsed: ModelType = serde_json::from_str("\"nezha\"").unwrap();
        assert_eq!(parsed, ModelType::Nezha);
    }
}
