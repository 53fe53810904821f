//! Error types for the mlmkit-core crate.

use crate::profile::ModelName;
use crate::resolver::TrainingPass;
use thiserror::Error;

/// Top-level error type for launch and sweep operations.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("unknown model identifier '{name}' (expected one of: {})", ModelName::names().join(", "))]
    UnknownModel { name: String },

    #[error("failed to spawn trainer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("trainer {pass} pass failed ({})", exit_description(.code))]
    TrainerExit {
        pass: TrainingPass,
        code: Option<i32>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid sweep document: {0}")]
    InvalidSweep(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl LaunchError {
    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self::UnknownModel { name: name.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_sweep(msg: impl Into<String>) -> Self {
        Self::InvalidSweep(msg.into())
    }

    /// Process exit code the CLI should propagate for this error.
    ///
    /// A trainer that exited with a code hands that code through; a trainer
    /// killed by a signal and every other failure map to `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TrainerExit {
                code: Some(code), ..
            } => *code,
            _ => 1,
        }
    }
}

impl From<figment::Error> for LaunchError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_lists_accepted_names() {
        let err = LaunchError::unknown_model("roberta-base");
        let msg = err.to_string();
        assert!(msg.contains("unknown model identifier 'roberta-base'"));
        assert!(msg.contains("bert-base"));
        assert!(msg.contains("macbert-large"));
    }

    #[test]
    fn test_exit_code_passthrough() {
        let err = LaunchError::TrainerExit {
            pass: TrainingPass::Fgm,
            code: Some(3),
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "trainer fgm pass failed (exit code 3)");
    }

    #[test]
    fn test_signal_exit_maps_to_one() {
        let err = LaunchError::TrainerExit {
            pass: TrainingPass::Base,
            code: None,
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("terminated by signal"));
        assert_eq!(LaunchError::config("bad").exit_code(), 1);
    }
}
