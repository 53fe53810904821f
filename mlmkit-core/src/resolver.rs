//! Run-configuration resolver: model name → profile → trainer passes.

use crate::error::LaunchError;
use crate::profile::{ModelName, ModelProfile};
use crate::trainer::Trainer;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Perturbation size of the adversarial pass.
pub const FGM_EPSILON: f64 = 0.4;

/// Which of the two trainer passes an invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingPass {
    /// Plain MLM pretraining.
    Base,
    /// Second pass with Fast Gradient Method perturbations.
    Fgm,
}

impl fmt::Display for TrainingPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::Fgm => f.write_str("fgm"),
        }
    }
}

/// One planned call of the external trainer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainerInvocation {
    pub pass: TrainingPass,
    pub profile: ModelProfile,
    /// Trainer flags, excluding program, script and configured extra args.
    pub args: Vec<String>,
}

impl TrainerInvocation {
    pub fn new(pass: TrainingPass, profile: ModelProfile) -> Self {
        let args = render_args(pass, &profile);
        Self {
            pass,
            profile,
            args,
        }
    }
}

// Learning rates use exponent notation so the trainer sees `1.5e-4`, not
// `0.00015`.
fn render_args(pass: TrainingPass, profile: &ModelProfile) -> Vec<String> {
    let mut args = vec![
        "--model_name".to_string(),
        profile.model_name.to_string(),
        "--model_type".to_string(),
        profile.model_type.to_string(),
        "--batch_size".to_string(),
        profile.batch_size.to_string(),
        "--gradient_accumulation_steps".to_string(),
        profile.gradient_accumulation_steps.to_string(),
        "--num_epochs".to_string(),
        profile.num_epochs.to_string(),
        "--learning_rate".to_string(),
        format!("{:e}", profile.learning_rate),
        "--min_learning_rate".to_string(),
        format!("{:e}", profile.min_learning_rate),
    ];
    if pass == TrainingPass::Fgm {
        args.push("--use_fgm".to_string());
        args.push("--fgm_epsilon".to_string());
        args.push(FGM_EPSILON.to_string());
    }
    args
}

/// Look up the profile for a model identifier.
///
/// Unknown identifiers are rejected instead of resolving to an empty profile.
pub fn resolve(model_name: &str) -> Result<ModelProfile, LaunchError> {
    let name: ModelName = model_name.parse()?;
    Ok(name.profile())
}

/// The trainer passes a profile requires, in execution order.
pub fn plan(profile: &ModelProfile) -> Vec<TrainerInvocation> {
    let mut passes = vec![TrainerInvocation::new(TrainingPass::Base, *profile)];
    if profile.train_fgm {
        passes.push(TrainerInvocation::new(TrainingPass::Fgm, *profile));
    }
    passes
}

/// Drives the planned passes through a [`Trainer`], one after another.
pub struct Launcher<T> {
    trainer: T,
}

impl<T: Trainer> Launcher<T> {
    pub fn new(trainer: T) -> Self {
        Self { trainer }
    }

    pub fn trainer(&self) -> &T {
        &self.trainer
    }

    /// Resolve `model_name` and run its passes.
    ///
    /// The first failing pass aborts the run; later passes never start.
    pub async fn resolve_and_run(&self, model_name: &str) -> Result<(), LaunchError> {
        let profile = resolve(model_name)?;
        self.run_profile(&profile).await
    }

    pub async fn run_profile(&self, profile: &ModelProfile) -> Result<(), LaunchError> {
        let passes = plan(profile);
        let total = passes.len();

        for (index, invocation) in passes.iter().enumerate() {
            info!(
                model = %profile.model_name,
                pass = %invocation.pass,
                step = index + 1,
                total,
                "Starting trainer pass"
            );
            if let Err(err) = self.trainer.train(invocation).await {
                let skipped = total - index - 1;
                warn!(
                    model = %profile.model_name,
                    pass = %invocation.pass,
                    skipped,
                    error = %err,
                    "Trainer pass failed, aborting run"
                );
                return Err(err);
            }
            info!(
                model = %profile.model_name,
                pass = %invocation.pass,
                "Trainer pass completed"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ModelType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_bert_base() {
        let profile = resolve("bert-base").unwrap();
        assert_eq!(
            profile,
            ModelProfile {
                model_name: ModelName::BertBase,
                model_type: ModelType::Bert,
                batch_size: 256,
                gradient_accumulation_steps: 2,
                num_epochs: 40,
                learning_rate: 1.5e-4,
                min_learning_rate: 4e-5,
                train_fgm: true,
            }
        );
    }

    #[test]
    fn test_resolve_unknown() {
        let err = resolve("roberta-large").unwrap_err();
        assert!(matches!(err, LaunchError::UnknownModel { ref name } if name == "roberta-large"));
    }

    #[test]
    fn test_base_args() {
        let inv = TrainerInvocation::new(TrainingPass::Base, ModelName::NezhaLarge.profile());
        assert_eq!(
            inv.args,
            vec![
                "--model_name",
                "nezha-large",
                "--model_type",
                "nezha",
                "--batch_size",
                "96",
                "--gradient_accumulation_steps",
                "6",
                "--num_epochs",
                "35",
                "--learning_rate",
                "1.2e-4",
                "--min_learning_rate",
                "4e-5",
            ]
        );
    }

    #[test]
    fn test_fgm_args_extend_base_args() {
        let profile = ModelName::MacbertBase.profile();
        let base = TrainerInvocation::new(TrainingPass::Base, profile);
        let fgm = TrainerInvocation::new(TrainingPass::Fgm, profile);

        assert_eq!(&fgm.args[..base.args.len()], &base.args[..]);
        assert_eq!(
            &fgm.args[base.args.len()..],
            &["--use_fgm", "--fgm_epsilon", "0.4"]
        );
    }

    #[test]
    fn test_plan_pass_counts() {
        for name in ModelName::ALL {
            let passes = plan(&name.profile());
            let expected = if name.profile().train_fgm { 2 } else { 1 };
            assert_eq!(passes.len(), expected, "{name}");
            assert_eq!(passes[0].pass, TrainingPass::Base);
        }
    }

    #[test]
    fn test_invocation_json() {
        let inv = TrainerInvocation::new(TrainingPass::Fgm, ModelName::BertBase.profile());
        let json = serde_json::to_value(&inv).unwrap();
        assert_eq!(json["pass"], "fgm");
        assert_eq!(json["profile"]["model_name"], "bert-base");
        assert_eq!(json["profile"]["model_type"], "bert");
        assert_eq!(json["args"].as_array().unwrap().len(), 17);
    }
}
