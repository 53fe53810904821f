//! # mlmkit-core: MLM pretraining launcher and sweep configuration
//!
//! Resolves a model identifier into its fixed pretraining hyperparameters and
//! drives the external trainer through a base pass and, for base-sized
//! models, an adversarial FGM pass. Also parses and validates the sweep
//! document consumed by the external sweep service.

pub mod config;
pub mod error;
pub mod profile;
pub mod resolver;
pub mod sweep;
pub mod trainer;

// Re-exports
pub use config::{LaunchConfig, TrainerConfig, load_config};
pub use error::LaunchError;
pub use profile::{ModelName, ModelProfile, ModelType};
pub use resolver::{FGM_EPSILON, Launcher, TrainerInvocation, TrainingPass, plan, resolve};
pub use sweep::{SweepDocument, SweepSpace};
pub use trainer::{ProcessTrainer, Trainer};
