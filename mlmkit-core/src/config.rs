//! Configuration for mlmkit.
//!
//! Uses `figment` for layered configuration: defaults -> user file -> workspace
//! file -> explicit file -> environment. Files live at
//! `~/.config/mlmkit/config.toml` and `<workspace>/.mlmkit/config.toml`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::LaunchError;

/// Top-level launcher configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default)]
    pub trainer: TrainerConfig,
}

/// How to start the external MLM trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Executable to spawn.
    #[serde(default = "default_program")]
    pub program: String,
    /// Script passed as the first argument. An empty path runs `program` directly.
    #[serde(default = "default_script")]
    pub script: Option<PathBuf>,
    /// Arguments inserted before the resolved hyperparameter flags.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Working directory of the trainer (inherits ours if not set).
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            script: default_script(),
            extra_args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_script() -> Option<PathBuf> {
    Some(PathBuf::from("run_pretraining.py"))
}

/// Workspace-relative location of the config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".mlmkit").join("config.toml")
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "mlmkit", "mlmkit")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `MLMKIT_`)
/// 2. Explicit config file (`--config`)
/// 3. Workspace-local config (`.mlmkit/config.toml`)
/// 4. User config (`~/.config/mlmkit/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<LaunchConfig, LaunchError> {
    let mut figment = Figment::from(Serialized::defaults(LaunchConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(LaunchError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    // MLMKIT_TRAINER__PROGRAM, MLMKIT_TRAINER__SCRIPT, ...
    figment = figment.merge(Env::prefixed("MLMKIT_").split("__"));

    Ok(figment.extract()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LaunchConfig::default();
        assert_eq!(config.trainer.program, "python3");
        assert_eq!(
            config.trainer.script,
            Some(PathBuf::from("run_pretraining.py"))
        );
        assert!(config.trainer.extra_args.is_empty());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = LaunchConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: LaunchConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: LaunchConfig = toml::from_str("[trainer]\nprogram = \"torchrun\"\n").unwrap();
        assert_eq!(parsed.trainer.program, "torchrun");
        assert_eq!(
            parsed.trainer.script,
            Some(PathBuf::from("run_pretraining.py"))
        );
    }

    #[test]
    fn test_empty_script_loads_as_empty_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainer.toml");
        std::fs::write(&path, "[trainer]\nprogram = \"my-trainer\"\nscript = \"\"\n").unwrap();

        let config = load_config(None, Some(path.as_path())).unwrap();
        assert_eq!(config.trainer.program, "my-trainer");
        assert_eq!(config.trainer.script, Some(PathBuf::new()));
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".mlmkit");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
[trainer]
program = "torchrun"
extra_args = ["--nproc_per_node", "8"]

[trainer.env]
CUDA_VISIBLE_DEVICES = "0,1,2,3,4,5,6,7"
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.trainer.program, "torchrun");
        assert_eq!(config.trainer.extra_args, vec!["--nproc_per_node", "8"]);
        assert_eq!(
            config.trainer.env.get("CUDA_VISIBLE_DEVICES").map(String::as_str),
            Some("0,1,2,3,4,5,6,7")
        );
    }

    #[test]
    fn test_explicit_file_overrides_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".mlmkit");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            "[trainer]\nprogram = \"torchrun\"\n",
        )
        .unwrap();
        let explicit = dir.path().join("cluster.toml");
        std::fs::write(&explicit, "[trainer]\nprogram = \"deepspeed\"\n").unwrap();

        let config = load_config(Some(dir.path()), Some(explicit.as_path())).unwrap();
        assert_eq!(config.trainer.program, "deepspeed");
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(None, Some(dir.path().join("absent.toml").as_path())).unwrap_err();
        assert!(matches!(err, LaunchError::Config(_)));
    }
}
