//! External trainer process management.
//!
//! The MLM trainer is a separate program (normally a Python script). This
//! module owns the subprocess contract: build the command line, set the
//! environment, wait for exit and map the status into [`LaunchError`].

use crate::config::TrainerConfig;
use crate::error::LaunchError;
use crate::resolver::TrainerInvocation;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Environment flag enabling parallel tokenization in the trainer.
pub const TOKENIZERS_PARALLELISM: &str = "TOKENIZERS_PARALLELISM";

/// Runs one trainer pass to completion.
#[async_trait]
pub trait Trainer: Send + Sync {
    async fn train(&self, invocation: &TrainerInvocation) -> Result<(), LaunchError>;
}

/// Trainer backed by a child process.
pub struct ProcessTrainer {
    program: String,
    script: Option<PathBuf>,
    extra_args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl ProcessTrainer {
    pub fn new(program: impl Into<String>) -> Self {
        let mut env = BTreeMap::new();
        env.insert(TOKENIZERS_PARALLELISM.to_string(), "true".to_string());
        Self {
            program: program.into(),
            script: None,
            extra_args: Vec::new(),
            working_dir: None,
            env,
        }
    }

    /// Build from the `[trainer]` configuration section.
    ///
    /// An empty `script` is treated as absent. `TOKENIZERS_PARALLELISM` stays
    /// `true` whatever `env` says.
    pub fn from_config(config: &TrainerConfig) -> Self {
        let mut trainer = Self::new(config.program.clone());
        trainer.script = config
            .script
            .clone()
            .filter(|script| !script.as_os_str().is_empty());
        trainer.extra_args = config.extra_args.clone();
        trainer.working_dir = config.working_dir.clone();
        trainer.env.extend(config.env.clone());
        trainer
            .env
            .insert(TOKENIZERS_PARALLELISM.to_string(), "true".to_string());
        trainer
    }

    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Full argument vector passed after the program name.
    pub fn command_args(&self, invocation: &TrainerInvocation) -> Vec<String> {
        let mut args = Vec::with_capacity(invocation.args.len() + self.extra_args.len() + 1);
        if let Some(script) = &self.script {
            args.push(script.display().to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args.extend(invocation.args.iter().cloned());
        args
    }

    /// Shell-style rendering of the command, environment included.
    pub fn command_line(&self, invocation: &TrainerInvocation) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(key, value)| format!("{key}={}", shell_quote(value)))
            .collect();
        parts.push(shell_quote(&self.program));
        parts.extend(self.command_args(invocation).iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }
}

#[async_trait]
impl Trainer for ProcessTrainer {
    async fn train(&self, invocation: &TrainerInvocation) -> Result<(), LaunchError> {
        debug!(command = %self.command_line(invocation), "Spawning trainer");

        let mut command = Command::new(&self.program);
        command
            .args(self.command_args(invocation))
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let status = command
            .status()
            .await
            .map_err(|source| LaunchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        info!(pass = %invocation.pass, status = %status, "Trainer exited");

        if status.success() {
            Ok(())
        } else {
            Err(LaunchError::TrainerExit {
                pass: invocation.pass,
                code: status.code(),
            })
        }
    }
}

fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:+,@".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
