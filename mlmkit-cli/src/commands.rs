//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::SweepAction;
use mlmkit_core::sweep::{ParamSpec, SweepDocument};
use mlmkit_core::{
    LaunchError, Launcher, ModelName, ProcessTrainer, TrainerInvocation, load_config, plan,
    resolve,
};
use std::path::Path;

/// Resolve `model_name` and run (or print) its trainer passes.
pub async fn run_model(
    model_name: &str,
    workspace: &Path,
    config_path: Option<&Path>,
    dry_run: bool,
    json: bool,
) -> Result<(), LaunchError> {
    let profile = resolve(model_name)?;
    let config = load_config(Some(workspace), config_path)?;
    let trainer = ProcessTrainer::from_config(&config.trainer);

    if dry_run {
        print!("{}", render_plan(&trainer, &plan(&profile), json)?);
        return Ok(());
    }

    Launcher::new(trainer).run_profile(&profile).await
}

/// Dry-run output: a `# <pass> pass` header and shell line per pass, or the
/// plan as pretty JSON.
fn render_plan(
    trainer: &ProcessTrainer,
    passes: &[TrainerInvocation],
    json: bool,
) -> Result<String, LaunchError> {
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(passes)?));
    }
    let mut out = String::new();
    for invocation in passes {
        out.push_str(&format!("# {} pass\n", invocation.pass));
        out.push_str(&trainer.command_line(invocation));
        out.push('\n');
    }
    Ok(out)
}

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Profiles { json } => handle_profiles(json),
        Commands::Sweep { action } => handle_sweep(action),
        Commands::Config { action } => handle_config(action, workspace, config_path),
    }
}

fn handle_profiles(json: bool) -> anyhow::Result<()> {
    let profiles: Vec<_> = ModelName::ALL.iter().map(|name| name.profile()).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    println!(
        "{:<14} {:<6} {:>6} {:>10} {:>9} {:>7} {:>8} {:>8} {:>4}",
        "model", "type", "batch", "grad_accum", "eff_batch", "epochs", "lr", "min_lr", "fgm"
    );
    for p in &profiles {
        println!(
            "{:<14} {:<6} {:>6} {:>10} {:>9} {:>7} {:>8} {:>8} {:>4}",
            p.model_name.as_str(),
            p.model_type.as_str(),
            p.batch_size,
            p.gradient_accumulation_steps,
            p.effective_batch_size(),
            p.num_epochs,
            format!("{:e}", p.learning_rate),
            format!("{:e}", p.min_learning_rate),
            if p.train_fgm { "yes" } else { "no" }
        );
    }
    Ok(())
}

fn handle_sweep(action: SweepAction) -> anyhow::Result<()> {
    match action {
        SweepAction::Validate { path } => {
            let doc = SweepDocument::load(&path)?;
            doc.validate()?;
            println!(
                "{}: ok ({} parameters)",
                path.display(),
                doc.sweep.parameters.len()
            );
            Ok(())
        }
        SweepAction::Show { path, yaml } => {
            let doc = SweepDocument::load(&path)?.redacted();
            if yaml {
                print!("{}", doc.to_yaml_string()?);
                return Ok(());
            }
            print_sweep_summary(&doc);
            if let Err(e) = doc.validate() {
                println!("\n  Warning: {e}");
            }
            Ok(())
        }
    }
}

fn print_sweep_summary(doc: &SweepDocument) {
    println!("Project:   {}", doc.general.project);
    if let Some(entity) = &doc.general.entity {
        println!("Entity:    {entity}");
    }
    println!("Data:      {}", doc.general.data_dir.display());
    println!("Output:    {}", doc.general.output_dir.display());
    println!(
        "Method:    {} ({} {})",
        doc.sweep.method, doc.sweep.metric.goal, doc.sweep.metric.name
    );
    match doc.sweep.parameters.grid_size() {
        Some(size) => println!("Grid size: {size}"),
        None => println!("Grid size: continuous"),
    }
    println!("\nParameters:");
    for (name, spec) in doc.sweep.parameters.iter() {
        let domain = match spec {
            ParamSpec::Values { values } => {
                let shown: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                format!("one of [{}]", shown.join(", "))
            }
            ParamSpec::Range {
                min,
                max,
                distribution,
            } => match distribution {
                Some(d) => format!("[{min:e}, {max:e}] {d}"),
                None => format!("[{min:e}, {max:e}]"),
            },
            ParamSpec::Fixed { value } => format!("= {value}"),
        };
        println!("  {name:<26} {domain}");
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = mlmkit_core::config::workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let default_config = mlmkit_core::LaunchConfig::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), config_path)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
