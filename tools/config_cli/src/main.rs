use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;

use experiment_config::io::{self, Format};
use experiment_config::{ConfigBuilder, ExperimentConfig, StepPlan, IMAGENET_TRAIN_SIZE};

#[derive(Parser)]
#[command(author, version, about = "Inspect and export the ImageNet ResNet experiment config", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configuration
    Show {
        #[command(flatten)]
        build: BuildArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
    /// Print the step schedule derived from batch size and epochs
    Derive {
        #[arg(long, default_value_t = 8192)]
        batch_size: u64,

        #[arg(long, default_value_t = 90)]
        epochs: u64,

        /// Number of training examples
        #[arg(long, default_value_t = IMAGENET_TRAIN_SIZE)]
        train_size: u64,

        /// Print the schedule as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a config file for out-of-range and stale derived values
    Validate {
        /// Path to a .yaml, .yml or .json config
        path: PathBuf,
    },
    /// Write the configuration to a .yaml, .yml or .json file
    Export {
        /// Destination file
        path: PathBuf,

        #[command(flatten)]
        build: BuildArgs,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Samples per training step; the schedule is re-derived from it
    #[arg(long)]
    batch_size: Option<u64>,

    /// Training duration; the schedule is re-derived from it
    #[arg(long)]
    epochs: Option<u64>,

    /// Literal override, e.g. `optimizer_configs.momentum=0.95` (repeatable)
    #[arg(long = "set", value_name = "PATH=VALUE")]
    overrides: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Yaml => Format::Yaml,
            OutputFormat::Json => Format::Json,
        }
    }
}

fn build_config(args: &BuildArgs) -> Result<ExperimentConfig> {
    let mut builder = ConfigBuilder::new();
    if let Some(batch_size) = args.batch_size {
        builder = builder.batch_size(batch_size);
    }
    if let Some(epochs) = args.epochs {
        builder = builder.num_training_epochs(epochs);
    }
    let config = builder.build().context("Failed to build config")?;

    if args.overrides.is_empty() {
        return Ok(config);
    }
    let config = config
        .with_overrides(args.overrides.as_slice())
        .context("Failed to apply overrides")?;
    if let Err(e) = config.check_derived() {
        warn!("{e}; use --batch-size/--epochs to re-derive the schedule");
    }
    Ok(config)
}

fn print_plan(plan: &StepPlan) {
    println!("steps_per_epoch:    {}", plan.steps_per_epoch);
    println!("total_steps:        {}", plan.total_steps);
    println!("warmup_steps:       {}", plan.warmup_steps);
    println!("steps_per_cycle:    {}", plan.steps_per_cycle);
    println!("checkpoint_steps:   {}", plan.checkpoint_steps);
    println!("base_learning_rate: {}", plan.base_learning_rate);
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Show { build, format } => {
            let config = build_config(&build)?;
            print!("{}", io::to_string(&config, format.into())?);
        }
        Commands::Derive {
            batch_size,
            epochs,
            train_size,
            json,
        } => {
            let plan = StepPlan::derive(train_size, batch_size, epochs)
                .context("Failed to derive schedule")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
        }
        Commands::Validate { path } => {
            let config = io::load(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            config.validate().context("Invalid config")?;
            config.check_derived().context("Stale derived values")?;
            println!("{}: ok", path.display());
        }
        Commands::Export { path, build } => {
            let config = build_config(&build)?;
            if let Err(e) = config.validate() {
                bail!("Refusing to export invalid config: {e}");
            }
            io::save(&config, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Exported {}", config.experiment_name);
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_show_defaults() {
        match parse(&["experiment-config", "show"]).command {
            Commands::Show { build, format } => {
                assert!(matches!(format, OutputFormat::Yaml));
                let config = build_config(&build).unwrap();
                assert_eq!(config, experiment_config::get_config().unwrap());
            }
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn test_show_with_batch_size_and_overrides() {
        let cli = parse(&[
            "experiment-config",
            "show",
            "--batch-size",
            "4096",
            "--set",
            "label_smoothing=0.1",
            "--set",
            "rng_seed=3",
            "--format",
            "json",
        ]);
        match cli.command {
            Commands::Show { build, format } => {
                assert!(matches!(format, OutputFormat::Json));
                let config = build_config(&build).unwrap();
                assert_eq!(config.batch_size, 4096);
                assert_eq!(config.checkpoint_steps, 3120);
                assert_eq!(config.label_smoothing, Some(0.1));
                assert_eq!(config.rng_seed, 3);
            }
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn test_zero_batch_size_fails() {
        let build = BuildArgs {
            batch_size: Some(0),
            epochs: None,
            overrides: Vec::new(),
        };
        assert!(build_config(&build).is_err());
    }

    #[test]
    fn test_derive_defaults() {
        match parse(&["experiment-config", "derive"]).command {
            Commands::Derive {
                batch_size,
                epochs,
                train_size,
                json,
            } => {
                assert_eq!((batch_size, epochs, train_size), (8192, 90, IMAGENET_TRAIN_SIZE));
                assert!(!json);
            }
            _ => panic!("expected derive"),
        }
    }

    #[test]
    fn test_derive_json_output() {
        let cli = parse(&["experiment-config", "derive", "--batch-size", "1024", "--json"]);
        match cli.command {
            Commands::Derive {
                batch_size,
                epochs,
                train_size,
                json,
            } => {
                assert!(json);
                let plan = StepPlan::derive(train_size, batch_size, epochs).unwrap();
                let value = serde_json::to_value(plan).unwrap();
                assert_eq!(value["steps_per_epoch"], serde_json::json!(1251));
                assert_eq!(value["base_learning_rate"], serde_json::json!(0.4));
            }
            _ => panic!("expected derive"),
        }
    }

    #[test]
    fn test_non_finite_override_fails() {
        let build = BuildArgs {
            batch_size: None,
            epochs: None,
            overrides: vec!["max_grad_norm=.inf".to_string()],
        };
        assert!(build_config(&build).is_err());
    }

    #[test]
    fn test_validate_requires_path() {
        assert!(Cli::try_parse_from(["experiment-config", "validate"]).is_err());
    }
}
