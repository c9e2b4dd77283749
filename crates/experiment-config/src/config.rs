use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::schedule::{self, LrFactor, StepPlan, IMAGENET_TRAIN_SIZE};

/// Numeric precision tag for input data and model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    #[default]
    Float32,
    Float16,
    Bfloat16,
}

/// Dataset-specific overrides, passed through untouched to the input pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetConfigs(pub BTreeMap<String, serde_json::Value>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfigs {
    /// Momentum coefficient of the heavy-ball update.
    pub momentum: f64,
}

impl Default for OptimizerConfigs {
    fn default() -> Self {
        Self { momentum: 0.9 }
    }
}

/// Learning-rate schedule parameters, all but the schedule shape derived
/// from the batch size and epoch count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LrConfigs {
    pub learning_rate_schedule: String,
    /// `*`-separated product of [`LrFactor`] names.
    pub factors: String,
    pub warmup_steps: u64,
    pub steps_per_cycle: u64,
    pub base_learning_rate: f64,
}

impl LrConfigs {
    pub fn parsed_factors(&self) -> Result<Vec<LrFactor>> {
        schedule::parse_factors(&self.factors)
    }
}

/// Settings for one ResNet-on-ImageNet training run.
///
/// Field names are the contract with the trainer that consumes this record and
/// are preserved verbatim in the YAML/JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Human-readable run identifier.
    pub experiment_name: String,

    // Dataset.
    /// Dataset selector for the input pipeline.
    pub dataset_name: String,
    /// Precision of the decoded input images.
    pub data_dtype_str: DType,
    #[serde(default)]
    pub dataset_configs: DatasetConfigs,

    // Model.
    /// Model architecture selector.
    pub model_name: String,
    /// Base channel width of the first stage.
    pub num_filters: u32,
    /// Network depth, e.g. 50 for ResNet-50.
    pub num_layers: u32,
    /// Precision of the model parameters and activations.
    pub model_dtype_str: DType,

    // Training.
    /// Training loop selector.
    pub trainer_name: String,
    /// Optimizer algorithm selector.
    pub optimizer: String,
    pub optimizer_configs: OptimizerConfigs,
    /// L2 weight-decay coefficient.
    pub l2_decay_factor: f64,
    /// Global-norm gradient clipping threshold. `None` disables clipping.
    pub max_grad_norm: Option<f64>,
    /// `None` trains on hard labels.
    pub label_smoothing: Option<f64>,
    pub num_training_epochs: u64,
    /// Samples per training step, summed over all devices.
    pub batch_size: u64,
    pub rng_seed: u64,
    /// Initial bias of the classifier head, so early logits start near uniform.
    pub init_head_bias: f64,

    // Learning rate.
    pub lr_configs: LrConfigs,

    // Logging.
    /// Write TensorBoard and/or experiment-tracker summaries.
    pub write_summary: bool,
    /// Write experiment-tracker measurements.
    pub write_xm_measurements: bool,
    /// Profile the run.
    pub xprof: bool,
    /// Save checkpoints every `checkpoint_steps`.
    pub checkpoint: bool,
    /// Steps between two checkpoints (ten epochs).
    pub checkpoint_steps: u64,
    /// Debug mode during training.
    pub debug_train: bool,
    /// Debug mode during evaluation.
    pub debug_eval: bool,
}

impl ExperimentConfig {
    /// Recomputes the derived values from this config's batch size and epochs.
    pub fn step_plan(&self) -> Result<StepPlan> {
        StepPlan::derive(IMAGENET_TRAIN_SIZE, self.batch_size, self.num_training_epochs)
    }

    /// Name of the first float field holding NaN or an infinity.
    ///
    /// JSON has no representation for these, so such configs cannot pass
    /// through JSON without the value turning into `null`.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        let fields = [
            ("optimizer_configs.momentum", Some(self.optimizer_configs.momentum)),
            ("l2_decay_factor", Some(self.l2_decay_factor)),
            ("max_grad_norm", self.max_grad_norm),
            ("label_smoothing", self.label_smoothing),
            ("init_head_bias", Some(self.init_head_bias)),
            ("lr_configs.base_learning_rate", Some(self.lr_configs.base_learning_rate)),
        ];
        fields
            .into_iter()
            .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
            .map(|(field, _)| field)
    }

    /// Checks that every stored derived field matches what [`Self::step_plan`] yields.
    ///
    /// Literal overrides of `batch_size` or `num_training_epochs` leave the
    /// derived fields stale; this is how such configs are caught.
    pub fn check_derived(&self) -> Result<()> {
        let plan = self.step_plan()?;

        check_steps("lr_configs.warmup_steps", plan.warmup_steps, self.lr_configs.warmup_steps)?;
        check_steps(
            "lr_configs.steps_per_cycle",
            plan.steps_per_cycle,
            self.lr_configs.steps_per_cycle,
        )?;
        check_steps("checkpoint_steps", plan.checkpoint_steps, self.checkpoint_steps)?;

        let expected = plan.base_learning_rate;
        let actual = self.lr_configs.base_learning_rate;
        if (expected - actual).abs() > 1e-12 * expected.abs().max(1.0) {
            return Err(ConfigError::Derived {
                field: "lr_configs.base_learning_rate",
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}

fn check_steps(field: &'static str, expected: u64, actual: u64) -> Result<()> {
    if expected != actual {
        return Err(ConfigError::Derived {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}
