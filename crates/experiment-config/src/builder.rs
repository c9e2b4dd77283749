use crate::config::{DType, DatasetConfigs, ExperimentConfig, LrConfigs, OptimizerConfigs};
use crate::error::Result;
use crate::schedule::{StepPlan, IMAGENET_TRAIN_SIZE};

pub const DEFAULT_BATCH_SIZE: u64 = 8192;
pub const DEFAULT_NUM_TRAINING_EPOCHS: u64 = 90;

/// Primitive inputs the derived schedule values depend on.
///
/// Everything else in the resulting [`ExperimentConfig`] is a literal default
/// and can be changed on the returned value directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigBuilder {
    batch_size: u64,
    num_training_epochs: u64,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            num_training_epochs: DEFAULT_NUM_TRAINING_EPOCHS,
        }
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn num_training_epochs(mut self, num_training_epochs: u64) -> Self {
        self.num_training_epochs = num_training_epochs;
        self
    }

    /// Assembles the configuration. Zero batch size is a division by zero and
    /// is returned as an error, not replaced by a default.
    pub fn build(self) -> Result<ExperimentConfig> {
        let plan = StepPlan::derive(IMAGENET_TRAIN_SIZE, self.batch_size, self.num_training_epochs)?;

        Ok(ExperimentConfig {
            experiment_name: "imagenet_resnet".to_string(),

            dataset_name: "imagenet".to_string(),
            data_dtype_str: DType::Float32,
            dataset_configs: DatasetConfigs::default(),

            model_name: "resnet_classification".to_string(),
            num_filters: 64,
            num_layers: 50,
            model_dtype_str: DType::Float32,

            trainer_name: "classification_trainer".to_string(),
            optimizer: "momentum".to_string(),
            optimizer_configs: OptimizerConfigs::default(),
            l2_decay_factor: 0.00005,
            max_grad_norm: None,
            label_smoothing: None,
            num_training_epochs: self.num_training_epochs,
            batch_size: self.batch_size,
            rng_seed: 0,
            init_head_bias: -10.0,

            // Non-cycling cosine: one cycle covers the whole run.
            lr_configs: LrConfigs {
                learning_rate_schedule: "compound".to_string(),
                factors: "constant * cosine_decay * linear_warmup".to_string(),
                warmup_steps: plan.warmup_steps,
                steps_per_cycle: plan.steps_per_cycle,
                base_learning_rate: plan.base_learning_rate,
            },

            write_summary: true,
            write_xm_measurements: true,
            xprof: true,
            checkpoint: true,
            checkpoint_steps: plan.checkpoint_steps,
            debug_train: false,
            debug_eval: false,
        })
    }
}

/// Returns the base experiment configuration for ResNet-50 on ImageNet.
pub fn get_config() -> Result<ExperimentConfig> {
    ConfigBuilder::default().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_literal_defaults() {
        let config = get_config().unwrap();

        assert_eq!(config.experiment_name, "imagenet_resnet");
        assert_eq!(config.dataset_name, "imagenet");
        assert_eq!(config.data_dtype_str, DType::Float32);
        assert!(config.dataset_configs.0.is_empty());
        assert_eq!(config.model_name, "resnet_classification");
        assert_eq!(config.num_filters, 64);
        assert_eq!(config.num_layers, 50);
        assert_eq!(config.model_dtype_str, DType::Float32);
        assert_eq!(config.trainer_name, "classification_trainer");
        assert_eq!(config.optimizer, "momentum");
        assert_eq!(config.optimizer_configs.momentum, 0.9);
        assert_eq!(config.l2_decay_factor, 0.00005);
        assert_eq!(config.max_grad_norm, None);
        assert_eq!(config.label_smoothing, None);
        assert_eq!(config.num_training_epochs, 90);
        assert_eq!(config.batch_size, 8192);
        assert_eq!(config.rng_seed, 0);
        assert_eq!(config.init_head_bias, -10.0);
        assert_eq!(config.lr_configs.learning_rate_schedule, "compound");
        assert_eq!(
            config.lr_configs.factors,
            "constant * cosine_decay * linear_warmup"
        );
    }

    #[test]
    fn test_derived_defaults() {
        let config = get_config().unwrap();
        assert_eq!(config.lr_configs.warmup_steps, 1092);
        assert_eq!(config.lr_configs.steps_per_cycle, 14040);
        assert_eq!(config.lr_configs.base_learning_rate, 3.2);
        assert_eq!(config.checkpoint_steps, 1560);
    }

    #[test]
    fn test_logging_toggles() {
        let config = get_config().unwrap();
        assert!(config.write_summary);
        assert!(config.write_xm_measurements);
        assert!(config.xprof);
        assert!(config.checkpoint);
        assert!(!config.debug_train);
        assert!(!config.debug_eval);
    }

    #[test]
    fn test_builder_default_matches_get_config() {
        assert_eq!(ConfigBuilder::new().build().unwrap(), get_config().unwrap());
    }

    #[test]
    fn test_builder_recomputes_derived_values() {
        let config = ConfigBuilder::new()
            .batch_size(1024)
            .num_training_epochs(100)
            .build()
            .unwrap();
        // 1281167 / 1024 = 1251
        assert_eq!(config.lr_configs.warmup_steps, 7 * 1251);
        assert_eq!(config.lr_configs.steps_per_cycle, 100 * 1251);
        assert_eq!(config.checkpoint_steps, 10 * 1251);
        assert_eq!(config.lr_configs.base_learning_rate, 0.4);
        config.check_derived().unwrap();
    }

    #[test]
    fn test_zero_batch_size_fails() {
        let err = ConfigBuilder::new().batch_size(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::DivisionByZero { .. }));
    }
}
