//! Range and consistency checks run before a configuration is handed to a trainer.

use log::debug;

use crate::config::ExperimentConfig;
use crate::error::{ConfigError, Result};
use crate::schedule::LrFactor;

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl ExperimentConfig {
    /// Returns the first violated constraint, if any.
    ///
    /// Derived fields are only checked for internal consistency here; use
    /// [`ExperimentConfig::check_derived`] to compare them with a fresh derivation.
    pub fn validate(&self) -> Result<()> {
        let result = self.validate_inner();
        match &result {
            Ok(()) => debug!("config `{}` is valid", self.experiment_name),
            Err(e) => debug!("config `{}` rejected: {}", self.experiment_name, e),
        }
        result
    }

    fn validate_inner(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be > 0"));
        }
        if self.num_training_epochs == 0 {
            return Err(invalid("num_training_epochs", "must be > 0"));
        }
        if self.num_filters == 0 {
            return Err(invalid("num_filters", "must be > 0"));
        }
        if self.num_layers == 0 {
            return Err(invalid("num_layers", "must be > 0"));
        }

        let momentum = self.optimizer_configs.momentum;
        if !(0.0..1.0).contains(&momentum) {
            return Err(invalid(
                "optimizer_configs.momentum",
                format!("{momentum} is outside [0, 1)"),
            ));
        }
        if !(self.l2_decay_factor >= 0.0) {
            return Err(invalid(
                "l2_decay_factor",
                format!("{} must be >= 0", self.l2_decay_factor),
            ));
        }
        if let Some(norm) = self.max_grad_norm {
            if !(norm.is_finite() && norm > 0.0) {
                return Err(invalid(
                    "max_grad_norm",
                    format!("{norm} must be finite and > 0"),
                ));
            }
        }
        if let Some(smoothing) = self.label_smoothing {
            if !(0.0..1.0).contains(&smoothing) {
                return Err(invalid(
                    "label_smoothing",
                    format!("{smoothing} is outside [0, 1)"),
                ));
            }
        }

        if !self.init_head_bias.is_finite() {
            return Err(invalid(
                "init_head_bias",
                format!("{} must be finite", self.init_head_bias),
            ));
        }

        let lr = &self.lr_configs;
        if !(lr.base_learning_rate.is_finite() && lr.base_learning_rate > 0.0) {
            return Err(invalid(
                "lr_configs.base_learning_rate",
                format!("{} must be finite and > 0", lr.base_learning_rate),
            ));
        }
        if lr.warmup_steps > lr.steps_per_cycle {
            return Err(invalid(
                "lr_configs.warmup_steps",
                format!(
                    "{} exceeds steps_per_cycle ({})",
                    lr.warmup_steps, lr.steps_per_cycle
                ),
            ));
        }
        let factors = lr.parsed_factors()?;
        if factors.contains(&LrFactor::LinearWarmup) && lr.warmup_steps == 0 {
            return Err(invalid(
                "lr_configs.warmup_steps",
                "linear_warmup needs at least one warmup step",
            ));
        }

        if self.checkpoint && self.checkpoint_steps == 0 {
            return Err(invalid(
                "checkpoint_steps",
                "must be > 0 when checkpointing is enabled",
            ));
        }

        Ok(())
    }
}
