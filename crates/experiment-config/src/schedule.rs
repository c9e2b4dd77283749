use std::str::FromStr;

use serde::Serialize;

use crate::error::{ConfigError, Result};

/// Number of labeled examples in the ImageNet (ILSVRC-2012) training split.
pub const IMAGENET_TRAIN_SIZE: u64 = 1_281_167;

/// Reference batch size the linear learning-rate scaling rule is anchored to.
pub const REFERENCE_BATCH_SIZE: f64 = 256.0;

/// Learning rate at the reference batch size.
pub const REFERENCE_LEARNING_RATE: f64 = 0.1;

/// Epochs of linear warmup before cosine decay takes over.
pub const WARMUP_EPOCHS: u64 = 7;

/// Epochs between two checkpoints.
pub const CHECKPOINT_EVERY_EPOCHS: u64 = 10;

/// Step counts and learning rate derived from the primitive training inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepPlan {
    pub steps_per_epoch: u64,
    pub total_steps: u64,
    pub warmup_steps: u64,
    /// A single cosine cycle spanning the whole run, so this is always `total_steps`.
    pub steps_per_cycle: u64,
    pub checkpoint_steps: u64,
    pub base_learning_rate: f64,
}

impl StepPlan {
    /// Derives every dependent value, in dependency order.
    ///
    /// Fails with [`ConfigError::DivisionByZero`] when `batch_size` is zero and
    /// with [`ConfigError::Overflow`] if a step count does not fit in `u64`.
    pub fn derive(train_size: u64, batch_size: u64, num_training_epochs: u64) -> Result<Self> {
        let steps_per_epoch = steps_per_epoch(train_size, batch_size)?;
        let total_steps = num_training_epochs
            .checked_mul(steps_per_epoch)
            .ok_or(ConfigError::Overflow("total_steps"))?;
        let base_learning_rate = base_learning_rate(batch_size);
        let warmup_steps = WARMUP_EPOCHS
            .checked_mul(steps_per_epoch)
            .ok_or(ConfigError::Overflow("warmup_steps"))?;
        let checkpoint_steps = CHECKPOINT_EVERY_EPOCHS
            .checked_mul(steps_per_epoch)
            .ok_or(ConfigError::Overflow("checkpoint_steps"))?;

        Ok(Self {
            steps_per_epoch,
            total_steps,
            warmup_steps,
            steps_per_cycle: total_steps,
            checkpoint_steps,
            base_learning_rate,
        })
    }
}

/// Full batches per epoch. A trailing partial batch is dropped.
pub fn steps_per_epoch(train_size: u64, batch_size: u64) -> Result<u64> {
    train_size
        .checked_div(batch_size)
        .ok_or(ConfigError::DivisionByZero {
            numerator: train_size,
        })
}

/// Linear scaling rule: 0.1 at batch size 256.
pub fn base_learning_rate(batch_size: u64) -> f64 {
    REFERENCE_LEARNING_RATE * batch_size as f64 / REFERENCE_BATCH_SIZE
}

/// One multiplicative term of a compound learning-rate schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LrFactor {
    Constant,
    CosineDecay,
    LinearWarmup,
    LinearDecay,
    RsqrtDecay,
}

impl FromStr for LrFactor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "constant" => Ok(LrFactor::Constant),
            "cosine_decay" => Ok(LrFactor::CosineDecay),
            "linear_warmup" => Ok(LrFactor::LinearWarmup),
            "linear_decay" => Ok(LrFactor::LinearDecay),
            "rsqrt_decay" => Ok(LrFactor::RsqrtDecay),
            other => Err(ConfigError::UnknownLrFactor(other.to_string())),
        }
    }
}

/// Parses a factor product such as `"constant * cosine_decay * linear_warmup"`.
pub fn parse_factors(factors: &str) -> Result<Vec<LrFactor>> {
    factors.split('*').map(|f| f.trim().parse()).collect()
}
