//! Default experiment configuration for training ResNet on ImageNet.
//!
//! [`get_config`] returns the base settings; [`ConfigBuilder`] re-derives the
//! step schedule for a different batch size or epoch count.

pub mod builder;
pub mod config;
pub mod error;
pub mod io;
pub mod overrides;
pub mod schedule;
pub mod validate;

pub use builder::{get_config, ConfigBuilder};
pub use config::{DType, DatasetConfigs, ExperimentConfig, LrConfigs, OptimizerConfigs};
pub use error::ConfigError;
pub use schedule::{LrFactor, StepPlan, IMAGENET_TRAIN_SIZE};
