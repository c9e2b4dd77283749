use std::fs;
use std::path::Path;

use log::info;

use crate::config::ExperimentConfig;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Picks the format from the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub fn to_yaml_string(config: &ExperimentConfig) -> Result<String> {
    Ok(serde_yaml::to_string(config)?)
}

/// Fails on NaN or infinite floats, which JSON would otherwise write as `null`.
pub fn to_json_string(config: &ExperimentConfig) -> Result<String> {
    if let Some(field) = config.non_finite_field() {
        return Err(ConfigError::Invalid {
            field,
            reason: "non-finite float has no JSON representation".to_string(),
        });
    }
    Ok(serde_json::to_string_pretty(config)?)
}

pub fn to_string(config: &ExperimentConfig, format: Format) -> Result<String> {
    match format {
        Format::Yaml => to_yaml_string(config),
        Format::Json => to_json_string(config),
    }
}

pub fn from_str(content: &str, format: Format) -> Result<ExperimentConfig> {
    match format {
        Format::Yaml => Ok(serde_yaml::from_str(content)?),
        Format::Json => Ok(serde_json::from_str(content)?),
    }
}

/// Reads a config written by [`save`] (or by hand) from a `.yaml`, `.yml` or `.json` file.
pub fn load(path: impl AsRef<Path>) -> Result<ExperimentConfig> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    info!("Loading config from {}", path.display());
    let content = fs::read_to_string(path)?;
    from_str(&content, format)
}

pub fn save(config: &ExperimentConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = to_string(config, Format::from_path(path)?)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    info!("Saved config `{}` to {}", config.experiment_name, path.display());
    Ok(())
}
