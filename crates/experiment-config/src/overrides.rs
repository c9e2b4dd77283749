//! `path=value` overrides on top of a built configuration, e.g.
//! `optimizer_configs.momentum=0.95` or `label_smoothing=null`.
//!
//! Overrides are literal. Derived fields keep their values, so changing
//! `batch_size` this way leaves the schedule stale; [`crate::ConfigBuilder`]
//! recomputes it.

use log::debug;
use serde_json::Value;

use crate::config::ExperimentConfig;
use crate::error::{ConfigError, Result};

/// Nested records that accept keys they do not already contain.
const OPEN_RECORDS: &[&str] = &["dataset_configs"];

fn override_error(spec: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Override {
        spec: spec.to_string(),
        reason: reason.into(),
    }
}

impl ExperimentConfig {
    /// Returns a copy with every override applied in order.
    ///
    /// NaN and infinities cannot survive the JSON tree the overrides are
    /// applied to, so they are rejected both in `self` and in override values.
    pub fn with_overrides<S: AsRef<str>>(&self, overrides: &[S]) -> Result<ExperimentConfig> {
        if let Some(field) = self.non_finite_field() {
            return Err(ConfigError::Invalid {
                field,
                reason: "non-finite float cannot be carried through overrides".to_string(),
            });
        }
        let mut tree = serde_json::to_value(self)?;
        for spec in overrides {
            apply_override(&mut tree, spec.as_ref())?;
        }
        serde_json::from_value(tree).map_err(|e| {
            let specs: Vec<&str> = overrides.iter().map(AsRef::as_ref).collect();
            override_error(&specs.join(" "), e.to_string())
        })
    }
}

/// Sets one `path=value` in a serialized config tree.
pub fn apply_override(tree: &mut Value, spec: &str) -> Result<()> {
    let (path, raw) = spec
        .split_once('=')
        .ok_or_else(|| override_error(spec, "expected `path=value`"))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(override_error(spec, "empty path"));
    }
    let parsed: serde_yaml::Value = serde_yaml::from_str(raw.trim())
        .map_err(|e| override_error(spec, format!("cannot parse value: {e}")))?;
    if has_non_finite(&parsed) {
        return Err(override_error(spec, "non-finite float"));
    }
    let value: Value = serde_json::to_value(&parsed)
        .map_err(|e| override_error(spec, format!("cannot convert value: {e}")))?;

    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| override_error(spec, "empty path"))?;

    let mut node = tree;
    for segment in parents {
        node = node
            .get_mut(*segment)
            .filter(|child| child.is_object())
            .ok_or_else(|| override_error(spec, format!("`{segment}` is not a nested record")))?;
    }
    let record = node
        .as_object_mut()
        .ok_or_else(|| override_error(spec, "not a nested record"))?;

    let open = parents.len() == 1 && OPEN_RECORDS.contains(&parents[0]);
    if !open && !record.contains_key(*last) {
        return Err(override_error(spec, format!("unknown key `{path}`")));
    }
    if record.get(*last).is_some_and(Value::is_object) {
        return Err(override_error(
            spec,
            format!("`{path}` is a nested record; set its keys instead"),
        ));
    }

    debug!("override {path} = {value}");
    record.insert((*last).to_string(), value);
    Ok(())
}

// serde_json stores NaN and infinities as null.
fn has_non_finite(value: &serde_yaml::Value) -> bool {
    match value {
        serde_yaml::Value::Number(n) => n.as_f64().is_some_and(|f| !f.is_finite()),
        serde_yaml::Value::Sequence(items) => items.iter().any(has_non_finite),
        serde_yaml::Value::Mapping(map) => map.values().any(has_non_finite),
        serde_yaml::Value::Tagged(tagged) => has_non_finite(&tagged.value),
        _ => false,
    }
}
