use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("division by zero: cannot split {numerator} examples into batches of size 0")]
    DivisionByZero { numerator: u64 },

    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("derived field `{field}` is {actual}, expected {expected}")]
    Derived {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("unknown learning rate factor: {0}")]
    UnknownLrFactor(String),

    #[error("bad override `{spec}`: {reason}")]
    Override { spec: String, reason: String },

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
