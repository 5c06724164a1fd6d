//! Error types for Posho
//!
//! This module defines:
//! - `PoshoError`: the error enum shared by every library crate
//! - `Result`: the crate-wide result alias

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum PoshoError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("coordinate ({0:.3}, {1:.3}) outside interior region")]
    OutsideInterior(f64, f64),

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("parameter '{name}' value {value} outside bounds [{lo}, {hi}]")]
    ParameterBounds {
        name: String,
        value: f64,
        lo: f64,
        hi: f64,
    },

    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("catalog is empty after cuts")]
    EmptyCatalog,
}

pub type Result<T> = std::result::Result<T, PoshoError>;
