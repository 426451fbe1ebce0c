//! th-config: run file format, validation and run preparation.

pub mod prepare;
pub mod schema;
pub mod validate;

pub use prepare::Prepared;
pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_run};

use std::path::Path;
use th_background::BackgroundError;
use th_rates::RateError;
use th_thermo::ThermoError;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported run file format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background error: {0}")]
    Background(#[from] BackgroundError),

    #[error("Rate provider error: {0}")]
    Rates(#[from] RateError),

    #[error("Thermal history error: {0}")]
    Thermo(#[from] ThermoError),
}

/// Load a run file, choosing the format from the extension.
pub fn load(path: &Path) -> ConfigResult<RunFile> {
    match extension(path).as_deref() {
        Some("yaml" | "yml") => load_yaml(path),
        Some("json") => load_json(path),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("<none>").to_string())),
    }
}

/// Save a run file, choosing the format from the extension.
pub fn save(path: &Path, run: &RunFile) -> ConfigResult<()> {
    match extension(path).as_deref() {
        Some("yaml" | "yml") => save_yaml(path, run),
        Some("json") => save_json(path, run),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("<none>").to_string())),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn from_yaml_str(content: &str) -> ConfigResult<RunFile> {
    let run: RunFile = serde_yaml::from_str(content)?;
    validate_run(&run)?;
    Ok(run)
}

pub fn load_yaml(path: &Path) -> ConfigResult<RunFile> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn save_yaml(path: &Path, run: &RunFile) -> ConfigResult<()> {
    validate_run(run)?;
    let content = serde_yaml::to_string(run)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ConfigResult<RunFile> {
    let content = std::fs::read_to_string(path)?;
    let run: RunFile = serde_json::from_str(&content)?;
    validate_run(&run)?;
    Ok(run)
}

pub fn save_json(path: &Path, run: &RunFile) -> ConfigResult<()> {
    validate_run(run)?;
    let content = serde_json::to_string_pretty(run)?;
    std::fs::write(path, content)?;
    Ok(())
}
