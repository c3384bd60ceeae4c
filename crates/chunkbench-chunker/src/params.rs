//! Typed access to `custom_params`.
//!
//! Optional parameters fall back to documented defaults when absent but are
//! rejected when present with the wrong shape. Required parameters are never
//! defaulted.

use chunkbench_core::{ChunkingConfig, ProcessorError};
use serde_json::Value;

fn invalid(config: &ChunkingConfig, key: &str, reason: &str) -> ProcessorError {
    ProcessorError::InvalidParam {
        strategy_id: config.strategy_id.clone(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Optional positive integer.
pub(crate) fn optional_count(
    config: &ChunkingConfig,
    key: &str,
) -> Result<Option<usize>, ProcessorError> {
    match config.param(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .filter(|n| *n > 0)
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(config, key, "must be a positive integer")),
    }
}

/// Optional header level in `1..=6`.
pub(crate) fn optional_level(
    config: &ChunkingConfig,
    key: &str,
) -> Result<Option<u8>, ProcessorError> {
    match optional_count(config, key)? {
        None => Ok(None),
        Some(n @ 1..=6) => Ok(u8::try_from(n).ok()),
        Some(_) => Err(invalid(config, key, "must be between 1 and 6")),
    }
}

/// Optional ratio in `[0.0, 1.0]`.
pub(crate) fn optional_ratio(
    config: &ChunkingConfig,
    key: &str,
) -> Result<Option<f32>, ProcessorError> {
    match config.param(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .filter(|x| (0.0..=1.0).contains(x))
            .map(|x| Some(x as f32))
            .ok_or_else(|| invalid(config, key, "must be a number between 0.0 and 1.0")),
    }
}

/// Required non-empty list of non-empty strings.
pub(crate) fn required_strings(
    config: &ChunkingConfig,
    key: &str,
) -> Result<Vec<String>, ProcessorError> {
    let value = config
        .param(key)
        .ok_or_else(|| ProcessorError::MissingParam {
            strategy_id: config.strategy_id.clone(),
            key: key.to_string(),
        })?;

    let items = value
        .as_array()
        .ok_or_else(|| invalid(config, key, "must be a list of strings"))?;
    let strings: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if strings.is_empty() || strings.len() != items.len() {
        return Err(invalid(config, key, "must be a non-empty list of non-empty strings"));
    }
    Ok(strings)
}
