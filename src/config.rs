use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::export::{DEFAULT_PNG_SCALE, FALLBACK_HEIGHT, FALLBACK_WIDTH};
use crate::history::DEFAULT_HISTORY_CAP;
use crate::viewport::{DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE, DEFAULT_ZOOM_STEP};

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_HISTORY_DEBOUNCE_MS: u64 = 2000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    pub zoom_step: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            zoom_step: DEFAULT_ZOOM_STEP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    pub png_scale: f32,
    pub fallback_width: f32,
    pub fallback_height: f32,
}

impl ExportConfig {
    pub fn fallback(&self) -> (f32, f32) {
        (self.fallback_width, self.fallback_height)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            png_scale: DEFAULT_PNG_SCALE,
            fallback_width: FALLBACK_WIDTH,
            fallback_height: FALLBACK_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Quiescence interval between the last edit and the render attempt.
    pub debounce_ms: u64,
    /// Separate, longer window before the current code is snapshotted into
    /// history.
    pub history_debounce_ms: u64,
    pub history_cap: usize,
    pub viewport: ViewportConfig,
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            history_debounce_ms: DEFAULT_HISTORY_DEBOUNCE_MS,
            history_cap: DEFAULT_HISTORY_CAP,
            viewport: ViewportConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Defaults when no path is given; the file itself may use relaxed JSON
/// (comments, trailing commas, unquoted keys).
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let config: Config = json5::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.history_cap, 10);
        assert_eq!(config.export.fallback(), (800.0, 600.0));
    }

    #[test]
    fn relaxed_json_with_partial_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json5");
        std::fs::write(
            &path,
            "{\n  // faster feedback while demoing\n  debounceMs: 250,\n  viewport: { maxScale: 4 },\n}",
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.viewport.max_scale, 4.0);
        // Untouched sections keep their defaults.
        assert_eq!(config.history_debounce_ms, 2000);
        assert_eq!(config.viewport.min_scale, 0.1);
    }
}
