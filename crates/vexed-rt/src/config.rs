use serde::Deserialize;
use std::path::Path;

/// Evaluator settings, read from the `[eval]` table of a `vexed.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Sweeps allowed before evaluation is declared non-terminating.
    pub max_sweeps: usize,
    /// Order in which an instance's properties are visited within a sweep.
    pub property_order: PropertyOrder,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_sweeps: 10_000,
            property_order: PropertyOrder::Declared,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyOrder {
    /// Ancestor properties first, then declaration order.
    #[default]
    Declared,
    /// The exact reverse. The fixed point must not depend on it.
    Reverse,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    eval: EvalConfig,
}

impl EvalConfig {
    /// Read the `[eval]` table from a `vexed.toml` file.
    pub fn from_file(path: &Path) -> Result<EvalConfig, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_str(&content)
    }

    /// Parse a `vexed.toml` document. A missing `[eval]` table yields the
    /// defaults.
    pub fn from_str(content: &str) -> Result<EvalConfig, String> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))?;
        if file.eval.max_sweeps == 0 {
            return Err("Failed to parse config: `max_sweeps` must be at least 1".to_string());
        }
        Ok(file.eval)
    }
}
