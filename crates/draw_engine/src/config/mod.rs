//! # Engine Configuration
//!
//! Configuration for buffer capacities and the optional behavior toggles of
//! the batching engine. Supports loading and saving in both TOML and RON,
//! with validation of the capacity invariants the engine relies on.

use serde::{Deserialize, Serialize};

/// Configuration trait for file-backed settings
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A capacity value violates an engine invariant
    #[error("Invalid capacity for {field}: {reason}")]
    InvalidCapacity {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Buffer capacities and behavior toggles for [`crate::DrawEngine`]
///
/// All buffers are allocated once at engine construction and never grow;
/// steady-state operation only resets cursors. Capacities are therefore
/// hard limits that double as flush triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawConfig {
    /// Maximum number of deferred draw calls buffered before a forced flush
    pub max_deferred_calls: usize,

    /// Capacity of the decoded-vertex arena, in vertices
    ///
    /// Also the cumulative vertex budget across one batch: a submit that
    /// would push the batch past this triggers an implicit flush first.
    pub vertex_budget: usize,

    /// Capacity of the translated-index arena, in indices
    pub index_budget: usize,

    /// Decode weighted (skinned) vertex formats eagerly at submit time
    /// instead of deferring them to the flush
    pub software_skinning: bool,

    /// Skip the render-target-aliasing flush for rectangle primitives
    ///
    /// Escape hatch for content that tolerates reading a target mid-write.
    pub disable_slow_framebuffer_effects: bool,
}

impl DrawConfig {
    /// Merged-space indices are 16-bit, so the decode arena can never hold
    /// more vertices than one run can address.
    pub const MAX_VERTEX_BUDGET: usize = u16::MAX as usize + 1;

    /// Validate capacity invariants
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] when a buffer capacity is
    /// zero or the vertex budget exceeds the 16-bit index space.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_deferred_calls == 0 {
            return Err(ConfigError::InvalidCapacity {
                field: "max_deferred_calls",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.vertex_budget == 0 {
            return Err(ConfigError::InvalidCapacity {
                field: "vertex_budget",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.vertex_budget > Self::MAX_VERTEX_BUDGET {
            return Err(ConfigError::InvalidCapacity {
                field: "vertex_budget",
                reason: format!(
                    "{} exceeds the 16-bit index space ({})",
                    self.vertex_budget,
                    Self::MAX_VERTEX_BUDGET
                ),
            });
        }
        if self.index_budget == 0 {
            return Err(ConfigError::InvalidCapacity {
                field: "index_budget",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            max_deferred_calls: 128,
            vertex_budget: 65536,
            index_budget: 262_144,
            software_skinning: false,
            disable_slow_framebuffer_effects: false,
        }
    }
}

impl Config for DrawConfig {}
