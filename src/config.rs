//! Machine configuration.
//!
//! Every knob has a default matching the reference LS-8, so an empty
//! config file (`{}`) describes the stock machine.
//!
//! # Config File Format
//!
//! ```json
//! {
//!     "memory_size": 256,
//!     "vector_table_size": 12,
//!     "stack_floor": 64,
//!     "flag_mode": "reset"
//! }
//! ```

use crate::cpu::alu::FlagMode;
use crate::cpu::memory::MEMORY_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Cells reserved at the top of memory for the interrupt vector table.
pub const VECTOR_TABLE_SIZE: usize = 12;

/// LS-8 machine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Number of memory cells. At most 256, since addresses live in
    /// byte-wide registers.
    pub memory_size: usize,

    /// Cells kept free above the stack.
    pub vector_table_size: usize,

    /// Lowest address the stack may grow into. When unset, the stack may
    /// grow down to the first byte after the loaded program.
    pub stack_floor: Option<usize>,

    /// CMP flag behaviour.
    pub flag_mode: FlagMode,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: MEMORY_SIZE,
            vector_table_size: VECTOR_TABLE_SIZE,
            stack_floor: None,
            flag_mode: FlagMode::Reset,
        }
    }
}

impl MachineConfig {
    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config = Self::from_json(&text)?;
        log::debug!("Loaded machine config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a machine that can exist.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_size == 0 || self.memory_size > MEMORY_SIZE {
            return Err(ConfigError::InvalidMemorySize(self.memory_size));
        }

        if self.vector_table_size >= self.memory_size {
            return Err(ConfigError::VectorTableTooLarge {
                size: self.vector_table_size,
                memory_size: self.memory_size,
            });
        }

        if let Some(floor) = self.stack_floor {
            let top = self.stack_top() as usize;
            if floor > top {
                return Err(ConfigError::StackFloorAboveTop { floor, top });
            }
        }

        Ok(())
    }

    /// Initial SP: the address of an empty stack.
    pub fn stack_top(&self) -> u8 {
        let top = self.memory_size.saturating_sub(1 + self.vector_table_size);
        top.min(u8::MAX as usize) as u8
    }
}

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("memory size {0} out of range (1-256)")]
    InvalidMemorySize(usize),

    #[error("vector table of {size} cells leaves no room in {memory_size} cells of memory")]
    VectorTableTooLarge { size: usize, memory_size: usize },

    #[error("stack floor {floor:#04x} is above the stack top {top:#04x}")]
    StackFloorAboveTop { floor: usize, top: usize },
}
