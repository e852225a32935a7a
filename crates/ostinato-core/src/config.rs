//! Audio engine configuration.
//!
//! Every capacity the audio thread needs is fixed here, before the engine
//! starts: node slots, edge slots, queue depths and the largest block the
//! scheduler will process in one pass.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest supported block, in frames.
pub const MAX_BLOCK_SIZE: usize = 4096;

/// Configuration for the audio engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Output channels written by the scheduler (interleaved).
    pub channels: usize,
    /// Frames per internal processing pass. Larger driver requests are split.
    pub max_block_size: usize,
    /// Live node limit; sizes the node arena and the buffer pool.
    pub max_nodes: usize,
    pub max_edges: usize,
    /// Command queue capacity (control -> audio).
    pub command_capacity: usize,
    /// Commands applied per block at most.
    pub commands_per_block: usize,
    /// Rejection report channel capacity (audio -> control).
    pub report_capacity: usize,
    /// Ramp length for continuous parameters when no explicit window is given.
    pub default_smoothing_blocks: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            channels: 2,
            max_block_size: 512,
            max_nodes: 256,
            max_edges: 1024,
            command_capacity: 1024,
            commands_per_block: 64,
            report_capacity: 256,
            default_smoothing_blocks: 4,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 8000.0 || self.sample_rate > 384000.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.channels == 0 || self.channels > 32 {
            return Err(Error::InvalidConfig(format!(
                "channels {} out of range (1-32)",
                self.channels
            )));
        }
        if self.max_block_size == 0 || self.max_block_size > MAX_BLOCK_SIZE {
            return Err(Error::InvalidConfig(format!(
                "max_block_size {} out of range (1-{MAX_BLOCK_SIZE})",
                self.max_block_size
            )));
        }
        if self.max_nodes == 0 || self.max_nodes > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "max_nodes {} must be positive",
                self.max_nodes
            )));
        }
        if self.max_edges == 0 {
            return Err(Error::InvalidConfig("max_edges must be positive".into()));
        }
        if self.command_capacity == 0 || self.commands_per_block == 0 {
            return Err(Error::InvalidConfig(
                "command_capacity and commands_per_block must be positive".into(),
            ));
        }
        if self.report_capacity == 0 {
            return Err(Error::InvalidConfig(
                "report_capacity must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parse from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Wall-clock budget for one block of `frames`, in seconds.
    pub fn block_budget_secs(&self, frames: usize) -> f64 {
        frames as f64 / self.sample_rate
    }
}
