//! Builder for configuring and constructing an `OstinatoEngine`.

use crate::core::{Controller, EngineConfig};
use crate::{OstinatoEngine, Result};
use std::path::Path;

#[cfg(feature = "device")]
use crate::core::AudioDevice;

/// Every setter overrides one field of [`EngineConfig`]; anything left alone
/// keeps its default (or the value from [`config_file`](Self::config_file)).
///
/// With the `device` feature and [`output_device`](Self::output_device), the
/// sample rate and channel count come from the device and override the
/// configured ones.
///
/// # Example
///
/// ```
/// use ostinato::prelude::*;
///
/// let engine = OstinatoEngine::builder()
///     .sample_rate(44100.0)
///     .max_block_size(256)
///     .build()?;
///
/// assert_eq!(engine.sample_rate(), 44100.0);
/// # Ok::<(), ostinato::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct OstinatoEngineBuilder {
    config: EngineConfig,

    #[cfg(feature = "device")]
    output_device: Option<Option<usize>>,
}

impl OstinatoEngineBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a TOML file. Missing keys keep their defaults.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = EngineConfig::load(path)?;
        Ok(self)
    }

    /// Default: 48000
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 2
    pub fn channels(mut self, channels: usize) -> Self {
        self.config.channels = channels;
        self
    }

    /// Default: 512
    pub fn max_block_size(mut self, frames: usize) -> Self {
        self.config.max_block_size = frames;
        self
    }

    /// Default: 256
    pub fn max_nodes(mut self, count: usize) -> Self {
        self.config.max_nodes = count;
        self
    }

    /// Default: 1024
    pub fn max_edges(mut self, count: usize) -> Self {
        self.config.max_edges = count;
        self
    }

    /// Default: 1024
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.config.command_capacity = capacity;
        self
    }

    /// Default: 64
    pub fn commands_per_block(mut self, count: usize) -> Self {
        self.config.commands_per_block = count;
        self
    }

    /// Blocks a continuous parameter change ramps over. Default: 4
    pub fn smoothing_blocks(mut self, blocks: u32) -> Self {
        self.config.default_smoothing_blocks = blocks;
        self
    }

    /// Open an output device at build time (`None` = system default).
    #[cfg(feature = "device")]
    pub fn output_device(mut self, index: Option<usize>) -> Self {
        self.output_device = Some(index);
        self
    }

    pub fn build(self) -> Result<OstinatoEngine> {
        #[allow(unused_mut)]
        let mut config = self.config;

        #[cfg(feature = "device")]
        let device = match self.output_device {
            Some(index) => {
                let device = AudioDevice::open(index)?;
                config.sample_rate = device.sample_rate();
                config.channels = device.channels();
                Some(device)
            }
            None => None,
        };

        let (controller, scheduler) = Controller::with_config(config)?;

        Ok(OstinatoEngine::from_parts(
            controller,
            scheduler,
            #[cfg(feature = "device")]
            device,
        ))
    }
}
