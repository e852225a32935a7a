//! Preallocated audio buffers.
//!
//! Every buffer the audio thread touches is allocated here when the graph is
//! created and reused for every block afterwards.

use crate::node::{MAX_INPUTS, MAX_OUTPUTS};

/// One channel of audio, `capacity` samples long. Blocks shorter than the
/// capacity use a prefix.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    samples: Vec<f32>,
}

impl AudioBlock {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn as_slice(&self, frames: usize) -> &[f32] {
        &self.samples[..frames]
    }

    #[inline]
    pub fn as_mut_slice(&mut self, frames: usize) -> &mut [f32] {
        &mut self.samples[..frames]
    }

    #[inline]
    pub fn clear(&mut self, frames: usize) {
        self.samples[..frames].fill(0.0);
    }

    #[inline]
    pub fn copy_from(&mut self, source: &[f32]) {
        self.samples[..source.len()].copy_from_slice(source);
    }

    #[inline]
    pub fn add_from(&mut self, source: &[f32]) {
        for (dst, src) in self.samples.iter_mut().zip(source) {
            *dst += src;
        }
    }

    /// Zero the block if any of its first `frames` samples is NaN or infinite.
    /// Returns whether it did.
    pub fn zero_if_non_finite(&mut self, frames: usize) -> bool {
        let block = &mut self.samples[..frames];
        if block.iter().all(|s| s.is_finite()) {
            return false;
        }
        block.fill(0.0);
        true
    }

    pub fn peak(&self, frames: usize) -> f32 {
        self.samples[..frames]
            .iter()
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

/// Output blocks for every node slot plus input scratch for fan-in summing.
#[derive(Debug)]
pub struct BufferPool {
    outputs: Vec<AudioBlock>,
    inputs: Vec<AudioBlock>,
    block_size: usize,
}

impl BufferPool {
    pub fn new(max_nodes: usize, block_size: usize) -> Self {
        Self {
            outputs: (0..max_nodes * MAX_OUTPUTS)
                .map(|_| AudioBlock::new(block_size))
                .collect(),
            inputs: (0..MAX_INPUTS).map(|_| AudioBlock::new(block_size)).collect(),
            block_size,
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn output_index(slot: usize, port: usize) -> usize {
        slot * MAX_OUTPUTS + port
    }

    #[inline]
    pub fn output(&self, slot: usize, port: usize) -> &AudioBlock {
        &self.outputs[Self::output_index(slot, port)]
    }

    /// Sum the listed output blocks into input scratch `port`.
    pub(crate) fn gather(&mut self, port: usize, sources: impl Iterator<Item = usize>, frames: usize) {
        let scratch = &mut self.inputs[port];
        scratch.clear(frames);
        for source in sources {
            scratch.add_from(self.outputs[source].as_slice(frames));
        }
    }

    /// Input scratch (read) and the output blocks of `slot` (write).
    pub(crate) fn split(&mut self, slot: usize, inputs: usize) -> (&[AudioBlock], &mut [AudioBlock]) {
        let start = slot * MAX_OUTPUTS;
        (
            &self.inputs[..inputs],
            &mut self.outputs[start..start + MAX_OUTPUTS],
        )
    }

    pub(crate) fn clear_outputs(&mut self, slot: usize) {
        let start = slot * MAX_OUTPUTS;
        for block in &mut self.outputs[start..start + MAX_OUTPUTS] {
            block.clear(self.block_size);
        }
    }
}

/// The engine's final mix, one block per output channel.
#[derive(Debug)]
pub struct OutputBus {
    channels: Vec<AudioBlock>,
}

impl OutputBus {
    pub fn new(channels: usize, block_size: usize) -> Self {
        Self {
            channels: (0..channels).map(|_| AudioBlock::new(block_size)).collect(),
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    pub fn clear(&mut self, frames: usize) {
        for channel in &mut self.channels {
            channel.clear(frames);
        }
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &AudioBlock {
        &self.channels[index]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut AudioBlock {
        &mut self.channels[index]
    }

    /// Zero any channel holding non-finite samples. Returns how many were zeroed.
    pub fn sanitize(&mut self, frames: usize) -> u64 {
        let mut zeroed = 0;
        for channel in &mut self.channels {
            if channel.zero_if_non_finite(frames) {
                zeroed += 1;
            }
        }
        zeroed
    }

    /// Interleave `frames` frames into `out` with `out_channels` channels.
    ///
    /// A mono bus feeds every output channel; output channels beyond the bus are
    /// silent.
    pub fn write_interleaved(&self, out: &mut [f32], frames: usize, out_channels: usize) {
        let bus_channels = self.channels.len();
        for (frame, chunk) in out.chunks_exact_mut(out_channels).take(frames).enumerate() {
            for (c, sample) in chunk.iter_mut().enumerate() {
                *sample = if bus_channels == 1 {
                    self.channels[0].samples[frame]
                } else if c < bus_channels {
                    self.channels[c].samples[frame]
                } else {
                    0.0
                };
            }
        }
    }
}
