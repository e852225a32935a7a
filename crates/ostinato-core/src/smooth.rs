//! Block-based parameter smoothing.
//!
//! A new target is approached linearly over a whole number of blocks. Inside a
//! block the value is interpolated per sample, and the last sample of the final
//! block lands exactly on the target.
//!
//! ```
//! use ostinato_core::BlockSmoother;
//!
//! let mut gain = BlockSmoother::new(0.0);
//! gain.set_target(1.0, 2);
//!
//! let first = gain.begin_block(64);
//! assert_eq!(first.end(), 0.5);
//! let second = gain.begin_block(64);
//! assert_eq!(second.at(63), 1.0);
//! assert!(!gain.is_smoothing());
//! ```

/// Linear ramp across the samples of one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    start: f32,
    end: f32,
    frames: usize,
}

impl Ramp {
    pub fn constant(value: f32) -> Self {
        Self {
            start: value,
            end: value,
            frames: 1,
        }
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn end(&self) -> f32 {
        self.end
    }

    /// Value for sample `i` of the block. Sample `frames - 1` returns `end` exactly.
    #[inline]
    pub fn at(&self, i: usize) -> f32 {
        if self.is_constant() || i + 1 >= self.frames {
            return self.end;
        }
        let t = (i + 1) as f32 / self.frames as f32;
        let value = self.start + (self.end - self.start) * t;
        // rounding must not carry the value past either endpoint
        if self.start <= self.end {
            value.clamp(self.start, self.end)
        } else {
            value.clamp(self.end, self.start)
        }
    }

    pub fn fill(&self, out: &mut [f32]) {
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = self.at(i);
        }
    }

    pub fn apply_gain(&self, buffer: &mut [f32]) {
        if self.is_constant() {
            for sample in buffer.iter_mut() {
                *sample *= self.end;
            }
        } else {
            for (i, sample) in buffer.iter_mut().enumerate() {
                *sample *= self.at(i);
            }
        }
    }
}

/// Value that ramps to a new target over a fixed number of blocks.
#[derive(Debug, Clone)]
pub struct BlockSmoother {
    current: f32,
    target: f32,
    origin: f32,
    total_blocks: u32,
    elapsed_blocks: u32,
}

impl BlockSmoother {
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            origin: initial,
            total_blocks: 0,
            elapsed_blocks: 0,
        }
    }

    /// Start a ramp from the current value. `blocks == 0` jumps at the next block.
    pub fn set_target(&mut self, target: f32, blocks: u32) {
        if blocks == 0 {
            self.set_immediate(target);
            return;
        }
        self.origin = self.current;
        self.target = target;
        self.total_blocks = blocks;
        self.elapsed_blocks = 0;
    }

    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.origin = value;
        self.total_blocks = 0;
        self.elapsed_blocks = 0;
    }

    /// Advance by one block of `frames` samples and return its ramp.
    pub fn begin_block(&mut self, frames: usize) -> Ramp {
        if !self.is_smoothing() {
            return Ramp::constant(self.current);
        }

        self.elapsed_blocks += 1;
        let start = self.current;
        let end = if self.elapsed_blocks >= self.total_blocks {
            self.total_blocks = 0;
            self.elapsed_blocks = 0;
            self.target
        } else {
            let t = self.elapsed_blocks as f32 / self.total_blocks as f32;
            self.origin + (self.target - self.origin) * t
        };
        self.current = end;

        Ramp {
            start,
            end,
            frames: frames.max(1),
        }
    }

    /// Value at the end of the last processed block.
    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.total_blocks > 0
    }

    #[inline]
    pub fn blocks_remaining(&self) -> u32 {
        self.total_blocks - self.elapsed_blocks
    }
}
