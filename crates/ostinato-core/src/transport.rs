//! Sample-accurate transport clock.
//!
//! The scheduler is the only writer: it advances the clock once per processed
//! block. Any number of [`TransportReader`]s can observe it.

use atomic_float::AtomicF64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct ClockState {
    samples: AtomicU64,
    blocks: AtomicU64,
    sample_rate: AtomicF64,
}

/// Writer half, owned by the scheduler.
#[derive(Debug)]
pub struct TransportClock {
    state: Arc<ClockState>,
}

impl TransportClock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            state: Arc::new(ClockState {
                samples: AtomicU64::new(0),
                blocks: AtomicU64::new(0),
                sample_rate: AtomicF64::new(sample_rate),
            }),
        }
    }

    pub fn reader(&self) -> TransportReader {
        TransportReader {
            state: Arc::clone(&self.state),
        }
    }

    /// Advance by one block of `frames` samples.
    #[inline]
    pub(crate) fn advance(&self, frames: usize) {
        self.state.samples.fetch_add(frames as u64, Ordering::Release);
        self.state.blocks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the rate the driver is actually running at.
    #[inline]
    pub(crate) fn set_sample_rate(&self, sample_rate: f64) {
        if self.state.sample_rate.load(Ordering::Relaxed) != sample_rate {
            self.state.sample_rate.store(sample_rate, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.state.samples.load(Ordering::Acquire)
    }
}

/// Read-only view of the transport clock.
#[derive(Debug, Clone)]
pub struct TransportReader {
    state: Arc<ClockState>,
}

impl TransportReader {
    /// Samples processed since the engine started.
    #[inline]
    pub fn position(&self) -> u64 {
        self.state.samples.load(Ordering::Acquire)
    }

    pub fn seconds(&self) -> f64 {
        self.position() as f64 / self.sample_rate()
    }

    #[inline]
    pub fn blocks(&self) -> u64 {
        self.state.blocks.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.state.sample_rate.load(Ordering::Relaxed)
    }
}
