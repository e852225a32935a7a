//! Engine counters and DSP load metering.
//!
//! Everything here is written with relaxed atomics from whichever thread
//! observes the event and read by the control thread through
//! [`Diagnostics::snapshot`].

use crate::lockfree::{AtomicFlag, AtomicFloat};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiagnosticsSnapshot {
    pub blocks_processed: u64,
    pub commands_applied: u64,
    /// Commands refused because the queue was full.
    pub commands_dropped: u64,
    pub cycles_rejected: u64,
    /// Rejected mutations other than cycles.
    pub mutations_rejected: u64,
    /// Rejection reports lost because the report channel was full.
    pub reports_dropped: u64,
    pub non_finite_clamps: u64,
    pub underruns: u64,
    pub deadline_overruns: u64,
    pub load: LoadMetrics,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    blocks_processed: AtomicU64,
    commands_applied: AtomicU64,
    commands_dropped: AtomicU64,
    cycles_rejected: AtomicU64,
    mutations_rejected: AtomicU64,
    reports_dropped: AtomicU64,
    non_finite_clamps: AtomicU64,
    underruns: AtomicU64,
    load: LoadMeter,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        #[inline]
        pub fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_block, blocks_processed);
    counter!(record_command_applied, commands_applied);
    counter!(record_command_dropped, commands_dropped);
    counter!(record_cycle_rejected, cycles_rejected);
    counter!(record_mutation_rejected, mutations_rejected);
    counter!(record_report_dropped, reports_dropped);
    counter!(record_underrun, underruns);

    #[inline]
    pub fn record_non_finite(&self, blocks: u64) {
        if blocks > 0 {
            self.non_finite_clamps.fetch_add(blocks, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn load(&self) -> &LoadMeter {
        &self.load
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            blocks_processed: self.blocks_processed.load(Ordering::Relaxed),
            commands_applied: self.commands_applied.load(Ordering::Relaxed),
            commands_dropped: self.commands_dropped.load(Ordering::Relaxed),
            cycles_rejected: self.cycles_rejected.load(Ordering::Relaxed),
            mutations_rejected: self.mutations_rejected.load(Ordering::Relaxed),
            reports_dropped: self.reports_dropped.load(Ordering::Relaxed),
            non_finite_clamps: self.non_finite_clamps.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            deadline_overruns: self.load.overruns(),
            load: self.load.metrics(),
        }
    }
}

/// DSP load as a fraction of the real-time budget (1.0 = the whole block period).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadMetrics {
    pub current: f32,
    pub peak: f32,
    pub average: f32,
}

/// Time spent processing versus the time a block covers.
#[derive(Debug)]
pub struct LoadMeter {
    current: AtomicFloat,
    peak: AtomicFloat,
    average: AtomicFloat,
    count: AtomicU32,
    overruns: AtomicU64,
    enabled: AtomicFlag,
}

impl Default for LoadMeter {
    fn default() -> Self {
        Self {
            current: AtomicFloat::new(0.0),
            peak: AtomicFloat::new(0.0),
            average: AtomicFloat::new(0.0),
            count: AtomicU32::new(0),
            overruns: AtomicU64::new(0),
            enabled: AtomicFlag::new(true),
        }
    }
}

impl LoadMeter {
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Record one block of `frames` at `sample_rate` that took `elapsed`.
    pub fn record(&self, frames: usize, sample_rate: f64, elapsed: Duration) {
        if !self.is_enabled() || frames == 0 {
            return;
        }
        let budget = frames as f64 / sample_rate;
        let load = (elapsed.as_secs_f64() / budget) as f32;

        self.current.set(load);
        self.peak.raise_to(load);

        // moving average over roughly the last hundred blocks
        let n = self.count.fetch_add(1, Ordering::Relaxed);
        let alpha = 1.0 / (n.min(100) + 1) as f32;
        let average = self.average.get();
        self.average.set(average + (load - average) * alpha);

        if load > 1.0 {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn metrics(&self) -> LoadMetrics {
        LoadMetrics {
            current: self.current.get(),
            peak: self.peak.get(),
            average: self.average.get(),
        }
    }

    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.current.set(0.0);
        self.peak.set(0.0);
        self.average.set(0.0);
        self.count.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
    }
}
