//! Test helpers and fixtures for ostinato integration tests
//!
//! Everything renders offline through the scheduler, so tests control the
//! block cycle manually and never touch audio hardware.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `DSP_EPSILON` (1e-4): DSP processing (filters, oscillators)
//! - `PERCEPTUAL_EPSILON` (0.001): Perceptual equivalence (-60dB)
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use ostinato::prelude::*;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard block size for deterministic testing
pub const TEST_BLOCK_SIZE: usize = 128;

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Create a basic test engine: stereo, 48 kHz, 128-frame blocks.
pub fn test_engine() -> OstinatoEngine {
    init_tracing();
    OstinatoEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .max_block_size(TEST_BLOCK_SIZE)
        .build()
        .expect("Failed to create test engine")
}

/// Create a test engine with specific sample rate.
pub fn test_engine_with_sr(sample_rate: f64) -> OstinatoEngine {
    init_tracing();
    OstinatoEngine::builder()
        .sample_rate(sample_rate)
        .max_block_size(TEST_BLOCK_SIZE)
        .build()
        .expect("Failed to create test engine")
}

/// Oscillator straight into a mono sink. Returns (oscillator, sink).
pub fn sine_to_sink(engine: &OstinatoEngine, frequency: f32) -> (NodeId, NodeId) {
    let osc = engine.add_node(NodeKind::sine(frequency)).unwrap();
    let sink = engine.add_node(NodeKind::sink(1)).unwrap();
    engine.connect(Edge::mono(osc, sink)).unwrap();
    (osc, sink)
}

/// Extract one channel from an interleaved buffer.
pub fn channel(interleaved: &[f32], channels: usize, index: usize) -> Vec<f32> {
    interleaved
        .iter()
        .skip(index)
        .step_by(channels)
        .copied()
        .collect()
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Count sign changes from negative to non-negative.
pub fn rising_zero_crossings(samples: &[f32]) -> usize {
    samples
        .windows(2)
        .filter(|w| w[0] < 0.0 && w[1] >= 0.0)
        .count()
}

// =============================================================================
// Audio Comparison Utilities
// =============================================================================

/// Result of comparing two audio buffers.
#[derive(Debug, Clone)]
pub struct AudioComparisonResult {
    /// Whether all samples are within tolerance.
    pub equal: bool,
    /// Maximum absolute difference between any two samples.
    pub max_diff: f32,
    /// Index of first sample that exceeds tolerance (if any).
    pub first_diff_sample: Option<usize>,
    /// Number of samples that exceed tolerance.
    pub num_diffs: usize,
}

/// Compare two audio buffers with epsilon tolerance.
pub fn compare_audio(a: &[f32], b: &[f32], epsilon: f32) -> AudioComparisonResult {
    if a.len() != b.len() {
        return AudioComparisonResult {
            equal: false,
            max_diff: f32::MAX,
            first_diff_sample: Some(0),
            num_diffs: a.len().max(b.len()),
        };
    }

    let mut max_diff: f32 = 0.0;
    let mut first_diff: Option<usize> = None;
    let mut num_diffs = 0;

    for (i, (&x, &y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        max_diff = max_diff.max(diff);
        if diff > epsilon {
            num_diffs += 1;
            if first_diff.is_none() {
                first_diff = Some(i);
            }
        }
    }

    AudioComparisonResult {
        equal: num_diffs == 0,
        max_diff,
        first_diff_sample: first_diff,
        num_diffs,
    }
}

/// Check if audio is silent (all samples below threshold).
pub fn is_silent(samples: &[f32], threshold: f32) -> bool {
    samples.iter().all(|&s| s.abs() <= threshold)
}

// =============================================================================
// Assertion Functions
// =============================================================================

/// Assert two signals are equal within tolerance, with detailed error message.
pub fn assert_signals_equal(a: &[f32], b: &[f32], epsilon: f32, context: &str) {
    let result = compare_audio(a, b, epsilon);
    assert!(
        result.equal,
        "{}: Signals differ - first diff at sample {:?}, max_diff={:.6}, num_diffs={}",
        context,
        result.first_diff_sample,
        result.max_diff,
        result.num_diffs
    );
}

/// Assert signal is silent within threshold.
pub fn assert_is_silent(samples: &[f32], threshold: f32, context: &str) {
    let max_val = peak(samples);
    assert!(
        max_val <= threshold,
        "{}: Expected silence (threshold {}), but peak was {}",
        context,
        threshold,
        max_val
    );
}

/// Assert signal is NOT silent (has content above threshold).
pub fn assert_not_silent(samples: &[f32], min_peak: f32, context: &str) {
    let max_val = peak(samples);
    assert!(
        max_val >= min_peak,
        "{}: Expected audio (min_peak {}), but peak was only {}",
        context,
        min_peak,
        max_val
    );
}

/// Assert every sample is a finite number.
pub fn assert_finite(samples: &[f32], context: &str) {
    if let Some(i) = samples.iter().position(|s| !s.is_finite()) {
        panic!("{}: non-finite sample {} at index {}", context, samples[i], i);
    }
}
