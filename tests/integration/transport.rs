//! Transport integration tests
//!
//! The transport is a sample counter advanced by the scheduler once per block.

use crate::helpers::*;
use approx::assert_relative_eq;

#[test]
fn test_transport_starts_at_zero() {
    let engine = test_engine();
    let transport = engine.transport();

    assert_eq!(transport.position(), 0);
    assert_eq!(transport.blocks(), 0);
    assert_eq!(transport.seconds(), 0.0);
    assert_eq!(transport.sample_rate(), TEST_SAMPLE_RATE);
}

/// Position advances by exactly the frames rendered, whatever the graph holds.
#[test]
fn test_transport_advances_by_frames() {
    let engine = test_engine();
    sine_to_sink(&engine, 440.0);

    engine.render(100).unwrap();
    assert_eq!(engine.position(), 100);

    engine.render(TEST_BLOCK_SIZE).unwrap();
    assert_eq!(engine.position(), 100 + TEST_BLOCK_SIZE as u64);
}

/// Requests larger than the maximum block are split into sub-blocks.
#[test]
fn test_transport_counts_sub_blocks() {
    let engine = test_engine();

    // 300 frames in 128-frame blocks: 128 + 128 + 44
    engine.render(300).unwrap();
    let transport = engine.transport();
    assert_eq!(transport.position(), 300);
    assert_eq!(transport.blocks(), 3);
    assert_eq!(engine.diagnostics().blocks_processed, 3);
}

#[test]
fn test_transport_seconds() {
    let engine = test_engine_with_sr(44100.0);
    engine.render(44100).unwrap();

    let transport = engine.transport();
    assert_eq!(transport.position(), 44100);
    assert_relative_eq!(transport.seconds(), 1.0, epsilon = 1e-12);
    assert_eq!(transport.sample_rate(), 44100.0);
}

/// Readers are cheap clones, safe to move to other threads.
#[test]
fn test_transport_reader_cross_thread() {
    let engine = test_engine();
    let reader = engine.transport();

    engine.render(512).unwrap();
    let seen = std::thread::spawn(move || reader.position()).join().unwrap();
    assert_eq!(seen, 512);
}

/// A zero-length render is a no-op for the clock.
#[test]
fn test_transport_empty_render() {
    let engine = test_engine();
    assert!(engine.render(0).unwrap().is_empty());
    assert_eq!(engine.position(), 0);
    assert_eq!(engine.transport().blocks(), 0);
}
