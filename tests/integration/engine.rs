//! Engine integration tests
//!
//! Construction, configuration, parameter control and diagnostics.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use approx::assert_relative_eq;
use ostinato::core::Error as CoreError;
use ostinato::prelude::*;
use ostinato::{EngineConfig, Error};
use std::sync::Arc;

/// Builder defaults match `EngineConfig::default()` apart from what the test sets.
#[test]
fn test_engine_builder_defaults() {
    let engine = OstinatoEngine::builder().build().unwrap();
    assert_eq!(engine.config(), &EngineConfig::default());
    assert_eq!(engine.sample_rate(), 48000.0);
    assert_eq!(engine.channels(), 2);
    assert!(engine.is_offline());
    assert_eq!(engine.node_count(), 0);
}

#[test]
fn test_engine_builder_overrides() {
    let engine = OstinatoEngine::builder()
        .sample_rate(44100.0)
        .channels(1)
        .max_block_size(64)
        .max_nodes(16)
        .max_edges(32)
        .command_capacity(32)
        .commands_per_block(8)
        .smoothing_blocks(2)
        .build()
        .unwrap();

    let config = engine.config();
    assert_eq!(config.sample_rate, 44100.0);
    assert_eq!(config.channels, 1);
    assert_eq!(config.max_block_size, 64);
    assert_eq!(config.max_nodes, 16);
    assert_eq!(config.max_edges, 32);
    assert_eq!(config.command_capacity, 32);
    assert_eq!(config.commands_per_block, 8);
    assert_eq!(config.default_smoothing_blocks, 2);

    assert_eq!(engine.render(100).unwrap().len(), 100);
}

#[test]
fn test_engine_invalid_config() {
    let result = OstinatoEngine::builder().max_block_size(0).build();
    assert!(matches!(result, Err(Error::Core(CoreError::InvalidConfig(_)))));

    let result = OstinatoEngine::builder().channels(0).build();
    assert!(matches!(result, Err(Error::Core(CoreError::InvalidConfig(_)))));
}

#[test]
fn test_engine_config_file() {
    let path = std::env::temp_dir().join(format!("ostinato-engine-{}.toml", std::process::id()));
    std::fs::write(&path, "sample_rate = 96000.0\nmax_nodes = 12\n").unwrap();

    let engine = OstinatoEngine::builder()
        .config_file(&path)
        .unwrap()
        .build()
        .unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(engine.sample_rate(), 96000.0);
    assert_eq!(engine.config().max_nodes, 12);
    assert_eq!(engine.config().max_block_size, 512);

    let missing = OstinatoEngine::builder().config_file("/nonexistent/ostinato.toml");
    assert!(missing.is_err());
}

/// Changes queue up and take effect at the next block, not before.
#[test]
fn test_engine_changes_wait_for_block() {
    let engine = test_engine();
    let (osc, _) = sine_to_sink(&engine, 440.0);
    let key = ParamKey::new(osc, ParamId::Frequency);

    // Published value exists from the moment the node is queued
    assert_eq!(engine.read_parameter(key), Some(440.0));
    assert_eq!(engine.diagnostics().commands_applied, 0);

    engine.render(TEST_BLOCK_SIZE).unwrap();
    assert_eq!(engine.diagnostics().commands_applied, 3);
    assert_eq!(engine.diagnostics().blocks_processed, 1);
}

/// A continuous parameter ramps over the default window and lands exactly.
#[test]
fn test_engine_parameter_smoothing() {
    let engine = test_engine();
    let gain = engine.add_node(NodeKind::gain(1.0)).unwrap();
    let key = ParamKey::new(gain, ParamId::Gain);
    engine.render(TEST_BLOCK_SIZE).unwrap();

    engine.set_parameter(key, 0.0).unwrap();
    assert_eq!(engine.read_parameter(key), Some(1.0));

    let blocks = engine.config().default_smoothing_blocks;
    let mut seen = Vec::new();
    for _ in 0..blocks {
        engine.render(TEST_BLOCK_SIZE).unwrap();
        seen.push(engine.read_parameter(key).unwrap());
    }

    assert_relative_eq!(seen[0], 0.75, epsilon = FLOAT_EPSILON);
    assert!(seen.windows(2).all(|w| w[1] < w[0]));
    assert_eq!(*seen.last().unwrap(), 0.0);
}

/// Explicit zero-block window jumps at the next block.
#[test]
fn test_engine_parameter_immediate() {
    let engine = test_engine();
    let gain = engine.add_node(NodeKind::gain(1.0)).unwrap();
    let key = ParamKey::new(gain, ParamId::Gain);
    engine.render(TEST_BLOCK_SIZE).unwrap();

    engine.set_parameter_smoothed(key, 2.0, 0).unwrap();
    engine.render(TEST_BLOCK_SIZE).unwrap();
    assert_eq!(engine.read_parameter(key), Some(2.0));
}

/// Discrete parameters never ramp; values are snapped and clamped.
#[test]
fn test_engine_discrete_parameter() {
    let engine = test_engine();
    let (osc, _) = sine_to_sink(&engine, 440.0);
    let key = ParamKey::new(osc, ParamId::Waveform);
    engine.render(TEST_BLOCK_SIZE).unwrap();

    engine.set_parameter(key, 2.2).unwrap();
    engine.render(TEST_BLOCK_SIZE).unwrap();
    assert_eq!(engine.read_parameter(key), Some(2.0));

    engine.set_parameter(key, 99.0).unwrap();
    engine.render(TEST_BLOCK_SIZE).unwrap();
    assert_eq!(engine.read_parameter(key), Some(3.0));
}

#[test]
fn test_engine_unknown_parameter() {
    let engine = test_engine();
    let gain = engine.add_node(NodeKind::gain(1.0)).unwrap();

    let key = ParamKey::new(gain, ParamId::Cutoff);
    assert!(matches!(
        engine.set_parameter(key, 100.0),
        Err(Error::Core(CoreError::UnknownParameter(k))) if k == key
    ));
    assert_eq!(engine.read_parameter(key), None);

    engine.remove_node(gain).unwrap();
    assert_eq!(engine.read_parameter(ParamKey::new(gain, ParamId::Gain)), None);
}

/// Parameter values are readable from other threads while the engine renders.
#[test]
fn test_engine_parameters_cross_thread() {
    let engine = test_engine();
    let gain = engine.add_node(NodeKind::gain(0.5)).unwrap();
    let key = ParamKey::new(gain, ParamId::Gain);
    let store = engine.parameters();

    let reader = std::thread::spawn(move || store.read(&key));
    assert_eq!(reader.join().unwrap(), Some(0.5));

    let shared = Arc::new(engine);
    let renderer = {
        let engine = Arc::clone(&shared);
        std::thread::spawn(move || {
            for _ in 0..8 {
                engine.render(TEST_BLOCK_SIZE).unwrap();
            }
        })
    };
    shared.set_parameter(key, 1.5).unwrap();
    renderer.join().unwrap();
    shared.render(TEST_BLOCK_SIZE * 8).unwrap();
    assert_eq!(shared.read_parameter(key), Some(1.5));
}

/// The command queue is bounded; overflow is reported, not blocking.
#[test]
fn test_engine_queue_full() {
    let engine = OstinatoEngine::builder()
        .command_capacity(2)
        .build()
        .unwrap();

    engine.add_node(NodeKind::gain(1.0)).unwrap();
    engine.add_node(NodeKind::gain(1.0)).unwrap();
    assert!(matches!(
        engine.add_node(NodeKind::gain(1.0)),
        Err(Error::Core(CoreError::QueueFull))
    ));
    assert_eq!(engine.node_count(), 2);
    assert_eq!(engine.diagnostics().commands_dropped, 1);

    engine.render(64).unwrap();
    assert!(engine.add_node(NodeKind::gain(1.0)).is_ok());
}

/// The `graph` closure gives direct controller access.
#[test]
fn test_engine_graph_closure() {
    let engine = test_engine();
    let count = engine.graph(|controller| {
        let osc = controller.add_node(NodeKind::sine(440.0)).unwrap();
        let out = controller.add_node(NodeKind::sink(1)).unwrap();
        controller.connect(Edge::mono(osc, out)).unwrap();
        controller.node_count()
    });
    assert_eq!(count, 2);
    assert_not_silent(&engine.render(256).unwrap(), 0.4, "closure graph");
}

#[test]
fn test_engine_load_meter() {
    let engine = test_engine();
    sine_to_sink(&engine, 440.0);
    for _ in 0..4 {
        engine.render(TEST_BLOCK_SIZE).unwrap();
    }

    let load = engine.load();
    assert!(load.current >= 0.0);
    assert!(load.peak >= load.current);
    assert_eq!(engine.diagnostics().blocks_processed, 4);
}
