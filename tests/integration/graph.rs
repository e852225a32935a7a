//! Audio graph integration tests
//!
//! Tests graph construction, node routing, rejection reports and signal flow.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use ostinato::core::{Error as CoreError, GraphError, NodeParamValue};
use ostinato::prelude::*;
use ostinato::Error;

/// Each added node gets a distinct id immediately.
#[test]
fn test_graph_unique_ids() {
    let engine = test_engine();

    let osc1 = engine.add_node(NodeKind::sine(220.0)).unwrap();
    let osc2 = engine.add_node(NodeKind::sine(440.0)).unwrap();
    let filter = engine.add_node(NodeKind::lowpass(800.0, 0.707)).unwrap();

    assert_ne!(osc1, osc2);
    assert_ne!(osc1, filter);
    assert_eq!(engine.node_count(), 3);
}

/// Nodes created from string-keyed parameter maps.
#[test]
fn test_graph_nodes_from_params() {
    let engine = test_engine();

    let params = ostinato::core::params! { "frequency" => 330.0, "amplitude" => 0.25 };
    let kind = NodeKind::from_params("saw", &params).unwrap();
    assert_eq!(
        kind,
        NodeKind::Oscillator {
            waveform: Waveform::Saw,
            frequency: 330.0,
            amplitude: 0.25,
        }
    );
    let osc = engine.add_node(kind).unwrap();
    let out = engine.add_node(NodeKind::sink(1)).unwrap();
    engine.connect(Edge::mono(osc, out)).unwrap();

    let audio = engine.render(TEST_BLOCK_SIZE).unwrap();
    assert_not_silent(&audio, 0.1, "saw from params");
    assert!(peak(&audio) <= 0.25 + FLOAT_EPSILON);

    let mut bad = ostinato::core::NodeParams::new();
    bad.insert("gain".into(), NodeParamValue::String("loud".into()));
    assert!(NodeKind::from_params("gain", &bad).is_err());
    assert!(NodeKind::from_params("theremin", &bad).is_err());
}

/// A mono sink feeds every output channel.
#[test]
fn test_graph_mono_sink_fills_all_channels() {
    let engine = test_engine();
    sine_to_sink(&engine, 440.0);

    let audio = engine.render(256).unwrap();
    let left = channel(&audio, 2, 0);
    let right = channel(&audio, 2, 1);

    assert_not_silent(&left, 0.4, "left");
    assert_signals_equal(&left, &right, FLOAT_EPSILON, "mono sink");
}

/// Two identical oscillators through a mixer sum to twice one oscillator.
#[test]
fn test_graph_mixer_sums_inputs() {
    let single = test_engine();
    sine_to_sink(&single, 440.0);

    let mixed = test_engine();
    let a = mixed.add_node(NodeKind::sine(440.0)).unwrap();
    let b = mixed.add_node(NodeKind::sine(440.0)).unwrap();
    let mixer = mixed.add_node(NodeKind::mixer(2)).unwrap();
    let out = mixed.add_node(NodeKind::sink(1)).unwrap();
    mixed.connect(Edge::new(a, 0, mixer, 0)).unwrap();
    mixed.connect(Edge::new(b, 0, mixer, 1)).unwrap();
    mixed.connect(Edge::mono(mixer, out)).unwrap();

    let reference: Vec<f32> = single.render(256).unwrap().iter().map(|s| s * 2.0).collect();
    let audio = mixed.render(256).unwrap();
    assert_signals_equal(&audio, &reference, FLOAT_EPSILON, "mixer sum");
}

/// Fan-in: two edges into the same input port are summed.
#[test]
fn test_graph_fan_in_sums() {
    let engine = test_engine();
    let a = engine.add_node(NodeKind::sine(440.0)).unwrap();
    let b = engine.add_node(NodeKind::sine(440.0)).unwrap();
    let out = engine.add_node(NodeKind::sink(1)).unwrap();
    engine.connect(Edge::mono(a, out)).unwrap();
    engine.connect(Edge::mono(b, out)).unwrap();

    let single = test_engine();
    sine_to_sink(&single, 440.0);

    let reference: Vec<f32> = single.render(128).unwrap().iter().map(|s| s * 2.0).collect();
    assert_signals_equal(&engine.render(128).unwrap(), &reference, FLOAT_EPSILON, "fan-in");
}

/// Hard-left pan into a stereo sink leaves the right channel silent.
#[test]
fn test_graph_pan_hard_left() {
    let engine = test_engine();
    let osc = engine.add_node(NodeKind::sine(440.0)).unwrap();
    let pan = engine.add_node(NodeKind::pan(-1.0)).unwrap();
    let out = engine.add_node(NodeKind::sink(2)).unwrap();
    engine.connect(Edge::mono(osc, pan)).unwrap();
    engine.connect(Edge::new(pan, 0, out, 0)).unwrap();
    engine.connect(Edge::new(pan, 1, out, 1)).unwrap();

    let audio = engine.render(256).unwrap();
    assert_not_silent(&channel(&audio, 2, 0), 0.4, "left");
    assert_is_silent(&channel(&audio, 2, 1), SILENCE_THRESHOLD, "right");
}

/// A node nothing reaches a sink through is processed but never heard.
#[test]
fn test_graph_unconnected_is_silent() {
    let engine = test_engine();
    engine.add_node(NodeKind::sine(440.0)).unwrap();
    engine.add_node(NodeKind::sink(1)).unwrap();

    let audio = engine.render(256).unwrap();
    assert_is_silent(&audio, 0.0, "no edges");
}

/// A connection that would close a cycle is refused on the audio thread and
/// reported; the rest of the graph keeps playing.
#[test]
fn test_graph_cycle_rejected() {
    let engine = test_engine();
    let osc = engine.add_node(NodeKind::sine(440.0)).unwrap();
    let a = engine.add_node(NodeKind::gain(1.0)).unwrap();
    let b = engine.add_node(NodeKind::gain(1.0)).unwrap();
    let out = engine.add_node(NodeKind::sink(1)).unwrap();
    engine.connect(Edge::mono(osc, a)).unwrap();
    engine.connect(Edge::mono(a, b)).unwrap();
    engine.connect(Edge::mono(b, out)).unwrap();

    // Accepted by the controller: it cannot see the whole graph
    engine.connect(Edge::mono(b, a)).unwrap();

    let audio = engine.render(256).unwrap();
    assert_not_silent(&audio, 0.4, "graph survives rejection");
    assert_finite(&audio, "cycle attempt");

    let rejections = engine.poll_rejections();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].error, GraphError::CycleDetected(Edge::mono(b, a)));
    assert_eq!(engine.diagnostics().cycles_rejected, 1);
    assert!(engine.poll_rejections().is_empty());
}

/// Removing the middle of a chain cuts the signal and its edges go with it.
#[test]
fn test_graph_remove_middle_node() {
    let engine = test_engine();
    let osc = engine.add_node(NodeKind::sine(440.0)).unwrap();
    let gain = engine.add_node(NodeKind::gain(1.0)).unwrap();
    let out = engine.add_node(NodeKind::sink(1)).unwrap();
    engine.connect(Edge::mono(osc, gain)).unwrap();
    engine.connect(Edge::mono(gain, out)).unwrap();

    assert_not_silent(&engine.render(256).unwrap(), 0.4, "before removal");

    engine.remove_node(gain).unwrap();
    assert!(!engine.contains(gain));
    assert_is_silent(&engine.render(256).unwrap(), 0.0, "after removal");
    assert!(engine.poll_rejections().is_empty());

    // The handle is stale now, even once the slot is reused
    let replacement = engine.add_node(NodeKind::gain(1.0)).unwrap();
    assert_ne!(replacement, gain);
    assert!(matches!(
        engine.connect(Edge::mono(gain, out)),
        Err(Error::Core(CoreError::Graph(GraphError::UnknownNode(id)))) if id == gain
    ));
}

/// Port indices are checked when the connection is requested.
#[test]
fn test_graph_port_mismatch() {
    let engine = test_engine();
    let osc = engine.add_node(NodeKind::sine(440.0)).unwrap();
    let gain = engine.add_node(NodeKind::gain(1.0)).unwrap();

    assert!(matches!(
        engine.connect(Edge::new(osc, 0, gain, 1)),
        Err(Error::Core(CoreError::Graph(GraphError::PortMismatch { port: 1, available: 1, .. })))
    ));
    assert!(matches!(
        engine.connect(Edge::new(osc, 1, gain, 0)),
        Err(Error::Core(CoreError::Graph(GraphError::PortMismatch { port: 1, available: 1, .. })))
    ));
}

/// Disconnecting silences the path at the next block.
#[test]
fn test_graph_disconnect() {
    let engine = test_engine();
    let (osc, out) = sine_to_sink(&engine, 440.0);
    assert_not_silent(&engine.render(128).unwrap(), 0.4, "connected");

    engine.disconnect(Edge::mono(osc, out)).unwrap();
    assert_is_silent(&engine.render(128).unwrap(), 0.0, "disconnected");

    // A second disconnect is refused on the audio thread
    engine.disconnect(Edge::mono(osc, out)).unwrap();
    engine.render(128).unwrap();
    let rejections = engine.poll_rejections();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].error, GraphError::UnknownEdge(Edge::mono(osc, out)));
}

/// The arena is bounded by `max_nodes`.
#[test]
fn test_graph_pool_exhausted() {
    let engine = OstinatoEngine::builder().max_nodes(2).build().unwrap();
    let a = engine.add_node(NodeKind::gain(1.0)).unwrap();
    engine.add_node(NodeKind::gain(1.0)).unwrap();

    assert!(matches!(
        engine.add_node(NodeKind::gain(1.0)),
        Err(Error::Core(CoreError::PoolExhausted { max: 2 }))
    ));

    engine.remove_node(a).unwrap();
    engine.render(64).unwrap();
    assert!(engine.add_node(NodeKind::gain(1.0)).is_ok());
}

/// A runaway branch is zeroed block by block and counted; the healthy branch
/// into the same sink keeps playing.
#[test]
fn test_graph_non_finite_branch_is_clamped() {
    let engine = OstinatoEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .max_block_size(TEST_BLOCK_SIZE)
        .commands_per_block(256)
        .build()
        .unwrap();
    let (_, out) = sine_to_sink(&engine, 440.0);

    // 0.5 * 4^80 overflows f32
    let mut prev = engine.add_node(NodeKind::sine(440.0)).unwrap();
    for _ in 0..80 {
        let gain = engine.add_node(NodeKind::gain(4.0)).unwrap();
        engine.connect(Edge::mono(prev, gain)).unwrap();
        prev = gain;
    }
    engine.connect(Edge::mono(prev, out)).unwrap();

    let reference = test_engine();
    sine_to_sink(&reference, 440.0);

    let audio = engine.render(TEST_BLOCK_SIZE * 4).unwrap();
    assert_finite(&audio, "clamped graph");
    assert_signals_equal(
        &audio,
        &reference.render(TEST_BLOCK_SIZE * 4).unwrap(),
        FLOAT_EPSILON,
        "healthy branch",
    );

    let diagnostics = engine.diagnostics();
    assert_eq!(diagnostics.non_finite_clamps, 4);
    assert_eq!(diagnostics.blocks_processed, 4);
    assert!(engine.poll_rejections().is_empty());
}
