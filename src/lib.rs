//! # Ostinato - Real-time Audio Signal Graph Engine
//!
//! A directed acyclic graph of audio nodes, mutated from a control thread and
//! rendered on an audio thread without locks or allocation.
//!
//! ## Architecture
//!
//! Ostinato is an umbrella crate over:
//! - **ostinato-core** - Node arena, command queue, parameters, scheduler, transport
//!
//! The control side ([`core::Controller`]) queues mutations; the audio side
//! ([`core::Scheduler`]) applies them at block boundaries, processes nodes in
//! dependency order and mixes sink nodes into the output buffer.
//!
//! ## Quick Start
//!
//! ```
//! use ostinato::prelude::*;
//!
//! let engine = OstinatoEngine::builder().sample_rate(48000.0).build()?;
//!
//! let osc = engine.add_node(NodeKind::sine(440.0))?;
//! let gain = engine.add_node(NodeKind::gain(0.5))?;
//! let out = engine.add_node(NodeKind::sink(1))?;
//! engine.connect(Edge::mono(osc, gain))?;
//! engine.connect(Edge::mono(gain, out))?;
//!
//! let audio = engine.render(256)?;
//! assert!(audio.iter().all(|s| s.is_finite()));
//!
//! engine.set_parameter(ParamKey::new(gain, ParamId::Gain), 0.25)?;
//! # Ok::<(), ostinato::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Offline rendering only
//! - `device` - Hardware output through CPAL

/// Re-export of ostinato-core for direct access
pub use ostinato_core as core;

pub use ostinato_core::{
    // Lock-free primitives
    AtomicFlag,
    AtomicFloat,

    // Engine halves
    Controller,
    EngineConfig,
    Scheduler,
    SchedulerState,

    // Graph
    Edge,
    FilterMode,
    GraphError,
    NodeId,
    NodeKind,
    NoteValue,
    Rejection,
    ReverbPreset,
    SignalGraph,
    Waveform,

    // Parameters
    BlockSmoother,
    ParamId,
    ParamKey,
    ParameterRange,
    ParameterScale,
    ParameterStore,
    Ramp,

    // Transport and diagnostics
    DiagnosticsSnapshot,
    LoadMetrics,
    TransportReader,
};

#[cfg(feature = "device")]
pub use ostinato_core::AudioDevice;

mod builder;
mod engine;
mod error;

pub use builder::OstinatoEngineBuilder;
pub use engine::OstinatoEngine;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{OstinatoEngine, OstinatoEngineBuilder};

    // Graph
    pub use crate::core::{Edge, FilterMode, NodeId, NodeKind, NoteValue, ReverbPreset, Waveform};

    // Parameters
    pub use crate::core::{ParamId, ParamKey};

    // Transport
    pub use crate::core::TransportReader;
}
