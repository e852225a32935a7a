//! Error types for ostinato-core.
//!
//! Three tiers, matching where a failure can originate:
//!
//! - [`Error`]: configuration and control-side failures, returned synchronously.
//! - [`GraphError`]: a graph mutation that was refused. The graph is unchanged.
//! - Runtime anomalies (non-finite samples, driver underruns) are never errors;
//!   they are clamped on the audio thread and counted in
//!   [`Diagnostics`](crate::Diagnostics).

use crate::graph::{Edge, NodeId};
use crate::parameter::ParamKey;
use thiserror::Error;

/// Error type for ostinato-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Node pool exhausted: {max} live nodes configured")]
    PoolExhausted { max: usize },

    #[error("Invalid node kind: {0}")]
    InvalidNodeKind(#[from] NodeKindError),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(ParamKey),

    #[error("Command queue full")]
    QueueFull,

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "device")]
    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[cfg(feature = "device")]
    #[error("Audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "device")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "device")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// A graph mutation that was refused. Recoverable; nothing was applied.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Port mismatch on {node}: port {port} out of range ({available} available)")]
    PortMismatch {
        node: NodeId,
        port: usize,
        available: usize,
    },

    #[error("Connecting {} -> {} would create a cycle", .0.from.node, .0.to.node)]
    CycleDetected(Edge),

    #[error("Edge already exists: {0}")]
    DuplicateEdge(Edge),

    #[error("No such edge: {0}")]
    UnknownEdge(Edge),

    #[error("Edge limit reached ({max})")]
    EdgeLimit { max: usize },

    #[error("Node pool exhausted ({max})")]
    PoolExhausted { max: usize },

    #[error("Slot for {0} is already occupied")]
    SlotOccupied(NodeId),

    #[error("Unknown parameter {0}")]
    UnknownParameter(ParamKey),
}

/// Errors from building a [`NodeKind`](crate::NodeKind) out of a name and parameter map.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeKindError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Invalid parameter '{0}': {1}")]
    InvalidParameter(String, String),

    #[error("Port count {count} for {kind} outside 1..={max}")]
    PortCount {
        kind: &'static str,
        count: usize,
        max: usize,
    },
}
