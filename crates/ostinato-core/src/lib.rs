//! Real-time audio signal graph kernel.
//!
//! # Primary API
//!
//! - [`Controller`]: control-thread handle; every graph mutation goes through it
//! - [`Scheduler`]: audio-thread half; a driver calls [`Scheduler::request_block`]
//! - [`NodeKind`]: the closed set of processing nodes
//! - [`ParameterStore`]: lock-free parameter lookup for UI readers
//! - [`TransportReader`], [`Diagnostics`]: clock and counters
//!
//! # Feature-gated APIs
//!
//! - `"device"`: [`AudioDevice`], a CPAL output driver
//!
//! # Example
//!
//! ```
//! use ostinato_core::{Controller, Edge, NodeKind};
//!
//! let (mut controller, mut scheduler) = Controller::new()?;
//! let osc = controller.add_node(NodeKind::sine(440.0))?;
//! let out = controller.add_node(NodeKind::sink(1))?;
//! controller.connect(Edge::mono(osc, out))?;
//!
//! let mut buffer = vec![0.0f32; 256 * 2];
//! scheduler.request_block(&mut buffer, 2, 48000.0);
//! assert_eq!(controller.read_transport_position(), 256);
//! # Ok::<(), ostinato_core::Error>(())
//! ```

pub mod error;
pub use error::{Error, GraphError, NodeKindError, Result};

pub mod config;
pub use config::{EngineConfig, MAX_BLOCK_SIZE};

pub(crate) mod lockfree;
pub use lockfree::{AtomicFlag, AtomicFloat};

pub mod parameter;
pub use parameter::{ParamId, ParamKey, ParamSpec, ParameterRange, ParameterScale};

pub mod smooth;
pub use smooth::{BlockSmoother, Ramp};

pub mod store;
pub use store::{ParamSlot, ParameterStore, SharedParam};

pub mod node;
pub use node::{
    FilterMode, Node, NodeKind, NodeParamValue, NodeParams, NoteValue, ProcessContext,
    ReverbPreset, Waveform, MAX_INPUTS, MAX_OUTPUTS,
};

pub mod graph;
pub use graph::{AudioBlock, BufferPool, Edge, NodeId, OutputBus, Port, SignalGraph};

pub mod command;
pub use command::{
    command_queue, report_channel, Command, CommandConsumer, CommandKind, CommandProducer,
    Rejection, ReportReceiver, ReportSender,
};

mod diagnostics;
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot, LoadMeter, LoadMetrics};

mod transport;
pub use transport::{TransportClock, TransportReader};

mod scheduler;
pub use scheduler::{scheduler_handoff, PendingScheduler, Scheduler, SchedulerSender, SchedulerState};

mod controller;
pub use controller::Controller;

#[cfg(feature = "device")]
mod output;

#[cfg(feature = "device")]
pub use output::AudioDevice;
