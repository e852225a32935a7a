//! Graph mutation commands and the queues that carry them.
//!
//! Three one-way channels connect the control and audio threads:
//!
//! - commands, control -> audio (SPSC ring buffer, applied at block start)
//! - rejection reports, audio -> control (bounded channel, `try_send`)
//! - retired nodes, audio -> control (SPSC ring buffer), so node memory is
//!   always freed on the control thread
//!
//! None of them block or allocate on the audio side.

use crate::diagnostics::Diagnostics;
use crate::error::GraphError;
use crate::graph::{Edge, NodeId};
use crate::node::Node;
use crate::parameter::ParamKey;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::Arc;

/// A graph mutation, consumed exactly once by the audio thread.
#[derive(Debug)]
pub enum Command {
    /// Place a node built on the control thread under `id`.
    AddNode { id: NodeId, node: Box<Node> },
    RemoveNode(NodeId),
    Connect(Edge),
    Disconnect(Edge),
    /// `smoothing: None` uses the parameter's default ramp.
    SetParameter {
        key: ParamKey,
        value: f32,
        smoothing: Option<u32>,
    },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::AddNode { id, .. } => CommandKind::AddNode(*id),
            Command::RemoveNode(id) => CommandKind::RemoveNode(*id),
            Command::Connect(edge) => CommandKind::Connect(*edge),
            Command::Disconnect(edge) => CommandKind::Disconnect(*edge),
            Command::SetParameter { key, .. } => CommandKind::SetParameter(*key),
        }
    }
}

/// Payload-free description of a command, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    AddNode(NodeId),
    RemoveNode(NodeId),
    Connect(Edge),
    Disconnect(Edge),
    SetParameter(ParamKey),
}

/// A command the audio thread refused. Nothing was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub command: CommandKind,
    pub error: GraphError,
}

/// Control side of the command queue.
pub struct CommandProducer {
    producer: HeapProd<Command>,
    diagnostics: Arc<Diagnostics>,
}

impl CommandProducer {
    /// Enqueue without blocking. Returns `false` (and counts a drop) when full.
    #[inline]
    pub fn try_enqueue(&mut self, command: Command) -> bool {
        self.try_push(command).is_ok()
    }

    /// Like [`try_enqueue`](Self::try_enqueue) but hands a refused command back.
    pub fn try_push(&mut self, command: Command) -> Result<(), Command> {
        self.producer.try_push(command).inspect_err(|_| {
            self.diagnostics.record_command_dropped();
        })
    }

    #[inline]
    pub fn free_len(&self) -> usize {
        self.producer.vacant_len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.producer.capacity().get()
    }
}

/// Audio side of the command queue.
pub struct CommandConsumer {
    consumer: HeapCons<Command>,
}

impl CommandConsumer {
    /// Pop up to `n` commands in enqueue order.
    pub fn drain_up_to(&mut self, n: usize) -> impl Iterator<Item = Command> + '_ {
        (0..n).map_while(|_| self.consumer.try_pop())
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }
}

pub fn command_queue(
    capacity: usize,
    diagnostics: Arc<Diagnostics>,
) -> (CommandProducer, CommandConsumer) {
    let (producer, consumer) = HeapRb::<Command>::new(capacity).split();
    (
        CommandProducer {
            producer,
            diagnostics,
        },
        CommandConsumer { consumer },
    )
}

/// Audio side of the report paths: rejections and retired nodes.
pub struct ReportSender {
    rejections: Sender<Rejection>,
    retired: HeapProd<Box<Node>>,
    diagnostics: Arc<Diagnostics>,
}

impl ReportSender {
    pub fn reject(&mut self, command: CommandKind, error: GraphError) {
        if matches!(error, GraphError::CycleDetected(_)) {
            self.diagnostics.record_cycle_rejected();
        } else {
            self.diagnostics.record_mutation_rejected();
        }
        match self.rejections.try_send(Rejection { command, error }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.diagnostics.record_report_dropped();
            }
        }
    }

    /// Hand a node back to the control thread for deallocation.
    pub fn retire(&mut self, node: Box<Node>) {
        // sized for every command that can be in flight, so this does not fail
        // while the control side keeps collecting
        if let Err(node) = self.retired.try_push(node) {
            drop(node);
        }
    }
}

/// Control side of the report paths.
pub struct ReportReceiver {
    rejections: Receiver<Rejection>,
    retired: HeapCons<Box<Node>>,
}

impl ReportReceiver {
    pub fn try_recv(&self) -> Option<Rejection> {
        self.rejections.try_recv().ok()
    }

    /// Free every node the audio thread has handed back. Returns how many.
    pub fn collect_retired(&mut self) -> usize {
        let mut count = 0;
        while let Some(node) = self.retired.try_pop() {
            drop(node);
            count += 1;
        }
        count
    }
}

pub fn report_channel(
    report_capacity: usize,
    retire_capacity: usize,
    diagnostics: Arc<Diagnostics>,
) -> (ReportSender, ReportReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(report_capacity);
    let (retired_tx, retired_rx) = HeapRb::<Box<Node>>::new(retire_capacity).split();
    (
        ReportSender {
            rejections: tx,
            retired: retired_tx,
            diagnostics,
        },
        ReportReceiver {
            rejections: rx,
            retired: retired_rx,
        },
    )
}
