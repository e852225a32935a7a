//! Audio-thread side of the engine.
//!
//! The driver calls [`Scheduler::request_block`] once per callback. Each pass
//! applies pending commands, walks the graph in dependency order, writes the
//! mix into the driver buffer and advances the transport clock. Requests
//! longer than `max_block_size` are split into sub-blocks.
//!
//! Nothing in here blocks, allocates or logs.

use crate::command::{Command, CommandConsumer, ReportSender};
use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::GraphError;
use crate::graph::{OutputBus, SignalGraph};
use crate::node::ProcessContext;
use crate::transport::TransportClock;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    ApplyingCommands,
    Processing,
}

pub struct Scheduler {
    graph: SignalGraph,
    bus: OutputBus,
    commands: CommandConsumer,
    reports: ReportSender,
    clock: TransportClock,
    diagnostics: Arc<Diagnostics>,
    state: SchedulerState,
    max_block_size: usize,
    commands_per_block: usize,
}

impl Scheduler {
    pub(crate) fn new(
        config: &EngineConfig,
        commands: CommandConsumer,
        reports: ReportSender,
        clock: TransportClock,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            graph: SignalGraph::with_config(config),
            bus: OutputBus::new(config.channels, config.max_block_size),
            commands,
            reports,
            clock,
            diagnostics,
            state: SchedulerState::Idle,
            max_block_size: config.max_block_size,
            commands_per_block: config.commands_per_block,
        }
    }

    #[inline]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    #[inline]
    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.bus.channels()
    }

    /// Fill `output` (interleaved, `channels` wide) with the next frames.
    ///
    /// A trailing partial frame is zeroed.
    pub fn request_block(&mut self, output: &mut [f32], channels: usize, sample_rate: f64) {
        if channels == 0 {
            output.fill(0.0);
            return;
        }
        let frames = output.len() / channels;
        self.clock.set_sample_rate(sample_rate);

        let mut done = 0;
        while done < frames {
            let n = (frames - done).min(self.max_block_size);
            let chunk = &mut output[done * channels..(done + n) * channels];
            self.run_block(chunk, n, channels, sample_rate);
            done += n;
        }
        output[frames * channels..].fill(0.0);
    }

    fn run_block(&mut self, out: &mut [f32], frames: usize, channels: usize, sample_rate: f64) {
        let started = Instant::now();

        self.state = SchedulerState::ApplyingCommands;
        self.apply_commands();

        self.state = SchedulerState::Processing;
        let ctx = ProcessContext {
            frames,
            sample_rate,
        };
        self.bus.clear(frames);
        let clamped = self.graph.process(&ctx, &mut self.bus);
        self.diagnostics.record_non_finite(clamped);
        self.bus.write_interleaved(out, frames, channels);

        self.clock.advance(frames);
        self.diagnostics.record_block();
        self.diagnostics
            .load()
            .record(frames, sample_rate, started.elapsed());
        self.state = SchedulerState::Idle;
    }

    fn apply_commands(&mut self) {
        let Self {
            graph,
            commands,
            reports,
            diagnostics,
            commands_per_block,
            ..
        } = self;

        for command in commands.drain_up_to(*commands_per_block) {
            let kind = command.kind();
            let applied = match command {
                Command::AddNode { id, node } => match graph.check_vacant(id) {
                    Ok(()) => {
                        graph.place(id, node);
                        Ok(())
                    }
                    Err(error) => {
                        reports.retire(node);
                        Err(error)
                    }
                },
                Command::RemoveNode(id) => graph.remove_node(id).map(|node| reports.retire(node)),
                Command::Connect(edge) => graph.connect(edge),
                Command::Disconnect(edge) => graph.disconnect(edge),
                Command::SetParameter {
                    key,
                    value,
                    smoothing,
                } => match graph.node(key.node) {
                    None => Err(GraphError::UnknownNode(key.node)),
                    Some(node) => match node.param(key.param) {
                        None => Err(GraphError::UnknownParameter(key)),
                        Some(param) => {
                            match smoothing {
                                Some(blocks) => param.set_smoothed(value, blocks),
                                None => param.set(value),
                            }
                            Ok(())
                        }
                    },
                },
            };

            match applied {
                Ok(()) => diagnostics.record_command_applied(),
                Err(error) => reports.reject(kind, error),
            }
        }
    }
}

/// Sending half of a one-slot scheduler handoff.
pub type SchedulerSender = HeapProd<Scheduler>;

/// Scheduler slot for a driver callback that is built before it owns a
/// scheduler. Renders silence until one arrives, then keeps it.
///
/// Lets a driver build and start its stream first and hand the scheduler
/// over only once that succeeded; on failure the caller still owns it.
pub struct PendingScheduler {
    inbox: HeapCons<Scheduler>,
    scheduler: Option<Scheduler>,
}

pub fn scheduler_handoff() -> (SchedulerSender, PendingScheduler) {
    let (sender, inbox) = HeapRb::<Scheduler>::new(1).split();
    (
        sender,
        PendingScheduler {
            inbox,
            scheduler: None,
        },
    )
}

impl PendingScheduler {
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.scheduler.is_some()
    }

    pub fn request_block(&mut self, output: &mut [f32], channels: usize, sample_rate: f64) {
        if self.scheduler.is_none() {
            self.scheduler = self.inbox.try_pop();
        }
        match self.scheduler.as_mut() {
            Some(scheduler) => scheduler.request_block(output, channels, sample_rate),
            None => output.fill(0.0),
        }
    }
}
