//! Control-thread side of the engine.
//!
//! The [`Controller`] is the only way to mutate the graph. It keeps a mirror
//! of which arena slots are in use, so [`Controller::add_node`] can hand out a
//! [`NodeId`] immediately and obvious mistakes (unknown node, bad port, full
//! arena) fail synchronously. Anything that needs the real graph to decide,
//! such as cycle detection, is checked on the audio thread and comes back
//! through [`Controller::poll_rejections`].

use crate::command::{
    command_queue, report_channel, Command, CommandKind, CommandProducer, Rejection,
    ReportReceiver,
};
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot};
use crate::error::{Error, GraphError, Result};
use crate::graph::{Edge, NodeId};
use crate::node::{Node, NodeKind};
use crate::parameter::ParamKey;
use crate::scheduler::Scheduler;
use crate::store::{ParameterStore, SharedParam};
use crate::transport::{TransportClock, TransportReader};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
struct MirrorSlot {
    generation: u32,
    /// (inputs, outputs) while a node occupies the slot.
    ports: Option<(usize, usize)>,
}

pub struct Controller {
    config: EngineConfig,
    commands: CommandProducer,
    reports: ReportReceiver,
    params: Arc<ParameterStore>,
    transport: TransportReader,
    diagnostics: Arc<Diagnostics>,
    slots: Vec<MirrorSlot>,
    live: usize,
}

impl Controller {
    /// Create a controller and the scheduler it drives.
    ///
    /// The scheduler goes to whatever thread runs the audio callback.
    pub fn with_config(config: EngineConfig) -> Result<(Self, Scheduler)> {
        config.validate()?;

        let diagnostics = Arc::new(Diagnostics::new());
        let (producer, consumer) =
            command_queue(config.command_capacity, Arc::clone(&diagnostics));
        let (sender, receiver) = report_channel(
            config.report_capacity,
            config.command_capacity + config.max_nodes,
            Arc::clone(&diagnostics),
        );
        let clock = TransportClock::new(config.sample_rate);
        let transport = clock.reader();

        let scheduler = Scheduler::new(
            &config,
            consumer,
            sender,
            clock,
            Arc::clone(&diagnostics),
        );

        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            max_block_size = config.max_block_size,
            max_nodes = config.max_nodes,
            "Audio engine created"
        );

        let controller = Self {
            slots: vec![MirrorSlot::default(); config.max_nodes],
            config,
            commands: producer,
            reports: receiver,
            params: Arc::new(ParameterStore::new()),
            transport,
            diagnostics,
            live: 0,
        };
        Ok((controller, scheduler))
    }

    pub fn new() -> Result<(Self, Scheduler)> {
        Self::with_config(EngineConfig::default())
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Nodes added and not removed, as seen from the control side.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.live
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ports(id).is_some()
    }

    fn ports(&self, id: NodeId) -> Option<(usize, usize)> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.ports)
    }

    fn require(&self, id: NodeId) -> Result<(usize, usize)> {
        self.ports(id)
            .ok_or_else(|| GraphError::UnknownNode(id).into())
    }

    fn occupy(&mut self, id: NodeId, ports: (usize, usize), params: &[Arc<SharedParam>]) {
        self.slots[id.index()].ports = Some(ports);
        self.live += 1;
        self.params.register(id, params);
    }

    fn release(&mut self, id: NodeId) {
        let slot = &mut self.slots[id.index()];
        if slot.generation == id.generation() && slot.ports.take().is_some() {
            slot.generation = slot.generation.wrapping_add(1);
            self.live -= 1;
            self.params.unregister(id);
        }
    }

    /// Build a node and queue it for insertion. The returned id is valid at once;
    /// the node starts processing at the next block boundary.
    pub fn add_node(&mut self, kind: NodeKind) -> Result<NodeId> {
        self.collect_garbage();

        let index = self
            .slots
            .iter()
            .position(|slot| slot.ports.is_none())
            .ok_or(Error::PoolExhausted {
                max: self.config.max_nodes,
            })?;
        let node = Node::build(
            kind,
            self.config.sample_rate,
            self.config.default_smoothing_blocks,
        )?;

        let id = NodeId::new(index as u32, self.slots[index].generation);
        let params: Vec<_> = node.shared_params().cloned().collect();
        let ports = (node.inputs(), node.outputs());
        let name = node.kind().name();

        if self
            .commands
            .try_push(Command::AddNode {
                id,
                node: Box::new(node),
            })
            .is_err()
        {
            warn!(kind = name, "Command queue full, node not added");
            return Err(Error::QueueFull);
        }

        self.occupy(id, ports, &params);
        debug!(%id, kind = name, "Node queued");
        Ok(id)
    }

    /// Queue removal of a node and its edges.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.collect_garbage();
        self.require(id)?;
        self.push(Command::RemoveNode(id))?;
        self.release(id);
        debug!(%id, "Node removal queued");
        Ok(())
    }

    /// Queue a connection. Port ranges are checked here; cycles are checked by
    /// the audio thread and reported through [`poll_rejections`](Self::poll_rejections).
    pub fn connect(&mut self, edge: Edge) -> Result<()> {
        let (_, outputs) = self.require(edge.from.node)?;
        if edge.from.port >= outputs {
            return Err(GraphError::PortMismatch {
                node: edge.from.node,
                port: edge.from.port,
                available: outputs,
            }
            .into());
        }
        let (inputs, _) = self.require(edge.to.node)?;
        if edge.to.port >= inputs {
            return Err(GraphError::PortMismatch {
                node: edge.to.node,
                port: edge.to.port,
                available: inputs,
            }
            .into());
        }
        self.push(Command::Connect(edge))?;
        debug!(%edge, "Connection queued");
        Ok(())
    }

    pub fn disconnect(&mut self, edge: Edge) -> Result<()> {
        self.require(edge.from.node)?;
        self.require(edge.to.node)?;
        self.push(Command::Disconnect(edge))?;
        debug!(%edge, "Disconnection queued");
        Ok(())
    }

    fn push(&mut self, command: Command) -> Result<()> {
        self.commands.try_push(command).map_err(|command| {
            warn!(command = ?command.kind(), "Command queue full");
            Error::QueueFull
        })
    }

    /// Set a parameter target. Continuous parameters ramp over the configured
    /// default number of blocks; discrete ones switch at the next block.
    pub fn set_parameter(&self, key: ParamKey, value: f32) -> Result<()> {
        let param = self.params.get(&key).ok_or(Error::UnknownParameter(key))?;
        param.set(value);
        Ok(())
    }

    /// Set a parameter target reached after `blocks` blocks (0 = next block).
    pub fn set_parameter_smoothed(&self, key: ParamKey, value: f32, blocks: u32) -> Result<()> {
        let param = self.params.get(&key).ok_or(Error::UnknownParameter(key))?;
        param.set_smoothed(value, blocks);
        Ok(())
    }

    /// Value the audio thread reached at the end of the last block.
    pub fn read_parameter(&self, key: ParamKey) -> Option<f32> {
        self.params.read(&key)
    }

    /// Shared parameter map, for UI readers on other threads.
    pub fn parameters(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Enqueue a raw command. Returns `false` if the queue was full.
    ///
    /// Node additions and removals update the control-side bookkeeping the
    /// same way the typed helpers do.
    pub fn enqueue_command(&mut self, command: Command) -> bool {
        self.collect_garbage();

        let added = match &command {
            Command::AddNode { id, node } => Some((
                *id,
                (node.inputs(), node.outputs()),
                node.shared_params().cloned().collect::<Vec<_>>(),
            )),
            _ => None,
        };
        let removed = match &command {
            Command::RemoveNode(id) => Some(*id),
            _ => None,
        };

        if !self.commands.try_enqueue(command) {
            warn!("Command queue full");
            return false;
        }

        if let Some((id, ports, params)) = added {
            let vacant = self
                .slots
                .get(id.index())
                .is_some_and(|slot| slot.ports.is_none() && slot.generation == id.generation());
            if vacant {
                self.occupy(id, ports, &params);
            }
        }
        if let Some(id) = removed {
            self.release(id);
        }
        true
    }

    /// Drain rejection reports from the audio thread, logging each one.
    ///
    /// A rejected node addition frees its slot here.
    pub fn poll_rejections(&mut self) -> Vec<Rejection> {
        self.collect_garbage();

        let mut rejections = Vec::new();
        while let Some(rejection) = self.reports.try_recv() {
            warn!(command = ?rejection.command, error = %rejection.error, "Graph mutation rejected");
            if let CommandKind::AddNode(id) = rejection.command {
                self.release(id);
            }
            rejections.push(rejection);
        }
        rejections
    }

    /// Free nodes the audio thread has retired.
    pub fn collect_garbage(&mut self) -> usize {
        let freed = self.reports.collect_retired();
        if freed > 0 {
            debug!(freed, "Retired nodes freed");
        }
        freed
    }

    pub fn transport(&self) -> TransportReader {
        self.transport.clone()
    }

    #[inline]
    pub fn read_transport_position(&self) -> u64 {
        self.transport.position()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Shared counters, for drivers that report underruns.
    pub fn diagnostics_handle(&self) -> Arc<Diagnostics> {
        Arc::clone(&self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Waveform;
    use crate::parameter::ParamId;

    fn small() -> EngineConfig {
        EngineConfig {
            max_nodes: 3,
            max_block_size: 64,
            command_capacity: 4,
            commands_per_block: 4,
            default_smoothing_blocks: 2,
            ..Default::default()
        }
    }

    fn render(scheduler: &mut Scheduler) {
        let mut out = vec![0.0; 128];
        scheduler.request_block(&mut out, 2, 48000.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            max_block_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            Controller::with_config(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_pool_exhausted_at_add_time() {
        let (mut controller, _scheduler) = Controller::with_config(small()).unwrap();
        for _ in 0..3 {
            controller.add_node(NodeKind::gain(1.0)).unwrap();
        }
        assert!(matches!(
            controller.add_node(NodeKind::gain(1.0)),
            Err(Error::PoolExhausted { max: 3 })
        ));
    }

    #[test]
    fn test_invalid_kind_rejected() {
        let (mut controller, _scheduler) = Controller::with_config(small()).unwrap();
        assert!(matches!(
            controller.add_node(NodeKind::sink(0)),
            Err(Error::InvalidNodeKind(_))
        ));
        assert_eq!(controller.node_count(), 0);
    }

    #[test]
    fn test_queue_full_reports_backpressure() {
        let (mut controller, mut scheduler) = Controller::with_config(small()).unwrap();
        let a = controller.add_node(NodeKind::sine(220.0)).unwrap();
        let b = controller.add_node(NodeKind::gain(1.0)).unwrap();
        controller.connect(Edge::mono(a, b)).unwrap();
        controller.disconnect(Edge::mono(a, b)).unwrap();

        assert!(matches!(
            controller.connect(Edge::mono(a, b)),
            Err(Error::QueueFull)
        ));
        assert_eq!(controller.diagnostics().commands_dropped, 1);

        render(&mut scheduler);
        controller.connect(Edge::mono(a, b)).unwrap();
    }

    #[test]
    fn test_synchronous_graph_checks() {
        let (mut controller, _scheduler) = Controller::with_config(small()).unwrap();
        let osc = controller.add_node(NodeKind::oscillator(Waveform::Square, 100.0)).unwrap();
        let pan = controller.add_node(NodeKind::pan(0.0)).unwrap();

        assert!(matches!(
            controller.connect(Edge::new(pan, 2, osc, 0)),
            Err(Error::Graph(GraphError::PortMismatch { port: 2, available: 2, .. }))
        ));
        assert!(matches!(
            controller.connect(Edge::mono(pan, osc)),
            Err(Error::Graph(GraphError::PortMismatch { available: 0, .. }))
        ));

        controller.remove_node(osc).unwrap();
        assert!(matches!(
            controller.remove_node(osc),
            Err(Error::Graph(GraphError::UnknownNode(id))) if id == osc
        ));
        assert!(matches!(
            controller.connect(Edge::mono(osc, pan)),
            Err(Error::Graph(GraphError::UnknownNode(_)))
        ));
    }

    #[test]
    fn test_removed_slot_is_reused_with_new_generation() {
        let (mut controller, mut scheduler) = Controller::with_config(small()).unwrap();
        let a = controller.add_node(NodeKind::gain(1.0)).unwrap();
        controller.remove_node(a).unwrap();
        let b = controller.add_node(NodeKind::gain(1.0)).unwrap();
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);

        render(&mut scheduler);
        assert!(scheduler.graph().contains(b));
        assert!(!scheduler.graph().contains(a));
        assert!(controller.poll_rejections().is_empty());
        assert_eq!(controller.collect_garbage(), 0);
    }

    #[test]
    fn test_parameters() {
        let (mut controller, mut scheduler) = Controller::with_config(small()).unwrap();
        let gain = controller.add_node(NodeKind::gain(1.0)).unwrap();
        let key = ParamKey::new(gain, ParamId::Gain);
        assert_eq!(controller.read_parameter(key), Some(1.0));

        controller.set_parameter(key, 0.0).unwrap();
        render(&mut scheduler);
        assert_eq!(controller.read_parameter(key), Some(0.5));
        render(&mut scheduler);
        assert_eq!(controller.read_parameter(key), Some(0.0));

        let missing = ParamKey::new(gain, ParamId::Cutoff);
        assert!(matches!(
            controller.set_parameter(missing, 1.0),
            Err(Error::UnknownParameter(k)) if k == missing
        ));

        controller.remove_node(gain).unwrap();
        assert_eq!(controller.read_parameter(key), None);
    }

    #[test]
    fn test_removed_nodes_come_back_for_freeing() {
        let (mut controller, mut scheduler) = Controller::with_config(small()).unwrap();
        let a = controller.add_node(NodeKind::delay(0.5, 0.2, 0.5)).unwrap();
        render(&mut scheduler);
        controller.remove_node(a).unwrap();
        render(&mut scheduler);
        assert_eq!(controller.collect_garbage(), 1);
    }
}
