//! Signal graph: a node arena, the edge list and the processing schedule.
//!
//! The graph is owned by the audio thread. All storage (arena slots, edge
//! list, order cache, traversal stacks, audio buffers) is sized at construction,
//! so mutations applied between blocks never allocate.

mod buffer;
mod edge;
mod id;
mod order;

pub use buffer::{AudioBlock, BufferPool, OutputBus};
pub use edge::{Edge, Port};
pub use id::NodeId;

use crate::config::EngineConfig;
use crate::error::GraphError;
use crate::node::{Node, ProcessContext};
use order::Traversal;

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Box<Node>>,
}

/// Incoming connection of a scheduled node: which output block feeds which port.
#[derive(Debug, Clone, Copy)]
struct Feed {
    source: usize,
    port: usize,
}

#[derive(Debug)]
pub struct SignalGraph {
    slots: Vec<Slot>,
    live: usize,
    edges: Vec<Edge>,
    max_edges: usize,
    order: Vec<usize>,
    feeds: Vec<Feed>,
    spans: Vec<(usize, usize)>,
    dirty: bool,
    traversal: Traversal,
    pool: BufferPool,
}

impl SignalGraph {
    pub fn new(max_nodes: usize, max_edges: usize, block_size: usize) -> Self {
        Self {
            slots: (0..max_nodes).map(|_| Slot::default()).collect(),
            live: 0,
            edges: Vec::with_capacity(max_edges),
            max_edges,
            order: Vec::with_capacity(max_nodes),
            feeds: Vec::with_capacity(max_edges),
            spans: Vec::with_capacity(max_nodes),
            dirty: false,
            traversal: Traversal::new(max_nodes),
            pool: BufferPool::new(max_nodes, block_size),
        }
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self::new(config.max_nodes, config.max_edges, config.max_block_size)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.pool.block_size()
    }

    /// Whether the cached order is stale.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots
            .get(id.index())
            .is_some_and(|slot| slot.generation == id.generation() && slot.node.is_some())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_deref()
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_deref_mut()
    }

    /// Add a node in the first free slot.
    pub fn add_node(&mut self, node: Box<Node>) -> Result<NodeId, GraphError> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.node.is_none())
            .ok_or(GraphError::PoolExhausted {
                max: self.slots.len(),
            })?;
        let id = NodeId::new(index as u32, self.slots[index].generation);
        self.place(id, node);
        Ok(id)
    }

    /// Check that a node can be placed under `id`.
    pub fn check_vacant(&self, id: NodeId) -> Result<(), GraphError> {
        match self.slots.get(id.index()) {
            None => Err(GraphError::PoolExhausted {
                max: self.slots.len(),
            }),
            Some(slot) if slot.node.is_some() => Err(GraphError::SlotOccupied(id)),
            Some(_) => Ok(()),
        }
    }

    /// Place a node under a handle allocated elsewhere. The slot must be vacant
    /// ([`check_vacant`](Self::check_vacant)).
    pub(crate) fn place(&mut self, id: NodeId, mut node: Box<Node>) {
        debug_assert!(self.check_vacant(id).is_ok());
        node.set_id(id);
        let slot = &mut self.slots[id.index()];
        slot.generation = id.generation();
        slot.node = Some(node);
        self.live += 1;
        self.dirty = true;
    }

    /// Remove a node and every edge touching it. The node is handed back so
    /// the caller decides where it is freed.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Box<Node>, GraphError> {
        if !self.contains(id) {
            return Err(GraphError::UnknownNode(id));
        }
        let slot = &mut self.slots[id.index()];
        let node = slot.node.take().ok_or(GraphError::UnknownNode(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;

        self.edges.retain(|edge| !edge.touches(id));
        self.pool.clear_outputs(id.index());
        self.dirty = true;
        Ok(node)
    }

    /// Add an edge after checking it keeps the graph a valid DAG.
    pub fn connect(&mut self, edge: Edge) -> Result<(), GraphError> {
        let from = self
            .node(edge.from.node)
            .ok_or(GraphError::UnknownNode(edge.from.node))?;
        if edge.from.port >= from.outputs() {
            return Err(GraphError::PortMismatch {
                node: edge.from.node,
                port: edge.from.port,
                available: from.outputs(),
            });
        }
        let to = self
            .node(edge.to.node)
            .ok_or(GraphError::UnknownNode(edge.to.node))?;
        if edge.to.port >= to.inputs() {
            return Err(GraphError::PortMismatch {
                node: edge.to.node,
                port: edge.to.port,
                available: to.inputs(),
            });
        }
        if self.edges.contains(&edge) {
            return Err(GraphError::DuplicateEdge(edge));
        }
        if self.edges.len() >= self.max_edges {
            return Err(GraphError::EdgeLimit {
                max: self.max_edges,
            });
        }
        // a new edge from -> to closes a cycle iff `to` already reaches `from`
        if self
            .traversal
            .reaches(edge.to.node.index(), edge.from.node.index(), &self.edges)
        {
            return Err(GraphError::CycleDetected(edge));
        }

        self.edges.push(edge);
        self.dirty = true;
        Ok(())
    }

    pub fn disconnect(&mut self, edge: Edge) -> Result<(), GraphError> {
        let position = self
            .edges
            .iter()
            .position(|e| *e == edge)
            .ok_or(GraphError::UnknownEdge(edge))?;
        // keep edge order (and therefore summing order) stable
        self.edges.remove(position);
        self.dirty = true;
        Ok(())
    }

    /// Recompute the order and fan-in schedule if the topology changed.
    pub fn refresh(&mut self) {
        if !self.dirty {
            return;
        }
        let slots = &self.slots;
        let acyclic = self.traversal.sort(
            |index| slots[index].node.is_some(),
            &self.edges,
            &mut self.order,
        );
        debug_assert!(acyclic, "edge set contains a cycle");

        self.feeds.clear();
        self.spans.clear();
        for &slot in &self.order {
            let start = self.feeds.len();
            for edge in self.edges.iter().filter(|e| e.to.node.index() == slot) {
                self.feeds.push(Feed {
                    source: BufferPool::output_index(edge.from.node.index(), edge.from.port),
                    port: edge.to.port,
                });
            }
            self.spans.push((start, self.feeds.len()));
        }
        self.dirty = false;
    }

    /// Current processing order. Allocates; meant for inspection.
    pub fn topological_order(&mut self) -> Vec<NodeId> {
        self.refresh();
        self.order
            .iter()
            .map(|&index| NodeId::new(index as u32, self.slots[index].generation))
            .collect()
    }

    /// Output block of a node port from the last processed block.
    pub fn output(&self, id: NodeId, port: usize) -> Option<&AudioBlock> {
        let node = self.node(id)?;
        (port < node.outputs()).then(|| self.pool.output(id.index(), port))
    }

    /// Run every node once, in dependency order, adding sink output into `bus`.
    ///
    /// Returns how many blocks were zeroed for holding non-finite samples.
    pub fn process(&mut self, ctx: &ProcessContext, bus: &mut OutputBus) -> u64 {
        self.refresh();
        let frames = ctx.frames;
        let mut clamped = 0;

        let Self {
            slots,
            order,
            feeds,
            spans,
            pool,
            ..
        } = self;

        for (&index, &(start, end)) in order.iter().zip(spans.iter()) {
            let Some(node) = slots[index].node.as_deref_mut() else {
                continue;
            };
            let feeds = &feeds[start..end];
            for port in 0..node.inputs() {
                let sources = feeds.iter().filter(|f| f.port == port).map(|f| f.source);
                pool.gather(port, sources, frames);
            }

            let (inputs, outputs) = pool.split(index, node.inputs());
            node.process(ctx, inputs, outputs, bus);

            for block in outputs.iter_mut().take(node.outputs()) {
                if block.zero_if_non_finite(frames) {
                    clamped += 1;
                }
            }
        }

        clamped + bus.sanitize(frames)
    }
}
