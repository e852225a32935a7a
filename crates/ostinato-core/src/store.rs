//! Parameter store shared between the control and audio threads.
//!
//! Each parameter lives in a [`SharedParam`]: the control side writes a target,
//! the audio side ramps toward it and publishes the value it reached at the end
//! of every block. Neither side ever blocks on the other.
//!
//! The control side also keeps a key -> parameter map ([`ParameterStore`]) so a
//! UI can look values up by key. The map is an `ArcSwap` snapshot: readers load
//! it without locking, writers (node creation and removal) replace it.

use crate::graph::NodeId;
use crate::lockfree::AtomicFloat;
use crate::parameter::{ParamId, ParamKey, ParamSpec, ParameterRange};
use crate::smooth::{BlockSmoother, Ramp};
use arc_swap::ArcSwap;
use hashbrown::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// One parameter, readable and writable from either thread.
#[derive(Debug)]
pub struct SharedParam {
    id: ParamId,
    range: ParameterRange,
    target: AtomicFloat,
    current: AtomicFloat,
    smoothing_blocks: AtomicU32,
    default_smoothing: u32,
}

impl SharedParam {
    pub fn new(spec: &ParamSpec, default_smoothing: u32) -> Self {
        Self {
            id: spec.id,
            range: spec.range,
            target: AtomicFloat::new(spec.initial),
            current: AtomicFloat::new(spec.initial),
            smoothing_blocks: AtomicU32::new(0),
            default_smoothing: if spec.range.is_discrete() {
                0
            } else {
                default_smoothing
            },
        }
    }

    #[inline]
    pub fn id(&self) -> ParamId {
        self.id
    }

    #[inline]
    pub fn range(&self) -> &ParameterRange {
        &self.range
    }

    /// Set a new target using the parameter's default ramp length.
    pub fn set(&self, value: f32) {
        self.set_smoothed(value, self.default_smoothing);
    }

    /// Set a new target reached after `blocks` blocks. Discrete parameters ignore
    /// `blocks` and switch at the next block boundary.
    pub fn set_smoothed(&self, value: f32, blocks: u32) {
        let blocks = if self.range.is_discrete() { 0 } else { blocks };
        // window first: the audio side reads it after observing the target
        self.smoothing_blocks.store(blocks, Ordering::Relaxed);
        self.target.set(self.range.sanitize(value));
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target.get()
    }

    /// Value published by the audio thread at the end of the last block.
    #[inline]
    pub fn current(&self) -> f32 {
        self.current.get()
    }

    #[inline]
    pub fn default_smoothing(&self) -> u32 {
        self.default_smoothing
    }
}

/// Audio-side binding of a [`SharedParam`] to its smoother.
#[derive(Debug)]
pub struct ParamSlot {
    shared: Arc<SharedParam>,
    smoother: BlockSmoother,
}

impl ParamSlot {
    pub fn new(shared: Arc<SharedParam>) -> Self {
        let smoother = BlockSmoother::new(shared.target());
        Self { shared, smoother }
    }

    #[inline]
    pub fn id(&self) -> ParamId {
        self.shared.id
    }

    #[inline]
    pub fn shared(&self) -> &Arc<SharedParam> {
        &self.shared
    }

    /// Pick up a new target if one arrived, advance one block and publish.
    pub fn begin_block(&mut self, frames: usize) -> Ramp {
        let target = self.shared.target.get();
        if target.to_bits() != self.smoother.target().to_bits() {
            let blocks = self.shared.smoothing_blocks.load(Ordering::Relaxed);
            self.smoother.set_target(target, blocks);
        }
        let ramp = self.smoother.begin_block(frames);
        self.shared.current.set(ramp.end());
        ramp
    }

    /// Value at the end of the last block, without advancing.
    #[inline]
    pub fn value(&self) -> f32 {
        self.smoother.current()
    }

    /// Return to the value the parameter was created with.
    pub fn reset(&mut self, initial: f32) {
        self.shared.smoothing_blocks.store(0, Ordering::Relaxed);
        self.shared.target.set(initial);
        self.shared.current.set(initial);
        self.smoother.set_immediate(initial);
    }
}

type ParamMap = HashMap<ParamKey, Arc<SharedParam>>;

/// Control-side lookup of every live parameter by key.
#[derive(Debug, Default)]
pub struct ParameterStore {
    params: ArcSwap<ParamMap>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register all parameters of a newly built node.
    pub fn register(&self, node: NodeId, params: &[Arc<SharedParam>]) {
        self.params.rcu(|map| {
            let mut map = ParamMap::clone(map);
            for param in params {
                map.insert(ParamKey::new(node, param.id()), Arc::clone(param));
            }
            map
        });
    }

    /// Drop every parameter owned by `node`.
    pub fn unregister(&self, node: NodeId) {
        self.params.rcu(|map| {
            let mut map = ParamMap::clone(map);
            map.retain(|key, _| key.node != node);
            map
        });
    }

    pub fn get(&self, key: &ParamKey) -> Option<Arc<SharedParam>> {
        self.params.load().get(key).cloned()
    }

    /// Current (published) value.
    pub fn read(&self, key: &ParamKey) -> Option<f32> {
        self.params.load().get(key).map(|p| p.current())
    }

    pub fn read_target(&self, key: &ParamKey) -> Option<f32> {
        self.params.load().get(key).map(|p| p.target())
    }

    /// Parameters of one node, sorted by id.
    pub fn params_of(&self, node: NodeId) -> Vec<(ParamId, f32)> {
        let map = self.params.load();
        let mut out: Vec<_> = map
            .iter()
            .filter(|(key, _)| key.node == node)
            .map(|(key, param)| (key.param, param.current()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    pub fn len(&self) -> usize {
        self.params.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.load().is_empty()
    }
}
