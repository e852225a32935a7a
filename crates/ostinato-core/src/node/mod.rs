//! Processing nodes.
//!
//! A [`Node`] couples a [`NodeKind`] with its DSP state and parameter slots.
//! Nodes are built on the control thread (that is where their buffers and
//! parameters are allocated) and then moved to the audio thread, where
//! [`Node::process`] runs once per block without allocating.

mod delay;
mod filter;
mod kind;
mod mixing;
mod oscillator;
mod reverb;

pub use delay::DelayLine;
pub use filter::Biquad;
pub use kind::{
    FilterMode, NodeKind, NodeParamValue, NodeParams, NoteValue, Waveform, DEFAULT_MAX_DELAY,
    MAX_DELAY, MAX_INPUTS, MAX_OUTPUTS,
};
pub use mixing::pan_gains;
pub use oscillator::Oscillator;
pub use reverb::{room_feedback, Reverb, ReverbPreset};

use crate::error::NodeKindError;
use crate::graph::{AudioBlock, NodeId, OutputBus};
use crate::parameter::ParamId;
use crate::store::{ParamSlot, SharedParam};
use std::sync::Arc;

/// Per-block processing context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessContext {
    pub frames: usize,
    pub sample_rate: f64,
}

#[derive(Debug)]
enum Dsp {
    Oscillator(Oscillator),
    Gain,
    Mixer,
    Filter(Biquad),
    Delay(DelayLine),
    Reverb(Box<Reverb>),
    Pan,
    Sink,
}

#[derive(Debug)]
pub struct Node {
    id: Option<NodeId>,
    kind: NodeKind,
    params: Vec<ParamSlot>,
    initial: Vec<f32>,
    dsp: Dsp,
}

impl Node {
    /// Build a node for `sample_rate`. Continuous parameters ramp over
    /// `default_smoothing` blocks unless told otherwise.
    pub fn build(
        kind: NodeKind,
        sample_rate: f64,
        default_smoothing: u32,
    ) -> Result<Self, NodeKindError> {
        kind.validate()?;

        let specs = kind.param_specs();
        let initial = specs.iter().map(|spec| spec.initial).collect();
        let params = specs
            .iter()
            .map(|spec| ParamSlot::new(Arc::new(SharedParam::new(spec, default_smoothing))))
            .collect();

        let dsp = match &kind {
            NodeKind::Oscillator { .. } => Dsp::Oscillator(Oscillator::new()),
            NodeKind::Gain { .. } => Dsp::Gain,
            NodeKind::Mixer { .. } => Dsp::Mixer,
            NodeKind::Filter { .. } => Dsp::Filter(Biquad::new()),
            NodeKind::Delay { max_time, .. } => Dsp::Delay(DelayLine::new(*max_time, sample_rate)),
            NodeKind::Reverb { .. } => Dsp::Reverb(Box::new(Reverb::new(sample_rate))),
            NodeKind::Pan { .. } => Dsp::Pan,
            NodeKind::Sink { .. } => Dsp::Sink,
        };

        Ok(Self {
            id: None,
            kind,
            params,
            initial,
            dsp,
        })
    }

    /// Handle assigned when the node was placed in a graph.
    #[inline]
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = Some(id);
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn inputs(&self) -> usize {
        self.kind.inputs()
    }

    #[inline]
    pub fn outputs(&self) -> usize {
        self.kind.outputs()
    }

    #[inline]
    pub fn is_sink(&self) -> bool {
        matches!(self.dsp, Dsp::Sink)
    }

    pub fn param(&self, id: ParamId) -> Option<&Arc<SharedParam>> {
        self.params.iter().find(|slot| slot.id() == id).map(|slot| slot.shared())
    }

    pub fn shared_params(&self) -> impl Iterator<Item = &Arc<SharedParam>> {
        self.params.iter().map(|slot| slot.shared())
    }

    /// Return to the freshly built state: DSP state cleared, parameters back at
    /// their initial values.
    pub fn reset(&mut self) {
        for (slot, initial) in self.params.iter_mut().zip(&self.initial) {
            slot.reset(*initial);
        }
        match &mut self.dsp {
            Dsp::Oscillator(osc) => osc.reset(),
            Dsp::Filter(filter) => filter.reset(),
            Dsp::Delay(line) => line.reset(),
            Dsp::Reverb(reverb) => reverb.reset(),
            Dsp::Gain | Dsp::Mixer | Dsp::Pan | Dsp::Sink => {}
        }
    }

    /// Process one block.
    ///
    /// `inputs` holds one summed block per input port, `outputs` at least one
    /// block per output port. A sink adds into `bus` instead of `outputs`.
    pub fn process(
        &mut self,
        ctx: &ProcessContext,
        inputs: &[AudioBlock],
        outputs: &mut [AudioBlock],
        bus: &mut OutputBus,
    ) {
        let n = ctx.frames;
        let params = &mut self.params;

        match &mut self.dsp {
            Dsp::Oscillator(osc) => {
                let frequency = params[0].begin_block(n);
                let amplitude = params[1].begin_block(n);
                let waveform = Waveform::from_index(params[2].begin_block(n).end());
                osc.process(
                    outputs[0].as_mut_slice(n),
                    waveform,
                    frequency,
                    amplitude,
                    ctx.sample_rate,
                );
            }
            Dsp::Gain => {
                let gain = params[0].begin_block(n);
                mixing::gain(inputs[0].as_slice(n), outputs[0].as_mut_slice(n), gain);
            }
            Dsp::Mixer => {
                let out = outputs[0].as_mut_slice(n);
                out.fill(0.0);
                for (input, slot) in inputs.iter().zip(params.iter_mut()) {
                    mixing::accumulate(input.as_slice(n), out, slot.begin_block(n));
                }
            }
            Dsp::Filter(filter) => {
                let cutoff = params[0].begin_block(n);
                let q = params[1].begin_block(n);
                let mode = FilterMode::from_index(params[2].begin_block(n).end());
                filter.process(
                    inputs[0].as_slice(n),
                    outputs[0].as_mut_slice(n),
                    mode,
                    cutoff,
                    q,
                    ctx.sample_rate,
                );
            }
            Dsp::Delay(line) => {
                let time = params[0].begin_block(n);
                let feedback = params[1].begin_block(n);
                let mix = params[2].begin_block(n);
                line.process(
                    inputs[0].as_slice(n),
                    outputs[0].as_mut_slice(n),
                    time,
                    feedback,
                    mix,
                    ctx.sample_rate,
                );
            }
            Dsp::Reverb(reverb) => {
                let room_size = params[0].begin_block(n);
                let damping = params[1].begin_block(n);
                let mix = params[2].begin_block(n);
                reverb.process(inputs[0].as_slice(n), outputs[0].as_mut_slice(n), room_size, damping, mix);
            }
            Dsp::Pan => {
                let position = params[0].begin_block(n);
                let (left, right) = outputs.split_at_mut(1);
                mixing::pan(
                    inputs[0].as_slice(n),
                    left[0].as_mut_slice(n),
                    right[0].as_mut_slice(n),
                    position,
                );
            }
            Dsp::Sink => {
                let volume = params[0].begin_block(n);
                for (port, input) in inputs.iter().enumerate() {
                    mixing::sink(port, inputs.len(), input.as_slice(n), bus, volume);
                }
            }
        }
    }
}
