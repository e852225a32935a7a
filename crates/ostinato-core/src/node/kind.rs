//! Node kinds and creation from string-keyed parameter maps.
//!
//! [`NodeKind`] describes what a node is and how it starts out. It is plain data:
//! serializable, comparable and cheap to clone. [`Node::build`](super::Node::build)
//! turns it into a processing node.

use super::reverb::ReverbPreset;
use crate::error::NodeKindError;
use crate::parameter::{ParamId, ParamSpec, ParameterRange};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Most input ports a node can have (mixer inputs, sink channels).
pub const MAX_INPUTS: usize = 32;
/// Most output ports a node can have.
pub const MAX_OUTPUTS: usize = 2;

/// Build a [`NodeParams`] map.
///
/// ```
/// use ostinato_core::{params, NodeKind};
///
/// let kind = NodeKind::from_params("lowpass", &params! { "cutoff" => 800.0, "q" => 2.0 }).unwrap();
/// assert_eq!(kind.name(), "filter");
/// ```
#[macro_export]
macro_rules! params {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::NodeParams::new();
        $(
            map.insert($key.to_string(), $value.into());
        )*
        map
    }};
}

pub type NodeParams = HashMap<String, NodeParamValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
}

impl NodeParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|f| f as f32)
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Self::Int(i) if *i >= 0 => Some(*i as usize),
            Self::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as usize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for NodeParamValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for NodeParamValue {
    fn from(f: f32) -> Self {
        Self::Float(f as f64)
    }
}

impl From<i64> for NodeParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for NodeParamValue {
    fn from(i: i32) -> Self {
        Self::Int(i as i64)
    }
}

impl From<usize> for NodeParamValue {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl From<bool> for NodeParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for NodeParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for NodeParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Saw,
    Square,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [Self::Sine, Self::Saw, Self::Square, Self::Triangle];

    pub fn from_index(index: f32) -> Self {
        match index.round() as i32 {
            1 => Self::Saw,
            2 => Self::Square,
            3 => Self::Triangle,
            _ => Self::Sine,
        }
    }

    pub fn index(self) -> f32 {
        self as i32 as f32
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sine" | "sin" => Some(Self::Sine),
            "saw" | "sawtooth" => Some(Self::Saw),
            "square" | "pulse" => Some(Self::Square),
            "triangle" | "tri" => Some(Self::Triangle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
    Allpass,
}

impl FilterMode {
    pub const ALL: [FilterMode; 5] = [
        Self::Lowpass,
        Self::Highpass,
        Self::Bandpass,
        Self::Notch,
        Self::Allpass,
    ];

    pub fn from_index(index: f32) -> Self {
        match index.round() as i32 {
            1 => Self::Highpass,
            2 => Self::Bandpass,
            3 => Self::Notch,
            4 => Self::Allpass,
            _ => Self::Lowpass,
        }
    }

    pub fn index(self) -> f32 {
        self as i32 as f32
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lowpass" | "lp" => Some(Self::Lowpass),
            "highpass" | "hp" => Some(Self::Highpass),
            "bandpass" | "bp" => Some(Self::Bandpass),
            "notch" => Some(Self::Notch),
            "allpass" | "ap" => Some(Self::Allpass),
            _ => None,
        }
    }
}

/// Note length for tempo-synced delay times, in beats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    DottedHalf,
    DottedQuarter,
    DottedEighth,
    TripletQuarter,
    TripletEighth,
    TripletSixteenth,
}

impl NoteValue {
    pub fn beats(self) -> f32 {
        match self {
            Self::Whole => 4.0,
            Self::Half => 2.0,
            Self::Quarter => 1.0,
            Self::Eighth => 0.5,
            Self::Sixteenth => 0.25,
            Self::ThirtySecond => 0.125,
            Self::DottedHalf => 3.0,
            Self::DottedQuarter => 1.5,
            Self::DottedEighth => 0.75,
            Self::TripletQuarter => 2.0 / 3.0,
            Self::TripletEighth => 1.0 / 3.0,
            Self::TripletSixteenth => 1.0 / 6.0,
        }
    }

    /// Length in seconds at `bpm`.
    pub fn seconds(self, bpm: f32) -> f32 {
        60.0 / bpm * self.beats()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Whole => "1/1",
            Self::Half => "1/2",
            Self::Quarter => "1/4",
            Self::Eighth => "1/8",
            Self::Sixteenth => "1/16",
            Self::ThirtySecond => "1/32",
            Self::DottedHalf => "1/2.",
            Self::DottedQuarter => "1/4.",
            Self::DottedEighth => "1/8.",
            Self::TripletQuarter => "1/4T",
            Self::TripletEighth => "1/8T",
            Self::TripletSixteenth => "1/16T",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        const ALL: [NoteValue; 12] = [
            NoteValue::Whole,
            NoteValue::Half,
            NoteValue::Quarter,
            NoteValue::Eighth,
            NoteValue::Sixteenth,
            NoteValue::ThirtySecond,
            NoteValue::DottedHalf,
            NoteValue::DottedQuarter,
            NoteValue::DottedEighth,
            NoteValue::TripletQuarter,
            NoteValue::TripletEighth,
            NoteValue::TripletSixteenth,
        ];
        ALL.into_iter().find(|note| note.name().eq_ignore_ascii_case(name))
    }
}

/// The closed set of node kinds, with their initial settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Oscillator {
        waveform: Waveform,
        frequency: f32,
        amplitude: f32,
    },
    Gain {
        gain: f32,
    },
    Mixer {
        inputs: usize,
    },
    Filter {
        mode: FilterMode,
        cutoff: f32,
        resonance: f32,
    },
    Delay {
        /// Longest delay the node can reach; sizes its buffer.
        max_time: f32,
        time: f32,
        feedback: f32,
        mix: f32,
    },
    Reverb {
        room_size: f32,
        damping: f32,
        mix: f32,
    },
    Pan {
        pan: f32,
    },
    Sink {
        channels: usize,
    },
}

impl NodeKind {
    pub fn oscillator(waveform: Waveform, frequency: f32) -> Self {
        Self::Oscillator {
            waveform,
            frequency,
            amplitude: 0.5,
        }
    }

    pub fn sine(frequency: f32) -> Self {
        Self::oscillator(Waveform::Sine, frequency)
    }

    pub fn gain(gain: f32) -> Self {
        Self::Gain { gain }
    }

    pub fn mixer(inputs: usize) -> Self {
        Self::Mixer { inputs }
    }

    pub fn filter(mode: FilterMode, cutoff: f32, resonance: f32) -> Self {
        Self::Filter {
            mode,
            cutoff,
            resonance,
        }
    }

    pub fn lowpass(cutoff: f32, q: f32) -> Self {
        Self::filter(FilterMode::Lowpass, cutoff, q)
    }

    pub fn delay(time: f32, feedback: f32, mix: f32) -> Self {
        Self::Delay {
            max_time: DEFAULT_MAX_DELAY.max(time),
            time,
            feedback,
            mix,
        }
    }

    /// Delay locked to a note length at `bpm`.
    pub fn synced_delay(bpm: f32, note: NoteValue, feedback: f32, mix: f32) -> Self {
        Self::delay(note.seconds(bpm), feedback, mix)
    }

    pub fn reverb(room_size: f32, damping: f32, mix: f32) -> Self {
        Self::Reverb {
            room_size,
            damping,
            mix,
        }
    }

    pub fn reverb_preset(preset: ReverbPreset) -> Self {
        let (room_size, damping, mix) = preset.settings();
        Self::reverb(room_size, damping, mix)
    }

    pub fn pan(pan: f32) -> Self {
        Self::Pan { pan }
    }

    pub fn sink(channels: usize) -> Self {
        Self::Sink { channels }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Oscillator { .. } => "oscillator",
            Self::Gain { .. } => "gain",
            Self::Mixer { .. } => "mixer",
            Self::Filter { .. } => "filter",
            Self::Delay { .. } => "delay",
            Self::Reverb { .. } => "reverb",
            Self::Pan { .. } => "pan",
            Self::Sink { .. } => "sink",
        }
    }

    pub fn inputs(&self) -> usize {
        match self {
            Self::Oscillator { .. } => 0,
            Self::Mixer { inputs } => *inputs,
            Self::Sink { channels } => *channels,
            _ => 1,
        }
    }

    pub fn outputs(&self) -> usize {
        match self {
            Self::Pan { .. } => 2,
            Self::Sink { .. } => 0,
            _ => 1,
        }
    }

    /// Port counts within limits and finite settings.
    pub fn validate(&self) -> Result<(), NodeKindError> {
        match self {
            Self::Mixer { inputs } if *inputs == 0 || *inputs > MAX_INPUTS => {
                return Err(NodeKindError::PortCount {
                    kind: "mixer",
                    count: *inputs,
                    max: MAX_INPUTS,
                })
            }
            Self::Sink { channels } if *channels == 0 || *channels > MAX_INPUTS => {
                return Err(NodeKindError::PortCount {
                    kind: "sink",
                    count: *channels,
                    max: MAX_INPUTS,
                })
            }
            Self::Delay { max_time, .. } if !(*max_time > 0.0 && *max_time <= MAX_DELAY) => {
                return Err(NodeKindError::InvalidParameter(
                    "max_time".into(),
                    format!("{max_time} outside (0, {MAX_DELAY}] seconds"),
                ))
            }
            _ => {}
        }

        for spec in self.param_specs() {
            if !spec.initial.is_finite() {
                return Err(NodeKindError::InvalidParameter(
                    spec.id.to_string(),
                    "not finite".into(),
                ));
            }
        }
        Ok(())
    }

    /// Parameters a node of this kind exposes, with initial values taken from
    /// the kind's settings.
    pub fn param_specs(&self) -> Vec<ParamSpec> {
        match self {
            Self::Oscillator {
                waveform,
                frequency,
                amplitude,
            } => vec![
                ParamSpec::new(ParamId::Frequency, frequency_range(440.0), *frequency),
                ParamSpec::new(ParamId::Amplitude, ParameterRange::linear(0.0, 1.0, 0.5), *amplitude),
                ParamSpec::new(ParamId::Waveform, ParameterRange::integer(0, 3, 0), waveform.index()),
            ],
            Self::Gain { gain } => vec![ParamSpec::new(ParamId::Gain, gain_range(), *gain)],
            Self::Mixer { inputs } => (0..*inputs)
                .map(|i| ParamSpec::new(ParamId::InputGain(i as u16), gain_range(), 1.0))
                .collect(),
            Self::Filter {
                mode,
                cutoff,
                resonance,
            } => vec![
                ParamSpec::new(ParamId::Cutoff, frequency_range(1000.0), *cutoff),
                ParamSpec::new(ParamId::Resonance, ParameterRange::logarithmic(0.1, 20.0, 0.707), *resonance),
                ParamSpec::new(ParamId::FilterMode, ParameterRange::integer(0, 4, 0), mode.index()),
            ],
            Self::Delay {
                max_time,
                time,
                feedback,
                mix,
            } => vec![
                ParamSpec::new(
                    ParamId::Time,
                    ParameterRange::linear(MIN_DELAY, max_time.max(MIN_DELAY * 2.0), 0.25),
                    *time,
                ),
                ParamSpec::new(ParamId::Feedback, ParameterRange::linear(0.0, 0.95, 0.3), *feedback),
                ParamSpec::new(ParamId::Mix, ParameterRange::linear(0.0, 1.0, 0.3), *mix),
            ],
            Self::Reverb {
                room_size,
                damping,
                mix,
            } => vec![
                ParamSpec::new(ParamId::RoomSize, ParameterRange::linear(0.0, 1.0, 0.5), *room_size),
                ParamSpec::new(ParamId::Damping, ParameterRange::linear(0.0, 1.0, 0.5), *damping),
                ParamSpec::new(ParamId::Mix, ParameterRange::linear(0.0, 1.0, 0.3), *mix),
            ],
            Self::Pan { pan } => vec![ParamSpec::new(
                ParamId::Pan,
                ParameterRange::linear(-1.0, 1.0, 0.0),
                *pan,
            )],
            Self::Sink { .. } => vec![ParamSpec::new(
                ParamId::Volume,
                ParameterRange::linear(0.0, 2.0, 1.0),
                1.0,
            )],
        }
    }

    /// Create a kind by name from a parameter map.
    ///
    /// Waveform and filter-mode names double as kind names (`"saw"`,
    /// `"highpass"`). Missing parameters take their defaults, unknown keys are
    /// ignored.
    pub fn from_params(name: &str, params: &NodeParams) -> Result<Self, NodeKindError> {
        let lower = name.to_ascii_lowercase();
        let kind = match lower.as_str() {
            "oscillator" | "osc" => {
                let waveform = match params.get("waveform") {
                    None => Waveform::Sine,
                    Some(value) => parse_enum(value, "waveform", Waveform::parse, Waveform::from_index)?,
                };
                Self::Oscillator {
                    waveform,
                    frequency: float(params, "frequency", 440.0)?,
                    amplitude: float(params, "amplitude", 0.5)?,
                }
            }
            other if Waveform::parse(other).is_some() => Self::Oscillator {
                waveform: Waveform::parse(other).unwrap_or_default(),
                frequency: float(params, "frequency", 440.0)?,
                amplitude: float(params, "amplitude", 0.5)?,
            },
            "gain" | "amp" => Self::Gain {
                gain: float(params, "gain", 1.0)?,
            },
            "mixer" | "mix" => Self::Mixer {
                inputs: count(params, "inputs", 2)?,
            },
            "filter" => {
                let mode = match params.get("mode") {
                    None => FilterMode::Lowpass,
                    Some(value) => parse_enum(value, "mode", FilterMode::parse, FilterMode::from_index)?,
                };
                Self::Filter {
                    mode,
                    cutoff: float(params, "cutoff", 1000.0)?,
                    resonance: resonance(params)?,
                }
            }
            other if FilterMode::parse(other).is_some() => Self::Filter {
                mode: FilterMode::parse(other).unwrap_or_default(),
                cutoff: float(params, "cutoff", 1000.0)?,
                resonance: resonance(params)?,
            },
            "delay" | "echo" => {
                let time = match (params.get("bpm"), params.get("note")) {
                    (Some(_), Some(note)) => {
                        let bpm = float(params, "bpm", 120.0)?;
                        if bpm <= 0.0 {
                            return Err(NodeKindError::InvalidParameter("bpm".into(), "must be positive".into()));
                        }
                        let note = note.as_str().and_then(NoteValue::parse).ok_or_else(|| {
                            NodeKindError::InvalidParameter("note".into(), "expected a note value like 1/8.".into())
                        })?;
                        note.seconds(bpm)
                    }
                    _ => float(params, "time", 0.25)?,
                };
                Self::Delay {
                    max_time: float(params, "max_time", DEFAULT_MAX_DELAY.max(time))?,
                    time,
                    feedback: float(params, "feedback", 0.3)?,
                    mix: float(params, "mix", 0.3)?,
                }
            }
            "reverb" => {
                let (room_size, damping, mix) = match params.get("preset") {
                    None => (0.5, 0.5, 0.3),
                    Some(value) => value
                        .as_str()
                        .and_then(ReverbPreset::parse)
                        .map(ReverbPreset::settings)
                        .ok_or_else(|| {
                            NodeKindError::InvalidParameter("preset".into(), "unknown reverb preset".into())
                        })?,
                };
                Self::Reverb {
                    room_size: float(params, "room_size", room_size)?,
                    damping: float(params, "damping", damping)?,
                    mix: float(params, "mix", mix)?,
                }
            }
            "pan" | "panner" => Self::Pan {
                pan: float(params, "pan", 0.0)?,
            },
            "sink" | "output" => Self::Sink {
                channels: count(params, "channels", 2)?,
            },
            _ => return Err(NodeKindError::UnknownNodeType(name.to_string())),
        };

        kind.validate()?;
        Ok(kind)
    }
}

/// Default delay buffer length, in seconds.
pub const DEFAULT_MAX_DELAY: f32 = 2.0;
/// Longest delay buffer a node may allocate, in seconds.
pub const MAX_DELAY: f32 = 10.0;
const MIN_DELAY: f32 = 0.001;

fn frequency_range(default: f32) -> ParameterRange {
    ParameterRange::logarithmic(20.0, 20000.0, default)
}

fn gain_range() -> ParameterRange {
    ParameterRange::linear(0.0, 4.0, 1.0)
}

fn float(params: &NodeParams, key: &str, default: f32) -> Result<f32, NodeKindError> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_f32()
            .filter(|v| v.is_finite())
            .ok_or_else(|| NodeKindError::InvalidParameter(key.to_string(), "expected a number".into())),
    }
}

fn count(params: &NodeParams, key: &str, default: usize) -> Result<usize, NodeKindError> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value.as_usize().ok_or_else(|| {
            NodeKindError::InvalidParameter(key.to_string(), "expected a whole number".into())
        }),
    }
}

fn resonance(params: &NodeParams) -> Result<f32, NodeKindError> {
    if params.contains_key("q") {
        float(params, "q", 0.707)
    } else {
        float(params, "resonance", 0.707)
    }
}

fn parse_enum<T>(
    value: &NodeParamValue,
    key: &str,
    by_name: fn(&str) -> Option<T>,
    by_index: fn(f32) -> T,
) -> Result<T, NodeKindError> {
    if let Some(name) = value.as_str() {
        return by_name(name).ok_or_else(|| {
            NodeKindError::InvalidParameter(key.to_string(), format!("unknown value '{name}'"))
        });
    }
    value
        .as_f32()
        .map(by_index)
        .ok_or_else(|| NodeKindError::InvalidParameter(key.to_string(), "expected a name or index".into()))
}
