//! Parameter identities, ranges and scaling.
//!
//! A parameter is addressed by [`ParamKey`] (owning node + [`ParamId`]) and
//! constrained by a [`ParameterRange`]. Every value written from the control
//! side goes through [`ParameterRange::sanitize`] before the audio thread sees it.
//!
//! ```
//! use ostinato_core::{ParameterRange, ParameterScale};
//!
//! let cutoff = ParameterRange::logarithmic(20.0, 20000.0, 1000.0);
//! let mid = cutoff.denormalize(0.5); // geometric mean, ~632 Hz
//! assert!((cutoff.normalize(mid) - 0.5).abs() < 1e-4);
//! assert_eq!(cutoff.scale, ParameterScale::Logarithmic);
//! ```

use crate::graph::NodeId;
use core::fmt;

/// Mapping between a normalized 0..1 control position and a real value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParameterScale {
    #[default]
    Linear,
    /// `min * (max/min)^t`; requires `min > 0`.
    Logarithmic,
    /// `min + t^curve * (max - min)`.
    Exponential { curve: f32 },
    /// Two states: `min` (off) and `max` (on).
    Toggle,
    /// Whole steps between `min` and `max`.
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub scale: ParameterScale,
}

impl ParameterRange {
    pub fn new(min: f32, max: f32, default: f32, scale: ParameterScale) -> Self {
        debug_assert!(max > min, "max must be greater than min");
        Self {
            min,
            max,
            default: default.clamp(min, max),
            scale,
        }
    }

    pub fn linear(min: f32, max: f32, default: f32) -> Self {
        Self::new(min, max, default, ParameterScale::Linear)
    }

    pub fn logarithmic(min: f32, max: f32, default: f32) -> Self {
        debug_assert!(min > 0.0, "logarithmic scale requires min > 0");
        Self::new(min, max, default, ParameterScale::Logarithmic)
    }

    pub fn exponential(min: f32, max: f32, default: f32, curve: f32) -> Self {
        Self::new(min, max, default, ParameterScale::Exponential { curve })
    }

    pub fn toggle(default_on: bool) -> Self {
        Self::new(0.0, 1.0, if default_on { 1.0 } else { 0.0 }, ParameterScale::Toggle)
    }

    pub fn integer(min: i32, max: i32, default: i32) -> Self {
        Self::new(min as f32, max as f32, default as f32, ParameterScale::Integer)
    }

    /// Discrete parameters jump straight to a new value and never ramp.
    #[inline]
    pub fn is_discrete(&self) -> bool {
        matches!(self.scale, ParameterScale::Toggle | ParameterScale::Integer)
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp into range and snap discrete values. NaN falls back to the default.
    pub fn sanitize(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        let value = self.clamp(value);
        match self.scale {
            ParameterScale::Integer => value.round(),
            ParameterScale::Toggle => {
                if value >= (self.min + self.max) * 0.5 {
                    self.max
                } else {
                    self.min
                }
            }
            _ => value,
        }
    }

    pub fn normalize(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        let value = self.clamp(value);

        match self.scale {
            ParameterScale::Linear => (value - self.min) / span,
            ParameterScale::Logarithmic if self.min > 0.0 => {
                (value / self.min).ln() / (self.max / self.min).ln()
            }
            ParameterScale::Logarithmic => (value - self.min) / span,
            ParameterScale::Exponential { curve } if curve > 0.0 => {
                ((value - self.min) / span).powf(curve.recip())
            }
            ParameterScale::Exponential { .. } => (value - self.min) / span,
            ParameterScale::Toggle => {
                if value >= (self.min + self.max) * 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParameterScale::Integer => (value.round() - self.min) / span,
        }
    }

    pub fn denormalize(&self, normalized: f32) -> f32 {
        let t = normalized.clamp(0.0, 1.0);
        let span = self.max - self.min;

        match self.scale {
            ParameterScale::Linear => self.min + t * span,
            ParameterScale::Logarithmic if self.min > 0.0 => {
                self.min * (self.max / self.min).powf(t)
            }
            ParameterScale::Logarithmic => self.min + t * span,
            ParameterScale::Exponential { curve } if curve > 0.0 => {
                self.min + t.powf(curve) * span
            }
            ParameterScale::Exponential { .. } => self.min + t * span,
            ParameterScale::Toggle => {
                if t >= 0.5 {
                    self.max
                } else {
                    self.min
                }
            }
            ParameterScale::Integer => (self.min + t * span).round(),
        }
    }
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self::linear(0.0, 1.0, 0.5)
    }
}

/// Which control of a node a parameter drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamId {
    Frequency,
    Amplitude,
    Waveform,
    Gain,
    /// Per-input gain of a mixer.
    InputGain(u16),
    Cutoff,
    Resonance,
    FilterMode,
    Time,
    Feedback,
    Mix,
    RoomSize,
    Damping,
    Pan,
    Volume,
}

impl ParamId {
    pub fn name(&self) -> &'static str {
        match self {
            ParamId::Frequency => "frequency",
            ParamId::Amplitude => "amplitude",
            ParamId::Waveform => "waveform",
            ParamId::Gain => "gain",
            ParamId::InputGain(_) => "input_gain",
            ParamId::Cutoff => "cutoff",
            ParamId::Resonance => "resonance",
            ParamId::FilterMode => "filter_mode",
            ParamId::Time => "time",
            ParamId::Feedback => "feedback",
            ParamId::Mix => "mix",
            ParamId::RoomSize => "room_size",
            ParamId::Damping => "damping",
            ParamId::Pan => "pan",
            ParamId::Volume => "volume",
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamId::InputGain(i) => write!(f, "input_gain[{i}]"),
            other => f.write_str(other.name()),
        }
    }
}

/// Address of one parameter: the node that owns it plus which control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamKey {
    pub node: NodeId,
    pub param: ParamId,
}

impl ParamKey {
    pub fn new(node: NodeId, param: ParamId) -> Self {
        Self { node, param }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.param)
    }
}

/// Declaration of a node parameter: identity, range and initial value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub id: ParamId,
    pub range: ParameterRange,
    pub initial: f32,
}

impl ParamSpec {
    pub fn new(id: ParamId, range: ParameterRange, initial: f32) -> Self {
        Self {
            id,
            range,
            initial: range.sanitize(initial),
        }
    }
}
