//! Freeverb-style reverb: eight parallel damped combs into four series allpasses.
//!
//! Delay lengths are fixed when the node is built. Room size only moves the
//! comb feedback, so every parameter can change on the audio thread without
//! touching a buffer.

use crate::smooth::Ramp;
use serde::{Deserialize, Serialize};

/// Comb lengths in samples at 44.1 kHz. Mutually prime to spread resonances.
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];
const TUNING_RATE: f64 = 44100.0;
const ALLPASS_FEEDBACK: f32 = 0.5;
const COMB_SCALE: f32 = 1.0 / COMB_TUNINGS.len() as f32;

/// Comb feedback for a room size: 0.28 for the smallest room, 0.98 for the largest.
#[inline]
pub fn room_feedback(room_size: f32) -> f32 {
    0.28 + room_size.clamp(0.0, 1.0) * 0.7
}

fn scaled(samples: usize, sample_rate: f64) -> usize {
    ((samples as f64 * sample_rate / TUNING_RATE).round() as usize).max(1)
}

#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f32>,
    pos: usize,
    store: f32,
}

impl Comb {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len],
            pos: 0,
            store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damping: f32) -> f32 {
        let output = self.buffer[self.pos];
        // one-pole lowpass in the feedback path
        self.store = output * (1.0 - damping) + self.store * damping;
        self.buffer[self.pos] = input + self.store * feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
        self.store = 0.0;
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    buffer: Vec<f32>,
    pos: usize,
}

impl Allpass {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        self.buffer[self.pos] = input + delayed * ALLPASS_FEEDBACK;
        self.pos = (self.pos + 1) % self.buffer.len();
        delayed - input
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

/// Reverb state. All buffers are sized in [`Reverb::new`].
#[derive(Debug, Clone)]
pub struct Reverb {
    combs: [Comb; 8],
    allpasses: [Allpass; 4],
}

impl Reverb {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            combs: COMB_TUNINGS.map(|len| Comb::new(scaled(len, sample_rate))),
            allpasses: ALLPASS_TUNINGS.map(|len| Allpass::new(scaled(len, sample_rate))),
        }
    }

    pub fn reset(&mut self) {
        self.combs.iter_mut().for_each(Comb::reset);
        self.allpasses.iter_mut().for_each(Allpass::reset);
    }

    /// Shortest comb line in samples. No wet signal arrives before it.
    pub fn shortest_comb(&self) -> usize {
        self.combs.iter().map(|c| c.buffer.len()).min().unwrap_or(0)
    }

    pub fn process(&mut self, input: &[f32], out: &mut [f32], room_size: Ramp, damping: Ramp, mix: Ramp) {
        for (i, (x, y)) in input.iter().zip(out.iter_mut()).enumerate() {
            let feedback = room_feedback(room_size.at(i));
            let damp = damping.at(i).clamp(0.0, 1.0);

            let mut sum = 0.0;
            for comb in &mut self.combs {
                sum += comb.process(*x, feedback, damp);
            }

            let mut wet = sum * COMB_SCALE;
            for allpass in &mut self.allpasses {
                wet = allpass.process(wet);
            }

            let amount = mix.at(i);
            *y = x * (1.0 - amount) + wet * amount;
        }
    }
}

/// Room settings for common spaces: `(room_size, damping, mix)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverbPreset {
    #[default]
    SmallRoom,
    MediumHall,
    Cathedral,
    Plate,
    Spring,
}

impl ReverbPreset {
    pub const ALL: [ReverbPreset; 5] = [
        Self::SmallRoom,
        Self::MediumHall,
        Self::Cathedral,
        Self::Plate,
        Self::Spring,
    ];

    pub fn settings(self) -> (f32, f32, f32) {
        match self {
            Self::SmallRoom => (0.3, 0.6, 0.3),
            Self::MediumHall => (0.6, 0.4, 0.4),
            Self::Cathedral => (0.9, 0.2, 0.5),
            Self::Plate => (0.4, 0.8, 0.3),
            Self::Spring => (0.2, 0.5, 0.4),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(|c: char| c == '-' || c == ' ', "_").as_str() {
            "small_room" | "room" => Some(Self::SmallRoom),
            "medium_hall" | "hall" => Some(Self::MediumHall),
            "cathedral" => Some(Self::Cathedral),
            "plate" => Some(Self::Plate),
            "spring" => Some(Self::Spring),
            _ => None,
        }
    }
}
