use super::kind::Waveform;
use crate::smooth::Ramp;
use core::f64::consts::TAU;

/// Phase-accumulator oscillator. Phase is kept in f64 so long runs do not drift.
#[derive(Debug, Clone, Default)]
pub struct Oscillator {
    phase: f64,
}

impl Oscillator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn process(
        &mut self,
        out: &mut [f32],
        waveform: Waveform,
        frequency: Ramp,
        amplitude: Ramp,
        sample_rate: f64,
    ) {
        let inv_rate = 1.0 / sample_rate;
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = shape(waveform, self.phase) * amplitude.at(i);
            self.phase += frequency.at(i) as f64 * inv_rate;
            self.phase -= self.phase.floor();
        }
    }
}

#[inline]
fn shape(waveform: Waveform, phase: f64) -> f32 {
    let value = match waveform {
        Waveform::Sine => (phase * TAU).sin(),
        Waveform::Saw => 2.0 * phase - 1.0,
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    };
    value as f32
}
