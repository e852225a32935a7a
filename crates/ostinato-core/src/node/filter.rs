//! RBJ cookbook biquad in transposed direct form II.

use super::kind::FilterMode;
use crate::smooth::Ramp;
use core::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn design(mode: FilterMode, cutoff: f64, q: f64, sample_rate: f64) -> Self {
        // keep below Nyquist or the design goes unstable
        let cutoff = cutoff.clamp(1.0, sample_rate * 0.49);
        let w0 = TAU * cutoff / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q.max(1e-3));

        let (b0, b1, b2) = match mode {
            FilterMode::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 * 0.5, b1, b1 * 0.5)
            }
            FilterMode::Highpass => {
                let b1 = -(1.0 + cos_w0);
                (-b1 * 0.5, b1, -b1 * 0.5)
            }
            FilterMode::Bandpass => (alpha, 0.0, -alpha),
            FilterMode::Notch => (1.0, -2.0 * cos_w0, 1.0),
            FilterMode::Allpass => (1.0 - alpha, -2.0 * cos_w0, 1.0 + alpha),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Biquad whose coefficients follow the cutoff, Q and mode it is given.
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: Coefficients,
    z1: f64,
    z2: f64,
    designed_for: Option<(FilterMode, f32, f32, f64)>,
}

impl Default for Biquad {
    fn default() -> Self {
        Self {
            coeffs: Coefficients::IDENTITY,
            z1: 0.0,
            z2: 0.0,
            designed_for: None,
        }
    }
}

impl Biquad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
        self.coeffs = Coefficients::IDENTITY;
        self.designed_for = None;
    }

    fn update(&mut self, mode: FilterMode, cutoff: f32, q: f32, sample_rate: f64) {
        let key = (mode, cutoff, q, sample_rate);
        if self.designed_for != Some(key) {
            self.coeffs = Coefficients::design(mode, cutoff as f64, q as f64, sample_rate);
            self.designed_for = Some(key);
        }
    }

    #[inline]
    fn tick(&mut self, x: f64) -> f64 {
        let c = &self.coeffs;
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;
        y
    }

    /// Filter `input` into `out`. While cutoff or Q is ramping, coefficients are
    /// redesigned every [`SUB_BLOCK`] samples.
    pub fn process(
        &mut self,
        input: &[f32],
        out: &mut [f32],
        mode: FilterMode,
        cutoff: Ramp,
        q: Ramp,
        sample_rate: f64,
    ) {
        let ramping = !(cutoff.is_constant() && q.is_constant());
        for (i, (x, y)) in input.iter().zip(out.iter_mut()).enumerate() {
            if i == 0 || (ramping && i % SUB_BLOCK == 0) {
                self.update(mode, cutoff.at(i), q.at(i), sample_rate);
            }
            *y = self.tick(*x as f64) as f32;
        }
        // settle on the end-of-block design
        self.update(mode, cutoff.end(), q.end(), sample_rate);
    }
}

/// Samples between coefficient updates during a parameter ramp.
pub const SUB_BLOCK: usize = 16;
