//! Stateless level, mix, pan and output stages.

use crate::graph::OutputBus;
use crate::smooth::Ramp;
use core::f32::consts::FRAC_PI_4;

pub fn gain(input: &[f32], out: &mut [f32], gain: Ramp) {
    out.copy_from_slice(input);
    gain.apply_gain(out);
}

/// Add `input * gain` into `out`.
pub fn accumulate(input: &[f32], out: &mut [f32], gain: Ramp) {
    if gain.is_constant() {
        let g = gain.end();
        for (y, x) in out.iter_mut().zip(input) {
            *y += x * g;
        }
    } else {
        for (i, (y, x)) in out.iter_mut().zip(input).enumerate() {
            *y += x * gain.at(i);
        }
    }
}

/// Equal-power gains for a pan position in -1..=1.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

pub fn pan(input: &[f32], left: &mut [f32], right: &mut [f32], position: Ramp) {
    for (i, x) in input.iter().enumerate() {
        let (l, r) = pan_gains(position.at(i));
        left[i] = x * l;
        right[i] = x * r;
    }
}

/// Route sink input `port` into the bus.
///
/// A single-input sink feeds every bus channel. Otherwise input `c` lands on
/// bus channel `c`, and inputs beyond the bus width are dropped.
pub fn sink(port: usize, inputs: usize, input: &[f32], bus: &mut OutputBus, volume: Ramp) {
    if inputs == 1 {
        for c in 0..bus.channels() {
            accumulate(input, bus.channel_mut(c).as_mut_slice(input.len()), volume);
        }
    } else if port < bus.channels() {
        accumulate(input, bus.channel_mut(port).as_mut_slice(input.len()), volume);
    }
}
