use crate::smooth::Ramp;

/// Feedback delay line over a ring buffer sized once, at creation.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write: usize,
}

impl DelayLine {
    /// Buffer holds `max_time` seconds at `sample_rate` (at least two samples).
    pub fn new(max_time: f32, sample_rate: f64) -> Self {
        let len = ((max_time as f64 * sample_rate).ceil() as usize).max(2);
        Self {
            buffer: vec![0.0; len],
            write: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write = 0;
    }

    /// Read `delay` samples behind the write head with linear interpolation.
    #[inline]
    fn read(&self, delay: f64) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1.0, (len - 1) as f64);
        let whole = delay.floor() as usize;
        let frac = (delay - whole as f64) as f32;

        let a = self.buffer[(self.write + len - whole) % len];
        let b = self.buffer[(self.write + len - whole - 1) % len];
        a + (b - a) * frac
    }

    pub fn process(
        &mut self,
        input: &[f32],
        out: &mut [f32],
        time: Ramp,
        feedback: Ramp,
        mix: Ramp,
        sample_rate: f64,
    ) {
        let len = self.buffer.len();
        for (i, (x, y)) in input.iter().zip(out.iter_mut()).enumerate() {
            let delayed = self.read(time.at(i) as f64 * sample_rate);
            self.buffer[self.write] = x + delayed * feedback.at(i);
            self.write = (self.write + 1) % len;

            let wet = mix.at(i);
            *y = x * (1.0 - wet) + delayed * wet;
        }
    }
}
