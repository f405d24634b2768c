/*
Feedback Delay (Comb)
=====================

    input ──(+)──► [ delay line ] ──┬──► delayed output
             ▲                      │
             └──── × feedback ◄─────┘

Each pass around the loop is scaled by `feedback`, so echoes decay
geometrically. Feedback is kept below 1.0 by the caller; the loop itself does
not clamp it.

The read position is fractional (linear interpolation), so sweeping the delay
time glides the echoes in pitch instead of clicking.
*/

/// Longest delay a voice can ask for, in seconds.
pub const MAX_DELAY_SECONDS: f32 = 2.0;

pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Delay line long enough for `max_seconds` at `sample_rate`.
    pub fn new(sample_rate: f32, max_seconds: f32) -> Self {
        let capacity = (sample_rate * max_seconds).ceil().max(0.0) as usize + 2;
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Read `delay_samples` behind the write head (linear interpolation).
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.max(1.0).min((len - 2) as f32);
        let delay = if delay.is_finite() { delay } else { 1.0 };

        let whole = delay as usize;
        let frac = delay - whole as f32;

        let a = self.buffer[(self.write_pos + len - whole) % len];
        let b = self.buffer[(self.write_pos + len - whole - 1) % len];
        a + (b - a) * frac
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// One step of the feedback loop; returns the delayed signal.
    #[inline]
    pub fn process(&mut self, input: f32, delay_seconds: f32, feedback: f32, sample_rate: f32) -> f32 {
        let delayed = self.read(delay_seconds * sample_rate);
        self.write(input + delayed * feedback);
        delayed
    }
}
