// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming PCM16 sample-rate conversion.
//!
//! A rational polyphase FIR resampler: the rate ratio is reduced to
//! `up / down`, a Hann-windowed sinc low-pass is split into `up` phases and
//! every output sample is one short dot product against the input history.
//! The resampler keeps just enough history between calls that splitting a
//! stream into chunks of any size (empty and single-sample chunks included)
//! yields exactly the samples the unsplit stream would.

use std::f64::consts::PI;

/// Filter taps evaluated per output sample.
const TAPS_PER_PHASE: usize = 16;

/// Cutoff as a fraction of the lower Nyquist frequency.
const CUTOFF: f64 = 0.92;

#[derive(Debug, Clone)]
pub struct Resampler {
    input_rate: u32,
    output_rate: u32,
    up: usize,
    down: usize,
    phases: Vec<Vec<f32>>,
    /// The last `TAPS_PER_PHASE - 1` input samples, then the current chunk.
    history: Vec<f32>,
    /// Absolute index of `history[0]` in the input stream.
    base: u64,
    /// Position of the next output sample on the upsampled grid.
    next_t: u64,
}

impl Resampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        let input_rate = input_rate.max(1);
        let output_rate = output_rate.max(1);
        let g = gcd(input_rate, output_rate);
        let up = (output_rate / g) as usize;
        let down = (input_rate / g) as usize;

        let phases = if up == down {
            Vec::new()
        } else {
            design_phases(up, down)
        };

        tracing::debug!(input_rate, output_rate, up, down, "resampler created");
        Self {
            input_rate,
            output_rate,
            up,
            down,
            phases,
            history: Vec::with_capacity(TAPS_PER_PHASE * 2),
            base: 0,
            next_t: 0,
        }
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Interpolation factor of the reduced ratio.
    pub fn up(&self) -> usize {
        self.up
    }

    /// Decimation factor of the reduced ratio.
    pub fn down(&self) -> usize {
        self.down
    }

    pub fn needs_resample(&self) -> bool {
        self.up != self.down
    }

    /// Converts one chunk. Equal rates pass through untouched.
    pub fn process(&mut self, input: &[i16]) -> Vec<i16> {
        if !self.needs_resample() {
            return input.to_vec();
        }
        if input.is_empty() {
            return Vec::new();
        }

        self.history.extend(input.iter().map(|&s| f32::from(s)));
        let end = self.base + self.history.len() as u64;
        let up = self.up as u64;
        let mut out = Vec::with_capacity(input.len() * self.up / self.down + 1);

        while self.next_t / up < end {
            let newest = self.next_t / up;
            let taps = &self.phases[(self.next_t % up) as usize];
            let mut acc = 0.0f32;
            for (k, &h) in taps.iter().enumerate() {
                // Samples before the start of the stream are silence.
                let Some(src) = newest.checked_sub(k as u64) else {
                    break;
                };
                if src < self.base {
                    break;
                }
                acc += h * self.history[(src - self.base) as usize];
            }
            out.push(saturate(acc));
            self.next_t += self.down as u64;
        }

        let keep = TAPS_PER_PHASE - 1;
        if self.history.len() > keep {
            let drop = self.history.len() - keep;
            self.history.drain(..drop);
            self.base += drop as u64;
        }
        out
    }

    /// Forgets all history, as if no audio had been processed.
    pub fn reset(&mut self) {
        self.history.clear();
        self.base = 0;
        self.next_t = 0;
    }
}

/// Prototype low-pass at the upsampled rate, split into `up` phases of
/// `TAPS_PER_PHASE` taps. DC gain is `up` so every phase sums to about one.
fn design_phases(up: usize, down: usize) -> Vec<Vec<f32>> {
    let len = TAPS_PER_PHASE * up;
    let center = (len as f64 - 1.0) / 2.0;
    let cutoff = CUTOFF * 0.5 / up.max(down) as f64;

    let mut prototype: Vec<f64> = (0..len)
        .map(|n| {
            let x = n as f64 - center;
            let window = 0.5 - 0.5 * (2.0 * PI * (n as f64 + 1.0) / (len as f64 + 1.0)).cos();
            2.0 * cutoff * sinc(2.0 * cutoff * x) * window
        })
        .collect();

    let sum: f64 = prototype.iter().sum();
    if sum.abs() > f64::EPSILON {
        let scale = up as f64 / sum;
        prototype.iter_mut().for_each(|h| *h *= scale);
    }

    (0..up)
        .map(|phase| {
            (0..TAPS_PER_PHASE)
                .map(|k| prototype[phase + k * up] as f32)
                .collect()
        })
        .collect()
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

fn saturate(value: f32) -> i16 {
    value
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
