// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Playback buffering between the provider and the switch.

use crate::resampler::Resampler;

/// Holds back the first `warmup_ms` of assistant audio so playback starts
/// with a cushion against network jitter, then passes audio straight through.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    sample_rate: u32,
    warmup_ms: u32,
    original_warmup_ms: u32,
    warmup_samples: usize,
    buffer: Vec<i16>,
    warmed_up: bool,
    total_samples: usize,
}

impl AudioBuffer {
    pub fn new(warmup_ms: u32, sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            warmup_ms,
            original_warmup_ms: warmup_ms,
            warmup_samples: samples_for(warmup_ms, sample_rate),
            buffer: Vec::new(),
            warmed_up: false,
            total_samples: 0,
        }
    }

    /// Adds audio. Returns nothing while warming up, the whole cushion once
    /// it fills, and the input unchanged afterwards.
    pub fn add(&mut self, samples: &[i16]) -> Vec<i16> {
        if samples.is_empty() {
            return Vec::new();
        }
        self.total_samples += samples.len();

        if self.warmed_up {
            return samples.to_vec();
        }

        self.buffer.extend_from_slice(samples);
        if self.buffer.len() < self.warmup_samples {
            return Vec::new();
        }

        self.warmed_up = true;
        let out = std::mem::take(&mut self.buffer);
        tracing::debug!(
            samples = out.len(),
            warmup_ms = self.warmup_ms,
            "playback warmup complete"
        );
        out
    }

    /// Releases whatever is still held back.
    pub fn flush(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.buffer)
    }

    /// Starts warming up again. `extended_warmup_ms` overrides the cushion
    /// until the next plain reset, which restores the original size.
    pub fn reset(&mut self, extended_warmup_ms: Option<u32>) {
        self.buffer.clear();
        self.warmed_up = false;
        self.total_samples = 0;
        self.warmup_ms = extended_warmup_ms.unwrap_or(self.original_warmup_ms);
        self.warmup_samples = samples_for(self.warmup_ms, self.sample_rate);
    }

    pub fn is_warming_up(&self) -> bool {
        !self.warmed_up
    }

    pub fn warmup_ms(&self) -> u32 {
        self.warmup_ms
    }

    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffered_ms(&self) -> f64 {
        self.buffer.len() as f64 * 1000.0 / f64::from(self.sample_rate)
    }

    /// Samples accepted since the last reset.
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }
}

fn samples_for(ms: u32, rate: u32) -> usize {
    (u64::from(ms) * u64::from(rate) / 1000) as usize
}

/// Both conversion directions of one call plus the playback cushion.
///
/// The provider may consume and produce audio at different rates, so the
/// two directions are configured independently.
#[derive(Debug, Clone)]
pub struct ResamplerPair {
    input: Resampler,
    output: Resampler,
    output_buffer: AudioBuffer,
}

impl ResamplerPair {
    pub fn new(
        switch_rate: u32,
        provider_input_rate: u32,
        provider_output_rate: u32,
        output_warmup_ms: u32,
    ) -> Self {
        Self {
            input: Resampler::new(switch_rate, provider_input_rate),
            output: Resampler::new(provider_output_rate, switch_rate),
            output_buffer: AudioBuffer::new(output_warmup_ms, switch_rate),
        }
    }

    /// Caller audio on its way to the provider.
    pub fn resample_input(&mut self, samples: &[i16]) -> Vec<i16> {
        self.input.process(samples)
    }

    /// Assistant audio on its way to the caller, through the warmup buffer.
    pub fn resample_output(&mut self, samples: &[i16]) -> Vec<i16> {
        let converted = self.output.process(samples);
        self.output_buffer.add(&converted)
    }

    pub fn flush_output(&mut self) -> Vec<i16> {
        self.output_buffer.flush()
    }

    /// Prepares for a new assistant response, e.g. after a barge-in.
    pub fn reset_output_buffer(&mut self, extended_warmup_ms: Option<u32>) {
        self.output_buffer.reset(extended_warmup_ms);
    }

    pub fn is_output_warming_up(&self) -> bool {
        self.output_buffer.is_warming_up()
    }

    pub fn output_buffer(&self) -> &AudioBuffer {
        &self.output_buffer
    }
}

/// Cuts an audio stream into fixed-size frames for the switch.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    frame_samples: usize,
    pending: Vec<i16>,
}

impl FrameAssembler {
    pub fn new(frame_samples: usize) -> Self {
        Self {
            frame_samples: frame_samples.max(1),
            pending: Vec::new(),
        }
    }

    /// Returns every complete frame; the remainder waits for more audio.
    pub fn push(&mut self, samples: &[i16]) -> Vec<Vec<i16>> {
        self.pending.extend_from_slice(samples);
        let complete = self.pending.len() / self.frame_samples * self.frame_samples;
        if complete == 0 {
            return Vec::new();
        }
        let rest = self.pending.split_off(complete);
        let full = std::mem::replace(&mut self.pending, rest);
        full.chunks(self.frame_samples).map(<[i16]>::to_vec).collect()
    }

    /// The final short frame, if any.
    pub fn finish(&mut self) -> Option<Vec<i16>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
