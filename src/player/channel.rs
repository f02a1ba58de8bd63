//! Per-channel playback state and the sample synthesizer.

use crate::score::Module;

/// Amiga PAL clock constant: playback rate in Hz = `STEP_CONSTANT / (period * 2)`
pub const STEP_CONSTANT: f64 = 7_093_789.2;

/// Default pan positions of the Amiga's hard-wired left/right/right/left voices.
pub fn default_panning(channel_index: usize) -> f32 {
    match channel_index % 4 {
        0 | 3 => 0.0,
        _ => 1.0,
    }
}

/// Mutable state of one playback channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPlaybackState {
    /// Current period; 0 until a note is played
    pub pitch: f32,
    /// Finetune in eighths of a semitone, positive raises pitch
    pub finetune: i8,
    /// Ping-pong looping enabled
    pub invert_loop: bool,
    /// Output held silent by a note delay
    pub held: bool,
    /// Pan position, 0 = left, 1 = right
    pub panning: f32,
    /// Selected sample, `None` when nothing (or a missing slot) is selected
    pub current_sample: Option<usize>,
    /// Fractional frame position inside the current sample
    pub sample_position: f64,
    /// Vibrato and tremolo oscillator phase in cycles, indexed by
    /// [`WaveformTarget::index`](crate::score::WaveformTarget::index)
    pub waveform_phase: [f32; 2],
    volume: f32,
    direction: f64,
    sample_rate: f64,
}

impl ChannelPlaybackState {
    /// Create a silent channel.
    pub fn new(sample_rate: f32, panning: f32) -> Self {
        Self {
            pitch: 0.0,
            finetune: 0,
            invert_loop: false,
            held: false,
            panning,
            current_sample: None,
            sample_position: 0.0,
            waveform_phase: [0.0; 2],
            volume: 0.0,
            direction: 1.0,
            sample_rate: sample_rate as f64,
        }
    }

    /// Volume in `[0, 1]`
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the volume, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Restart the current sample from its first frame.
    pub fn trigger(&mut self) {
        self.sample_position = 0.0;
        self.direction = 1.0;
    }

    /// Whether playback currently runs backwards through a ping-pong loop
    pub fn is_reversed(&self) -> bool {
        self.direction < 0.0
    }

    /// Period after finetune, which counts eighths of a semitone:
    /// `pitch * 2^(-finetune / 96)`. Positive finetune shortens the period
    /// and raises the pitch.
    pub fn effective_period(&self) -> f64 {
        self.pitch as f64 * 2f64.powf(-(self.finetune as f64) / 96.0)
    }

    /// Frames advanced per output sample at the current pitch.
    pub fn step(&self) -> f64 {
        let period = self.effective_period();
        if period <= 0.0 || self.sample_rate <= 0.0 {
            return 0.0;
        }
        STEP_CONSTANT / (period * 2.0 * self.sample_rate)
    }

    /// Produce one output value and advance through the sample.
    ///
    /// Returns silence when no sample is selected, no note has been played,
    /// the output is held, or the position ran past a non-looping sample.
    pub fn next_sample(&mut self, module: &Module) -> f32 {
        if self.held || self.pitch <= 0.0 {
            return 0.0;
        }
        let Some(sample) = self.current_sample.and_then(|index| module.sample(index)) else {
            return 0.0;
        };
        if self.sample_position < 0.0 {
            return 0.0;
        }
        let Some(&frame) = sample.pcm().get(self.sample_position as usize) else {
            return 0.0;
        };

        let value = frame * self.volume;
        self.sample_position += self.step() * self.direction;

        if sample.has_loop() {
            let start = sample.repeat_offset as f64;
            let end = sample.loop_end() as f64;
            let length = sample.repeat_length as f64;

            if self.invert_loop {
                if self.direction > 0.0 && self.sample_position >= end {
                    let overflow = (self.sample_position - end) % length;
                    self.sample_position = (end - 1.0 - overflow).max(start);
                    self.direction = -1.0;
                } else if self.direction < 0.0 && self.sample_position < start {
                    let overflow = (start - self.sample_position) % length;
                    self.sample_position = (start - 1.0 + overflow).clamp(start, end - 1.0);
                    self.direction = 1.0;
                }
            } else {
                self.direction = 1.0;
                if self.sample_position >= end {
                    self.sample_position = start + (self.sample_position - end) % length;
                }
            }
        }

        value
    }
}
