//! Offline rendering of a module to audio files
//!
//! The session produces one mono buffer per channel; this module mixes them
//! down to mono or to stereo using each channel's pan position, and writes
//! the result with `hound`.
//!
//! # Examples
//!
//! ```no_run
//! use mod_replayer::export::{render_to_wav, ExportConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("song.mod")?;
//! let module = mod_replayer::parse(&data)?;
//!
//! let config = ExportConfig::stereo().max_duration(180.0).fade_out(2.0);
//! render_to_wav(module, "song.wav", &config)?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "export-wav")]
mod wav;
#[cfg(feature = "export-wav")]
pub use wav::*;

/// Export configuration options
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Sample rate for export (default: 44100 Hz)
    pub sample_rate: u32,
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Write 32-bit float samples instead of 16-bit integers
    pub float_samples: bool,
    /// Stereo width, 0 = mono, 1 = the channels' full pan positions
    pub stereo_separation: f32,
    /// Render at most this many seconds (guards against looping songs)
    pub max_duration: f32,
    /// Whether to normalize audio to prevent clipping
    pub normalize: bool,
    /// Fade out duration in seconds (0 = no fade)
    pub fade_out_duration: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            float_samples: false,
            stereo_separation: 1.0,
            max_duration: 600.0,
            normalize: true,
            fade_out_duration: 0.0,
        }
    }
}

impl ExportConfig {
    /// Create config for stereo export
    pub fn stereo() -> Self {
        Self {
            channels: 2,
            ..Default::default()
        }
    }

    /// Create config with custom sample rate
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    /// Set the stereo width
    pub fn separation(mut self, separation: f32) -> Self {
        self.stereo_separation = separation.clamp(0.0, 1.0);
        self
    }

    /// Limit the rendered length
    pub fn max_duration(mut self, seconds: f32) -> Self {
        self.max_duration = seconds;
        self
    }

    /// Write 32-bit float samples
    pub fn float_samples(mut self, enable: bool) -> Self {
        self.float_samples = enable;
        self
    }

    /// Enable normalization to prevent clipping
    pub fn normalize(mut self, enable: bool) -> Self {
        self.normalize = enable;
        self
    }

    /// Add fade out at the end
    pub fn fade_out(mut self, duration_seconds: f32) -> Self {
        self.fade_out_duration = duration_seconds;
        self
    }

    /// Output frames allowed by `max_duration`
    pub fn max_frames(&self) -> usize {
        (self.max_duration.max(0.0) * self.sample_rate as f32) as usize
    }
}

/// Mix one frame of per-channel buffers into `out` (1 or 2 values).
///
/// Every channel contributes at most `1 / channel_count` per output side, so
/// the mix cannot clip before normalization.
fn mix_frame(
    buffers: &[Vec<f32>],
    pans: &[f32],
    frame: usize,
    separation: f32,
    out: &mut [f32],
) {
    out.iter_mut().for_each(|v| *v = 0.0);
    if buffers.is_empty() {
        return;
    }
    let gain = 1.0 / buffers.len() as f32;

    for (buffer, &panning) in buffers.iter().zip(pans) {
        let value = buffer[frame] * gain;
        match &mut *out {
            [mono] => *mono += value,
            [left, right, ..] => {
                let pan = 0.5 + (panning - 0.5) * separation;
                *left += value * (1.0 - pan) * 2.0;
                *right += value * pan * 2.0;
            }
            [] => {}
        }
    }
}

/// Scale audio down so its peak sits at 0.95; quieter audio is left as is.
fn normalize_samples(samples: &mut [f32]) {
    if samples.is_empty() {
        return;
    }

    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

    if peak > 0.95 {
        let scale = 0.95 / peak;
        for sample in samples.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Apply fade out to the last `fade_duration` seconds of interleaved audio
fn apply_fade_out(samples: &mut [f32], fade_duration: f32, sample_rate: u32, channels: u16) {
    if fade_duration <= 0.0 || samples.is_empty() {
        return;
    }

    let channels = channels.max(1) as usize;
    let fade_frames = ((fade_duration * sample_rate as f32) as usize).max(1);
    let total_frames = samples.len() / channels;
    let start_fade = total_frames.saturating_sub(fade_frames);

    for (i, frame) in samples.chunks_mut(channels).enumerate().skip(start_fade) {
        let progress = (i - start_fade) as f32 / fade_frames as f32;
        let fade_factor = 1.0 - progress;
        for sample in frame {
            *sample *= fade_factor;
        }
    }
}
