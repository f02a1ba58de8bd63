//! Instrument samples: PCM frames plus loop metadata.

use serde::{Deserialize, Serialize};

use crate::error::{ModError, Result};

/// A sampled instrument.
///
/// PCM frames are normalized to `[-1, 1]`. A `repeat_length` of zero means the
/// sample plays once and then falls silent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Sample name as stored in the module
    pub name: String,
    pcm: Vec<f32>,
    volume: f32,
    /// Pitch correction in eighths of a semitone (-8..=7)
    pub finetune: i8,
    /// First frame of the repeat region
    pub repeat_offset: usize,
    /// Frames in the repeat region (0 = no loop)
    pub repeat_length: usize,
}

impl Sample {
    /// Create a non-looping sample.
    ///
    /// # Errors
    /// Returns [`ModError::Validation`] if `volume` is outside `[0, 1]`.
    pub fn new(name: impl Into<String>, pcm: Vec<f32>, volume: f32) -> Result<Self> {
        let mut sample = Self {
            name: name.into(),
            pcm,
            ..Self::default()
        };
        sample.set_volume(volume)?;
        Ok(sample)
    }

    /// Set the repeat region, clipped to the PCM body.
    pub fn with_loop(mut self, repeat_offset: usize, repeat_length: usize) -> Self {
        let offset = repeat_offset.min(self.pcm.len());
        self.repeat_offset = offset;
        self.repeat_length = repeat_length.min(self.pcm.len() - offset);
        self
    }

    /// Set the finetune.
    pub fn with_finetune(mut self, finetune: i8) -> Self {
        self.finetune = finetune;
        self
    }

    /// PCM frames
    pub fn pcm(&self) -> &[f32] {
        &self.pcm
    }

    /// Number of PCM frames
    pub fn len(&self) -> usize {
        self.pcm.len()
    }

    /// Whether the sample holds no PCM data
    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    /// Default volume in `[0, 1]`
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Change the default volume.
    ///
    /// # Errors
    /// Returns [`ModError::Validation`] if `volume` is outside `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(ModError::Validation {
                field: "sample volume",
                value: volume.to_string(),
                expected: "a value in [0, 1]",
            });
        }
        self.volume = volume;
        Ok(())
    }

    /// Whether the sample has a repeat region
    pub fn has_loop(&self) -> bool {
        self.repeat_length > 0
    }

    /// Frame just past the repeat region
    pub fn loop_end(&self) -> usize {
        self.repeat_offset + self.repeat_length
    }
}
