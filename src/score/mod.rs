//! Format-independent score model.
//!
//! A [`Module`] owns its patterns and samples and is read-only once parsed.
//! Playback shares it by reference; runtime state never flows back into it.

pub mod effect;
pub mod module;
pub mod note;
pub mod pattern;
pub mod sample;

pub use effect::{
    Effect, EffectKind, PeriodSlide, SlideDirection, VolumeSlide, Waveform, WaveformShape,
    WaveformTarget,
};
pub use module::{Module, ModuleFormat};
pub use note::{transpose_period, Note, PERIOD_TABLE};
pub use pattern::{Division, DivisionChannel, Pattern, PatternList};
pub use sample::Sample;
