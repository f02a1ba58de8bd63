//! Format-independent effect instructions.
//!
//! Each division channel holds at most one [`Effect`] per [`EffectKind`].
//! Effects are plain data; their runtime behaviour lives in the player's
//! effect processors.

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Discriminant of an [`Effect`]; a division channel keys its effects by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Start a new note
    SetPitch,
    /// Select an instrument
    SetSample,
    /// Set channel volume
    SetVolume,
    /// Slide the period up or down
    PeriodSlide,
    /// Cycle through a chord
    Arpeggio,
    /// Slide the volume
    VolumeSlide,
    /// Vibrato or tremolo oscillation
    Waveform,
    /// Waveform shape/retrigger setting
    WaveformControl,
    /// Silence the channel at a tick
    CutSample,
    /// Hold the note until a tick
    DelaySample,
    /// Restart the sample every n ticks
    RetriggerSample,
    /// Start playback at an offset
    SampleOffset,
    /// Set channel panning
    SetPanning,
    /// Enable ping-pong looping
    InvertSampleLoop,
    /// Override the finetune
    SetFinetune,
    /// Toggle semitone-snapping slides
    SetGlissando,
    /// Set ticks per division
    SetSpeed,
    /// Set tempo
    SetBeatsPerMinute,
    /// Jump to a song position / division
    PositionJump,
    /// Repeat from the loop mark
    Loop,
    /// Mark the division to loop back to
    SetLoopPosition,
}

impl EffectKind {
    /// Number of effect kinds
    pub const COUNT: usize = 21;
}

/// Which way a period slide moves the pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlideDirection {
    /// Raise pitch (period decreases)
    Up,
    /// Lower pitch (period increases)
    Down,
    /// Move toward the slide's limit, whichever way that is
    Toward,
}

/// Channel parameter modulated by a waveform effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveformTarget {
    /// Pitch modulation
    Vibrato,
    /// Volume modulation
    Tremolo,
}

impl WaveformTarget {
    /// Index into per-target state arrays
    pub fn index(self) -> usize {
        match self {
            WaveformTarget::Vibrato => 0,
            WaveformTarget::Tremolo => 1,
        }
    }
}

/// Oscillator shape for vibrato and tremolo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, Serialize, Deserialize)]
pub enum WaveformShape {
    /// Sine wave
    #[default]
    Sine = 0,
    /// Descending ramp
    RampDown = 1,
    /// Square wave
    Square = 2,
    /// Stepped pseudo-random values
    Random = 3,
}

/// Period slide parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodSlide {
    /// Period units per tick (always positive)
    pub delta: f32,
    /// Slide direction
    pub direction: SlideDirection,
    /// Period at which the slide stops (slide-to-note)
    pub limit: Option<u16>,
    /// Apply once at division start instead of every tick
    pub fine: bool,
    /// Snap to semitones when glissando is enabled
    pub glissando_sensitive: bool,
}

/// Volume slide parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSlide {
    /// Signed volume change per tick, in `[0, 1]` units
    pub delta: f32,
    /// Apply once at division start instead of every tick
    pub fine: bool,
}

/// Vibrato / tremolo parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    /// Modulated parameter
    pub target: WaveformTarget,
    /// Oscillator cycles per tick
    pub circles_per_tick: f32,
    /// Peak deviation (period units for vibrato, volume units for tremolo)
    pub amplitude: f32,
}

/// A decoded playback instruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Start a new note at `period`
    SetPitch {
        /// Hardware period
        period: u16,
    },
    /// Select the instrument used by the channel
    SetSample {
        /// Zero-based sample index
        index: usize,
    },
    /// Set channel volume
    SetVolume {
        /// Volume in `[0, 1]`
        volume: f32,
    },
    /// Slide the period
    PeriodSlide(PeriodSlide),
    /// Cycle the pitch through `semitones` above the current note
    Arpeggio {
        /// Semitone offsets, first is always 0
        semitones: [u8; 3],
    },
    /// Slide the volume
    VolumeSlide(VolumeSlide),
    /// Vibrato or tremolo
    Waveform(Waveform),
    /// Configure a waveform target
    WaveformControl {
        /// Target whose shape is configured
        target: WaveformTarget,
        /// Oscillator shape
        shape: WaveformShape,
        /// Reset the phase whenever the waveform effect starts
        retrigger: bool,
    },
    /// Zero the channel volume at `tick`
    CutSample {
        /// Tick index within the division
        tick: u8,
    },
    /// Hold the note silent until `tick`
    DelaySample {
        /// Tick index within the division
        tick: u8,
    },
    /// Restart the sample every `interval` ticks
    RetriggerSample {
        /// Tick interval (0 = never)
        interval: u8,
    },
    /// Start playback from `frames`
    SampleOffset {
        /// Frame offset
        frames: usize,
    },
    /// Set channel panning
    SetPanning {
        /// 0 = left, 1 = right
        panning: f32,
    },
    /// Ping-pong the repeat region
    InvertSampleLoop {
        /// 0 disables
        speed: u8,
    },
    /// Override the channel finetune
    SetFinetune {
        /// Eighths of a semitone
        finetune: i8,
    },
    /// Toggle glissando
    SetGlissando {
        /// Whether slides snap to semitones
        enabled: bool,
    },
    /// Set ticks per division
    SetSpeed {
        /// Ticks per division (1..=32)
        ticks_per_division: u8,
    },
    /// Set tempo
    SetBeatsPerMinute {
        /// Beats per minute (33..=255)
        bpm: u8,
    },
    /// Jump at the end of the current division
    PositionJump {
        /// Target song position, `None` = the next one
        song_position: Option<usize>,
        /// Target division
        division: usize,
    },
    /// Jump back to the loop mark `count` times
    Loop {
        /// Number of repetitions
        count: u8,
    },
    /// Mark the current division as the loop start
    SetLoopPosition,
}

impl Effect {
    /// Discriminant of this effect
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::SetPitch { .. } => EffectKind::SetPitch,
            Effect::SetSample { .. } => EffectKind::SetSample,
            Effect::SetVolume { .. } => EffectKind::SetVolume,
            Effect::PeriodSlide(_) => EffectKind::PeriodSlide,
            Effect::Arpeggio { .. } => EffectKind::Arpeggio,
            Effect::VolumeSlide(_) => EffectKind::VolumeSlide,
            Effect::Waveform(_) => EffectKind::Waveform,
            Effect::WaveformControl { .. } => EffectKind::WaveformControl,
            Effect::CutSample { .. } => EffectKind::CutSample,
            Effect::DelaySample { .. } => EffectKind::DelaySample,
            Effect::RetriggerSample { .. } => EffectKind::RetriggerSample,
            Effect::SampleOffset { .. } => EffectKind::SampleOffset,
            Effect::SetPanning { .. } => EffectKind::SetPanning,
            Effect::InvertSampleLoop { .. } => EffectKind::InvertSampleLoop,
            Effect::SetFinetune { .. } => EffectKind::SetFinetune,
            Effect::SetGlissando { .. } => EffectKind::SetGlissando,
            Effect::SetSpeed { .. } => EffectKind::SetSpeed,
            Effect::SetBeatsPerMinute { .. } => EffectKind::SetBeatsPerMinute,
            Effect::PositionJump { .. } => EffectKind::PositionJump,
            Effect::Loop { .. } => EffectKind::Loop,
            Effect::SetLoopPosition => EffectKind::SetLoopPosition,
        }
    }
}
