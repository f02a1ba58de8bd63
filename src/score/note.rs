//! Note names and the three-octave period table.
//!
//! Pitches are stored as hardware periods (larger period = lower pitch). The
//! table covers the classic three playable octaves; finetune and slides may
//! move a channel's period anywhere in between.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Periods for finetune 0, from C of octave 1 up to B of octave 3.
pub const PERIOD_TABLE: [u16; Note::COUNT] = [
    856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480, 453, // octave 1
    428, 404, 381, 360, 339, 320, 302, 285, 269, 254, 240, 226, // octave 2
    214, 202, 190, 180, 170, 160, 151, 143, 135, 127, 120, 113, // octave 3
];

const NOTE_NAMES: [&str; 12] = [
    "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
];

/// A note of the period table, addressed by semitone index from octave 1 C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Note(u8);

impl Note {
    /// Number of notes in the period table
    pub const COUNT: usize = 36;
    /// Lowest note (highest period)
    pub const OCTAVE_1_C: Note = Note(0);
    /// Middle octave C
    pub const OCTAVE_2_C: Note = Note(12);
    /// Highest note (lowest period)
    pub const OCTAVE_3_B: Note = Note(35);

    /// Note for a semitone index, if it lies inside the table.
    pub fn from_index(index: usize) -> Option<Note> {
        (index < Self::COUNT).then_some(Note(index as u8))
    }

    /// Semitone index from octave 1 C.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Period of this note at finetune 0.
    pub fn period(self) -> u16 {
        PERIOD_TABLE[self.index()]
    }

    /// Closest table note to an arbitrary period.
    pub fn nearest(period: f32) -> Note {
        let mut best = 0;
        let mut best_distance = f32::MAX;
        for (index, &candidate) in PERIOD_TABLE.iter().enumerate() {
            let distance = (candidate as f32 - period).abs();
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        Note(best as u8)
    }

    /// Move by `semitones` (positive = higher pitch), clamped to the table.
    pub fn transpose(self, semitones: i32) -> Note {
        let index = (self.0 as i32 + semitones).clamp(0, Self::COUNT as i32 - 1);
        Note(index as u8)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let octave = self.index() / 12 + 1;
        write!(f, "{}{}", NOTE_NAMES[self.index() % 12], octave)
    }
}

/// Shift a period by a (fractional) number of semitones; positive raises pitch.
pub fn transpose_period(period: f32, semitones: f32) -> f32 {
    period * 2f32.powf(-semitones / 12.0)
}
