//! Song cursor, timing and jump/loop bookkeeping.
//!
//! The cursor advances one output sample at a time:
//!
//! ```text
//! sample_within_tick -> tick -> division -> song_position
//! ```
//!
//! Each [`GlobalPlaybackState::advance`] reports which levels changed so the
//! session knows when to start a new division's effects and when a tick
//! boundary was crossed.

use bitflags::bitflags;

use crate::score::{Module, WaveformShape, WaveformTarget};

/// Tick units per beat used to derive the tick length from the tempo
pub const TICKS_PER_BEAT: f64 = 24.0;
/// Default tempo
pub const DEFAULT_BPM: f32 = 125.0;
/// Default ticks per division
pub const DEFAULT_TICKS_PER_DIVISION: usize = 6;

bitflags! {
    /// Cursor levels changed by one `advance()`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CursorChange: u8 {
        /// A new tick started
        const TICK = 0x01;
        /// A new division started
        const DIVISION = 0x02;
        /// A new song position started
        const SONG_POSITION = 0x04;
        /// The cursor wrapped past the last song position
        const SONG_END = 0x08;
    }
}

impl CursorChange {
    /// Every level changed at once (cold start)
    pub fn cold_start() -> Self {
        CursorChange::TICK | CursorChange::DIVISION | CursorChange::SONG_POSITION
    }
}

/// Current playback position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Index into the play order
    pub song_position: usize,
    /// Division within the current pattern
    pub division: usize,
    /// Tick within the current division
    pub tick: usize,
    /// Output sample within the current tick
    pub sample_within_tick: usize,
}

/// One-shot jump executed at the next division boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTarget {
    /// Song position to continue at
    pub song_position: usize,
    /// Division to continue at
    pub division: usize,
}

/// Pattern loop state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopMark {
    /// Division to jump back to
    pub division: usize,
    /// Jumps taken so far
    pub counter: u8,
    /// Jumps requested by the loop effect
    pub target: u8,
}

/// Vibrato/tremolo oscillator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformSetting {
    /// Oscillator shape
    pub shape: WaveformShape,
    /// Reset the phase whenever a waveform effect starts
    pub retrigger: bool,
}

impl Default for WaveformSetting {
    fn default() -> Self {
        Self {
            shape: WaveformShape::Sine,
            retrigger: true,
        }
    }
}

/// Playback state shared by all channels.
#[derive(Debug, Clone)]
pub struct GlobalPlaybackState {
    /// Current position
    pub cursor: Cursor,
    /// Whether period slides to a note snap to semitones
    pub glissando_enabled: bool,
    pending_jump: Option<JumpTarget>,
    /// Song position named by a position jump in the current division
    armed_position: Option<usize>,
    /// Division named by a pattern break in the current division
    armed_break: Option<usize>,
    loop_mark: LoopMark,
    ticks_per_division: usize,
    samples_per_tick: f64,
    /// Fraction of a sample the current tick started late by
    tick_carry: f64,
    bpm: f32,
    speed_multiplier: f32,
    sample_rate: f32,
    waveforms: [WaveformSetting; 2],
    /// Divisions in the pattern at each song position
    division_counts: Vec<usize>,
    restart_position: usize,
    restarted: bool,
}

impl GlobalPlaybackState {
    /// Create a state for a song whose positions have `division_counts` divisions.
    pub fn new(division_counts: Vec<usize>, sample_rate: f32) -> Self {
        let mut state = Self {
            cursor: Cursor::default(),
            glissando_enabled: false,
            pending_jump: None,
            armed_position: None,
            armed_break: None,
            loop_mark: LoopMark::default(),
            ticks_per_division: DEFAULT_TICKS_PER_DIVISION,
            samples_per_tick: 1.0,
            tick_carry: 0.0,
            bpm: DEFAULT_BPM,
            speed_multiplier: 1.0,
            sample_rate,
            waveforms: [WaveformSetting::default(); 2],
            division_counts,
            restart_position: 0,
            restarted: true,
        };
        state.update_samples_per_tick();
        state
    }

    /// Create a state following the play order of `module`.
    ///
    /// Song positions whose pattern is missing count as empty patterns.
    pub fn for_module(module: &Module, sample_rate: f32) -> Self {
        let patterns = &module.patterns;
        let division_counts = (0..patterns.song_length())
            .map(|position| patterns.pattern_at(position).map_or(0, |p| p.division_count()))
            .collect();
        let mut state = Self::new(division_counts, sample_rate);
        state.set_restart_position(patterns.restart_position);
        state
    }

    /// Return to the start of the song; the next `advance()` is a cold start.
    pub fn restart(&mut self) {
        self.cursor = Cursor::default();
        self.pending_jump = None;
        self.armed_position = None;
        self.armed_break = None;
        self.loop_mark = LoopMark::default();
        self.tick_carry = 0.0;
        self.restarted = true;
    }

    /// Move one output sample forward.
    ///
    /// Ticks last a whole number of samples; the fractional remainder of
    /// `samples_per_tick` carries into the next tick so the tempo holds on
    /// average.
    pub fn advance(&mut self) -> CursorChange {
        if self.restarted {
            self.restarted = false;
            self.cursor = Cursor::default();
            self.tick_carry = 0.0;
            return CursorChange::cold_start();
        }

        let mut changes = CursorChange::empty();

        self.cursor.sample_within_tick += 1;
        let elapsed = self.cursor.sample_within_tick as f64 + self.tick_carry;
        if elapsed < self.samples_per_tick {
            return changes;
        }
        self.tick_carry = (elapsed - self.samples_per_tick) % 1.0;
        self.cursor.sample_within_tick = 0;
        self.cursor.tick += 1;
        changes |= CursorChange::TICK;

        if self.cursor.tick < self.ticks_per_division {
            return changes;
        }
        self.cursor.tick = 0;
        changes |= CursorChange::DIVISION;
        self.armed_position = None;
        self.armed_break = None;

        if let Some(jump) = self.pending_jump.take() {
            if jump.song_position != self.cursor.song_position {
                changes |= self.enter_song_position(jump.song_position);
            }
            self.cursor.division = if jump.division < self.division_count() {
                jump.division
            } else {
                0
            };
        } else {
            self.cursor.division += 1;
            if self.cursor.division >= self.division_count() {
                self.cursor.division = 0;
                changes |= self.enter_song_position(self.cursor.song_position + 1);
            }
        }

        changes
    }

    fn enter_song_position(&mut self, song_position: usize) -> CursorChange {
        let mut changes = CursorChange::SONG_POSITION;
        self.cursor.song_position = song_position;
        if song_position >= self.song_length() {
            changes |= CursorChange::SONG_END;
            self.cursor.song_position = self.restart_position;
        }
        self.loop_mark = LoopMark::default();
        changes
    }

    /// Divisions at the current song position
    pub fn division_count(&self) -> usize {
        self.division_counts
            .get(self.cursor.song_position)
            .copied()
            .unwrap_or(0)
    }

    /// Number of song positions
    pub fn song_length(&self) -> usize {
        self.division_counts.len()
    }

    /// Song position used after the song wraps.
    pub fn set_restart_position(&mut self, position: usize) {
        self.restart_position = if position < self.song_length() {
            position
        } else {
            0
        };
    }

    /// Arm a jump taken at the next division boundary.
    pub fn set_jump_position(&mut self, song_position: usize, division: usize) {
        self.pending_jump = Some(JumpTarget {
            song_position,
            division,
        });
    }

    /// Arm a position jump (`Bxx`) to `song_position`.
    ///
    /// A pattern break armed earlier in the same division keeps its target
    /// division, whichever channel it came from.
    pub fn set_position_jump(&mut self, song_position: usize, division: usize) {
        let division = self.armed_break.unwrap_or(division);
        self.armed_position = Some(song_position);
        self.set_jump_position(song_position, division);
    }

    /// Arm a pattern break (`Dxy`) to `division` of the next song position,
    /// or of the position named by a jump armed in the same division.
    pub fn set_pattern_break(&mut self, division: usize) {
        let song_position = self
            .armed_position
            .unwrap_or(self.cursor.song_position + 1);
        self.armed_break = Some(division);
        self.set_jump_position(song_position, division);
    }

    /// Pending jump, if one is armed
    pub fn pending_jump(&self) -> Option<JumpTarget> {
        self.pending_jump
    }

    /// Jump back to the loop mark until `loop_count` jumps have been taken.
    ///
    /// A different `loop_count` than the one being tracked restarts the
    /// counter. Once the loop completes the counter resets so a later pass
    /// over the same division loops again.
    pub fn set_loop(&mut self, loop_count: u8) {
        if loop_count != self.loop_mark.target {
            self.loop_mark.counter = 0;
            self.loop_mark.target = loop_count;
        }

        if self.loop_mark.counter < loop_count {
            self.loop_mark.counter += 1;
            self.set_jump_position(self.cursor.song_position, self.loop_mark.division);
        } else {
            self.loop_mark.counter = 0;
        }
    }

    /// Mark `division` as the loop start.
    ///
    /// Moving the mark drops any loop in progress. Re-marking the same
    /// division (as happens when a loop jumps back onto its own mark) keeps
    /// the counter, otherwise the loop would never finish.
    pub fn set_loop_position(&mut self, division: usize) {
        if division != self.loop_mark.division {
            self.loop_mark.division = division;
            self.loop_mark.counter = 0;
        }
    }

    /// Current loop state
    pub fn loop_mark(&self) -> LoopMark {
        self.loop_mark
    }

    /// Ticks per division
    pub fn ticks_per_division(&self) -> usize {
        self.ticks_per_division
    }

    /// Set ticks per division (minimum 1).
    pub fn set_ticks_per_division(&mut self, ticks: usize) {
        self.ticks_per_division = ticks.max(1);
    }

    /// Output samples per tick
    pub fn samples_per_tick(&self) -> f64 {
        self.samples_per_tick
    }

    /// Output sample rate
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Tempo in beats per minute
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Set the tempo; non-positive values are ignored.
    pub fn set_bpm(&mut self, bpm: f32) {
        if bpm > 0.0 {
            self.bpm = bpm;
            self.update_samples_per_tick();
        }
    }

    /// Tempo multiplier
    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Scale the tempo; non-positive values are ignored.
    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        if multiplier > 0.0 {
            self.speed_multiplier = multiplier;
            self.update_samples_per_tick();
        }
    }

    fn update_samples_per_tick(&mut self) {
        let samples = (self.sample_rate as f64 * 60.0)
            / (self.bpm as f64 * self.speed_multiplier as f64)
            / TICKS_PER_BEAT;
        self.samples_per_tick = samples.max(1.0);
    }

    /// Waveform configuration for `target`
    pub fn waveform(&self, target: WaveformTarget) -> WaveformSetting {
        self.waveforms[target.index()]
    }

    /// Configure the waveform for `target`.
    pub fn set_waveform(&mut self, target: WaveformTarget, setting: WaveformSetting) {
        self.waveforms[target.index()] = setting;
    }
}
