//! Playback session: the block-pull entry point used by audio hosts.

use std::sync::Arc;

use crate::score::{DivisionChannel, Module};

use super::channel::{default_panning, ChannelPlaybackState};
use super::processor::{EffectPipeline, ProcessorContext};
use super::sequencer::{
    Cursor, CursorChange, GlobalPlaybackState, DEFAULT_BPM, DEFAULT_TICKS_PER_DIVISION,
};

/// Session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Output sample rate in Hz (default: 44100)
    pub sample_rate: f32,
    /// Tempo before any tempo effect (default: 125)
    pub initial_bpm: f32,
    /// Ticks per division before any speed effect (default: 6)
    pub initial_ticks_per_division: usize,
    /// Tempo scale factor (default: 1.0)
    pub speed_multiplier: f32,
    /// Keep playing from the restart position after the last song position
    pub loop_song: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            initial_bpm: DEFAULT_BPM,
            initial_ticks_per_division: DEFAULT_TICKS_PER_DIVISION,
            speed_multiplier: 1.0,
            loop_song: false,
        }
    }
}

impl SessionConfig {
    /// Config with a custom sample rate
    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    /// Set the starting tempo
    pub fn bpm(mut self, bpm: f32) -> Self {
        self.initial_bpm = bpm;
        self
    }

    /// Set the starting ticks per division
    pub fn ticks_per_division(mut self, ticks: usize) -> Self {
        self.initial_ticks_per_division = ticks;
        self
    }

    /// Scale the tempo
    pub fn speed_multiplier(mut self, multiplier: f32) -> Self {
        self.speed_multiplier = multiplier;
        self
    }

    /// Loop the song instead of ending
    pub fn loop_song(mut self, enable: bool) -> Self {
        self.loop_song = enable;
        self
    }
}

/// Result of [`Session::next_block`].
#[derive(Debug, PartialEq)]
pub enum Block<'a> {
    /// One buffer per channel, each holding the requested frame count.
    /// Frames after the end of the song are silent.
    Audio(&'a [Vec<f32>]),
    /// The song has ended; no more audio will be produced
    EndOfSong,
}

/// A module being played.
///
/// Owns the runtime state; the module itself is shared read-only.
#[derive(Debug, Clone)]
pub struct Session {
    module: Arc<Module>,
    config: SessionConfig,
    global: GlobalPlaybackState,
    channels: Vec<ChannelPlaybackState>,
    pipelines: Vec<EffectPipeline>,
    buffers: Vec<Vec<f32>>,
    finished: bool,
}

/// Create a session playing `module` at `sample_rate`.
pub fn create_session(module: impl Into<Arc<Module>>, sample_rate: f32) -> Session {
    Session::new(module, sample_rate)
}

impl Session {
    /// Create a session with default settings at `sample_rate`.
    pub fn new(module: impl Into<Arc<Module>>, sample_rate: f32) -> Self {
        Self::with_config(module, SessionConfig::with_sample_rate(sample_rate))
    }

    /// Create a session with explicit settings.
    pub fn with_config(module: impl Into<Arc<Module>>, config: SessionConfig) -> Self {
        let module = module.into();
        let channel_count = module.channel_count();

        if let Some(position) = module.patterns.first_unresolved_position() {
            log::warn!(
                "song position {} references missing pattern {}, playing it as empty",
                position,
                module.patterns.song_positions[position]
            );
        }
        if let Some(index) = module.first_missing_sample() {
            log::warn!(
                "patterns select undefined sample {}, those notes play muted",
                index + 1
            );
        }
        if module.patterns.song_length() == 0 {
            log::warn!("module '{}' has an empty play order", module.name);
        }

        let mut session = Self {
            global: GlobalPlaybackState::for_module(&module, config.sample_rate),
            channels: Vec::with_capacity(channel_count),
            pipelines: Vec::with_capacity(channel_count),
            buffers: vec![Vec::new(); channel_count],
            finished: false,
            module,
            config,
        };
        session.restart();
        session
    }

    /// Rewind to the start of the song with fresh channel state.
    pub fn restart(&mut self) {
        let config = &self.config;
        self.global.restart();
        self.global.set_bpm(config.initial_bpm);
        self.global
            .set_ticks_per_division(config.initial_ticks_per_division);
        self.global.set_speed_multiplier(config.speed_multiplier);
        self.global.glissando_enabled = false;

        let channel_count = self.module.channel_count();
        self.channels = (0..channel_count)
            .map(|index| ChannelPlaybackState::new(config.sample_rate, default_panning(index)))
            .collect();
        self.pipelines = (0..channel_count).map(|_| EffectPipeline::new()).collect();
        self.finished = self.module.patterns.song_length() == 0;
    }

    /// Render the next `frame_count` samples for every channel.
    ///
    /// Returns [`Block::EndOfSong`] once the song has ended (unless looping
    /// is enabled). The block in which the song ends is padded with silence.
    pub fn next_block(&mut self, frame_count: usize) -> Block<'_> {
        if self.finished {
            return Block::EndOfSong;
        }

        for buffer in self.buffers.iter_mut() {
            buffer.clear();
            buffer.resize(frame_count, 0.0);
        }

        for frame in 0..frame_count {
            if !self.step(frame) {
                break;
            }
        }

        Block::Audio(&self.buffers)
    }

    /// Advance one output sample; returns `false` once the song has ended.
    fn step(&mut self, frame: usize) -> bool {
        let changes = self.global.advance();
        if changes.contains(CursorChange::SONG_END) {
            if self.config.loop_song {
                log::debug!("song wrapped to position {}", self.global.cursor.song_position);
            } else {
                self.finished = true;
                return false;
            }
        }

        let module: &Module = &self.module;
        let cursor = self.global.cursor;
        let tick_changed = changes.contains(CursorChange::TICK);

        for (index, (channel, pipeline)) in self
            .channels
            .iter_mut()
            .zip(self.pipelines.iter_mut())
            .enumerate()
        {
            let mut ctx = ProcessorContext {
                channel,
                global: &mut self.global,
                module,
            };
            if changes.contains(CursorChange::DIVISION) {
                pipeline.begin_division(&mut ctx, division_slot(module, &cursor, index));
            }
            pipeline.process(&mut ctx, tick_changed);

            self.buffers[index][frame] = ctx.channel.next_sample(module);
        }

        true
    }

    /// Current playback position
    pub fn cursor(&self) -> Cursor {
        self.global.cursor
    }

    /// Playback state of channel `index`
    pub fn channel(&self, index: usize) -> Option<&ChannelPlaybackState> {
        self.channels.get(index)
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Shared song state
    pub fn global(&self) -> &GlobalPlaybackState {
        &self.global
    }

    /// The module being played
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Session settings
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the song has ended
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Effects of channel `index` at `cursor`; missing patterns play as empty.
fn division_slot<'m>(
    module: &'m Module,
    cursor: &Cursor,
    index: usize,
) -> Option<&'m DivisionChannel> {
    module
        .patterns
        .pattern_at(cursor.song_position)
        .and_then(|pattern| pattern.division(cursor.division))
        .and_then(|division| division.channel(index))
}
