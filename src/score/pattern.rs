//! Patterns, divisions and the song play order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::effect::{Effect, EffectKind};
use crate::error::{ModError, Result};

/// One channel slot of a division: at most one effect per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DivisionChannel {
    effects: BTreeMap<EffectKind, Effect>,
}

impl DivisionChannel {
    /// Insert `effect`, replacing any effect of the same kind.
    pub fn set_effect(&mut self, effect: Effect) {
        self.effects.insert(effect.kind(), effect);
    }

    /// Remove the effect of `kind`, returning it.
    pub fn remove_effect(&mut self, kind: EffectKind) -> Option<Effect> {
        self.effects.remove(&kind)
    }

    /// Effect of `kind`, if present.
    pub fn effect(&self, kind: EffectKind) -> Option<&Effect> {
        self.effects.get(&kind)
    }

    /// All effects, ordered by kind.
    pub fn effects(&self) -> impl Iterator<Item = &Effect> {
        self.effects.values()
    }

    /// Number of effects
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether the slot is empty
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

/// A row of a pattern: one [`DivisionChannel`] per playback channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Division {
    channels: Vec<DivisionChannel>,
}

impl Division {
    /// Empty division with `channel_count` slots
    pub fn new(channel_count: usize) -> Self {
        Self {
            channels: vec![DivisionChannel::default(); channel_count],
        }
    }

    /// Channel slot `index`
    pub fn channel(&self, index: usize) -> Option<&DivisionChannel> {
        self.channels.get(index)
    }

    /// Mutable channel slot `index`
    pub fn channel_mut(&mut self, index: usize) -> Option<&mut DivisionChannel> {
        self.channels.get_mut(index)
    }

    /// All channel slots
    pub fn channels(&self) -> &[DivisionChannel] {
        &self.channels
    }

    /// Number of channel slots
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// An ordered, gapless sequence of divisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    divisions: Vec<Division>,
}

impl Pattern {
    /// Empty pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create division `index`.
    ///
    /// # Errors
    /// Returns [`ModError::Format`] when `index` would leave a gap, i.e. when
    /// divisions `0..index` do not all exist yet.
    pub fn add_division(&mut self, index: usize, channel_count: usize) -> Result<&mut Division> {
        if index > self.divisions.len() {
            return Err(ModError::Format(format!(
                "division {} added before division {}",
                index,
                self.divisions.len()
            )));
        }
        if index == self.divisions.len() {
            self.divisions.push(Division::new(channel_count));
        }
        Ok(&mut self.divisions[index])
    }

    /// Division `index`
    pub fn division(&self, index: usize) -> Option<&Division> {
        self.divisions.get(index)
    }

    /// All divisions
    pub fn divisions(&self) -> &[Division] {
        &self.divisions
    }

    /// Number of divisions
    pub fn division_count(&self) -> usize {
        self.divisions.len()
    }
}

/// All patterns plus the play order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternList {
    patterns: Vec<Pattern>,
    /// Pattern index for each song position
    pub song_positions: Vec<usize>,
    /// Song position to resume from when looping the song
    pub restart_position: usize,
}

impl PatternList {
    /// Empty pattern list
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create pattern `index`, with the same gapless rule as divisions.
    pub fn add_pattern(&mut self, index: usize) -> Result<&mut Pattern> {
        if index > self.patterns.len() {
            return Err(ModError::Format(format!(
                "pattern {} added before pattern {}",
                index,
                self.patterns.len()
            )));
        }
        if index == self.patterns.len() {
            self.patterns.push(Pattern::new());
        }
        Ok(&mut self.patterns[index])
    }

    /// Pattern `index`
    pub fn pattern(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    /// All patterns
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Number of stored patterns
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Number of song positions
    pub fn song_length(&self) -> usize {
        self.song_positions.len()
    }

    /// Pattern played at `song_position`
    pub fn pattern_at(&self, song_position: usize) -> Option<&Pattern> {
        self.song_positions
            .get(song_position)
            .and_then(|&index| self.patterns.get(index))
    }

    /// First song position whose pattern index does not resolve.
    pub fn first_unresolved_position(&self) -> Option<usize> {
        self.song_positions
            .iter()
            .position(|&index| index >= self.patterns.len())
    }
}
