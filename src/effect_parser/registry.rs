//! Effect dispatch table.
//!
//! The registry maps compiled [`BitPattern`]s to handler functions and holds
//! exactly one pitch handler and one sample handler. It is built once and
//! then shared by reference with every parser that needs it.

use super::bit_pattern::{BitPattern, Parameter};
use super::history::EffectParseHistory;
use crate::error::{ModError, Result};
use crate::score::Effect;

/// Handler invoked for a matching effect value (or for the raw pitch/sample).
pub type EffectHandler = fn(&mut EffectEvent<'_>);

/// Raw fields of one pattern cell, as extracted by a format parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCell {
    /// 12-bit packed effect group
    pub effect_bits: u16,
    /// Hardware period, 0 = no note
    pub pitch: u16,
    /// One-based sample number, 0 = no sample
    pub sample_number: u8,
}

/// What a handler sees and produces for one channel cell.
#[derive(Debug)]
pub struct EffectEvent<'a> {
    /// Channel the cell belongs to
    pub channel_index: usize,
    /// Parameters extracted from the matched pattern
    pub parameter: Parameter,
    /// Raw period field
    pub pitch: u16,
    /// Raw sample number field
    pub sample_number: u8,
    /// Effects previously decoded on this channel
    pub history: &'a EffectParseHistory,
    /// Suppress the pitch handler for this cell
    pub ignore_pitch: bool,
    /// Suppress the sample handler for this cell
    pub ignore_sample: bool,
    effects: Vec<Effect>,
}

impl<'a> EffectEvent<'a> {
    fn new(channel_index: usize, cell: RawCell, history: &'a EffectParseHistory) -> Self {
        Self {
            channel_index,
            parameter: Parameter::default(),
            pitch: cell.pitch,
            sample_number: cell.sample_number,
            history,
            ignore_pitch: false,
            ignore_sample: false,
            effects: Vec::new(),
        }
    }

    /// Add an effect to this cell's output.
    pub fn emit(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Effects emitted so far
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }
}

/// Registry of effect handlers keyed by bit pattern.
#[derive(Debug, Default)]
pub struct EffectRegistry {
    handlers: Vec<(BitPattern, EffectHandler)>,
    pitch_handler: Option<EffectHandler>,
    sample_handler: Option<EffectHandler>,
}

impl EffectRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for values matching `pattern`.
    ///
    /// Earlier registrations win when patterns overlap, so register specific
    /// patterns before general ones.
    pub fn register(&mut self, pattern: &str, handler: EffectHandler) -> Result<&mut Self> {
        let compiled = BitPattern::compile(pattern)?;
        self.handlers.push((compiled, handler));
        Ok(self)
    }

    /// Set the handler that turns the raw period into effects.
    pub fn set_pitch_handler(&mut self, handler: EffectHandler) -> &mut Self {
        self.pitch_handler = Some(handler);
        self
    }

    /// Set the handler that turns the raw sample number into effects.
    pub fn set_sample_handler(&mut self, handler: EffectHandler) -> &mut Self {
        self.sample_handler = Some(handler);
        self
    }

    /// Registered patterns in registration order
    pub fn patterns(&self) -> impl Iterator<Item = &BitPattern> {
        self.handlers.iter().map(|(pattern, _)| pattern)
    }

    /// First registered pattern matching `effect_bits`.
    pub fn find(&self, effect_bits: u16) -> Option<(&BitPattern, EffectHandler)> {
        self.handlers
            .iter()
            .find(|(pattern, _)| pattern.matches(effect_bits))
            .map(|(pattern, handler)| (pattern, *handler))
    }

    /// Decode one channel cell into effects and update `history`.
    ///
    /// Unmatched effect values are ignored; the pitch and sample handlers
    /// still run unless a matched handler suppressed them.
    ///
    /// # Errors
    /// Returns [`ModError::MissingHandler`] when the pitch or sample handler
    /// has not been set.
    pub fn parse_channel(
        &self,
        channel_index: usize,
        cell: RawCell,
        history: &mut EffectParseHistory,
    ) -> Result<Vec<Effect>> {
        let pitch_handler = self.pitch_handler.ok_or(ModError::MissingHandler("pitch"))?;
        let sample_handler = self
            .sample_handler
            .ok_or(ModError::MissingHandler("sample"))?;

        let effects = {
            let mut event = EffectEvent::new(channel_index, cell, history);

            if let Some((pattern, handler)) = self.find(cell.effect_bits & 0x0FFF) {
                event.parameter = pattern.extract(cell.effect_bits);
                handler(&mut event);
            }

            if !event.ignore_sample {
                sample_handler(&mut event);
            }
            if !event.ignore_pitch {
                pitch_handler(&mut event);
            }

            event.effects
        };

        for effect in &effects {
            history.record(effect);
        }

        Ok(effects)
    }
}
