//! Binary module parser.
//!
//! Reads the ProTracker family layout (15-sample legacy files and the tagged
//! 31-sample variants with 4, 6 or 8 channels) into a [`Module`].
//!
//! Format details:
//! - Header: song name, sample headers, play order, optional 4-byte tag
//! - Patterns: 64 divisions x channels x 4-byte cells
//! - Sample bodies: signed 8-bit PCM, concatenated in slot order
//!
//! Only a truncated header or pattern block is fatal. Short sample bodies,
//! out-of-range volumes and unknown tags degrade to defaults.

pub mod cells;
pub mod header;

use crate::effect_parser::{protracker, EffectParseHistory, EffectRegistry};
use crate::error::{ModError, Result};
use crate::score::{Module, ModuleFormat, PatternList, Sample};

use cells::{decode_cell, pattern_size, CELL_SIZE, DIVISIONS_PER_PATTERN};
use header::{detect_format, module_header, ModuleHeader, SampleHeader};

/// Parse a module with the ProTracker effect set.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("song.mod")?;
/// let module = mod_replayer::parse(&data)?;
/// println!("{} ({} channels)", module.name, module.channel_count());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse(data: &[u8]) -> Result<Module> {
    let registry = protracker::registry()?;
    ModParser::new(&registry).parse(data)
}

/// Module parser bound to an effect registry.
#[derive(Debug, Clone, Copy)]
pub struct ModParser<'r> {
    registry: &'r EffectRegistry,
}

impl<'r> ModParser<'r> {
    /// Create a parser that decodes effects with `registry`
    pub fn new(registry: &'r EffectRegistry) -> Self {
        Self { registry }
    }

    /// Parse a complete module from `data`.
    ///
    /// # Errors
    /// Returns [`ModError::Format`] when the header or pattern block is
    /// truncated, and [`ModError::MissingHandler`] when the registry is not
    /// fully configured.
    pub fn parse(&self, data: &[u8]) -> Result<Module> {
        let format = detect_format(data);
        let (body, header) = module_header(data, &format)
            .map_err(|_| ModError::Format("module header is truncated".to_string()))?;

        let pattern_count = header.pattern_count();
        let pattern_bytes = pattern_count * pattern_size(format.channel_count);
        if body.len() < pattern_bytes {
            return Err(ModError::Format(format!(
                "pattern data is truncated: {} patterns need {} bytes, {} available",
                pattern_count,
                pattern_bytes,
                body.len()
            )));
        }

        let patterns = self.parse_patterns(&body[..pattern_bytes], &header, &format)?;
        let samples = parse_samples(&body[pattern_bytes..], &header.samples)?;

        log::debug!(
            "parsed '{}': {} patterns, {} song positions, {} samples",
            header.name,
            patterns.pattern_count(),
            patterns.song_length(),
            samples.len()
        );

        Ok(Module {
            name: header.name,
            format,
            patterns,
            samples,
        })
    }

    fn parse_patterns(
        &self,
        data: &[u8],
        header: &ModuleHeader,
        format: &ModuleFormat,
    ) -> Result<PatternList> {
        let channel_count = format.channel_count;
        let mut histories = vec![EffectParseHistory::new(); channel_count];
        let mut patterns = PatternList::new();

        for (pattern_index, pattern_data) in data.chunks_exact(pattern_size(channel_count)).enumerate()
        {
            let pattern = patterns.add_pattern(pattern_index)?;
            let rows = pattern_data.chunks_exact(channel_count * CELL_SIZE);

            for (division_index, row) in rows.take(DIVISIONS_PER_PATTERN).enumerate() {
                let division = pattern.add_division(division_index, channel_count)?;

                for (channel_index, cell) in row.chunks_exact(CELL_SIZE).enumerate() {
                    let word = u32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]);
                    let effects = self.registry.parse_channel(
                        channel_index,
                        decode_cell(word),
                        &mut histories[channel_index],
                    )?;

                    if let Some(slot) = division.channel_mut(channel_index) {
                        for effect in effects {
                            slot.set_effect(effect);
                        }
                    }
                }
            }
        }

        patterns.song_positions = header.song_positions();
        patterns.restart_position = header.restart_position as usize;

        if let Some(position) = patterns.first_unresolved_position() {
            return Err(ModError::Format(format!(
                "song position {} references missing pattern {}",
                position, patterns.song_positions[position]
            )));
        }

        Ok(patterns)
    }
}

/// Decode sample bodies in slot order.
fn parse_samples(mut data: &[u8], headers: &[SampleHeader]) -> Result<Vec<Sample>> {
    let mut samples = Vec::with_capacity(headers.len());

    for (index, header) in headers.iter().enumerate() {
        let stored = header.stored_bytes().min(data.len());
        if stored < header.stored_bytes() {
            log::warn!(
                "sample {} '{}' is truncated: {} of {} bytes present",
                index + 1,
                header.name,
                stored,
                header.stored_bytes()
            );
        }
        let (body, rest) = data.split_at(stored);
        data = rest;

        let pcm: Vec<f32> = body
            .iter()
            .skip(2)
            .take(header.body_bytes())
            .map(|&b| b as i8 as f32 / 128.0)
            .collect();

        if header.volume > 64 {
            log::warn!(
                "sample {} '{}' volume {} clamped to 64",
                index + 1,
                header.name,
                header.volume
            );
        }
        let volume = header.volume.min(64) as f32 / 64.0;

        let sample = Sample::new(header.name.clone(), pcm, volume)?
            .with_loop(header.repeat_offset(), header.repeat_length())
            .with_finetune(protracker::finetune_from_nibble(header.finetune));
        samples.push(sample);
    }

    Ok(samples)
}
