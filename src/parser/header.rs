//! Module header layout.
//!
//! ```text
//! offset  size        field
//! 0       20          song name
//! 20      30 * N      sample headers (N = 31, or 15 for untagged files)
//! +0      1           song length
//! +1      1           restart position
//! +2      128         play order
//! +130    4           format tag (31-sample layouts only)
//! ```
//!
//! All word fields are big-endian counts of 16-bit units.

use nom::bytes::complete::take;
use nom::multi::count;
use nom::number::complete::{be_u16, u8 as byte};
use nom::IResult;

use crate::score::ModuleFormat;

/// Sample header slots in tagged layouts
pub const SAMPLE_SLOTS: usize = 31;
/// Sample header slots in the untagged legacy layout
pub const LEGACY_SAMPLE_SLOTS: usize = 15;
/// Size of one sample header record
pub const SAMPLE_HEADER_SIZE: usize = 30;
/// Length of the play-order table
pub const ORDER_TABLE_SIZE: usize = 128;
/// Offset of the format tag, assuming the 31-sample layout
pub const TAG_OFFSET: usize = 20 + SAMPLE_SLOTS * SAMPLE_HEADER_SIZE + 2 + ORDER_TABLE_SIZE;

const NAME_SIZE: usize = 20;
const SAMPLE_NAME_SIZE: usize = 22;

/// Known format tags and their channel counts.
const KNOWN_TAGS: [(&[u8; 4], usize); 11] = [
    (b"M.K.", 4),
    (b"M!K!", 4),
    (b"M&K!", 4),
    (b"FLT4", 4),
    (b"4CHN", 4),
    (b"N.T.", 4),
    (b"6CHN", 6),
    (b"8CHN", 8),
    (b"FLT8", 8),
    (b"OKTA", 8),
    (b"CD81", 8),
];

/// Raw sample header record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleHeader {
    /// Sample name
    pub name: String,
    /// Body length in words, including the leading repeat-marker word
    pub length_words: u16,
    /// Finetune byte (low nibble is a signed 4-bit value)
    pub finetune: u8,
    /// Volume byte, 0..=64
    pub volume: u8,
    /// Repeat start in words
    pub repeat_offset_words: u16,
    /// Repeat length in words
    pub repeat_length_words: u16,
}

impl SampleHeader {
    /// Bytes occupied by the body in the file
    pub fn stored_bytes(&self) -> usize {
        self.length_words as usize * 2
    }

    /// Bytes of playable body, without the leading marker word
    pub fn body_bytes(&self) -> usize {
        (self.length_words as usize).saturating_sub(1) * 2
    }

    /// Repeat start in frames, without the marker word
    pub fn repeat_offset(&self) -> usize {
        (self.repeat_offset_words as usize * 2).saturating_sub(2)
    }

    /// Repeat length in frames, without the marker word
    pub fn repeat_length(&self) -> usize {
        (self.repeat_length_words as usize * 2).saturating_sub(2)
    }
}

/// Everything before the pattern data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHeader {
    /// Song name
    pub name: String,
    /// Sample header records, one per slot
    pub samples: Vec<SampleHeader>,
    /// Number of used play-order entries
    pub song_length: u8,
    /// Restart position byte
    pub restart_position: u8,
    /// Full 128-entry play order
    pub order: Vec<u8>,
}

impl ModuleHeader {
    /// Play order truncated to the song length
    pub fn song_positions(&self) -> Vec<usize> {
        let length = (self.song_length as usize).min(self.order.len());
        self.order[..length].iter().map(|&p| p as usize).collect()
    }

    /// Patterns stored in the file: one past the highest entry of the full
    /// (untruncated) play order.
    pub fn pattern_count(&self) -> usize {
        self.order.iter().copied().max().map_or(0, |max| max as usize + 1)
    }
}

/// Channel count for a known format tag.
pub fn channels_for_tag(tag: &[u8]) -> Option<usize> {
    KNOWN_TAGS
        .iter()
        .find(|(known, _)| known.as_slice() == tag)
        .map(|&(_, channels)| channels)
}

/// Detect the layout from the tag at [`TAG_OFFSET`].
///
/// Unknown or missing tags fall back to the 15-sample, 4-channel layout.
pub fn detect_format(data: &[u8]) -> ModuleFormat {
    let tag = data.get(TAG_OFFSET..TAG_OFFSET + 4);
    match tag.and_then(|tag| channels_for_tag(tag).map(|channels| (tag, channels))) {
        Some((tag, channel_count)) => {
            let tag = tag.iter().map(|&b| b as char).collect::<String>();
            log::debug!("format tag {tag:?}: {channel_count} channels");
            ModuleFormat {
                tag: Some(tag),
                sample_slots: SAMPLE_SLOTS,
                channel_count,
            }
        }
        None => {
            log::debug!("no known format tag, assuming 15-sample legacy layout");
            ModuleFormat::default()
        }
    }
}

/// Decode a fixed-size, NUL-padded text field.
pub fn text_field(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn sample_header(input: &[u8]) -> IResult<&[u8], SampleHeader> {
    let (input, name) = take(SAMPLE_NAME_SIZE)(input)?;
    let (input, length_words) = be_u16(input)?;
    let (input, finetune) = byte(input)?;
    let (input, volume) = byte(input)?;
    let (input, repeat_offset_words) = be_u16(input)?;
    let (input, repeat_length_words) = be_u16(input)?;
    Ok((
        input,
        SampleHeader {
            name: text_field(name),
            length_words,
            finetune,
            volume,
            repeat_offset_words,
            repeat_length_words,
        },
    ))
}

/// Parse the header for `format`; returns the remaining input (pattern data onward).
pub fn module_header<'a>(
    input: &'a [u8],
    format: &ModuleFormat,
) -> IResult<&'a [u8], ModuleHeader> {
    let (input, name) = take(NAME_SIZE)(input)?;
    let (input, samples) = count(sample_header, format.sample_slots)(input)?;
    let (input, song_length) = byte(input)?;
    let (input, restart_position) = byte(input)?;
    let (input, order) = take(ORDER_TABLE_SIZE)(input)?;
    let input = if format.tag.is_some() {
        take(4usize)(input)?.0
    } else {
        input
    };

    Ok((
        input,
        ModuleHeader {
            name: text_field(name),
            samples,
            song_length,
            restart_position,
            order: order.to_vec(),
        },
    ))
}
