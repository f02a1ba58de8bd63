//! Pattern cell decoding.
//!
//! Each cell is a big-endian 32-bit word. Bit positions below count from the
//! most significant bit (bit 0) so they read left to right in a hex dump:
//!
//! ```text
//! bits 0-3   sample number, high nibble
//! bits 4-15  period
//! bits 16-19 sample number, low nibble
//! bits 20-31 effect group (command + parameters)
//! ```

use crate::effect_parser::RawCell;

/// Divisions per pattern
pub const DIVISIONS_PER_PATTERN: usize = 64;
/// Bytes per cell
pub const CELL_SIZE: usize = 4;

/// Bits `first..=last` of `word`, numbered from the most significant bit.
fn bits(word: u32, first: u32, last: u32) -> u32 {
    let width = last - first + 1;
    (word >> (31 - last)) & ((1u32 << width) - 1)
}

/// Split a cell word into its sample, period and effect fields.
pub fn decode_cell(word: u32) -> RawCell {
    let sample_number = (bits(word, 0, 3) << 4) | bits(word, 16, 19);
    RawCell {
        effect_bits: bits(word, 20, 31) as u16,
        pitch: bits(word, 4, 15) as u16,
        sample_number: sample_number as u8,
    }
}

/// Bytes of pattern data for one pattern.
pub fn pattern_size(channel_count: usize) -> usize {
    DIVISIONS_PER_PATTERN * channel_count * CELL_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_cell_fields() {
        // sample 0x1F, period 0x1AC (428), effect 0xC40
        let word = 0x11AC_FC40;
        let cell = decode_cell(word);
        assert_eq!(cell.sample_number, 0x1F);
        assert_eq!(cell.pitch, 428);
        assert_eq!(cell.effect_bits, 0xC40);
    }

    #[test]
    fn test_decode_empty_cell() {
        assert_eq!(decode_cell(0), RawCell::default());
    }

    #[test]
    fn test_bits_helper() {
        assert_eq!(bits(0xF000_0000, 0, 3), 0xF);
        assert_eq!(bits(0x0000_0FFF, 20, 31), 0xFFF);
        assert_eq!(bits(0x0000_F000, 16, 19), 0xF);
    }
}
