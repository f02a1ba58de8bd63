//! Bit-pattern mini-language for effect dispatch.
//!
//! A pattern is written most significant bit first over the alphabet
//! `0`, `1`, `x`, `y`. Spaces, `_`, `-`, `.` and `|` are separators and are
//! skipped, so `"1110 0001 xxxx"` reads as three nibbles.
//!
//! ```text
//! literal 0/1  -> part of bitmask, value goes into fixed_bits
//! x            -> bit of parameter.first  (concatenated in pattern order)
//! y            -> bit of parameter.second (concatenated in pattern order)
//! ```
//!
//! A value matches when `value & bitmask == fixed_bits`.

use crate::error::{ModError, Result};

/// Width of the packed effect value in bits
pub const EFFECT_BITS: usize = 12;

const SEPARATORS: [char; 5] = [' ', '_', '-', '.', '|'];

/// Parameters extracted from the `x` and `y` positions of a pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Parameter {
    /// Bits marked `x`
    pub first: u32,
    /// Bits marked `y`
    pub second: u32,
}

/// A compiled bit pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitPattern {
    source: String,
    bitmask: u16,
    fixed_bits: u16,
    /// Bit indices (LSB = 0) of `x` positions, most significant first
    first_bits: Vec<u8>,
    /// Bit indices (LSB = 0) of `y` positions, most significant first
    second_bits: Vec<u8>,
}

impl BitPattern {
    /// Compile a pattern string.
    ///
    /// # Errors
    /// Returns [`ModError::InvalidPattern`] on characters outside the alphabet
    /// or when the pattern does not describe exactly [`EFFECT_BITS`] bits.
    pub fn compile(pattern: &str) -> Result<Self> {
        let symbols: Vec<char> = pattern
            .chars()
            .filter(|c| !SEPARATORS.contains(c))
            .collect();

        if symbols.len() != EFFECT_BITS {
            return Err(ModError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: format!("expected {} bits, found {}", EFFECT_BITS, symbols.len()),
            });
        }

        let mut compiled = Self {
            source: pattern.to_string(),
            bitmask: 0,
            fixed_bits: 0,
            first_bits: Vec::new(),
            second_bits: Vec::new(),
        };

        for (position, symbol) in symbols.into_iter().enumerate() {
            let bit = (EFFECT_BITS - 1 - position) as u8;
            match symbol {
                '0' => compiled.bitmask |= 1 << bit,
                '1' => {
                    compiled.bitmask |= 1 << bit;
                    compiled.fixed_bits |= 1 << bit;
                }
                'x' => compiled.first_bits.push(bit),
                'y' => compiled.second_bits.push(bit),
                other => {
                    return Err(ModError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: format!("unexpected character '{}'", other),
                    });
                }
            }
        }

        Ok(compiled)
    }

    /// Pattern string as registered
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Mask of the literal positions
    pub fn bitmask(&self) -> u16 {
        self.bitmask
    }

    /// Literal values at the masked positions
    pub fn fixed_bits(&self) -> u16 {
        self.fixed_bits
    }

    /// Whether `value` carries this pattern's literal bits.
    pub fn matches(&self, value: u16) -> bool {
        value & self.bitmask == self.fixed_bits
    }

    /// Collect the `x` and `y` bits of `value`.
    pub fn extract(&self, value: u16) -> Parameter {
        Parameter {
            first: gather(value, &self.first_bits),
            second: gather(value, &self.second_bits),
        }
    }

    /// Build a value carrying this pattern's literal bits and `parameter`.
    ///
    /// Parameter bits beyond the number of `x`/`y` positions are dropped.
    pub fn encode(&self, parameter: Parameter) -> u16 {
        self.fixed_bits
            | scatter(parameter.first, &self.first_bits)
            | scatter(parameter.second, &self.second_bits)
    }
}

fn gather(value: u16, bits: &[u8]) -> u32 {
    bits.iter()
        .fold(0, |acc, &bit| (acc << 1) | ((value >> bit) & 1) as u32)
}

fn scatter(parameter: u32, bits: &[u8]) -> u16 {
    bits.iter()
        .rev()
        .enumerate()
        .fold(0, |acc, (index, &bit)| {
            acc | ((((parameter >> index) & 1) as u16) << bit)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_masks() {
        let pattern = BitPattern::compile("1110 0001 xxxx").unwrap();
        assert_eq!(pattern.bitmask(), 0xFF0);
        assert_eq!(pattern.fixed_bits(), 0xE10);
        assert!(pattern.matches(0xE1F));
        assert!(pattern.matches(0xE10));
        assert!(!pattern.matches(0xE2F));
    }

    #[test]
    fn test_extract_xy() {
        let pattern = BitPattern::compile("0100_xxxx_yyyy").unwrap();
        assert_eq!(
            pattern.extract(0x4A3),
            Parameter {
                first: 0xA,
                second: 0x3
            }
        );

        let wide = BitPattern::compile("1100 xxxx xxxx").unwrap();
        assert_eq!(wide.extract(0xC40).first, 0x40);
        assert_eq!(wide.extract(0xC40).second, 0);
    }

    #[test]
    fn test_non_contiguous_parameter_bits() {
        let pattern = BitPattern::compile("x0x0 y1y1 0000").unwrap();
        // x bits at 11 and 9, y bits at 7 and 5
        let value = 0b1010_1111_0000;
        assert!(pattern.matches(value));
        assert_eq!(pattern.extract(value), Parameter { first: 3, second: 3 });
        assert_eq!(pattern.encode(Parameter { first: 2, second: 1 }), 0b1000_0111_0000);
    }

    #[test]
    fn test_rejects_bad_patterns() {
        assert!(matches!(
            BitPattern::compile("1110 0001"),
            Err(ModError::InvalidPattern { .. })
        ));
        assert!(matches!(
            BitPattern::compile("1110 0001 xxxz"),
            Err(ModError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_parameter_round_trip() {
        for source in ["0000 xxxx yyyy", "1110 1001 xxxx", "1111 xxxx xxxx", "xy01 yx10 xxyy"] {
            let pattern = BitPattern::compile(source).unwrap();
            let free_bits = !pattern.bitmask() & 0x0FFF;
            for value in 0u16..0x1000 {
                if !pattern.matches(value) {
                    continue;
                }
                let parameter = pattern.extract(value);
                let rebuilt = pattern.encode(parameter);
                assert_eq!(rebuilt & free_bits, value & free_bits, "{source} {value:03X}");
                assert!(pattern.matches(rebuilt));
            }
        }
    }
}
