//! The parsed module: name, patterns and samples.

use serde::{Deserialize, Serialize};

use super::effect::{Effect, EffectKind};
use super::pattern::PatternList;
use super::sample::Sample;

/// Layout variant a module was decoded with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFormat {
    /// Four-character format tag, `None` for the untagged legacy layout
    pub tag: Option<String>,
    /// Number of sample header slots in the file
    pub sample_slots: usize,
    /// Number of playback channels
    pub channel_count: usize,
}

impl Default for ModuleFormat {
    fn default() -> Self {
        Self {
            tag: None,
            sample_slots: 15,
            channel_count: 4,
        }
    }
}

/// A complete, format-independent score.
///
/// Built once by the parser; playback only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Song name
    pub name: String,
    /// Decoded layout
    pub format: ModuleFormat,
    /// Patterns and play order
    pub patterns: PatternList,
    /// Instruments, indexed from 0
    pub samples: Vec<Sample>,
}

impl Module {
    /// Number of playback channels
    pub fn channel_count(&self) -> usize {
        self.format.channel_count
    }

    /// Sample `index`, if the module defines it
    pub fn sample(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// Rename the module.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// First sample index a pattern selects that the module does not define
    pub fn first_missing_sample(&self) -> Option<usize> {
        self.patterns
            .patterns()
            .iter()
            .flat_map(|pattern| pattern.divisions())
            .flat_map(|division| division.channels())
            .find_map(|slot| match slot.effect(EffectKind::SetSample) {
                Some(&Effect::SetSample { index }) if self.sample(index).is_none() => Some(index),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_missing_sample() {
        let mut module = Module {
            samples: vec![Sample::new("one", vec![0.0; 4], 1.0).unwrap()],
            ..Module::default()
        };
        let division = module
            .patterns
            .add_pattern(0)
            .unwrap()
            .add_division(0, 4)
            .unwrap();
        division
            .channel_mut(0)
            .unwrap()
            .set_effect(Effect::SetSample { index: 0 });
        assert_eq!(module.first_missing_sample(), None);

        let division = module.patterns.add_pattern(1).unwrap().add_division(0, 4).unwrap();
        division
            .channel_mut(2)
            .unwrap()
            .set_effect(Effect::SetSample { index: 7 });
        assert_eq!(module.first_missing_sample(), Some(7));
    }
}
