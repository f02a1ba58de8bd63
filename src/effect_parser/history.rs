//! Per-channel memory of previously decoded effects.

use crate::score::{Effect, EffectKind, PeriodSlide, SlideDirection, Waveform, WaveformTarget};

/// Last emitted effect of each kind on one channel.
///
/// Handlers whose zero parameters mean "keep going" (continued slides,
/// continued vibrato, repeated sample offset) read their previous values here.
/// Slide-to-note and each waveform target also keep their own slot, since
/// they share an [`EffectKind`] with effects that must not erase them.
#[derive(Debug, Clone, Copy)]
pub struct EffectParseHistory {
    last: [Option<Effect>; EffectKind::COUNT],
    note_slide: Option<PeriodSlide>,
    waveforms: [Option<Waveform>; 2],
}

impl EffectParseHistory {
    /// Empty history
    pub fn new() -> Self {
        Self {
            last: [None; EffectKind::COUNT],
            note_slide: None,
            waveforms: [None; 2],
        }
    }

    /// Remember `effect` as the latest of its kind.
    pub fn record(&mut self, effect: &Effect) {
        self.last[effect.kind() as usize] = Some(*effect);
        match *effect {
            Effect::PeriodSlide(slide) if slide.direction == SlideDirection::Toward => {
                self.note_slide = Some(slide);
            }
            Effect::Waveform(waveform) => {
                self.waveforms[waveform.target.index()] = Some(waveform);
            }
            _ => {}
        }
    }

    /// Latest effect of `kind`, if any.
    pub fn last(&self, kind: EffectKind) -> Option<&Effect> {
        self.last[kind as usize].as_ref()
    }

    /// Latest slide-to-note, even if plain slides came after it.
    pub fn last_note_slide(&self) -> Option<PeriodSlide> {
        self.note_slide
    }

    /// Latest vibrato or tremolo for `target`.
    pub fn last_waveform(&self, target: WaveformTarget) -> Option<Waveform> {
        self.waveforms[target.index()]
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for EffectParseHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_latest_per_kind() {
        let mut history = EffectParseHistory::new();
        history.record(&Effect::SampleOffset { frames: 256 });
        history.record(&Effect::SampleOffset { frames: 512 });
        history.record(&Effect::SetVolume { volume: 1.0 });

        assert_eq!(
            history.last(EffectKind::SampleOffset),
            Some(&Effect::SampleOffset { frames: 512 })
        );
        assert!(history.last(EffectKind::Arpeggio).is_none());

        history.clear();
        assert!(history.last(EffectKind::SetVolume).is_none());
    }

    #[test]
    fn test_note_slide_and_waveforms_have_own_slots() {
        let mut history = EffectParseHistory::new();
        let toward = PeriodSlide {
            delta: 5.0,
            direction: SlideDirection::Toward,
            limit: Some(320),
            fine: false,
            glissando_sensitive: true,
        };
        let vibrato = Waveform {
            target: WaveformTarget::Vibrato,
            circles_per_tick: 0.125,
            amplitude: 8.0,
        };
        history.record(&Effect::PeriodSlide(toward));
        history.record(&Effect::PeriodSlide(PeriodSlide {
            direction: SlideDirection::Up,
            limit: None,
            glissando_sensitive: false,
            ..toward
        }));
        history.record(&Effect::Waveform(vibrato));
        history.record(&Effect::Waveform(Waveform {
            target: WaveformTarget::Tremolo,
            ..vibrato
        }));

        assert_eq!(history.last_note_slide(), Some(toward));
        assert_eq!(history.last_waveform(WaveformTarget::Vibrato), Some(vibrato));
        assert!(matches!(
            history.last(EffectKind::Waveform),
            Some(Effect::Waveform(Waveform {
                target: WaveformTarget::Tremolo,
                ..
            }))
        ));

        history.clear();
        assert_eq!(history.last_note_slide(), None);
        assert_eq!(history.last_waveform(WaveformTarget::Tremolo), None);
    }
}
