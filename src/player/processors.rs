//! Runtime behaviour of each effect.

use crate::score::{
    transpose_period, Effect, Note, PeriodSlide, SlideDirection, VolumeSlide, Waveform,
    WaveformTarget,
};

use super::processor::{EffectProcessor, ProcessorContext, Scope};
use super::sequencer::WaveformSetting;
use super::waveform::waveform_value;

/// Lowest and highest period a free slide may reach
const MIN_PERIOD: f32 = 113.0;
const MAX_PERIOD: f32 = 856.0;

/// Processor for any effect; dispatches without boxing.
#[derive(Debug, Clone, PartialEq)]
pub enum Processor {
    /// One-shot parameter change
    Immediate(Immediate),
    /// Period slide, slide-to-note, fine slide
    PeriodSlide(PeriodSlideProcessor),
    /// Volume slide
    VolumeSlide(VolumeSlideProcessor),
    /// Arpeggio
    Arpeggio(ArpeggioProcessor),
    /// Vibrato / tremolo
    Waveform(WaveformProcessor),
    /// Note cut, note delay, retrigger
    TickTrigger(TickTriggerProcessor),
}

impl Processor {
    /// Build the processor for `effect`.
    pub fn new(effect: &Effect) -> Self {
        match *effect {
            Effect::PeriodSlide(slide) => Processor::PeriodSlide(PeriodSlideProcessor::new(slide)),
            Effect::VolumeSlide(slide) => Processor::VolumeSlide(VolumeSlideProcessor { slide }),
            Effect::Arpeggio { semitones } => Processor::Arpeggio(ArpeggioProcessor {
                semitones,
                base_pitch: 0.0,
            }),
            Effect::Waveform(waveform) => Processor::Waveform(WaveformProcessor {
                waveform,
                baseline: 0.0,
                setting: WaveformSetting::default(),
            }),
            Effect::CutSample { .. }
            | Effect::DelaySample { .. }
            | Effect::RetriggerSample { .. } => {
                Processor::TickTrigger(TickTriggerProcessor { effect: *effect })
            }
            _ => Processor::Immediate(Immediate { effect: *effect }),
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            Processor::Immediate($p) => $body,
            Processor::PeriodSlide($p) => $body,
            Processor::VolumeSlide($p) => $body,
            Processor::Arpeggio($p) => $body,
            Processor::Waveform($p) => $body,
            Processor::TickTrigger($p) => $body,
        }
    };
}

impl EffectProcessor for Processor {
    fn scope(&self) -> Scope {
        dispatch!(self, p => p.scope())
    }

    fn on_effect_start(&mut self, ctx: &mut ProcessorContext<'_>) {
        dispatch!(self, p => p.on_effect_start(ctx))
    }

    fn on_process(&mut self, ctx: &mut ProcessorContext<'_>, tick_changed: bool) {
        dispatch!(self, p => p.on_process(ctx, tick_changed))
    }

    fn on_effect_end(&mut self, ctx: &mut ProcessorContext<'_>) {
        dispatch!(self, p => p.on_effect_end(ctx))
    }
}

/// Effects applied once at the division start.
#[derive(Debug, Clone, PartialEq)]
pub struct Immediate {
    effect: Effect,
}

impl EffectProcessor for Immediate {
    fn scope(&self) -> Scope {
        Scope::Single
    }

    fn on_process(&mut self, ctx: &mut ProcessorContext<'_>, _tick_changed: bool) {
        let channel = &mut *ctx.channel;
        let global = &mut *ctx.global;

        match self.effect {
            Effect::SetPitch { period } => {
                channel.pitch = period as f32;
                channel.trigger();
            }
            Effect::SetSample { index } => {
                match ctx.module.sample(index) {
                    Some(sample) => {
                        channel.current_sample = Some(index);
                        channel.set_volume(sample.volume());
                        channel.finetune = sample.finetune;
                    }
                    None => {
                        channel.current_sample = None;
                        channel.set_volume(0.0);
                    }
                }
                channel.trigger();
            }
            Effect::SetVolume { volume } => channel.set_volume(volume),
            Effect::SampleOffset { frames } => channel.sample_position = frames as f64,
            Effect::SetPanning { panning } => channel.panning = panning.clamp(0.0, 1.0),
            Effect::SetFinetune { finetune } => channel.finetune = finetune,
            Effect::InvertSampleLoop { speed } => channel.invert_loop = speed != 0,
            Effect::SetGlissando { enabled } => global.glissando_enabled = enabled,
            Effect::WaveformControl {
                target,
                shape,
                retrigger,
            } => global.set_waveform(target, WaveformSetting { shape, retrigger }),
            Effect::SetSpeed { ticks_per_division } => {
                global.set_ticks_per_division(ticks_per_division as usize)
            }
            Effect::SetBeatsPerMinute { bpm } => global.set_bpm(bpm as f32),
            Effect::PositionJump {
                song_position,
                division,
            } => match song_position {
                Some(song_position) => global.set_position_jump(song_position, division),
                None => global.set_pattern_break(division),
            },
            Effect::Loop { count } => global.set_loop(count),
            Effect::SetLoopPosition => {
                let division = global.cursor.division;
                global.set_loop_position(division);
            }
            Effect::PeriodSlide(_)
            | Effect::VolumeSlide(_)
            | Effect::Arpeggio { .. }
            | Effect::Waveform(_)
            | Effect::CutSample { .. }
            | Effect::DelaySample { .. }
            | Effect::RetriggerSample { .. } => {}
        }
    }
}

/// Period slides. Continuous slides step on every tick except the first;
/// fine slides apply once.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSlideProcessor {
    slide: PeriodSlide,
    direction: SlideDirection,
}

impl PeriodSlideProcessor {
    fn new(slide: PeriodSlide) -> Self {
        Self {
            slide,
            direction: slide.direction,
        }
    }

    fn slide_once(&self, ctx: &mut ProcessorContext<'_>) {
        let pitch = ctx.channel.pitch;
        let untargeted = self.slide.direction == SlideDirection::Toward && self.slide.limit.is_none();
        if pitch <= 0.0 || untargeted {
            return;
        }

        let raising = self.direction == SlideDirection::Up;
        let next = if self.slide.glissando_sensitive && ctx.global.glissando_enabled {
            let note = Note::nearest(pitch);
            note.transpose(if raising { 1 } else { -1 }).period() as f32
        } else if raising {
            pitch - self.slide.delta
        } else {
            pitch + self.slide.delta
        };

        ctx.channel.pitch = match self.slide.limit {
            Some(limit) if raising => next.max(limit as f32),
            Some(limit) => next.min(limit as f32),
            None => next.clamp(MIN_PERIOD, MAX_PERIOD),
        };
    }
}

impl EffectProcessor for PeriodSlideProcessor {
    fn scope(&self) -> Scope {
        if self.slide.fine {
            Scope::Single
        } else {
            Scope::Division
        }
    }

    fn on_effect_start(&mut self, ctx: &mut ProcessorContext<'_>) {
        if self.slide.direction == SlideDirection::Toward {
            let limit = self.slide.limit.map_or(ctx.channel.pitch, |l| l as f32);
            self.direction = if ctx.channel.pitch > limit {
                SlideDirection::Up
            } else {
                SlideDirection::Down
            };
        }
    }

    fn on_process(&mut self, ctx: &mut ProcessorContext<'_>, tick_changed: bool) {
        if !tick_changed || (!self.slide.fine && ctx.global.cursor.tick == 0) {
            return;
        }
        self.slide_once(ctx);
    }
}

/// Volume slides, on every tick but the first (or once when fine).
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSlideProcessor {
    slide: VolumeSlide,
}

impl EffectProcessor for VolumeSlideProcessor {
    fn scope(&self) -> Scope {
        if self.slide.fine {
            Scope::Single
        } else {
            Scope::Division
        }
    }

    fn on_process(&mut self, ctx: &mut ProcessorContext<'_>, tick_changed: bool) {
        if !tick_changed || (!self.slide.fine && ctx.global.cursor.tick == 0) {
            return;
        }
        let volume = ctx.channel.volume() + self.slide.delta;
        ctx.channel.set_volume(volume);
    }
}

/// Splits the division into equal segments, one per chord note.
#[derive(Debug, Clone, PartialEq)]
pub struct ArpeggioProcessor {
    semitones: [u8; 3],
    base_pitch: f32,
}

impl EffectProcessor for ArpeggioProcessor {
    fn on_effect_start(&mut self, ctx: &mut ProcessorContext<'_>) {
        self.base_pitch = ctx.channel.pitch;
    }

    fn on_process(&mut self, ctx: &mut ProcessorContext<'_>, _tick_changed: bool) {
        if self.base_pitch <= 0.0 {
            return;
        }
        let global = &*ctx.global;
        let samples_per_tick = global.samples_per_tick();
        let elapsed = global.cursor.tick as f64 * samples_per_tick
            + global.cursor.sample_within_tick as f64;
        let segment = samples_per_tick * global.ticks_per_division() as f64
            / self.semitones.len() as f64;

        let index = ((elapsed / segment) as usize).min(self.semitones.len() - 1);
        ctx.channel.pitch = transpose_period(self.base_pitch, self.semitones[index] as f32);
    }

    fn on_effect_end(&mut self, ctx: &mut ProcessorContext<'_>) {
        if self.base_pitch > 0.0 {
            ctx.channel.pitch = self.base_pitch;
        }
    }
}

/// Vibrato and tremolo: modulate around the value at effect start.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformProcessor {
    waveform: Waveform,
    baseline: f32,
    setting: WaveformSetting,
}

impl EffectProcessor for WaveformProcessor {
    fn on_effect_start(&mut self, ctx: &mut ProcessorContext<'_>) {
        let target = self.waveform.target;
        self.setting = ctx.global.waveform(target);
        self.baseline = match target {
            WaveformTarget::Vibrato => ctx.channel.pitch,
            WaveformTarget::Tremolo => ctx.channel.volume(),
        };
        if self.setting.retrigger {
            ctx.channel.waveform_phase[target.index()] = 0.0;
        }
    }

    fn on_process(&mut self, ctx: &mut ProcessorContext<'_>, _tick_changed: bool) {
        let target = self.waveform.target;
        let phase = &mut ctx.channel.waveform_phase[target.index()];
        let offset = waveform_value(self.setting.shape, *phase) * self.waveform.amplitude;
        *phase = (*phase
            + (self.waveform.circles_per_tick as f64 / ctx.global.samples_per_tick()) as f32)
            .fract();

        match target {
            WaveformTarget::Vibrato => {
                if self.baseline > 0.0 {
                    ctx.channel.pitch = (self.baseline + offset).max(1.0);
                }
            }
            WaveformTarget::Tremolo => ctx.channel.set_volume(self.baseline + offset),
        }
    }

    fn on_effect_end(&mut self, ctx: &mut ProcessorContext<'_>) {
        match self.waveform.target {
            WaveformTarget::Vibrato => {
                if self.baseline > 0.0 {
                    ctx.channel.pitch = self.baseline;
                }
            }
            WaveformTarget::Tremolo => ctx.channel.set_volume(self.baseline),
        }
    }
}

/// Effects that fire on a particular tick of the division.
#[derive(Debug, Clone, PartialEq)]
pub struct TickTriggerProcessor {
    effect: Effect,
}

impl EffectProcessor for TickTriggerProcessor {
    fn on_effect_start(&mut self, ctx: &mut ProcessorContext<'_>) {
        if let Effect::DelaySample { tick } = self.effect {
            if tick > 0 {
                ctx.channel.held = true;
            }
        }
    }

    fn on_process(&mut self, ctx: &mut ProcessorContext<'_>, tick_changed: bool) {
        if !tick_changed {
            return;
        }
        let current = ctx.global.cursor.tick;

        match self.effect {
            Effect::CutSample { tick } if current == tick as usize => ctx.channel.set_volume(0.0),
            Effect::DelaySample { tick } if ctx.channel.held && current >= tick as usize => {
                ctx.channel.held = false;
                ctx.channel.trigger();
            }
            Effect::RetriggerSample { interval }
                if interval > 0 && current > 0 && current % interval as usize == 0 =>
            {
                ctx.channel.trigger();
            }
            _ => {}
        }
    }

    fn on_effect_end(&mut self, ctx: &mut ProcessorContext<'_>) {
        if let Effect::DelaySample { .. } = self.effect {
            ctx.channel.held = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::channel::ChannelPlaybackState;
    use crate::player::processor::{EffectPipeline, Lifecycle};
    use crate::player::sequencer::{CursorChange, GlobalPlaybackState};
    use crate::score::{DivisionChannel, Module, Sample, WaveformShape};
    use approx::assert_relative_eq;

    /// 5000 Hz, 125 bpm: 100 samples per tick, 6 ticks per division.
    struct Rig {
        channel: ChannelPlaybackState,
        global: GlobalPlaybackState,
        module: Module,
        pipeline: EffectPipeline,
        carry: Option<CursorChange>,
    }

    impl Rig {
        fn new() -> Self {
            let module = Module {
                samples: vec![Sample::new("lead", vec![0.5; 1000], 0.75)
                    .unwrap()
                    .with_finetune(-3)],
                ..Module::default()
            };
            Self {
                channel: ChannelPlaybackState::new(5000.0, 0.0),
                global: GlobalPlaybackState::new(vec![64, 64], 5000.0),
                module,
                pipeline: EffectPipeline::new(),
                carry: None,
            }
        }

        fn process(&mut self, changes: CursorChange, slot: Option<&DivisionChannel>) {
            let mut ctx = ProcessorContext {
                channel: &mut self.channel,
                global: &mut self.global,
                module: &self.module,
            };
            if let Some(slot) = slot {
                self.pipeline.begin_division(&mut ctx, Some(slot));
            }
            self.pipeline
                .process(&mut ctx, changes.contains(CursorChange::TICK));
        }

        /// Begin a division holding `effects` and process its first sample.
        fn start(&mut self, effects: &[Effect]) {
            let mut slot = DivisionChannel::default();
            for effect in effects {
                slot.set_effect(*effect);
            }
            let changes = match self.carry.take() {
                Some(changes) => changes,
                None => self.global.advance(),
            };
            self.process(changes, Some(&slot));
        }

        /// Process the next `samples` samples of the current division.
        fn run(&mut self, samples: usize) {
            for _ in 0..samples {
                let changes = self.global.advance();
                self.process(changes, None);
            }
        }

        fn end(&mut self) {
            let mut ctx = ProcessorContext {
                channel: &mut self.channel,
                global: &mut self.global,
                module: &self.module,
            };
            self.pipeline.end_all(&mut ctx);
        }

        /// Play a whole division of `effects`.
        fn play(&mut self, effects: &[Effect]) {
            self.start(effects);
            loop {
                let changes = self.global.advance();
                if changes.contains(CursorChange::DIVISION) {
                    self.carry = Some(changes);
                    break;
                }
                self.process(changes, None);
            }
            self.end();
        }
    }

    fn slide(delta: f32, direction: SlideDirection, fine: bool) -> Effect {
        Effect::PeriodSlide(PeriodSlide {
            delta,
            direction,
            limit: None,
            fine,
            glissando_sensitive: false,
        })
    }

    #[test]
    fn test_set_sample_loads_defaults() {
        let mut rig = Rig::new();
        rig.play(&[Effect::SetSample { index: 0 }, Effect::SetPitch { period: 428 }]);
        assert_eq!(rig.channel.current_sample, Some(0));
        assert_eq!(rig.channel.volume(), 0.75);
        assert_eq!(rig.channel.finetune, -3);
        assert_eq!(rig.channel.pitch, 428.0);
    }

    #[test]
    fn test_missing_sample_mutes_channel() {
        let mut rig = Rig::new();
        rig.channel.set_volume(1.0);
        rig.play(&[Effect::SetSample { index: 9 }]);
        assert_eq!(rig.channel.current_sample, None);
        assert_eq!(rig.channel.volume(), 0.0);
    }

    #[test]
    fn test_set_volume_overrides_sample_default() {
        let mut rig = Rig::new();
        rig.play(&[Effect::SetVolume { volume: 0.25 }, Effect::SetSample { index: 0 }]);
        assert_eq!(rig.channel.volume(), 0.25);
    }

    #[test]
    fn test_fine_slide_applies_after_new_note() {
        let mut rig = Rig::new();
        rig.play(&[
            Effect::SetPitch { period: 428 },
            slide(4.0, SlideDirection::Up, true),
        ]);
        assert_eq!(rig.channel.pitch, 424.0);
    }

    #[test]
    fn test_continuous_slide_skips_first_tick() {
        let mut rig = Rig::new();
        rig.channel.pitch = 400.0;
        rig.play(&[slide(2.0, SlideDirection::Down, false)]);
        // ticks 1..=5
        assert_eq!(rig.channel.pitch, 410.0);
    }

    #[test]
    fn test_free_slide_clamps_to_table_range() {
        let mut rig = Rig::new();
        rig.channel.pitch = 120.0;
        rig.play(&[slide(5.0, SlideDirection::Up, false)]);
        assert_eq!(rig.channel.pitch, 113.0);
    }

    #[test]
    fn test_slide_to_note_stops_at_target() {
        let mut rig = Rig::new();
        rig.channel.pitch = 428.0;
        let effect = Effect::PeriodSlide(PeriodSlide {
            delta: 8.0,
            direction: SlideDirection::Toward,
            limit: Some(404),
            fine: false,
            glissando_sensitive: true,
        });
        rig.play(&[effect]);
        assert_eq!(rig.channel.pitch, 404.0);

        rig.channel.pitch = 380.0;
        rig.play(&[effect]);
        assert_eq!(rig.channel.pitch, 404.0);
    }

    #[test]
    fn test_glissando_snaps_to_semitones() {
        let mut rig = Rig::new();
        rig.global.glissando_enabled = true;
        rig.channel.pitch = 428.0;
        rig.play(&[Effect::PeriodSlide(PeriodSlide {
            delta: 1.0,
            direction: SlideDirection::Toward,
            limit: Some(320),
            fine: false,
            glissando_sensitive: true,
        })]);
        // five ticks, one semitone each: C-2 -> F-2
        assert_eq!(rig.channel.pitch, 320.0);
    }

    #[test]
    fn test_volume_slide_clamps() {
        let mut rig = Rig::new();
        rig.channel.set_volume(0.9);
        rig.play(&[Effect::VolumeSlide(VolumeSlide {
            delta: 0.05,
            fine: false,
        })]);
        assert_eq!(rig.channel.volume(), 1.0);

        rig.play(&[Effect::VolumeSlide(VolumeSlide {
            delta: -0.25,
            fine: true,
        })]);
        assert_eq!(rig.channel.volume(), 0.75);
    }

    #[test]
    fn test_arpeggio_segments_and_restore() {
        let mut rig = Rig::new();
        rig.channel.pitch = 428.0;
        let arpeggio = [Effect::Arpeggio {
            semitones: [0, 12, 7],
        }];

        rig.start(&arpeggio);
        rig.run(149);
        assert_relative_eq!(rig.channel.pitch, 428.0);
        rig.run(100);
        assert_relative_eq!(rig.channel.pitch, 214.0, epsilon = 1e-3);
        rig.run(200);
        assert_relative_eq!(rig.channel.pitch, transpose_period(428.0, 7.0), epsilon = 1e-3);

        rig.end();
        assert_eq!(rig.channel.pitch, 428.0);
    }

    #[test]
    fn test_vibrato_restores_baseline() {
        let mut rig = Rig::new();
        rig.channel.pitch = 428.0;
        let vibrato = Effect::Waveform(Waveform {
            target: WaveformTarget::Vibrato,
            circles_per_tick: 0.25,
            amplitude: 8.0,
        });

        rig.start(&[vibrato]);
        rig.run(100);
        // a quarter cycle in: sine peak
        assert_relative_eq!(rig.channel.pitch, 436.0, epsilon = 0.01);

        rig.end();
        assert_eq!(rig.channel.pitch, 428.0);
    }

    #[test]
    fn test_waveform_retrigger_setting() {
        let mut rig = Rig::new();
        rig.channel.set_volume(0.5);
        rig.channel.waveform_phase[1] = 0.5;
        rig.global.set_waveform(
            WaveformTarget::Tremolo,
            WaveformSetting {
                shape: WaveformShape::Square,
                retrigger: false,
            },
        );
        rig.start(&[Effect::Waveform(Waveform {
            target: WaveformTarget::Tremolo,
            circles_per_tick: 0.0,
            amplitude: 0.25,
        })]);
        // phase kept at 0.5: square is in its low half
        assert_relative_eq!(rig.channel.volume(), 0.25);
    }

    #[test]
    fn test_cut_sample_at_tick() {
        let mut rig = Rig::new();
        rig.channel.set_volume(1.0);
        rig.start(&[Effect::CutSample { tick: 2 }]);
        rig.run(199);
        assert_eq!(rig.channel.volume(), 1.0);
        rig.run(1);
        assert_eq!(rig.channel.volume(), 0.0);
    }

    #[test]
    fn test_delay_holds_until_tick() {
        let mut rig = Rig::new();
        rig.start(&[
            Effect::SetSample { index: 0 },
            Effect::SetPitch { period: 428 },
            Effect::DelaySample { tick: 3 },
        ]);
        rig.run(299);
        assert!(rig.channel.held);
        rig.channel.sample_position = 42.0;
        rig.run(1);
        assert!(!rig.channel.held);
        assert_eq!(rig.channel.sample_position, 0.0);
    }

    #[test]
    fn test_retrigger_every_interval() {
        let mut rig = Rig::new();
        rig.start(&[Effect::RetriggerSample { interval: 2 }]);
        rig.run(100);
        rig.channel.sample_position = 10.0;
        rig.run(100);
        assert_eq!(rig.channel.sample_position, 0.0);
        rig.channel.sample_position = 10.0;
        rig.run(100);
        assert_eq!(rig.channel.sample_position, 10.0);
    }

    #[test]
    fn test_global_effects_leave_channel_alone() {
        let mut rig = Rig::new();
        let before = rig.channel.clone();
        rig.start(&[
            Effect::SetSpeed {
                ticks_per_division: 3,
            },
            Effect::SetBeatsPerMinute { bpm: 250 },
            Effect::PositionJump {
                song_position: Some(1),
                division: 4,
            },
        ]);
        assert_eq!(rig.channel, before);
        assert_eq!(rig.global.ticks_per_division(), 3);
        assert_relative_eq!(rig.global.samples_per_tick(), 50.0);
        let jump = rig.global.pending_jump().unwrap();
        assert_eq!((jump.song_position, jump.division), (1, 4));
    }

    #[test]
    fn test_pattern_break_defaults_to_next_position() {
        let mut rig = Rig::new();
        rig.start(&[Effect::PositionJump {
            song_position: None,
            division: 16,
        }]);
        let jump = rig.global.pending_jump().unwrap();
        assert_eq!((jump.song_position, jump.division), (1, 16));
    }

    #[test]
    fn test_lifecycle_reaches_ended() {
        let mut rig = Rig::new();
        rig.start(&[Effect::VolumeSlide(VolumeSlide {
            delta: 0.1,
            fine: false,
        })]);
        assert_eq!(rig.pipeline.active()[0].lifecycle(), Lifecycle::Active);
    }
}
