//! ProTracker effect handler set.
//!
//! Effect values are three nibbles `E x y`. Commands `E0x` (filter) and
//! `EEx` (pattern delay) are not registered and therefore ignored.
//!
//! ```text
//! 0xy arpeggio          8xx panning            E5x finetune
//! 1xx slide up          9xx sample offset      E6x loop mark / loop
//! 2xx slide down        Axy volume slide       E7x tremolo waveform
//! 3xx slide to note     Bxx position jump      E8x coarse panning
//! 4xy vibrato           Cxx volume             E9x retrigger
//! 5xy 3xx + Axy         Dxy pattern break      EAx/EBx fine volume
//! 6xy 4xy + Axy         E1x/E2x fine slides    ECx cut / EDx delay
//! 7xy tremolo           E3x glissando          EFx invert loop
//!                       E4x vibrato waveform   Fxx speed / bpm
//! ```

use num_traits::FromPrimitive;

use super::registry::{EffectEvent, EffectRegistry};
use crate::error::Result;
use crate::score::{
    Effect, EffectKind, PeriodSlide, SlideDirection, VolumeSlide, Waveform, WaveformShape,
    WaveformTarget,
};

/// Volume resolution of the format (volume byte 64 = full volume)
pub const MAX_VOLUME: f32 = 64.0;
/// `Fxx` values up to this set ticks per division; above it set the tempo
pub const SPEED_THRESHOLD: u32 = 32;
/// Frames skipped per unit of a `9xx` sample offset
pub const SAMPLE_OFFSET_UNIT: usize = 256;
/// Vibrato table length, one cycle
const WAVEFORM_STEPS: f32 = 64.0;

/// Build the registry with every ProTracker effect.
pub fn registry() -> Result<EffectRegistry> {
    let mut registry = EffectRegistry::new();
    registry
        .register("0000 xxxx yyyy", arpeggio)?
        .register("0001 xxxx xxxx", slide_up)?
        .register("0010 xxxx xxxx", slide_down)?
        .register("0011 xxxx xxxx", slide_to_note)?
        .register("0100 xxxx yyyy", vibrato)?
        .register("0101 xxxx yyyy", slide_to_note_volume_slide)?
        .register("0110 xxxx yyyy", vibrato_volume_slide)?
        .register("0111 xxxx yyyy", tremolo)?
        .register("1000 xxxx xxxx", set_panning)?
        .register("1001 xxxx xxxx", sample_offset)?
        .register("1010 xxxx yyyy", volume_slide)?
        .register("1011 xxxx xxxx", position_jump)?
        .register("1100 xxxx xxxx", set_volume)?
        .register("1101 xxxx yyyy", pattern_break)?
        .register("1110 0001 xxxx", fine_slide_up)?
        .register("1110 0010 xxxx", fine_slide_down)?
        .register("1110 0011 xxxx", set_glissando)?
        .register("1110 0100 xxxx", vibrato_waveform)?
        .register("1110 0101 xxxx", set_finetune)?
        .register("1110 0110 xxxx", pattern_loop)?
        .register("1110 0111 xxxx", tremolo_waveform)?
        .register("1110 1000 xxxx", coarse_panning)?
        .register("1110 1001 xxxx", retrigger)?
        .register("1110 1010 xxxx", fine_volume_up)?
        .register("1110 1011 xxxx", fine_volume_down)?
        .register("1110 1100 xxxx", cut_sample)?
        .register("1110 1101 xxxx", delay_sample)?
        .register("1110 1111 xxxx", invert_loop)?
        .register("1111 xxxx xxxx", set_speed)?;
    registry
        .set_pitch_handler(pitch)
        .set_sample_handler(sample);
    Ok(registry)
}

/// Decode a signed 4-bit finetune nibble.
pub fn finetune_from_nibble(nibble: u8) -> i8 {
    let nibble = (nibble & 0x0F) as i8;
    if nibble > 7 {
        nibble - 16
    } else {
        nibble
    }
}

fn pitch(event: &mut EffectEvent<'_>) {
    if event.pitch != 0 {
        event.emit(Effect::SetPitch {
            period: event.pitch,
        });
    }
}

fn sample(event: &mut EffectEvent<'_>) {
    if event.sample_number != 0 {
        event.emit(Effect::SetSample {
            index: event.sample_number as usize - 1,
        });
    }
}

fn arpeggio(event: &mut EffectEvent<'_>) {
    let first = event.parameter.first as u8;
    let second = event.parameter.second as u8;
    if first != 0 || second != 0 {
        event.emit(Effect::Arpeggio {
            semitones: [0, first, second],
        });
    }
}

fn period_slide(event: &mut EffectEvent<'_>, direction: SlideDirection, fine: bool) {
    if event.parameter.first == 0 {
        return;
    }
    event.emit(Effect::PeriodSlide(PeriodSlide {
        delta: event.parameter.first as f32,
        direction,
        limit: None,
        fine,
        glissando_sensitive: false,
    }));
}

fn slide_up(event: &mut EffectEvent<'_>) {
    period_slide(event, SlideDirection::Up, false);
}

fn slide_down(event: &mut EffectEvent<'_>) {
    period_slide(event, SlideDirection::Down, false);
}

fn fine_slide_up(event: &mut EffectEvent<'_>) {
    period_slide(event, SlideDirection::Up, true);
}

fn fine_slide_down(event: &mut EffectEvent<'_>) {
    period_slide(event, SlideDirection::Down, true);
}

/// The period field is the slide target here, not a new note.
fn emit_note_slide(event: &mut EffectEvent<'_>, speed: u32) {
    event.ignore_pitch = true;
    let previous = event.history.last_note_slide();

    let limit = if event.pitch != 0 {
        Some(event.pitch)
    } else {
        previous.and_then(|slide| slide.limit)
    };
    let delta = if speed != 0 {
        speed as f32
    } else {
        previous.map(|slide| slide.delta).unwrap_or(0.0)
    };

    if let Some(limit) = limit {
        if delta > 0.0 {
            event.emit(Effect::PeriodSlide(PeriodSlide {
                delta,
                direction: SlideDirection::Toward,
                limit: Some(limit),
                fine: false,
                glissando_sensitive: true,
            }));
        }
    }
}

fn slide_to_note(event: &mut EffectEvent<'_>) {
    let speed = event.parameter.first;
    emit_note_slide(event, speed);
}

fn emit_waveform(event: &mut EffectEvent<'_>, target: WaveformTarget, amplitude_per_unit: f32) {
    let previous = event.history.last_waveform(target);

    let circles_per_tick = if event.parameter.first != 0 {
        event.parameter.first as f32 / WAVEFORM_STEPS
    } else {
        previous.map(|w| w.circles_per_tick).unwrap_or(0.0)
    };
    let amplitude = if event.parameter.second != 0 {
        event.parameter.second as f32 * amplitude_per_unit
    } else {
        previous.map(|w| w.amplitude).unwrap_or(0.0)
    };

    event.emit(Effect::Waveform(Waveform {
        target,
        circles_per_tick,
        amplitude,
    }));
}

/// Vibrato depth unit in period steps (peak of the 0..255 table over 128).
const VIBRATO_UNIT: f32 = 2.0;
/// Tremolo depth unit in volume (peak of the 0..255 table over 64, of 64).
const TREMOLO_UNIT: f32 = 4.0 / MAX_VOLUME;

fn vibrato(event: &mut EffectEvent<'_>) {
    emit_waveform(event, WaveformTarget::Vibrato, VIBRATO_UNIT);
}

fn tremolo(event: &mut EffectEvent<'_>) {
    emit_waveform(event, WaveformTarget::Tremolo, TREMOLO_UNIT);
}

fn emit_volume_slide(event: &mut EffectEvent<'_>, up: u32, down: u32) {
    let steps = if up != 0 { up as f32 } else { -(down as f32) };
    if steps != 0.0 {
        event.emit(Effect::VolumeSlide(VolumeSlide {
            delta: steps / MAX_VOLUME,
            fine: false,
        }));
    }
}

fn volume_slide(event: &mut EffectEvent<'_>) {
    let (up, down) = (event.parameter.first, event.parameter.second);
    emit_volume_slide(event, up, down);
}

fn slide_to_note_volume_slide(event: &mut EffectEvent<'_>) {
    let (up, down) = (event.parameter.first, event.parameter.second);
    emit_note_slide(event, 0);
    emit_volume_slide(event, up, down);
}

fn vibrato_volume_slide(event: &mut EffectEvent<'_>) {
    let (up, down) = (event.parameter.first, event.parameter.second);
    event.parameter.first = 0;
    event.parameter.second = 0;
    emit_waveform(event, WaveformTarget::Vibrato, VIBRATO_UNIT);
    emit_volume_slide(event, up, down);
}

fn set_panning(event: &mut EffectEvent<'_>) {
    event.emit(Effect::SetPanning {
        panning: event.parameter.first as f32 / 255.0,
    });
}

fn coarse_panning(event: &mut EffectEvent<'_>) {
    event.emit(Effect::SetPanning {
        panning: event.parameter.first as f32 / 15.0,
    });
}

fn sample_offset(event: &mut EffectEvent<'_>) {
    let frames = if event.parameter.first != 0 {
        event.parameter.first as usize * SAMPLE_OFFSET_UNIT
    } else {
        match event.history.last(EffectKind::SampleOffset) {
            Some(Effect::SampleOffset { frames }) => *frames,
            _ => return,
        }
    };
    event.emit(Effect::SampleOffset { frames });
}

fn position_jump(event: &mut EffectEvent<'_>) {
    event.emit(Effect::PositionJump {
        song_position: Some(event.parameter.first as usize),
        division: 0,
    });
}

fn set_volume(event: &mut EffectEvent<'_>) {
    let volume = (event.parameter.first as f32).min(MAX_VOLUME) / MAX_VOLUME;
    event.emit(Effect::SetVolume { volume });
}

/// Break target is written as two decimal digits.
fn pattern_break(event: &mut EffectEvent<'_>) {
    let division = event.parameter.first as usize * 10 + event.parameter.second as usize;
    event.emit(Effect::PositionJump {
        song_position: None,
        division,
    });
}

fn set_glissando(event: &mut EffectEvent<'_>) {
    event.emit(Effect::SetGlissando {
        enabled: event.parameter.first != 0,
    });
}

fn emit_waveform_control(event: &mut EffectEvent<'_>, target: WaveformTarget) {
    let value = event.parameter.first as u8;
    let shape = WaveformShape::from_u8(value & 0x03).unwrap_or_default();
    event.emit(Effect::WaveformControl {
        target,
        shape,
        retrigger: value & 0x04 == 0,
    });
}

fn vibrato_waveform(event: &mut EffectEvent<'_>) {
    emit_waveform_control(event, WaveformTarget::Vibrato);
}

fn tremolo_waveform(event: &mut EffectEvent<'_>) {
    emit_waveform_control(event, WaveformTarget::Tremolo);
}

fn set_finetune(event: &mut EffectEvent<'_>) {
    event.emit(Effect::SetFinetune {
        finetune: finetune_from_nibble(event.parameter.first as u8),
    });
}

fn pattern_loop(event: &mut EffectEvent<'_>) {
    match event.parameter.first {
        0 => event.emit(Effect::SetLoopPosition),
        count => event.emit(Effect::Loop { count: count as u8 }),
    }
}

fn retrigger(event: &mut EffectEvent<'_>) {
    event.emit(Effect::RetriggerSample {
        interval: event.parameter.first as u8,
    });
}

fn fine_volume(event: &mut EffectEvent<'_>, sign: f32) {
    if event.parameter.first != 0 {
        event.emit(Effect::VolumeSlide(VolumeSlide {
            delta: sign * event.parameter.first as f32 / MAX_VOLUME,
            fine: true,
        }));
    }
}

fn fine_volume_up(event: &mut EffectEvent<'_>) {
    fine_volume(event, 1.0);
}

fn fine_volume_down(event: &mut EffectEvent<'_>) {
    fine_volume(event, -1.0);
}

fn cut_sample(event: &mut EffectEvent<'_>) {
    event.emit(Effect::CutSample {
        tick: event.parameter.first as u8,
    });
}

fn delay_sample(event: &mut EffectEvent<'_>) {
    event.emit(Effect::DelaySample {
        tick: event.parameter.first as u8,
    });
}

fn invert_loop(event: &mut EffectEvent<'_>) {
    event.emit(Effect::InvertSampleLoop {
        speed: event.parameter.first as u8,
    });
}

/// One encoding, two effects: small values are ticks, large values are bpm.
fn set_speed(event: &mut EffectEvent<'_>) {
    match event.parameter.first {
        0 => {}
        value if value <= SPEED_THRESHOLD => event.emit(Effect::SetSpeed {
            ticks_per_division: value as u8,
        }),
        value => event.emit(Effect::SetBeatsPerMinute { bpm: value as u8 }),
    }
}
