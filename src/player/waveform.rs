//! Vibrato/tremolo oscillator shapes.

use std::f32::consts::TAU;

use crate::score::WaveformShape;

/// Steps per cycle of the random shape
const RANDOM_STEPS: f32 = 64.0;

/// Oscillator value in `[-1, 1]` at `phase` (in cycles).
pub fn waveform_value(shape: WaveformShape, phase: f32) -> f32 {
    let phase = phase.rem_euclid(1.0);
    match shape {
        WaveformShape::Sine => (phase * TAU).sin(),
        WaveformShape::RampDown => 1.0 - 2.0 * phase,
        WaveformShape::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        WaveformShape::Random => random_step((phase * RANDOM_STEPS) as u32),
    }
}

/// Deterministic hash of a step index mapped to `[-1, 1]`.
fn random_step(step: u32) -> f32 {
    let mut x = step.wrapping_add(1).wrapping_mul(0x9E37_79B1);
    x ^= x >> 15;
    x = x.wrapping_mul(0x85EB_CA6B);
    x ^= x >> 13;
    (x & 0xFFFF) as f32 / 32_767.5 - 1.0
}
