mod common;

use approx::assert_relative_eq;
use common::{ModBuilder, DIVISIONS};
use mod_replayer::player::STEP_CONSTANT;
use mod_replayer::{create_session, parse, Block, Cursor, Module, Note, Session, SessionConfig};

/// 5000 Hz at the default tempo: 100 samples per tick, 600 per division.
const RATE: f32 = 5000.0;
const DIVISION: usize = 600;

fn pull(session: &mut Session, frames: usize) -> Vec<Vec<f32>> {
    match session.next_block(frames) {
        Block::Audio(buffers) => buffers.to_vec(),
        Block::EndOfSong => panic!("song ended early"),
    }
}

fn position(session: &Session) -> (usize, usize) {
    let cursor = session.cursor();
    (cursor.song_position, cursor.division)
}

fn looped_sample(builder: ModBuilder) -> ModBuilder {
    builder.sample("tone", &[40, -40, 40, -40], 64, 0, (1, 3))
}

#[test]
fn test_single_note_plays_then_falls_silent() {
    let data = ModBuilder::tagged(b"M.K.", 4)
        .sample("ramp", &[16, 32, 48, 64], 64, 0, (0, 1))
        .cell(0, 0, 0, 1, Note::OCTAVE_2_C.period(), 0)
        .build();
    let module = parse(&data).unwrap();

    // just over one frame per output sample at this period
    let rate = (STEP_CONSTANT / (2.0 * Note::OCTAVE_2_C.period() as f64)) as f32 * 0.9999;
    let mut session = create_session(module, rate);

    let block = pull(&mut session, 4);
    for (value, expected) in block[0].iter().zip([0.125, 0.25, 0.375, 0.5]) {
        assert_relative_eq!(*value, expected, epsilon = 1e-6);
    }
    assert!(block[1..].iter().flatten().all(|&v| v == 0.0));

    assert_eq!(pull(&mut session, 1)[0], vec![0.0]);
}

#[test]
fn test_position_jump_and_pattern_break() {
    let data = looped_sample(ModBuilder::tagged(b"M.K.", 4))
        .order(&[0, 1, 2])
        .cell(0, 0, 3, 0, 0, 0xB02)
        .cell(2, 0, 2, 0, 0, 0xD05)
        .build();
    let mut session = create_session(parse(&data).unwrap(), RATE);

    pull(&mut session, 1);
    assert_eq!(position(&session), (0, 0));
    pull(&mut session, DIVISION);
    assert_eq!(position(&session), (2, 0));

    // breaking out of the last position ends the song
    pull(&mut session, DIVISION);
    assert!(session.is_finished());
    assert_eq!(session.next_block(16), Block::EndOfSong);
}

#[test]
fn test_pattern_break_lands_on_division() {
    let data = looped_sample(ModBuilder::tagged(b"M.K.", 4))
        .order(&[0, 1, 2])
        .cell(0, 0, 0, 0, 0, 0xB01)
        .cell(1, 0, 1, 0, 0, 0xD05)
        .build();
    let mut session = create_session(parse(&data).unwrap(), RATE);

    pull(&mut session, 1 + DIVISION);
    assert_eq!(position(&session), (1, 0));
    pull(&mut session, DIVISION);
    assert_eq!(position(&session), (2, 5));
}

#[test]
fn test_break_and_jump_in_one_division_combine() {
    for (break_channel, jump_channel) in [(0, 1), (1, 0)] {
        let data = looped_sample(ModBuilder::tagged(b"M.K.", 4))
            .order(&[0, 1, 2])
            .cell(0, 0, break_channel, 0, 0, 0xD05)
            .cell(0, 0, jump_channel, 0, 0, 0xB02)
            .build();
        let mut session = create_session(parse(&data).unwrap(), RATE);

        pull(&mut session, 1 + DIVISION);
        assert_eq!(
            position(&session),
            (2, 5),
            "break on channel {}",
            break_channel
        );
    }
}

#[test]
fn test_pattern_loop_repeats_section() {
    let data = looped_sample(ModBuilder::tagged(b"M.K.", 4))
        .cell(0, 0, 0, 0, 0, 0xE60)
        .cell(0, 1, 0, 0, 0, 0xE62)
        .build();
    let mut session = create_session(parse(&data).unwrap(), RATE);

    pull(&mut session, 1);
    let mut visited = vec![session.cursor().division];
    for _ in 0..6 {
        pull(&mut session, DIVISION);
        visited.push(session.cursor().division);
    }
    assert_eq!(visited, vec![0, 1, 0, 1, 0, 1, 2]);
}

#[test]
fn test_volume_effects_shape_output() {
    let data = looped_sample(ModBuilder::tagged(b"M.K.", 4))
        .cell(0, 0, 0, 1, 428, 0xC20)
        .cell(0, 1, 0, 0, 0, 0xA02)
        .build();
    let mut session = create_session(parse(&data).unwrap(), RATE);

    let first = pull(&mut session, 1);
    assert_relative_eq!(first[0][0], 40.0 / 128.0 * 0.5);

    pull(&mut session, 2 * DIVISION);
    assert_eq!(position(&session), (0, 2));
    // five slide ticks; tick 0 only latches the effect
    assert_relative_eq!(session.channel(0).unwrap().volume(), 0.5 - 5.0 * 2.0 / 64.0);
}

#[test]
fn test_looping_session_wraps_to_restart_position() {
    let data = looped_sample(ModBuilder::tagged(b"M.K.", 4))
        .order(&[0, 1])
        .restart(1)
        .build();
    let module: Module = parse(&data).unwrap();
    let config = SessionConfig::with_sample_rate(RATE).loop_song(true);
    let mut session = Session::with_config(module, config);

    pull(&mut session, 2 * DIVISIONS * DIVISION + 1);
    assert!(!session.is_finished());
    assert_eq!(
        session.cursor(),
        Cursor {
            song_position: 1,
            ..Cursor::default()
        }
    );
}

#[test]
fn test_restart_replays_from_the_top() {
    let data = looped_sample(ModBuilder::tagged(b"M.K.", 4))
        .cell(0, 0, 0, 1, 428, 0)
        .build();
    let mut session = create_session(parse(&data).unwrap(), RATE);

    let first = pull(&mut session, 256);
    pull(&mut session, DIVISIONS * DIVISION);
    assert!(session.is_finished());

    session.restart();
    assert_eq!(pull(&mut session, 256), first);
}
