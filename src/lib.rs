//! ProTracker-family MOD parser and sample-accurate replayer
//!
//! Decodes legacy tracker modules (the untagged 15-sample layout and the
//! tagged 31-sample 4/6/8-channel variants) into a format-independent score,
//! then plays it back one output sample at a time: a tick-based sequencer
//! drives per-channel effect processors, and each channel steps through its
//! instrument's PCM at the pitch those effects leave behind.
//!
//! # Features
//! - Bit-exact header, pattern and sample decoding
//! - Declarative bit-pattern dispatch for effect decoding, with per-channel
//!   memory for "continue previous" parameters
//! - The full ProTracker effect set: slides, slide-to-note, vibrato, tremolo,
//!   arpeggio, retrigger, cut, delay, jumps, pattern loops, tempo and speed
//! - Block-pull playback API with no allocation on the per-sample path
//! - Offline WAV rendering with stereo panning
//!
//! # Crate feature flags
//! - `export-wav` (default): WAV rendering via `hound` (`export`), also
//!   required by the `mod-replayer` CLI
//!
//! # Quick start
//! ## Parse and inspect
//! ```no_run
//! let data = std::fs::read("song.mod").unwrap();
//! let module = mod_replayer::parse(&data).unwrap();
//! println!("{}: {} channels", module.name, module.channel_count());
//! ```
//!
//! ## Pull audio blocks
//! ```no_run
//! use mod_replayer::{create_session, Block};
//! let module = mod_replayer::parse(&std::fs::read("song.mod").unwrap()).unwrap();
//! let mut session = create_session(module, 44_100.0);
//! while let Block::Audio(channels) = session.next_block(512) {
//!     // one buffer of 512 samples per channel
//!     assert_eq!(channels[0].len(), 512);
//! }
//! ```

#![warn(missing_docs)]

pub mod effect_parser; // Bit-pattern effect decoding
pub mod error;
#[cfg(feature = "export-wav")]
pub mod export; // Offline rendering
pub mod parser; // Binary module layout
pub mod player; // Sequencer, effect processors, synthesizer
pub mod score; // Format-independent score model

// Public API exports
pub use error::{ModError, Result};
pub use parser::{parse, ModParser};
pub use player::{
    create_session, Block, ChannelPlaybackState, Cursor, GlobalPlaybackState, Session,
    SessionConfig,
};
pub use score::{
    Division, DivisionChannel, Effect, EffectKind, Module, ModuleFormat, Note, Pattern,
    PatternList, Sample,
};
