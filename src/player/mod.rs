//! Sample-accurate playback.
//!
//! # Architecture
//!
//! - [`sequencer`] - song cursor, tempo and jump/loop bookkeeping
//! - [`processor`] - effect processor lifecycle and per-channel pipeline
//! - [`processors`] - runtime behaviour of each effect
//! - [`channel`] - per-channel state and the sample synthesizer
//! - [`waveform`] - vibrato/tremolo oscillator shapes
//! - [`session`] - block-pull entry point tying it together
//!
//! # Example
//!
//! ```no_run
//! use mod_replayer::{create_session, Block};
//!
//! let data = std::fs::read("song.mod")?;
//! let module = mod_replayer::parse(&data)?;
//! let mut session = create_session(module, 44_100.0);
//! while let Block::Audio(channels) = session.next_block(1024) {
//!     // hand `channels` to the audio host
//!     let _ = channels;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod channel;
pub mod processor;
pub mod processors;
pub mod sequencer;
pub mod session;
pub mod waveform;

pub use channel::{ChannelPlaybackState, STEP_CONSTANT};
pub use processor::{EffectPipeline, EffectProcessor, Lifecycle, Priority, Scope};
pub use sequencer::{Cursor, CursorChange, GlobalPlaybackState, WaveformSetting};
pub use session::{create_session, Block, Session, SessionConfig};
