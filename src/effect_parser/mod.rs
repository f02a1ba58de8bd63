//! Effect decoding: bit-pattern dispatch from packed nibbles to [`Effect`]s.
//!
//! - [`bit_pattern`] - pattern mini-language compiler
//! - [`history`] - per-channel memory for "continue previous" parameters
//! - [`registry`] - the dispatch table and `parse_channel`
//! - [`protracker`] - the ProTracker handler set
//!
//! [`Effect`]: crate::score::Effect

pub mod bit_pattern;
pub mod history;
pub mod protracker;
pub mod registry;

pub use bit_pattern::{BitPattern, Parameter, EFFECT_BITS};
pub use history::EffectParseHistory;
pub use registry::{EffectEvent, EffectHandler, EffectRegistry, RawCell};
