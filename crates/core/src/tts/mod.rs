//! Speech synthesis abstraction.
//!
//! The campaign consumes a `SpeechSynthesizer` that turns script text into
//! an audio file reference. `ElevenLabsSynthesizer` is the HTTP backend.

mod elevenlabs;
mod types;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use types::*;
