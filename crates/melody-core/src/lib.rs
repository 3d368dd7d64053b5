//! Procedural melody generation constrained to a scale, written out as a
//! single-track MIDI file.
//!
//! Pipeline: [`build_scale`] and [`build_rhythm`] run independently,
//! [`assemble`] walks the scale across the rhythm with [`next_pitch`], and
//! [`midi::write`] persists the result. [`generate_melody`] runs all of it.

pub mod assemble;
pub mod error;
pub mod generate;
pub mod midi;
pub mod pitch;
pub mod rhythm;
pub mod scale;
pub mod walk;

pub use assemble::{assemble, NoteEvent};
pub use error::{Error, Result};
pub use generate::{generate_melody, generate_with_rng, GenerateOptions};
pub use midi::Melody;
pub use pitch::PitchClass;
pub use rhythm::{build_rhythm, RhythmPattern, RhythmStyle, TICKS_PER_QUARTER};
pub use scale::{build_scale, Mode, ModeSpec, Scale};
pub use walk::{next_pitch, Contour};

