use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rhythm::{RhythmPattern, QUARTER};
use crate::scale::Scale;
use crate::walk::{next_pitch, Contour};

pub const CADENCE_VELOCITY: u8 = 80;
pub const CADENCE_DURATION: u32 = QUARTER;
const CADENCE_DEGREES: [usize; 2] = [0, 4];

/// One element of the melody timeline. Durations are in ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteEvent {
    Note { pitch: u8, velocity: u8, duration: u32 },
    Rest { duration: u32 },
}

impl NoteEvent {
    pub fn duration(&self) -> u32 {
        match *self {
            NoteEvent::Note { duration, .. } | NoteEvent::Rest { duration } => duration,
        }
    }

    pub fn pitch(&self) -> Option<u8> {
        match *self {
            NoteEvent::Note { pitch, .. } => Some(pitch),
            NoteEvent::Rest { .. } => None,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, NoteEvent::Rest { .. })
    }
}

/// Walk the scale across `rhythm`, then close on the tonic or fifth.
///
/// Dynamics follow the phrase: a moderate opening quarter, a louder middle
/// half and a softer final quarter, measured against the slot count (rests
/// included). The cadence note is a quarter note appended after the rhythm,
/// so the timeline runs one quarter past the measure budget.
pub fn assemble<R: Rng + ?Sized>(
    scale: &Scale,
    rhythm: &RhythmPattern,
    contour: Contour,
    max_leap: u32,
    rng: &mut R,
) -> Vec<NoteEvent> {
    let total_slots = rhythm.len() as f64;
    let mut current = scale.stable_pitch(rng);
    let mut history: Vec<u8> = Vec::with_capacity(rhythm.note_count());
    let mut events = Vec::with_capacity(rhythm.len() + 1);

    for &slot in rhythm.slots() {
        if slot < 0 {
            events.push(NoteEvent::Rest { duration: slot.unsigned_abs() });
            continue;
        }

        current = next_pitch(current, scale, &history, contour, max_leap, rng);
        history.push(current);

        let played = history.len() as f64;
        let velocity = if played < total_slots * 0.25 {
            rng.gen_range(85..=100)
        } else if played < total_slots * 0.75 {
            rng.gen_range(95..=115)
        } else {
            rng.gen_range(80..=95)
        };
        events.push(NoteEvent::Note { pitch: current, velocity, duration: slot as u32 });
    }

    if !history.is_empty() {
        let degree = *CADENCE_DEGREES.choose(rng).unwrap_or(&0);
        events.push(NoteEvent::Note {
            pitch: scale.degree(degree),
            velocity: CADENCE_VELOCITY,
            duration: CADENCE_DURATION,
        });
    }

    events
}
