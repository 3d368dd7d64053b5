//! Rhythm synthesis: fills an exact tick budget with weighted note lengths
//! and the occasional short rest.

use std::fmt;
use std::str::FromStr;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ticks per quarter note used for every file this crate writes.
pub const TICKS_PER_QUARTER: u16 = 480;

pub const WHOLE: u32 = 1920;
pub const HALF: u32 = 960;
pub const QUARTER: u32 = 480;
pub const EIGHTH: u32 = 240;
pub const SIXTEENTH: u32 = 120;

/// One 4/4 measure.
pub const TICKS_PER_MEASURE: u32 = WHOLE;

const DURATIONS: [u32; 5] = [WHOLE, HALF, QUARTER, EIGHTH, SIXTEENTH];
const REST_LENGTHS: [u32; 2] = [SIXTEENTH, EIGHTH];
const REST_PROBABILITY: f64 = 0.1;

/// Weighting over whole/half/quarter/eighth/sixteenth.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RhythmStyle {
    #[default]
    Balanced,
    Syncopated,
    Legato,
    /// Fallback for any unrecognised style name; favours eighths.
    Driving,
}

impl RhythmStyle {
    pub const ALL: [RhythmStyle; 4] = [
        RhythmStyle::Balanced,
        RhythmStyle::Syncopated,
        RhythmStyle::Legato,
        RhythmStyle::Driving,
    ];

    pub fn weights(self) -> [f64; 5] {
        match self {
            RhythmStyle::Balanced => [0.1, 0.4, 0.3, 0.15, 0.05],
            RhythmStyle::Syncopated => [0.05, 0.2, 0.5, 0.2, 0.05],
            RhythmStyle::Legato => [0.2, 0.5, 0.2, 0.1, 0.0],
            RhythmStyle::Driving => [0.0, 0.1, 0.3, 0.5, 0.1],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RhythmStyle::Balanced => "balanced",
            RhythmStyle::Syncopated => "syncopated",
            RhythmStyle::Legato => "legato",
            RhythmStyle::Driving => "driving",
        }
    }

    /// Never fails: unknown names select [`RhythmStyle::Driving`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "balanced" => RhythmStyle::Balanced,
            "syncopated" => RhythmStyle::Syncopated,
            "legato" => RhythmStyle::Legato,
            _ => RhythmStyle::Driving,
        }
    }
}

impl fmt::Display for RhythmStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RhythmStyle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(RhythmStyle::from_name(s))
    }
}

impl From<String> for RhythmStyle {
    fn from(s: String) -> Self {
        RhythmStyle::from_name(&s)
    }
}

impl From<RhythmStyle> for String {
    fn from(style: RhythmStyle) -> Self {
        style.name().to_string()
    }
}

/// Signed tick lengths: positive slots sound, negative slots are rests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RhythmPattern(Vec<i32>);

impl RhythmPattern {
    pub fn slots(&self) -> &[i32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_ticks(&self) -> u64 {
        self.0.iter().map(|s| s.unsigned_abs() as u64).sum()
    }

    pub fn note_count(&self) -> usize {
        self.0.iter().filter(|s| **s > 0).count()
    }

    pub fn rest_count(&self) -> usize {
        self.0.iter().filter(|s| **s < 0).count()
    }
}

impl From<Vec<i32>> for RhythmPattern {
    fn from(slots: Vec<i32>) -> Self {
        RhythmPattern(slots)
    }
}

/// Draw note lengths until exactly `measures` whole-note measures are filled.
///
/// The last note is cut short if it would overshoot. After each note there is
/// a 10% chance of a sixteenth or eighth rest, kept only if it fits.
pub fn build_rhythm<R: Rng + ?Sized>(
    measures: u32,
    style: RhythmStyle,
    rng: &mut R,
) -> Result<RhythmPattern> {
    let total = measures as u64 * TICKS_PER_MEASURE as u64;
    let dist = WeightedIndex::new(style.weights())
        .map_err(|e| Error::InvalidOptions(format!("rhythm weights for {style}: {e}")))?;

    let mut slots = Vec::new();
    let mut used = 0u64;
    while used < total {
        let drawn = DURATIONS[dist.sample(rng)] as u64;
        let len = drawn.min(total - used);
        slots.push(len as i32);
        used += len;

        if rng.gen_bool(REST_PROBABILITY) && used < total {
            let rest = *REST_LENGTHS.choose(rng).unwrap_or(&SIXTEENTH) as u64;
            if used + rest <= total {
                slots.push(-(rest as i32));
                used += rest;
            }
        }
    }
    Ok(RhythmPattern(slots))
}
