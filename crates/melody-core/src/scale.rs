//! Scale machinery: the named mode table and octave expansion around a root.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pitch::PitchClass;

/// Scale positions of tonic, third and fifth.
pub const STABLE_DEGREES: [usize; 3] = [0, 2, 4];

/// Named interval patterns. Every pattern closes on the octave (12).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    NaturalMinor,
    HarmonicMinor,
    PentatonicMajor,
    PentatonicMinor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
}

impl Mode {
    pub const ALL: [Mode; 11] = [
        Mode::Major,
        Mode::NaturalMinor,
        Mode::HarmonicMinor,
        Mode::PentatonicMajor,
        Mode::PentatonicMinor,
        Mode::Dorian,
        Mode::Phrygian,
        Mode::Lydian,
        Mode::Mixolydian,
        Mode::Aeolian,
        Mode::Locrian,
    ];

    /// Semitone offsets from the root, octave included.
    pub fn pattern(self) -> &'static [u8] {
        match self {
            Mode::Major => &[0, 2, 4, 5, 7, 9, 11, 12],
            Mode::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10, 12],
            Mode::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11, 12],
            Mode::PentatonicMajor => &[0, 2, 4, 7, 9, 12],
            Mode::PentatonicMinor => &[0, 3, 5, 7, 10, 12],
            Mode::Dorian => &[0, 2, 3, 5, 7, 9, 10, 12],
            Mode::Phrygian => &[0, 1, 3, 5, 7, 8, 10, 12],
            Mode::Lydian => &[0, 2, 4, 6, 7, 9, 11, 12],
            Mode::Mixolydian => &[0, 2, 4, 5, 7, 9, 10, 12],
            Mode::Aeolian => &[0, 2, 3, 5, 7, 8, 10, 12],
            Mode::Locrian => &[0, 1, 3, 5, 6, 8, 10, 12],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Major => "Major",
            Mode::NaturalMinor => "Natural Minor",
            Mode::HarmonicMinor => "Harmonic Minor",
            Mode::PentatonicMajor => "Pentatonic Major",
            Mode::PentatonicMinor => "Pentatonic Minor",
            Mode::Dorian => "Dorian",
            Mode::Phrygian => "Phrygian",
            Mode::Lydian => "Lydian",
            Mode::Mixolydian => "Mixolydian",
            Mode::Aeolian => "Aeolian",
            Mode::Locrian => "Locrian",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = Error;

    /// Matches display names ("Natural Minor") as well as `natural_minor` / `natural-minor`.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize(s);
        Mode::ALL
            .into_iter()
            .find(|m| normalize(m.name()) == wanted)
            .ok_or_else(|| Error::UnknownMode(s.to_string()))
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Either a mode name to look up or a raw list of semitone offsets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModeSpec {
    Named(String),
    Offsets(Vec<u8>),
}

impl ModeSpec {
    /// Label used when naming output files.
    pub fn label(&self) -> String {
        match self {
            ModeSpec::Named(name) => name.clone(),
            ModeSpec::Offsets(offsets) => {
                let parts: Vec<String> = offsets.iter().map(|o| o.to_string()).collect();
                format!("custom-{}", parts.join("-"))
            }
        }
    }

    fn resolve(&self) -> Result<Vec<u8>> {
        match self {
            ModeSpec::Named(name) => Ok(name.parse::<Mode>()?.pattern().to_vec()),
            ModeSpec::Offsets(offsets) => {
                if offsets.is_empty() {
                    return Err(Error::InvalidPattern("offset list is empty".into()));
                }
                if offsets.windows(2).any(|w| w[1] < w[0]) {
                    return Err(Error::InvalidPattern(format!(
                        "offsets must be non-decreasing: {offsets:?}"
                    )));
                }
                Ok(offsets.clone())
            }
        }
    }
}

impl From<Mode> for ModeSpec {
    fn from(mode: Mode) -> Self {
        ModeSpec::Named(mode.name().to_string())
    }
}

impl From<&str> for ModeSpec {
    fn from(name: &str) -> Self {
        ModeSpec::Named(name.to_string())
    }
}

impl From<Vec<u8>> for ModeSpec {
    fn from(offsets: Vec<u8>) -> Self {
        ModeSpec::Offsets(offsets)
    }
}

/// Absolute MIDI pitches, non-decreasing and never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Scale(Vec<u8>);

impl Scale {
    pub fn pitches(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn root(&self) -> u8 {
        self.0[0]
    }

    /// Pitch at `index`, clamped to the top of the scale for short custom patterns.
    pub fn degree(&self, index: usize) -> u8 {
        self.0[index.min(self.0.len() - 1)]
    }

    /// First index holding `pitch`.
    pub fn position(&self, pitch: u8) -> Option<usize> {
        self.0.iter().position(|&p| p == pitch)
    }

    pub fn contains(&self, pitch: u8) -> bool {
        self.0.contains(&pitch)
    }

    /// Tonic, third or fifth, chosen uniformly.
    pub fn stable_pitch<R: Rng + ?Sized>(&self, rng: &mut R) -> u8 {
        let idx = *STABLE_DEGREES.choose(rng).unwrap_or(&0);
        self.degree(idx)
    }
}

/// Repeat `mode`'s offsets across `octaves` octaves above `root`'s base pitch.
///
/// No deduplication: with a pattern closing on 12 the octave tonic appears twice.
pub fn build_scale(root: PitchClass, mode: &ModeSpec, octaves: usize) -> Result<Scale> {
    if octaves == 0 {
        return Err(Error::InvalidOptions("octave count must be at least 1".into()));
    }
    let pattern = mode.resolve()?;
    let base = root.base_pitch() as i64;
    let widest = pattern.iter().copied().max().unwrap_or(0) as i64;

    // Range-check the top pitch before allocating anything sized by `octaves`.
    let top = i64::try_from(octaves - 1)
        .ok()
        .and_then(|o| o.checked_mul(12))
        .and_then(|o| o.checked_add(base + widest))
        .unwrap_or(i64::MAX);
    if top > 127 {
        return Err(Error::PitchOutOfRange(i32::try_from(top).unwrap_or(i32::MAX)));
    }

    let mut pitches = Vec::with_capacity(octaves * pattern.len());
    for octave in 0..octaves as i64 {
        for &offset in &pattern {
            let pitch = base + offset as i64 + 12 * octave;
            pitches.push(pitch as u8);
        }
    }
    Ok(Scale(pitches))
}
