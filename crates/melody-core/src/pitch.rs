use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// MIDI note number of C4; every pitch class maps into the octave above it.
pub const MIDDLE_C: u8 = 60;

/// The twelve semitone pitch classes, spelled with sharps.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C.
    pub fn semitone(self) -> u8 {
        self as u8
    }

    /// Octave-4 MIDI note number (C = 60 ... B = 71).
    pub fn base_pitch(self) -> u8 {
        MIDDLE_C + self.semitone()
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = Error;

    /// Accepts `C`, `c#`, `F♯`, and flat spellings such as `Db` or `B♭`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(|| Error::UnknownKey(input.to_string()))?;
        let natural: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(Error::UnknownKey(input.to_string())),
        };
        let shift = match chars.as_str() {
            "" => 0,
            "#" | "♯" => 1,
            "b" | "♭" => -1,
            _ => return Err(Error::UnknownKey(input.to_string())),
        };
        let idx = (natural + shift).rem_euclid(12) as usize;
        Ok(PitchClass::ALL[idx])
    }
}

impl TryFrom<String> for PitchClass {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PitchClass> for String {
    fn from(pc: PitchClass) -> Self {
        pc.name().to_string()
    }
}
