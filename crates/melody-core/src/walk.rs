//! Contour-guided melodic walk.
//!
//! Each call picks the next scale pitch from the current one: mostly small
//! steps, sometimes a leap toward the area of the scale the contour wants at
//! this point of the phrase. Two guards keep the line singable: a note is not
//! sounded three times in a row, and a big interval is answered by stepping
//! back the other way.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::scale::Scale;

/// Notes per full sweep of a contour.
pub const CONTOUR_RESOLUTION: f64 = 16.0;

const STEP_PROBABILITY: f64 = 0.7;
const STEP_OPTIONS: [i64; 4] = [-2, -1, 1, 2];
const MIN_LEAP: u32 = 3;
const MAX_LEAP: u32 = 5;
/// Semitones; anything wider gets answered by a step back.
const LARGE_INTERVAL: i32 = 4;

/// Target melodic shape over time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Contour {
    Ascending,
    Descending,
    #[default]
    Arch,
    InvertedArch,
    /// Also used for any unrecognised contour name.
    Static,
}

impl Contour {
    pub const ALL: [Contour; 5] = [
        Contour::Ascending,
        Contour::Descending,
        Contour::Arch,
        Contour::InvertedArch,
        Contour::Static,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Contour::Ascending => "ascending",
            Contour::Descending => "descending",
            Contour::Arch => "arch",
            Contour::InvertedArch => "inverted_arch",
            Contour::Static => "static",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ascending" => Contour::Ascending,
            "descending" => Contour::Descending,
            "arch" => Contour::Arch,
            "inverted_arch" => Contour::InvertedArch,
            _ => Contour::Static,
        }
    }

    /// Scale index the melody should gravitate to at `position`.
    ///
    /// `position` grows by 1/16 per note and is not clamped, so long melodies
    /// push the target past either end of the scale.
    pub fn target_area(self, scale_len: usize, position: f64) -> i64 {
        let len = scale_len as f64;
        let area = match self {
            Contour::Ascending => len * position,
            Contour::Descending => len * (1.0 - position),
            Contour::Arch if position < 0.5 => len * (position * 2.0),
            Contour::Arch => len * (2.0 - position * 2.0),
            Contour::InvertedArch if position < 0.5 => len * (1.0 - position * 2.0),
            Contour::InvertedArch => len * (position * 2.0 - 1.0),
            Contour::Static => return (scale_len / 2) as i64,
        };
        area.floor() as i64
    }
}

impl fmt::Display for Contour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Contour {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Contour::from_name(s))
    }
}

impl From<String> for Contour {
    fn from(s: String) -> Self {
        Contour::from_name(&s)
    }
}

impl From<Contour> for String {
    fn from(c: Contour) -> Self {
        c.name().to_string()
    }
}

/// Pick the pitch that follows `current`.
///
/// `history` holds every pitch chosen so far, oldest first; the caller appends
/// the returned pitch before the next call. With an empty history the result
/// is a stable degree and `contour` / `max_leap` are ignored.
pub fn next_pitch<R: Rng + ?Sized>(
    current: u8,
    scale: &Scale,
    history: &[u8],
    contour: Contour,
    max_leap: u32,
    rng: &mut R,
) -> u8 {
    let Some(&last) = history.last() else {
        return scale.stable_pitch(rng);
    };

    let len = scale.len() as i64;
    let current_index = scale.position(current).unwrap_or(scale.len() / 2) as i64;
    let position = (history.len() + 1) as f64 / CONTOUR_RESOLUTION;
    let target = contour.target_area(scale.len(), position);

    let mut next = if rng.gen_bool(STEP_PROBABILITY) {
        current_index + random_offset(rng)
    } else {
        let upper = max_leap.min(MAX_LEAP).max(MIN_LEAP);
        let leap = rng.gen_range(MIN_LEAP..=upper) as i64;
        let direction = if target >= current_index { 1 } else { -1 };
        current_index + leap * direction
    };
    next = next.clamp(0, len - 1);

    if let [.., a, b] = history {
        let candidate = scale.degree(next as usize);
        if candidate == *a && candidate == *b {
            next = (next + random_offset(rng)).rem_euclid(len);
        }
    }

    if (current as i32 - last as i32).abs() > LARGE_INTERVAL {
        let back = rng.gen_range(1..=2);
        next = if current > last {
            (current_index - back).max(0)
        } else {
            (current_index + back).min(len - 1)
        };
    }

    scale.degree(next as usize)
}

fn random_offset<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    *STEP_OPTIONS.choose(rng).unwrap_or(&1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::PitchClass;
    use crate::scale::{build_scale, Mode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn c_major() -> Scale {
        build_scale(PitchClass::C, &Mode::Major.into(), 2).unwrap()
    }

    #[test]
    fn first_note_is_stable_degree() {
        let scale = c_major();
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let p = next_pitch(0, &scale, &[], Contour::Descending, 1, &mut rng);
            assert!([60, 64, 67].contains(&p), "got {p}");
        }
    }

    #[test]
    fn always_returns_a_scale_member() {
        let scale = build_scale(PitchClass::FSharp, &Mode::PentatonicMinor.into(), 2).unwrap();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            for contour in Contour::ALL {
                let mut history = Vec::new();
                let mut current = scale.root();
                for _ in 0..64 {
                    current = next_pitch(current, &scale, &history, contour, 7, &mut rng);
                    assert!(scale.contains(current));
                    history.push(current);
                }
            }
        }
    }

    #[test]
    fn foreign_current_pitch_still_lands_in_scale() {
        let scale = c_major();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let p = next_pitch(61, &scale, &[61], Contour::Arch, 7, &mut rng);
            assert!(scale.contains(p));
        }
    }

    #[test]
    fn no_third_repetition() {
        let scale = c_major();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let p = next_pitch(60, &scale, &[60, 60], Contour::Static, 7, &mut rng);
            assert_ne!(p, 60);
        }
    }

    #[test]
    fn repeat_guard_wraps_below_the_bottom() {
        let scale = c_major();
        let mut seen = std::collections::BTreeSet::new();
        for seed in 0..300 {
            let mut rng = StdRng::seed_from_u64(seed);
            // Downward steps clamp to index 0, then the guard nudges around the top.
            seen.insert(next_pitch(60, &scale, &[60, 60], Contour::Static, 7, &mut rng));
        }
        assert!(seen.is_subset(&[62, 64, 65, 67, 69, 83, 84].into()), "got {seen:?}");
        assert!(seen.contains(&83) && seen.contains(&84), "got {seen:?}");
    }

    /// Runs `next_pitch` over many seeds from 72 (index 7) after a 74 -> 72 step.
    fn pitches_after_step_to_72(contour: Contour, max_leap: u32) -> std::collections::BTreeSet<u8> {
        let scale = c_major();
        (0..500)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                next_pitch(72, &scale, &[74, 72], contour, max_leap, &mut rng)
            })
            .collect()
    }

    #[test]
    fn leaps_head_down_toward_a_lower_target() {
        // Ascending at note 3 of 16 targets index 3, below the current index 7.
        let seen = pitches_after_step_to_72(Contour::Ascending, 7);
        // Steps reach 69..74; leaps of 3..=5 degrees down reach 64..67.
        assert!(seen.is_subset(&[64, 65, 67, 69, 71, 72, 74].into()), "got {seen:?}");
        assert!(seen.contains(&64) && seen.contains(&67), "got {seen:?}");
    }

    #[test]
    fn leaps_head_up_toward_a_higher_target() {
        // Descending at note 3 of 16 targets index 13.
        let seen = pitches_after_step_to_72(Contour::Descending, 7);
        assert!(seen.is_subset(&[69, 71, 72, 74, 76, 77, 79].into()), "got {seen:?}");
        assert!(seen.contains(&76) && seen.contains(&79), "got {seen:?}");
    }

    #[test]
    fn max_leap_between_three_and_five_caps_the_leap() {
        let seen = pitches_after_step_to_72(Contour::Ascending, 4);
        assert!(seen.is_subset(&[65, 67, 69, 71, 72, 74].into()), "got {seen:?}");
        assert!(seen.contains(&65), "got {seen:?}");
    }

    #[test]
    fn leap_goes_up_when_target_equals_current_index() {
        let scale = c_major();
        let mut seen = std::collections::BTreeSet::new();
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            // 73 is not in the scale, so the walk starts from the middle index 8,
            // which is exactly where the static contour aims.
            seen.insert(next_pitch(73, &scale, &[73], Contour::Static, 7, &mut rng));
        }
        assert!(seen.is_subset(&[71, 72, 74, 76, 77, 79, 81].into()), "got {seen:?}");
        assert!(seen.contains(&77) && seen.contains(&81), "got {seen:?}");
    }

    #[test]
    fn wide_upward_interval_steps_back_down() {
        let scale = c_major();
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            // 72 sits at index 7, reached from 60 by a twelve-semitone jump.
            let p = next_pitch(72, &scale, &[60], Contour::Ascending, 7, &mut rng);
            assert!(p == 69 || p == 71, "got {p}");
        }
    }

    #[test]
    fn wide_downward_interval_steps_back_up() {
        let scale = c_major();
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let p = next_pitch(62, &scale, &[72], Contour::Descending, 7, &mut rng);
            assert!(p == 64 || p == 65, "got {p}");
        }
    }

    #[test]
    fn small_max_leap_still_leaps_three() {
        let scale = c_major();
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let p = next_pitch(67, &scale, &[65, 67], Contour::Static, 1, &mut rng);
            let from = scale.position(67).unwrap() as i64;
            let to = scale.position(p).unwrap() as i64;
            assert!((to - from).abs() <= 3);
        }
    }

    #[test]
    fn target_areas() {
        assert_eq!(Contour::Ascending.target_area(16, 0.25), 4);
        assert_eq!(Contour::Descending.target_area(16, 0.25), 12);
        assert_eq!(Contour::Arch.target_area(16, 0.25), 8);
        assert_eq!(Contour::Arch.target_area(16, 0.75), 8);
        assert_eq!(Contour::Arch.target_area(16, 0.5), 16);
        assert_eq!(Contour::InvertedArch.target_area(16, 0.25), 8);
        assert_eq!(Contour::InvertedArch.target_area(16, 0.5), 0);
        assert_eq!(Contour::Static.target_area(16, 3.0), 8);
        // Past the end of the phrase the target leaves the scale.
        assert_eq!(Contour::Ascending.target_area(16, 1.5), 24);
        assert_eq!(Contour::Descending.target_area(16, 1.5), -8);
    }

    #[test]
    fn contour_names() {
        assert_eq!(Contour::from_name("inverted-arch"), Contour::InvertedArch);
        assert_eq!(Contour::from_name("Ascending"), Contour::Ascending);
        assert_eq!(Contour::from_name("zigzag"), Contour::Static);
    }
}
