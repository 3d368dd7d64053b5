use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::assemble::assemble;
use crate::error::{Error, Result};
use crate::midi;
use crate::pitch::PitchClass;
use crate::rhythm::{build_rhythm, RhythmStyle};
use crate::scale::{build_scale, Mode, ModeSpec};
use crate::walk::Contour;

pub const MAX_MEASURES: u32 = 1024;

/// Everything one generation call needs. Missing fields take the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    pub key: PitchClass,
    pub mode: ModeSpec,
    pub measures: u32,
    pub bpm: u32,
    pub contour: Contour,
    pub rhythm: RhythmStyle,
    pub max_leap: u32,
    pub octaves: usize,
    /// Fixed seed for reproducible output; fresh entropy when absent.
    pub seed: Option<u64>,
    /// Auto-named file in the system temp directory when absent.
    pub output_path: Option<PathBuf>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            key: PitchClass::C,
            mode: Mode::Major.into(),
            measures: 4,
            bpm: 120,
            contour: Contour::Arch,
            rhythm: RhythmStyle::Balanced,
            max_leap: 7,
            octaves: 2,
            seed: None,
            output_path: None,
        }
    }
}

impl GenerateOptions {
    pub fn validate(&self) -> Result<()> {
        // Tempos too slow for a tempo event are refused by the encoder.
        if self.bpm == 0 {
            return Err(Error::InvalidOptions("tempo must be at least 1 BPM".into()));
        }
        if !(1..=MAX_MEASURES).contains(&self.measures) {
            return Err(Error::InvalidOptions(format!(
                "measure count {} is outside 1..={MAX_MEASURES}",
                self.measures
            )));
        }
        if self.octaves == 0 {
            return Err(Error::InvalidOptions("octave count must be at least 1".into()));
        }
        Ok(())
    }

    /// `melody_{key}_{mode}_{bpm}bpm.mid` under the system temp directory.
    pub fn default_output_path(&self) -> PathBuf {
        let mode = self.mode.label().replace(' ', "_");
        std::env::temp_dir().join(format!("melody_{}_{}_{}bpm.mid", self.key, mode, self.bpm))
    }

    pub fn resolved_output_path(&self) -> PathBuf {
        self.output_path.clone().unwrap_or_else(|| self.default_output_path())
    }
}

/// Generate a melody and write it as a MIDI file, returning where it went.
pub fn generate_melody(opts: &GenerateOptions) -> Result<PathBuf> {
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    generate_with_rng(opts, &mut rng)
}

/// Same as [`generate_melody`] with a caller-owned random source.
pub fn generate_with_rng<R: Rng + ?Sized>(opts: &GenerateOptions, rng: &mut R) -> Result<PathBuf> {
    let _span = tracing::debug_span!(
        "generate_melody",
        key = %opts.key,
        mode = %opts.mode.label(),
        measures = opts.measures,
        bpm = opts.bpm,
        contour = %opts.contour,
        rhythm = %opts.rhythm
    )
    .entered();

    opts.validate()?;
    let scale = build_scale(opts.key, &opts.mode, opts.octaves)?;
    let rhythm = build_rhythm(opts.measures, opts.rhythm, rng)?;
    let events = assemble(&scale, &rhythm, opts.contour, opts.max_leap, rng);

    let path = midi::write(&events, opts.bpm, &opts.resolved_output_path())?;
    tracing::debug!(notes = events.len(), path = %path.display(), "melody written");
    Ok(path)
}
