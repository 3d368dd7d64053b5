use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use melody_core::{
    generate_melody, midi, Contour, GenerateOptions, Mode, ModeSpec, PitchClass, RhythmStyle,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// melody – scale-bound melody generator that writes MIDI files.
/// Commands:
///   - generate            (key/mode/bars/tempo/contour/rhythm → .mid)
///   - modes               (list the named scale patterns)
///   - inspect <file>      (read a generated file back)
///   - export <src> <dest> (copy a generated file somewhere else)
#[derive(Parser, Debug)]
#[command(name = "melody", version, about = "Procedural melody generator")]
struct Cli {
    /// Directory for auto-named output files (defaults to the system temp dir)
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a melody and write it as a MIDI file
    Generate(GenerateArgs),

    /// List the named modes and their semitone offsets
    Modes,

    /// Print tempo, note count and length of a MIDI file written by `generate`
    Inspect {
        input: PathBuf,
        /// Dump every note and rest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy a generated file to a destination of your choice
    Export { input: PathBuf, dest: PathBuf },
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Root pitch class (C, C#, Db, ...)
    #[arg(long, default_value = "C")]
    key: PitchClass,

    /// Mode name, e.g. "Major", "Natural Minor", dorian
    #[arg(long, default_value = "Major", conflicts_with = "offsets")]
    mode: String,

    /// Custom semitone offsets instead of a named mode, e.g. 0,3,7,10,12
    #[arg(long, value_delimiter = ',')]
    offsets: Option<Vec<u8>>,

    /// Number of 4/4 measures
    #[arg(long, default_value_t = 4)]
    measures: u32,

    /// Tempo in BPM
    #[arg(long, default_value_t = 120, conflicts_with = "tempo")]
    bpm: u32,

    /// Tempo preset instead of --bpm
    #[arg(long, value_enum)]
    tempo: Option<TempoPreset>,

    /// ascending | descending | arch | inverted_arch | static
    #[arg(long, default_value = "arch")]
    contour: Contour,

    /// balanced | syncopated | legato | anything else for eighth-heavy rhythms
    #[arg(long, default_value = "balanced")]
    rhythm: RhythmStyle,

    /// Upper bound for leaps, in scale degrees (leaps are always 3..=5)
    #[arg(long, default_value_t = 7)]
    max_leap: u32,

    /// Octaves spanned by the scale
    #[arg(long, default_value_t = 2)]
    octaves: usize,

    /// RNG seed (same seed => same file)
    #[arg(long)]
    seed: Option<u64>,

    /// Output .mid path (auto-named when omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print a JSON summary instead of just the path
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TempoPreset {
    Largo,
    Andante,
    Allegro,
}

impl TempoPreset {
    fn bpm(self) -> u32 {
        match self {
            TempoPreset::Largo => 60,
            TempoPreset::Andante => 90,
            TempoPreset::Allegro => 120,
        }
    }
}

#[derive(Serialize)]
struct GenerateSummary<'a> {
    path: PathBuf,
    options: &'a GenerateOptions,
    notes: usize,
    rests: usize,
    total_ticks: u64,
}

fn build_options(args: GenerateArgs, out_dir: Option<PathBuf>) -> GenerateOptions {
    let mode = match args.offsets {
        Some(offsets) => ModeSpec::Offsets(offsets),
        None => ModeSpec::Named(args.mode),
    };
    let mut opts = GenerateOptions {
        key: args.key,
        mode,
        measures: args.measures,
        bpm: args.tempo.map(TempoPreset::bpm).unwrap_or(args.bpm),
        contour: args.contour,
        rhythm: args.rhythm,
        max_leap: args.max_leap,
        octaves: args.octaves,
        seed: args.seed,
        output_path: args.out,
    };
    // --out wins over --out-dir; otherwise keep the auto name inside out_dir
    if opts.output_path.is_none() {
        if let Some(dir) = out_dir {
            let name = opts.default_output_path();
            opts.output_path = name.file_name().map(|f| dir.join(f));
        }
    }
    opts
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Generate(args) => {
            let json = args.json;
            let opts = build_options(args, cli.out_dir);
            if let Some(dir) = opts.output_path.as_ref().and_then(|p| p.parent()) {
                if !dir.as_os_str().is_empty() {
                    fs::create_dir_all(dir)
                        .with_context(|| format!("failed creating {}", dir.display()))?;
                }
            }
            tracing::info!(key = %opts.key, mode = %opts.mode.label(), bpm = opts.bpm, "generating melody");

            let path = generate_melody(&opts).context("melody generation failed")?;
            if json {
                let melody = midi::read(&path)?;
                let summary = GenerateSummary {
                    path,
                    options: &opts,
                    notes: melody.note_count(),
                    rests: melody.rest_count(),
                    total_ticks: melody.total_ticks(),
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                eprintln!("✓ wrote {}", path.display());
                println!("{}", path.display());
            }
        }

        Commands::Modes => {
            for m in Mode::ALL {
                println!("{:<18} {:?}", m.name(), m.pattern());
            }
        }

        Commands::Inspect { input, json } => {
            let melody = midi::read(&input)
                .with_context(|| format!("failed reading MIDI: {}", input.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&melody)?);
            } else {
                println!("tempo:  {} BPM", melody.bpm);
                println!("notes:  {}", melody.note_count());
                println!("rests:  {}", melody.rest_count());
                println!(
                    "length: {} ticks ({:.2} measures)",
                    melody.total_ticks(),
                    melody.total_ticks() as f64 / 1920.0
                );
            }
        }

        Commands::Export { input, dest } => {
            if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed creating {}", dir.display()))?;
            }
            fs::copy(&input, &dest).with_context(|| {
                format!("failed copying {} to {}", input.display(), dest.display())
            })?;
            eprintln!("✓ wrote {}", dest.display());
        }
    }

    Ok(())
}
