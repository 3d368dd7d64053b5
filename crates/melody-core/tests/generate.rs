use melody_core::{
    build_rhythm, build_scale, generate_melody, midi, Contour, Error, GenerateOptions, Mode,
    NoteEvent, PitchClass, RhythmStyle,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn opts_in(dir: &tempfile::TempDir, name: &str) -> GenerateOptions {
    GenerateOptions {
        output_path: Some(dir.path().join(name)),
        ..Default::default()
    }
}

#[test]
fn c_major_single_octave() {
    let scale = build_scale(PitchClass::C, &"Major".into(), 1).unwrap();
    assert_eq!(scale.pitches(), &[60, 62, 64, 65, 67, 69, 71, 72]);
}

#[test]
fn one_balanced_measure_fills_1920_ticks() {
    let mut rng = StdRng::seed_from_u64(2024);
    let rhythm = build_rhythm(1, RhythmStyle::Balanced, &mut rng).unwrap();
    let sum: u32 = rhythm.slots().iter().map(|s| s.unsigned_abs()).sum();
    assert_eq!(sum, 1920);
}

#[test]
fn one_measure_file_lasts_a_measure_plus_cadence() {
    let dir = tempfile::tempdir().unwrap();
    for seed in 0..20 {
        let opts = GenerateOptions {
            measures: 1,
            bpm: 120,
            seed: Some(seed),
            ..opts_in(&dir, &format!("one_{seed}.mid"))
        };
        let path = generate_melody(&opts).unwrap();
        let melody = midi::read(&path).unwrap();
        assert_eq!(melody.bpm, 120);
        assert_eq!(melody.total_ticks(), 1920 + 480);

        let scale = build_scale(PitchClass::C, &Mode::Major.into(), 2).unwrap();
        let last = melody.events.last().unwrap();
        assert!(matches!(
            *last,
            NoteEvent::Note { velocity: 80, duration: 480, pitch }
                if pitch == scale.degree(0) || pitch == scale.degree(4)
        ));
        assert!(melody.events.iter().filter_map(NoteEvent::pitch).all(|p| scale.contains(p)));
    }
}

#[test]
fn unknown_mode_is_reported_and_nothing_written() {
    let dir = tempfile::tempdir().unwrap();
    let opts = GenerateOptions {
        mode: "NotAMode".into(),
        ..opts_in(&dir, "never.mid")
    };
    let err = generate_melody(&opts).unwrap_err();
    assert!(matches!(err, Error::UnknownMode(ref m) if m == "NotAMode"));
    assert!(!dir.path().join("never.mid").exists());
}

#[test]
fn unwritable_output_path_is_a_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing").join("melody.mid");
    let opts = GenerateOptions {
        output_path: Some(target.clone()),
        ..Default::default()
    };
    let err = generate_melody(&opts).unwrap_err();
    assert!(matches!(err, Error::Write { ref path, .. } if *path == target));
    assert!(!target.exists());
}

#[test]
fn output_path_pointing_at_a_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let opts = GenerateOptions {
        output_path: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    assert!(matches!(generate_melody(&opts), Err(Error::Write { .. })));
}

#[test]
fn same_seed_same_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let base = GenerateOptions {
        key: PitchClass::D,
        mode: Mode::Dorian.into(),
        measures: 8,
        contour: Contour::InvertedArch,
        rhythm: RhythmStyle::Syncopated,
        seed: Some(7),
        ..Default::default()
    };
    let a = generate_melody(&GenerateOptions {
        output_path: Some(dir.path().join("a.mid")),
        ..base.clone()
    })
    .unwrap();
    let b = generate_melody(&GenerateOptions {
        output_path: Some(dir.path().join("b.mid")),
        ..base
    })
    .unwrap();
    assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
}

#[test]
fn every_mode_and_contour_generates() {
    let dir = tempfile::tempdir().unwrap();
    for (i, mode) in Mode::ALL.into_iter().enumerate() {
        for contour in Contour::ALL {
            let opts = GenerateOptions {
                key: PitchClass::ALL[i],
                mode: mode.into(),
                measures: 16,
                contour,
                seed: Some(i as u64),
                ..opts_in(&dir, "scratch.mid")
            };
            let path = generate_melody(&opts).unwrap();
            let melody = midi::read(&path).unwrap();
            assert_eq!(melody.total_ticks(), 16 * 1920 + 480);
        }
    }
}

#[test]
fn custom_offsets_generate() {
    let dir = tempfile::tempdir().unwrap();
    let opts = GenerateOptions {
        mode: vec![0, 3, 7, 10, 12].into(),
        seed: Some(99),
        ..opts_in(&dir, "custom.mid")
    };
    let path = generate_melody(&opts).unwrap();
    let melody = midi::read(&path).unwrap();
    assert_eq!(melody.total_ticks(), 4 * 1920 + 480);
}

#[test]
fn auto_named_output_lands_in_temp_dir() {
    let opts = GenerateOptions {
        key: PitchClass::A,
        mode: Mode::Locrian.into(),
        bpm: 77,
        measures: 1,
        seed: Some(1),
        ..Default::default()
    };
    let path = generate_melody(&opts).unwrap();
    assert_eq!(path, std::env::temp_dir().join("melody_A_Locrian_77bpm.mid"));
    assert!(path.exists());
    std::fs::remove_file(path).unwrap();
}

#[test]
fn huge_octave_count_is_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let opts = GenerateOptions {
        octaves: 1 << 40,
        ..opts_in(&dir, "wide.mid")
    };
    assert!(matches!(generate_melody(&opts), Err(Error::PitchOutOfRange(_))));
    assert!(!dir.path().join("wide.mid").exists());
}

#[test]
fn fast_and_slow_tempos_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    for bpm in [4, 10, 500, 1000] {
        let opts = GenerateOptions {
            bpm,
            seed: Some(5),
            ..opts_in(&dir, &format!("t{bpm}.mid"))
        };
        let melody = midi::read(&generate_melody(&opts).unwrap()).unwrap();
        assert_eq!(melody.bpm, bpm);
    }
}

#[test]
fn tempo_below_four_bpm_is_a_midi_error() {
    let dir = tempfile::tempdir().unwrap();
    let opts = GenerateOptions {
        bpm: 3,
        ..opts_in(&dir, "crawl.mid")
    };
    assert!(matches!(generate_melody(&opts), Err(Error::Midi(_))));
    assert!(!dir.path().join("crawl.mid").exists());
}
