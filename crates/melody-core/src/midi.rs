//! Standard MIDI File output (format 0, one track) and the matching reader.
//!
//! Layout: a tempo meta event at tick 0, then for every note a NoteOn with
//! zero delta followed by a NoteOff after the note's duration. A rest is a
//! NoteOff on key 0 whose delta is the rest length, so the timeline keeps its
//! length without sounding anything.

use std::io::Write;
use std::path::{Path, PathBuf};

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};

use crate::assemble::NoteEvent;
use crate::error::{Error, Result};
use crate::rhythm::TICKS_PER_QUARTER;

const MICROS_PER_MINUTE: f64 = 60_000_000.0;
const REST_KEY: u8 = 0;
const MAX_TEMPO_MICROS: u32 = 0xFF_FFFF;

/// A decoded single-track melody.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Melody {
    pub bpm: u32,
    pub events: Vec<NoteEvent>,
}

impl Melody {
    pub fn total_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.duration() as u64).sum()
    }

    pub fn note_count(&self) -> usize {
        self.events.iter().filter(|e| !e.is_rest()).count()
    }

    pub fn rest_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_rest()).count()
    }
}

pub fn bpm_to_micros(bpm: u32) -> u32 {
    (MICROS_PER_MINUTE / bpm.max(1) as f64).round() as u32
}

pub fn micros_to_bpm(micros: u32) -> u32 {
    (MICROS_PER_MINUTE / micros.max(1) as f64).round() as u32
}

fn note_event(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi { channel: u4::new(0), message },
    }
}

/// Serialize `events` to SMF bytes at 480 ticks per quarter.
pub fn encode(events: &[NoteEvent], bpm: u32) -> Result<Vec<u8>> {
    let micros = bpm_to_micros(bpm);
    if micros > MAX_TEMPO_MICROS {
        return Err(Error::Midi(format!("tempo of {bpm} BPM does not fit a tempo event")));
    }

    let mut track: Track<'static> = Vec::with_capacity(events.len() * 2 + 2);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros))),
    });

    for event in events {
        match *event {
            NoteEvent::Note { pitch, velocity, duration } => {
                let key = u7::new(pitch.min(127));
                track.push(note_event(0, MidiMessage::NoteOn { key, vel: u7::new(velocity.min(127)) }));
                track.push(note_event(duration, MidiMessage::NoteOff { key, vel: u7::new(0) }));
            }
            NoteEvent::Rest { duration } => {
                track.push(note_event(
                    duration,
                    MidiMessage::NoteOff { key: u7::new(REST_KEY), vel: u7::new(0) },
                ));
            }
        }
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header::new(Format::SingleTrack, Timing::Metrical(u15::new(TICKS_PER_QUARTER))),
        tracks: vec![track],
    };

    let mut buf = Vec::new();
    smf.write(&mut buf).map_err(|e| Error::Midi(e.to_string()))?;
    Ok(buf)
}

/// Encode and write to `path`, returning it.
///
/// Bytes go to a temporary file next to `path` that is renamed into place
/// only once fully written; on failure nothing is left at `path`.
pub fn write(events: &[NoteEvent], bpm: u32, path: &Path) -> Result<PathBuf> {
    let bytes = encode(events, bpm)?;
    let write_err = |source| Error::Write { path: path.to_path_buf(), source };

    if path.as_os_str().is_empty() || path.file_name().is_none() {
        return Err(write_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "output path has no file name",
        )));
    }
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".melody");
    // Same mode as a plain `File::create`; the umask still applies.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(write_err)?;
    tmp.write_all(&bytes).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(path.to_path_buf())
}

/// Parse SMF bytes back into tempo and note/rest timeline.
///
/// Silence between a release and the next onset comes back as a rest,
/// whether it was written as a key-0 marker or as a plain delta.
pub fn decode(bytes: &[u8]) -> Result<Melody> {
    let smf = Smf::parse(bytes).map_err(|e| Error::Midi(e.to_string()))?;
    let track = smf
        .tracks
        .first()
        .ok_or_else(|| Error::Midi("file has no tracks".into()))?;

    let mut bpm = 120;
    let mut events = Vec::new();
    let mut sounding: Option<(u8, u8)> = None;
    let mut elapsed = 0u64;

    for ev in track {
        elapsed += u64::from(ev.delta.as_int());
        match ev.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(t)) => bpm = micros_to_bpm(t.as_int()),
            TrackEventKind::Midi { message: MidiMessage::NoteOn { key, vel }, .. }
                if vel.as_int() > 0 =>
            {
                if let Some((pitch, velocity)) = sounding.take() {
                    events.push(NoteEvent::Note { pitch, velocity, duration: span(elapsed)? });
                } else if elapsed > 0 {
                    events.push(NoteEvent::Rest { duration: span(elapsed)? });
                }
                elapsed = 0;
                sounding = Some((key.as_int(), vel.as_int()));
            }
            TrackEventKind::Midi { message: MidiMessage::NoteOn { key, .. }, .. }
            | TrackEventKind::Midi { message: MidiMessage::NoteOff { key, .. }, .. } => {
                match sounding {
                    Some((pitch, velocity)) if pitch == key.as_int() => {
                        events.push(NoteEvent::Note { pitch, velocity, duration: span(elapsed)? });
                        sounding = None;
                    }
                    Some(_) => continue,
                    None if elapsed > 0 => events.push(NoteEvent::Rest { duration: span(elapsed)? }),
                    None => {}
                }
                elapsed = 0;
            }
            _ => {}
        }
    }

    if let Some((pitch, velocity)) = sounding {
        events.push(NoteEvent::Note { pitch, velocity, duration: span(elapsed)? });
    }

    Ok(Melody { bpm, events })
}

/// Deltas are at most 28 bits each, but a long run of them can outgrow a `u32` duration.
fn span(elapsed: u64) -> Result<u32> {
    u32::try_from(elapsed).map_err(|_| Error::Midi(format!("{elapsed} ticks is too long for one event")))
}

pub fn read(path: &Path) -> Result<Melody> {
    let bytes = std::fs::read(path).map_err(|source| Error::Read { path: path.to_path_buf(), source })?;
    decode(&bytes)
}
