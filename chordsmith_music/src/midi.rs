// MIDI output from scheduled note events.
//
// Writes a Standard MIDI File, format 0 (one track), with metrical timing at
// the configured ticks per beat. The track opens with a tempo meta event and
// a 4/4 time-signature meta event, followed by the scheduler's events turned
// into delta times, and closes with end-of-track.
//
// Uses the `midly` crate behind the `midi` cargo feature. Without it,
// `encode`/`export` return `MissingExternalDependency`; generation and
// scheduling do not depend on this module.

use crate::chord::Progression;
use crate::error::{ChordError, Result};
use crate::schedule::{MAX_TICK, NoteEvent, ScheduleSettings, event_dump, schedule_progression};
use std::path::Path;
use tracing::info;

/// Where and how to export a progression.
#[derive(Debug, Clone)]
pub struct ExportOptions<'a> {
    pub settings: ScheduleSettings,
    pub tempo_bpm: u32,
    /// Optional JSON dump of the event list next to the MIDI file.
    pub dump_path: Option<&'a Path>,
}

/// Schedule a progression and write it as a MIDI file (plus the optional
/// event dump). Returns the scheduled events.
pub fn export(progression: &Progression, path: &Path, options: &ExportOptions) -> Result<Vec<NoteEvent>> {
    let events = schedule_progression(progression, &options.settings);
    let bytes = encode(&events, options.settings.ticks_per_beat, options.tempo_bpm)?;
    std::fs::write(path, &bytes)?;
    info!(path = %path.display(), events = events.len(), bytes = bytes.len(), "wrote MIDI file");

    if let Some(dump_path) = options.dump_path {
        let json = serde_json::to_string_pretty(&event_dump(&events))?;
        std::fs::write(dump_path, json)?;
        info!(path = %dump_path.display(), "wrote event dump");
    }
    Ok(events)
}

/// Largest value of the 24-bit SMF tempo field.
const MAX_TEMPO_MICROS: u32 = 0xff_ffff;

/// Microseconds per quarter note for a tempo in BPM. Tempos below 4 BPM
/// saturate at the slowest tempo a file can encode.
pub fn tempo_micros(tempo_bpm: u32) -> u32 {
    (60_000_000 / tempo_bpm.max(1)).min(MAX_TEMPO_MICROS)
}

/// Reject events whose tick cannot be reached with 28-bit delta times.
fn check_ticks(events: &[NoteEvent]) -> Result<()> {
    match events.iter().map(|e| e.tick).max() {
        Some(last) if last > MAX_TICK => Err(ChordError::invalid(format!(
            "event at tick {last} is past the MIDI limit of {MAX_TICK}"
        ))),
        _ => Ok(()),
    }
}

/// Encode events into SMF bytes. Fails on ticks past `MAX_TICK`.
#[cfg(feature = "midi")]
pub fn encode(events: &[NoteEvent], ticks_per_beat: u16, tempo_bpm: u32) -> Result<Vec<u8>> {
    check_ticks(events)?;
    let smf = events_to_smf(events, ticks_per_beat, tempo_bpm);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Encode events into SMF bytes.
#[cfg(not(feature = "midi"))]
pub fn encode(events: &[NoteEvent], _ticks_per_beat: u16, _tempo_bpm: u32) -> Result<Vec<u8>> {
    check_ticks(events)?;
    Err(ChordError::MissingExternalDependency("midly"))
}

#[cfg(feature = "midi")]
fn events_to_smf(events: &[NoteEvent], ticks_per_beat: u16, tempo_bpm: u32) -> midly::Smf<'static> {
    use crate::schedule::NoteKind;
    use midly::num::{u4, u7, u15, u24, u28};
    use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(ticks_per_beat)),
    ));

    let mut track: Track<'static> = Vec::with_capacity(events.len() + 3);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_micros(tempo_bpm)))),
    });
    // 4/4: numerator 4, denominator 2^2, 24 MIDI clocks per click,
    // 8 thirty-second notes per quarter.
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
    });

    let mut last_tick: u32 = 0;
    for event in events {
        let delta = event.tick.saturating_sub(last_tick);
        let key = u7::new(event.pitch);
        let message = match event.kind {
            NoteKind::On => MidiMessage::NoteOn {
                key,
                vel: u7::new(event.velocity),
            },
            NoteKind::Off => MidiMessage::NoteOff {
                key,
                vel: u7::new(0),
            },
        };
        track.push(TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(event.channel),
                message,
            },
        });
        last_tick = event.tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    smf
}
