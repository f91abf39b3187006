// Event scheduling: voiced chords to timed, velocity-assigned note events.
//
// Bars are a fixed four beats. For each chord in bar order the scheduler
// voices it (voicing.rs), places each note at the bar start or staggered
// for an arpeggio, draws one velocity per note, and emits a note-on and a
// note-off. The resulting list is sorted by tick with note-offs ahead of
// note-ons at the same tick, so a note ending exactly where another starts
// is released before the new attack.
//
// Random draws per chord, in order: the inversion draw (random mode only),
// then one velocity draw sequence per voiced note. The export side uses a
// fresh stream seeded from the progression's own seed, so scheduling is
// reproducible from a stored progression alone.

use crate::chord::Progression;
use crate::config::PlaybackMode;
use crate::voicing::{VoicingResolver, VoicingSettings};
use chordsmith_prng::SeededRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Only 4/4 is supported.
pub const BEATS_PER_BAR: u32 = 4;

/// Maximum humanize jitter in velocity steps, scaled by the humanize amount.
const HUMANIZE_SPAN: f64 = 15.0;

/// Largest absolute tick an event may land on. SMF delta times are 28-bit,
/// and every delta in a track is at most the tick of the event it leads to.
pub const MAX_TICK: u32 = 0x0fff_ffff;

/// Seventh chords are the largest chords the harmony engine builds.
const MAX_CHORD_NOTES: u64 = 4;

/// Off sorts before On.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoteKind {
    Off,
    On,
}

/// One note-on or note-off at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteEvent {
    pub tick: u32,
    pub kind: NoteKind,
    pub pitch: u8,
    /// 0 for note-offs, 1..=127 for note-ons.
    pub velocity: u8,
    /// 0-based MIDI channel.
    pub channel: u8,
}

/// How note-on velocities are chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VelocityPolicy {
    Fixed(u8),
    /// Uniform in `[min, max]`.
    Range { min: u8, max: u8 },
    /// A range draw plus up to ±15×amount of jitter.
    Humanize { min: u8, max: u8, amount: f64 },
}

impl VelocityPolicy {
    /// Draw one velocity, clamped to 1..=127.
    pub fn draw(self, rng: &mut SeededRng) -> u8 {
        let raw = match self {
            VelocityPolicy::Fixed(v) => v as i64,
            VelocityPolicy::Range { min, max } => rng.range_i64_inclusive(min as i64, max as i64),
            VelocityPolicy::Humanize { min, max, amount } => {
                let base = rng.range_i64_inclusive(min as i64, max as i64);
                let jitter = ((rng.next_f64() - 0.5) * 2.0 * HUMANIZE_SPAN * amount).round();
                base + jitter as i64
            }
        };
        raw.clamp(1, 127) as u8
    }
}

/// Everything the scheduler needs besides the progression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleSettings {
    pub voicing: VoicingSettings,
    pub playback: PlaybackMode,
    pub velocity: VelocityPolicy,
    pub note_length_beats: f64,
    pub arpeggio_spread_beats: f64,
    pub ticks_per_beat: u16,
    /// 0-based.
    pub channel: u8,
}

impl ScheduleSettings {
    fn beats_to_ticks(&self, beats: f64) -> u32 {
        (beats * self.ticks_per_beat as f64).round() as u32
    }

    pub fn note_length_ticks(&self) -> u32 {
        self.beats_to_ticks(self.note_length_beats)
    }

    pub fn arpeggio_step_ticks(&self) -> u32 {
        self.beats_to_ticks(self.arpeggio_spread_beats)
    }

    fn step_ticks(&self) -> u32 {
        match self.playback {
            PlaybackMode::Simultaneous => 0,
            PlaybackMode::Arpeggio => self.arpeggio_step_ticks(),
        }
    }

    fn bar_ticks(&self) -> u32 {
        BEATS_PER_BAR * self.ticks_per_beat as u32
    }

    /// Upper bound on the last note-off tick of a `bars`-bar progression.
    pub fn final_tick(&self, bars: usize) -> u64 {
        let last_bar = bars.saturating_sub(1) as u64;
        last_bar
            .saturating_mul(self.bar_ticks() as u64)
            .saturating_add((MAX_CHORD_NOTES - 1) * self.step_ticks() as u64)
            .saturating_add(self.note_length_ticks() as u64)
    }
}

/// Schedule a progression with the export stream seeded from its own seed.
pub fn schedule_progression(progression: &Progression, settings: &ScheduleSettings) -> Vec<NoteEvent> {
    let mut rng = SeededRng::new(progression.seed);
    schedule(progression, settings, &mut rng)
}

/// Schedule a progression, drawing inversions and velocities from `rng`.
pub fn schedule(
    progression: &Progression,
    settings: &ScheduleSettings,
    rng: &mut SeededRng,
) -> Vec<NoteEvent> {
    let mut resolver = VoicingResolver::new(settings.voicing);
    let length = settings.note_length_ticks();
    let step = settings.step_ticks();
    let bar_ticks = settings.bar_ticks();
    let mut events = Vec::new();

    // Ticks saturate rather than wrap; anything past MAX_TICK is rejected
    // by validation and again by the MIDI encoder.
    for chord in &progression.chords {
        let bar = u32::try_from(chord.bar_index).unwrap_or(u32::MAX);
        let chord_start = bar.saturating_mul(bar_ticks);
        let voicing = resolver.resolve(&chord.notes, rng);
        let velocities: Vec<u8> = voicing.iter().map(|_| settings.velocity.draw(rng)).collect();
        debug!(bar = chord.bar_index, ?voicing, ?velocities, "scheduled chord");

        for (i, (&pitch, &velocity)) in voicing.iter().zip(&velocities).enumerate() {
            let start = chord_start.saturating_add((i as u32).saturating_mul(step));
            events.push(NoteEvent {
                tick: start,
                kind: NoteKind::On,
                pitch,
                velocity,
                channel: settings.channel,
            });
            events.push(NoteEvent {
                tick: start.saturating_add(length),
                kind: NoteKind::Off,
                pitch,
                velocity: 0,
                channel: settings.channel,
            });
        }
    }

    // Stable: equal (tick, kind) keep emission order.
    events.sort_by_key(|e| (e.tick, e.kind));
    events
}

/// Flat diagnostic record of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub abs_tick: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub note: u8,
    pub velocity: u8,
    pub channel: u8,
}

/// Diagnostic dump, sorted by tick, then off-before-on, then pitch.
pub fn event_dump(events: &[NoteEvent]) -> Vec<EventRecord> {
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|e| (e.tick, e.kind, e.pitch));
    sorted
        .into_iter()
        .map(|e| EventRecord {
            abs_tick: e.tick,
            kind: match e.kind {
                NoteKind::On => "note_on",
                NoteKind::Off => "note_off",
            }
            .to_string(),
            note: e.pitch,
            velocity: e.velocity,
            channel: e.channel,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::{Chord, ChordQuality};
    use crate::config::{InversionMode, VoicingSpread};
    use crate::diatonic::Scale;
    use crate::pitch::PitchClass;

    fn progression(chords: &[&[u8]]) -> Progression {
        let chords = chords
            .iter()
            .enumerate()
            .map(|(i, pcs)| {
                let notes: Vec<PitchClass> = pcs.iter().map(|&v| PitchClass::new(v)).collect();
                Chord::new(notes[0], ChordQuality::Minor, notes, 1, i)
            })
            .collect::<Vec<_>>();
        Progression {
            key: PitchClass::new(0),
            scale: Scale::Minor,
            bars: chords.len(),
            seed: 7,
            chords,
        }
    }

    fn settings() -> ScheduleSettings {
        ScheduleSettings {
            voicing: VoicingSettings {
                spread: VoicingSpread::Close,
                inversion: InversionMode::Root,
            },
            playback: PlaybackMode::Simultaneous,
            velocity: VelocityPolicy::Fixed(90),
            note_length_beats: 4.0,
            arpeggio_spread_beats: 0.25,
            ticks_per_beat: 480,
            channel: 0,
        }
    }

    #[test]
    fn test_simultaneous_bar_timing() {
        let prog = progression(&[&[0, 3, 7], &[5, 8, 0]]);
        let events = schedule_progression(&prog, &settings());
        assert_eq!(events.len(), 12);
        let ons: Vec<_> = events.iter().filter(|e| e.kind == NoteKind::On).collect();
        assert!(ons[..3].iter().all(|e| e.tick == 0 && e.velocity == 90));
        assert!(ons[3..].iter().all(|e| e.tick == 1920));
    }

    #[test]
    fn test_offs_precede_ons_at_bar_line() {
        let prog = progression(&[&[0, 3, 7], &[5, 8, 0]]);
        let events = schedule_progression(&prog, &settings());
        let at_bar: Vec<NoteKind> =
            events.iter().filter(|e| e.tick == 1920).map(|e| e.kind).collect();
        assert_eq!(
            at_bar,
            [NoteKind::Off, NoteKind::Off, NoteKind::Off, NoteKind::On, NoteKind::On, NoteKind::On]
        );
    }

    #[test]
    fn test_arpeggio_offsets() {
        let prog = progression(&[&[0, 3, 7]]);
        let s = ScheduleSettings {
            playback: PlaybackMode::Arpeggio,
            note_length_beats: 1.0,
            ..settings()
        };
        let events = schedule_progression(&prog, &s);
        let ons: Vec<(u32, u8)> = events
            .iter()
            .filter(|e| e.kind == NoteKind::On)
            .map(|e| (e.tick, e.pitch))
            .collect();
        assert_eq!(ons, [(0, 48), (120, 51), (240, 55)]);
        let offs: Vec<u32> =
            events.iter().filter(|e| e.kind == NoteKind::Off).map(|e| e.tick).collect();
        assert_eq!(offs, [480, 600, 720]);
    }

    #[test]
    fn test_final_tick_bounds_every_event() {
        let prog = progression(&[&[0, 3, 7], &[5, 8, 0], &[7, 11, 2, 5]]);
        for playback in [PlaybackMode::Simultaneous, PlaybackMode::Arpeggio] {
            let s = ScheduleSettings { playback, ..settings() };
            let last = schedule_progression(&prog, &s).last().unwrap().tick;
            assert!(last as u64 <= s.final_tick(prog.bars));
        }
        // 2 bars of 1920 plus a 4-beat note.
        assert_eq!(settings().final_tick(3), 2 * 1920 + 1920);
    }

    #[test]
    fn test_oversized_ticks_saturate_instead_of_overflowing() {
        let prog = progression(&[&[0, 3, 7]]);
        let s = ScheduleSettings {
            note_length_beats: 1.0e7,
            ..settings()
        };
        let events = schedule_progression(&prog, &s);
        let offs: Vec<u32> =
            events.iter().filter(|e| e.kind == NoteKind::Off).map(|e| e.tick).collect();
        assert_eq!(offs, [u32::MAX; 3]);
        assert!(s.final_tick(1) > MAX_TICK as u64);
    }

    #[test]
    fn test_velocity_policies_stay_in_bounds() {
        let mut rng = SeededRng::new(3);
        for _ in 0..5000 {
            let v = VelocityPolicy::Range { min: 70, max: 100 }.draw(&mut rng);
            assert!((70..=100).contains(&v));
            let h = VelocityPolicy::Humanize { min: 120, max: 127, amount: 1.0 }.draw(&mut rng);
            assert!((105..=127).contains(&h));
            let low = VelocityPolicy::Humanize { min: 1, max: 2, amount: 1.0 }.draw(&mut rng);
            assert!(low >= 1);
        }
    }

    #[test]
    fn test_fixed_velocity_never_draws() {
        let mut rng = SeededRng::new(5);
        let mut untouched = SeededRng::new(5);
        assert_eq!(VelocityPolicy::Fixed(64).draw(&mut rng), 64);
        assert_eq!(rng.next_u64(), untouched.next_u64());
    }

    #[test]
    fn test_event_dump_order_and_names() {
        let prog = progression(&[&[0, 3, 7], &[5, 8, 0]]);
        let dump = event_dump(&schedule_progression(&prog, &settings()));
        assert_eq!(dump[0].kind, "note_on");
        assert_eq!(dump[0].note, 48);
        let keys: Vec<_> = dump
            .iter()
            .map(|r| (r.abs_tick, r.kind != "note_off", r.note))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        let json = serde_json::to_value(&dump[0]).unwrap();
        assert_eq!(json["type"], "note_on");
        assert_eq!(json["abs_tick"], 0);
    }
}
