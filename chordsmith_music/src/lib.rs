// Chordsmith: seeded chord progression generator.
//
// Generates diatonic chord progressions from a small set of functional-
// harmony rules and renders them as timed note events for MIDI export.
// Everything is deterministic given a seed; unseeded runs draw a seed and
// record it in the result so they can be replayed.
//
// Architecture:
// - pitch.rs: Note names <-> pitch classes <-> MIDI pitches
// - diatonic.rs: Major / natural-minor scale-degree triad tables
// - chord.rs: Chord, ChordQuality, Progression (the persisted artifact)
// - harmony.rs: Tonic/subdominant/dominant state machine with cadence
//   overrides and seventh decoration
// - voicing.rs: Close/open spread and root/random/smooth inversion choice
// - schedule.rs: Note-on/off events with velocities and stable ordering
// - midi.rs: Standard MIDI File output (behind the `midi` feature)
// - config.rs: GeneratorConfig, option enums, validation
// - preset.rs: Named JSON presets on disk
// - selftest.rs: Determinism self-check
// - error.rs: ChordError
//
// Random draws come from `chordsmith_prng::SeededRng`, threaded explicitly
// through harmony, voicing, and scheduling in a fixed order.

pub mod chord;
pub mod config;
pub mod diatonic;
pub mod error;
pub mod harmony;
pub mod midi;
pub mod pitch;
pub mod preset;
pub mod schedule;
pub mod selftest;
pub mod voicing;

pub use error::{ChordError, Result};
