// Pitch table: note names, pitch classes, and absolute (MIDI) pitches.
//
// Spellings are normalized to a fixed sharp-preferring table, so `Db` and
// `C#` both become pitch class 1 and print as `C#`. Pitch classes serialize
// as their canonical name, which keeps progression documents readable.

use crate::error::{ChordError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical names, indexed by pitch class.
const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Every accepted spelling and the pitch class it denotes.
const ACCEPTED_NAMES: [(&str, u8); 17] = [
    ("C", 0),
    ("C#", 1),
    ("Db", 1),
    ("D", 2),
    ("D#", 3),
    ("Eb", 3),
    ("E", 4),
    ("F", 5),
    ("F#", 6),
    ("Gb", 6),
    ("G", 7),
    ("G#", 8),
    ("Ab", 8),
    ("A", 9),
    ("A#", 10),
    ("Bb", 10),
    ("B", 11),
];

/// A pitch class in 0..=11 (0 = C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PitchClass(u8);

impl PitchClass {
    /// Wrap any integer into 0..=11.
    pub fn new(value: u8) -> Self {
        PitchClass(value % 12)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The pitch class `semitones` above this one.
    pub fn transpose(self, semitones: u8) -> Self {
        PitchClass::new(self.0 + semitones % 12)
    }

    pub fn name(self) -> &'static str {
        SHARP_NAMES[self.0 as usize]
    }

    /// Absolute pitch of this class in `octave`, with C4 = 60.
    pub fn to_midi(self, octave: u8) -> u8 {
        (octave + 1) * 12 + self.0
    }
}

impl FromStr for PitchClass {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        ACCEPTED_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, pc)| PitchClass(pc))
            .ok_or_else(|| {
                ChordError::invalid(format!("unsupported key '{s}'; use e.g. C, C#, Eb, F#"))
            })
    }
}

impl TryFrom<String> for PitchClass {
    type Error = ChordError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<PitchClass> for String {
    fn from(pc: PitchClass) -> String {
        pc.name().to_string()
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
