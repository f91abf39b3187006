// Diatonic triad tables for major and natural-minor keys.
//
// Each scale is a fixed seven-interval pattern from the tonic plus a fixed
// triad quality per degree. `DiatonicTable::build` applies both to a key and
// yields the seven scale-degree triads, indexed 0..=6 for degrees 1..=7.
//
// Used by harmony.rs to materialize chords, and by tests to check that no
// foreign pitch class ever appears in a generated chord.

use crate::error::{ChordError, Result};
use crate::pitch::PitchClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two supported scale modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Ionian: 1 2 3 4 5 6 7.
    Major,
    /// Aeolian: 1 2 b3 4 5 b6 b7 (no raised leading tone).
    Minor,
}

impl Scale {
    /// Semitone intervals from the tonic to degrees 1-7.
    pub fn intervals(self) -> [u8; 7] {
        match self {
            Scale::Major => [0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => [0, 2, 3, 5, 7, 8, 10],
        }
    }

    /// Triad quality on degrees 1-7.
    pub fn qualities(self) -> [TriadQuality; 7] {
        use TriadQuality::*;
        match self {
            Scale::Major => [Major, Minor, Minor, Major, Major, Minor, Diminished],
            Scale::Minor => [Minor, Diminished, Major, Minor, Minor, Major, Major],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scale::Major => "major",
            Scale::Minor => "minor",
        }
    }
}

impl FromStr for Scale {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" => Ok(Scale::Major),
            "minor" => Ok(Scale::Minor),
            _ => Err(ChordError::invalid(format!(
                "scale must be 'major' or 'minor', got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Quality of a diatonic triad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriadQuality {
    Major,
    Minor,
    Diminished,
}

impl TriadQuality {
    /// (third, fifth) above the root, in semitones.
    pub fn intervals(self) -> (u8, u8) {
        match self {
            TriadQuality::Major => (4, 7),
            TriadQuality::Minor => (3, 7),
            TriadQuality::Diminished => (3, 6),
        }
    }
}

/// One scale-degree triad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiatonicTriad {
    pub root: PitchClass,
    pub quality: TriadQuality,
    /// Root, third, fifth.
    pub notes: [PitchClass; 3],
}

impl DiatonicTriad {
    fn new(root: PitchClass, quality: TriadQuality) -> Self {
        let (third, fifth) = quality.intervals();
        DiatonicTriad {
            root,
            quality,
            notes: [root, root.transpose(third), root.transpose(fifth)],
        }
    }
}

/// The seven triads of a key, index 0 = degree 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiatonicTable {
    triads: [DiatonicTriad; 7],
}

impl DiatonicTable {
    pub fn build(key: PitchClass, scale: Scale) -> Self {
        let intervals = scale.intervals();
        let qualities = scale.qualities();
        let triads = std::array::from_fn(|i| {
            DiatonicTriad::new(key.transpose(intervals[i]), qualities[i])
        });
        DiatonicTable { triads }
    }

    /// Triad on a 1-based scale degree. Panics outside 1..=7.
    pub fn degree(&self, degree: u8) -> &DiatonicTriad {
        assert!((1..=7).contains(&degree), "scale degree out of range: {degree}");
        &self.triads[(degree - 1) as usize]
    }

    /// All pitch classes in the key (the roots of the seven triads).
    pub fn scale_pitch_classes(&self) -> [PitchClass; 7] {
        std::array::from_fn(|i| self.triads[i].root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(triad: &DiatonicTriad) -> Vec<&'static str> {
        triad.notes.iter().map(|pc| pc.name()).collect()
    }

    #[test]
    fn test_c_major_table() {
        let table = DiatonicTable::build(PitchClass::new(0), Scale::Major);
        assert_eq!(names(table.degree(1)), ["C", "E", "G"]);
        assert_eq!(names(table.degree(2)), ["D", "F", "A"]);
        assert_eq!(names(table.degree(5)), ["G", "B", "D"]);
        assert_eq!(table.degree(7).quality, TriadQuality::Diminished);
        assert_eq!(names(table.degree(7)), ["B", "D", "F"]);
    }

    #[test]
    fn test_c_minor_table() {
        let table = DiatonicTable::build(PitchClass::new(0), Scale::Minor);
        assert_eq!(names(table.degree(1)), ["C", "D#", "G"]);
        assert_eq!(table.degree(2).quality, TriadQuality::Diminished);
        assert_eq!(names(table.degree(4)), ["F", "G#", "C"]);
        assert_eq!(table.degree(5).quality, TriadQuality::Minor);
        assert_eq!(names(table.degree(7)), ["A#", "D", "F"]);
    }

    #[test]
    fn test_triads_stay_in_key() {
        for key in 0..12 {
            for scale in [Scale::Major, Scale::Minor] {
                let table = DiatonicTable::build(PitchClass::new(key), scale);
                let in_key = table.scale_pitch_classes();
                for degree in 1..=7 {
                    for pc in table.degree(degree).notes {
                        assert!(in_key.contains(&pc), "{pc} not in {key} {scale}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_scale_parsing() {
        assert_eq!("Minor".parse::<Scale>().unwrap(), Scale::Minor);
        assert!("dorian".parse::<Scale>().is_err());
    }
}
