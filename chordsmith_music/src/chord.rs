// Chords and progressions: the artifact threaded between generation,
// persistence, and export.
//
// A `Chord` is created by the harmony engine, one per bar, and never mutated
// afterwards. A `Progression` always records its seed, including the one
// drawn for an unseeded run, so any stored progression can be replayed.

use crate::diatonic::Scale;
use crate::error::{ChordError, Result};
use crate::pitch::PitchClass;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chord quality after optional seventh decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordQuality {
    #[serde(rename = "maj")]
    Major,
    #[serde(rename = "min")]
    Minor,
    #[serde(rename = "dim")]
    Diminished,
    #[serde(rename = "7")]
    Dominant7,
    #[serde(rename = "maj7")]
    Major7,
    #[serde(rename = "min7")]
    Minor7,
    #[serde(rename = "m7b5")]
    HalfDiminished7,
}

impl ChordQuality {
    /// Suffix appended to the root in a chord symbol.
    pub fn symbol_suffix(self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Diminished => "dim",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::HalfDiminished7 => "m7b5",
        }
    }

    pub fn is_seventh(self) -> bool {
        matches!(
            self,
            ChordQuality::Dominant7
                | ChordQuality::Major7
                | ChordQuality::Minor7
                | ChordQuality::HalfDiminished7
        )
    }
}

/// One bar's chord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ChordRecord")]
pub struct Chord {
    pub root: PitchClass,
    pub quality: ChordQuality,
    /// Triad tones root-third-fifth, plus the seventh when present.
    pub notes: Vec<PitchClass>,
    /// Scale degree, 1..=7.
    pub degree: u8,
    pub bar_index: usize,
    /// Conventional text rendering, e.g. `Cm`, `G7`, `Bm7b5`.
    pub symbol: String,
}

impl Chord {
    pub fn new(
        root: PitchClass,
        quality: ChordQuality,
        notes: Vec<PitchClass>,
        degree: u8,
        bar_index: usize,
    ) -> Self {
        let symbol = format!("{}{}", root, quality.symbol_suffix());
        Chord {
            root,
            quality,
            notes,
            degree,
            bar_index,
            symbol,
        }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// Stored form of a chord. The symbol is derived, so a stored one is ignored
/// and recomputed on load.
#[derive(Deserialize)]
struct ChordRecord {
    root: PitchClass,
    quality: ChordQuality,
    notes: Vec<PitchClass>,
    degree: u8,
    bar_index: usize,
}

impl From<ChordRecord> for Chord {
    fn from(r: ChordRecord) -> Self {
        Chord::new(r.root, r.quality, r.notes, r.degree, r.bar_index)
    }
}

/// A generated progression. `chords.len() == bars` and
/// `chords[i].bar_index == i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub key: PitchClass,
    pub scale: Scale,
    pub bars: usize,
    pub seed: u64,
    pub chords: Vec<Chord>,
}

impl Progression {
    /// Check the shape a generated progression always has. Documents read
    /// back from disk may have been edited by hand.
    pub fn validate(&self) -> Result<()> {
        if self.bars < 1 || self.chords.len() != self.bars {
            return Err(ChordError::invalid(format!(
                "progression declares {} bars but holds {} chords",
                self.bars,
                self.chords.len()
            )));
        }
        for (i, chord) in self.chords.iter().enumerate() {
            if chord.bar_index != i {
                return Err(ChordError::invalid(format!(
                    "chord {i} has bar_index {}",
                    chord.bar_index
                )));
            }
            if !(1..=7).contains(&chord.degree) {
                return Err(ChordError::invalid(format!(
                    "chord {i} has scale degree {}",
                    chord.degree
                )));
            }
            if !(3..=4).contains(&chord.notes.len()) || chord.notes[0] != chord.root {
                return Err(ChordError::invalid(format!(
                    "chord {i} ({}) must list 3 or 4 notes starting at its root",
                    chord.symbol
                )));
            }
        }
        Ok(())
    }

    /// Chord symbols joined with ` | `.
    pub fn summary(&self) -> String {
        self.chords
            .iter()
            .map(|c| c.symbol.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
