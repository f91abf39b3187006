// Voicing: turning a chord's pitch classes into concrete MIDI pitches.
//
// A chord is first stacked in close position from its root in octave 3,
// each tone folded up by octaves until it sits strictly above the one
// before. Every rotation of that stack is an inversion candidate (re-folded
// to ascending order); open spread then lifts every second tone an octave.
// The inversion mode picks one candidate: the unrotated one, a random one,
// or the one closest to the previous chord's voicing.
//
// `VoicingResolver` carries the previous voicing between consecutive chords
// of one export pass. That is the only cross-chord state in the pipeline.

use crate::config::{InversionMode, VoicingSpread};
use crate::pitch::PitchClass;
use chordsmith_prng::SeededRng;
use tracing::debug;

/// Octave the chord root is placed in before inversion (root C = 48).
pub const BASE_OCTAVE: u8 = 3;

/// Movement charged per note that has no counterpart when consecutive chords
/// differ in size (triad next to a seventh chord). An arbitrary tuning value,
/// kept stable because it affects which inversion a stored seed replays to.
pub const SIZE_MISMATCH_PENALTY: u32 = 50;

/// How chords are spread and inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicingSettings {
    pub spread: VoicingSpread,
    pub inversion: InversionMode,
}

/// Resolves successive chords into voicings, remembering the last one.
#[derive(Debug, Clone)]
pub struct VoicingResolver {
    settings: VoicingSettings,
    previous: Option<Vec<u8>>,
}

impl VoicingResolver {
    pub fn new(settings: VoicingSettings) -> Self {
        VoicingResolver {
            settings,
            previous: None,
        }
    }

    /// Voicing chosen for the most recently resolved chord.
    pub fn previous(&self) -> Option<&[u8]> {
        self.previous.as_deref()
    }

    /// Voice one chord. Draws from `rng` only in `Random` mode, exactly once.
    pub fn resolve(&mut self, chord: &[PitchClass], rng: &mut SeededRng) -> Vec<u8> {
        if chord.is_empty() {
            return Vec::new();
        }
        let candidates = candidates(chord, self.settings.spread);

        let index = match (self.settings.inversion, self.previous.as_deref()) {
            (InversionMode::Root, _) => 0,
            (InversionMode::Random, _) => rng.range_usize(0, candidates.len()),
            (InversionMode::Smooth, None) => 0,
            (InversionMode::Smooth, Some(prev)) => smoothest(prev, &candidates),
        };
        let chosen = candidates[index].clone();
        debug!(inversion = index, voicing = ?chosen, "voiced chord");
        self.previous = Some(chosen.clone());
        chosen
    }
}

/// Close-position stack starting at the root in `BASE_OCTAVE`.
pub fn close_voicing(chord: &[PitchClass]) -> Vec<u8> {
    fold_ascending(chord.iter().map(|pc| pc.to_midi(BASE_OCTAVE)))
}

/// All inversion candidates in rotation order, with `spread` applied.
/// Index 0 is always root position.
pub fn candidates(chord: &[PitchClass], spread: VoicingSpread) -> Vec<Vec<u8>> {
    let base = close_voicing(chord);
    (0..base.len())
        .map(|inv| {
            let rotated = base[inv..]
                .iter()
                .copied()
                .chain(base[..inv].iter().map(|&n| n + 12));
            let folded = fold_ascending(rotated);
            match spread {
                VoicingSpread::Close => folded,
                VoicingSpread::Open => open_spread(folded),
            }
        })
        .collect()
}

/// Total pitch movement from `prev` to `candidate`, matching notes by
/// position in ascending order.
pub fn movement(prev: &[u8], candidate: &[u8]) -> u32 {
    let mut a = prev.to_vec();
    let mut b = candidate.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    let matched: u32 = a
        .iter()
        .zip(&b)
        .map(|(&x, &y)| x.abs_diff(y) as u32)
        .sum();
    matched + SIZE_MISMATCH_PENALTY * a.len().abs_diff(b.len()) as u32
}

/// Index of the least-movement candidate; the earliest wins ties.
fn smoothest(prev: &[u8], candidates: &[Vec<u8>]) -> usize {
    let mut best = 0;
    let mut best_score = u32::MAX;
    for (i, candidate) in candidates.iter().enumerate() {
        let score = movement(prev, candidate);
        if score < best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

/// Keep the first pitch, raise each later one by octaves until it is
/// strictly above its predecessor.
fn fold_ascending(pitches: impl IntoIterator<Item = u8>) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    for mut pitch in pitches {
        if let Some(&last) = out.last() {
            while pitch <= last {
                pitch += 12;
            }
        }
        out.push(pitch);
    }
    out
}

/// Raise the 2nd, 4th, ... note by an octave and re-sort.
fn open_spread(mut pitches: Vec<u8>) -> Vec<u8> {
    for pitch in pitches.iter_mut().skip(1).step_by(2) {
        *pitch += 12;
    }
    pitches.sort_unstable();
    pitches
}
