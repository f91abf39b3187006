// Functional-harmony progression generator.
//
// Walks the progression bar by bar with a three-state machine over the
// functional groups (tonic, subdominant, dominant). Each bar either takes a
// cadence override (final one or two bars) or samples the next group from a
// weighted transition table conditioned on the current group, then picks a
// scale degree uniformly from that group. The leading-tone triad is damped
// toward V, a complexity draw decides triad vs. seventh, and the degree is
// materialized from the diatonic table.
//
// **Determinism contract.** All randomness comes from one `SeededRng`, and
// the per-bar draw order is fixed: group transition, degree, leading-tone
// damping (only when degree 7 was picked), complexity (only under `mixed`
// with sevenths enabled). Cadence-forced bars skip the first three draws;
// the soft ending replaces them with a single weighted draw. Changing this
// order changes every progression ever generated from a stored seed.

use crate::chord::{Chord, ChordQuality, Progression};
use crate::config::{CadenceStyle, Complexity};
use crate::diatonic::{DiatonicTable, Scale, TriadQuality};
use crate::error::{ChordError, Result};
use crate::pitch::PitchClass;
use chordsmith_prng::SeededRng;
use rand::Rng;
use tracing::{debug, info};

/// Functional group of a scale degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionalGroup {
    Tonic,
    Subdominant,
    Dominant,
}

impl FunctionalGroup {
    /// Scale degrees belonging to this group.
    pub fn degrees(self) -> &'static [u8] {
        match self {
            FunctionalGroup::Tonic => &[1, 3, 6],
            FunctionalGroup::Subdominant => &[2, 4],
            FunctionalGroup::Dominant => &[5, 7],
        }
    }

    /// Weighted successors. Order is part of the determinism contract.
    fn transitions(self) -> [(FunctionalGroup, f64); 3] {
        use FunctionalGroup::*;
        match self {
            Tonic => [(Subdominant, 0.50), (Dominant, 0.30), (Tonic, 0.20)],
            Subdominant => [(Dominant, 0.55), (Tonic, 0.30), (Subdominant, 0.15)],
            Dominant => [(Tonic, 0.65), (Subdominant, 0.25), (Dominant, 0.10)],
        }
    }
}

/// Final-bar choices under the soft cadence: I, vi, iii.
const SOFT_ENDINGS: [(u8, f64); 3] = [(1, 0.60), (6, 0.25), (3, 0.15)];

/// Probability that a picked vii is replaced by V.
const LEADING_TONE_DAMPING: f64 = 0.5;

/// Probability of a seventh chord under `Complexity::Mixed`.
const MIXED_SEVENTH_PROBABILITY: f64 = 0.35;

/// Inputs to one generation. Built from a validated `GeneratorConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarmonyRequest {
    pub key: PitchClass,
    pub scale: Scale,
    pub bars: usize,
    pub cadence: CadenceStyle,
    pub complexity: Complexity,
    pub sevenths_enabled: bool,
    /// Drawn from OS entropy when absent, and recorded in the result.
    pub seed: Option<u64>,
}

/// Generate a progression.
///
/// The returned progression carries the seed it was generated from; passing
/// that seed back in reproduces it exactly.
pub fn generate(request: &HarmonyRequest) -> Result<Progression> {
    if request.bars < 1 {
        return Err(ChordError::invalid("bars must be >= 1"));
    }
    let seed = request.seed.unwrap_or_else(fresh_seed);
    let mut rng = SeededRng::new(seed);
    let chords = generate_chords(request, &mut rng);

    let progression = Progression {
        key: request.key,
        scale: request.scale,
        bars: request.bars,
        seed,
        chords,
    };
    info!(
        key = %progression.key,
        scale = %progression.scale,
        bars = progression.bars,
        seed,
        "generated progression: {}",
        progression.summary()
    );
    Ok(progression)
}

/// Generate `request.bars` chords from an explicit random stream.
pub fn generate_chords(request: &HarmonyRequest, rng: &mut SeededRng) -> Vec<Chord> {
    let table = DiatonicTable::build(request.key, request.scale);
    let mut group = FunctionalGroup::Tonic;
    let mut chords = Vec::with_capacity(request.bars);

    for bar in 0..request.bars {
        let (degree, next_group) = choose_degree(rng, bar, request.bars, request.cadence, group);
        group = next_group;
        let seventh = wants_seventh(request, rng);
        let chord = materialize(&table, degree, bar, seventh);
        debug!(bar, degree, ?group, symbol = %chord.symbol, "chose chord");
        chords.push(chord);
    }

    chords
}

/// A seed for unseeded runs, in the non-negative `i32` range so it stays
/// easy to type back in.
pub fn fresh_seed() -> u64 {
    rand::rng().random_range(0..=i32::MAX as u64)
}

fn choose_degree(
    rng: &mut SeededRng,
    bar: usize,
    bars: usize,
    cadence: CadenceStyle,
    current: FunctionalGroup,
) -> (u8, FunctionalGroup) {
    if let Some(forced) = cadence_override(rng, bar, bars, cadence) {
        return forced;
    }

    let transitions = current.transitions();
    let weights = transitions.map(|(_, w)| w);
    let mut group = transitions[rng.pick_weighted(&weights)].0;
    let mut degree = *rng.choose(group.degrees());

    if degree == 7 && rng.random_bool(LEADING_TONE_DAMPING) {
        degree = 5;
        group = FunctionalGroup::Dominant;
    }
    (degree, group)
}

/// Forced degree for the final bars. Progressions shorter than two bars
/// never take an override.
fn cadence_override(
    rng: &mut SeededRng,
    bar: usize,
    bars: usize,
    cadence: CadenceStyle,
) -> Option<(u8, FunctionalGroup)> {
    if bars < 2 {
        return None;
    }
    let last = bar == bars - 1;
    let penultimate = bar == bars - 2;

    match cadence {
        CadenceStyle::None => None,
        CadenceStyle::Strong if penultimate => Some((5, FunctionalGroup::Dominant)),
        CadenceStyle::Strong if last => Some((1, FunctionalGroup::Tonic)),
        CadenceStyle::Plagal if penultimate => Some((4, FunctionalGroup::Subdominant)),
        CadenceStyle::Plagal if last => Some((1, FunctionalGroup::Tonic)),
        CadenceStyle::Half if last => Some((5, FunctionalGroup::Dominant)),
        CadenceStyle::Soft if last => {
            let weights = SOFT_ENDINGS.map(|(_, w)| w);
            let degree = SOFT_ENDINGS[rng.pick_weighted(&weights)].0;
            Some((degree, FunctionalGroup::Tonic))
        }
        _ => None,
    }
}

fn wants_seventh(request: &HarmonyRequest, rng: &mut SeededRng) -> bool {
    if !request.sevenths_enabled {
        return false;
    }
    match request.complexity {
        Complexity::Triads => false,
        Complexity::Sevenths => true,
        Complexity::Mixed => rng.random_bool(MIXED_SEVENTH_PROBABILITY),
    }
}

/// Build the chord for `degree`, optionally stacking a diatonic seventh.
fn materialize(table: &DiatonicTable, degree: u8, bar_index: usize, seventh: bool) -> Chord {
    let triad = table.degree(degree);
    let mut notes = triad.notes.to_vec();

    let quality = if seventh {
        let (quality, interval) = match triad.quality {
            TriadQuality::Major if degree == 5 => (ChordQuality::Dominant7, 10),
            TriadQuality::Major => (ChordQuality::Major7, 11),
            TriadQuality::Minor => (ChordQuality::Minor7, 10),
            TriadQuality::Diminished => (ChordQuality::HalfDiminished7, 10),
        };
        notes.push(triad.root.transpose(interval));
        quality
    } else {
        match triad.quality {
            TriadQuality::Major => ChordQuality::Major,
            TriadQuality::Minor => ChordQuality::Minor,
            TriadQuality::Diminished => ChordQuality::Diminished,
        }
    };

    Chord::new(triad.root, quality, notes, degree, bar_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(cadence: CadenceStyle, seed: u64) -> HarmonyRequest {
        HarmonyRequest {
            key: PitchClass::new(0),
            scale: Scale::Minor,
            bars: 8,
            cadence,
            complexity: Complexity::Triads,
            sevenths_enabled: false,
            seed: Some(seed),
        }
    }

    fn values(notes: &[PitchClass]) -> Vec<u8> {
        notes.iter().map(|pc| pc.value()).collect()
    }

    #[test]
    fn test_same_seed_same_progression() {
        let req = HarmonyRequest {
            complexity: Complexity::Mixed,
            sevenths_enabled: true,
            ..request(CadenceStyle::Soft, 99)
        };
        assert_eq!(generate(&req).unwrap(), generate(&req).unwrap());
    }

    #[test]
    fn test_bar_coverage() {
        for bars in [1, 2, 5, 16] {
            let req = HarmonyRequest { bars, ..request(CadenceStyle::Strong, 5) };
            let prog = generate(&req).unwrap();
            assert_eq!(prog.chords.len(), bars);
            for (i, chord) in prog.chords.iter().enumerate() {
                assert_eq!(chord.bar_index, i);
            }
        }
    }

    #[test]
    fn test_zero_bars_rejected() {
        let req = HarmonyRequest { bars: 0, ..request(CadenceStyle::None, 1) };
        assert!(matches!(generate(&req), Err(ChordError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_unseeded_run_records_its_seed() {
        let req = HarmonyRequest { seed: None, ..request(CadenceStyle::Soft, 0) };
        let first = generate(&req).unwrap();
        assert!(first.seed <= i32::MAX as u64);
        let replay = generate(&HarmonyRequest { seed: Some(first.seed), ..req }).unwrap();
        assert_eq!(first, replay);
    }

    #[test]
    fn test_cadence_overrides_hold_for_any_seed() {
        for seed in 0..50 {
            let strong = generate(&request(CadenceStyle::Strong, seed)).unwrap();
            assert_eq!(strong.chords[6].degree, 5);
            assert_eq!(strong.chords[7].degree, 1);

            let plagal = generate(&request(CadenceStyle::Plagal, seed)).unwrap();
            assert_eq!(plagal.chords[6].degree, 4);
            assert_eq!(plagal.chords[7].degree, 1);

            let half = generate(&request(CadenceStyle::Half, seed)).unwrap();
            assert_eq!(half.chords[7].degree, 5);

            let soft = generate(&request(CadenceStyle::Soft, seed)).unwrap();
            assert!([1, 3, 6].contains(&soft.chords[7].degree));
        }
    }

    #[test]
    fn test_single_bar_ignores_cadence() {
        // Only the normal transition runs, so any degree is possible, and the
        // stream advances exactly as with no cadence at all.
        for seed in 0..20 {
            let strong = HarmonyRequest { bars: 1, ..request(CadenceStyle::Strong, seed) };
            let none = HarmonyRequest { bars: 1, ..request(CadenceStyle::None, seed) };
            assert_eq!(generate(&strong).unwrap().chords, generate(&none).unwrap().chords);
        }
    }

    #[test]
    fn test_leading_tone_is_damped() {
        let req = HarmonyRequest { bars: 4000, ..request(CadenceStyle::None, 3) };
        let prog = generate(&req).unwrap();
        let sevens = prog.chords.iter().filter(|c| c.degree == 7).count();
        let fives = prog.chords.iter().filter(|c| c.degree == 5).count();
        assert!(sevens > 0);
        // Half of the vii picks turn into V, so V must clearly dominate.
        assert!(fives > sevens * 2, "V={fives} vii={sevens}");
    }

    #[test]
    fn test_seventh_heuristics() {
        let table = DiatonicTable::build(PitchClass::new(0), Scale::Major);
        let v7 = materialize(&table, 5, 0, true);
        assert_eq!(v7.quality, ChordQuality::Dominant7);
        assert_eq!(values(&v7.notes), [7, 11, 2, 5]);
        assert_eq!(v7.symbol, "G7");

        let imaj7 = materialize(&table, 1, 0, true);
        assert_eq!(imaj7.quality, ChordQuality::Major7);
        assert_eq!(values(&imaj7.notes), [0, 4, 7, 11]);

        let ii7 = materialize(&table, 2, 0, true);
        assert_eq!(ii7.symbol, "Dm7");
        assert_eq!(values(&ii7.notes), [2, 5, 9, 0]);

        let vii = materialize(&table, 7, 0, true);
        assert_eq!(vii.symbol, "Bm7b5");
        assert_eq!(values(&vii.notes), [11, 2, 5, 9]);

        let triad = materialize(&table, 6, 2, false);
        assert_eq!(triad.symbol, "Am");
        assert_eq!(triad.bar_index, 2);
    }

    #[test]
    fn test_minor_key_sevenths_follow_triad_quality() {
        let table = DiatonicTable::build(PitchClass::new(0), Scale::Minor);

        // VII in natural minor is a major triad that is not degree 5, so it
        // takes a major seventh even though A is outside C minor.
        let vii7 = materialize(&table, 7, 0, true);
        assert_eq!(vii7.quality, ChordQuality::Major7);
        assert_eq!(values(&vii7.notes), [10, 2, 5, 9]);
        assert_eq!(vii7.symbol, "A#maj7");

        // v is minor in natural minor, so no dominant seventh.
        let v7 = materialize(&table, 5, 0, true);
        assert_eq!(v7.symbol, "Gm7");
        assert_eq!(values(&v7.notes), [7, 10, 2, 5]);

        let ii7 = materialize(&table, 2, 0, true);
        assert_eq!(ii7.symbol, "Dm7b5");
    }

    #[test]
    fn test_complexity_policies() {
        let gated = HarmonyRequest { complexity: Complexity::Sevenths, ..request(CadenceStyle::Soft, 4) };
        assert!(generate(&gated).unwrap().chords.iter().all(|c| c.notes.len() == 3));

        let all = HarmonyRequest { sevenths_enabled: true, ..gated };
        assert!(generate(&all).unwrap().chords.iter().all(|c| c.notes.len() == 4));

        let mixed = HarmonyRequest {
            bars: 400,
            complexity: Complexity::Mixed,
            sevenths_enabled: true,
            ..request(CadenceStyle::Soft, 4)
        };
        let prog = generate(&mixed).unwrap();
        let sevenths = prog.chords.iter().filter(|c| c.quality.is_seventh()).count();
        assert!((80..200).contains(&sevenths), "got {sevenths} sevenths out of 400");
    }
}
