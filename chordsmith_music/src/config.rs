// Generator configuration.
//
// Every tunable option of a generation run lives in `GeneratorConfig`, which
// can be loaded from a JSON document, stored inside presets, and overridden
// field by field from the command line. `validate` runs before any work is
// done and is the only place that rejects bad values; the core modules take
// the already-checked projections `HarmonyRequest` and `ScheduleSettings`.
//
// The option enums below serialize and parse under their lowercase names
// (`"plagal"`, `"smooth"`, ...), matching the CLI spelling.

use crate::diatonic::Scale;
use crate::error::{ChordError, Result};
use crate::harmony::HarmonyRequest;
use crate::pitch::PitchClass;
use crate::schedule::{MAX_TICK, ScheduleSettings, VelocityPolicy};
use crate::voicing::VoicingSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Declares a fieldless option enum with lowercase serde names, `FromStr`
/// and `Display`.
macro_rules! option_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ChordError;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = s.trim().to_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == wanted)
                    .ok_or_else(|| {
                        let names: Vec<&str> = $name::ALL.iter().map(|v| v.name()).collect();
                        ChordError::invalid(format!(
                            "{} must be {}, got '{}'",
                            $label,
                            names.join("|"),
                            s
                        ))
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

option_enum!(
    /// How the final bars are shaped.
    CadenceStyle, "cadence" {
        /// No override; the last bars follow the normal transitions.
        None => "none",
        /// Last bar weighted toward I, with vi and iii as softer endings.
        Soft => "soft",
        /// Authentic: V then I.
        Strong => "strong",
        /// IV then I.
        Plagal => "plagal",
        /// Ends on V.
        Half => "half",
    }
);

option_enum!(
    /// Triad/seventh policy, gated by `sevenths_enabled`.
    Complexity, "complexity" {
        Triads => "triads",
        Sevenths => "sevenths",
        Mixed => "mixed",
    }
);

option_enum!(
    VoicingSpread, "voicing spread" {
        Close => "close",
        /// Every second note raised an octave.
        Open => "open",
    }
);

option_enum!(
    InversionMode, "inversion mode" {
        Root => "root",
        Random => "random",
        /// Least total movement from the previous chord.
        Smooth => "smooth",
    }
);

option_enum!(
    PlaybackMode, "playback mode" {
        Simultaneous => "simultaneous",
        Arpeggio => "arpeggio",
    }
);

option_enum!(
    VelocityMode, "velocity mode" {
        Fixed => "fixed",
        Range => "range",
        Humanize => "humanize",
    }
);

/// Largest value a metrical SMF header can carry.
pub const MAX_TICKS_PER_BEAT: u16 = 0x7fff;

/// All options for one generation (and optional export) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: Option<u64>,
    /// Key name as given; any accepted spelling (`Eb`, `D#`, ...).
    pub key: String,
    pub scale: Scale,
    pub bars: usize,
    /// Only `4/4` is supported.
    pub time_signature: String,
    pub tempo_bpm: u32,

    pub complexity: Complexity,
    pub sevenths_enabled: bool,
    pub cadence: CadenceStyle,

    pub voicing_spread: VoicingSpread,
    pub inversion_mode: InversionMode,

    pub ticks_per_beat: u16,
    /// 1-based MIDI channel, 1..=16.
    pub channel: u8,
    pub note_length_beats: f64,
    pub playback: PlaybackMode,
    pub arpeggio_spread_beats: f64,

    pub velocity_mode: VelocityMode,
    pub velocity_fixed: u8,
    pub velocity_min: u8,
    pub velocity_max: u8,
    /// Scales the ±15 humanize jitter, 0.0..=1.0.
    pub humanize_amount: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            seed: None,
            key: "C".to_string(),
            scale: Scale::Minor,
            bars: 8,
            time_signature: "4/4".to_string(),
            tempo_bpm: 120,
            complexity: Complexity::Triads,
            sevenths_enabled: false,
            cadence: CadenceStyle::Soft,
            voicing_spread: VoicingSpread::Close,
            inversion_mode: InversionMode::Root,
            ticks_per_beat: 480,
            channel: 1,
            note_length_beats: 4.0,
            playback: PlaybackMode::Simultaneous,
            arpeggio_spread_beats: 0.25,
            velocity_mode: VelocityMode::Fixed,
            velocity_fixed: 90,
            velocity_min: 70,
            velocity_max: 100,
            humanize_amount: 0.15,
        }
    }
}

impl GeneratorConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: GeneratorConfig = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Reject every out-of-range or unsupported value.
    pub fn validate(&self) -> Result<()> {
        self.key.parse::<PitchClass>()?;
        if self.bars < 1 {
            return Err(ChordError::invalid("bars must be >= 1"));
        }
        if self.time_signature.trim() != "4/4" {
            return Err(ChordError::invalid(format!(
                "only 4/4 is supported, got '{}'",
                self.time_signature
            )));
        }
        if self.tempo_bpm < 1 || self.tempo_bpm > 60_000_000 {
            return Err(ChordError::invalid("tempo must be 1..=60000000 BPM"));
        }
        if self.ticks_per_beat < 1 || self.ticks_per_beat > MAX_TICKS_PER_BEAT {
            return Err(ChordError::invalid(format!(
                "ticks per beat must be 1..={MAX_TICKS_PER_BEAT}"
            )));
        }
        if !(1..=16).contains(&self.channel) {
            return Err(ChordError::invalid("channel must be 1..=16"));
        }
        check_beats("note length", self.note_length_beats)?;
        check_beats("arpeggio spread", self.arpeggio_spread_beats)?;
        if !(1..=127).contains(&self.velocity_fixed) {
            return Err(ChordError::invalid("fixed velocity must be 1..=127"));
        }
        if !(1..=127).contains(&self.velocity_min) || !(1..=127).contains(&self.velocity_max) {
            return Err(ChordError::invalid("velocity min/max must be 1..=127"));
        }
        if self.velocity_min > self.velocity_max {
            return Err(ChordError::invalid(format!(
                "velocity min ({}) must be <= velocity max ({})",
                self.velocity_min, self.velocity_max
            )));
        }
        if !(0.0..=1.0).contains(&self.humanize_amount) {
            return Err(ChordError::invalid("humanize amount must be 0..=1"));
        }
        let last_tick = self.unchecked_schedule_settings().final_tick(self.bars);
        if last_tick > MAX_TICK as u64 {
            return Err(ChordError::invalid(format!(
                "progression would end at tick {last_tick}, past the MIDI limit of {MAX_TICK}; \
                 use fewer bars, shorter notes or a narrower arpeggio"
            )));
        }
        Ok(())
    }

    /// Harmony engine inputs. Validates first.
    pub fn harmony_request(&self) -> Result<HarmonyRequest> {
        self.validate()?;
        Ok(HarmonyRequest {
            key: self.key.parse()?,
            scale: self.scale,
            bars: self.bars,
            cadence: self.cadence,
            complexity: self.complexity,
            sevenths_enabled: self.sevenths_enabled,
            seed: self.seed,
        })
    }

    /// Voicing and scheduling inputs. Validates first.
    pub fn schedule_settings(&self) -> Result<ScheduleSettings> {
        self.validate()?;
        Ok(self.unchecked_schedule_settings())
    }

    fn unchecked_schedule_settings(&self) -> ScheduleSettings {
        let velocity = match self.velocity_mode {
            VelocityMode::Fixed => VelocityPolicy::Fixed(self.velocity_fixed),
            VelocityMode::Range => VelocityPolicy::Range {
                min: self.velocity_min,
                max: self.velocity_max,
            },
            VelocityMode::Humanize => VelocityPolicy::Humanize {
                min: self.velocity_min,
                max: self.velocity_max,
                amount: self.humanize_amount,
            },
        };
        ScheduleSettings {
            voicing: VoicingSettings {
                spread: self.voicing_spread,
                inversion: self.inversion_mode,
            },
            playback: self.playback,
            velocity,
            note_length_beats: self.note_length_beats,
            arpeggio_spread_beats: self.arpeggio_spread_beats,
            ticks_per_beat: self.ticks_per_beat,
            channel: self.channel.saturating_sub(1),
        }
    }
}

fn check_beats(what: &str, beats: f64) -> Result<()> {
    if !beats.is_finite() || beats < 0.0 {
        return Err(ChordError::invalid(format!(
            "{what} must be a non-negative number of beats, got {beats}"
        )));
    }
    Ok(())
}
