// Chordsmith CLI entry point.
//
// Generates one progression per invocation, prints it as text or JSON, and
// optionally saves it as a preset and exports it to MIDI. A loaded preset
// can be printed and re-exported with its stored settings.
//
// Usage:
//   chordsmith [--key C] [--scale minor] [--bars 8] [--seed N]
//     [--cadence soft] [--sevenths --complexity mixed] [--voicing open]
//     [--inversion smooth] [--export-midi --midi-out out.mid] [--json]
//     [--preset-save NAME | --preset-load NAME | --preset-list] [--selftest]
//
// Logging goes to stderr and is controlled with RUST_LOG.

use chordsmith_music::chord::Progression;
use chordsmith_music::config::{
    CadenceStyle, Complexity, GeneratorConfig, InversionMode, PlaybackMode, VelocityMode,
    VoicingSpread,
};
use chordsmith_music::diatonic::Scale;
use chordsmith_music::harmony::generate;
use chordsmith_music::midi::{ExportOptions, export};
use chordsmith_music::preset::{APP_VERSION, Preset, PresetManager};
use chordsmith_music::schedule::{event_dump, schedule_progression};
use chordsmith_music::selftest::run_selftest;
use chordsmith_music::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chordsmith", about = "Seeded diatonic chord progression generator")]
#[command(version)]
struct Cli {
    /// JSON config file; options given on the command line override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Key (e.g. C, C#, Eb, F#)
    #[arg(long)]
    key: Option<String>,
    /// major | minor
    #[arg(long)]
    scale: Option<Scale>,
    /// Number of bars
    #[arg(long)]
    bars: Option<usize>,
    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
    /// Tempo in BPM
    #[arg(long)]
    tempo: Option<u32>,

    /// triads | sevenths | mixed
    #[arg(long)]
    complexity: Option<Complexity>,
    /// Enable diatonic seventh chords
    #[arg(long)]
    sevenths: bool,
    /// none | soft | strong | plagal | half
    #[arg(long)]
    cadence: Option<CadenceStyle>,

    /// close | open
    #[arg(long)]
    voicing: Option<VoicingSpread>,
    /// root | random | smooth
    #[arg(long)]
    inversion: Option<InversionMode>,

    /// MIDI ticks per beat
    #[arg(long)]
    ppq: Option<u16>,
    /// MIDI channel (1-16)
    #[arg(long)]
    channel: Option<u8>,
    /// Note length in beats
    #[arg(long)]
    note_length: Option<f64>,
    /// simultaneous | arpeggio
    #[arg(long)]
    playback: Option<PlaybackMode>,
    /// Arpeggio spread in beats
    #[arg(long)]
    arp_spread: Option<f64>,

    /// fixed | range | humanize
    #[arg(long)]
    velocity: Option<VelocityMode>,
    /// Fixed velocity (1-127)
    #[arg(long)]
    vel_fixed: Option<u8>,
    /// Minimum velocity
    #[arg(long)]
    vel_min: Option<u8>,
    /// Maximum velocity
    #[arg(long)]
    vel_max: Option<u8>,
    /// Humanize amount (0-1)
    #[arg(long)]
    humanize: Option<f64>,

    /// Print the progression as JSON
    #[arg(long)]
    json: bool,
    /// Export a MIDI file
    #[arg(long)]
    export_midi: bool,
    /// MIDI output path
    #[arg(long, default_value = "./output.mid")]
    midi_out: PathBuf,
    /// Write the scheduled event list as JSON (diagnostic)
    #[arg(long)]
    dump_midi_events: Option<PathBuf>,

    /// Preset directory
    #[arg(long, default_value = "./presets")]
    preset_dir: PathBuf,
    /// Save the generated progression under this name
    #[arg(long)]
    preset_save: Option<String>,
    /// Load a preset by name instead of generating
    #[arg(long)]
    preset_load: Option<String>,
    /// List saved presets
    #[arg(long)]
    preset_list: bool,

    /// Run the determinism self-check
    #[arg(long)]
    selftest: bool,
}

impl Cli {
    /// Base config (file or defaults) with command-line overrides applied.
    fn generator_config(&self) -> Result<GeneratorConfig> {
        let mut c = match &self.config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };
        if let Some(v) = &self.key {
            c.key = v.clone();
        }
        override_with(&mut c.scale, self.scale);
        override_with(&mut c.bars, self.bars);
        if self.seed.is_some() {
            c.seed = self.seed;
        }
        override_with(&mut c.tempo_bpm, self.tempo);
        override_with(&mut c.complexity, self.complexity);
        if self.sevenths {
            c.sevenths_enabled = true;
        }
        override_with(&mut c.cadence, self.cadence);
        override_with(&mut c.voicing_spread, self.voicing);
        override_with(&mut c.inversion_mode, self.inversion);
        override_with(&mut c.ticks_per_beat, self.ppq);
        override_with(&mut c.channel, self.channel);
        override_with(&mut c.note_length_beats, self.note_length);
        override_with(&mut c.playback, self.playback);
        override_with(&mut c.arpeggio_spread_beats, self.arp_spread);
        override_with(&mut c.velocity_mode, self.velocity);
        override_with(&mut c.velocity_fixed, self.vel_fixed);
        override_with(&mut c.velocity_min, self.vel_min);
        override_with(&mut c.velocity_max, self.vel_max);
        override_with(&mut c.humanize_amount, self.humanize);
        Ok(c)
    }
}

/// Used when RUST_LOG is unset. Every event comes from the library crate.
const DEFAULT_LOG_FILTER: &str = "warn,chordsmith_music=info";

fn override_with<T>(field: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *field = v;
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e}");
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<i32> {
    let config = cli.generator_config()?;
    config.validate()?;

    if cli.selftest {
        let report = run_selftest()?;
        for message in &report.messages {
            if message.starts_with("PASS") {
                println!("{message}");
            } else {
                eprintln!("{message}");
            }
        }
        return Ok(if report.passed { 0 } else { 2 });
    }

    let presets = PresetManager::new(&cli.preset_dir);

    if cli.preset_list {
        for name in presets.list()? {
            println!("{name}");
        }
        return Ok(0);
    }

    if let Some(name) = &cli.preset_load {
        let preset = presets.load(name)?;
        print_loaded_preset(&preset);
        if cli.export_midi {
            write_outputs(cli, &preset.config, &preset.progression)?;
        }
        return Ok(0);
    }

    let progression = generate(&config.harmony_request()?)?;
    print_progression(cli, &config, &progression)?;

    if let Some(name) = &cli.preset_save {
        let path = presets.save(name, &config, &progression)?;
        println!("Preset saved: {}", path.display());
    }

    if cli.export_midi {
        write_outputs(cli, &config, &progression)?;
    } else if let Some(dump_path) = &cli.dump_midi_events {
        let events = schedule_progression(&progression, &config.schedule_settings()?);
        std::fs::write(dump_path, serde_json::to_string_pretty(&event_dump(&events))?)?;
    }
    Ok(0)
}

/// Export MIDI (and the event dump when requested) to this invocation's paths.
fn write_outputs(cli: &Cli, config: &GeneratorConfig, progression: &Progression) -> Result<()> {
    let options = ExportOptions {
        settings: config.schedule_settings()?,
        tempo_bpm: config.tempo_bpm,
        dump_path: cli.dump_midi_events.as_deref(),
    };
    export(progression, &cli.midi_out, &options)?;
    println!("MIDI saved: {}", cli.midi_out.display());
    Ok(())
}

fn banner() -> String {
    format!("chordsmith v{APP_VERSION}")
}

fn print_progression(cli: &Cli, config: &GeneratorConfig, progression: &Progression) -> Result<()> {
    if cli.json {
        let payload = serde_json::json!({
            "meta": { "banner": banner(), "app_version": APP_VERSION },
            "config": config,
            "progression": progression,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{}", banner());
    println!(
        "Key: {} | Scale: {} | Bars: {} | Seed: {}",
        progression.key, progression.scale, progression.bars, progression.seed
    );
    println!(
        "Cadence: {} | Sevenths: {} | Voicing: {} | Inversion: {}",
        config.cadence, config.sevenths_enabled, config.voicing_spread, config.inversion_mode
    );
    println!("{}", progression.summary());
    Ok(())
}

fn print_loaded_preset(preset: &Preset) {
    let p = &preset.progression;
    println!("{}", banner());
    println!(
        "Loaded preset: key={} scale={} bars={} seed={}",
        p.key, p.scale, p.bars, p.seed
    );
    println!("{}", p.summary());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter_targets_the_library() {
        EnvFilter::try_new(DEFAULT_LOG_FILTER).unwrap();
        let library = std::any::type_name::<GeneratorConfig>();
        let crate_name = library.split("::").next().unwrap();
        assert!(DEFAULT_LOG_FILTER.contains(&format!("{crate_name}=info")));
    }
}
