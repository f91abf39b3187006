// Determinism self-check, runnable from the CLI with `--selftest`.
//
// Generates the same seeded progression twice and compares the serialized
// progressions, the event dumps, and the encoded MIDI bytes. A mismatch is a
// programming bug, not a runtime condition; this exists so a build can be
// checked on the machine it runs on.

use crate::config::{CadenceStyle, Complexity, GeneratorConfig, InversionMode, VoicingSpread};
use crate::diatonic::Scale;
use crate::error::Result;
use crate::harmony::generate;
use crate::midi::encode;
use crate::schedule::{event_dump, schedule_progression};

/// Outcome of a self-check: overall pass flag plus one line per check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestReport {
    pub passed: bool,
    pub messages: Vec<String>,
}

impl SelfTestReport {
    fn pass(&mut self, what: &str) {
        self.messages.push(format!("PASS: {what}"));
    }

    fn fail(&mut self, what: &str) {
        self.passed = false;
        self.messages.push(format!("FAIL: {what}"));
    }
}

/// The configuration every self-check runs with.
pub fn selftest_config() -> GeneratorConfig {
    GeneratorConfig {
        seed: Some(123),
        key: "C".to_string(),
        scale: Scale::Minor,
        bars: 8,
        cadence: CadenceStyle::Plagal,
        sevenths_enabled: true,
        complexity: Complexity::Mixed,
        voicing_spread: VoicingSpread::Open,
        inversion_mode: InversionMode::Smooth,
        ..Default::default()
    }
}

/// Run all checks. Stops at the first failure.
pub fn run_selftest() -> Result<SelfTestReport> {
    let config = selftest_config();
    let request = config.harmony_request()?;
    let settings = config.schedule_settings()?;
    let mut report = SelfTestReport {
        passed: true,
        messages: Vec::new(),
    };

    let first = generate(&request)?;
    let second = generate(&request)?;
    if serde_json::to_string(&first)? != serde_json::to_string(&second)? {
        report.fail("progression determinism (same seed) mismatch");
        return Ok(report);
    }
    report.pass("progression determinism (same seed)");

    let events_a = schedule_progression(&first, &settings);
    let events_b = schedule_progression(&second, &settings);
    if event_dump(&events_a) != event_dump(&events_b) {
        report.fail("MIDI event determinism mismatch");
        return Ok(report);
    }
    report.pass("MIDI event determinism (same seed)");

    match (
        encode(&events_a, settings.ticks_per_beat, config.tempo_bpm),
        encode(&events_b, settings.ticks_per_beat, config.tempo_bpm),
    ) {
        (Ok(a), Ok(b)) if a == b => report.pass("MIDI file bytes identical"),
        (Ok(_), Ok(_)) => report.fail("MIDI file bytes differ"),
        (Err(e), _) | (_, Err(e)) => report.fail(&format!("MIDI byte check could not run: {e}")),
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selftest_config_is_valid() {
        selftest_config().validate().unwrap();
    }

    #[cfg(feature = "midi")]
    #[test]
    fn test_selftest_passes() {
        let report = run_selftest().unwrap();
        assert!(report.passed, "{:?}", report.messages);
        assert_eq!(report.messages.len(), 3);
    }
}
