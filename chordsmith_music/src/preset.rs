// Preset persistence: named JSON snapshots of a config plus the progression
// it produced.
//
// Presets live as `<dir>/<slug>.json`. The stored config lets a loaded
// progression be exported again with the settings it was made with; the
// stored seed lets it be regenerated.

use crate::chord::Progression;
use crate::config::GeneratorConfig;
use crate::error::{ChordError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bumped when the preset document layout changes.
pub const PRESET_VERSION: &str = "0.2.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub preset_version: String,
    /// Seconds since the Unix epoch at save time.
    pub saved_unix: u64,
    pub app_version: String,
    pub config: GeneratorConfig,
    pub progression: Progression,
}

/// Reads and writes presets in one directory.
#[derive(Debug, Clone)]
pub struct PresetManager {
    dir: PathBuf,
}

impl PresetManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PresetManager { dir: dir.into() }
    }

    /// Path a preset name maps to.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slug(name)))
    }

    pub fn save(&self, name: &str, config: &GeneratorConfig, progression: &Progression) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let saved_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let preset = Preset {
            preset_version: PRESET_VERSION.to_string(),
            saved_unix,
            app_version: APP_VERSION.to_string(),
            config: config.clone(),
            progression: progression.clone(),
        };
        let path = self.path_for(name);
        std::fs::write(&path, serde_json::to_string_pretty(&preset)?)?;
        info!(path = %path.display(), "saved preset");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Preset> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(ChordError::PresetNotFound(path));
        }
        let data = std::fs::read_to_string(&path)?;
        let preset: Preset = serde_json::from_str(&data)?;
        preset.config.validate()?;
        preset.progression.validate()?;
        if preset.progression.bars != preset.config.bars {
            return Err(ChordError::invalid(format!(
                "preset config has {} bars but its progression has {}",
                preset.config.bars, preset.progression.bars
            )));
        }
        if preset.app_version != APP_VERSION {
            warn!(
                stored = %preset.app_version,
                current = APP_VERSION,
                "preset was saved by a different version"
            );
        }
        Ok(preset)
    }

    /// Sorted names of all presets. A missing directory has none.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// File-safe form of a preset name: lowercase alphanumerics, `-` and `_`,
/// whitespace turned into `-`, never empty.
pub fn slug(name: &str) -> String {
    let kept: String = name
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|ch| {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                Some(ch)
            } else if ch.is_whitespace() {
                Some('-')
            } else {
                None
            }
        })
        .collect();
    let trimmed = kept.trim_matches('-');
    if trimmed.is_empty() {
        "preset".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmony::generate;

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("chordsmith-{tag}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("  My Song!  "), "my-song");
        assert_eq!(slug("lofi_v2-final"), "lofi_v2-final");
        assert_eq!(slug("???"), "preset");
        assert_eq!(slug(" - "), "preset");
    }

    #[test]
    fn test_save_load_list() {
        let dir = scratch_dir("presets");
        let manager = PresetManager::new(&dir);
        assert!(manager.list().unwrap().is_empty());

        let config = GeneratorConfig { seed: Some(42), ..Default::default() };
        let progression = generate(&config.harmony_request().unwrap()).unwrap();
        let path = manager.save("Night Drive", &config, &progression).unwrap();
        assert_eq!(path, dir.join("night-drive.json"));
        manager.save("b-side", &config, &progression).unwrap();

        assert_eq!(manager.list().unwrap(), ["b-side", "night-drive"]);
        let loaded = manager.load("night drive").unwrap();
        assert_eq!(loaded.progression, progression);
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.preset_version, PRESET_VERSION);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_hand_edited_presets_are_rejected() {
        let dir = scratch_dir("edited");
        let manager = PresetManager::new(&dir);
        let config = GeneratorConfig { seed: Some(8), bars: 4, ..Default::default() };
        let progression = generate(&config.harmony_request().unwrap()).unwrap();
        let path = manager.save("edited", &config, &progression).unwrap();
        let stored: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        let edits: [fn(&mut serde_json::Value); 4] = [
            |v| v["progression"]["chords"][2]["bar_index"] = 4_000_000_000u64.into(),
            |v| v["progression"]["chords"][0]["degree"] = 0.into(),
            |v| v["progression"]["bars"] = 5.into(),
            |v| v["config"]["bars"] = 6.into(),
        ];
        for edit in edits {
            let mut doc = stored.clone();
            edit(&mut doc);
            std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
            assert!(
                matches!(manager.load("edited"), Err(ChordError::InvalidConfiguration(_))),
                "accepted {doc}"
            );
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_preset() {
        let manager = PresetManager::new(scratch_dir("missing"));
        assert!(matches!(manager.load("nope"), Err(ChordError::PresetNotFound(_))));
    }
}
