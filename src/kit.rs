//! Drum kit definition: the fixed, ordered drum names and their sound files.
//!
//! The kit is supplied once at startup (built-in default or a JSON file) and
//! never changes during a run. Zone names and loaded sounds both come from it,
//! which keeps them in 1:1 correspondence.

use crate::error::{DrumError, DrumResult};
use crate::types::DEFAULT_VOICE_COUNT;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrumDef {
    pub name: String,
    /// WAV file. Relative paths are resolved against the kit's base dir.
    pub sound: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrumKit {
    pub drums: Vec<DrumDef>,
    #[serde(default = "default_voices")]
    pub voices: usize,
    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_voices() -> usize {
    DEFAULT_VOICE_COUNT
}

impl DrumKit {
    pub fn new(drums: Vec<DrumDef>, voices: usize) -> DrumResult<Self> {
        let kit = Self {
            drums,
            voices,
            base_dir: PathBuf::new(),
        };
        kit.validate()?;
        Ok(kit)
    }

    /// Load from a JSON file. Sound paths are resolved relative to the file.
    pub fn load(path: &Path) -> DrumResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|source| DrumError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut kit: DrumKit =
            serde_json::from_str(&data).map_err(|source| DrumError::KitParse {
                path: path.to_path_buf(),
                source,
            })?;
        kit.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        kit.validate()?;
        info!("Loaded kit from {:?}: {} drums", path, kit.drums.len());
        Ok(kit)
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn with_voices(mut self, voices: usize) -> Self {
        self.voices = voices;
        self
    }

    /// Drum names in kit order.
    pub fn names(&self) -> Vec<String> {
        self.drums.iter().map(|d| d.name.clone()).collect()
    }

    pub fn sound_path(&self, drum: &DrumDef) -> PathBuf {
        if drum.sound.is_absolute() {
            drum.sound.clone()
        } else {
            self.base_dir.join(&drum.sound)
        }
    }

    fn validate(&self) -> DrumResult<()> {
        if self.drums.is_empty() {
            return Err(DrumError::InvalidKit("kit has no drums".into()));
        }
        let mut seen = HashSet::new();
        for d in &self.drums {
            if d.name.trim().is_empty() {
                return Err(DrumError::InvalidKit("empty drum name".into()));
            }
            if !seen.insert(d.name.as_str()) {
                return Err(DrumError::InvalidKit(format!("duplicate drum '{}'", d.name)));
            }
        }
        Ok(())
    }
}

impl Default for DrumKit {
    /// Seven-piece kit, sounds under `Audio/`.
    fn default() -> Self {
        let drums = [
            ("snare", "Snare.WAV"),
            ("floor_tom", "Floor.WAV"),
            ("high_tom", "High-tom.WAV"),
            ("low_tom", "Low-tom.WAV"),
            ("hi_hat", "Hi-hat.WAV"),
            ("ride_cymbal", "Ride.WAV"),
            ("crash_cymbal", "Crash.WAV"),
        ]
        .iter()
        .map(|(name, file)| DrumDef {
            name: name.to_string(),
            sound: Path::new("Audio").join(file),
        })
        .collect();

        Self {
            drums,
            voices: DEFAULT_VOICE_COUNT,
            base_dir: PathBuf::new(),
        }
    }
}
