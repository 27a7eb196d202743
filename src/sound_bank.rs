use crate::error::{DrumError, DrumResult};
use crate::kit::DrumKit;
use hound::{SampleFormat, WavReader};
use log::{info, warn};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A pre-decoded drum sample. Cheap to clone; the audio data is shared.
#[derive(Debug, Clone)]
pub struct DrumSound {
    pub name: String,
    /// Mono f32 samples, normalized -1.0 to 1.0
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
}

impl DrumSound {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Silent sample of the given length, for runs without sound files.
    pub fn silent(name: impl Into<String>, duration: Duration, sample_rate: u32) -> Self {
        let n = (duration.as_secs_f64() * sample_rate as f64) as usize;
        Self {
            name: name.into(),
            samples: vec![0.0; n].into(),
            sample_rate,
        }
    }
}

/// All kit sounds, indexed in kit order (same order as zones).
#[derive(Debug, Clone)]
pub struct SoundBank {
    sounds: Vec<DrumSound>,
}

impl SoundBank {
    /// Decode every sound in the kit. Any missing or undecodable file fails
    /// the whole load.
    pub fn load(kit: &DrumKit) -> DrumResult<Self> {
        let mut sounds = Vec::with_capacity(kit.drums.len());
        for drum in &kit.drums {
            let path = kit.sound_path(drum);
            let sound = decode_wav_file(&drum.name, &path)?;
            info!(
                "Sound '{}': {:?}  {} Hz  {:.2}s",
                drum.name,
                path.file_name().unwrap_or_default(),
                sound.sample_rate,
                sound.duration().as_secs_f64()
            );
            sounds.push(sound);
        }
        Ok(Self { sounds })
    }

    /// Silent placeholders of equal length, one per kit drum.
    pub fn silent(kit: &DrumKit, duration: Duration) -> Self {
        Self {
            sounds: kit
                .drums
                .iter()
                .map(|d| DrumSound::silent(d.name.clone(), duration, 48000))
                .collect(),
        }
    }

    pub fn from_sounds(sounds: Vec<DrumSound>) -> Self {
        Self { sounds }
    }

    pub fn get(&self, index: usize) -> Option<&DrumSound> {
        self.sounds.get(index)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

fn decode_wav_file(name: &str, path: &Path) -> DrumResult<DrumSound> {
    let reader = WavReader::open(path).map_err(|source| DrumError::Sound {
        path: path.to_path_buf(),
        source,
    })?;
    decode_wav(name, reader).map_err(|source| DrumError::Sound {
        path: path.to_path_buf(),
        source,
    })
}

/// Read all samples as f32 and mix down to mono.
pub fn decode_wav<R: Read>(name: &str, reader: WavReader<R>) -> Result<DrumSound, hound::Error> {
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples_f32: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max))
                .collect::<Result<_, _>>()?
        }
    };

    let mono: Vec<f32> = if channels == 1 {
        samples_f32
    } else {
        samples_f32
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    if mono.is_empty() {
        warn!("Sound '{}' has no samples", name);
    }

    Ok(DrumSound {
        name: name.to_string(),
        samples: mono.into(),
        sample_rate: spec.sample_rate,
    })
}
