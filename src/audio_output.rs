use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{error, info};
use std::sync::{Arc, Mutex};

use crate::error::{DrumError, DrumResult};
use crate::sound_bank::DrumSound;
use crate::voice::Voice;

/// Playback state of one voice as seen by the mixer.
#[derive(Default)]
struct Slot {
    samples: Option<Arc<[f32]>>,
    /// Read position in source samples
    pos: f64,
    /// Source samples per output frame
    step: f64,
}

type Slots = Arc<Mutex<Vec<Slot>>>;

/// Live audio playback via cpal: one mixer slot per voice.
///
/// Holds the cpal `Stream` alive. Drop this to stop playback. Sounds are
/// resampled to the device rate on the fly and copied to every channel.
pub struct CpalOutput {
    stream: Option<Stream>,
    slots: Slots,
    sample_rate: u32,
}

impl CpalOutput {
    /// Open the default output device with `voices` mixer slots.
    pub fn start(voices: usize) -> DrumResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| DrumError::Audio("No default audio output device found".into()))?;

        info!(
            "Audio output: {}",
            device.name().unwrap_or_else(|_| "unknown".into())
        );

        let supported = device
            .default_output_config()
            .map_err(|e| DrumError::Audio(format!("No supported output config: {e}")))?;
        let sample_rate = supported.sample_rate().0;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let channels = config.channels as usize;

        info!(
            "Playback config: {}Hz  {} ch  {:?}  {} voices",
            sample_rate, channels, format, voices
        );

        let slots: Slots = Arc::new(Mutex::new((0..voices).map(|_| Slot::default()).collect()));

        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, slots.clone())?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, slots.clone())?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, slots.clone())?,
            fmt => {
                return Err(DrumError::Audio(format!(
                    "Unsupported sample format {fmt:?}. Use an F32, I16 or U16 device."
                )))
            }
        };

        stream
            .play()
            .map_err(|e| DrumError::Audio(e.to_string()))?;

        Ok(Self {
            stream: Some(stream),
            slots,
            sample_rate,
        })
    }

    /// Voice handles for the dispatcher, one per mixer slot.
    pub fn voices(&self) -> Vec<Box<dyn Voice>> {
        let count = self.slots.lock().map(|s| s.len()).unwrap_or(0);
        (0..count)
            .map(|index| {
                Box::new(CpalVoice {
                    slots: self.slots.clone(),
                    index,
                    out_rate: self.sample_rate,
                }) as Box<dyn Voice>
            })
            .collect()
    }

    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            info!("Audio output stopped");
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handle to one mixer slot.
struct CpalVoice {
    slots: Slots,
    index: usize,
    out_rate: u32,
}

impl Voice for CpalVoice {
    fn is_busy(&self) -> bool {
        self.slots
            .lock()
            .map(|s| s.get(self.index).is_some_and(|slot| slot.samples.is_some()))
            .unwrap_or(true)
    }

    fn play(&mut self, sound: &DrumSound) {
        if let Ok(mut slots) = self.slots.lock() {
            if let Some(slot) = slots.get_mut(self.index) {
                slot.samples = Some(sound.samples.clone());
                slot.pos = 0.0;
                slot.step = sound.sample_rate as f64 / self.out_rate.max(1) as f64;
            }
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    slots: Slots,
) -> DrumResult<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let err_fn = |e: cpal::StreamError| error!("Audio stream error: {e}");

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let Ok(mut slots) = slots.lock() else {
                    data.fill(T::from_sample(0.0f32));
                    return;
                };
                for frame in data.chunks_mut(channels) {
                    let s = mix_next(&mut slots);
                    for out in frame.iter_mut() {
                        *out = T::from_sample(s);
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| DrumError::Audio(e.to_string()))
}

/// Sum one output frame across all playing slots, advancing each.
/// Slots that run past their end become free.
fn mix_next(slots: &mut [Slot]) -> f32 {
    let mut acc = 0.0f32;
    for slot in slots.iter_mut() {
        let Some(samples) = &slot.samples else {
            continue;
        };
        let i = slot.pos as usize;
        if i >= samples.len() {
            slot.samples = None;
            continue;
        }
        // Linear interpolation between neighbouring source samples
        let frac = (slot.pos - i as f64) as f32;
        let a = samples[i];
        let b = samples.get(i + 1).copied().unwrap_or(a);
        acc += a + (b - a) * frac;
        slot.pos += slot.step;
    }
    acc.clamp(-1.0, 1.0)
}
