//! Cue playback through `cpal`.
//!
//! [`CpalCueOutput::open`] builds an output stream on the default device and
//! splits it into two halves:
//!
//! * [`CueStreamHandle`] — RAII guard around the `cpal::Stream`.  Keep it on
//!   the thread that created it (the stream is not `Send` on every
//!   platform); dropping it stops the hardware stream.
//! * [`CpalCueOutput`] — the `Send` control side, handed to the
//!   [`CuePlayer`](super::CuePlayer).
//!
//! The two halves share one optional *voice*.  Starting a cue replaces the
//! voice, so the stream can never mix two cues.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::{CueClip, CueError, CueOutput};

// ---------------------------------------------------------------------------
// OutputError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening the output stream.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("no output device found on the default audio host")]
    NoDevice,

    #[error("failed to query default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported output sample format: {0:?}")]
    SampleFormat(cpal::SampleFormat),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

/// The single clip currently being rendered.
struct Voice {
    samples: Arc<[f32]>,
    pos: usize,
    gain: f32,
}

impl Voice {
    fn next_sample(&mut self) -> Option<f32> {
        let s = *self.samples.get(self.pos)?;
        self.pos += 1;
        Some(s * self.gain)
    }

    fn finished(&self) -> bool {
        self.pos >= self.samples.len()
    }
}

type SharedVoice = Arc<Mutex<Option<Voice>>>;

fn lock_voice(voice: &SharedVoice) -> MutexGuard<'_, Option<Voice>> {
    voice.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// CueStreamHandle
// ---------------------------------------------------------------------------

/// Keeps the cpal output stream alive.
pub struct CueStreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CpalCueOutput
// ---------------------------------------------------------------------------

/// [`CueOutput`] backed by a running cpal stream.
pub struct CpalCueOutput {
    voice: SharedVoice,
    /// Set by the stream error callback when the device disappears.
    device_lost: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,
    gain: f32,
}

impl CpalCueOutput {
    /// Open the default output device and start a (silent) stream.
    ///
    /// `volume` is clamped to `[0.0, 1.0]`.
    ///
    /// # Errors
    ///
    /// Any [`OutputError`]; callers fall back to [`SilentOutput`].
    pub fn open(volume: f32) -> Result<(CueStreamHandle, Self), OutputError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(OutputError::NoDevice)?;

        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let config: cpal::StreamConfig = supported.into();

        let voice: SharedVoice = Arc::new(Mutex::new(None));
        let device_lost = Arc::new(AtomicBool::new(false));
        let shared = (Arc::clone(&voice), Arc::clone(&device_lost));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, shared)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, shared)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, shared)?,
            other => return Err(OutputError::SampleFormat(other)),
        };
        stream.play()?;

        log::info!("cue output: {sample_rate} Hz, {channels} ch ({sample_format:?})");

        Ok((
            CueStreamHandle { _stream: stream },
            Self {
                voice,
                device_lost,
                sample_rate,
                channels,
                gain: volume.clamp(0.0, 1.0),
            },
        ))
    }

    /// Device sample rate; cues must be resampled to it before playback.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl CueOutput for CpalCueOutput {
    fn start(&mut self, clip: &CueClip) -> Result<(), CueError> {
        if self.device_lost.load(Ordering::Relaxed) {
            return Err(CueError::DeviceUnavailable);
        }
        if clip.sample_rate != self.sample_rate {
            return Err(CueError::Playback(format!(
                "{} cue is {} Hz but the device runs at {} Hz",
                clip.kind.as_str(),
                clip.sample_rate,
                self.sample_rate
            )));
        }
        *lock_voice(&self.voice) = Some(Voice {
            samples: Arc::clone(&clip.samples),
            pos: 0,
            gain: self.gain,
        });
        Ok(())
    }

    fn halt(&mut self) {
        lock_voice(&self.voice).take();
    }

    fn is_playing(&self) -> bool {
        lock_voice(&self.voice)
            .as_ref()
            .is_some_and(|v| !v.finished())
    }
}

/// Render the shared voice into every channel of each output frame.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    (voice, device_lost): (SharedVoice, Arc<AtomicBool>),
) -> Result<cpal::Stream, OutputError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut guard = lock_voice(&voice);
            for frame in data.chunks_mut(channels) {
                let value = guard.as_mut().and_then(Voice::next_sample).unwrap_or(0.0);
                for sample in frame.iter_mut() {
                    *sample = T::from_sample(value);
                }
            }
            if guard.as_ref().is_some_and(Voice::finished) {
                *guard = None;
            }
        },
        move |err: cpal::StreamError| {
            log::error!("cue output stream error: {err}");
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                device_lost.store(true, Ordering::Relaxed);
            }
        },
        None,
    )?;

    Ok(stream)
}

// ---------------------------------------------------------------------------
// SilentOutput
// ---------------------------------------------------------------------------

/// Stand-in when no output device could be opened.  Accepts every cue and
/// sounds none of them, so the rest of the app behaves normally.
#[derive(Debug, Default)]
pub struct SilentOutput;

impl CueOutput for SilentOutput {
    fn start(&mut self, clip: &CueClip) -> Result<(), CueError> {
        log::debug!("cue output unavailable, skipping {} cue", clip.kind.as_str());
        Ok(())
    }

    fn halt(&mut self) {}

    fn is_playing(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::CueKind;

    fn output_at(sample_rate: u32) -> CpalCueOutput {
        CpalCueOutput {
            voice: Arc::new(Mutex::new(None)),
            device_lost: Arc::new(AtomicBool::new(false)),
            sample_rate,
            channels: 2,
            gain: 0.5,
        }
    }

    #[test]
    fn voice_applies_gain_and_finishes() {
        let mut voice = Voice {
            samples: vec![0.4_f32, 0.8].into(),
            pos: 0,
            gain: 0.5,
        };
        assert_eq!(voice.next_sample(), Some(0.2));
        assert_eq!(voice.next_sample(), Some(0.4));
        assert!(voice.finished());
        assert_eq!(voice.next_sample(), None);
    }

    #[test]
    fn start_replaces_voice_from_zero() {
        let mut out = output_at(48_000);
        out.start(&CueClip::new(CueKind::Inhale, vec![0.1; 10], 48_000))
            .unwrap();
        lock_voice(&out.voice).as_mut().unwrap().pos = 7;

        out.start(&CueClip::new(CueKind::Exhale, vec![0.2; 10], 48_000))
            .unwrap();
        let guard = lock_voice(&out.voice);
        let voice = guard.as_ref().unwrap();
        assert_eq!(voice.pos, 0);
        assert!((voice.samples[0] - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn halt_clears_voice() {
        let mut out = output_at(44_100);
        out.start(&CueClip::new(CueKind::Inhale, vec![0.1; 10], 44_100))
            .unwrap();
        assert!(out.is_playing());
        out.halt();
        assert!(!out.is_playing());
    }

    #[test]
    fn rate_mismatch_is_a_playback_error() {
        let mut out = output_at(48_000);
        let err = out
            .start(&CueClip::new(CueKind::Inhale, vec![0.1; 10], 44_100))
            .unwrap_err();
        assert!(matches!(err, CueError::Playback(_)));
        assert!(!out.is_playing());
    }

    #[test]
    fn lost_device_refuses_new_cues() {
        let mut out = output_at(48_000);
        out.device_lost.store(true, Ordering::Relaxed);
        let err = out
            .start(&CueClip::new(CueKind::Exhale, vec![0.1; 10], 48_000))
            .unwrap_err();
        assert_eq!(err, CueError::DeviceUnavailable);
    }

    #[test]
    fn silent_output_never_plays() {
        let mut out = SilentOutput;
        assert!(out
            .start(&CueClip::new(CueKind::Exhale, vec![0.1; 4], 8_000))
            .is_ok());
        assert!(!out.is_playing());
    }
}
