//! File-backed cue loader using `symphonia`.
//!
//! Decoding and resampling are CPU-bound, so each load runs on
//! `tokio::task::spawn_blocking` and the async caller only awaits the result.

use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::resample::{downmix_to_mono, resample};
use super::{CueClip, CueError, CueKind, CueLoader};

// ---------------------------------------------------------------------------
// FileCueLoader
// ---------------------------------------------------------------------------

/// Loads the inhale/exhale cues from disk and converts them to mono at
/// `target_rate` Hz.
#[derive(Debug, Clone)]
pub struct FileCueLoader {
    inhale: PathBuf,
    exhale: PathBuf,
    target_rate: u32,
}

impl FileCueLoader {
    pub fn new(inhale: impl Into<PathBuf>, exhale: impl Into<PathBuf>, target_rate: u32) -> Self {
        Self {
            inhale: inhale.into(),
            exhale: exhale.into(),
            target_rate,
        }
    }

    pub fn path(&self, kind: CueKind) -> &Path {
        match kind {
            CueKind::Inhale => &self.inhale,
            CueKind::Exhale => &self.exhale,
        }
    }
}

#[async_trait]
impl CueLoader for FileCueLoader {
    async fn load(&self, kind: CueKind) -> Result<CueClip, CueError> {
        let path = self.path(kind).to_path_buf();
        let target_rate = self.target_rate;

        log::debug!("cue: loading {} from {}", kind.as_str(), path.display());

        tokio::task::spawn_blocking(move || {
            let (mono, rate) = decode_mono(&path)?;
            let samples = resample(&mono, rate, target_rate)?;
            Ok::<_, CueError>(CueClip::new(kind, samples, target_rate))
        })
        .await
        .map_err(|e| {
            if e.is_cancelled() {
                CueError::Cancelled
            } else {
                CueError::Decode(format!("loader task failed: {e}"))
            }
        })?
    }
}

// ---------------------------------------------------------------------------
// decode_mono
// ---------------------------------------------------------------------------

/// Decode the first audio track of `path` into mono `f32` samples.
///
/// Returns the samples and their sample rate.  Corrupt packets are skipped
/// with a warning; a file with no decodable audio is an error.
pub fn decode_mono(path: &Path) -> Result<(Vec<f32>, u32), CueError> {
    let file = File::open(path).map_err(|e| CueError::Io(format!("{}: {e}", path.display())))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| CueError::Decode(format!("unrecognised format: {e}")))?;
    let mut format = probed.format;

    let (track_id, params) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| CueError::Decode("no audio track".into()))?;
        (track.id, track.codec_params.clone())
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| CueError::Decode(format!("unsupported codec: {e}")))?;

    let mut sample_rate = params.sample_rate;
    let mut mono = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(CueError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                mono.extend(downmix_to_mono(buf.samples(), spec.channels.count()));
            }
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("cue: skipping corrupt packet in {}: {e}", path.display());
            }
            Err(e) => return Err(CueError::Decode(e.to_string())),
        }
    }

    let sample_rate = sample_rate.ok_or_else(|| CueError::Decode("unknown sample rate".into()))?;
    if mono.is_empty() {
        return Err(CueError::Decode(format!(
            "{} contains no audio",
            path.display()
        )));
    }

    Ok((mono, sample_rate))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    /// Minimal 16-bit PCM WAV writer for fixtures.
    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let data_len = (samples.len() * 2) as u32;
        let block_align = channels * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        File::create(path).unwrap().write_all(&bytes).unwrap();
    }

    #[test]
    fn decodes_stereo_wav_to_mono() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("inhale.wav");
        // 100 stereo frames: L = 16384, R = 0 → mono ≈ 0.25
        let frames: Vec<i16> = (0..100).flat_map(|_| [16_384i16, 0]).collect();
        write_wav(&path, 8_000, 2, &frames);

        let (mono, rate) = decode_mono(&path).unwrap();
        assert_eq!(rate, 8_000);
        assert_eq!(mono.len(), 100);
        assert!((mono[0] - 0.25).abs() < 1e-3, "got {}", mono[0]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = decode_mono(Path::new("/nonexistent/cue.mp3")).unwrap_err();
        assert!(matches!(err, CueError::Io(_)));
    }

    #[test]
    fn garbage_file_is_decode_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("exhale.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(matches!(decode_mono(&path), Err(CueError::Decode(_))));
    }

    #[tokio::test]
    async fn loader_resamples_to_target_rate() {
        let dir = tempdir().expect("temp dir");
        let inhale = dir.path().join("inhale.wav");
        let exhale = dir.path().join("exhale.wav");
        write_wav(&inhale, 8_000, 1, &[1_000; 800]);
        write_wav(&exhale, 16_000, 1, &[1_000; 1_600]);

        let loader = FileCueLoader::new(&inhale, &exhale, 16_000);

        let clip = loader.load(CueKind::Inhale).await.unwrap();
        assert_eq!(clip.kind, CueKind::Inhale);
        assert_eq!(clip.sample_rate, 16_000);
        assert!(clip.samples.len() >= 1_600);

        let clip = loader.load(CueKind::Exhale).await.unwrap();
        assert_eq!(clip.samples.len(), 1_600);
    }

    #[tokio::test]
    async fn loader_reports_missing_cue() {
        let loader = FileCueLoader::new("/nope/inhale.mp3", "/nope/exhale.mp3", 48_000);
        assert!(loader.load(CueKind::Exhale).await.is_err());
    }
}
