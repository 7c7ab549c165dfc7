//! Channel mixing and sample-rate conversion for decoded cues.
//!
//! Cues are stored as mono at the output device's rate so the stream
//! callback only copies samples; all conversion happens once, at load time,
//! on the blocking pool.

use rubato::{FftFixedIn, Resampler};

use super::CueError;

/// Input frames per resampler chunk.
const CHUNK_FRAMES: usize = 1024;

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Average interleaved multi-channel audio down to one channel.
///
/// A trailing partial frame is dropped.  `channels == 0` yields an empty
/// vector.
///
/// ```rust
/// use kegel_coach::cue::downmix_to_mono;
///
/// let stereo = [0.5_f32, -0.5, 0.2, 0.4];
/// let mono = downmix_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Convert mono `samples` from `from_rate` to `to_rate` Hz.
///
/// Equal rates and empty input are returned unchanged.  The FFT resampler
/// adds a short run of leading silence (its processing delay), which is
/// inaudible for a cue.
///
/// # Errors
///
/// [`CueError::Resample`] when either rate is zero or rubato rejects the
/// conversion.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, CueError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(CueError::Resample(format!(
            "invalid rates {from_rate} Hz -> {to_rate} Hz"
        )));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_FRAMES, 2, 1)
            .map_err(|e| CueError::Resample(e.to_string()))?;

    let expected = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let mut out = Vec::with_capacity(expected + CHUNK_FRAMES);
    let mut pos = 0;

    loop {
        let need = resampler.input_frames_next();
        if samples.len() - pos < need {
            break;
        }
        let chunk = [&samples[pos..pos + need]];
        let frames = resampler
            .process(&chunk, None)
            .map_err(|e| CueError::Resample(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
        pos += need;
    }

    if pos < samples.len() {
        let tail = [&samples[pos..]];
        let frames = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| CueError::Resample(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
    }

    // Flush whatever is still inside the resampler's delay line.
    let frames = resampler
        .process_partial(None::<&[&[f32]]>, None)
        .map_err(|e| CueError::Resample(e.to_string()))?;
    out.extend_from_slice(&frames[0]);

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- downmix_to_mono ---------------------------------------------------

    #[test]
    fn downmix_mono_is_copy() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&input, 1), input);
    }

    #[test]
    fn downmix_two_channels_averages() {
        let out = downmix_to_mono(&[1.0, -1.0, 0.5, 0.5], 2);
        assert_eq!(out.len(), 2);
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_drops_partial_frame() {
        let out = downmix_to_mono(&[0.2, 0.2, 0.9], 2);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn downmix_zero_channels_is_empty() {
        assert!(downmix_to_mono(&[1.0, 2.0], 0).is_empty());
    }

    // ---- resample ----------------------------------------------------------

    #[test]
    fn same_rate_is_noop() {
        let input: Vec<f32> = (0..300).map(|i| i as f32 / 300.0).collect();
        assert_eq!(resample(&input, 44_100, 44_100).unwrap(), input);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(resample(&[], 48_000, 44_100).unwrap().is_empty());
    }

    #[test]
    fn zero_rate_is_an_error() {
        assert!(matches!(
            resample(&[0.0; 10], 0, 48_000),
            Err(CueError::Resample(_))
        ));
    }

    #[test]
    fn downsampling_halves_length_plus_delay() {
        let input = vec![0.0_f32; 48_000];
        let out = resample(&input, 48_000, 24_000).unwrap();
        assert!(out.len() >= 24_000, "got {}", out.len());
        assert!(out.len() <= 24_000 + 2 * CHUNK_FRAMES, "got {}", out.len());
    }

    #[test]
    fn upsampling_short_clip_covers_whole_input() {
        // Shorter than one chunk: handled entirely by the partial path.
        let input = vec![0.25_f32; 200];
        let out = resample(&input, 22_050, 44_100).unwrap();
        assert!(out.len() >= 400, "got {}", out.len());
    }
}
