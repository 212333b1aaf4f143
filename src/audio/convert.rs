//! Channel remixing, resampling and normalization

use rubato::{FftFixedIn, Resampler};

use super::{AudioClip, AudioFormat};
use crate::{Error, Result};

/// Input chunk size for the FFT resampler
const CHUNK_SIZE: usize = 1024;

/// Result of [`normalize`]
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub clip: AudioClip,
    /// False when the clip already had the target format and passed through
    pub converted: bool,
}

/// Bring a clip to the target format
///
/// Clips already at `target` pass through untouched.
///
/// # Errors
///
/// Returns error if resampling fails
pub fn normalize(clip: AudioClip, target: AudioFormat) -> Result<Normalized> {
    if clip.format() == target {
        tracing::debug!(format = %target, "audio already at target format");
        return Ok(Normalized {
            clip,
            converted: false,
        });
    }

    tracing::info!(from = %clip.format(), to = %target, "converting stitched audio");
    Ok(Normalized {
        clip: convert(&clip, target)?,
        converted: true,
    })
}

/// Remix and resample a clip into `target`
///
/// # Errors
///
/// Returns error if resampling fails
pub fn convert(clip: &AudioClip, target: AudioFormat) -> Result<AudioClip> {
    let source = clip.format();
    let remixed = remix(clip.samples(), source.channels, target.channels);
    let resampled = resample(
        &remixed,
        target.channels,
        source.sample_rate,
        target.sample_rate,
    )?;
    AudioClip::new(resampled, target)
}

/// Change the channel count of interleaved samples
///
/// Frames are averaged down to mono first, then duplicated across the
/// target channels.
#[must_use]
pub fn remix(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let divisor = f32::from(from);
    let mono = samples
        .chunks_exact(usize::from(from))
        .map(|frame| frame.iter().sum::<f32>() / divisor);

    if to == 1 {
        mono.collect()
    } else {
        mono.flat_map(|s| std::iter::repeat_n(s, usize::from(to)))
            .collect()
    }
}

/// Resample interleaved samples using rubato
///
/// The resampler delay is trimmed and the output is cut to
/// `frames * to_rate / from_rate` (rounded), so duration is preserved.
///
/// # Errors
///
/// Returns error if the resampler cannot be built or fails
#[allow(clippy::cast_possible_truncation)]
pub fn resample(
    samples: &[f32],
    channels: u16,
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() || channels == 0 {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(Error::Audio(format!(
            "cannot resample from {from_rate} Hz to {to_rate} Hz"
        )));
    }

    let channels = usize::from(channels);
    let planar = deinterleave(samples, channels);
    let frames_in = planar[0].len();
    let expected = ((frames_in as u64 * u64::from(to_rate) + u64::from(from_rate) / 2)
        / u64::from(from_rate)) as usize;

    let mut resampler = FftFixedIn::<f64>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        2,
        channels,
    )
    .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let delay = resampler.output_delay();
    let wanted = expected + delay;
    let mut output: Vec<Vec<f64>> = vec![Vec::with_capacity(wanted); channels];

    let mut pos = 0;
    while pos < frames_in {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(frames_in);
        let chunk: Vec<&[f64]> = planar.iter().map(|c| &c[pos..end]).collect();

        let out = if end - pos == needed {
            resampler.process(chunk.as_slice(), None)
        } else {
            resampler.process_partial(Some(chunk.as_slice()), None)
        }
        .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;

        append(&mut output, out);
        pos = end;
    }

    // Flush the tail still held inside the resampler
    while output[0].len() < wanted {
        let out = resampler
            .process_partial(None::<&[Vec<f64>]>, None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        if out.first().is_none_or(Vec::is_empty) {
            break;
        }
        append(&mut output, out);
    }

    let mut interleaved = Vec::with_capacity(expected * channels);
    for frame in 0..expected {
        for channel in &output {
            let sample = channel.get(delay + frame).copied().unwrap_or(0.0);
            interleaved.push(sample as f32);
        }
    }
    Ok(interleaved)
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f64>> {
    let mut planar = vec![Vec::with_capacity(samples.len() / channels); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, &sample) in planar.iter_mut().zip(frame) {
            channel.push(f64::from(sample));
        }
    }
    planar
}

fn append(output: &mut [Vec<f64>], chunk: Vec<Vec<f64>>) {
    for (channel, data) in output.iter_mut().zip(chunk) {
        channel.extend(data);
    }
}
