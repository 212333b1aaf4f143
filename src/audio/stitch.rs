//! Concatenation of clips into one continuous artifact

use std::path::Path;

use super::{AudioClip, AudioFormat, convert, read_clip};
use crate::{Error, Result};

/// Concatenate clips in the given order
///
/// Clips that differ in format are first converted to the highest sample
/// rate and channel count present, so the result plays continuously.
///
/// # Errors
///
/// Returns error if `clips` is empty or a conversion fails
pub fn stitch(clips: Vec<AudioClip>) -> Result<AudioClip> {
    let common = clips
        .iter()
        .map(AudioClip::format)
        .reduce(|a, b| {
            AudioFormat::new(a.sample_rate.max(b.sample_rate), a.channels.max(b.channels))
        })
        .ok_or_else(|| Error::Audio("nothing to stitch".to_string()))?;

    let total: usize = clips.iter().map(|c| c.samples().len()).sum();
    let mut samples = Vec::with_capacity(total);

    for clip in clips {
        if clip.format() == common {
            samples.extend(clip.into_samples());
        } else {
            tracing::debug!(
                from = %clip.format(),
                to = %common,
                "conforming clip before stitching"
            );
            samples.extend(convert(&clip, common)?.into_samples());
        }
    }

    AudioClip::new(samples, common)
}

/// Load and concatenate WAV files
///
/// All files are loaded before anything is stitched, so one unreadable
/// file fails the whole call.
///
/// # Errors
///
/// Returns error if any file cannot be loaded or `paths` is empty
pub fn stitch_files<P: AsRef<Path>>(paths: &[P]) -> Result<AudioClip> {
    let clips = paths
        .iter()
        .map(|p| read_clip(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let stitched = stitch(clips)?;
    tracing::info!(
        files = paths.len(),
        duration_ms = stitched.duration_ms(),
        format = %stitched.format(),
        "stitched audio files"
    );
    Ok(stitched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::write_wav;

    fn clip(value: f32, frames: usize, format: AudioFormat) -> AudioClip {
        AudioClip::new(vec![value; frames * usize::from(format.channels)], format).unwrap()
    }

    #[test]
    fn concatenates_in_order() {
        let format = AudioFormat::new(8_000, 1);
        let stitched = stitch(vec![clip(0.1, 2, format), clip(0.2, 3, format)]).unwrap();

        assert_eq!(stitched.format(), format);
        assert_eq!(stitched.samples(), &[0.1, 0.1, 0.2, 0.2, 0.2]);
    }

    #[test]
    fn duration_is_sum_of_parts() {
        let format = AudioFormat::new(16_000, 1);
        let parts = vec![
            clip(0.0, 16_000, format),
            clip(0.0, 8_000, format),
            clip(0.0, 4_000, format),
        ];
        let stitched = stitch(parts).unwrap();
        assert_eq!(stitched.duration_ms(), 1_750);
    }

    #[test]
    fn conforms_mixed_formats() {
        let mono = clip(0.3, 8_000, AudioFormat::new(8_000, 1));
        let stereo = clip(0.3, 16_000, AudioFormat::new(16_000, 2));

        let stitched = stitch(vec![mono, stereo]).unwrap();
        assert_eq!(stitched.format(), AudioFormat::new(16_000, 2));
        assert_eq!(stitched.duration_ms(), 2_000);
    }

    #[test]
    fn empty_batch_is_an_error() {
        assert!(matches!(stitch(Vec::new()), Err(Error::Audio(_))));
    }

    #[test]
    fn unreadable_file_fails_whole_stitch() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.wav");
        let bad = dir.path().join("b.wav");
        write_wav(&clip(0.0, 1_600, AudioFormat::default()), &good).unwrap();
        std::fs::write(&bad, b"junk").unwrap();

        let err = stitch_files(&[&good, &bad]).unwrap_err();
        assert!(matches!(err, Error::Audio(ref msg) if msg.contains("b.wav")));
    }
}
