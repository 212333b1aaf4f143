//! Audio handling for dropped voice clips
//!
//! Reads and writes WAV files, concatenates clips and converts them to the
//! format the voice model API expects.

mod convert;
mod stitch;
mod wav;

pub use convert::{Normalized, convert, normalize, remix, resample};
pub use stitch::{stitch, stitch_files};
pub use wav::{decode_wav, encode_wav, read_clip, read_complete_clip, write_wav};

use std::fmt;

use crate::{Error, Result};

/// Sample rate expected by the voice model API
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Channel count expected by the voice model API
pub const TARGET_CHANNELS: u16 = 1;

/// Sample rate and channel layout of a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    #[must_use]
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(TARGET_SAMPLE_RATE, TARGET_CHANNELS)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz, {} ch", self.sample_rate, self.channels)
    }
}

/// Decoded audio held in memory
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    format: AudioFormat,
}

impl AudioClip {
    /// Wrap interleaved samples
    ///
    /// # Errors
    ///
    /// Returns error if the format is zeroed or the samples do not divide
    /// evenly into frames
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Result<Self> {
        if format.sample_rate == 0 || format.channels == 0 {
            return Err(Error::Audio(format!("invalid audio format: {format}")));
        }
        if samples.len() % usize::from(format.channels) != 0 {
            return Err(Error::Audio(format!(
                "{} samples do not form whole frames of {} channels",
                samples.len(),
                format.channels
            )));
        }
        Ok(Self { samples, format })
    }

    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Number of sample frames (samples per channel)
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels)
    }

    /// Duration rounded to the nearest millisecond
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        frames_to_ms(self.frames() as u64, self.format.sample_rate)
    }
}

/// Convert a frame count to milliseconds, rounding to nearest
#[must_use]
pub fn frames_to_ms(frames: u64, sample_rate: u32) -> u64 {
    let rate = u64::from(sample_rate.max(1));
    (frames * 1000 + rate / 2) / rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_duration_from_frames() {
        let clip = AudioClip::new(vec![0.0; 32_000], AudioFormat::new(16_000, 2)).unwrap();
        assert_eq!(clip.frames(), 16_000);
        assert_eq!(clip.duration_ms(), 1000);
    }

    #[test]
    fn rejects_partial_frames() {
        let err = AudioClip::new(vec![0.0; 3], AudioFormat::new(16_000, 2)).unwrap_err();
        assert!(matches!(err, Error::Audio(_)));

        let err = AudioClip::new(Vec::new(), AudioFormat::new(0, 1)).unwrap_err();
        assert!(matches!(err, Error::Audio(_)));
    }

    #[test]
    fn frames_to_ms_rounds() {
        assert_eq!(frames_to_ms(441, 44_100), 10);
        assert_eq!(frames_to_ms(22_050, 44_100), 500);
        assert_eq!(frames_to_ms(1, 3), 333);
        assert_eq!(frames_to_ms(2, 3), 667);
        assert_eq!(frames_to_ms(0, 16_000), 0);
    }

    #[test]
    fn default_format_is_api_target() {
        let format = AudioFormat::default();
        assert_eq!(format, AudioFormat::new(16_000, 1));
        assert_eq!(format.to_string(), "16000 Hz, 1 ch");
    }
}
