//! WAV decoding and encoding

use std::io::{Cursor, Read, Write};
use std::path::Path;

use super::{AudioClip, AudioFormat};
use crate::{Error, Result};

fn wav_error(path: &Path, e: &hound::Error) -> Error {
    Error::Audio(format!("{}: {e}", path.display()))
}

/// Load a WAV file fully into memory
///
/// # Errors
///
/// Returns error if the file cannot be opened or decoded
pub fn read_clip(path: &Path) -> Result<AudioClip> {
    let reader = hound::WavReader::open(path).map_err(|e| wav_error(path, &e))?;
    decode(reader).map_err(|e| match e {
        Error::Audio(msg) => Error::Audio(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Load a clip only if every declared sample is present
///
/// Files still being written either declare more data than they hold,
/// which fails decoding, or declare no data yet, which is rejected here.
///
/// # Errors
///
/// Returns error if the file cannot be decoded or holds no audio
pub fn read_complete_clip(path: &Path) -> Result<AudioClip> {
    let clip = read_clip(path)?;
    if clip.frames() == 0 {
        return Err(Error::Audio(format!("{}: no audio data", path.display())));
    }
    Ok(clip)
}

/// Decode WAV bytes
///
/// # Errors
///
/// Returns error if the data is not a valid WAV stream
pub fn decode_wav(data: &[u8]) -> Result<AudioClip> {
    let reader =
        hound::WavReader::new(Cursor::new(data)).map_err(|e| Error::Audio(e.to_string()))?;
    decode(reader)
}

#[allow(clippy::cast_precision_loss)]
fn decode<R: Read>(reader: hound::WavReader<R>) -> Result<AudioClip> {
    let spec = reader.spec();
    let format = AudioFormat::new(spec.sample_rate, spec.channels);

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Audio(e.to_string()))?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(Error::Audio(format!(
                    "unsupported bit depth: {}",
                    spec.bits_per_sample
                )));
            }
            let scale = (1_u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::Audio(e.to_string()))?
        }
    };

    AudioClip::new(samples, format)
}

/// Encode a clip as 16-bit PCM WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn encode_wav(clip: &AudioClip) -> Result<Vec<u8>> {
    let format = clip.format();
    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in clip.samples() {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Write a clip to `path` as 16-bit PCM WAV
///
/// The data is written to a temporary file next to `path` and renamed into
/// place, so `path` never holds a partial artifact.
///
/// # Errors
///
/// Returns error if encoding or any filesystem operation fails
pub fn write_wav(clip: &AudioClip, path: &Path) -> Result<()> {
    let bytes = encode_wav(clip)?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!(
        path = %path.display(),
        bytes = bytes.len(),
        duration_ms = clip.duration_ms(),
        "wrote wav"
    );
    Ok(())
}
