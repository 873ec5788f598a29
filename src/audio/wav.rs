use std::path::{Path, PathBuf};

use chrono::Local;

use super::clip::ClipSamples;
use crate::error::{AnalysisError, Result};

pub const HEADER_SIZE: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;
const PCM_FORMAT: u16 = 1;

/// Serialize samples as a canonical 16-bit PCM WAV file.
///
/// Each sample is scaled by 32767 and truncated to `i16`. Samples outside
/// [-1, 1] wrap instead of clipping. Fails when a size field would not fit
/// its header slot.
pub fn encode(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let too_large = || {
        AnalysisError::InvalidInput(format!(
            "{} samples at {} Hz x {} channels exceed the WAV header limits",
            samples.len(),
            sample_rate,
            channels
        ))
    };
    let data_size = samples
        .len()
        .checked_mul(2)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| n.checked_add(36).is_some())
        .ok_or_else(too_large)?;
    let block_align = channels
        .checked_mul(BITS_PER_SAMPLE / 8)
        .ok_or_else(too_large)?;
    let byte_rate = sample_rate
        .checked_mul(block_align as u32)
        .ok_or_else(too_large)?;

    let mut out = Vec::with_capacity(HEADER_SIZE + data_size as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());

    for &s in samples {
        out.extend_from_slice(&to_pcm16(s).to_le_bytes());
    }

    Ok(out)
}

/// Truncating float-to-PCM conversion with two's complement wrap.
fn to_pcm16(sample: f32) -> i16 {
    (sample * 32767.0) as i32 as i16
}

pub fn encode_clip(clip: &ClipSamples) -> Result<Vec<u8>> {
    encode(&clip.samples, clip.sample_rate, clip.channels)
}

/// File name for a recorded clip, stamped with the local time.
pub fn recording_file_name(clip_number: u8) -> String {
    format!(
        "RecordedAudio_{}_{}.wav",
        clip_number,
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Encode `clip` and write it to `path`, creating parent directories.
pub fn save_wav(clip: &ClipSamples, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    std::fs::write(path, encode_clip(clip)?)?;
    log::info!("Audio saved: {}", path.display());
    Ok(())
}

/// Save a recorded clip under `dir` with a timestamped name.
pub fn save_recording(clip: &ClipSamples, dir: &Path, clip_number: u8) -> Result<PathBuf> {
    let path = dir.join(recording_file_name(clip_number));
    save_wav(clip, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn header_layout_is_canonical() {
        let bytes = encode(&[0.0; 10], 44100, 2).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 20);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4), 36 + 20);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_at(&bytes, 16), 16);
        assert_eq!(u16_at(&bytes, 20), 1);
        assert_eq!(u16_at(&bytes, 22), 2);
        assert_eq!(u32_at(&bytes, 24), 44100);
        assert_eq!(u32_at(&bytes, 28), 44100 * 2 * 2);
        assert_eq!(u16_at(&bytes, 32), 4);
        assert_eq!(u16_at(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40), 20);
    }

    #[test]
    fn samples_are_scaled_and_truncated() {
        let bytes = encode(&[1.0, -1.0, 0.5, 0.0], 8000, 1).unwrap();
        let pcm: Vec<i16> = bytes[HEADER_SIZE..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(pcm, vec![32767, -32767, 16383, 0]);
    }

    #[test]
    fn out_of_range_samples_wrap() {
        assert_eq!(to_pcm16(2.0), (65534i32) as i16);
        assert_eq!(to_pcm16(2.0), -2);
    }

    #[test]
    fn oversized_header_fields_are_rejected() {
        assert!(matches!(
            encode(&[0.0; 4], 8000, u16::MAX),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(matches!(
            encode(&[0.0; 4], u32::MAX, 2),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn hound_reads_back_format() {
        let samples: Vec<f32> = (0..400).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let bytes = encode(&samples, 22050, 2).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(reader.len() as usize, samples.len());

        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded[1], to_pcm16(samples[1]));
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = std::env::temp_dir()
            .join(format!("echomatch-wav-{}", std::process::id()))
            .join("nested");
        let clip = ClipSamples::new(vec![0.25; 16], 8000, 1);

        let path = save_recording(&clip, &dir, 1).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, encode_clip(&clip).unwrap());

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("RecordedAudio_1_"));
        assert!(name.ends_with(".wav"));

        std::fs::remove_dir_all(dir.parent().unwrap()).ok();
    }
}
