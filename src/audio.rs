//! Raw PCM handling for narration.
//!
//! Gemini TTS answers with base64 `audio/L16` parts: signed 16-bit
//! little-endian mono PCM, sample rate carried in the mime type. These
//! helpers decode that into samples and wrap them in a standard WAV so
//! any player can use the artifact.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Sample rate assumed when the mime type does not carry one.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Pull the sample rate out of a mime like `audio/L16;codec=pcm;rate=24000`.
/// Unparseable or implausible rates fall back to the default.
pub fn parse_l16_rate(mime: &str) -> u32 {
    let Some(pos) = mime.find("rate=") else {
        return DEFAULT_SAMPLE_RATE;
    };
    let digits: String = mime[pos + "rate=".len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u32>() {
        Ok(rate) if (8_000..=48_000).contains(&rate) => rate,
        _ => DEFAULT_SAMPLE_RATE,
    }
}

/// Interpret raw bytes as s16le mono samples. A stray trailing byte is
/// dropped rather than failing the whole clip.
pub fn pcm_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

pub fn duration_secs(sample_count: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    sample_count as f64 / sample_rate as f64
}

/// Write mono 16-bit samples as a WAV file.
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Could not create {}", path.display()))?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_l16_rate() {
        assert_eq!(parse_l16_rate("audio/L16;codec=pcm;rate=24000"), 24_000);
        assert_eq!(parse_l16_rate("audio/L16;rate=16000"), 16_000);
        assert_eq!(parse_l16_rate("audio/L16"), DEFAULT_SAMPLE_RATE);
        // Implausible rates fall back instead of producing a chipmunk file
        assert_eq!(parse_l16_rate("audio/L16;rate=4"), DEFAULT_SAMPLE_RATE);
        assert_eq!(parse_l16_rate("audio/L16;rate=999999"), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_pcm_to_samples_little_endian() {
        let samples = pcm_to_samples(&[0x01, 0x00, 0xFF, 0x7F, 0x00, 0x80]);
        assert_eq!(samples, vec![1, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_pcm_odd_trailing_byte_dropped() {
        let samples = pcm_to_samples(&[0x01, 0x00, 0x7F]);
        assert_eq!(samples, vec![1]);
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration_secs(24_000, 24_000), 1.0);
        assert_eq!(duration_secs(12_000, 24_000), 0.5);
        assert_eq!(duration_secs(100, 0), 0.0);
    }

    #[test]
    fn test_wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let samples: Vec<i16> = vec![0, 512, -512, 1024, -1024];

        write_wav(&path, &samples, 24_000).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.bits_per_sample, 16);
        let read_back: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read_back, samples);
    }
}
