//! Offline WAV export
//!
//! Renders mixed APU output to a mono 16-bit WAV file through the same
//! pull path the live audio device uses, in 4096-sample chunks.

use crate::apu::SampleSource;
use crate::{ApuError, Result};
use std::path::Path;

/// Samples rendered per pull, matching the live device's buffer size
const RENDER_CHUNK_SAMPLES: usize = 4096;

/// Render `seconds` of mixed output from `source` into a WAV file at `path`
///
/// # Errors
///
/// Returns [`ApuError::AudioFileError`] if the WAV file cannot be created
/// or written.
pub fn render_wav<S: SampleSource>(source: &mut S, path: &Path, seconds: f64) -> Result<()> {
    let sample_rate = source.sample_rate();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| ApuError::AudioFileError(format!("failed to create {:?}: {e}", path)))?;

    let mut remaining = (seconds * f64::from(sample_rate)) as usize;
    let mut chunk = vec![0i16; RENDER_CHUNK_SAMPLES];

    while remaining > 0 {
        let n = remaining.min(RENDER_CHUNK_SAMPLES);
        source.fill(&mut chunk[..n]);
        for &sample in &chunk[..n] {
            writer
                .write_sample(sample)
                .map_err(|e| ApuError::AudioFileError(format!("write failed: {e}")))?;
        }
        remaining -= n;
    }

    writer
        .finalize()
        .map_err(|e| ApuError::AudioFileError(format!("finalize failed: {e}")))?;
    Ok(())
}
