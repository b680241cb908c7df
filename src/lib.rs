//! NDS APU Emulator
//!
//! Emulation of the Nintendo DS audio-generation hardware: sixteen
//! independent sample-playback channels mixed in software into a single
//! signed 16-bit output stream. Channel control words, memory-driven sample
//! streams, looping behavior and the three-stage volume scaling chain are
//! reproduced to match the real chip's audible behavior.
//!
//! # Features
//! - All 16 sound channels with PCM8 and PCM16 sample decoding
//! - Repeat ("loop"), one-shot and manual repeat modes
//! - Per-channel, main and master volume scaling
//! - IMA-ADPCM step table setup (decode path reserved, see [`apu`])
//! - Pull-based sample generation via the [`SampleSource`] trait
//! - Offline WAV rendering and optional real-time streaming playback
//!
//! # Crate feature flags
//! - `streaming` (opt-in): Real-time audio output (enables optional `rodio` dep)
//!
//! # Quick start
//! ## Offline mixing
//! ```no_run
//! use nds_apu::{Apu, AudioConfig, RamSource};
//!
//! let config = AudioConfig::default();
//! let mut apu = Apu::new(&config);
//! let mem = RamSource::new(0x10000);
//!
//! // Program channel 0 the way the register-write path would.
//! {
//!     let ch = apu.channel_mut(0);
//!     ch.cnt = 0x8000_0000; // enabled, PCM8, manual repeat
//!     ch.volume = 127;
//!     ch.samples = 0x4000;
//!     ch.output_frequency = 32_768.0;
//!     ch.playing = true;
//! }
//!
//! let mut out = vec![0i16; 4096];
//! apu.mix_into(&mem, &mut out);
//! ```
//!
//! ## Real-time streaming
//! ```no_run
//! # #[cfg(feature = "streaming")]
//! # {
//! use nds_apu::{AudioConfig, PlaybackEngine, RamSource};
//!
//! let config = AudioConfig::default();
//! let mem = RamSource::new(0x10000);
//! let mut engine = PlaybackEngine::new(&config, mem);
//! engine.init().expect("audio device");
//! // ... program channels through engine.system() while the device pulls
//! engine.shutdown();
//! # }
//! ```

#![warn(missing_docs)]

pub mod apu; // APU core: channels, generator, mixer
pub mod config; // Audio configuration
pub mod memory; // Memory source abstraction
#[cfg(feature = "streaming")]
pub mod streaming; // Audio output & streaming
pub mod wav_writer; // Offline WAV export

/// Error types for APU emulator operations
#[derive(thiserror::Error, Debug)]
pub enum ApuError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Error writing audio file
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for ApuError {
    /// Converts a String into `ApuError::Other`.
    ///
    /// Convenience conversion for generic string errors. For better error
    /// discrimination, prefer the specific variant constructors
    /// (`ConfigError`, `AudioDeviceError`, `AudioFileError`).
    fn from(msg: String) -> Self {
        ApuError::Other(msg)
    }
}

impl From<&str> for ApuError {
    /// Converts a string slice into `ApuError::Other`.
    fn from(msg: &str) -> Self {
        ApuError::Other(msg.to_string())
    }
}

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, ApuError>;

// Public API exports
pub use apu::channel::{Channel, CntFlags, LoopMode, SampleFormat};
pub use apu::{Apu, ApuSystem, SampleSource, CHANNEL_COUNT};
pub use config::AudioConfig;
pub use memory::{MemorySource, RamSource};
#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, PlaybackEngine, StreamConfig};
pub use wav_writer::render_wav;
