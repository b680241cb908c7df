//! Audio output & streaming
//!
//! Real-time playback of the mixed channel output. The engine side is a
//! pull model: the audio device owns a rodio source that asks the shared
//! [`SampleSource`](crate::SampleSource) for one chunk at a time, so the
//! emulator never pushes and never blocks the audio thread beyond a single
//! short mutex hold per chunk. [`PlaybackEngine`] wraps the whole
//! lifecycle: uninitialized until `init`, running while the device is open,
//! reset and shutdown close the device.

mod audio_device;

pub use audio_device::AudioDevice;

use crate::apu::{Apu, ApuSystem, SampleSource};
use crate::config::AudioConfig;
use crate::memory::MemorySource;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Default sample rate for streaming playback
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Samples pulled from the engine per chunk (one device buffer)
pub const PULL_CHUNK_SAMPLES: usize = 4096;

/// Streaming configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved output channels
    pub channels: u16,
    /// Device pull-buffer size in samples
    pub buffer_samples: usize,
}

impl StreamConfig {
    /// Low-latency configuration: one hardware-sized pull buffer
    pub fn low_latency(sample_rate: u32) -> Self {
        StreamConfig {
            sample_rate,
            channels: 1,
            buffer_samples: PULL_CHUNK_SAMPLES,
        }
    }

    /// Stability-biased configuration: a larger pull buffer
    pub fn stable(sample_rate: u32) -> Self {
        StreamConfig {
            sample_rate,
            channels: 1,
            buffer_samples: PULL_CHUNK_SAMPLES * 4,
        }
    }

    /// Buffer latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_samples as f32) / (self.sample_rate as f32 * f32::from(self.channels))
            * 1000.0
    }
}

/// Lifecycle holder for the streaming APU
///
/// Owns the shared engine+memory pair and an optional open audio device:
///
/// ```text
/// Uninitialized --init()--> Initialized/Running
///      ^                          |
///      +------- reset() ----------+--- shutdown() --> device closed
/// ```
///
/// `init` failure reports an error and leaves the engine uninitialized with
/// no partial device state.
pub struct PlaybackEngine<M: MemorySource + Send + 'static> {
    system: Arc<Mutex<ApuSystem<M>>>,
    device: Option<AudioDevice>,
}

impl<M: MemorySource + Send + 'static> PlaybackEngine<M> {
    /// Create an uninitialized engine with freshly reset channel state
    pub fn new(config: &AudioConfig, mem: M) -> Self {
        PlaybackEngine {
            system: Arc::new(Mutex::new(ApuSystem::new(Apu::new(config), mem))),
            device: None,
        }
    }

    /// Open the audio device and start pulling samples
    ///
    /// Idempotent while a device is already open. On failure the engine
    /// stays uninitialized.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ApuError::AudioDeviceError`] if no output device is
    /// available or the stream cannot be created.
    pub fn init(&mut self) -> Result<()> {
        if self.device.is_some() {
            return Ok(());
        }

        let sample_rate = self.system.lock().sample_rate();
        let config = StreamConfig {
            sample_rate,
            channels: 1,
            buffer_samples: PULL_CHUNK_SAMPLES,
        };

        let source: Arc<Mutex<dyn SampleSource>> = self.system.clone();
        let device = AudioDevice::new(config, source)?;
        self.device = Some(device);
        println!("APU::Initialized");
        Ok(())
    }

    /// Reset the engine: close any open device and re-zero all APU state
    ///
    /// Idempotent and safe to call whether or not `init` ever ran. The APU
    /// re-reads its stored configuration during the reset.
    pub fn reset(&mut self) {
        self.device = None;
        self.system.lock().apu.reset();
    }

    /// Replace the stored configuration; effective at the next [`reset`](Self::reset)
    pub fn set_config(&mut self, config: &AudioConfig) {
        self.system.lock().apu.set_config(config);
    }

    /// Close the audio device, leaving APU state valid but inert
    pub fn shutdown(&mut self) {
        if self.device.take().is_some() {
            println!("APU::Shutdown");
        }
    }

    /// Whether the audio device is currently open
    pub fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    /// Shared handle to the engine+memory pair
    ///
    /// The register-write path locks this to program channels while the
    /// audio thread pulls buffers; the mutex is the single critical section
    /// both sides share, held only for register writes or one chunk of
    /// generation.
    pub fn system(&self) -> Arc<Mutex<ApuSystem<M>>> {
        Arc::clone(&self.system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RamSource;

    #[test]
    fn test_stream_config_latency() {
        let config = StreamConfig::low_latency(44_100);
        assert_eq!(config.buffer_samples, 4096);
        assert!(config.latency_ms() > 90.0 && config.latency_ms() < 95.0);

        let config = StreamConfig::stable(44_100);
        assert!(config.latency_ms() > 300.0);
    }

    #[test]
    fn test_engine_starts_uninitialized() {
        let engine = PlaybackEngine::new(&AudioConfig::default(), RamSource::new(64));
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_reset_without_init_is_safe() {
        let mut engine = PlaybackEngine::new(&AudioConfig::default(), RamSource::new(64));
        engine.reset();
        engine.reset();
        assert!(!engine.is_initialized());
        let system = engine.system();
        assert_eq!(system.lock().apu.status().main_volume, 4);
    }

    #[test]
    fn test_shutdown_without_init_is_noop() {
        let mut engine = PlaybackEngine::new(&AudioConfig::default(), RamSource::new(64));
        engine.shutdown();
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_init_success_or_clean_failure() {
        let mut engine = PlaybackEngine::new(&AudioConfig::default(), RamSource::new(64));
        match engine.init() {
            Ok(()) => {
                assert!(engine.is_initialized());
                engine.shutdown();
                assert!(!engine.is_initialized());
            }
            Err(err) => {
                // No audio backend in this environment; the engine must
                // stay uninitialized with no partial device state
                eprintln!("Skipping streaming init test (audio backend unavailable): {err}");
                assert!(!engine.is_initialized());
            }
        }
    }
}
