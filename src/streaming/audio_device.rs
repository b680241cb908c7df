//! Audio device integration using rodio
//!
//! Plays the mixed channel output on the system audio device. The rodio
//! source pulls one chunk of samples at a time from the shared engine
//! under its mutex (batch refill keeps lock contention to one short hold
//! per chunk, never per sample).

use super::StreamConfig;
use crate::apu::SampleSource;
use crate::{ApuError, Result};
use parking_lot::Mutex;
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Audio source that pulls chunks from the engine
struct EngineSource {
    engine: Arc<Mutex<dyn SampleSource>>,
    sample_rate: u32,
    channels: u16,
    finished: Arc<AtomicBool>,
    /// Internal chunk buffer refilled in one engine pull
    chunk: Vec<i16>,
    /// Read position within the chunk
    chunk_pos: usize,
}

impl EngineSource {
    fn new(
        engine: Arc<Mutex<dyn SampleSource>>,
        config: StreamConfig,
        finished: Arc<AtomicBool>,
    ) -> Self {
        let buffer_samples = config.buffer_samples.max(1);
        EngineSource {
            engine,
            sample_rate: config.sample_rate,
            channels: config.channels,
            finished,
            chunk: vec![0i16; buffer_samples],
            chunk_pos: buffer_samples, // force a refill on the first pull
        }
    }
}

impl Iterator for EngineSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }

        if self.chunk_pos >= self.chunk.len() {
            // One buffer is generated to completion per lock hold; there is
            // no mid-buffer abort
            let mut engine = self.engine.lock();
            engine.fill(&mut self.chunk);
            drop(engine);
            self.chunk_pos = 0;
        }

        let sample = self.chunk[self.chunk_pos];
        self.chunk_pos += 1;
        Some(sample)
    }
}

impl Source for EngineSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.chunk.len())
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        // Live stream, no known end
        None
    }
}

/// Audio playback device using rodio
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    running: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output device and start pulling from `engine`
    ///
    /// # Errors
    ///
    /// Returns [`ApuError::AudioDeviceError`] if no output device is
    /// available or the sink cannot be created; nothing is left open on
    /// failure.
    pub fn new(config: StreamConfig, engine: Arc<Mutex<dyn SampleSource>>) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| ApuError::AudioDeviceError(format!("failed to create stream: {e}")))?;

        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| ApuError::AudioDeviceError(format!("failed to create sink: {e}")))?;

        let finished = Arc::new(AtomicBool::new(false));
        let source = EngineSource::new(engine, config, Arc::clone(&finished));
        sink.append(source);

        Ok(AudioDevice {
            _stream: stream,
            sink,
            running: Arc::new(AtomicBool::new(true)),
            finished,
        })
    }

    /// Pause playback
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback
    pub fn play(&self) {
        self.sink.play();
    }

    /// Check if the device is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Signal that no more samples will be produced, terminating the stream
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.pause();
        self.running.store(false, Ordering::Relaxed);
    }
}
