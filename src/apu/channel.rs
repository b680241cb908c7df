//! Sound channel state
//!
//! One [`Channel`] per hardware voice (16 total). The raw SOUNDxCNT control
//! word is the single authoritative copy of the enable/format/repeat fields;
//! everything the generator needs is projected out of it through the pure
//! accessors below rather than stored as decoded duplicates that could
//! drift out of sync.

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

bitflags! {
    /// Single-bit fields of the SOUNDxCNT control word
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CntFlags: u32 {
        /// Channel start/busy flag (bit 31)
        const ENABLE = 1 << 31;
        /// Hold last sample after one-shot end (bit 15)
        const HOLD = 1 << 15;
    }
}

/// Sample encoding selected by SOUNDxCNT bits 29-30
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum SampleFormat {
    /// Signed 8-bit PCM
    Pcm8 = 0,
    /// Signed 16-bit little-endian PCM
    Pcm16 = 1,
    /// IMA-ADPCM compressed (decode path not implemented, emits silence)
    Adpcm = 2,
    /// PSG square wave / noise (decode path not implemented, emits silence)
    Psg = 3,
}

/// Repeat mode selected by SOUNDxCNT bits 27-28
///
/// Value 3 is undefined on hardware; the generator treats it like
/// [`LoopMode::Manual`] (no action at the sample-budget boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum LoopMode {
    /// No boundary handling; the channel keeps reading until stopped
    Manual = 0,
    /// Jump back to the loop point and refill the sample budget
    Repeat = 1,
    /// Stop the channel and clear the enable bit
    OneShot = 2,
}

/// State of one sound channel
///
/// Fields are public because the register-write path that populates them
/// lives outside this crate; the engine itself only ever reads them during
/// generation (and advances the playback cursor fields).
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Raw SOUNDxCNT control word (authoritative for enable/format/repeat)
    pub cnt: u32,
    /// Base memory address of the sample stream
    pub data_src: u32,
    /// Current read cursor into memory
    pub data_pos: u32,
    /// Loop point, in register units (scaled by format when applied)
    pub loop_start: u32,
    /// Sound length register, in register units
    pub length: u32,
    /// Remaining sample budget before loop/stop evaluation, in bytes
    pub samples: u32,
    /// Channel volume, 0-127
    pub volume: u8,
    /// Playback frequency in Hz, drives the resampling ratio
    pub output_frequency: f64,
    /// Channel is actively producing samples
    pub playing: bool,
    /// Channel enabled by the register-write path
    pub enable: bool,
    /// ADPCM block header (reserved for the compressed decode path)
    pub adpcm_header: u32,
    /// ADPCM step table index (reserved; clamp to 0-88 when decoding)
    pub adpcm_index: i32,
    /// ADPCM running predicted sample (reserved)
    pub adpcm_val: i32,
}

impl Channel {
    /// Create a silent, disabled channel
    pub fn new() -> Self {
        Channel {
            cnt: 0,
            data_src: 0,
            data_pos: 0,
            loop_start: 0,
            length: 0,
            samples: 0,
            volume: 0,
            output_frequency: 0.0,
            playing: false,
            enable: false,
            adpcm_header: 0,
            adpcm_index: 0,
            adpcm_val: 0,
        }
    }

    /// Reset the channel to its power-on state
    pub fn reset(&mut self) {
        *self = Channel::new();
    }

    /// Sample format projected from SOUNDxCNT bits 29-30
    #[inline]
    pub fn format(&self) -> SampleFormat {
        // Masked to 2 bits, so every value maps to a variant
        SampleFormat::from_u32((self.cnt >> 29) & 0x3).unwrap_or(SampleFormat::Pcm8)
    }

    /// Repeat mode projected from SOUNDxCNT bits 27-28
    ///
    /// Returns `None` for the undefined hardware value 3.
    #[inline]
    pub fn loop_mode(&self) -> Option<LoopMode> {
        LoopMode::from_u32((self.cnt >> 27) & 0x3)
    }

    /// Whether the SOUNDxCNT enable bit (bit 31) is set
    #[inline]
    pub fn is_enabled(&self) -> bool {
        CntFlags::from_bits_truncate(self.cnt).contains(CntFlags::ENABLE)
    }

    /// Channel volume as a fraction of full scale (0 stays exactly 0)
    #[inline]
    pub fn volume_fraction(&self) -> f64 {
        if self.volume != 0 {
            f64::from(self.volume) / 127.0
        } else {
            0.0
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}
