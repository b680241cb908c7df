//! NDS APU core
//!
//! Sample generation and mixing for the sixteen sound channels:
//! fractional-address resampling against the host sample rate, additive
//! accumulation of all sixteen channels into a shared i32 buffer (channel 0
//! seeds it), a three-stage volume chain applied to the accumulated value,
//! and loop/stop evaluation at the configured sample-budget boundary.
//!
//! The ADPCM and PSG decode paths are intentionally unimplemented and emit
//! the scaled silence level; the step table is still built so a future
//! decoder slots in without touching reset. Generator quirks (silent
//! channels contribute `-32768 * vol`, the volume factor rescales the whole
//! accumulator on every channel pass) match the observed chip behavior and
//! are kept rather than corrected.

pub mod adpcm;
pub mod channel;

use crate::config::AudioConfig;
use crate::memory::MemorySource;
use adpcm::{build_adpcm_table, ADPCM_TABLE_LEN};
use channel::{Channel, CntFlags, LoopMode, SampleFormat};

/// Number of hardware sound channels
pub const CHANNEL_COUNT: usize = 16;

/// Fixed divisor applied when narrowing the mixed i32 stream to i16
const MIX_DIVISOR: i32 = 16;

/// Silence level contributed by channels that are stopped or undecodable
const SILENCE_LEVEL: f64 = -32768.0;

/// Process-wide engine state shared by the generator and the mixer
#[derive(Debug, Clone, PartialEq)]
pub struct ApuStatus {
    /// Global sound enable flag (register-write path territory)
    pub sound_on: bool,
    /// Stereo output flag (register-write path territory)
    pub stereo: bool,
    /// Output sample rate in samples/sec, sourced from configuration
    pub sample_rate: u32,
    /// System-wide channel volume, 0-127
    pub main_volume: u8,
    /// Global configuration volume, 0-128 (distinct knob from `main_volume`)
    pub channel_master_volume: u8,
    /// IMA-ADPCM step table, rebuilt at reset and read-only afterwards
    pub adpcm_table: [i32; ADPCM_TABLE_LEN],
}

/// The APU engine: sixteen channels plus shared status
///
/// The channel array is owned exclusively by the engine and reached through
/// [`Apu::channel`] / [`Apu::channel_mut`]; cross-thread use goes through
/// whatever lock wraps the whole engine (see the `streaming` module).
#[derive(Debug, Clone, PartialEq)]
pub struct Apu {
    stat: ApuStatus,
    channels: [Channel; CHANNEL_COUNT],
    config: AudioConfig,
    /// Intermediate mix buffer, reused across calls so the audio-thread hot
    /// path never allocates once the buffer size has settled
    scratch: Vec<i32>,
}

impl Apu {
    /// Create a new APU with all channels silent and disabled
    pub fn new(config: &AudioConfig) -> Self {
        let mut apu = Apu {
            stat: ApuStatus {
                sound_on: false,
                stereo: false,
                sample_rate: config.sample_rate,
                main_volume: 0,
                channel_master_volume: config.volume,
                adpcm_table: [0; ADPCM_TABLE_LEN],
            },
            channels: std::array::from_fn(|_| Channel::new()),
            config: *config,
            scratch: Vec::new(),
        };
        apu.reset();
        apu
    }

    /// Reset the APU to its power-on state
    ///
    /// Idempotent: re-zeroes every channel, rebuilds the ADPCM step table
    /// and re-reads sample rate and master volume from the stored
    /// configuration. The hardware boots with main volume 4; the
    /// register-write path raises it afterwards.
    pub fn reset(&mut self) {
        self.stat.sound_on = false;
        self.stat.stereo = false;
        self.stat.sample_rate = self.config.sample_rate;
        self.stat.main_volume = 4;
        self.stat.channel_master_volume = self.config.volume;
        self.stat.adpcm_table = build_adpcm_table();

        for ch in self.channels.iter_mut() {
            ch.reset();
        }
        self.scratch.clear();
    }

    /// Replace the stored configuration
    ///
    /// Takes effect at the next [`Apu::reset`], matching the original
    /// engine's "config is read at reset time" contract.
    pub fn set_config(&mut self, config: &AudioConfig) {
        self.config = *config;
    }

    /// Shared engine status
    pub fn status(&self) -> &ApuStatus {
        &self.stat
    }

    /// Mutable engine status, for the external register-write path
    pub fn status_mut(&mut self) -> &mut ApuStatus {
        &mut self.stat
    }

    /// Borrow a channel by id (panics if `id >= 16`)
    pub fn channel(&self, id: usize) -> &Channel {
        &self.channels[id]
    }

    /// Mutably borrow a channel by id, for the external register-write path
    pub fn channel_mut(&mut self, id: usize) -> &mut Channel {
        &mut self.channels[id]
    }

    /// Composite volume factor for one channel
    ///
    /// Product of the channel volume fraction (exactly 0 when the volume
    /// register is 0), the main volume fraction and the configuration
    /// master volume fraction. Computed once per generation call.
    fn composite_volume(&self, id: usize) -> f64 {
        let mut vol = self.channels[id].volume_fraction();
        vol *= f64::from(self.stat.main_volume) / 127.0;
        vol *= f64::from(self.stat.channel_master_volume) / 128.0;
        vol
    }

    /// Generate one buffer's worth of samples for a single channel
    ///
    /// Accumulates `stream.len()` intermediate samples into `stream`
    /// (channel 0 zero-seeds each slot, later channels add) and advances the
    /// channel's read cursor. A channel that is stopped or out of budget
    /// contributes the scaled silence level instead of reading memory.
    /// Malformed format or repeat-mode values degrade to silence or no-op,
    /// never to an error.
    pub fn generate_channel_samples(
        &mut self,
        mem: &dyn MemorySource,
        stream: &mut [i32],
        id: usize,
    ) {
        let vol = self.composite_volume(id);
        let sample_rate = self.stat.sample_rate;
        let ch = &mut self.channels[id];

        let sample_ratio = ch.output_frequency / f64::from(sample_rate);
        let sample_pos = ch.data_pos;
        // Format and repeat mode are fixed for the whole call
        let format = ch.format();
        let loop_mode = ch.loop_mode();

        let mut samples_played: u32 = 0;

        for (x, slot) in stream.iter_mut().enumerate() {
            // Channel 0 seeds the shared accumulator
            if id == 0 {
                *slot = 0;
            }

            if ch.samples != 0 && ch.playing {
                match format {
                    SampleFormat::Pcm8 => {
                        let data_addr = (f64::from(sample_pos) + sample_ratio * x as f64) as u32;
                        let sample = mem.read_byte(data_addr) as i8;

                        // Scale S8 audio to S16, then rescale the whole
                        // accumulated slot by the composite volume
                        *slot += i32::from(sample) * 256;
                        *slot = (f64::from(*slot) * vol) as i32;

                        if data_addr >= ch.data_src.wrapping_add(ch.samples) {
                            evaluate_loop_boundary(ch, loop_mode, 4);
                        }
                    }

                    SampleFormat::Pcm16 => {
                        let data_addr =
                            ((f64::from(sample_pos) + sample_ratio * x as f64) as u32) & !0x1;
                        let sample = mem.read_u16_fast(data_addr) as i16;

                        *slot += i32::from(sample);
                        *slot = (f64::from(*slot) * vol) as i32;

                        if data_addr >= ch.data_src.wrapping_add(ch.samples) {
                            evaluate_loop_boundary(ch, loop_mode, 2);
                        }
                    }

                    // Decode paths not implemented; emit the silence level
                    SampleFormat::Adpcm | SampleFormat::Psg => {
                        *slot = (f64::from(*slot) + SILENCE_LEVEL * vol) as i32;
                    }
                }

                samples_played += 1;
            } else {
                // Out of samples or not playing
                *slot = (f64::from(*slot) + SILENCE_LEVEL * vol) as i32;
            }
        }

        // Advance the read cursor past everything this call consumed
        match format {
            SampleFormat::Pcm8 => {
                ch.data_pos =
                    (f64::from(ch.data_pos) + sample_ratio * f64::from(samples_played)) as u32;
            }
            SampleFormat::Pcm16 => {
                ch.data_pos = ((f64::from(ch.data_pos)
                    + sample_ratio * f64::from(samples_played))
                    as u32)
                    & !0x1;
            }
            SampleFormat::Adpcm | SampleFormat::Psg => {}
        }
    }

    /// Mix all sixteen channels into `out`
    ///
    /// This is the pull-callback body: generates every channel in id order
    /// into the reused intermediate buffer, then downmixes by dividing each
    /// accumulated value by 16 and narrowing to i16. Runs to completion with
    /// no blocking and no allocation once the scratch buffer matches the
    /// requested length.
    pub fn mix_into(&mut self, mem: &dyn MemorySource, out: &mut [i16]) {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.resize(out.len(), 0);

        for id in 0..CHANNEL_COUNT {
            self.generate_channel_samples(mem, &mut scratch, id);
        }

        for (dst, acc) in out.iter_mut().zip(scratch.iter()) {
            *dst = (acc / MIX_DIVISOR) as i16;
        }

        self.scratch = scratch;
    }
}

/// Apply the channel's repeat policy once the read address crosses
/// `data_src + samples`
///
/// `unit` is the byte scale of the loop registers for the active format
/// (4 for PCM8, 2 for PCM16). An undefined repeat mode does nothing; the
/// channel keeps reading past its nominal end until stopped externally.
fn evaluate_loop_boundary(ch: &mut Channel, loop_mode: Option<LoopMode>, unit: u32) {
    match loop_mode {
        Some(LoopMode::Repeat) => {
            ch.data_src = ch.data_src.wrapping_add(ch.loop_start.wrapping_mul(unit));
            ch.data_pos = ch.data_src;
            ch.samples = ch.length.wrapping_mul(unit);
        }
        Some(LoopMode::OneShot) => {
            ch.playing = false;
            ch.cnt &= !CntFlags::ENABLE.bits();
        }
        Some(LoopMode::Manual) | None => {}
    }
}

/// Pull-based sample producer
///
/// "Fill this buffer with interleaved signed 16-bit samples." Implemented
/// by [`ApuSystem`] and consumed by the host audio binding, which keeps the
/// real-time engine independent of any particular audio API.
pub trait SampleSource: Send {
    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Produce `out.len()` samples, advancing internal playback state
    fn fill(&mut self, out: &mut [i16]);
}

/// An APU paired with its memory source
///
/// The unit handed to the audio device: one `fill` call generates and mixes
/// one buffer across all sixteen channels.
pub struct ApuSystem<M: MemorySource + Send> {
    /// The APU engine
    pub apu: Apu,
    /// The memory the sample streams live in
    pub mem: M,
}

impl<M: MemorySource + Send> ApuSystem<M> {
    /// Pair an APU with a memory source
    pub fn new(apu: Apu, mem: M) -> Self {
        ApuSystem { apu, mem }
    }
}

impl<M: MemorySource + Send> SampleSource for ApuSystem<M> {
    fn sample_rate(&self) -> u32 {
        self.apu.status().sample_rate
    }

    fn fill(&mut self, out: &mut [i16]) {
        self.apu.mix_into(&self.mem, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RamSource;

    const TEST_RATE: u32 = 44_100;

    fn test_apu() -> Apu {
        let config = AudioConfig {
            sample_rate: TEST_RATE,
            volume: 128,
        };
        let mut apu = Apu::new(&config);
        // Full-scale main volume so composite volume reduces to the
        // channel fraction
        apu.status_mut().main_volume = 127;
        apu
    }

    /// Program a channel for PCM8 playback at a 1.0 resampling ratio
    fn program_pcm8(ch: &mut Channel, budget: u32) {
        ch.cnt = CntFlags::ENABLE.bits(); // format 0, repeat mode 0
        ch.data_src = 0;
        ch.data_pos = 0;
        ch.samples = budget;
        ch.volume = 127;
        ch.output_frequency = f64::from(TEST_RATE);
        ch.playing = true;
    }

    #[test]
    fn test_stopped_channel_emits_scaled_silence() {
        let mut apu = test_apu();
        let mem = RamSource::new(16);
        let ch = apu.channel_mut(0);
        ch.volume = 100;
        ch.playing = false;

        let vol = (100.0 / 127.0) * (127.0 / 127.0) * (128.0 / 128.0);
        let expected = (-32768.0 * vol) as i32;

        let mut stream = vec![0i32; 32];
        apu.generate_channel_samples(&mem, &mut stream, 0);
        for (x, &s) in stream.iter().enumerate() {
            assert_eq!(s, expected, "slot {} should hold the silence level", x);
        }
    }

    #[test]
    fn test_zero_budget_channel_emits_silence_without_reading() {
        let mut apu = test_apu();
        let mem = RamSource::new(16);
        let ch = apu.channel_mut(0);
        program_pcm8(ch, 0); // playing, but budget exhausted

        let mut stream = vec![0i32; 8];
        apu.generate_channel_samples(&mem, &mut stream, 0);
        assert!(stream.iter().all(|&s| s == -32768));
        // Cursor must not advance when nothing was played
        assert_eq!(apu.channel(0).data_pos, 0);
    }

    #[test]
    fn test_pcm8_alternating_samples() {
        let mut apu = test_apu();
        let mut mem = RamSource::new(256);
        for x in 0..256u32 {
            let v: i8 = if x % 2 == 0 { 10 } else { -10 };
            mem.write_byte(x, v as u8);
        }
        program_pcm8(apu.channel_mut(0), 256);

        let mut stream = vec![0i32; 64];
        apu.generate_channel_samples(&mem, &mut stream, 0);

        for (x, &s) in stream.iter().enumerate() {
            let expected = if x % 2 == 0 { 2560 } else { -2560 };
            assert_eq!(s, expected, "sample {} mismatch", x);
        }
        // Ratio 1.0: the cursor advances by exactly one byte per sample
        assert_eq!(apu.channel(0).data_pos, 64);
    }

    #[test]
    fn test_pcm16_reads_even_addresses() {
        let mut apu = test_apu();
        let mut mem = RamSource::new(64);
        mem.load(0, &0x1000i16.to_le_bytes());
        mem.load(2, &(-0x1000i16).to_le_bytes());

        let ch = apu.channel_mut(0);
        ch.cnt = CntFlags::ENABLE.bits() | (1 << 29); // PCM16
        ch.samples = 64;
        ch.volume = 127;
        ch.output_frequency = f64::from(TEST_RATE);
        ch.playing = true;

        let mut stream = vec![0i32; 2];
        apu.generate_channel_samples(&mem, &mut stream, 0);
        // x=0 reads address 0, x=1 truncates to address 0 as well
        assert_eq!(stream[0], 0x1000);
        assert_eq!(stream[1], 0x1000);
        // PCM16 advance forces an even cursor
        assert_eq!(apu.channel(0).data_pos % 2, 0);
    }

    #[test]
    fn test_repeat_mode_relocates_and_refills_budget() {
        let mut apu = test_apu();
        let mem = RamSource::new(64);
        let ch = apu.channel_mut(0);
        program_pcm8(ch, 4);
        ch.cnt |= 1 << 27; // repeat
        ch.loop_start = 1;
        ch.length = 2;

        let mut stream = vec![0i32; 6];
        apu.generate_channel_samples(&mem, &mut stream, 0);

        let ch = apu.channel(0);
        assert_eq!(ch.data_src, 4, "loop start is scaled by 4 for PCM8");
        assert_eq!(ch.samples, 8, "budget refills to length * 4 exactly");
        assert!(ch.playing, "repeat mode keeps the channel playing");
    }

    #[test]
    fn test_one_shot_stops_and_clears_enable_bit() {
        let mut apu = test_apu();
        let mem = RamSource::new(64);
        let ch = apu.channel_mut(0);
        program_pcm8(ch, 4);
        ch.cnt |= 2 << 27; // one-shot

        let mut stream = vec![0i32; 8];
        apu.generate_channel_samples(&mem, &mut stream, 0);

        let ch = apu.channel(0);
        assert!(!ch.playing);
        assert!(!ch.is_enabled(), "bit 31 must be cleared on one-shot stop");
        // Remaining slots in the same call fall back to silence
        assert_eq!(stream[6], -32768);
        assert_eq!(stream[7], -32768);

        // Later calls stay silent until re-enabled externally
        let mut stream = vec![0i32; 4];
        apu.generate_channel_samples(&mem, &mut stream, 0);
        assert!(stream.iter().all(|&s| s == -32768));
    }

    #[test]
    fn test_undefined_repeat_mode_keeps_reading() {
        let mut apu = test_apu();
        let mem = RamSource::new(64);
        let ch = apu.channel_mut(0);
        program_pcm8(ch, 4);
        ch.cnt |= 3 << 27; // undefined hardware value

        let mut stream = vec![0i32; 8];
        apu.generate_channel_samples(&mem, &mut stream, 0);

        let ch = apu.channel(0);
        assert!(ch.playing, "undefined repeat mode must not stop the channel");
        assert_eq!(ch.samples, 4, "budget is left untouched");
        assert_eq!(ch.data_pos, 8, "cursor keeps advancing past the end");
    }

    #[test]
    fn test_downmix_restores_constant_value() {
        let mut apu = test_apu();
        let mut mem = RamSource::new(256);
        for x in 0..256u32 {
            mem.write_byte(x, 10);
        }
        for id in 0..CHANNEL_COUNT {
            program_pcm8(apu.channel_mut(id), 256);
        }

        let mut out = vec![0i16; 32];
        apu.mix_into(&mem, &mut out);
        // 16 channels each contributing 2560 divide back to 2560
        assert!(out.iter().all(|&s| s == 2560), "downmix drifted: {:?}", out);
    }

    #[test]
    fn test_mix_into_empty_buffer() {
        let mut apu = test_apu();
        let mem = RamSource::new(16);
        let mut out = vec![0i16; 0];
        apu.mix_into(&mem, &mut out); // must not panic
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut apu = test_apu();
        program_pcm8(apu.channel_mut(3), 128);
        apu.status_mut().sound_on = true;

        apu.reset();
        let once = apu.clone();
        apu.reset();
        assert_eq!(apu, once);
    }

    #[test]
    fn test_reset_rereads_configuration() {
        let mut apu = test_apu();
        apu.set_config(&AudioConfig {
            sample_rate: 32_768,
            volume: 64,
        });
        // New config is latent until reset
        assert_eq!(apu.status().sample_rate, TEST_RATE);
        apu.reset();
        assert_eq!(apu.status().sample_rate, 32_768);
        assert_eq!(apu.status().channel_master_volume, 64);
        assert_eq!(apu.status().main_volume, 4);
    }

    #[test]
    fn test_composite_volume_chain() {
        use approx::assert_relative_eq;

        let mut apu = test_apu();
        apu.status_mut().main_volume = 32;
        apu.status_mut().channel_master_volume = 64;
        apu.channel_mut(5).volume = 64;

        let expected = (64.0 / 127.0) * (32.0 / 127.0) * (64.0 / 128.0);
        assert_relative_eq!(apu.composite_volume(5), expected);
        // A zero volume register short-circuits to exactly 0
        apu.channel_mut(5).volume = 0;
        assert_eq!(apu.composite_volume(5), 0.0);
    }

    #[test]
    fn test_adpcm_format_emits_silence_and_holds_cursor() {
        let mut apu = test_apu();
        let mut mem = RamSource::new(64);
        for x in 0..64u32 {
            mem.write_byte(x, 0x7F);
        }
        let ch = apu.channel_mut(0);
        program_pcm8(ch, 64);
        ch.cnt |= 2 << 29; // ADPCM

        let mut stream = vec![0i32; 8];
        apu.generate_channel_samples(&mem, &mut stream, 0);
        assert!(stream.iter().all(|&s| s == -32768));
        // Undecoded formats do not advance the cursor
        assert_eq!(apu.channel(0).data_pos, 0);
    }

    #[test]
    fn test_apu_system_fill_matches_mix() {
        let mut apu = test_apu();
        let mut mem = RamSource::new(256);
        for x in 0..256u32 {
            mem.write_byte(x, 10);
        }
        program_pcm8(apu.channel_mut(0), 256);

        let mut reference = vec![0i16; 16];
        apu.clone().mix_into(&mem.clone(), &mut reference);

        let mut system = ApuSystem::new(apu, mem);
        assert_eq!(system.sample_rate(), TEST_RATE);
        let mut out = vec![0i16; 16];
        system.fill(&mut out);
        assert_eq!(out, reference);
    }
}
