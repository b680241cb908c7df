//! Demo binary: programs two looping PCM8 voices and either renders the
//! mixed output to a WAV file or (with `--features streaming`) plays it on
//! the system audio device.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use nds_apu::{Apu, ApuSystem, AudioConfig, CntFlags, RamSource};

/// Single-cycle wavetable length in bytes
const WAVE_LEN: u32 = 128;

struct Args {
    config_path: Option<PathBuf>,
    out_path: PathBuf,
    seconds: f64,
    play: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_path: None,
        out_path: PathBuf::from("out.wav"),
        seconds: 2.0,
        play: false,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config requires a file path")?;
                args.config_path = Some(PathBuf::from(path));
            }
            "--out" => {
                let path = iter.next().context("--out requires a file path")?;
                args.out_path = PathBuf::from(path);
            }
            "--seconds" => {
                let value = iter.next().context("--seconds requires a number")?;
                args.seconds = value
                    .parse()
                    .with_context(|| format!("bad --seconds value: {value}"))?;
            }
            "--play" => args.play = true,
            "--help" | "-h" => {
                println!(
                    "Usage: nds-apu [--config FILE] [--out FILE.wav] [--seconds N] [--play]"
                );
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    Ok(args)
}

/// Fill memory with two single-cycle PCM8 wavetables: a square at 0x0000
/// and a sine at 0x1000
fn build_demo_memory() -> RamSource {
    let mut mem = RamSource::new(0x10000);

    for i in 0..WAVE_LEN {
        let square: i8 = if i < WAVE_LEN / 2 { 100 } else { -100 };
        mem.write_byte(i, square as u8);

        let phase = f64::from(i) / f64::from(WAVE_LEN) * std::f64::consts::TAU;
        let sine = (phase.sin() * 100.0) as i8;
        mem.write_byte(0x1000 + i, sine as u8);
    }

    mem
}

/// Program two repeat-mode PCM8 voices the way the register-write path
/// would: a 440 Hz square and a 220 Hz sine one octave below
fn program_demo_channels(apu: &mut Apu) {
    apu.status_mut().main_volume = 127;

    let byte_rate = |tone_hz: f64| tone_hz * f64::from(WAVE_LEN);

    let ch = apu.channel_mut(0);
    ch.cnt = CntFlags::ENABLE.bits() | (1 << 27); // PCM8, repeat
    ch.data_src = 0;
    ch.data_pos = 0;
    ch.loop_start = 0;
    ch.length = WAVE_LEN / 4;
    ch.samples = WAVE_LEN;
    ch.volume = 127;
    ch.output_frequency = byte_rate(440.0);
    ch.playing = true;
    ch.enable = true;

    let ch = apu.channel_mut(1);
    ch.cnt = CntFlags::ENABLE.bits() | (1 << 27);
    ch.data_src = 0x1000;
    ch.data_pos = 0x1000;
    ch.loop_start = 0;
    ch.length = WAVE_LEN / 4;
    ch.samples = WAVE_LEN;
    ch.volume = 80;
    ch.output_frequency = byte_rate(220.0);
    ch.playing = true;
    ch.enable = true;
}

#[cfg(feature = "streaming")]
fn play_live(config: &AudioConfig, mem: RamSource, seconds: f64) -> Result<()> {
    use nds_apu::PlaybackEngine;

    let mut engine = PlaybackEngine::new(config, mem);
    program_demo_channels(&mut engine.system().lock().apu);

    engine.init().context("could not initialize audio")?;
    println!("Playing for {seconds:.1}s ...");
    std::thread::sleep(std::time::Duration::from_secs_f64(seconds));
    engine.shutdown();
    Ok(())
}

#[cfg(not(feature = "streaming"))]
fn play_live(_config: &AudioConfig, _mem: RamSource, _seconds: f64) -> Result<()> {
    bail!("live playback requires the \"streaming\" feature; rebuild with `--features streaming`")
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let config = match &args.config_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("could not read config {}", path.display()))?;
            AudioConfig::from_json(&json)?
        }
        None => AudioConfig::default(),
    };
    config.validate()?;

    let mem = build_demo_memory();

    if args.play {
        return play_live(&config, mem, args.seconds);
    }

    let mut apu = Apu::new(&config);
    program_demo_channels(&mut apu);
    let mut system = ApuSystem::new(apu, mem);

    nds_apu::render_wav(&mut system, &args.out_path, args.seconds)?;
    println!(
        "Rendered {:.1}s at {} Hz to {}",
        args.seconds,
        config.sample_rate,
        args.out_path.display()
    );
    Ok(())
}
