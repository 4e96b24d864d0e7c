use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use quartz_core::core::ClockMode;
use quartz_machines::Z80System;

mod emulator;
mod error;
mod logger;
mod program_path;
mod settings;

use error::FrontendError;
use settings::Settings;

/// Run a Z80 program headless and report what it did.
#[derive(Debug, Parser)]
#[command(name = "quartz", version)]
struct Cli {
    /// Raw program image, or a ZIP archive containing one.
    program: PathBuf,

    /// Settings file [default: <config dir>/quartz/settings.toml]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Archive entry to load when PROGRAM is a ZIP.
    #[arg(long)]
    entry: Option<String>,

    /// Frames to run.
    #[arg(long)]
    frames: Option<u64>,

    /// CPU clock: 4mhz or 8mhz.
    #[arg(long)]
    clock: Option<ClockMode>,

    /// Load address, hex (e.g. 0x0100).
    #[arg(long, value_parser = parse_hex_u16)]
    load_address: Option<u16>,

    /// Fail unless the program image has this CRC32 (hex).
    #[arg(long, value_parser = parse_hex_u32)]
    crc32: Option<u32>,

    /// Hold each frame to the video refresh period.
    #[arg(long)]
    realtime: bool,

    /// Disable idle-loop fast-forward.
    #[arg(long)]
    no_idle: bool,

    /// Trace up to N instructions at trace level on the `cpu` target.
    #[arg(long, value_name = "N")]
    trace: Option<u64>,

    /// Log filter, e.g. `info` or `warn,cpu=debug`. Falls back to RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid checksum {s:?}: {e}"))
}

/// Fold command-line overrides into the loaded settings.
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(frames) = cli.frames {
        settings.run.frames = frames;
    }
    if let Some(clock) = cli.clock {
        settings.cpu.clock_mode = clock;
    }
    if let Some(addr) = cli.load_address {
        settings.machine.load_address = addr;
    }
    if cli.realtime {
        settings.run.realtime = true;
    }
    if cli.no_idle {
        settings.cpu.idle.enabled = false;
    }
    if let Some(max_entries) = cli.trace {
        settings.cpu.trace.enabled = true;
        settings.cpu.trace.max_entries = max_entries;
    }
}

fn run(cli: &Cli) -> Result<(), FrontendError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_overrides(&mut settings, cli);

    let image = program_path::load_program(
        &cli.program,
        cli.entry.as_deref(),
        settings.machine.load_address,
    )?;
    if let Some(expected) = cli.crc32 {
        image.verify(expected)?;
    }

    let mut system = Z80System::new(settings.machine.clone(), settings.cpu.clone())?;
    system.load_program(&image)?;

    let summary = emulator::run(&mut system, settings.run.frames, settings.run.realtime);
    println!("{summary}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter_spec = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());
    match filter_spec.parse() {
        Ok(filter) => {
            if let Err(e) = logger::init(filter) {
                eprintln!("Warning: {e}");
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
