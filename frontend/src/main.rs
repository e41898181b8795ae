use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tickwork_core::core::machine::Machine;
use tickwork_machines::registry;
use tickwork_machines::rom_loader::RomSet;

mod config;
mod input;
mod program;
mod render;
mod rom_path;

use config::Config;
use input::TypedKeys;
use program::Program;

/// Headless runner: boots a machine, runs it for a number of frames and
/// prints the screen.
#[derive(Debug, Parser)]
#[command(name = "tickwork", version)]
struct Cli {
    /// Machine to run; omit to list the available ones.
    machine: Option<String>,

    /// ZIP file, rompath directory or loose ROM directory.
    #[arg(long)]
    rom_path: Option<PathBuf>,

    /// Frames to run.
    #[arg(long)]
    frames: Option<u32>,

    /// Pixels per text column when printing a graphics screen.
    #[arg(long)]
    scale: Option<u32>,

    /// Print the screen every N frames as well as at the end.
    #[arg(long, value_name = "N")]
    print_every: Option<u32>,

    /// Program image to quickload after boot (.kcc or raw binary).
    #[arg(long, value_name = "FILE")]
    load: Option<PathBuf>,

    #[arg(long, value_parser = program::parse_addr)]
    load_addr: Option<u16>,

    /// Jump here after loading.
    #[arg(long, value_parser = program::parse_addr)]
    start: Option<u16>,

    /// Frames to run before loading, so the OS can boot.
    #[arg(long, default_value_t = 50)]
    boot_frames: u32,

    /// Save the final frame as PNG.
    #[arg(long, value_name = "FILE")]
    screenshot: Option<PathBuf>,

    /// Keys to type, see `{Name}` and `\n` escapes.
    #[arg(long = "type", value_name = "KEYS")]
    type_keys: Option<String>,

    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the next instruction to stderr after every frame.
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tickwork: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::load(cli.config.as_deref())?;

    let Some(machine_name) = cli.machine.as_deref() else {
        for entry in registry::all() {
            println!("{:<12} {}", entry.name, entry.description);
        }
        return Ok(());
    };
    let entry = registry::find(machine_name).ok_or_else(|| {
        let names: Vec<_> = registry::all().iter().map(|e| e.name).collect();
        format!("unknown machine {machine_name:?}, available: {}", names.join(", "))
    })?;

    let rom_set = match cli.rom_path.as_deref().or(config.rom_path_for(entry.name)) {
        Some(path) => rom_path::load_rom_set(entry.rom_name, path)?,
        None => {
            log::info!("no rom path for {}, starting without ROMs", entry.name);
            RomSet::default()
        }
    };
    let mut machine = (entry.create)(&rom_set)?;

    let frames = cli.frames.unwrap_or(config.frames);
    let scale = cli.scale.unwrap_or(config.scale);
    let frame_micros = (1_000_000.0 / machine.frame_rate_hz()).round() as u32;
    let mut typed = match &cli.type_keys {
        Some(text) => TypedKeys::new(input::parse_keys(text, machine.input_map())?),
        None => TypedKeys::default(),
    };

    if let Some(path) = &cli.load {
        let program = Program::load(path, cli.load_addr, cli.start)?;
        for _ in 0..cli.boot_frames {
            machine.exec(frame_micros);
        }
        machine.quickload(&program.data, program.load_addr, program.start)?;
        log::info!(
            "loaded {:?}, {} bytes at {:#06X}",
            program.name,
            program.data.len(),
            program.load_addr
        );
    }

    let (width, height) = machine.display_size();
    let mut framebuffer = vec![0u8; (width * height * 3) as usize];
    for frame in 1..=frames {
        typed.tick(machine.as_mut());
        machine.exec(frame_micros);
        if cli.trace {
            if let Some(line) = machine.trace_line() {
                eprintln!("{frame:>6}  {line}");
            }
        }
        if cli.print_every.is_some_and(|n| n > 0 && frame % n == 0 && frame != frames) {
            print_screen(machine.as_mut(), &mut framebuffer, scale);
            println!("--- frame {frame}");
        }
    }
    if !typed.is_done() {
        log::warn!("ran out of frames before all keys were typed");
    }
    print_screen(machine.as_mut(), &mut framebuffer, scale);

    if let Some(path) = &cli.screenshot {
        if width == 0 || height == 0 {
            log::warn!("{} has no display, no screenshot taken", entry.name);
        } else {
            machine.render_frame(&mut framebuffer);
            render::save_screenshot(&framebuffer, width, height, path)?;
        }
    }
    Ok(())
}

/// Text machines print their characters, graphics machines an ASCII
/// approximation of the frame.
fn print_screen(machine: &mut dyn Machine, framebuffer: &mut [u8], scale: u32) {
    if let Some(text) = machine.text_screen() {
        println!("{text}");
        return;
    }
    let (width, height) = machine.display_size();
    if width == 0 || height == 0 {
        return;
    }
    machine.render_frame(framebuffer);
    print!("{}", render::ascii_frame(framebuffer, width, height, scale));
}
