//! LS-8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `ls8-emu run <program>` - Run an `.ls8` image or `.asm` source
//! - `ls8-emu debug <program>` - Interactive debugger
//! - `ls8-emu asm <source>` - Assemble to an `.ls8` image
//! - `ls8-emu disasm <program>` - Disassemble an `.ls8` image

use clap::{Parser, Subcommand};
use ls8::error::exit_code;
use ls8::{Cpu, Error, LineOutput, MachineConfig};
use std::path::Path;

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version)]
#[command(about = "An emulator for the LS-8 8-bit computer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the .ls8 image or .asm source to execute
        program: String,
        /// Give up after this many cycles (default: run until HLT)
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Print a trace line to stderr before every instruction
        #[arg(short, long)]
        trace: bool,
        #[command(flatten)]
        machine: MachineArgs,
        /// Write the final machine snapshot as JSON
        #[arg(long)]
        dump_state: Option<String>,
    },
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the .ls8 image or .asm source to debug
        program: String,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Assemble source to an .ls8 image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble an .ls8 image to readable text
    Disasm {
        /// Path to the image file
        program: String,
    },
}

/// Machine configuration flags. Flags win over the config file.
#[derive(clap::Args)]
struct MachineArgs {
    /// JSON machine configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// Number of memory cells (1-256)
    #[arg(long)]
    memory_size: Option<usize>,
    /// Lowest address the stack may grow into
    #[arg(long)]
    stack_floor: Option<usize>,
    /// Keep stale condition flags across CMP
    #[arg(long)]
    sticky_flags: bool,
}

impl MachineArgs {
    fn resolve(&self) -> Result<MachineConfig, Error> {
        let mut config = match &self.config {
            Some(path) => MachineConfig::load(path)?,
            None => MachineConfig::default(),
        };

        if let Some(size) = self.memory_size {
            config.memory_size = size;
        }
        if let Some(floor) = self.stack_floor {
            config.stack_floor = Some(floor);
        }
        if self.sticky_flags {
            config.flag_mode = ls8::cpu::FlagMode::Sticky;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { program, max_cycles, trace, machine, dump_state } => {
            run_program(&program, max_cycles, trace, &machine, dump_state.as_deref())
        }
        #[cfg(feature = "tui")]
        Commands::Debug { program, machine } => debug_program(&program, &machine),
        Commands::Asm { source, output } => assemble_file(&source, output),
        Commands::Disasm { program } => disassemble_file(&program),
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(e.exit_code());
    }
    std::process::exit(exit_code::SUCCESS);
}

/// Load program bytes, assembling `.asm` sources on the fly.
fn load_program_bytes(path: &str) -> Result<Vec<u8>, Error> {
    if Path::new(path).extension().and_then(|ext| ext.to_str()) == Some("asm") {
        let source = ls8::program::read_source(path)?;
        let bytes = ls8::assemble(&source)?;
        log::info!("Assembled {} bytes from {}", bytes.len(), path);
        Ok(bytes)
    } else {
        Ok(ls8::load_image(path)?.bytes)
    }
}

fn run_program(
    path: &str,
    max_cycles: Option<u64>,
    trace: bool,
    machine: &MachineArgs,
    dump_state: Option<&str>,
) -> Result<(), Error> {
    let program = load_program_bytes(path)?;

    let mut cpu = Cpu::with_config(machine.resolve()?)?;
    cpu.load_program(&program)?;

    let stdout = std::io::stdout();
    let mut out = LineOutput::new(stdout.lock());

    let result = match (trace, max_cycles) {
        (true, _) => run_traced(&mut cpu, &mut out, max_cycles),
        (false, Some(max)) => cpu.run_limited(&mut out, max).map(|_| ()),
        (false, None) => cpu.run(&mut out).map(|_| ()),
    };

    if let Some(dump_path) = dump_state {
        let json = serde_json::to_string_pretty(&cpu.snapshot())
            .map_err(|e| Error::Io(e.to_string()))?;
        std::fs::write(dump_path, json)?;
    }

    result?;
    match max_cycles {
        Some(max) if cpu.is_running() => {
            log::warn!("Reached max cycles limit ({}), stopping", max);
            Err(Error::CycleLimit(max))
        }
        _ => Ok(()),
    }
}

fn run_traced(cpu: &mut Cpu, out: &mut dyn ls8::Output, max_cycles: Option<u64>) -> Result<(), ls8::CpuError> {
    let mut cycles = 0u64;
    while cpu.is_running() && max_cycles.map_or(true, |max| cycles < max) {
        eprintln!("{}", cpu.snapshot());
        cpu.step(out)?;
        cycles += 1;
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, machine: &MachineArgs) -> Result<(), Error> {
    let program = load_program_bytes(path)?;
    let config = machine.resolve()?;

    ls8::run_debugger(program, config)
}

fn assemble_file(source_path: &str, output: Option<String>) -> Result<(), Error> {
    let out_path = output.unwrap_or_else(|| {
        Path::new(source_path)
            .with_extension(ls8::program::image::IMAGE_EXTENSION)
            .display()
            .to_string()
    });

    let source = ls8::program::read_source(source_path)?;
    let image = ls8::program::assemble_image(&source)?;
    ls8::save_image(&out_path, &image)?;

    eprintln!("✓ Assembled {} bytes: {} → {}", image.len(), source_path, out_path);
    Ok(())
}

fn disassemble_file(path: &str) -> Result<(), Error> {
    let image = ls8::load_image(path)?;
    println!("{}", ls8::disassemble(&image.bytes));
    Ok(())
}
