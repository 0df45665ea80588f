use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use emu::cpu::arm9::Arm9;
use emu::endian::Endianness;
use emu::memory::Memory;

/// 8 KiB stack mapped at the very top of the address space.
const STACK_SIZE: u32 = 8 * 1024;
const STACK_BASE: u32 = 0xFFFF_FFFF - STACK_SIZE + 1;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImageKind {
    /// Raw binary, loaded at virtual address 0 with entry 0.
    B,
    /// 32-bit ELF; segments map per program header.
    E,
}

fn parse_u32_addr(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex address '{s}': {e}"))
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "A tracing interpreter for 32-bit ARM with ARM and Thumb instruction sets"
)]
struct Cli {
    /// Image format
    #[arg(value_enum)]
    mode: ImageKind,

    /// Program image to run
    image: PathBuf,

    /// Step budget: the run ends after this many instructions
    max_steps: u64,

    /// Optional breakpoint address (hex, 0x prefix optional)
    #[arg(value_parser = parse_u32_addr)]
    breakpoint: Option<u32>,

    /// Interpret memory as big-endian regardless of the image
    /// (legacy unconditional byte-swap behavior)
    #[arg(long)]
    big_endian: bool,

    /// Write the final CPU state as JSON to this path
    #[arg(long)]
    state_json: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<()> {
    let endianness = if cli.big_endian {
        Endianness::Big
    } else {
        Endianness::Little
    };
    let mut cpu = Arm9::new(Memory::new(endianness));

    let entry = match cli.mode {
        ImageKind::B => cpu
            .memory
            .load_binary(&cli.image)
            .context("could not load the binary file")?,
        ImageKind::E => {
            let forced = cli.big_endian.then_some(Endianness::Big);
            cpu.memory
                .load_elf(&cli.image, forced)
                .context("could not load the ELF file")?
        }
    };

    if let Some(breakpoint) = cli.breakpoint {
        cpu.break_add(breakpoint);
    }

    // The stack span backs SP but does not initialize it; that is the
    // program's business.
    cpu.memory.create(STACK_BASE, STACK_SIZE);
    cpu.set_pc(entry);
    info!("starting at {entry:#010X}, budget {} steps", cli.max_steps);

    for _ in 0..cli.max_steps {
        if !cpu.step() {
            break;
        }
    }
    println!();

    cpu.dump_regs();
    println!();
    cpu.dump_stack(8);

    if let Some(path) = &cli.state_json {
        let state =
            serde_json::to_string_pretty(&cpu.snapshot()).context("could not encode CPU state")?;
        fs::write(path, state).with_context(|| format!("could not write state to {path:?}"))?;
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("[ERROR]: {error:#}");
            ExitCode::FAILURE
        }
    }
}
