use std::path::PathBuf;

use anyhow::{Context, Result};
use dotmatrix_core::{Console, SCREEN_HEIGHT, SCREEN_WIDTH};

const DEFAULT_FRAMES: u32 = 120;

/// Grayscale levels for the four DMG shades, lightest first.
const SHADE_LEVELS: [u8; 4] = [0xFF, 0xAA, 0x55, 0x00];

fn usage() -> ! {
    eprintln!("Usage: dotmatrix <rom_path> <out_pgm_path> [frames]");
    std::process::exit(2);
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (rom_path, out_path) = match (args.next(), args.next()) {
        (Some(rom), Some(out)) => (PathBuf::from(rom), PathBuf::from(out)),
        _ => usage(),
    };
    let frames: u32 = match args.next() {
        Some(arg) => arg.parse().context("invalid frame count")?,
        None => DEFAULT_FRAMES,
    };

    let rom = std::fs::read(&rom_path)
        .with_context(|| format!("failed to read ROM '{}'", rom_path.display()))?;
    let mut console = Console::new(rom)
        .with_context(|| format!("cannot load '{}'", rom_path.display()))?;

    for frame in 0..frames {
        console.step_frame();
        if console.is_locked() {
            log::warn!("CPU locked up during frame {frame}; dumping what we have");
            break;
        }
    }

    // Binary PGM: one gray byte per pixel.
    let mut image = Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT + 32);
    image.extend_from_slice(format!("P5\n{SCREEN_WIDTH} {SCREEN_HEIGHT}\n255\n").as_bytes());
    image.extend(
        console
            .frame()
            .iter()
            .map(|&shade| SHADE_LEVELS[(shade & 0x03) as usize]),
    );

    std::fs::write(&out_path, &image)
        .with_context(|| format!("failed to write '{}'", out_path.display()))?;

    println!(
        "Wrote {}x{} pgm after {} frames to '{}'",
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        frames,
        out_path.display()
    );
    Ok(())
}
