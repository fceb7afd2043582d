//! The emulated console: bus, cartridge mappers, pixel unit, and the
//! top-level [`Console`] that wires them to the CPU core.

mod bus;
pub mod cartridge;
mod console;
mod ppu;


pub use bus::SystemBus;
pub use console::Console;
pub use ppu::{Ppu, FRAME_HEIGHT, FRAME_WIDTH};

/// Size of one switchable ROM bank.
pub const ROM_BANK_SIZE: usize = 0x4000;
/// Size of one switchable external RAM bank.
pub const RAM_BANK_SIZE: usize = 0x2000;
