pub mod app;
pub mod cpu;
pub mod machine;

pub use app::ConsoleApp;
pub use machine::cartridge::LoadError;
pub use machine::Console;

/// Logical screen width in pixels for the DMG LCD.
pub const SCREEN_WIDTH: usize = 160;
/// Logical screen height in pixels.
pub const SCREEN_HEIGHT: usize = 144;
/// Default integer scaling factor suggested to frontends.
pub const SCREEN_SCALE: u32 = 4;
