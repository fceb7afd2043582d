use crate::machine::Console;
use crate::{SCREEN_HEIGHT, SCREEN_SCALE, SCREEN_WIDTH};
use dotmatrix_common::app::App;
use dotmatrix_common::key::Key;
use dotmatrix_common::Color;

/// Frontend-facing wrapper around a [`Console`].
///
/// Implements the shared `App` trait so any presentation layer can drive the
/// machine: one `update` call runs one frame and paints the RGB24 buffer from
/// the console's shade framebuffer.
pub struct ConsoleApp {
    console: Console,
    should_exit: bool,
    frame_counter: u64,
    last_pc: u16,
    pc_stagnant_frames: u32,
}

impl ConsoleApp {
    pub fn new(console: Console) -> ConsoleApp {
        ConsoleApp {
            console,
            should_exit: false,
            frame_counter: 0,
            last_pc: 0,
            pc_stagnant_frames: 0,
        }
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }
}

impl App for ConsoleApp {
    fn init(&mut self) {
        log::info!("console init");
        self.last_pc = self.console.registers().pc;
    }

    fn update(&mut self, screen: &mut [u8]) {
        self.console.step_frame();

        for (pixel, shade) in screen.chunks_exact_mut(3).zip(self.console.frame().iter()) {
            let color = Color::DMG_SHADES[(*shade & 0x03) as usize];
            pixel[0] = color.r;
            pixel[1] = color.g;
            pixel[2] = color.b;
        }

        self.frame_counter = self.frame_counter.wrapping_add(1);

        let pc = self.console.registers().pc;
        if pc == self.last_pc {
            self.pc_stagnant_frames = self.pc_stagnant_frames.saturating_add(1);
        } else {
            self.pc_stagnant_frames = 0;
            self.last_pc = pc;
        }

        if self.frame_counter == 1 || self.frame_counter % 60 == 0 {
            let regs = self.console.registers();
            log::info!(
                "frame={} pc=0x{:04X} sp=0x{:04X} af=0x{:04X} bc=0x{:04X} de=0x{:04X} hl=0x{:04X} cycles={} locked={}",
                self.frame_counter,
                regs.pc,
                regs.sp,
                regs.af(),
                regs.bc(),
                regs.de(),
                regs.hl(),
                self.console.cycles(),
                self.console.is_locked(),
            );
        }

        if self.pc_stagnant_frames == 600 {
            log::warn!(
                "PC unchanged for ~600 frames at 0x{:04X} (locked={})",
                pc,
                self.console.is_locked(),
            );
        }
    }

    fn handle_key_event(&mut self, key: Key, is_pressed: bool) {
        log::debug!("key event: {:?} pressed={}", key, is_pressed);
        match key {
            Key::Escape => {
                if is_pressed {
                    self.should_exit = true;
                }
            }
            _ => self.console.button_event(is_pressed),
        }
    }

    fn should_exit(&self) -> bool {
        self.should_exit
    }

    fn exit(&mut self) {
        log::info!("console exit");
    }

    fn width(&self) -> u32 {
        SCREEN_WIDTH as u32
    }

    fn height(&self) -> u32 {
        SCREEN_HEIGHT as u32
    }

    fn scale(&self) -> u32 {
        SCREEN_SCALE
    }

    fn title(&self) -> String {
        "DotMatrix".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

    fn blank_console() -> Console {
        // Smallest valid image: two banks of NOPs with a plain-ROM header.
        let mut rom = vec![0u8; 0x8000];
        rom[0x0147] = 0x00;
        rom[0x0148] = 0x00;
        rom[0x0149] = 0x00;
        Console::new(rom).unwrap()
    }

    #[test]
    fn update_paints_the_rgb_buffer() {
        let mut app = ConsoleApp::new(blank_console());
        app.init();
        let mut screen = vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT * 3];
        app.update(&mut screen);

        // Every pixel is one of the four hardware shades.
        let shades: Vec<[u8; 3]> = Color::DMG_SHADES.iter().map(|c| [c.r, c.g, c.b]).collect();
        assert!(screen
            .chunks_exact(3)
            .all(|px| shades.iter().any(|s| s == px)));
    }

    #[test]
    fn escape_requests_exit_and_buttons_reach_the_console() {
        let mut app = ConsoleApp::new(blank_console());
        assert!(!app.should_exit());
        app.handle_key_event(Key::Z, true);
        app.handle_key_event(Key::Escape, true);
        assert!(app.should_exit());
    }

    #[test]
    fn reports_screen_geometry() {
        let app = ConsoleApp::new(blank_console());
        assert_eq!(app.width(), 160);
        assert_eq!(app.height(), 144);
        assert!(app.scale() >= 1);
    }
}
