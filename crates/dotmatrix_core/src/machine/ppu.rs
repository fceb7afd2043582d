//! Scanline-based pixel processing unit.
//!
//! The PPU walks a fixed 456-cycle line schedule over 154 lines. Visible
//! lines pass through OAM scan, pixel transfer, and horizontal blank;
//! lines 144..=153 are the vertical blank. A whole scanline is rendered at
//! the moment pixel transfer begins, which is when the hardware has locked
//! VRAM and OAM anyway.

use bitflags::bitflags;

pub const FRAME_WIDTH: usize = 160;
pub const FRAME_HEIGHT: usize = 144;

const CYCLES_PER_LINE: u32 = 456;
const OAM_SCAN_CYCLES: u32 = 80;
const PIXEL_TRANSFER_CYCLES: u32 = 172;
const VBLANK_START_LINE: u8 = 144;
const LAST_LINE: u8 = 153;

const OAM_ENTRIES: usize = 40;
const SPRITES_PER_LINE: usize = 10;

/// VBlank request bit in the interrupt-flag register.
const INT_VBLANK: u8 = 0x01;
/// STAT request bit in the interrupt-flag register.
const INT_STAT: u8 = 0x02;

bitflags! {
    /// LCD control register (0xFF40).
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Lcdc: u8 {
        const BG_ENABLE = 0x01;
        const OBJ_ENABLE = 0x02;
        const OBJ_SIZE = 0x04;
        const BG_MAP = 0x08;
        const TILE_DATA = 0x10;
        const WINDOW_ENABLE = 0x20;
        const WINDOW_MAP = 0x40;
        const LCD_ENABLE = 0x80;
    }
}

bitflags! {
    /// Per-sprite attribute byte from OAM.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    struct OamAttrs: u8 {
        const PALETTE = 0x10;
        const FLIP_X = 0x20;
        const FLIP_Y = 0x40;
        const BG_PRIORITY = 0x80;
    }
}

/// STAT mode bits, in hardware encoding.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    PixelTransfer = 3,
}

pub struct Ppu {
    lcdc: Lcdc,
    /// Writable STAT bits (interrupt enables, bits 3..=6).
    stat_enables: u8,
    mode: Mode,
    ly: u8,
    lyc: u8,
    scy: u8,
    scx: u8,
    wy: u8,
    wx: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    line_cycles: u32,
    /// Scanlines land here; swapped into `clean` at VBlank entry.
    working: Box<[u8; FRAME_WIDTH * FRAME_HEIGHT]>,
    /// Last completed frame, stable until the next VBlank.
    clean: Box<[u8; FRAME_WIDTH * FRAME_HEIGHT]>,
    frame_ready: bool,
}

impl Ppu {
    pub fn new() -> Ppu {
        Ppu {
            // Post-boot LCDC: display and background on, unsigned tile data.
            lcdc: Lcdc::LCD_ENABLE | Lcdc::TILE_DATA | Lcdc::BG_ENABLE,
            stat_enables: 0,
            mode: Mode::OamScan,
            ly: 0,
            lyc: 0,
            scy: 0,
            scx: 0,
            wy: 0,
            wx: 0,
            bgp: 0xFC,
            obp0: 0xFF,
            obp1: 0xFF,
            line_cycles: 0,
            working: Box::new([0; FRAME_WIDTH * FRAME_HEIGHT]),
            clean: Box::new([0; FRAME_WIDTH * FRAME_HEIGHT]),
            frame_ready: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    /// The most recently completed frame, one shade index (0..=3) per pixel.
    pub fn frame(&self) -> &[u8; FRAME_WIDTH * FRAME_HEIGHT] {
        &self.clean
    }

    /// True exactly once per completed frame.
    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    /// Advance the line schedule by `cycles` T-cycles.
    pub fn step(&mut self, cycles: u32, vram: &[u8], oam: &[u8], if_reg: &mut u8) {
        if !self.lcdc.contains(Lcdc::LCD_ENABLE) {
            return;
        }

        let mut remaining = cycles;
        while remaining > 0 {
            let boundary = match self.mode {
                Mode::OamScan => OAM_SCAN_CYCLES,
                Mode::PixelTransfer => OAM_SCAN_CYCLES + PIXEL_TRANSFER_CYCLES,
                Mode::HBlank | Mode::VBlank => CYCLES_PER_LINE,
            };

            let take = remaining.min(boundary - self.line_cycles);
            self.line_cycles += take;
            remaining -= take;
            if self.line_cycles < boundary {
                break;
            }

            match self.mode {
                Mode::OamScan => {
                    self.enter_mode(Mode::PixelTransfer, if_reg);
                    self.render_scanline(vram, oam);
                }
                Mode::PixelTransfer => self.enter_mode(Mode::HBlank, if_reg),
                Mode::HBlank => {
                    self.line_cycles = 0;
                    self.set_ly(self.ly + 1, if_reg);
                    if self.ly == VBLANK_START_LINE {
                        self.enter_mode(Mode::VBlank, if_reg);
                        *if_reg |= INT_VBLANK;
                        std::mem::swap(&mut self.working, &mut self.clean);
                        self.frame_ready = true;
                    } else {
                        self.enter_mode(Mode::OamScan, if_reg);
                    }
                }
                Mode::VBlank => {
                    self.line_cycles = 0;
                    if self.ly == LAST_LINE {
                        self.set_ly(0, if_reg);
                        self.enter_mode(Mode::OamScan, if_reg);
                    } else {
                        self.set_ly(self.ly + 1, if_reg);
                    }
                }
            }
        }
    }

    fn enter_mode(&mut self, mode: Mode, if_reg: &mut u8) {
        self.mode = mode;
        let enable_bit = match mode {
            Mode::HBlank => 0x08,
            Mode::VBlank => 0x10,
            Mode::OamScan => 0x20,
            // Pixel transfer has no STAT source.
            Mode::PixelTransfer => 0,
        };
        if self.stat_enables & enable_bit != 0 {
            *if_reg |= INT_STAT;
        }
    }

    fn set_ly(&mut self, value: u8, if_reg: &mut u8) {
        self.ly = value;
        if self.ly == self.lyc && self.stat_enables & 0x40 != 0 {
            *if_reg |= INT_STAT;
        }
    }

    pub fn read_register(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc.bits(),
            0xFF41 => {
                let coincidence = if self.ly == self.lyc { 0x04 } else { 0 };
                0x80 | self.stat_enables | coincidence | self.mode as u8
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    pub fn write_register(&mut self, addr: u16, value: u8) {
        match addr {
            0xFF40 => {
                let was_on = self.lcdc.contains(Lcdc::LCD_ENABLE);
                self.lcdc = Lcdc::from_bits_truncate(value);
                let is_on = self.lcdc.contains(Lcdc::LCD_ENABLE);
                if was_on && !is_on {
                    // Turning the panel off resets the line schedule.
                    self.ly = 0;
                    self.line_cycles = 0;
                    self.mode = Mode::HBlank;
                } else if !was_on && is_on {
                    self.mode = Mode::OamScan;
                }
            }
            0xFF41 => self.stat_enables = value & 0x78,
            0xFF42 => self.scy = value,
            0xFF43 => self.scx = value,
            // LY is read only.
            0xFF44 => {}
            0xFF45 => self.lyc = value,
            0xFF47 => self.bgp = value,
            0xFF48 => self.obp0 = value,
            0xFF49 => self.obp1 = value,
            0xFF4A => self.wy = value,
            0xFF4B => self.wx = value,
            _ => {}
        }
    }

    /// Offset into VRAM of the first byte of a tile's pattern data, honoring
    /// the signed/unsigned addressing mode selected by LCDC bit 4.
    fn tile_addr(&self, index: u8) -> usize {
        if self.lcdc.contains(Lcdc::TILE_DATA) {
            index as usize * 16
        } else {
            (0x1000 + (index as i8 as i32) * 16) as usize
        }
    }

    fn render_scanline(&mut self, vram: &[u8], oam: &[u8]) {
        let mut raw = [0u8; FRAME_WIDTH];
        let mut shades = [0u8; FRAME_WIDTH];

        if self.lcdc.contains(Lcdc::BG_ENABLE) {
            let map_base = if self.lcdc.contains(Lcdc::BG_MAP) {
                0x1C00
            } else {
                0x1800
            };
            let by = self.scy.wrapping_add(self.ly) as usize;
            let row_base = map_base + (by / 8) * 32;
            for (x, (r, s)) in raw.iter_mut().zip(shades.iter_mut()).enumerate() {
                let bx = self.scx.wrapping_add(x as u8) as usize;
                let tile = vram[row_base + bx / 8];
                let addr = self.tile_addr(tile) + (by % 8) * 2;
                let bit = 7 - (bx % 8);
                let color = (((vram[addr + 1] >> bit) & 1) << 1) | ((vram[addr] >> bit) & 1);
                *r = color;
                *s = (self.bgp >> (color * 2)) & 0x03;
            }
        }

        if self.lcdc.contains(Lcdc::WINDOW_ENABLE) && self.ly >= self.wy && self.wx < 167 {
            let map_base = if self.lcdc.contains(Lcdc::WINDOW_MAP) {
                0x1C00
            } else {
                0x1800
            };
            let wy = (self.ly - self.wy) as usize;
            let row_base = map_base + (wy / 8) * 32;
            let start = self.wx.saturating_sub(7) as usize;
            for x in start..FRAME_WIDTH {
                let wx = x + 7 - self.wx as usize;
                let tile = vram[row_base + wx / 8];
                let addr = self.tile_addr(tile) + (wy % 8) * 2;
                let bit = 7 - (wx % 8);
                let color = (((vram[addr + 1] >> bit) & 1) << 1) | ((vram[addr] >> bit) & 1);
                raw[x] = color;
                shades[x] = (self.bgp >> (color * 2)) & 0x03;
            }
        }

        if self.lcdc.contains(Lcdc::OBJ_ENABLE) {
            self.render_sprites(vram, oam, &raw, &mut shades);
        }

        let y = self.ly as usize;
        self.working[y * FRAME_WIDTH..(y + 1) * FRAME_WIDTH].copy_from_slice(&shades);
    }

    fn render_sprites(&self, vram: &[u8], oam: &[u8], raw: &[u8], shades: &mut [u8]) {
        let height: i16 = if self.lcdc.contains(Lcdc::OBJ_SIZE) {
            16
        } else {
            8
        };

        // The hardware keeps the first ten sprites that cover this line, in
        // OAM order.
        let mut visible: Vec<usize> = Vec::with_capacity(SPRITES_PER_LINE);
        for index in 0..OAM_ENTRIES {
            let sprite_y = oam[index * 4] as i16;
            let line = self.ly as i16 + 16 - sprite_y;
            if (0..height).contains(&line) {
                visible.push(index);
                if visible.len() == SPRITES_PER_LINE {
                    break;
                }
            }
        }

        // Lower X wins overlaps; ties go to the lower OAM index. A stable
        // sort keeps ties in OAM order, and drawing back to front lets the
        // winner paint last.
        visible.sort_by_key(|&index| oam[index * 4 + 1]);

        for &index in visible.iter().rev() {
            let base = index * 4;
            let sprite_y = oam[base] as i16;
            let sprite_x = oam[base + 1] as i16;
            let mut tile = oam[base + 2];
            let attrs = OamAttrs::from_bits_truncate(oam[base + 3]);

            if height == 16 {
                // Tall sprites always start on an even tile.
                tile &= 0xFE;
            }

            let mut line = self.ly as i16 + 16 - sprite_y;
            if attrs.contains(OamAttrs::FLIP_Y) {
                line = height - 1 - line;
            }

            let addr = tile as usize * 16 + line as usize * 2;
            let lo = vram[addr];
            let hi = vram[addr + 1];
            let palette = if attrs.contains(OamAttrs::PALETTE) {
                self.obp1
            } else {
                self.obp0
            };

            for px in 0..8i16 {
                let x = sprite_x - 8 + px;
                if !(0..FRAME_WIDTH as i16).contains(&x) {
                    continue;
                }
                let bit = if attrs.contains(OamAttrs::FLIP_X) {
                    px
                } else {
                    7 - px
                };
                let color = (((hi >> bit) & 1) << 1) | ((lo >> bit) & 1);
                // Sprite color 0 is transparent regardless of palette.
                if color == 0 {
                    continue;
                }
                if attrs.contains(OamAttrs::BG_PRIORITY) && raw[x as usize] != 0 {
                    continue;
                }
                shades[x as usize] = (palette >> (color * 2)) & 0x03;
            }
        }
    }
}

impl Default for Ppu {
    fn default() -> Ppu {
        Ppu::new()
    }
}
