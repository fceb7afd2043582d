pub mod app;
pub mod key;

/// RGBA color used when converting an emulator framebuffer for display.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::new_rgb(0, 0, 0);
    pub const WHITE: Color = Color::new_rgb(255, 255, 255);

    /// Classic DMG green-tinted shades, lightest to darkest. Index with a
    /// 2-bit shade value from the core's framebuffer.
    pub const DMG_SHADES: [Color; 4] = [
        Color::new_rgb(0xE0, 0xF8, 0xD0),
        Color::new_rgb(0x88, 0xC0, 0x70),
        Color::new_rgb(0x34, 0x68, 0x56),
        Color::new_rgb(0x08, 0x18, 0x20),
    ];

    #[inline]
    pub const fn new_rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 0xff }
    }

    #[inline]
    pub const fn new_rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }
}
