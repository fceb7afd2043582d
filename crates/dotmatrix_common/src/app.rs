use crate::key::Key;

/// Frontend-facing application contract.
///
/// A presentation layer (window, audio, input) drives an emulator through
/// this trait without knowing anything about the machine behind it: it calls
/// `update` once per host frame with an RGB24 buffer to fill and forwards
/// key events as they arrive.
pub trait App {
    fn init(&mut self);
    fn update(&mut self, screen: &mut [u8]);
    fn handle_key_event(&mut self, key: Key, is_down: bool);
    fn should_exit(&self) -> bool;
    fn exit(&mut self);

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn scale(&self) -> u32;
    fn title(&self) -> String;
}
