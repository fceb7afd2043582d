/// Host keys a frontend can report to an emulator app.
///
/// This is intentionally a small, frontend-neutral set; each machine maps
/// the subset it cares about onto its own controls.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    A,
    S,
    Z,
    X,
    Enter,
    Space,
    Escape,
}
