use std::fmt::Debug;

use crate::Result;

/// The kind of key the game client understands.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum KeyKind {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    Up,
    Down,
    Left,
    Right,

    Enter,
    Esc,
    Space,
    Tab,
    Shift,
    Ctrl,
    Alt,
    Backspace,
}

impl KeyKind {
    /// Maps a slot index `0..=9` to its digit key.
    pub fn digit(index: usize) -> Option<KeyKind> {
        const DIGITS: [KeyKind; 10] = [
            KeyKind::Zero,
            KeyKind::One,
            KeyKind::Two,
            KeyKind::Three,
            KeyKind::Four,
            KeyKind::Five,
            KeyKind::Six,
            KeyKind::Seven,
            KeyKind::Eight,
            KeyKind::Nine,
        ];

        DIGITS.get(index).copied()
    }

    /// Maps a zero-based page index to its function key (`0` is `F1`).
    pub fn function(index: usize) -> Option<KeyKind> {
        const FUNCTIONS: [KeyKind; 12] = [
            KeyKind::F1,
            KeyKind::F2,
            KeyKind::F3,
            KeyKind::F4,
            KeyKind::F5,
            KeyKind::F6,
            KeyKind::F7,
            KeyKind::F8,
            KeyKind::F9,
            KeyKind::F10,
            KeyKind::F11,
            KeyKind::F12,
        ];

        FUNCTIONS.get(index).copied()
    }
}

/// The kind of mouse action to perform.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MouseKind {
    Move,
    Click,
    /// Moves first and only clicks if the cursor reports a selectable entity underneath.
    ClickVerified,
}

/// The external simulated input executor.
///
/// All methods are fire-and-forget from the caller's point of view. The returned [`Result`] only
/// exists so implementations can report transport failures for logging.
pub trait Emitter: Debug + Send {
    fn send_key_down(&self, kind: KeyKind) -> Result<()>;

    fn send_key_up(&self, kind: KeyKind) -> Result<()>;

    /// Sends a down stroke followed immediately by an up stroke.
    fn send_key(&self, kind: KeyKind) -> Result<()> {
        self.send_key_down(kind)?;
        self.send_key_up(kind)
    }

    /// Sends mouse `kind` to `(x, y)` relative to the captured frame.
    fn send_mouse(&self, x: i32, y: i32, kind: MouseKind) -> Result<()>;

    /// Types raw `text` into the focused control.
    fn send_text(&self, text: &str) -> Result<()>;
}
