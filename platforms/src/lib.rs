use thiserror::Error;

pub mod capture;
pub mod input;

pub type Result<T> = core::result::Result<T, Error>;

/// Platform-specific error.
#[derive(Error, PartialEq, Clone, Debug)]
pub enum Error {
    #[error("key was not sent due to the client not focused or other error")]
    KeyNotSent,
    #[error("mouse was not sent due to the client not focused or other error")]
    MouseNotSent,
    #[error("text was not sent due to the client not focused or other error")]
    TextNotSent,

    #[error("no frame is available yet")]
    FrameUnavailable,
    #[error("the frame size {0}x{1} does not match its buffer")]
    FrameInvalidSize(i32, i32),

    #[error("the game client has disappeared")]
    ClientGone,
}
