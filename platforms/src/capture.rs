use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{Error, Result};

/// Number of bytes per pixel of a [`Frame`].
pub const BYTES_PER_PIXEL: usize = 4;

/// A raw BGRA frame captured from the game client.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: i32,
    pub height: i32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Creates a [`Frame`] checking `data` holds exactly `width * height` BGRA pixels.
    pub fn new(width: i32, height: i32, data: Vec<u8>) -> Result<Self> {
        let expected = width.max(0) as usize * height.max(0) as usize * BYTES_PER_PIXEL;
        if width <= 0 || height <= 0 || data.len() != expected {
            return Err(Error::FrameInvalidSize(width, height));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }
}

/// A source of the latest captured frame.
pub trait FrameSource: fmt::Debug + Send {
    /// Takes the latest frame if one has arrived since the last call.
    ///
    /// Returns [`Error::FrameUnavailable`] when nothing new arrived, which is not a fault.
    fn latest_frame(&mut self) -> Result<Frame>;
}

/// Acknowledgement invoked once a pushed frame leaves the slot, either by being taken or by
/// being overwritten.
pub type Ack = Box<dyn FnOnce() + Send>;

type Slot = Option<(Frame, Option<Ack>)>;

/// A single-slot, latest-wins frame buffer shared between a producer and the tick loop.
///
/// Cloning gives another handle to the same slot.
#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<Slot>>,
    closed: Arc<AtomicBool>,
}

impl fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSlot")
            .field("has_frame", &self.has_frame())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl FrameSlot {
    /// Pushes `frame` without acknowledgement.
    pub fn push(&self, frame: Frame) {
        self.push_with_ack(frame, None);
    }

    /// Pushes `frame`, replacing any frame that was not consumed yet.
    ///
    /// The replaced frame's acknowledgement is still fired so the producer never stalls.
    pub fn push_with_ack(&self, frame: Frame, ack: Option<Ack>) {
        let dropped = self
            .inner
            .lock()
            .map(|mut slot| slot.replace((frame, ack)))
            .unwrap_or_default();
        if let Some((_, Some(ack))) = dropped {
            ack();
        }
    }

    /// Marks the producer as gone.
    ///
    /// A frame still waiting can be taken. After that the slot reports [`Error::ClientGone`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether a frame is waiting to be taken.
    pub fn has_frame(&self) -> bool {
        self.inner.lock().is_ok_and(|slot| slot.is_some())
    }

    fn take(&self) -> Option<Frame> {
        let (frame, ack) = self.inner.lock().ok()?.take()?;
        if let Some(ack) = ack {
            ack();
        }
        Some(frame)
    }
}

impl FrameSource for FrameSlot {
    fn latest_frame(&mut self) -> Result<Frame> {
        match self.take() {
            Some(frame) => Ok(frame),
            None if self.closed.load(Ordering::Acquire) => Err(Error::ClientGone),
            None => Err(Error::FrameUnavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    fn frame(width: i32) -> Frame {
        Frame::new(width, 1, vec![0; width as usize * BYTES_PER_PIXEL]).unwrap()
    }

    #[test]
    fn frame_new_rejects_mismatched_buffer() {
        assert_eq!(
            Frame::new(2, 2, vec![0; 3]).unwrap_err(),
            Error::FrameInvalidSize(2, 2)
        );
        assert!(Frame::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn frame_slot_empty_is_unavailable() {
        let mut slot = FrameSlot::default();

        assert_eq!(slot.latest_frame().unwrap_err(), Error::FrameUnavailable);
    }

    #[test]
    fn frame_slot_latest_wins_and_acks_dropped() {
        let acks = Arc::new(AtomicU32::new(0));
        let mut slot = FrameSlot::default();
        let producer = slot.clone();

        for width in 1..=3 {
            let acks = acks.clone();
            producer.push_with_ack(
                frame(width),
                Some(Box::new(move || {
                    acks.fetch_add(1, Ordering::SeqCst);
                })),
            );
        }
        assert_eq!(acks.load(Ordering::SeqCst), 2);

        let latest = slot.latest_frame().unwrap();
        assert_eq!(latest.width, 3);
        assert_eq!(acks.load(Ordering::SeqCst), 3);
        assert!(!slot.has_frame());
        assert!(slot.latest_frame().is_err());
    }

    #[test]
    fn closed_frame_slot_drains_then_reports_client_gone() {
        let mut slot = FrameSlot::default();
        let producer = slot.clone();
        producer.push(frame(1));
        producer.close();

        assert_eq!(slot.latest_frame().unwrap().width, 1);
        assert_eq!(slot.latest_frame().unwrap_err(), Error::ClientGone);
    }
}
