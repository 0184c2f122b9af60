use std::fmt::Debug;

use log::debug;
use tokio::sync::oneshot::Sender;

use crate::{Request, Response, poll_request};

/// A service to poll requests from the presentation layer.
pub trait UiService: Debug {
    /// Polls for one pending request and its response channel.
    fn poll(&mut self) -> Option<(Request, Sender<Response>)>;
}

#[derive(Debug, Default)]
pub struct DefaultUiService;

impl UiService for DefaultUiService {
    fn poll(&mut self) -> Option<(Request, Sender<Response>)> {
        let pending = poll_request();
        if let Some((request, _)) = pending.as_ref() {
            debug!(target: "loop", "received request {request:?}");
        }
        pending
    }
}
