use std::{fmt::Debug, sync::Arc};

use log::info;
use tokio::sync::broadcast::{Receiver, error::TryRecvError};

use crate::{DatabaseEvent, Settings, database_event_receiver};

/// A service owning the settings snapshot read by the main loop.
///
/// This is the only writer. Readers take the [`Arc`] once at tick start.
pub trait SettingsService: Debug {
    /// Applies settings persisted from elsewhere since the last poll.
    fn poll(&mut self);

    /// The current settings snapshot.
    fn settings(&self) -> Arc<Settings>;

    /// Replaces the current snapshot.
    fn update(&mut self, settings: Settings);
}

#[derive(Debug)]
pub struct DefaultSettingsService {
    settings: Arc<Settings>,
    database_event_rx: Receiver<DatabaseEvent>,
}

impl DefaultSettingsService {
    pub fn new(settings: Settings) -> Self {
        Self::with_receiver(settings, database_event_receiver())
    }

    fn with_receiver(settings: Settings, database_event_rx: Receiver<DatabaseEvent>) -> Self {
        Self {
            settings: Arc::new(settings),
            database_event_rx,
        }
    }
}

impl SettingsService for DefaultSettingsService {
    fn poll(&mut self) {
        loop {
            match self.database_event_rx.try_recv() {
                Ok(DatabaseEvent::SettingsUpdated(settings)) => self.update(settings),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    #[inline]
    fn settings(&self) -> Arc<Settings> {
        self.settings.clone()
    }

    fn update(&mut self, settings: Settings) {
        info!(target: "loop", "settings updated");
        self.settings = Arc::new(settings);
    }
}
