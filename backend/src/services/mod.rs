use std::sync::Arc;

use tokio::sync::oneshot::Sender;

use crate::{
    Request, Response, Settings,
    ecs::{Resources, World},
    services::{
        operation::{DefaultOperationService, OperationService},
        settings::{DefaultSettingsService, SettingsService},
        status::{DefaultStatusService, StatusService},
        ui::{DefaultUiService, UiService},
    },
    snapshot::Snapshot,
};

mod operation;
mod settings;
mod status;
mod ui;

/// Services handling everything around the farming systems.
///
/// Requests are only handled between ticks so a tick never observes a half-applied change.
#[derive(Debug)]
pub struct Services {
    ui: Box<dyn UiService>,
    operation: Box<dyn OperationService>,
    settings: Box<dyn SettingsService>,
    status: Box<dyn StatusService>,
}

impl Services {
    pub fn new(settings: Settings) -> Self {
        Self {
            ui: Box::new(DefaultUiService),
            operation: Box::new(DefaultOperationService),
            settings: Box::new(DefaultSettingsService::new(settings)),
            status: Box::new(DefaultStatusService::default()),
        }
    }

    /// The settings snapshot to use for the next tick.
    #[inline]
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.settings()
    }

    /// Handles every pending request and persisted settings change.
    pub fn poll(&mut self, resources: &mut Resources, world: &mut World) {
        self.settings.poll();
        while let Some((request, response)) = self.ui.poll() {
            self.handle(resources, world, request, response);
        }
    }

    #[inline]
    pub fn broadcast_status(
        &self,
        resources: &Resources,
        world: &World,
        snapshot: Option<&Snapshot>,
    ) {
        self.status.broadcast(resources, world, snapshot);
    }

    fn handle(
        &mut self,
        resources: &mut Resources,
        world: &mut World,
        request: Request,
        response: Sender<Response>,
    ) {
        let result = match request {
            Request::UpdateOperation(update) => {
                self.operation.apply(resources, world, update);
                Response::UpdateOperation
            }
            Request::UpdateSettings(settings) => {
                self.settings.update(settings);
                Response::UpdateSettings
            }
            Request::StatusReceiver => Response::StatusReceiver(self.status.subscribe()),
        };
        let _ = response.send(result);
    }
}
