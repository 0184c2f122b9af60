use std::{
    sync::{LazyLock, Mutex},
    time::Duration,
};

use tokio::{
    sync::{
        broadcast, mpsc,
        oneshot::{self, Sender},
    },
    task::spawn_blocking,
};

mod bar;
mod bridge;
mod database;
mod detect;
mod ecs;
mod farming;
mod geometry;
mod mat;
mod models;
mod operation;
mod rng;
mod run;
mod scheduler;
mod services;
mod shout;
mod snapshot;

pub use {
    database::{DatabaseEvent, database_event_receiver},
    models::*,
    run::init,
    strum::{IntoEnumIterator, ParseError},
};

type PendingRequest = (Request, Sender<Response>);

static REQUESTS: LazyLock<(
    mpsc::UnboundedSender<PendingRequest>,
    Mutex<mpsc::UnboundedReceiver<PendingRequest>>,
)> = LazyLock::new(|| {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Mutex::new(rx))
});

macro_rules! send_request {
    ($variant:ident $(( $( $field:ident ),* ))?) => {{
        let request = Request::$variant$(( $( $field ),* ))?;
        let (tx, rx) = oneshot::channel();
        REQUESTS.0.send((request, tx)).expect("channel open");

        let response = rx.await.expect("successful response");
        match response {
            Response::$variant => (),
            _ => panic!("mismatch response and request type"),
        }}
    };

    ($variant:ident $(( $( $field:ident ),* ))? => ( $( $response:ident ),+ )) => {{
        let request = Request::$variant$(( $( $field ),* ))?;
        let (tx, rx) = oneshot::channel();
        REQUESTS.0.send((request, tx)).expect("channel open");

        let response = rx.await.expect("successful response");
        match response {
            Response::$variant($( $response ),+) => ($( $response),+),
            _ => panic!("mismatch response and request type"),
        }}
    };
}

/// Represents a request from the presentation layer.
#[derive(Debug)]
enum Request {
    UpdateOperation(BotOperationUpdate),
    UpdateSettings(Settings),
    StatusReceiver,
}

/// Represents the response to a [`Request`].
#[derive(Debug)]
enum Response {
    UpdateOperation,
    UpdateSettings,
    StatusReceiver(broadcast::Receiver<FarmingStatus>),
}

/// Status published once per tick.
#[derive(Clone, PartialEq, Debug)]
pub struct FarmingStatus {
    pub running: bool,
    pub alive: bool,
    pub attacking: bool,
    pub kills: u32,
    pub kills_per_minute: f32,
    pub kills_per_hour: f32,
    /// Time from the previous kill until the last attack started.
    pub last_search: Duration,
    /// Time from the last attack start until its kill.
    pub last_fight: Duration,
    /// Name of the current farming stage.
    pub stage: String,
    pub hp: u32,
    pub mp: u32,
    pub fp: u32,
    pub target_hp: u32,
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum BotOperationUpdate {
    Halt,
    Run,
}

/// Updates the bot current's operation.
pub async fn update_operation(update: BotOperationUpdate) {
    send_request!(UpdateOperation(update))
}

/// Replaces the settings used by the main loop starting from its next tick.
///
/// The settings are not persisted, use [`upsert_settings`] for that.
pub async fn update_settings(settings: Settings) {
    send_request!(UpdateSettings(settings))
}

/// Subscribes to the [`FarmingStatus`] published every tick.
pub async fn status_receiver() -> broadcast::Receiver<FarmingStatus> {
    send_request!(StatusReceiver => (receiver))
}

/// Queries settings from the database.
///
/// Returns the default [`Settings`] if the database cannot be read.
pub async fn query_settings() -> Settings {
    spawn_blocking(database::query_settings)
        .await
        .ok()
        .and_then(|settings| settings.ok())
        .unwrap_or_default()
}

/// Upserts `settings` to the database.
///
/// Returns the updated [`Settings`] or original if fails. A successful upsert also reaches the
/// main loop.
pub async fn upsert_settings(mut settings: Settings) -> Settings {
    let original = settings.clone();
    spawn_blocking(move || {
        let _ = database::upsert_settings(&mut settings);
        settings
    })
    .await
    .unwrap_or(original)
}

fn poll_request() -> Option<PendingRequest> {
    REQUESTS.1.lock().ok()?.try_recv().ok()
}
