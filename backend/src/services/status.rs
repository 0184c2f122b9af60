use std::fmt::Debug;

use tokio::sync::broadcast::{self, Receiver, Sender};

use crate::{
    FarmingStatus,
    ecs::{Resources, World},
    snapshot::{AliveState, Snapshot},
};

/// A service to publish [`FarmingStatus`] to listeners.
pub trait StatusService: Debug {
    /// Broadcasts the status of this tick.
    ///
    /// `snapshot` is [`None`] when no frame has been observed yet.
    fn broadcast(&self, resources: &Resources, world: &World, snapshot: Option<&Snapshot>);

    fn subscribe(&self) -> Receiver<FarmingStatus>;
}

#[derive(Debug)]
pub struct DefaultStatusService {
    status_tx: Sender<FarmingStatus>,
}

impl Default for DefaultStatusService {
    fn default() -> Self {
        Self {
            status_tx: broadcast::channel(1).0,
        }
    }
}

impl StatusService for DefaultStatusService {
    fn broadcast(&self, resources: &Resources, world: &World, snapshot: Option<&Snapshot>) {
        if self.status_tx.receiver_count() == 0 {
            return;
        }

        let _ = self.status_tx.send(status(resources, world, snapshot));
    }

    fn subscribe(&self) -> Receiver<FarmingStatus> {
        self.status_tx.subscribe()
    }
}

fn status(resources: &Resources, world: &World, snapshot: Option<&Snapshot>) -> FarmingStatus {
    let stats = &world.farming.context.stats;
    let own = snapshot.map(|snapshot| snapshot.own).unwrap_or_default();

    FarmingStatus {
        running: !resources.operation.halting(),
        alive: own.alive == AliveState::Alive,
        attacking: world.farming.state.is_attacking(),
        kills: stats.kills(),
        kills_per_minute: stats.kills_per_minute(),
        kills_per_hour: stats.kills_per_hour(),
        last_search: stats.last_search(),
        last_fight: stats.last_fight(),
        stage: world.farming.state.to_string(),
        hp: own.hp,
        mp: own.mp,
        fp: own.fp,
        target_hp: snapshot.map(|snapshot| snapshot.target.hp).unwrap_or_default(),
    }
}
