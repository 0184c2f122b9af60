use std::fmt::Debug;

use log::info;

use crate::{
    BotOperationUpdate,
    ecs::{Resources, World},
};

/// A service to handle operation-related incoming requests.
pub trait OperationService: Debug {
    /// Applies the provided `update` to other arguments.
    fn apply(&mut self, resources: &mut Resources, world: &mut World, update: BotOperationUpdate);
}

#[derive(Debug, Default)]
pub struct DefaultOperationService;

impl OperationService for DefaultOperationService {
    fn apply(&mut self, resources: &mut Resources, world: &mut World, update: BotOperationUpdate) {
        let previous = resources.operation;
        resources.operation = previous.update_from_bot_update(update);
        if previous == resources.operation {
            return;
        }

        info!(target: "loop", "operation {previous} -> {}", resources.operation);
        if resources.operation.halting() {
            resources.input.release_all();
            world.farming.context.sequence = Default::default();
        } else {
            world.farming.resume();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bridge::MockInput,
        farming::{Farming, FarmingEntity},
        operation::Operation,
        shout::ShoutEntity,
    };

    fn world() -> World {
        World {
            farming: FarmingEntity {
                state: Farming::SearchingForEnemy,
                ..FarmingEntity::default()
            },
            shout: ShoutEntity::default(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn halt_releases_keys_and_run_resumes() {
        let mut input = MockInput::default();
        input.expect_release_all().once().return_const(());
        let mut resources = Resources::new(Some(input), None);
        let mut world = world();
        let mut service = DefaultOperationService;

        service.apply(&mut resources, &mut world, BotOperationUpdate::Halt);
        assert_eq!(resources.operation, Operation::Halting);
        assert!(matches!(world.farming.state, Farming::SearchingForEnemy));

        service.apply(&mut resources, &mut world, BotOperationUpdate::Halt);
        service.apply(&mut resources, &mut world, BotOperationUpdate::Run);

        assert_eq!(resources.operation, Operation::Running);
        assert!(matches!(world.farming.state, Farming::Initializing(_)));
    }
}
