use std::fmt::{self, Display, Formatter};

use crate::BotOperationUpdate;

/// Current operating state of the bot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operation {
    Halting,
    Running,
}

impl Operation {
    #[inline]
    pub fn halting(&self) -> bool {
        matches!(self, Operation::Halting)
    }

    pub fn update_from_bot_update(self, update: BotOperationUpdate) -> Operation {
        match update {
            BotOperationUpdate::Halt => Operation::Halting,
            BotOperationUpdate::Run => Operation::Running,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Halting => write!(f, "Halting"),
            Operation::Running => write!(f, "Running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_from_bot_update() {
        assert_eq!(
            Operation::Halting.update_from_bot_update(BotOperationUpdate::Run),
            Operation::Running
        );
        assert!(
            Operation::Running
                .update_from_bot_update(BotOperationUpdate::Halt)
                .halting()
        );
    }
}
