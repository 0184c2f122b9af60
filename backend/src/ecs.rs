use std::sync::Arc;

#[cfg(test)]
use crate::{bridge::MockInput, detect::MockDetector};
use crate::{
    Settings, bridge::Input, detect::Detector, farming::FarmingEntity, operation::Operation,
    rng::Rng, shout::ShoutEntity,
};

#[macro_export]
macro_rules! transition {
    ($entity:expr, $state:expr) => {{
        $entity.state = $state;
        return;
    }};
    ($entity:expr, $state:expr, $block:block) => {{
        $block
        $entity.state = $state;
        return;
    }};
}

#[macro_export]
macro_rules! transition_if {
    ($cond:expr) => {{
        if $cond {
            return;
        }
    }};
    ($entity:expr, $state:expr, $cond:expr) => {{
        if $cond {
            $entity.state = $state;
            return;
        }
    }};
    ($entity:expr, $state:expr, $cond:expr, $block:block) => {{
        if $cond {
            $block
            $entity.state = $state;
            return;
        }
    }};
    ($entity:expr, $true_state:expr, $false_state:expr, $cond:expr) => {{
        $entity.state = if $cond { $true_state } else { $false_state };
        return;
    }};
}

#[macro_export]
macro_rules! try_some_transition {
    ($entity:expr, $state:expr, $expr:expr) => {
        match $expr {
            Some(val) => val,
            None => {
                $entity.state = $state;
                return;
            }
        }
    };
    ($entity:expr, $state:expr, $expr:expr, $block:block) => {
        match $expr {
            Some(val) => val,
            None => {
                $block
                $entity.state = $state;
                return;
            }
        }
    };
}

/// A struct containing shared resources.
#[derive(Debug)]
pub struct Resources {
    /// A resource to send inputs.
    pub input: Box<dyn Input>,
    /// A resource for generating random values.
    pub rng: Rng,
    /// A resource to detect game information.
    ///
    /// This is [`None`] when no frame as ever been captured.
    pub detector: Option<Arc<dyn Detector>>,
    /// A resource indicating current operation state.
    pub operation: Operation,
    /// A resource indicating current tick.
    pub tick: u64,
    /// The settings snapshot read once at the start of each tick.
    pub settings: Arc<Settings>,
}

impl Resources {
    #[cfg(test)]
    pub fn new(input: Option<MockInput>, detector: Option<MockDetector>) -> Self {
        Self::with_settings(input, detector, Settings::default())
    }

    #[cfg(test)]
    pub fn with_settings(
        input: Option<MockInput>,
        detector: Option<MockDetector>,
        settings: Settings,
    ) -> Self {
        Self {
            input: Box::new(input.unwrap_or_default()),
            rng: Rng::new(rand::random()),
            detector: detector.map(|detector| Arc::new(detector) as Arc<dyn Detector>),
            operation: Operation::Running,
            tick: 0,
            settings: Arc::new(settings),
        }
    }

    /// Retrieves a reference to a [`Detector`] for the latest captured frame.
    ///
    /// # Panics
    ///
    /// Panics if no frame has ever been captured.
    #[inline]
    pub fn detector(&self) -> &dyn Detector {
        self.detector
            .as_ref()
            .expect("detector is not available because no frame has ever been captured")
            .as_ref()
    }
}

/// A container for entities.
#[derive(Debug)]
pub struct World {
    pub farming: FarmingEntity,
    pub shout: ShoutEntity,
}
