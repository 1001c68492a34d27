//! The shared state handed to every system each frame

use crate::event_bus::EventBus;
use nebula_core::Scene;

/// Scene nodes plus the frame's event queue
#[derive(Default)]
pub struct Stage {
    pub scene: Scene,
    pub events: EventBus,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }
}
