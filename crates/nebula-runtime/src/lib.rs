//! Nebula Runtime - Frame loop infrastructure
//!
//! Provides the building blocks a driver uses to tick effects:
//! - `GameClock` / `FixedTimestep` - frame time and fixed-step accumulation
//! - `Stage` - the scene plus the frame's event queue
//! - `EffectEvent` / `EventBus` - typed event queue for inter-system communication
//! - `ReadySignal` - one-shot readiness with a timeout fallback
//! - `RuntimeSystem` - trait for systems ticked by the frame loop

mod clock;
mod event;
mod event_bus;
mod ready;
mod stage;
mod system;

pub use clock::{FixedTimestep, GameClock};
pub use event::EffectEvent;
pub use event_bus::EventBus;
pub use ready::{ReadySignal, ReadySource};
pub use stage::Stage;
pub use system::RuntimeSystem;
