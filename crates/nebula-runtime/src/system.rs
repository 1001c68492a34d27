//! Runtime system trait

use crate::stage::Stage;
use nebula_core::Result;

/// A system that can be ticked by the frame loop
///
/// Systems are updated in registration order. Fixed update runs at a constant
/// rate, while update runs once per frame.
pub trait RuntimeSystem {
    /// Called once when the system is first registered
    fn initialize(&mut self, stage: &mut Stage) -> Result<()>;

    /// Called at a fixed rate (e.g. 60Hz) for deterministic simulation
    fn fixed_update(&mut self, stage: &mut Stage, dt: f64) -> Result<()>;

    /// Called once per frame for variable-rate logic
    fn update(&mut self, stage: &mut Stage, dt: f64) -> Result<()>;

    /// Called when the system is being shut down
    fn shutdown(&mut self) -> Result<()>;

    /// Human-readable name for this system
    fn name(&self) -> &str;
}
