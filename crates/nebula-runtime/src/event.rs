//! Events exchanged between effects within a frame

/// Something that happened during a frame that another system may react to
#[derive(Debug, Clone, PartialEq)]
pub enum EffectEvent {
    /// A comet reached the screen plane at normalized screen coordinates
    CometImpact { u: f32, v: f32 },
    /// The screen switched from the intact surface to flying tiles
    ShatterStarted,
    /// The tiles were reset and the intact surface is shown again
    ShatterHealed,
    /// Screen media dimensions became known (or fell back to defaults)
    MediaReady { width: f32, height: f32 },
}
