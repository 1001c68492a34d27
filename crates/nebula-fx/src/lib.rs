//! Nebula FX - pooled space effects
//!
//! Provides the simulation behind the backdrop:
//! - Burst-scheduled meteor shower with pooled meshes and smoke trails
//! - A video screen that shatters into tiles on impact and reassembles
//! - Comets that fly at the screen and report where they hit
//! - `Theme` configuration loaded from TOML
//!
//! Every subsystem implements `RuntimeSystem`; [`Effects`] wires them
//! together and routes comet impacts to the screen.

pub mod comet;
pub mod config;
pub mod curves;
pub mod materials;
pub mod meteor;
pub mod pool;
pub mod rand;
pub mod schedule;
pub mod shatter;
pub mod smoke;

use glam::{Vec2, Vec3};
use nebula_core::{Node, NodeHandle, Result};
use nebula_runtime::{EffectEvent, RuntimeSystem, Stage};

pub use comet::{Comet, CometSystem};
pub use config::{BurstConfig, CometConfig, MeteorConfig, ScreenConfig, SmokeConfig, Theme};
pub use meteor::{Meteor, MeteorSystem};
pub use pool::{Pool, SlotId, SlotState};
pub use schedule::BurstScheduler;
pub use shatter::{ScreenPhase, ScreenSystem, Tile};
pub use smoke::{SmokePuff, SmokeSystem};

impl RuntimeSystem for MeteorSystem {
    fn initialize(&mut self, _stage: &mut Stage) -> Result<()> {
        log::debug!("[meteors] {} slots", self.capacity());
        Ok(())
    }

    fn fixed_update(&mut self, _stage: &mut Stage, _dt: f64) -> Result<()> {
        // Meteors integrate at frame rate
        Ok(())
    }

    fn update(&mut self, stage: &mut Stage, dt: f64) -> Result<()> {
        MeteorSystem::update(self, &mut stage.scene, dt);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        log::debug!(
            "[meteors] spawned {}, skipped {}",
            self.spawned(),
            self.dropped()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "meteors"
    }
}

impl RuntimeSystem for ScreenSystem {
    fn initialize(&mut self, _stage: &mut Stage) -> Result<()> {
        log::debug!("[screen] waiting for media size");
        Ok(())
    }

    fn fixed_update(&mut self, _stage: &mut Stage, _dt: f64) -> Result<()> {
        // The screen keeps its own 60 Hz accumulator so that its timeline
        // does not depend on the driver's fixed rate
        Ok(())
    }

    fn update(&mut self, stage: &mut Stage, dt: f64) -> Result<()> {
        ScreenSystem::update(self, &mut stage.scene, dt as f32);
        for event in self.take_events() {
            stage.events.push(event);
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        log::debug!(
            "[screen] shattered {} times, rejected {}",
            self.shatters(),
            self.rejected()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "screen"
    }
}

impl RuntimeSystem for CometSystem {
    fn initialize(&mut self, _stage: &mut Stage) -> Result<()> {
        Ok(())
    }

    fn fixed_update(&mut self, _stage: &mut Stage, _dt: f64) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, stage: &mut Stage, dt: f64) -> Result<()> {
        CometSystem::update(self, &mut stage.scene, dt as f32);
        for event in self.take_events() {
            stage.events.push(event);
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "comets"
    }
}

/// All effects of a theme, built into one stage
pub struct Effects {
    pub meteors: MeteorSystem,
    pub comets: CometSystem,
    pub screen: ScreenSystem,
    root: NodeHandle,
    rejected_launches: u64,
}

impl Effects {
    /// Build every subsystem under a shared root group. Each subsystem gets
    /// its own random stream derived from `seed`.
    pub fn new(stage: &mut Stage, theme: &Theme, seed: u32) -> Result<Self> {
        theme.validate()?;
        let scene = &mut stage.scene;
        let root = scene.add(Node::group("NebulaRoot"));

        let meteors = MeteorSystem::new(
            scene,
            Some(root),
            theme.burst.clone(),
            theme.meteors.clone(),
            theme.smoke.clone(),
            seed,
        )?;
        let screen = ScreenSystem::new(
            scene,
            Some(root),
            theme.screen.clone(),
            seed.wrapping_mul(0x9E37_79B9).wrapping_add(1),
        )?;
        let comets = CometSystem::new(
            scene,
            Some(root),
            theme.comet.clone(),
            theme.screen.position,
            Vec2::new(theme.screen.width, theme.screen.height),
        )?;

        let mut effects = Self {
            meteors,
            comets,
            screen,
            root,
            rejected_launches: 0,
        };
        for system in effects.systems() {
            system.initialize(stage)?;
            log::debug!("initialized {}", system.name());
        }
        Ok(effects)
    }

    fn systems(&mut self) -> [&mut dyn RuntimeSystem; 3] {
        [&mut self.meteors, &mut self.comets, &mut self.screen]
    }

    /// Launch a comet at `target_local` on the screen, unless the screen is
    /// busy and could not react to the impact anyway.
    pub fn launch_comet(&mut self, stage: &mut Stage, target_local: Vec2) -> bool {
        if self.screen.is_busy() {
            self.rejected_launches += 1;
            log::info!("comet launch skipped, screen is {:?}", self.screen.phase());
            return false;
        }
        self.comets.launch(&mut stage.scene, target_local)
    }

    /// Run one fixed step on every effect
    pub fn fixed_update(&mut self, stage: &mut Stage, dt: f64) -> Result<()> {
        for system in self.systems() {
            system.fixed_update(stage, dt)?;
        }
        Ok(())
    }

    /// Advance every effect by `dt` seconds, route impacts to the screen and
    /// return the events raised this frame.
    pub fn update(&mut self, stage: &mut Stage, dt: f64) -> Result<Vec<EffectEvent>> {
        for system in self.systems() {
            system.update(stage, dt)?;
        }

        let mut events = stage.events.drain();
        self.screen.process_events(&mut stage.scene, &events);
        events.extend(self.screen.take_events());

        for event in &events {
            log::debug!("event: {event:?}");
        }
        Ok(events)
    }

    pub fn shutdown(&mut self) -> Result<()> {
        for system in self.systems() {
            system.shutdown()?;
        }
        Ok(())
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// World position of the screen center
    pub fn screen_origin(&self) -> Vec3 {
        self.screen.config().position
    }

    /// Comet launches refused because the screen was busy
    pub fn rejected_launches(&self) -> u64 {
        self.rejected_launches
    }
}
