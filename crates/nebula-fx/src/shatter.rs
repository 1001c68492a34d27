//! Video screen that bursts into tiles on impact and reassembles itself
//!
//! The screen shows either one intact video plane or a grid of tiles that
//! each carry a window of the same video; never both. A trigger swaps the
//! plane for the tiles and launches them radially away from the impact
//! point. After `reset_after` seconds the tiles snap back to rest, the
//! intact plane returns and a cooldown starts. Triggers arriving while the
//! tiles fly, during the cooldown, or before the media size is known are
//! dropped.

use crate::config::ScreenConfig;
use crate::materials::{tile_material, video_material};
use crate::pool::Pool;
use crate::rand::FxRng;
use glam::{Vec2, Vec3};
use nebula_core::{Color, Material, Node, NodeHandle, Result, Scene, Transform};
use nebula_runtime::{EffectEvent, FixedTimestep, ReadySignal};

/// Tolerance for comparing accumulated step time against durations
const TIME_EPSILON: f32 = 1e-4;

/// Where the screen is in its shatter timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenPhase {
    /// Media size not known yet; nothing to shatter
    Loading,
    Intact,
    Shattering,
    /// Healed, but not yet accepting triggers
    Cooling,
}

/// One fragment of the video surface
#[derive(Debug, Clone)]
pub struct Tile {
    pub node: NodeHandle,
    /// Position inside the intact surface
    pub rest: Vec3,
    pub position: Vec3,
    /// XYZ Euler angles in radians
    pub rotation: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub opacity: f32,
}

impl Tile {
    fn reset(&mut self) {
        self.position = self.rest;
        self.rotation = Vec3::ZERO;
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.opacity = 1.0;
    }

    fn write_node(&self, scene: &mut Scene, visible: bool) {
        if let Some(node) = scene.node_mut(self.node) {
            node.visible = visible;
            node.transform.position = self.position;
            node.transform.set_euler(self.rotation);
            node.material.opacity = self.opacity;
        }
    }
}

/// Built once the media size is known
struct Surface {
    intact: NodeHandle,
    video_size: Vec2,
    tiles: Pool<Tile>,
}

pub struct ScreenSystem {
    config: ScreenConfig,
    group: NodeHandle,
    media: ReadySignal<Vec2>,
    surface: Option<Surface>,
    fixed: FixedTimestep,
    rng: FxRng,
    shattering: bool,
    shatter_t: f32,
    cooldown_t: f32,
    shatters: u32,
    rejected: u32,
    outbox: Vec<EffectEvent>,
}

impl ScreenSystem {
    /// Add the screen group and its back panel under `parent`. Tiles are
    /// built later, when the media size is known.
    pub fn new(scene: &mut Scene, parent: Option<NodeHandle>, config: ScreenConfig, seed: u32) -> Result<Self> {
        config.validate()?;

        let mut group = Node::group("ScreenGroup")
            .with_transform(Transform::from_position(config.position));
        group.parent = parent;
        let group = scene.add(group);
        scene.add(
            Node::mesh(
                "ScreenBackPanel",
                Vec3::new(config.width, config.height, 0.0),
                Material::solid(Color::BLACK),
            )
            .with_parent(group),
        );

        let fallback = Vec2::from(config.fallback_media);
        Ok(Self {
            media: ReadySignal::new(config.metadata_timeout as f64, fallback),
            fixed: FixedTimestep::new(config.step as f64),
            config,
            group,
            surface: None,
            rng: FxRng::new(seed),
            shattering: false,
            shatter_t: 0.0,
            cooldown_t: 0.0,
            shatters: 0,
            rejected: 0,
            outbox: Vec::new(),
        })
    }

    /// Report the media's pixel dimensions. Only the first report (or the
    /// timeout fallback, whichever settles first) is used.
    pub fn notify_media_size(&mut self, width: f32, height: f32) -> bool {
        if width <= 0.0 || height <= 0.0 {
            return false;
        }
        self.media.resolve(Vec2::new(width, height))
    }

    /// Advance readiness and the fixed-step shatter timeline
    pub fn update(&mut self, scene: &mut Scene, dt: f32) {
        if let Some(media) = self.media.poll(dt as f64) {
            self.build_surface(scene, media);
        }

        self.fixed.accumulate(dt as f64);
        while self.fixed.should_step() {
            self.fixed.consume();
            self.step(scene);
        }
    }

    /// Shatter from normalized screen coordinates (clamped to [0, 1]).
    /// Returns false, changing nothing, while the screen is busy.
    pub fn trigger(&mut self, scene: &mut Scene, u: f32, v: f32) -> bool {
        if self.is_busy() {
            self.rejected += 1;
            log::debug!("shatter at ({u:.2}, {v:.2}) rejected, screen busy");
            return false;
        }
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };

        let (u, v) = (u.clamp(0.0, 1.0), v.clamp(0.0, 1.0));
        let half = surface.video_size * 0.5;
        let impact = Vec3::new(
            ((u - 0.5) * self.config.width).clamp(-half.x, half.x),
            ((v - 0.5) * self.config.height).clamp(-half.y, half.y),
            0.0,
        );
        let max_dimension = surface.video_size.max_element();

        scene.set_visible(surface.intact, false);
        while surface.tiles.acquire().is_some() {}

        let config = &self.config;
        let rng = &mut self.rng;
        surface.tiles.retain_active(|_, tile| {
            tile.reset();

            let to_tile = tile.rest - impact;
            let distance = to_tile.length().max(0.001);
            let direction = to_tile.normalize_or_zero();

            let falloff = (1.0 - distance / max_dimension).max(config.falloff_floor);
            let punch = 0.6 + 0.8 * falloff;
            let speed = config.impulse * punch * rng.range(0.9, 1.1);

            tile.velocity = Vec3::new(
                direction.x * speed,
                direction.y * speed,
                config.z_kick * punch,
            );
            tile.angular_velocity = rng.jitter_vec3(config.spin);
            tile.write_node(scene, true);
            true
        });

        self.shattering = true;
        self.shatter_t = 0.0;
        self.shatters += 1;
        self.outbox.push(EffectEvent::ShatterStarted);
        log::debug!("screen shattered at ({u:.2}, {v:.2})");
        true
    }

    /// Trigger on every comet impact in `events`
    pub fn process_events(&mut self, scene: &mut Scene, events: &[EffectEvent]) {
        for event in events {
            if let EffectEvent::CometImpact { u, v } = event {
                self.trigger(scene, *u, *v);
            }
        }
    }

    /// Whether a trigger would currently be rejected
    pub fn is_busy(&self) -> bool {
        self.surface.is_none() || self.shattering || self.cooldown_t > 0.0
    }

    pub fn phase(&self) -> ScreenPhase {
        if self.surface.is_none() {
            ScreenPhase::Loading
        } else if self.shattering {
            ScreenPhase::Shattering
        } else if self.cooldown_t > 0.0 {
            ScreenPhase::Cooling
        } else {
            ScreenPhase::Intact
        }
    }

    /// Every tile, flying or at rest. Empty until the media size is known.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.surface
            .iter()
            .flat_map(|surface| surface.tiles.iter_all())
    }

    /// Size of the video rectangle inside the screen, once known
    pub fn video_size(&self) -> Option<Vec2> {
        self.surface.as_ref().map(|s| s.video_size)
    }

    pub fn intact_node(&self) -> Option<NodeHandle> {
        self.surface.as_ref().map(|s| s.intact)
    }

    pub fn group(&self) -> NodeHandle {
        self.group
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Seconds since the current shatter started
    pub fn shatter_time(&self) -> f32 {
        self.shatter_t
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_t
    }

    pub fn shatters(&self) -> u32 {
        self.shatters
    }

    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Events raised since the last call
    pub fn take_events(&mut self) -> Vec<EffectEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Fit the media inside the screen (contain) and build the intact plane
    /// plus one tile per grid cell.
    fn build_surface(&mut self, scene: &mut Scene, media: Vec2) {
        let video_size = contain(Vec2::new(self.config.width, self.config.height), media);
        let (gx, gy) = (self.config.grid_x, self.config.grid_y);
        let tile_size = video_size / Vec2::new(gx as f32, gy as f32);
        let group = self.group;

        let intact = scene.add(
            Node::mesh(
                "IntactVideoPlane",
                video_size.extend(0.0),
                video_material(),
            )
            .with_parent(group),
        );

        let tiles = Pool::new((gx * gy) as usize, |i| {
            let (ix, iy) = (i as u32 % gx, i as u32 / gx);
            let rest = Vec3::new(
                -video_size.x / 2.0 + tile_size.x / 2.0 + ix as f32 * tile_size.x,
                -video_size.y / 2.0 + tile_size.y / 2.0 + iy as f32 * tile_size.y,
                0.0,
            );
            let node = scene.add(
                Node::mesh(
                    format!("ScreenTile_{ix}_{iy}"),
                    tile_size.extend(0.0),
                    tile_material(ix, iy, gx, gy),
                )
                .with_parent(group)
                .with_transform(Transform::from_position(rest))
                .hidden(),
            );
            Tile {
                node,
                rest,
                position: rest,
                rotation: Vec3::ZERO,
                velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
                opacity: 1.0,
            }
        });

        log::info!(
            "screen media {}x{} fitted to {:.2}x{:.2}, {} tiles",
            media.x,
            media.y,
            video_size.x,
            video_size.y,
            gx * gy
        );
        self.surface = Some(Surface {
            intact,
            video_size,
            tiles,
        });
        self.outbox.push(EffectEvent::MediaReady {
            width: media.x,
            height: media.y,
        });
    }

    /// One fixed integration step
    fn step(&mut self, scene: &mut Scene) {
        let dt = self.config.step;

        if self.cooldown_t > 0.0 {
            self.cooldown_t = (self.cooldown_t - dt).max(0.0);
            if self.cooldown_t <= TIME_EPSILON {
                self.cooldown_t = 0.0;
            }
        }
        if !self.shattering {
            return;
        }
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        self.shatter_t += dt;
        let t = self.shatter_t;
        let config = &self.config;
        let fade_start = config.reset_after - config.fade_window;

        surface.tiles.retain_active(|_, tile| {
            tile.position += tile.velocity * dt;
            tile.rotation += tile.angular_velocity * dt;

            tile.velocity.y -= config.gravity * dt;
            tile.velocity *= config.drag;
            tile.angular_velocity *= config.drag;

            if t > fade_start && config.fade_window > 0.0 {
                let k = ((t - fade_start) / config.fade_window).clamp(0.0, 1.0);
                tile.opacity = 1.0 - k;
            }
            tile.write_node(scene, true);
            true
        });

        if self.shatter_t + TIME_EPSILON >= self.config.reset_after {
            self.heal(scene);
        }
    }

    /// Snap every tile back to rest and show the intact plane again
    fn heal(&mut self, scene: &mut Scene) {
        self.shattering = false;
        self.cooldown_t = self.config.cooldown;
        if let Some(surface) = self.surface.as_mut() {
            surface.tiles.retain_active(|_, tile| {
                tile.reset();
                tile.write_node(scene, false);
                false
            });
            scene.set_visible(surface.intact, true);
        }
        self.outbox.push(EffectEvent::ShatterHealed);
        log::debug!("screen healed after {:.2}s", self.shatter_t);
    }
}

/// Largest rectangle with `media`'s aspect ratio that fits inside `frame`
fn contain(frame: Vec2, media: Vec2) -> Vec2 {
    let frame_aspect = frame.x / frame.y;
    let media_aspect = media.x / media.y;
    if media_aspect > frame_aspect {
        Vec2::new(frame.x, frame.x / media_aspect)
    } else {
        Vec2::new(frame.y * media_aspect, frame.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn ready_screen(scene: &mut Scene) -> ScreenSystem {
        let mut screen = ScreenSystem::new(scene, None, ScreenConfig::default(), 42).unwrap();
        screen.notify_media_size(1280.0, 720.0);
        screen.update(scene, 0.0);
        screen
    }

    #[test]
    fn contain_fits_wide_and_tall_media() {
        let wide = contain(Vec2::new(9.0, 6.0), Vec2::new(1280.0, 720.0));
        assert!((wide.x - 9.0).abs() < 1e-5);
        assert!((wide.y - 5.0625).abs() < 1e-4);
        let tall = contain(Vec2::new(9.0, 6.0), Vec2::new(720.0, 1280.0));
        assert!((tall.y - 6.0).abs() < 1e-5);
        assert!((tall.x - 3.375).abs() < 1e-4);
    }

    #[test]
    fn loading_until_media_ready() {
        let mut scene = Scene::new();
        let mut screen = ScreenSystem::new(&mut scene, None, ScreenConfig::default(), 1).unwrap();
        assert_eq!(screen.phase(), ScreenPhase::Loading);
        assert!(screen.is_busy());
        assert!(!screen.trigger(&mut scene, 0.5, 0.5));
        assert_eq!(screen.tiles().count(), 0);

        screen.notify_media_size(1920.0, 1080.0);
        screen.update(&mut scene, DT);
        assert_eq!(screen.phase(), ScreenPhase::Intact);
        assert_eq!(screen.tiles().count(), 96);
        assert!(screen
            .take_events()
            .contains(&EffectEvent::MediaReady { width: 1920.0, height: 1080.0 }));
    }

    #[test]
    fn media_timeout_falls_back_once() {
        let mut scene = Scene::new();
        let mut screen = ScreenSystem::new(&mut scene, None, ScreenConfig::default(), 1).unwrap();
        for _ in 0..120 {
            screen.update(&mut scene, DT);
        }
        let size = screen.video_size().unwrap();
        assert!((size.x - 9.0).abs() < 1e-5);
        // A late report does not rebuild the surface
        assert!(!screen.notify_media_size(640.0, 480.0));
        let nodes = scene.len();
        screen.update(&mut scene, DT);
        assert_eq!(scene.len(), nodes);
        assert_eq!(screen.tiles().count(), 96);
    }

    #[test]
    fn tiles_start_hidden_at_rest() {
        let mut scene = Scene::new();
        let screen = ready_screen(&mut scene);
        for tile in screen.tiles() {
            assert_eq!(tile.position, tile.rest);
            assert!(!scene.node(tile.node).unwrap().visible);
        }
        assert!(scene.node(screen.intact_node().unwrap()).unwrap().visible);
    }

    #[test]
    fn center_impact_pushes_every_tile_outward() {
        let mut scene = Scene::new();
        let mut screen = ready_screen(&mut scene);
        assert!(screen.trigger(&mut scene, 0.5, 0.5));
        let impact = Vec3::ZERO;
        for tile in screen.tiles() {
            assert!(tile.velocity.dot(tile.rest - impact) > 0.0);
            assert!(tile.velocity.z > 0.0);
            assert!(scene.node(tile.node).unwrap().visible);
        }
        assert!(!scene.node(screen.intact_node().unwrap()).unwrap().visible);
        assert_eq!(screen.phase(), ScreenPhase::Shattering);
    }

    #[test]
    fn nearer_tiles_fly_faster_but_never_below_floor() {
        let mut scene = Scene::new();
        let mut screen = ready_screen(&mut scene);
        screen.trigger(&mut scene, 0.0, 0.0);
        let config = ScreenConfig::default();
        let floor_speed = config.impulse * (0.6 + 0.8 * config.falloff_floor) * 0.9;
        let ceiling_speed = config.impulse * 1.4 * 1.1;

        let mut near = f32::MAX;
        let mut far = 0.0f32;
        let corner = Vec3::new(-4.5, -2.53125, 0.0);
        for tile in screen.tiles() {
            let planar = tile.velocity.truncate().length();
            assert!(planar >= floor_speed - 1e-4 && planar <= ceiling_speed + 1e-4);
            let d = tile.rest.distance(corner);
            if d < 1.0 {
                near = near.min(planar);
            }
            if d > 8.0 {
                far = far.max(planar);
            }
        }
        assert!(near > far);
    }

    #[test]
    fn impact_is_clamped_to_video_rect() {
        let mut scene = Scene::new();
        let mut screen = ready_screen(&mut scene);
        // v = 1.0 maps above the letterboxed video; impact clamps to its top edge
        screen.trigger(&mut scene, 0.5, 1.0);
        let top = screen.video_size().unwrap().y / 2.0;
        for tile in screen.tiles() {
            let away = tile.rest - Vec3::new(0.0, top, 0.0);
            assert!(tile.velocity.truncate().dot(away.truncate()) > 0.0);
        }
    }

    #[test]
    fn busy_trigger_changes_nothing() {
        let mut scene = Scene::new();
        let mut screen = ready_screen(&mut scene);
        screen.trigger(&mut scene, 0.3, 0.6);
        screen.update(&mut scene, DT);
        let before: Vec<Vec3> = screen.tiles().map(|t| t.velocity).collect();
        let t_before = screen.shatter_time();

        assert!(screen.is_busy());
        assert!(!screen.trigger(&mut scene, 0.9, 0.1));

        let after: Vec<Vec3> = screen.tiles().map(|t| t.velocity).collect();
        assert_eq!(before, after);
        assert_eq!(screen.shatter_time(), t_before);
        assert_eq!(screen.phase(), ScreenPhase::Shattering);
        assert_eq!(screen.shatters(), 1);
        assert_eq!(screen.rejected(), 1);
    }

    #[test]
    fn gravity_and_drag_shape_the_flight() {
        let mut scene = Scene::new();
        let mut screen = ready_screen(&mut scene);
        screen.trigger(&mut scene, 0.5, 0.5);
        let v0: Vec<Vec3> = screen.tiles().map(|t| t.velocity).collect();
        screen.update(&mut scene, DT);
        for (tile, v0) in screen.tiles().zip(v0) {
            let expected_y = (v0.y - 5.88 * DT) * 0.985;
            assert!((tile.velocity.y - expected_y).abs() < 1e-4);
            assert!((tile.velocity.x - v0.x * 0.985).abs() < 1e-4);
            assert!((tile.position - (tile.rest + v0 * DT)).length() < 1e-4);
        }
    }

    #[test]
    fn tiles_fade_in_the_final_window() {
        let mut scene = Scene::new();
        let mut screen = ready_screen(&mut scene);
        screen.trigger(&mut scene, 0.5, 0.5);
        // 0.9 s in: before the fade window opens at 1.0 s
        for _ in 0..54 {
            screen.update(&mut scene, DT);
        }
        assert!(screen.tiles().all(|t| (t.opacity - 1.0).abs() < 1e-6));
        // 1.6 s in: halfway through the fade
        for _ in 0..42 {
            screen.update(&mut scene, DT);
        }
        for tile in screen.tiles() {
            assert!((tile.opacity - 0.5).abs() < 0.02);
        }
    }

    #[test]
    fn heals_at_reset_then_cools_down_for_exactly_the_cooldown() {
        let mut scene = Scene::new();
        let mut screen = ready_screen(&mut scene);
        screen.take_events();
        screen.trigger(&mut scene, 0.5, 0.5);

        // reset_after = 2.2 s = 132 steps
        for _ in 0..131 {
            screen.update(&mut scene, DT);
        }
        assert_eq!(screen.phase(), ScreenPhase::Shattering);
        screen.update(&mut scene, DT);
        assert_eq!(screen.phase(), ScreenPhase::Cooling);

        for tile in screen.tiles() {
            assert_eq!(tile.position, tile.rest);
            assert_eq!(tile.velocity, Vec3::ZERO);
            assert_eq!(tile.angular_velocity, Vec3::ZERO);
            assert!(!scene.node(tile.node).unwrap().visible);
        }
        assert!(scene.node(screen.intact_node().unwrap()).unwrap().visible);
        assert_eq!(
            screen.take_events(),
            vec![EffectEvent::ShatterStarted, EffectEvent::ShatterHealed]
        );

        // cooldown = 0.6 s = 36 steps
        for _ in 0..35 {
            screen.update(&mut scene, DT);
            assert!(screen.is_busy());
        }
        screen.update(&mut scene, DT);
        assert!(!screen.is_busy());
        assert_eq!(screen.phase(), ScreenPhase::Intact);
        assert!(screen.trigger(&mut scene, 0.2, 0.2));
    }

    #[test]
    fn large_frames_run_multiple_fixed_steps() {
        let mut scene = Scene::new();
        let mut screen = ready_screen(&mut scene);
        screen.trigger(&mut scene, 0.5, 0.5);
        screen.update(&mut scene, 0.1);
        assert!((screen.shatter_time() - 6.0 * DT).abs() < 1e-4);
    }

    #[test]
    fn comet_impact_event_triggers() {
        let mut scene = Scene::new();
        let mut screen = ready_screen(&mut scene);
        screen.process_events(
            &mut scene,
            &[
                EffectEvent::ShatterHealed,
                EffectEvent::CometImpact { u: 0.4, v: 0.5 },
            ],
        );
        assert_eq!(screen.phase(), ScreenPhase::Shattering);
    }
}
