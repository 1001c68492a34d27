//! Meteor shower: burst-scheduled streaks that shed smoke as they fly
//!
//! Each frame the scheduler decides how many meteors are due, those are
//! taken from the pool and launched from the upper-right lane toward the
//! lower-left lane, then every active meteor (new ones included) is
//! integrated. A meteor goes back to the pool when it has covered its
//! planned distance or leaves the culling cube, whichever comes first.

use crate::config::{BurstConfig, MeteorConfig, SmokeConfig};
use crate::curves::lerp_f32;
use crate::materials::{glow_material, meteor_material};
use crate::pool::Pool;
use crate::rand::FxRng;
use crate::schedule::BurstScheduler;
use crate::smoke::SmokeSystem;
use glam::{Quat, Vec3};
use nebula_core::{Node, NodeHandle, Result, Scene, Transform};

/// One pooled meteor
#[derive(Debug, Clone)]
pub struct Meteor {
    pub node: NodeHandle,
    pub glow: NodeHandle,
    pub start: Vec3,
    pub target: Vec3,
    pub position: Vec3,
    pub velocity: Vec3,
    pub speed: f32,
    pub lifetime: f32,
    pub max_lifetime: f32,
    smoke_timer: f32,
}

pub struct MeteorSystem {
    config: MeteorConfig,
    scheduler: BurstScheduler,
    pool: Pool<Meteor>,
    smoke: SmokeSystem,
    rng: FxRng,
    elapsed: f32,
    spawned: u64,
    dropped: u64,
    expired: u64,
}

impl MeteorSystem {
    /// Build the meteor and smoke pools under `parent` and generate the
    /// first burst schedule.
    pub fn new(
        scene: &mut Scene,
        parent: Option<NodeHandle>,
        burst: BurstConfig,
        config: MeteorConfig,
        smoke: SmokeConfig,
        seed: u32,
    ) -> Result<Self> {
        burst.validate()?;
        config.validate()?;

        let capacity = config.capacity(&burst);
        let mesh_material = meteor_material(&config);
        let tip_material = glow_material(&config);
        let extents = Vec3::new(config.thickness, config.thickness, config.length);
        let glow_offset = Vec3::Z * (config.length * 0.5 + 0.08);

        let pool = Pool::new(capacity, |i| {
            let mut mesh = Node::mesh(format!("meteor_{i}"), extents, mesh_material.clone())
                .with_render_order(10)
                .hidden();
            mesh.parent = parent;
            let node = scene.add(mesh);
            let glow = scene.add(
                Node::sprite(format!("meteor_{i}_glow"), tip_material.clone())
                    .with_parent(node)
                    .with_render_order(10)
                    .with_transform(
                        Transform::from_position(glow_offset)
                            .with_scale(Vec3::splat(config.glow_size)),
                    ),
            );
            Meteor {
                node,
                glow,
                start: Vec3::ZERO,
                target: Vec3::ZERO,
                position: Vec3::ZERO,
                velocity: Vec3::ZERO,
                speed: 0.0,
                lifetime: 0.0,
                max_lifetime: 0.0,
                smoke_timer: 0.0,
            }
        });

        let smoke = SmokeSystem::new(scene, parent, smoke)?;
        let mut rng = FxRng::new(seed);
        let scheduler = BurstScheduler::new(burst, &mut rng);

        log::info!(
            "meteor system ready: {} meteor slots, {} smoke slots",
            capacity,
            smoke.capacity()
        );

        Ok(Self {
            config,
            scheduler,
            pool,
            smoke,
            rng,
            elapsed: 0.0,
            spawned: 0,
            dropped: 0,
            expired: 0,
        })
    }

    /// Launch one meteor. Returns its node, or None when every slot is busy.
    pub fn spawn_meteor(&mut self, scene: &mut Scene) -> Option<NodeHandle> {
        let Some(id) = self.pool.acquire() else {
            self.dropped += 1;
            log::trace!("meteor pool exhausted, spawn skipped");
            return None;
        };
        let c = &self.config;
        let rng = &mut self.rng;

        let start = Vec3::new(
            rng.range(c.start_x[0], c.start_x[1]),
            lerp_f32(c.lane_y_top, c.lane_y_top + c.lane_y_top_spread, rng.next_f32()),
            lerp_f32(c.lane_z[0], c.lane_z[1], rng.next_f32()),
        );
        let target = Vec3::new(
            rng.range(c.target_x[0], c.target_x[1]),
            lerp_f32(c.lane_y_bot, c.lane_y_bot - c.lane_y_bot_spread, rng.next_f32()),
            lerp_f32(c.lane_z[0], c.lane_z[1], rng.next_f32()),
        );
        let direction = (target - start).normalize();
        let speed = lerp_f32(c.speed_min, c.speed_max, rng.next_f32());

        let meteor = self.pool.get_mut(id)?;
        meteor.start = start;
        meteor.target = target;
        meteor.position = start;
        meteor.velocity = direction * speed;
        meteor.speed = speed;
        meteor.max_lifetime = start.distance(target) / speed;
        meteor.lifetime = 0.0;
        meteor.smoke_timer = 0.0;

        if let Some(node) = scene.node_mut(meteor.node) {
            node.visible = true;
            node.transform.position = start;
            node.transform.rotation = Quat::from_rotation_arc(Vec3::Z, direction);
        }
        self.spawned += 1;
        Some(meteor.node)
    }

    /// Advance scheduling, spawning, flight and smoke by `dt` seconds
    pub fn update(&mut self, scene: &mut Scene, dt: f64) {
        // The scheduler keeps full precision; per-frame motion is f32
        let due = self.scheduler.tick(dt, &mut self.rng);
        for _ in 0..due {
            self.spawn_meteor(scene);
        }

        let dt = dt as f32;
        self.elapsed += dt;
        self.integrate(scene, dt);
        self.smoke.update(scene, dt);
    }

    fn integrate(&mut self, scene: &mut Scene, dt: f32) {
        let config = &self.config;
        let smoke = &mut self.smoke;
        let rng = &mut self.rng;
        let elapsed = self.elapsed;
        let emit_interval = 1.0 / smoke.config().per_second;
        let mut expired = 0;

        self.pool.retain_active(|i, m| {
            m.lifetime += dt;
            m.position += m.velocity * dt;

            m.smoke_timer += dt;
            while m.smoke_timer >= emit_interval {
                m.smoke_timer -= emit_interval;
                smoke.emit(scene, rng, m.position, m.velocity);
            }

            if let Some(glow) = scene.node_mut(m.glow) {
                let flicker = 0.95 + ((elapsed + i as f32) * 8.0).sin() * 0.05;
                glow.material.opacity = config.glow_opacity * flicker;
            }

            let outside = m.position.abs().max_element() > config.bounds;
            if m.lifetime >= m.max_lifetime || outside {
                scene.set_visible(m.node, false);
                expired += 1;
                return false;
            }
            if let Some(node) = scene.node_mut(m.node) {
                node.transform.position = m.position;
            }
            true
        });

        self.expired += expired;
    }

    /// Nodes of the meteors currently in flight
    pub fn active_meteors(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.pool.iter_active().map(|m| m.node)
    }

    /// Flight state of the meteor drawn by `node`, if it is in flight
    pub fn meteor(&self, node: NodeHandle) -> Option<&Meteor> {
        self.pool.iter_active().find(|m| m.node == node)
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn free_count(&self) -> usize {
        self.pool.free_count()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn scheduler(&self) -> &BurstScheduler {
        &self.scheduler
    }

    pub fn smoke(&self) -> &SmokeSystem {
        &self.smoke
    }

    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Spawns skipped because the pool was empty
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn expired(&self) -> u64 {
        self.expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    /// No scheduled bursts, so only explicit spawns happen
    fn quiet_system(scene: &mut Scene, pool_size: usize) -> MeteorSystem {
        let burst = BurstConfig {
            count: 0,
            ..Default::default()
        };
        let meteors = MeteorConfig {
            pool_size: Some(pool_size),
            ..Default::default()
        };
        MeteorSystem::new(scene, None, burst, meteors, SmokeConfig::default(), 42).unwrap()
    }

    #[test]
    fn sixth_spawn_on_full_pool_is_skipped() {
        let mut scene = Scene::new();
        let mut meteors = quiet_system(&mut scene, 5);
        for _ in 0..5 {
            assert!(meteors.spawn_meteor(&mut scene).is_some());
        }
        let before: Vec<NodeHandle> = meteors.active_meteors().collect();

        assert!(meteors.spawn_meteor(&mut scene).is_none());
        assert_eq!(meteors.active_count(), 5);
        assert_eq!(meteors.free_count(), 0);
        assert_eq!(meteors.active_meteors().collect::<Vec<_>>(), before);
        assert_eq!(meteors.dropped(), 1);
    }

    #[test]
    fn lifetime_times_speed_is_travel_distance() {
        let mut scene = Scene::new();
        let mut meteors = quiet_system(&mut scene, 12);
        for _ in 0..12 {
            let node = meteors.spawn_meteor(&mut scene).unwrap();
            let m = meteors.meteor(node).unwrap();
            let distance = m.start.distance(m.target);
            assert!((m.max_lifetime * m.speed - distance).abs() < 1e-3);
            assert!((m.velocity.length() - m.speed).abs() < 1e-3);
            assert!(m.speed >= 18.0 && m.speed <= 30.0);
        }
    }

    #[test]
    fn spawn_respects_lanes_and_orientation() {
        let mut scene = Scene::new();
        let mut meteors = quiet_system(&mut scene, 12);
        let node = meteors.spawn_meteor(&mut scene).unwrap();
        let m = meteors.meteor(node).unwrap();
        assert!(m.start.x >= 25.0 && m.start.x < 35.0);
        assert!(m.start.y >= 9.3 && m.start.y <= 11.1);
        assert!(m.target.x >= -38.0 && m.target.x < -18.0);
        assert!(m.target.y <= 2.1 && m.target.y >= -0.1);
        assert!(m.start.z.abs() <= 1.0 && m.target.z.abs() <= 1.0);

        let rendered = scene.node(node).unwrap();
        assert!(rendered.visible);
        let axis = rendered.transform.rotation * Vec3::Z;
        assert!((axis - m.velocity.normalize()).length() < 1e-4);
    }

    #[test]
    fn release_at_max_lifetime_moves_one_slot() {
        let mut scene = Scene::new();
        let mut meteors = quiet_system(&mut scene, 3);
        let node = meteors.spawn_meteor(&mut scene).unwrap();
        let max_lifetime = meteors.meteor(node).unwrap().max_lifetime;
        assert_eq!((meteors.active_count(), meteors.free_count()), (1, 2));

        meteors.update(&mut scene, max_lifetime as f64);
        assert_eq!((meteors.active_count(), meteors.free_count()), (0, 3));
        assert_eq!(meteors.expired(), 1);
        assert!(!scene.node(node).unwrap().visible);
    }

    #[test]
    fn meteor_reaches_target_before_release() {
        let mut scene = Scene::new();
        let mut meteors = quiet_system(&mut scene, 1);
        let node = meteors.spawn_meteor(&mut scene).unwrap();
        let m = meteors.meteor(node).unwrap().clone();
        let mut last = m.position;
        while meteors.active_count() == 1 {
            last = meteors.meteor(node).unwrap().position;
            meteors.update(&mut scene, DT);
        }
        assert!(last.distance(m.target) <= m.speed * DT as f32 + 0.05);
    }

    #[test]
    fn leaving_the_cube_releases_early() {
        let mut scene = Scene::new();
        let mut meteors = quiet_system(&mut scene, 1);
        let node = meteors.spawn_meteor(&mut scene).unwrap();
        // Push the meteor far off course; the lifetime alone would keep it alive
        if let Some(m) = meteors.pool.get_mut(crate::pool::SlotId(0)) {
            m.velocity = Vec3::new(0.0, 5000.0, 0.0);
        }
        meteors.update(&mut scene, DT);
        assert_eq!(meteors.active_count(), 0);
        assert!(!scene.node(node).unwrap().visible);
    }

    #[test]
    fn smoke_emitted_at_configured_rate() {
        let mut scene = Scene::new();
        let mut meteors = quiet_system(&mut scene, 1);
        meteors.spawn_meteor(&mut scene);
        // 0.3 s of flight at 10 puffs per second, well inside any lifetime
        for _ in 0..18 {
            meteors.update(&mut scene, DT);
        }
        let emitted = meteors.smoke().emitted();
        assert!((2..=3).contains(&emitted), "emitted {emitted}");
    }

    #[test]
    fn scheduled_bursts_spawn_meteors() {
        let mut scene = Scene::new();
        let mut meteors = MeteorSystem::new(
            &mut scene,
            None,
            BurstConfig::default(),
            MeteorConfig::default(),
            SmokeConfig::default(),
            9,
        )
        .unwrap();
        let mut peak = 0;
        for _ in 0..120 {
            meteors.update(&mut scene, DT);
            peak = peak.max(meteors.active_count());
            assert!(meteors.active_count() <= meteors.capacity());
            assert_eq!(
                meteors.active_count() + meteors.free_count(),
                meteors.capacity()
            );
        }
        assert_eq!(meteors.spawned(), 10);
        assert!(peak > 0);
        assert!(meteors.smoke().emitted() > 0);
    }

    #[test]
    fn burst_interval_holds_over_long_runs() {
        let mut scene = Scene::new();
        let mut meteors = MeteorSystem::new(
            &mut scene,
            None,
            BurstConfig::default(),
            MeteorConfig::default(),
            SmokeConfig::default(),
            9,
        )
        .unwrap();
        // First schedule at frame 1, so the next one is due 8 s later at frame 481
        for _ in 0..481 {
            meteors.update(&mut scene, DT);
        }
        assert_eq!(meteors.scheduler().schedules_generated(), 1);
        assert_eq!(meteors.scheduler().pending_count(), 0);
        assert_eq!(meteors.spawned(), 10);

        meteors.update(&mut scene, DT);
        meteors.update(&mut scene, DT);
        assert_eq!(meteors.scheduler().schedules_generated(), 2);
    }

    #[test]
    fn glow_follows_parent_visibility() {
        let mut scene = Scene::new();
        let mut meteors = quiet_system(&mut scene, 1);
        let glow = meteors.pool.iter_all().next().unwrap().glow;
        assert!(!scene.is_effectively_visible(glow));
        meteors.spawn_meteor(&mut scene);
        assert!(scene.is_effectively_visible(glow));
        meteors.update(&mut scene, DT);
        let opacity = scene.node(glow).unwrap().material.opacity;
        assert!(opacity >= 0.55 * 0.9 && opacity <= 0.55 * 1.0 + 1e-6);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut scene = Scene::new();
        let meteors = MeteorConfig {
            pool_size: Some(0),
            ..Default::default()
        };
        let result = MeteorSystem::new(
            &mut scene,
            None,
            BurstConfig::default(),
            meteors,
            SmokeConfig::default(),
            1,
        );
        assert!(result.is_err());
    }
}
