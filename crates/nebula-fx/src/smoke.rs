//! Smoke puffs left behind by meteors

use crate::config::SmokeConfig;
use crate::curves::{lerp_f32, progress};
use crate::materials::smoke_material;
use crate::pool::Pool;
use crate::rand::FxRng;
use glam::Vec3;
use nebula_core::{Node, NodeHandle, Result, Scene, Transform};

/// One pooled puff
#[derive(Debug, Clone)]
pub struct SmokePuff {
    pub node: NodeHandle,
    pub position: Vec3,
    pub lifetime: f32,
    pub max_lifetime: f32,
    pub size: f32,
    pub opacity: f32,
}

pub struct SmokeSystem {
    config: SmokeConfig,
    pool: Pool<SmokePuff>,
    emitted: u64,
    dropped: u64,
}

impl SmokeSystem {
    /// Pre-build `config.pool_size` hidden sprites under `parent`
    pub fn new(scene: &mut Scene, parent: Option<NodeHandle>, config: SmokeConfig) -> Result<Self> {
        config.validate()?;
        let material = smoke_material(&config);
        let pool = Pool::new(config.pool_size, |i| {
            let mut node = Node::sprite(format!("smoke_{i}"), material.clone())
                .with_transform(Transform::IDENTITY.with_scale(Vec3::splat(config.size_start)))
                .with_render_order(9)
                .hidden();
            node.parent = parent;
            SmokePuff {
                node: scene.add(node),
                position: Vec3::ZERO,
                lifetime: 0.0,
                max_lifetime: config.lifetime,
                size: config.size_start,
                opacity: config.opacity_start,
            }
        });
        Ok(Self {
            config,
            pool,
            emitted: 0,
            dropped: 0,
        })
    }

    /// Spawn a puff just behind an emitter moving with `velocity`.
    /// Returns false when the pool is exhausted.
    pub fn emit(&mut self, scene: &mut Scene, rng: &mut FxRng, position: Vec3, velocity: Vec3) -> bool {
        let Some(id) = self.pool.acquire() else {
            self.dropped += 1;
            log::trace!("smoke pool exhausted, puff dropped");
            return false;
        };
        let Some(puff) = self.pool.get_mut(id) else {
            return false;
        };

        let back = velocity.normalize_or_zero() * self.config.back_offset;
        puff.position = position - back + rng.jitter_vec3(self.config.jitter);
        puff.lifetime = 0.0;
        puff.max_lifetime = self.config.lifetime;
        puff.size = self.config.size_start;
        puff.opacity = self.config.opacity_start;
        write_node(scene, puff, true);

        self.emitted += 1;
        true
    }

    /// Grow, fade and lift every active puff; release the finished ones
    pub fn update(&mut self, scene: &mut Scene, dt: f32) {
        let config = &self.config;
        self.pool.retain_active(|_, puff| {
            puff.lifetime += dt;
            let t = progress(puff.lifetime, puff.max_lifetime);
            puff.size = lerp_f32(config.size_start, config.size_end, t);
            puff.opacity = lerp_f32(config.opacity_start, config.opacity_end, t);
            puff.position.y += dt * config.rise_rate;

            let alive = puff.lifetime < puff.max_lifetime;
            write_node(scene, puff, alive);
            alive
        });
    }

    pub fn config(&self) -> &SmokeConfig {
        &self.config
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

    pub fn puffs(&self) -> impl Iterator<Item = &SmokePuff> + '_ {
        self.pool.iter_active()
    }

    /// Puffs spawned since construction
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Emissions skipped because the pool was empty
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

fn write_node(scene: &mut Scene, puff: &SmokePuff, visible: bool) {
    if let Some(node) = scene.node_mut(puff.node) {
        node.visible = visible;
        node.transform.position = puff.position;
        node.transform.scale = Vec3::splat(puff.size);
        node.material.opacity = puff.opacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(scene: &mut Scene, pool_size: usize) -> SmokeSystem {
        let config = SmokeConfig {
            pool_size,
            ..Default::default()
        };
        SmokeSystem::new(scene, None, config).unwrap()
    }

    #[test]
    fn emit_places_puff_behind_emitter() {
        let mut scene = Scene::new();
        let mut smoke = system(&mut scene, 4);
        let mut rng = FxRng::new(1);
        assert!(smoke.emit(&mut scene, &mut rng, Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)));

        let puff = smoke.puffs().next().unwrap();
        // 0.18 back along -x, jitter at most 0.04 per axis
        assert!(puff.position.x < -0.13 && puff.position.x > -0.23);
        assert!(puff.position.y.abs() <= 0.04 && puff.position.z.abs() <= 0.04);
        assert!((puff.size - 0.16).abs() < 1e-6);
        assert!(scene.node(puff.node).unwrap().visible);
    }

    #[test]
    fn exhausted_pool_drops_silently() {
        let mut scene = Scene::new();
        let mut smoke = system(&mut scene, 2);
        let mut rng = FxRng::new(2);
        for _ in 0..5 {
            smoke.emit(&mut scene, &mut rng, Vec3::ZERO, Vec3::X);
        }
        assert_eq!(smoke.active_count(), 2);
        assert_eq!(smoke.free_count(), 0);
        assert_eq!(smoke.emitted(), 2);
        assert_eq!(smoke.dropped(), 3);
    }

    #[test]
    fn size_and_opacity_follow_progress() {
        let mut scene = Scene::new();
        let mut smoke = system(&mut scene, 1);
        let mut rng = FxRng::new(3);
        smoke.emit(&mut scene, &mut rng, Vec3::ZERO, Vec3::X);

        let mut last_opacity = f32::MAX;
        let mut last_size = 0.0;
        for _ in 0..30 {
            smoke.update(&mut scene, 0.01);
            let Some(puff) = smoke.puffs().next() else {
                break;
            };
            assert!(puff.opacity <= last_opacity);
            assert!(puff.size >= last_size);
            last_opacity = puff.opacity;
            last_size = puff.size;
        }
    }

    #[test]
    fn puff_ends_at_final_values_and_is_released() {
        let mut scene = Scene::new();
        let mut smoke = system(&mut scene, 1);
        let mut rng = FxRng::new(4);
        smoke.emit(&mut scene, &mut rng, Vec3::ZERO, Vec3::X);
        let node = smoke.puffs().next().unwrap().node;

        smoke.update(&mut scene, 0.55);
        assert_eq!(smoke.active_count(), 0);
        assert_eq!(smoke.free_count(), 1);

        let released = smoke.pool.iter_all().next().unwrap();
        assert!((released.opacity - 0.0).abs() < 1e-6);
        assert!((released.size - 0.48).abs() < 1e-6);
        let rendered = scene.node(node).unwrap();
        assert!(!rendered.visible);
    }

    #[test]
    fn never_active_past_lifetime() {
        let mut scene = Scene::new();
        let mut smoke = system(&mut scene, 64);
        let mut rng = FxRng::new(5);
        for frame in 0..240 {
            if frame % 3 == 0 {
                smoke.emit(&mut scene, &mut rng, Vec3::ZERO, Vec3::X);
            }
            smoke.update(&mut scene, 1.0 / 60.0);
            for puff in smoke.puffs() {
                assert!(puff.lifetime < puff.max_lifetime);
            }
        }
    }

    #[test]
    fn puffs_drift_upward() {
        let mut scene = Scene::new();
        let mut smoke = system(&mut scene, 1);
        let mut rng = FxRng::new(6);
        smoke.emit(&mut scene, &mut rng, Vec3::ZERO, Vec3::X);
        let y0 = smoke.puffs().next().unwrap().position.y;
        smoke.update(&mut scene, 0.5);
        let y1 = smoke.puffs().next().unwrap().position.y;
        assert!((y1 - y0 - 0.05).abs() < 1e-5);
    }
}
