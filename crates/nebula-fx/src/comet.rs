//! Comets aimed at the screen
//!
//! A comet flies in a straight line from a fixed offset above and in front
//! of the screen toward a point on it. The first frame it passes close
//! enough to that point it reports a `CometImpact` in normalized screen
//! coordinates; it keeps flying until its lifetime runs out.

use crate::config::CometConfig;
use crate::materials::comet_material;
use crate::pool::Pool;
use glam::{Vec2, Vec3};
use nebula_core::{Node, NodeHandle, Result, Scene, Transform};
use nebula_runtime::EffectEvent;
use std::collections::VecDeque;

/// Positions remembered for the trail
pub const TRAIL_LEN: usize = 70;
/// Trail opacity lost per second of flight
const TRAIL_FADE_RATE: f32 = 0.18;
const TRAIL_OPACITY: f32 = 0.9;

#[derive(Debug, Clone)]
pub struct Comet {
    pub node: NodeHandle,
    pub position: Vec3,
    pub target: Vec3,
    pub direction: Vec3,
    pub lifetime: f32,
    pub hit: bool,
    /// Most recent position first
    pub trail: VecDeque<Vec3>,
    pub trail_opacity: f32,
}

pub struct CometSystem {
    config: CometConfig,
    /// World position of the screen center
    screen_origin: Vec3,
    screen_size: Vec2,
    pool: Pool<Comet>,
    launched: u64,
    impacts: u64,
    dropped: u64,
    outbox: Vec<EffectEvent>,
}

impl CometSystem {
    pub fn new(
        scene: &mut Scene,
        parent: Option<NodeHandle>,
        config: CometConfig,
        screen_origin: Vec3,
        screen_size: Vec2,
    ) -> Result<Self> {
        config.validate()?;
        let material = comet_material(&config);
        let pool = Pool::new(config.pool_size, |i| {
            let mut node = Node::sprite(format!("comet_{i}"), material.clone())
                .with_transform(Transform::IDENTITY.with_scale(Vec3::splat(config.size)))
                .with_render_order(11)
                .hidden();
            node.parent = parent;
            Comet {
                node: scene.add(node),
                position: Vec3::ZERO,
                target: Vec3::ZERO,
                direction: Vec3::ZERO,
                lifetime: 0.0,
                hit: false,
                trail: VecDeque::with_capacity(TRAIL_LEN),
                trail_opacity: TRAIL_OPACITY,
            }
        });
        Ok(Self {
            config,
            screen_origin,
            screen_size,
            pool,
            launched: 0,
            impacts: 0,
            dropped: 0,
            outbox: Vec::new(),
        })
    }

    /// Send a comet toward `target_local`, a point on the screen relative to
    /// its center. Returns false when every comet slot is in flight.
    pub fn launch(&mut self, scene: &mut Scene, target_local: Vec2) -> bool {
        let Some(id) = self.pool.acquire() else {
            self.dropped += 1;
            log::debug!("comet pool exhausted, launch skipped");
            return false;
        };
        let start = self.screen_origin + self.config.start_offset;
        let target = self.screen_origin + target_local.extend(0.0);
        let Some(comet) = self.pool.get_mut(id) else {
            return false;
        };

        comet.position = start;
        comet.target = target;
        comet.direction = (target - start).normalize_or_zero();
        comet.lifetime = 0.0;
        comet.hit = false;
        comet.trail.clear();
        comet.trail_opacity = TRAIL_OPACITY;
        if let Some(node) = scene.node_mut(comet.node) {
            node.visible = true;
            node.transform.position = start;
        }
        self.launched += 1;
        log::debug!("comet launched toward ({:.2}, {:.2})", target_local.x, target_local.y);
        true
    }

    pub fn update(&mut self, scene: &mut Scene, dt: f32) {
        let config = &self.config;
        let (origin, size) = (self.screen_origin, self.screen_size);
        let outbox = &mut self.outbox;
        let mut impacts = 0;

        self.pool.retain_active(|_, comet| {
            comet.lifetime += dt;
            let previous = comet.position;
            comet.position += comet.direction * config.speed * dt;

            if comet.trail.len() == TRAIL_LEN {
                comet.trail.pop_back();
            }
            comet.trail.push_front(comet.position);
            comet.trail_opacity = (TRAIL_OPACITY - comet.lifetime * TRAIL_FADE_RATE).max(0.0);

            if !comet.hit {
                // A large step can jump over the tolerance band, so test the
                // point where this frame's segment crosses the plane
                let before = previous.z - origin.z;
                let after = comet.position.z - origin.z;
                let point = if before * after <= 0.0 && before != after {
                    previous.lerp(comet.position, before / (before - after))
                } else {
                    comet.position
                };
                let offset = (point - comet.target).abs();
                let to_plane = (point.z - origin.z).abs();
                if to_plane < config.plane_tolerance && offset.x < config.hit_x && offset.y < config.hit_y {
                    comet.hit = true;
                    let local = point - origin;
                    let u = (local.x / size.x + 0.5).clamp(0.0, 1.0);
                    let v = (local.y / size.y + 0.5).clamp(0.0, 1.0);
                    outbox.push(EffectEvent::CometImpact { u, v });
                    impacts += 1;
                }
            }

            let alive = comet.lifetime <= config.lifetime;
            if let Some(node) = scene.node_mut(comet.node) {
                node.visible = alive;
                node.transform.position = comet.position;
            }
            alive
        });

        self.impacts += impacts;
    }

    pub fn comets(&self) -> impl Iterator<Item = &Comet> + '_ {
        self.pool.iter_active()
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn config(&self) -> &CometConfig {
        &self.config
    }

    pub fn launched(&self) -> u64 {
        self.launched
    }

    pub fn impacts(&self) -> u64 {
        self.impacts
    }

    /// Launches skipped because the pool was empty
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Events raised since the last call
    pub fn take_events(&mut self) -> Vec<EffectEvent> {
        std::mem::take(&mut self.outbox)
    }
}
