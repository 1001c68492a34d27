//! Effect configuration: defaults, TOML overlays and validation
//!
//! Every struct starts from the tuned defaults; `from_toml` overwrites only
//! the keys present in a table. Validation runs at construction time, never
//! per frame.

use glam::Vec3;
use nebula_core::{Color, NebulaError, Result};
use std::path::Path;

/// When and how many meteors spawn
#[derive(Debug, Clone, PartialEq)]
pub struct BurstConfig {
    /// Seconds between schedule regenerations
    pub interval: f32,
    /// Meteors per burst
    pub count: u32,
    /// Width of the window a burst's spawns are spread over
    pub spread: f32,
    /// Full width of the per-spawn jitter, centred on zero
    pub jitter: f32,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            interval: 8.0,
            count: 10,
            spread: 0.9,
            jitter: 0.16,
        }
    }
}

impl BurstConfig {
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();
        if let Some(v) = table.get("interval") {
            config.interval = toml_f32(v, config.interval);
        }
        if let Some(v) = table.get("count") {
            config.count = toml_u32(v, config.count);
        }
        if let Some(v) = table.get("spread") {
            config.spread = toml_f32(v, config.spread);
        }
        if let Some(v) = table.get("jitter") {
            config.jitter = toml_f32(v, config.jitter);
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("burst.interval", self.interval)?;
        ensure_range("burst.spread", self.spread, 0.0, self.interval)?;
        ensure_range("burst.jitter", self.jitter, 0.0, self.interval)?;
        Ok(())
    }
}

/// Meteor lanes, speed and look
#[derive(Debug, Clone, PartialEq)]
pub struct MeteorConfig {
    /// Slot count; `None` sizes the pool from the burst count
    pub pool_size: Option<usize>,
    /// Start x range (right-hand lane)
    pub start_x: [f32; 2],
    /// Target x range (left-hand lane)
    pub target_x: [f32; 2],
    /// Start y is `lane_y_top + [0, lane_y_top_spread)`
    pub lane_y_top: f32,
    pub lane_y_top_spread: f32,
    /// Target y is `lane_y_bot - [0, lane_y_bot_spread)`
    pub lane_y_bot: f32,
    pub lane_y_bot_spread: f32,
    /// Depth range shared by start and target
    pub lane_z: [f32; 2],
    pub speed_min: f32,
    pub speed_max: f32,
    pub length: f32,
    pub thickness: f32,
    /// Half extent of the culling cube around the origin
    pub bounds: f32,
    pub color: Color,
    pub opacity: f32,
    pub glow_size: f32,
    pub glow_color: Color,
    pub glow_opacity: f32,
}

impl Default for MeteorConfig {
    fn default() -> Self {
        Self {
            pool_size: None,
            start_x: [25.0, 35.0],
            target_x: [-38.0, -18.0],
            lane_y_top: 9.3,
            lane_y_top_spread: 1.8,
            lane_y_bot: 2.1,
            lane_y_bot_spread: 2.2,
            lane_z: [-1.0, 1.0],
            speed_min: 18.0,
            speed_max: 30.0,
            length: 2.4,
            thickness: 0.034,
            bounds: 90.0,
            color: Color::rgb(1.0, 0.96, 0.9),
            opacity: 0.85,
            glow_size: 0.38,
            glow_color: Color::rgb(1.0, 0.78, 0.35),
            glow_opacity: 0.55,
        }
    }
}

impl MeteorConfig {
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();
        if let Some(v) = table.get("pool_size") {
            if let Some(n) = toml_usize("meteors.pool_size", v) {
                config.pool_size = Some(n);
            }
        }
        if let Some(v) = table.get("start_x") {
            config.start_x = toml_vec2(v, config.start_x);
        }
        if let Some(v) = table.get("target_x") {
            config.target_x = toml_vec2(v, config.target_x);
        }
        if let Some(v) = table.get("lane_y_top") {
            config.lane_y_top = toml_f32(v, config.lane_y_top);
        }
        if let Some(v) = table.get("lane_y_top_spread") {
            config.lane_y_top_spread = toml_f32(v, config.lane_y_top_spread);
        }
        if let Some(v) = table.get("lane_y_bot") {
            config.lane_y_bot = toml_f32(v, config.lane_y_bot);
        }
        if let Some(v) = table.get("lane_y_bot_spread") {
            config.lane_y_bot_spread = toml_f32(v, config.lane_y_bot_spread);
        }
        if let Some(v) = table.get("lane_z") {
            config.lane_z = toml_vec2(v, config.lane_z);
        }
        if let Some(v) = table.get("speed_min") {
            config.speed_min = toml_f32(v, config.speed_min);
        }
        if let Some(v) = table.get("speed_max") {
            config.speed_max = toml_f32(v, config.speed_max);
        }
        if let Some(v) = table.get("length") {
            config.length = toml_f32(v, config.length);
        }
        if let Some(v) = table.get("thickness") {
            config.thickness = toml_f32(v, config.thickness);
        }
        if let Some(v) = table.get("bounds") {
            config.bounds = toml_f32(v, config.bounds);
        }
        if let Some(v) = table.get("color") {
            config.color = toml_color(v, config.color);
        }
        if let Some(v) = table.get("opacity") {
            config.opacity = toml_f32(v, config.opacity);
        }
        if let Some(v) = table.get("glow_size") {
            config.glow_size = toml_f32(v, config.glow_size);
        }
        if let Some(v) = table.get("glow_color") {
            config.glow_color = toml_color(v, config.glow_color);
        }
        if let Some(v) = table.get("glow_opacity") {
            config.glow_opacity = toml_f32(v, config.glow_opacity);
        }
        config
    }

    /// Slot count for the given burst settings
    pub fn capacity(&self, burst: &BurstConfig) -> usize {
        self.pool_size
            .unwrap_or_else(|| 12usize.max(burst.count as usize + 2))
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == Some(0) {
            return Err(NebulaError::ValidationError(
                "meteors.pool_size must be at least 1".into(),
            ));
        }
        ensure_positive("meteors.speed_min", self.speed_min)?;
        ensure_range(
            "meteors.speed_max",
            self.speed_max,
            self.speed_min,
            f32::MAX,
        )?;
        ensure_positive("meteors.length", self.length)?;
        ensure_positive("meteors.thickness", self.thickness)?;
        ensure_positive("meteors.bounds", self.bounds)?;
        ensure_range("meteors.opacity", self.opacity, 0.0, 1.0)?;
        ensure_range("meteors.glow_opacity", self.glow_opacity, 0.0, 1.0)?;
        if self.start_x[0] <= self.target_x[1] {
            return Err(NebulaError::ValidationError(
                "meteors.start_x lane must lie right of meteors.target_x".into(),
            ));
        }
        Ok(())
    }
}

/// Smoke puffs trailing each meteor
#[derive(Debug, Clone, PartialEq)]
pub struct SmokeConfig {
    pub per_second: f32,
    pub lifetime: f32,
    pub size_start: f32,
    pub size_end: f32,
    pub opacity_start: f32,
    pub opacity_end: f32,
    pub pool_size: usize,
    /// Distance behind the meteor along its heading
    pub back_offset: f32,
    /// Full width of the placement jitter cube
    pub jitter: f32,
    /// Upward drift in units per second
    pub rise_rate: f32,
    pub color: Color,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            per_second: 10.0,
            lifetime: 0.55,
            size_start: 0.16,
            size_end: 0.48,
            opacity_start: 0.16,
            opacity_end: 0.0,
            pool_size: 320,
            back_offset: 0.18,
            jitter: 0.08,
            rise_rate: 0.1,
            color: Color::rgb(0.9, 0.92, 1.0),
        }
    }
}

impl SmokeConfig {
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();
        if let Some(v) = table.get("per_second") {
            config.per_second = toml_f32(v, config.per_second);
        }
        if let Some(v) = table.get("lifetime") {
            config.lifetime = toml_f32(v, config.lifetime);
        }
        if let Some(v) = table.get("size_start") {
            config.size_start = toml_f32(v, config.size_start);
        }
        if let Some(v) = table.get("size_end") {
            config.size_end = toml_f32(v, config.size_end);
        }
        if let Some(v) = table.get("opacity_start") {
            config.opacity_start = toml_f32(v, config.opacity_start);
        }
        if let Some(v) = table.get("opacity_end") {
            config.opacity_end = toml_f32(v, config.opacity_end);
        }
        if let Some(v) = table.get("pool_size") {
            config.pool_size = toml_usize("smoke.pool_size", v).unwrap_or(config.pool_size);
        }
        if let Some(v) = table.get("back_offset") {
            config.back_offset = toml_f32(v, config.back_offset);
        }
        if let Some(v) = table.get("jitter") {
            config.jitter = toml_f32(v, config.jitter);
        }
        if let Some(v) = table.get("rise_rate") {
            config.rise_rate = toml_f32(v, config.rise_rate);
        }
        if let Some(v) = table.get("color") {
            config.color = toml_color(v, config.color);
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(NebulaError::ValidationError(
                "smoke.pool_size must be at least 1".into(),
            ));
        }
        ensure_positive("smoke.per_second", self.per_second)?;
        ensure_positive("smoke.lifetime", self.lifetime)?;
        ensure_range("smoke.opacity_start", self.opacity_start, 0.0, 1.0)?;
        ensure_range("smoke.opacity_end", self.opacity_end, 0.0, self.opacity_start)?;
        ensure_range("smoke.size_start", self.size_start, 0.0, f32::MAX)?;
        ensure_range("smoke.size_end", self.size_end, 0.0, f32::MAX)?;
        ensure_range("smoke.jitter", self.jitter, 0.0, f32::MAX)?;
        Ok(())
    }
}

/// Video screen and its shatter timeline
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    pub width: f32,
    pub height: f32,
    pub position: Vec3,
    pub grid_x: u32,
    pub grid_y: u32,
    /// Seconds from trigger until the tiles snap back
    pub reset_after: f32,
    /// Seconds after the reset before another trigger is accepted
    pub cooldown: f32,
    /// Tiles fade out over this many seconds before the reset
    pub fade_window: f32,
    pub impulse: f32,
    pub falloff_floor: f32,
    pub z_kick: f32,
    /// Full width of the per-axis angular velocity range
    pub spin: f32,
    pub gravity: f32,
    /// Velocity multiplier applied every integration step
    pub drag: f32,
    /// Integration step in seconds
    pub step: f32,
    /// Seconds to wait for media dimensions before using the fallback
    pub metadata_timeout: f32,
    pub fallback_media: [f32; 2],
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 9.0,
            height: 6.0,
            position: Vec3::new(-0.2, 5.7, 0.0),
            grid_x: 12,
            grid_y: 8,
            reset_after: 2.2,
            cooldown: 0.6,
            fade_window: 1.2,
            impulse: 6.5,
            falloff_floor: 0.2,
            z_kick: 0.6,
            spin: 6.0,
            gravity: 9.8 * 0.6,
            drag: 0.985,
            step: 1.0 / 60.0,
            metadata_timeout: 1.2,
            fallback_media: [1280.0, 720.0],
        }
    }
}

impl ScreenConfig {
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();
        if let Some(v) = table.get("width") {
            config.width = toml_f32(v, config.width);
        }
        if let Some(v) = table.get("height") {
            config.height = toml_f32(v, config.height);
        }
        if let Some(v) = table.get("position") {
            config.position = toml_vec3(v, config.position);
        }
        if let Some(v) = table.get("grid_x") {
            config.grid_x = toml_u32(v, config.grid_x);
        }
        if let Some(v) = table.get("grid_y") {
            config.grid_y = toml_u32(v, config.grid_y);
        }
        if let Some(v) = table.get("reset_after") {
            config.reset_after = toml_f32(v, config.reset_after);
        }
        if let Some(v) = table.get("cooldown") {
            config.cooldown = toml_f32(v, config.cooldown);
        }
        if let Some(v) = table.get("fade_window") {
            config.fade_window = toml_f32(v, config.fade_window);
        }
        if let Some(v) = table.get("impulse") {
            config.impulse = toml_f32(v, config.impulse);
        }
        if let Some(v) = table.get("falloff_floor") {
            config.falloff_floor = toml_f32(v, config.falloff_floor);
        }
        if let Some(v) = table.get("z_kick") {
            config.z_kick = toml_f32(v, config.z_kick);
        }
        if let Some(v) = table.get("spin") {
            config.spin = toml_f32(v, config.spin);
        }
        if let Some(v) = table.get("gravity") {
            config.gravity = toml_f32(v, config.gravity);
        }
        if let Some(v) = table.get("drag") {
            config.drag = toml_f32(v, config.drag);
        }
        if let Some(v) = table.get("step") {
            config.step = toml_f32(v, config.step);
        }
        if let Some(v) = table.get("metadata_timeout") {
            config.metadata_timeout = toml_f32(v, config.metadata_timeout);
        }
        if let Some(v) = table.get("fallback_media") {
            config.fallback_media = toml_vec2(v, config.fallback_media);
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("screen.width", self.width)?;
        ensure_positive("screen.height", self.height)?;
        if self.grid_x == 0 || self.grid_y == 0 {
            return Err(NebulaError::ValidationError(
                "screen.grid_x and screen.grid_y must be at least 1".into(),
            ));
        }
        ensure_positive("screen.reset_after", self.reset_after)?;
        ensure_range("screen.cooldown", self.cooldown, 0.0, f32::MAX)?;
        ensure_range("screen.fade_window", self.fade_window, 0.0, self.reset_after)?;
        ensure_range("screen.falloff_floor", self.falloff_floor, 0.0, 1.0)?;
        ensure_range("screen.drag", self.drag, f32::MIN_POSITIVE, 1.0)?;
        ensure_positive("screen.step", self.step)?;
        ensure_range("screen.metadata_timeout", self.metadata_timeout, 0.0, f32::MAX)?;
        ensure_positive("screen.fallback_media[0]", self.fallback_media[0])?;
        ensure_positive("screen.fallback_media[1]", self.fallback_media[1])?;
        Ok(())
    }
}

/// The projectile that knocks the screen apart
#[derive(Debug, Clone, PartialEq)]
pub struct CometConfig {
    pub speed: f32,
    pub lifetime: f32,
    /// Launch point relative to the aim point
    pub start_offset: Vec3,
    /// Max distance from the screen plane that still counts as a hit
    pub plane_tolerance: f32,
    pub hit_x: f32,
    pub hit_y: f32,
    pub pool_size: usize,
    pub size: f32,
    pub color: Color,
}

impl Default for CometConfig {
    fn default() -> Self {
        Self {
            speed: 12.0,
            lifetime: 2.6,
            start_offset: Vec3::new(8.0, 6.0, 12.0),
            plane_tolerance: 0.15,
            hit_x: 0.6,
            hit_y: 0.8,
            pool_size: 4,
            size: 0.28,
            color: Color::from_hex(0xffd089),
        }
    }
}

impl CometConfig {
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();
        if let Some(v) = table.get("speed") {
            config.speed = toml_f32(v, config.speed);
        }
        if let Some(v) = table.get("lifetime") {
            config.lifetime = toml_f32(v, config.lifetime);
        }
        if let Some(v) = table.get("start_offset") {
            config.start_offset = toml_vec3(v, config.start_offset);
        }
        if let Some(v) = table.get("plane_tolerance") {
            config.plane_tolerance = toml_f32(v, config.plane_tolerance);
        }
        if let Some(v) = table.get("hit_x") {
            config.hit_x = toml_f32(v, config.hit_x);
        }
        if let Some(v) = table.get("hit_y") {
            config.hit_y = toml_f32(v, config.hit_y);
        }
        if let Some(v) = table.get("pool_size") {
            config.pool_size = toml_usize("comet.pool_size", v).unwrap_or(config.pool_size);
        }
        if let Some(v) = table.get("size") {
            config.size = toml_f32(v, config.size);
        }
        if let Some(v) = table.get("color") {
            config.color = toml_color(v, config.color);
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(NebulaError::ValidationError(
                "comet.pool_size must be at least 1".into(),
            ));
        }
        ensure_positive("comet.speed", self.speed)?;
        ensure_positive("comet.lifetime", self.lifetime)?;
        ensure_positive("comet.plane_tolerance", self.plane_tolerance)?;
        if self.start_offset.length_squared() <= f32::EPSILON {
            return Err(NebulaError::ValidationError(
                "comet.start_offset must not be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Every effect's settings in one place
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Theme {
    pub burst: BurstConfig,
    pub meteors: MeteorConfig,
    pub smoke: SmokeConfig,
    pub screen: ScreenConfig,
    pub comet: CometConfig,
}

impl Theme {
    /// Parse `[burst]`, `[meteors]`, `[smoke]`, `[screen]` and `[comet]`
    /// tables. Missing tables keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let root: toml::value::Table = toml::from_str(source)?;
        let mut theme = Self::default();
        for (key, value) in &root {
            let Some(table) = value.as_table() else {
                return Err(NebulaError::ValidationError(format!(
                    "top-level key '{key}' must be a table"
                )));
            };
            match key.as_str() {
                "burst" => theme.burst = BurstConfig::from_toml(table),
                "meteors" => theme.meteors = MeteorConfig::from_toml(table),
                "smoke" => theme.smoke = SmokeConfig::from_toml(table),
                "screen" => theme.screen = ScreenConfig::from_toml(table),
                "comet" => theme.comet = CometConfig::from_toml(table),
                other => log::warn!("ignoring unknown theme section [{other}]"),
            }
        }
        theme.validate()?;
        Ok(theme)
    }

    /// Read and parse a theme file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        self.burst.validate()?;
        self.meteors.validate()?;
        self.smoke.validate()?;
        self.screen.validate()?;
        self.comet.validate()?;
        Ok(())
    }
}

fn ensure_positive(field: &str, value: f32) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NebulaError::out_of_range(
            field,
            0.0,
            f64::INFINITY,
            value as f64,
        ))
    }
}

fn ensure_range(field: &str, value: f32, min: f32, max: f32) -> Result<()> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(NebulaError::out_of_range(
            field,
            min as f64,
            max as f64,
            value as f64,
        ))
    }
}

// ── TOML helpers (handle integer/float coercion) ──

fn toml_f32(v: &toml::Value, default: f32) -> f32 {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .unwrap_or(default)
}

fn toml_u32(v: &toml::Value, default: u32) -> u32 {
    v.as_integer()
        .map(|i| i.clamp(0, u32::MAX as i64) as u32)
        .unwrap_or(default)
}

/// Integer counts only; anything else is ignored with a warning so every
/// section treats a mistyped count the same way.
fn toml_usize(field: &str, v: &toml::Value) -> Option<usize> {
    match v.as_integer() {
        Some(i) => Some(i.max(0) as usize),
        None => {
            log::warn!("{field} must be an integer, got {v}; keeping the default");
            None
        }
    }
}

fn toml_vec2(v: &toml::Value, default: [f32; 2]) -> [f32; 2] {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 2 {
            return [toml_f32(&arr[0], default[0]), toml_f32(&arr[1], default[1])];
        }
    }
    default
}

fn toml_vec3(v: &toml::Value, default: Vec3) -> Vec3 {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 3 {
            return Vec3::new(
                toml_f32(&arr[0], default.x),
                toml_f32(&arr[1], default.y),
                toml_f32(&arr[2], default.z),
            );
        }
    }
    default
}

fn toml_color(v: &toml::Value, default: Color) -> Color {
    if let Some(s) = v.as_str() {
        let hex = s.trim_start_matches('#');
        return u32::from_str_radix(hex, 16)
            .map(Color::from_hex)
            .unwrap_or(default);
    }
    if let Some(arr) = v.as_array() {
        if arr.len() >= 3 {
            return Color::new(
                toml_f32(&arr[0], default.r),
                toml_f32(&arr[1], default.g),
                toml_f32(&arr[2], default.b),
                arr.get(3).map(|a| toml_f32(a, 1.0)).unwrap_or(1.0),
            );
        }
    }
    default
}
