//! Headless simulation command

use anyhow::{Context, Result};
use glam::Vec2;
use nebula_core::{Material, NodeKind, Scene, Transform};
use nebula_fx::{Effects, Theme};
use nebula_runtime::{EffectEvent, GameClock, Stage};
use serde::Serialize;

pub struct SimulateArgs {
    pub theme: Option<String>,
    pub seconds: f64,
    pub fps: u32,
    pub seed: u32,
    pub comet_at: Vec<f64>,
    pub media: Option<[f32; 2]>,
    pub format: String,
    /// Include every visible node of the final frame in the report
    pub nodes: bool,
}

/// A drawable node as the renderer would see it
#[derive(Debug, Serialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub render_order: i32,
    pub transform: Transform,
    pub material: Material,
}

/// What happened during a run
#[derive(Debug, Default, Serialize)]
pub struct SimulationReport {
    pub seconds: f64,
    pub frames: u64,
    pub schedules: u32,
    pub meteors_spawned: u64,
    pub meteors_skipped: u64,
    pub peak_active_meteors: usize,
    pub peak_active_smoke: usize,
    pub smoke_emitted: u64,
    pub comets_launched: u64,
    pub comet_impacts: u64,
    pub rejected_launches: u64,
    pub shatters: u32,
    pub heals: u32,
    pub media_ready_at: Option<f64>,
    pub final_phase: String,
    pub final_visible_nodes: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub visible_nodes: Vec<NodeSnapshot>,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let theme = match &args.theme {
        Some(path) => {
            log::info!("loading theme {}", path);
            Theme::load(path).with_context(|| format!("Failed to load theme {}", path))?
        }
        None => Theme::default(),
    };
    if args.fps == 0 {
        anyhow::bail!("--fps must be at least 1");
    }

    let report = simulate(&theme, &args)?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report_text(&report);
    }
    Ok(())
}

/// Drive every effect for `args.seconds` at `args.fps`
pub fn simulate(theme: &Theme, args: &SimulateArgs) -> Result<SimulationReport> {
    log::info!(
        "simulating {}s at {} fps (seed {})",
        args.seconds,
        args.fps,
        args.seed
    );
    let mut stage = Stage::new();
    let mut effects = Effects::new(&mut stage, theme, args.seed)?;
    let mut clock = GameClock::with_fixed_timestep(args.fps as f64);
    let dt = 1.0 / args.fps as f64;
    let frames = (args.seconds * args.fps as f64).round().max(0.0) as u64;

    let mut launches = args.comet_at.clone();
    launches.sort_by(f64::total_cmp);
    let mut launches = launches.into_iter().peekable();

    if let Some([w, h]) = args.media {
        effects.screen.notify_media_size(w, h);
    }

    let mut report = SimulationReport::default();
    for _ in 0..frames {
        clock.advance(dt);
        while launches.next_if(|at| *at <= clock.total_time).is_some() {
            effects.launch_comet(&mut stage, Vec2::ZERO);
        }

        while clock.fixed.should_step() {
            clock.fixed.consume();
            effects.fixed_update(&mut stage, clock.fixed.step)?;
        }
        for event in effects.update(&mut stage, clock.delta_time)? {
            match event {
                EffectEvent::ShatterHealed => report.heals += 1,
                EffectEvent::MediaReady { .. } => report.media_ready_at = Some(clock.total_time),
                _ => {}
            }
        }

        report.peak_active_meteors = report.peak_active_meteors.max(effects.meteors.active_count());
        report.peak_active_smoke = report
            .peak_active_smoke
            .max(effects.meteors.smoke().active_count());
    }
    effects.shutdown()?;

    report.seconds = clock.total_time;
    report.frames = clock.frame;
    report.schedules = effects.meteors.scheduler().schedules_generated();
    report.meteors_spawned = effects.meteors.spawned();
    report.meteors_skipped = effects.meteors.dropped();
    report.smoke_emitted = effects.meteors.smoke().emitted();
    report.comets_launched = effects.comets.launched();
    report.comet_impacts = effects.comets.impacts();
    report.rejected_launches = effects.rejected_launches();
    report.shatters = effects.screen.shatters();
    report.final_phase = format!("{:?}", effects.screen.phase());
    report.final_visible_nodes = stage.scene.visible_count();
    if args.nodes {
        report.visible_nodes = snapshot_visible(&stage.scene);
    }
    log::info!(
        "{} frames, {} meteors, {} shatters",
        report.frames,
        report.meteors_spawned,
        report.shatters
    );
    Ok(report)
}

fn snapshot_visible(scene: &Scene) -> Vec<NodeSnapshot> {
    scene
        .iter()
        .filter(|(h, n)| n.kind != NodeKind::Group && scene.is_effectively_visible(*h))
        .map(|(_, n)| NodeSnapshot {
            name: n.name.clone(),
            render_order: n.render_order,
            transform: n.transform,
            material: n.material.clone(),
        })
        .collect()
}

fn print_report_text(report: &SimulationReport) {
    println!(
        "Simulated {:.2}s ({} frames)",
        report.seconds, report.frames
    );
    println!();
    println!("Meteors:");
    println!("  Burst schedules: {}", report.schedules);
    println!(
        "  Spawned:         {} ({} skipped, pool full)",
        report.meteors_spawned, report.meteors_skipped
    );
    println!("  Peak active:     {}", report.peak_active_meteors);
    println!(
        "  Smoke puffs:     {} (peak {})",
        report.smoke_emitted, report.peak_active_smoke
    );
    println!();
    println!("Screen:");
    match report.media_ready_at {
        Some(t) => println!("  Media ready at:  {:.2}s", t),
        None => println!("  Media ready at:  never"),
    }
    println!(
        "  Comets:          {} launched, {} hit, {} refused",
        report.comets_launched, report.comet_impacts, report.rejected_launches
    );
    println!(
        "  Shatters:        {} ({} healed)",
        report.shatters, report.heals
    );
    println!("  Final phase:     {}", report.final_phase);
    println!();
    println!("Visible nodes at end: {}", report.final_visible_nodes);
    for node in &report.visible_nodes {
        let p = node.transform.position;
        println!(
            "  {:<16} ({:.2}, {:.2}, {:.2}) {:?} opacity {:.2}",
            node.name, p.x, p.y, p.z, node.material.blend, node.material.opacity
        );
    }
}
