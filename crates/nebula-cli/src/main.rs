//! Nebula CLI - drive the effects headlessly and check themes

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, simulate};

#[derive(Parser)]
#[command(name = "nebula")]
#[command(about = "Headless driver for the Nebula meteor and screen effects", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the effects without a renderer and report what happened
    Simulate {
        /// Theme file (defaults are used when omitted)
        #[arg(long)]
        theme: Option<String>,

        /// Simulated duration in seconds
        #[arg(long, default_value = "10")]
        seconds: f64,

        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Seed for every random stream
        #[arg(long, default_value = "1")]
        seed: u32,

        /// Launch a comet at the screen center at this time (repeatable)
        #[arg(long = "comet-at")]
        comet_at: Vec<f64>,

        /// Report media dimensions at start-up instead of waiting for the
        /// fallback (e.g. 1920x1080)
        #[arg(long, value_parser = parse_media)]
        media: Option<[f32; 2]>,

        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = parse_format)]
        format: String,

        /// List every visible node of the final frame
        #[arg(long)]
        nodes: bool,
    },

    /// Parse and validate a theme file
    Check {
        /// Path to theme file
        theme: String,
    },
}

fn parse_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("unknown format '{}'; valid values: text, json", s)),
    }
}

fn parse_media(s: &str) -> Result<[f32; 2], String> {
    let Some((w, h)) = s.split_once(['x', 'X']) else {
        return Err(format!("expected WIDTHxHEIGHT, got '{}'", s));
    };
    let w: f32 = w.trim().parse().map_err(|e| format!("invalid width: {}", e))?;
    let h: f32 = h.trim().parse().map_err(|e| format!("invalid height: {}", e))?;
    if w <= 0.0 || h <= 0.0 {
        return Err("media dimensions must be positive".to_string());
    }
    Ok([w, h])
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            theme,
            seconds,
            fps,
            seed,
            comet_at,
            media,
            format,
            nodes,
        } => simulate::run(simulate::SimulateArgs {
            theme,
            seconds,
            fps,
            seed,
            comet_at,
            media,
            format,
            nodes,
        }),
        Commands::Check { theme } => check::run(&theme),
    }
}
