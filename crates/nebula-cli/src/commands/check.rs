//! Theme validation command

use anyhow::Result;
use nebula_fx::Theme;

pub fn run(path: &str) -> Result<()> {
    log::info!("checking theme {}", path);
    match Theme::load(path) {
        Ok(theme) => {
            println!("{}: OK", path);
            println!(
                "  burst every {}s ({} meteors), {}x{} screen tiles",
                theme.burst.interval, theme.burst.count, theme.screen.grid_x, theme.screen.grid_y
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", path, e);
            std::process::exit(1);
        }
    }
}
