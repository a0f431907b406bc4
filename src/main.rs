use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;

use crystalfx::config::SceneConfig;
use crystalfx::experience::{Experience, Sizes};
use crystalfx::renderer::HeadlessRenderer;
use crystalfx::window;

const USAGE: &str = "usage: crystalfx [--config <path>] [--debug] [--headless <frames>]";

/// Fixed step for headless runs, in milliseconds.
const HEADLESS_FRAME_MS: f32 = 1000.0 / 60.0;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    debug: bool,
    headless: Option<u64>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--debug" => parsed.debug = true,
            "--headless" => {
                let frames = args.next().context("--headless needs a frame count")?;
                parsed.headless = Some(
                    frames
                        .parse()
                        .with_context(|| format!("invalid frame count '{}'", frames))?,
                );
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => bail!("unknown argument '{}'\n{}", other, USAGE),
        }
    }
    Ok(parsed)
}

/// Step the experience without a window, revealing once composed.
fn run_headless(config: SceneConfig, frames: u64) -> Result<()> {
    let sizes = Sizes::new(config.window.width, config.window.height, 1.0);
    let renderer = HeadlessRenderer::new(sizes.width, sizes.height, sizes.pixel_ratio);
    let mut experience = Experience::new(config, Box::new(renderer), sizes)?;

    let mut revealed = false;
    for _ in 0..frames {
        experience.step(HEADLESS_FRAME_MS)?;
        if !revealed && experience.world().is_composed() {
            experience.reveal();
            revealed = true;
        }
    }

    for entity in experience.world().entities() {
        info!("{}: {:?}", entity.name(), entity.reveal_state());
    }
    info!(
        "Rendered {} frames over {:.2}s at {:.1} fps",
        experience.frames_rendered(),
        experience.timeline().time(),
        experience.clock().fps()
    );
    experience.destroy();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(std::env::args().skip(1))?;
    let mut config = match &args.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SceneConfig::default(),
    };
    config.debug |= args.debug;

    match args.headless {
        Some(frames) => run_headless(config, frames),
        None => Ok(window::run(config)?),
    }
}
