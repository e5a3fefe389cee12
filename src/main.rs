use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info};

use spritegen::capture::{capture, CaptureContext, ViewportHelpers};
use spritegen::cli::{Backend, Cli};
use spritegen::export::{save_frames, save_sheet, write_metadata};
use spritegen::loaders::load_model;
use spritegen::placement::SourceFormat;
use spritegen::render::{orbit_position, GpuRasterizer, PerspectiveCamera, Rasterizer, SoftwareRasterizer};
use spritegen::scene::{cube_model, normalize::normalize_model};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        eprintln!("Error generating sprite sheet: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let params = cli.capture_parameters()?;
    params.validate().map_err(|e| anyhow!(e))?;

    let (model, format) = match &cli.model {
        Some(path) => load_model(path)?,
        None => (cube_model(), SourceFormat::Gltf),
    };
    let normalized = normalize_model(model, cli.scale);
    let mut subject = normalized.root;

    let mut camera = PerspectiveCamera::default();
    camera.look_at(
        orbit_position(
            params.camera_distance,
            params.initial_angle_deg,
            params.vertical_angle_deg,
        ),
        glam::Vec3::ZERO,
    );
    let mut helpers = ViewportHelpers::default();

    let mut rasterizer: Box<dyn Rasterizer> = match cli.backend {
        Backend::Software => Box::new(SoftwareRasterizer::new()),
        Backend::Gpu => Box::new(
            pollster::block_on(GpuRasterizer::create()).context("Failed to initialize GPU")?,
        ),
    };

    let mut report = |done: usize, total: usize| info!("Frame {}/{}", done, total);
    let ctx = CaptureContext {
        subject: &mut subject,
        camera: &camera,
        helpers: &mut helpers,
        format,
        rasterizer: rasterizer.as_mut(),
        progress: Some(&mut report),
    };
    let result = pollster::block_on(capture(ctx, &params))?;

    save_sheet(&result.sheet, &cli.output)?;
    if cli.frames {
        save_frames(&result.frames, &cli.output)?;
    }
    if cli.metadata {
        write_metadata(&result.sheet, &result.frames, &params, &cli.output)?;
    }

    Ok(())
}
