use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use lumen_renderer::{render, Camera, ImageBuffer, PixelSink, PngWriter, PpmWriter};
use rand::rngs::StdRng;
use rand::SeedableRng;

mod config;
mod scenes;

use config::{Args, Settings};

/// Pick a sink from the output extension and write the image.
fn save_image(image: &ImageBuffer, path: &Path) -> Result<()> {
    let is_png = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));

    let mut sink: Box<dyn PixelSink> = if is_png {
        Box::new(PngWriter::new(path, image.width, image.height))
    } else {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Box::new(PpmWriter::new(BufWriter::new(file), image.width, image.height)?)
    };

    image
        .write_to(sink.as_mut())
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let settings = Settings::from_args(&args)?;
    log::info!("Starting Lumen with {:?}", settings);

    // Scene layout follows the render seed when one is given
    let mut scene_rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let start = Instant::now();
    let world = settings.scene.build(&mut scene_rng);
    log::info!("Scene built in {:?}", start.elapsed());

    let camera = Camera::new(&settings.camera);
    let image = render(
        &world,
        &camera,
        settings.resolution(),
        &settings.render_config(),
    )?;

    save_image(&image, &args.output)?;
    log::info!("Saved to {}", args.output.display());

    Ok(())
}
