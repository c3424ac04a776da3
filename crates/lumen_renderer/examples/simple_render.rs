//! Simple path tracer example.
//!
//! Renders three spheres on a ground plane and saves to PPM format.

use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use std::time::Instant;

use lumen_renderer::{
    render, Camera, CameraSettings, Color, Dielectric, HittableList, Lambertian, Metal,
    PpmWriter, RenderConfig, Resolution, Sphere, Vec3,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    print_banner();

    let start = Instant::now();
    let world = build_scene();
    println!("Scene built in {:?}", start.elapsed());

    let settings = CameraSettings::default()
        .with_position(Vec3::new(13.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y)
        .with_lens(20.0, 0.1, 10.0);
    let camera = Camera::new(&settings);
    let resolution = Resolution::from_aspect_ratio(800, settings.aspect_ratio);

    let config = RenderConfig {
        samples_per_pixel: 32,
        max_depth: 10,
        ..RenderConfig::default()
    };

    println!(
        "Rendering {}x{} @ {} spp...",
        resolution.width, resolution.height, config.samples_per_pixel
    );

    let start = Instant::now();
    let image = render(&world, &camera, resolution, &config)?;
    println!("Rendered in {:?}", start.elapsed());

    let filename = "output.ppm";
    let file = BufWriter::new(File::create(filename)?);
    let mut sink = PpmWriter::new(file, image.width, image.height)?;
    image.write_to(&mut sink)?;
    println!("Saved to {}", filename);

    Ok(())
}

fn print_banner() {
    println!("Lumen Path Tracer - Simple Example");
    println!("==================================");
}

fn build_scene() -> HittableList {
    let mut world = HittableList::new();

    world.add(Box::new(Sphere::new(
        Vec3::new(0.0, -1000.0, 0.0),
        1000.0,
        Arc::new(Lambertian::new(Color::new(0.5, 0.5, 0.5))),
    )));

    world.add(Box::new(Sphere::new(
        Vec3::new(0.0, 1.0, 0.0),
        1.0,
        Arc::new(Dielectric::new(1.5)),
    )));

    world.add(Box::new(Sphere::new(
        Vec3::new(-4.0, 1.0, 0.0),
        1.0,
        Arc::new(Lambertian::new(Color::new(0.4, 0.2, 0.1))),
    )));

    world.add(Box::new(Sphere::new(
        Vec3::new(4.0, 1.0, 0.0),
        1.0,
        Arc::new(Metal::new(Color::new(0.7, 0.6, 0.5), 0.0)),
    )));

    world
}
