//! Built-in scenes.

use std::sync::Arc;

use clap::ValueEnum;
use lumen_math::sampling::{gen_f32, gen_range, random_vec};
use lumen_renderer::{Color, Dielectric, HittableList, Lambertian, Material, Metal, Sphere, Vec3};
use rand::RngCore;
use serde::Deserialize;

/// Which built-in scene to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Ground, three large spheres and a field of small random spheres
    #[default]
    Random,
    /// Ground and the three large spheres only
    Showcase,
}

impl SceneKind {
    pub fn build(self, rng: &mut dyn RngCore) -> HittableList {
        match self {
            SceneKind::Random => random_scene(rng),
            SceneKind::Showcase => showcase_scene(),
        }
    }
}

/// Ground plus the glass, diffuse and mirror spheres.
pub fn showcase_scene() -> HittableList {
    let mut world = HittableList::new();
    add_ground(&mut world);
    add_feature_spheres(&mut world);
    world
}

/// The showcase scene surrounded by a 22x22 grid of small spheres with
/// randomized materials.
pub fn random_scene(rng: &mut dyn RngCore) -> HittableList {
    let mut world = HittableList::new();
    add_ground(&mut world);

    // Small glass spheres all share one material
    let glass: Arc<dyn Material> = Arc::new(Dielectric::new(1.5));
    let clearing = Vec3::new(4.0, 0.2, 0.0);

    for a in -11..11 {
        for b in -11..11 {
            let choose_mat = gen_f32(rng);
            let center = Vec3::new(
                a as f32 + 0.9 * gen_f32(rng),
                0.2,
                b as f32 + 0.9 * gen_f32(rng),
            );

            if (center - clearing).length() <= 0.9 {
                continue;
            }

            let material: Arc<dyn Material> = if choose_mat < 0.8 {
                // Diffuse
                let albedo = random_vec(rng, 0.0, 1.0) * random_vec(rng, 0.0, 1.0);
                Arc::new(Lambertian::new(albedo))
            } else if choose_mat < 0.95 {
                // Metal
                let albedo = random_vec(rng, 0.5, 1.0);
                let fuzz = gen_range(rng, 0.0, 0.5);
                Arc::new(Metal::new(albedo, fuzz))
            } else {
                glass.clone()
            };
            world.add(Box::new(Sphere::new(center, 0.2, material)));
        }
    }

    add_feature_spheres(&mut world);
    log::info!("Built random scene with {} spheres", world.len());
    world
}

fn add_ground(world: &mut HittableList) {
    world.add(Box::new(Sphere::new(
        Vec3::new(0.0, -1000.0, 0.0),
        1000.0,
        Arc::new(Lambertian::new(Color::new(0.5, 0.5, 0.5))),
    )));
}

fn add_feature_spheres(world: &mut HittableList) {
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
}
