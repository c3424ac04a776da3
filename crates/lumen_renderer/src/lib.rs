//! Lumen Renderer - CPU Path Tracing
//!
//! A Monte Carlo path tracer for scenes made of spheres, with diffuse,
//! metallic and dielectric materials, a thin-lens camera and a parallel
//! scanline scheduler.

mod camera;
mod hittable;
mod material;
mod output;
mod renderer;
mod scheduler;
mod sphere;

pub use camera::{Camera, CameraSettings};
pub use hittable::{HitRecord, Hittable, HittableList};
pub use material::{Color, Dielectric, Lambertian, Material, Metal, ScatterResult};
pub use output::{color_to_rgb8, OutputError, OutputResult, PixelSink, PngWriter, PpmWriter};
pub use renderer::{
    linear_to_gamma, ray_color, render_pixel, sky_gradient, ImageBuffer, RenderConfig, Resolution,
    T_MIN,
};
pub use scheduler::{render, RenderError, RenderResult};
pub use sphere::Sphere;

/// Re-export Vec3 and common math types from lumen_math
pub use lumen_math::{Interval, Ray, Vec3};
