//! Core path tracing integrator.
//!
//! Implements Monte Carlo path tracing with:
//! - Bounded ray bouncing with configurable depth
//! - Sky gradient environment light
//! - Gamma correction
//! - Anti-aliasing via jittered multi-sampling

use crate::{Camera, Color, Hittable, Ray};
use lumen_math::sampling::gen_f32;
use lumen_math::Interval;
use rand::RngCore;

/// Smallest accepted hit distance; keeps bounced rays off their own surface.
pub const T_MIN: f32 = 0.001;

/// Render configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Samples per pixel for anti-aliasing
    pub samples_per_pixel: u32,
    /// Maximum ray bounce depth
    pub max_depth: u32,
    /// Worker thread count; `None` uses every available core
    pub threads: Option<usize>,
    /// Seed for per-row random streams; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 100,
            max_depth: 50,
            threads: None,
            seed: None,
        }
    }
}

/// Output image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Height for a given width and aspect ratio, at least one pixel.
    ///
    /// Rounds to the nearest pixel, since ratios like 16/9 aren't exact in f32.
    pub fn from_aspect_ratio(width: u32, aspect_ratio: f32) -> Self {
        let height = ((width as f32 / aspect_ratio).round() as u32).max(1);
        Self::new(width, height)
    }

    /// Map a pixel plus sub-pixel offset to screen coordinates.
    ///
    /// Row 0 is the top of the image, so `t` runs downwards as `y` grows.
    pub fn screen_coords(&self, x: u32, y: u32, jitter_x: f32, jitter_y: f32) -> (f32, f32) {
        let s = (x as f32 + jitter_x) / self.width.saturating_sub(1).max(1) as f32;
        let row_from_bottom = self.height.saturating_sub(1 + y);
        let t = (row_from_bottom as f32 + jitter_y) / self.height.saturating_sub(1).max(1) as f32;
        (s, t)
    }
}

/// Compute the color seen by a ray.
///
/// Each bounce multiplies the carried attenuation; the budget drops by one
/// per bounce, so the loop runs at most `depth` times.
pub fn ray_color(ray: &Ray, world: &dyn Hittable, depth: u32, rng: &mut dyn RngCore) -> Color {
    let mut attenuation = Color::ONE;
    let mut ray = *ray;

    for _ in 0..depth {
        let Some(rec) = world.hit(&ray, Interval::new(T_MIN, f32::INFINITY)) else {
            // Ray escaped - light it with the sky
            return attenuation * sky_gradient(&ray);
        };

        match rec.material.scatter(&ray, &rec, rng) {
            Some(result) => {
                attenuation *= result.attenuation;
                ray = result.scattered;
            }
            // Ray was absorbed
            None => return Color::ZERO,
        }
    }

    // Exceeded max depth: no more light is gathered
    Color::ZERO
}

/// Compute sky gradient background.
pub fn sky_gradient(ray: &Ray) -> Color {
    let unit_direction = ray.direction().normalize();
    let a = 0.5 * (unit_direction.y + 1.0);
    let white = Color::new(1.0, 1.0, 1.0);
    let blue = Color::new(0.5, 0.7, 1.0);
    white * (1.0 - a) + blue * a
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Render a single pixel with multi-sampling.
///
/// Returns the averaged linear color.
pub fn render_pixel(
    camera: &Camera,
    world: &dyn Hittable,
    x: u32,
    y: u32,
    resolution: Resolution,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> Color {
    let mut pixel_color = Color::ZERO;

    for _ in 0..config.samples_per_pixel {
        let (s, t) = resolution.screen_coords(x, y, gen_f32(rng), gen_f32(rng));
        let ray = camera.get_ray(s, t, rng);
        pixel_color += ray_color(&ray, world, config.max_depth, rng);
    }

    // Average the samples
    pixel_color / config.samples_per_pixel.max(1) as f32
}

/// Rendered image, row-major with row 0 at the top.
///
/// Colors are gamma corrected and unclamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.index(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let index = self.index(x, y);
        self.pixels[index] = color;
    }

    /// Pixels of row `y`, left to right.
    pub fn row(&self, y: u32) -> &[Color] {
        let start = self.index(0, y);
        &self.pixels[start..start + self.width as usize]
    }

    pub(crate) fn row_mut(&mut self, y: u32) -> &mut [Color] {
        let start = self.index(0, y);
        let width = self.width as usize;
        &mut self.pixels[start..start + width]
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Color]> {
        self.pixels.chunks(self.width.max(1) as usize)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CameraSettings, HittableList, Lambertian, Material, Metal, Sphere, Vec3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn test_sky_gradient() {
        let up_color = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)));
        let down_color = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0)));
        let level = sky_gradient(&Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -3.0)));

        assert_eq!(up_color, Color::new(0.5, 0.7, 1.0));
        assert_eq!(down_color, Color::ONE);
        assert!((level - Color::new(0.75, 0.85, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert_eq!(linear_to_gamma(-0.5), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_zero_depth_is_black() {
        // Two facing mirrors: a hall of mirrors
        let mirror: Arc<dyn Material> = Arc::new(Metal::new(Color::ONE, 0.0));
        let mut world = HittableList::new();
        world.add(Box::new(Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, mirror.clone())));
        world.add(Box::new(Sphere::new(Vec3::new(0.0, 0.0, 3.0), 1.0, mirror)));

        let mut rng = StdRng::seed_from_u64(1);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert_eq!(ray_color(&ray, &world, 0, &mut rng), Color::ZERO);

        // Perfect mirrors bounce forever along the axis; any budget runs out
        assert_eq!(ray_color(&ray, &world, 25, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_miss_returns_sky() {
        let world = HittableList::new();
        let mut rng = StdRng::seed_from_u64(2);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.2, 0.4, -1.0));

        assert_eq!(ray_color(&ray, &world, 1, &mut rng), sky_gradient(&ray));
    }

    #[test]
    fn test_single_bounce_is_black() {
        let mut world = HittableList::new();
        world.add(Box::new(Sphere::new(
            Vec3::new(0.0, 0.0, -2.0),
            0.5,
            Arc::new(Lambertian::new(Color::splat(0.5))),
        )));
        let mut rng = StdRng::seed_from_u64(3);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        // The scattered ray has no budget left
        assert_eq!(ray_color(&ray, &world, 1, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_bounce_attenuates_sky() {
        // Mirror floor: looking down at it shows the sky darkened by the albedo
        let mut world = HittableList::new();
        world.add(Box::new(Sphere::new(
            Vec3::new(0.0, -1000.0, 0.0),
            999.0,
            Arc::new(Metal::new(Color::new(0.5, 0.5, 0.5), 0.0)),
        )));
        let mut rng = StdRng::seed_from_u64(4);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0));

        let color = ray_color(&ray, &world, 5, &mut rng);
        assert!((color - 0.5 * Color::new(0.5, 0.7, 1.0)).length() < 1e-4);
    }

    #[test]
    fn test_render_pixel() {
        let mut world = HittableList::new();
        world.add(Box::new(Sphere::new(
            Vec3::new(0.0, 0.0, -1.0),
            0.5,
            Arc::new(Lambertian::new(Color::new(0.5, 0.5, 0.5))),
        )));

        let camera = Camera::new(
            &CameraSettings::default()
                .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
                .with_lens(90.0, 0.0, 1.0)
                .with_aspect_ratio(1.0),
        );
        let config = RenderConfig {
            samples_per_pixel: 4,
            max_depth: 5,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(42);

        // Center pixel hits the sphere, so it is darker than the sky
        let color = render_pixel(&camera, &world, 5, 5, Resolution::new(11, 11), &config, &mut rng);
        assert!(color.length() > 0.0);
        assert!(color.x < 0.75);
    }

    #[test]
    fn test_screen_coords() {
        let resolution = Resolution::new(11, 5);

        assert_eq!(resolution.screen_coords(0, 0, 0.0, 0.0), (0.0, 1.0));
        assert_eq!(resolution.screen_coords(10, 4, 0.0, 0.0), (1.0, 0.0));
        assert_eq!(resolution.screen_coords(5, 2, 0.0, 0.0), (0.5, 0.5));

        // Degenerate sizes don't divide by zero
        let single = Resolution::new(1, 1);
        assert_eq!(single.screen_coords(0, 0, 0.5, 0.5), (0.5, 0.5));
    }

    #[test]
    fn test_resolution_from_aspect_ratio() {
        assert_eq!(Resolution::from_aspect_ratio(300, 1.5), Resolution::new(300, 200));
        assert_eq!(Resolution::from_aspect_ratio(2560, 16.0 / 9.0), Resolution::new(2560, 1440));
        assert_eq!(Resolution::from_aspect_ratio(1, 4.0), Resolution::new(1, 1));
    }

    #[test]
    fn test_image_buffer_rows() {
        let mut image = ImageBuffer::new(3, 2);
        image.set(1, 1, Color::ONE);
        image.row_mut(0)[2] = Color::X;

        assert_eq!(image.get(1, 1), Color::ONE);
        assert_eq!(image.row(0), &[Color::ZERO, Color::ZERO, Color::X]);
        assert_eq!(image.rows().count(), 2);
    }
}
