//! Parallel scanline scheduling.
//!
//! A fixed rayon pool runs one worker per thread. Workers race for rows via
//! an atomic counter, keep their finished rows locally tagged with the row
//! index, and the rows are put back in place once every worker has returned.
//! The final image therefore does not depend on which worker rendered which
//! row or in what order they finished.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rayon::ThreadPoolBuilder;
use thiserror::Error;

use crate::renderer::{linear_to_gamma, render_pixel};
use crate::{Camera, Color, Hittable, ImageBuffer, RenderConfig, Resolution};

/// Errors that can occur while rendering a frame.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid resolution: {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    #[error("Samples per pixel must be at least 1")]
    NoSamples,

    #[error("Failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Row {0} was never rendered")]
    MissingRow(u32),

    #[error("Row {0} was rendered more than once")]
    DuplicateRow(u32),

    #[error("Row {row} is outside an image of height {height}")]
    RowOutOfRange { row: u32, height: u32 },
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Finished row, tagged with its index in the image.
#[derive(Debug, Clone)]
struct RowResult {
    row: u32,
    pixels: Vec<Color>,
}

/// Shared row counter plus progress bookkeeping.
struct Scanlines {
    height: u32,
    next: AtomicUsize,
    done: AtomicUsize,
    report_every: usize,
}

impl Scanlines {
    fn new(height: u32) -> Self {
        Self {
            height,
            next: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            report_every: (height as usize / 10).max(1),
        }
    }

    /// Claim the next unrendered row, or `None` once every row is taken.
    fn claim(&self) -> Option<u32> {
        let row = self.next.fetch_add(1, Ordering::Relaxed);
        (row < self.height as usize).then_some(row as u32)
    }

    fn finish_row(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.report_every == 0 || done == self.height as usize {
            log::info!("Scanlines finished: {}/{}", done, self.height);
        }
    }

    /// Keep claiming and rendering rows until none are left.
    fn drain<F>(&self, mut render_row: F) -> Vec<RowResult>
    where
        F: FnMut(u32) -> Vec<Color>,
    {
        let mut rows = Vec::new();
        while let Some(row) = self.claim() {
            let pixels = render_row(row);
            log::trace!("Rendered row {}", row);
            rows.push(RowResult { row, pixels });
            self.finish_row();
        }
        rows
    }
}

/// Render the whole image in parallel.
///
/// Rows come back gamma corrected, with row 0 at the top of the image.
pub fn render(
    world: &dyn Hittable,
    camera: &Camera,
    resolution: Resolution,
    config: &RenderConfig,
) -> RenderResult<ImageBuffer> {
    if resolution.width == 0 || resolution.height == 0 {
        return Err(RenderError::InvalidResolution {
            width: resolution.width,
            height: resolution.height,
        });
    }
    if config.samples_per_pixel == 0 {
        return Err(RenderError::NoSamples);
    }

    // 0 lets rayon pick one thread per available core
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.threads.unwrap_or(0))
        .thread_name(|i| format!("lumen-render-{}", i))
        .build()?;

    log::info!(
        "Rendering {}x{} @ {} spp, max depth {}, {} threads",
        resolution.width,
        resolution.height,
        config.samples_per_pixel,
        config.max_depth,
        pool.current_num_threads()
    );

    let start = Instant::now();
    let scanlines = Scanlines::new(resolution.height);

    let worker_rows = pool.broadcast(|ctx| {
        let worker_start = Instant::now();
        let mut worker_rng = StdRng::from_entropy();

        let rows = scanlines.drain(|row| {
            let mut rng = row_rng(config.seed, row, &mut worker_rng);
            render_row(world, camera, row, resolution, config, &mut rng)
        });

        log::debug!(
            "Worker {} rendered {} rows in {:?}",
            ctx.index(),
            rows.len(),
            worker_start.elapsed()
        );
        rows
    });

    let image = reassemble(resolution, worker_rows)?;
    log::info!("Rendered in {:?}", start.elapsed());
    Ok(image)
}

/// Random stream for one row.
///
/// Seeded renders derive it from the row index alone, so the output does not
/// depend on the number of workers.
fn row_rng(seed: Option<u64>, row: u32, worker_rng: &mut StdRng) -> StdRng {
    match seed {
        Some(seed) => {
            StdRng::seed_from_u64(seed ^ u64::from(row).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        }
        None => StdRng::seed_from_u64(worker_rng.gen()),
    }
}

fn render_row(
    world: &dyn Hittable,
    camera: &Camera,
    row: u32,
    resolution: Resolution,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> Vec<Color> {
    let mut pixels = Vec::with_capacity(resolution.width as usize);
    for x in 0..resolution.width {
        let linear = render_pixel(camera, world, x, row, resolution, config, rng);
        pixels.push(Color::new(
            linear_to_gamma(linear.x),
            linear_to_gamma(linear.y),
            linear_to_gamma(linear.z),
        ));
    }
    pixels
}

/// Place every worker's rows at their index.
fn reassemble(
    resolution: Resolution,
    worker_rows: Vec<Vec<RowResult>>,
) -> RenderResult<ImageBuffer> {
    let mut slots: Vec<Option<Vec<Color>>> = vec![None; resolution.height as usize];
    for result in worker_rows.into_iter().flatten() {
        let slot = slots
            .get_mut(result.row as usize)
            .ok_or(RenderError::RowOutOfRange {
                row: result.row,
                height: resolution.height,
            })?;
        if slot.replace(result.pixels).is_some() {
            return Err(RenderError::DuplicateRow(result.row));
        }
    }

    let mut image = ImageBuffer::new(resolution.width, resolution.height);
    for (y, slot) in slots.into_iter().enumerate() {
        let y = y as u32;
        let pixels = slot.ok_or(RenderError::MissingRow(y))?;
        image.row_mut(y).copy_from_slice(&pixels);
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CameraSettings, Dielectric, HittableList, Lambertian, Metal, Sphere, Vec3};
    use std::sync::Arc;

    fn small_scene() -> (HittableList, Camera) {
        let mut world = HittableList::new();
        world.add(Box::new(Sphere::new(
            Vec3::new(0.0, -100.5, -1.0),
            100.0,
            Arc::new(Lambertian::new(Color::new(0.8, 0.8, 0.0))),
        )));
        world.add(Box::new(Sphere::new(
            Vec3::new(0.0, 0.0, -1.0),
            0.5,
            Arc::new(Lambertian::new(Color::new(0.1, 0.2, 0.5))),
        )));
        world.add(Box::new(Sphere::new(
            Vec3::new(-1.0, 0.0, -1.0),
            0.5,
            Arc::new(Dielectric::new(1.5)),
        )));
        world.add(Box::new(Sphere::new(
            Vec3::new(1.0, 0.0, -1.0),
            0.5,
            Arc::new(Metal::new(Color::new(0.8, 0.6, 0.2), 0.3)),
        )));

        let camera = Camera::new(
            &CameraSettings::default()
                .with_position(Vec3::new(-2.0, 2.0, 1.0), Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
                .with_lens(40.0, 0.2, 3.4)
                .with_aspect_ratio(16.0 / 9.0),
        );
        (world, camera)
    }

    #[test]
    fn test_scanlines_claim_each_row_once() {
        let scanlines = Scanlines::new(257);

        let mut rows: Vec<u32> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| scanlines.drain(|row| vec![Color::splat(row as f32)])))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().expect("worker panicked"))
                .map(|result| {
                    assert_eq!(result.pixels, vec![Color::splat(result.row as f32)]);
                    result.row
                })
                .collect()
        });

        rows.sort_unstable();
        assert_eq!(rows, (0..257).collect::<Vec<u32>>());
        assert_eq!(scanlines.claim(), None);
    }

    #[test]
    fn test_reassemble_orders_by_row() {
        let resolution = Resolution::new(2, 4);
        let row = |row: u32| RowResult {
            row,
            pixels: vec![Color::splat(row as f32); 2],
        };
        // Completion order scrambled across workers
        let worker_rows = vec![vec![row(3), row(0)], vec![], vec![row(2), row(1)]];

        let image = reassemble(resolution, worker_rows).expect("all rows present");
        for y in 0..4 {
            assert_eq!(image.row(y), &[Color::splat(y as f32); 2]);
        }
    }

    #[test]
    fn test_reassemble_missing_row() {
        let resolution = Resolution::new(1, 3);
        let worker_rows = vec![vec![
            RowResult {
                row: 0,
                pixels: vec![Color::ZERO],
            },
            RowResult {
                row: 2,
                pixels: vec![Color::ZERO],
            },
        ]];

        let err = reassemble(resolution, worker_rows).unwrap_err();
        assert!(matches!(err, RenderError::MissingRow(1)));
    }

    #[test]
    fn test_reassemble_rejects_duplicate_and_stray_rows() {
        let resolution = Resolution::new(1, 2);
        let row = |row: u32| RowResult {
            row,
            pixels: vec![Color::ZERO],
        };

        let duplicate = vec![vec![row(0), row(1)], vec![row(1)]];
        let err = reassemble(resolution, duplicate).unwrap_err();
        assert!(matches!(err, RenderError::DuplicateRow(1)));

        let stray = vec![vec![row(0), row(1), row(2)]];
        let err = reassemble(resolution, stray).unwrap_err();
        assert!(matches!(err, RenderError::RowOutOfRange { row: 2, height: 2 }));
    }

    #[test]
    fn test_render_rejects_bad_input() {
        let (world, camera) = small_scene();

        let err = render(&world, &camera, Resolution::new(0, 10), &RenderConfig::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidResolution { width: 0, height: 10 }));

        let config = RenderConfig {
            samples_per_pixel: 0,
            ..Default::default()
        };
        let err = render(&world, &camera, Resolution::new(4, 4), &config).unwrap_err();
        assert!(matches!(err, RenderError::NoSamples));
    }

    #[test]
    fn test_seeded_render_independent_of_thread_count() {
        let (world, camera) = small_scene();
        let resolution = Resolution::new(32, 18);
        let config = |threads| RenderConfig {
            samples_per_pixel: 4,
            max_depth: 8,
            threads: Some(threads),
            seed: Some(7),
        };

        let single = render(&world, &camera, resolution, &config(1)).expect("render");
        let many = render(&world, &camera, resolution, &config(4)).expect("render");
        let many_again = render(&world, &camera, resolution, &config(7)).expect("render");

        assert_eq!(single, many);
        assert_eq!(many, many_again);
    }

    #[test]
    fn test_sky_render_rows_in_place() {
        let world = HittableList::new();
        let camera = Camera::new(
            &CameraSettings::default()
                .with_position(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y)
                .with_lens(90.0, 0.0, 1.0)
                .with_aspect_ratio(1.0),
        );
        let config = RenderConfig {
            samples_per_pixel: 2,
            max_depth: 4,
            threads: Some(3),
            seed: None,
        };

        let image = render(&world, &camera, Resolution::new(41, 40), &config).expect("render");

        assert_eq!(image.pixels.len(), 41 * 40);
        // Looking up means bluer: red falls toward the top row. Rows two apart
        // never share a jittered sample position.
        for y in 2..40 {
            assert!(image.get(20, y - 2).x < image.get(20, y).x, "row {} out of order", y);
        }
    }
}
