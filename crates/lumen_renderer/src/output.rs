//! Pixel sinks for finished images.
//!
//! Colors are quantized to 8 bits per channel with
//! `floor(256 * clamp(c, 0, 0.999))`.

use std::io::Write;
use std::path::{Path, PathBuf};

use lumen_math::Interval;
use thiserror::Error;

use crate::{Color, ImageBuffer};

/// Errors that can occur while writing pixels.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Row {got} written out of order, expected row {expected}")]
    RowOutOfOrder { expected: u32, got: u32 },

    #[error("Row {row} has {got} pixels, expected {expected}")]
    RowLength { row: u32, expected: u32, got: usize },

    #[error("Image finished after {written} of {height} rows")]
    Incomplete { written: u32, height: u32 },
}

pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for rendered rows.
pub trait PixelSink {
    /// Write one row of gamma-corrected colors.
    fn write_row(&mut self, row: u32, colors: &[Color]) -> OutputResult<()>;

    /// Flush anything buffered once every row has been written.
    fn finish(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

/// Convert a color to 8-bit RGB.
pub fn color_to_rgb8(color: Color) -> [u8; 3] {
    let intensity = Interval::new(0.0, 0.999);
    let to_byte = |c: f32| (256.0 * intensity.clamp(c)) as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z)]
}

impl ImageBuffer {
    /// Stream every row, top to bottom, into a sink and finish it.
    pub fn write_to(&self, sink: &mut dyn PixelSink) -> OutputResult<()> {
        for (y, row) in self.rows().enumerate() {
            sink.write_row(y as u32, row)?;
        }
        sink.finish()
    }
}

/// Tracks that rows arrive in order with the right width.
#[derive(Debug, Clone, Copy)]
struct RowCursor {
    width: u32,
    height: u32,
    next: u32,
}

impl RowCursor {
    fn advance(&mut self, row: u32, colors: &[Color]) -> OutputResult<()> {
        if row != self.next || row >= self.height {
            return Err(OutputError::RowOutOfOrder {
                expected: self.next,
                got: row,
            });
        }
        if colors.len() != self.width as usize {
            return Err(OutputError::RowLength {
                row,
                expected: self.width,
                got: colors.len(),
            });
        }
        self.next += 1;
        Ok(())
    }

    fn complete(&self) -> OutputResult<()> {
        if self.next == self.height {
            Ok(())
        } else {
            Err(OutputError::Incomplete {
                written: self.next,
                height: self.height,
            })
        }
    }
}

/// Plain-text PPM (`P3`) writer.
pub struct PpmWriter<W: Write> {
    writer: W,
    cursor: RowCursor,
}

impl<W: Write> PpmWriter<W> {
    /// Create a writer and emit the header.
    pub fn new(mut writer: W, width: u32, height: u32) -> OutputResult<Self> {
        writeln!(writer, "P3")?;
        writeln!(writer, "{} {}", width, height)?;
        writeln!(writer, "255")?;

        Ok(Self {
            writer,
            cursor: RowCursor {
                width,
                height,
                next: 0,
            },
        })
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PixelSink for PpmWriter<W> {
    fn write_row(&mut self, row: u32, colors: &[Color]) -> OutputResult<()> {
        self.cursor.advance(row, colors)?;
        for color in colors {
            let [r, g, b] = color_to_rgb8(*color);
            writeln!(self.writer, "{} {} {}", r, g, b)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.cursor.complete()?;
        self.writer.flush()?;
        Ok(())
    }
}

/// PNG writer; collects rows in memory and encodes on `finish`.
pub struct PngWriter {
    path: PathBuf,
    image: image::RgbImage,
    cursor: RowCursor,
}

impl PngWriter {
    pub fn new(path: impl AsRef<Path>, width: u32, height: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            image: image::RgbImage::new(width, height),
            cursor: RowCursor {
                width,
                height,
                next: 0,
            },
        }
    }
}

impl PixelSink for PngWriter {
    fn write_row(&mut self, row: u32, colors: &[Color]) -> OutputResult<()> {
        self.cursor.advance(row, colors)?;
        for (x, color) in colors.iter().enumerate() {
            self.image
                .put_pixel(x as u32, row, image::Rgb(color_to_rgb8(*color)));
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.cursor.complete()?;
        self.image.save(&self.path)?;
        log::debug!("Encoded PNG to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_to_rgb8() {
        assert_eq!(color_to_rgb8(Color::ZERO), [0, 0, 0]);
        assert_eq!(color_to_rgb8(Color::ONE), [255, 255, 255]);
        assert_eq!(color_to_rgb8(Color::new(0.5, 2.0, -1.0)), [128, 255, 0]);
        assert_eq!(color_to_rgb8(Color::new(0.25, 0.999, 0.0039)), [64, 255, 0]);
    }

    #[test]
    fn test_ppm_output() {
        let mut image = ImageBuffer::new(2, 2);
        image.set(0, 0, Color::ONE);
        image.set(1, 1, Color::new(0.5, 0.25, 0.0));

        let mut writer = PpmWriter::new(Vec::new(), 2, 2).expect("header");
        image.write_to(&mut writer).expect("write");
        let text = String::from_utf8(writer.into_inner()).expect("utf8");

        assert_eq!(text, "P3\n2 2\n255\n255 255 255\n0 0 0\n0 0 0\n128 64 0\n");
    }

    #[test]
    fn test_ppm_rejects_out_of_order_rows() {
        let mut writer = PpmWriter::new(Vec::new(), 1, 2).expect("header");

        let err = writer.write_row(1, &[Color::ZERO]).unwrap_err();
        assert!(matches!(err, OutputError::RowOutOfOrder { expected: 0, got: 1 }));
    }

    #[test]
    fn test_ppm_rejects_short_rows_and_early_finish() {
        let mut writer = PpmWriter::new(Vec::new(), 2, 2).expect("header");

        let err = writer.write_row(0, &[Color::ZERO]).unwrap_err();
        assert!(matches!(err, OutputError::RowLength { row: 0, expected: 2, got: 1 }));

        writer.write_row(0, &[Color::ZERO; 2]).expect("valid row");
        let err = writer.finish().unwrap_err();
        assert!(matches!(err, OutputError::Incomplete { written: 1, height: 2 }));
    }

    #[test]
    fn test_png_output() {
        let path = std::env::temp_dir().join(format!("lumen-output-{}.png", std::process::id()));

        let mut image = ImageBuffer::new(3, 2);
        image.set(2, 1, Color::new(1.0, 0.5, 0.0));

        let mut writer = PngWriter::new(&path, 3, 2);
        image.write_to(&mut writer).expect("encode png");

        let decoded = image::open(&path).expect("decode png").to_rgb8();
        std::fs::remove_file(&path).ok();

        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1).0, [255, 128, 0]);
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0]);
    }
}
