//! The Congruence Aggregator
//!
//! Wraps the raw arrays returned by a tracing engine into queryable
//! structures:
//! - `CongruenceSnapshot`: every pixel at one instant
//! - `Congruence`: every pixel across a time axis
//!
//! Both are built once and never mutated. Snapshots and geodesics
//! extracted from a congruence are owned copies.

use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use kerr_env::{RayBatch, RayStatus, TexelBuffer};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{KerrError, Result};
use crate::geodesic::Geodesic;

/// Colour lookup for snapshot rasters, indexed by raw status code.
pub const SNAPSHOT_COLOURS: [Rgb<u8>; 3] = [
    Rgb([255, 255, 255]), // Sphere
    Rgb([255, 0, 0]),     // Disk
    Rgb([0, 0, 0]),       // Horizon
];

/// Greatest common divisor of the grid dimensions.
///
/// Dividing both dimensions by it gives the smallest integer size with the
/// grid's exact aspect ratio.
pub fn downsampling_unit(rows: usize, cols: usize) -> Result<usize> {
    if rows == 0 || cols == 0 {
        return Err(KerrError::configuration(format!(
            "cannot downsample a {}x{} grid",
            rows, cols
        )));
    }
    Ok(num::integer::gcd(rows, cols))
}

/// Number of pixels per terminal class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub sphere: usize,
    pub disk: usize,
    pub horizon: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: RayStatus) {
        match status {
            RayStatus::Sphere => self.sphere += 1,
            RayStatus::Disk => self.disk += 1,
            RayStatus::Horizon => self.horizon += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.sphere + self.disk + self.horizon
    }
}

impl<'a> FromIterator<&'a RayStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = &'a RayStatus>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.add(*status);
        }
        counts
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Every pixel's ray at one instant.
#[derive(Debug, Clone)]
pub struct CongruenceSnapshot {
    /// rows x cols status grid
    status: DMatrix<RayStatus>,

    /// Per-pixel coordinate vectors, row-major over (rows, cols, coord_dim)
    coordinates: Vec<f64>,
    coord_dim: usize,

    texels: Option<TexelBuffer>,

    downsampling_unit: usize,
    image_size: (usize, usize),
    num_pixels: usize,
}

impl CongruenceSnapshot {
    /// Build a snapshot from a status grid and per-pixel coordinates.
    ///
    /// # Errors
    /// * `Configuration` - empty grid
    /// * `ShapeMismatch` - coordinate or texel buffer of the wrong size
    pub fn new(
        status: DMatrix<RayStatus>,
        coord_dim: usize,
        coordinates: Vec<f64>,
        texels: Option<TexelBuffer>,
    ) -> Result<Self> {
        let (rows, cols) = status.shape();
        let unit = downsampling_unit(rows, cols)?;

        if coordinates.len() != rows * cols * coord_dim {
            return Err(KerrError::shape(format!(
                "{} coordinate values for a {}x{}x{} snapshot",
                coordinates.len(),
                rows,
                cols,
                coord_dim
            )));
        }

        if let Some(t) = &texels {
            if (t.rows, t.cols) != (rows, cols) {
                return Err(KerrError::shape(format!(
                    "{}x{} texels for a {}x{} snapshot",
                    t.rows, t.cols, rows, cols
                )));
            }
        }

        Ok(Self {
            status,
            coordinates,
            coord_dim,
            texels,
            downsampling_unit: unit,
            image_size: (rows / unit, cols / unit),
            num_pixels: rows * cols,
        })
    }

    /// Wrap a single-instant engine batch.
    pub fn from_batch(batch: RayBatch, texels: Option<TexelBuffer>) -> Result<Self> {
        batch.validate()?;
        if let Some(slices) = batch.shape.slices {
            return Err(KerrError::shape(format!(
                "expected a single-instant batch, got {} slices",
                slices
            )));
        }

        let statuses = batch.decode_status()?;
        let status = DMatrix::from_row_slice(batch.shape.rows, batch.shape.cols, &statuses);

        Self::new(status, batch.shape.coord_dim, batch.coordinates, texels)
    }

    pub fn rows(&self) -> usize {
        self.status.nrows()
    }

    pub fn cols(&self) -> usize {
        self.status.ncols()
    }

    pub fn coord_dim(&self) -> usize {
        self.coord_dim
    }

    pub fn num_pixels(&self) -> usize {
        self.num_pixels
    }

    pub fn status(&self) -> &DMatrix<RayStatus> {
        &self.status
    }

    pub fn texels(&self) -> Option<&TexelBuffer> {
        self.texels.as_ref()
    }

    /// GCD of rows and cols.
    pub fn downsampling_unit(&self) -> usize {
        self.downsampling_unit
    }

    /// `(rows / unit, cols / unit)`
    pub fn image_size(&self) -> (usize, usize) {
        self.image_size
    }

    pub fn status_at(&self, row: usize, col: usize) -> Result<RayStatus> {
        self.check_pixel(row, col)?;
        Ok(self.status[(row, col)])
    }

    /// Coordinate vector of pixel `(row, col)`.
    pub fn coordinate(&self, row: usize, col: usize) -> Result<&[f64]> {
        self.check_pixel(row, col)?;
        let start = (row * self.cols() + col) * self.coord_dim;
        Ok(&self.coordinates[start..start + self.coord_dim])
    }

    pub fn status_counts(&self) -> StatusCounts {
        self.status.iter().collect()
    }

    /// Colour used for `status` when no texels are present.
    pub fn colour_for(status: RayStatus) -> Rgb<u8> {
        SNAPSHOT_COLOURS[status.code() as usize]
    }

    /// Raster of the snapshot: the texels if present, the status colours
    /// otherwise. Width is `cols`, height is `rows`.
    ///
    /// # Errors
    /// `Configuration` if either dimension does not fit an image axis.
    pub fn render(&self) -> Result<RgbImage> {
        let (rows, cols) = (self.rows(), self.cols());
        let width = image_axis(cols, "cols")?;
        let height = image_axis(rows, "rows")?;

        Ok(RgbImage::from_fn(width, height, |x, y| {
            let (row, col) = (y as usize, x as usize);
            match self.texels.as_ref().and_then(|t| t.texel(row, col)) {
                Some([r, g, b]) => Rgb([to_byte(r), to_byte(g), to_byte(b)]),
                None => Self::colour_for(self.status[(row, col)]),
            }
        }))
    }

    /// Save the raster as PNG.
    ///
    /// The raster is `image_size` scaled by `downsampling_unit`, so its
    /// aspect ratio is exactly `cols:rows`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.render()?.save_with_format(path, ImageFormat::Png)?;
        info!(
            "saved {}x{} snapshot (unit {}) to {}",
            self.cols(),
            self.rows(),
            self.downsampling_unit,
            path.display()
        );
        Ok(())
    }

    fn check_pixel(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.rows() {
            return Err(KerrError::out_of_range("row", row, self.rows()));
        }
        if col >= self.cols() {
            return Err(KerrError::out_of_range("col", col, self.cols()));
        }
        Ok(())
    }
}

fn image_axis(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| KerrError::configuration(format!("{} {} exceed the largest raster dimension", len, what)))
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

// =============================================================================
// CONGRUENCE
// =============================================================================

/// Every pixel's ray across a time axis.
#[derive(Debug, Clone)]
pub struct Congruence {
    rows: usize,
    cols: usize,
    slices: usize,
    coord_dim: usize,

    /// Row-major over (rows, cols, slices)
    status: Vec<RayStatus>,

    /// Row-major over (rows, cols, coord_dim, slices)
    coordinates: Vec<f64>,
}

impl Congruence {
    /// Build a congruence from flat arrays.
    pub fn new(
        rows: usize,
        cols: usize,
        slices: usize,
        coord_dim: usize,
        status: Vec<RayStatus>,
        coordinates: Vec<f64>,
    ) -> Result<Self> {
        downsampling_unit(rows, cols)?;
        if slices == 0 {
            return Err(KerrError::configuration("a congruence needs at least one slice"));
        }
        if status.len() != rows * cols * slices {
            return Err(KerrError::shape(format!(
                "{} status codes for a {}x{}x{} congruence",
                status.len(),
                rows,
                cols,
                slices
            )));
        }
        if coordinates.len() != rows * cols * coord_dim * slices {
            return Err(KerrError::shape(format!(
                "{} coordinate values for a {}x{}x{}x{} congruence",
                coordinates.len(),
                rows,
                cols,
                coord_dim,
                slices
            )));
        }

        Ok(Self {
            rows,
            cols,
            slices,
            coord_dim,
            status,
            coordinates,
        })
    }

    /// Wrap a sliced engine batch.
    pub fn from_batch(batch: RayBatch) -> Result<Self> {
        batch.validate()?;
        let shape = batch.shape;
        let slices = shape
            .slices
            .ok_or_else(|| KerrError::shape("expected a sliced batch, got a single instant"))?;

        let status = batch.decode_status()?;
        Self::new(shape.rows, shape.cols, slices, shape.coord_dim, status, batch.coordinates)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn slices(&self) -> usize {
        self.slices
    }

    pub fn coord_dim(&self) -> usize {
        self.coord_dim
    }

    pub fn num_pixels(&self) -> usize {
        self.rows * self.cols
    }

    /// Status of pixel `(row, col)` at `instant`.
    pub fn status_at(&self, row: usize, col: usize, instant: usize) -> Result<RayStatus> {
        self.check_pixel(row, col)?;
        self.check_instant(instant)?;
        Ok(self.status[self.pixel_index(row, col) * self.slices + instant])
    }

    /// Every pixel at `instant`.
    ///
    /// # Errors
    /// `IndexOutOfRange` if `instant >= slices`.
    pub fn snapshot(&self, instant: usize) -> Result<CongruenceSnapshot> {
        self.check_instant(instant)?;

        let status = DMatrix::from_fn(self.rows, self.cols, |row, col| {
            self.status[self.pixel_index(row, col) * self.slices + instant]
        });

        let mut coordinates = Vec::with_capacity(self.num_pixels() * self.coord_dim);
        for pixel in 0..self.num_pixels() {
            for d in 0..self.coord_dim {
                coordinates.push(self.coordinates[(pixel * self.coord_dim + d) * self.slices + instant]);
            }
        }

        CongruenceSnapshot::new(status, self.coord_dim, coordinates, None)
    }

    /// Time history of pixel `(row, col)`, classified.
    ///
    /// The stored `coord_dim x slices` block is transposed to step-major
    /// order before classification.
    ///
    /// # Errors
    /// `IndexOutOfRange` if the pixel is outside the grid.
    pub fn geodesic(&self, row: usize, col: usize) -> Result<Geodesic> {
        self.check_pixel(row, col)?;
        Geodesic::classify(self.pixel_status(row, col), self.pixel_coordinates(row, col))
    }

    /// All geodesics in row-major pixel order.
    pub fn geodesics(&self) -> impl Iterator<Item = Result<Geodesic>> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| self.geodesic(row, col)))
    }

    /// Per-instant class counts.
    pub fn status_counts(&self) -> Vec<StatusCounts> {
        (0..self.slices)
            .map(|instant| {
                (0..self.num_pixels())
                    .map(|pixel| &self.status[pixel * self.slices + instant])
                    .collect()
            })
            .collect()
    }

    // ========== Private Helper Methods ==========

    fn pixel_index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    fn pixel_status(&self, row: usize, col: usize) -> &[RayStatus] {
        let start = self.pixel_index(row, col) * self.slices;
        &self.status[start..start + self.slices]
    }

    fn pixel_coordinates(&self, row: usize, col: usize) -> DMatrix<f64> {
        let base = self.pixel_index(row, col) * self.coord_dim * self.slices;
        DMatrix::from_fn(self.slices, self.coord_dim, |step, d| {
            self.coordinates[base + d * self.slices + step]
        })
    }

    fn check_pixel(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.rows {
            return Err(KerrError::out_of_range("row", row, self.rows));
        }
        if col >= self.cols {
            return Err(KerrError::out_of_range("col", col, self.cols));
        }
        Ok(())
    }

    fn check_instant(&self, instant: usize) -> Result<()> {
        if instant >= self.slices {
            return Err(KerrError::out_of_range("time index", instant, self.slices));
        }
        Ok(())
    }
}
