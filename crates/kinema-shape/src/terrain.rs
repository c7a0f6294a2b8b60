//! Regular-grid heightfield terrain.

use glam::{Vec2, Vec3};
use kinema_math::Aabb;

use crate::ShapeError;

/// Heightfield with `rows × cols` samples spaced `cell_size` apart in X/Y,
/// heights along +Z. Sample `(col, row)` sits at
/// `(col · cell_size.x, row · cell_size.y, height)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Terrain {
    rows: u32,
    cols: u32,
    cell_size: Vec2,
    heights: Vec<f32>,
}

impl Terrain {
    /// Creates a terrain from row-major height samples.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::InvalidTerrain`] when the grid is smaller than
    /// 2×2 or the sample count is not `rows × cols`, and
    /// [`ShapeError::NonFinite`] when a height or the cell size is not finite.
    pub fn new(rows: u32, cols: u32, cell_size: Vec2, heights: Vec<f32>) -> Result<Self, ShapeError> {
        let expected = rows as usize * cols as usize;
        if rows < 2 || cols < 2 || heights.len() != expected {
            return Err(ShapeError::InvalidTerrain {
                rows,
                cols,
                samples: heights.len(),
            });
        }
        if !cell_size.is_finite() || heights.iter().any(|h| !h.is_finite()) {
            return Err(ShapeError::NonFinite);
        }
        Ok(Self {
            rows,
            cols,
            cell_size,
            heights,
        })
    }

    /// A flat terrain at height zero.
    pub fn flat(rows: u32, cols: u32, cell_size: Vec2) -> Result<Self, ShapeError> {
        Self::new(rows, cols, cell_size, vec![0.0; rows as usize * cols as usize])
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Height sample at grid coordinate, or `None` outside the grid.
    pub fn sample(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.heights
            .get(row as usize * self.cols as usize + col as usize)
            .copied()
    }

    /// Bilinearly interpolated height at local `(x, y)`, or `None` outside
    /// the grid footprint.
    pub fn height_at(&self, x: f32, y: f32) -> Option<f32> {
        let gx = x / self.cell_size.x;
        let gy = y / self.cell_size.y;
        let max_col = (self.cols - 1) as f32;
        let max_row = (self.rows - 1) as f32;
        if !(0.0..=max_col).contains(&gx) || !(0.0..=max_row).contains(&gy) {
            return None;
        }
        let c0 = (gx.floor() as u32).min(self.cols - 2);
        let r0 = (gy.floor() as u32).min(self.rows - 2);
        let tx = gx - c0 as f32;
        let ty = gy - r0 as f32;
        let h00 = self.sample(c0, r0)?;
        let h10 = self.sample(c0 + 1, r0)?;
        let h01 = self.sample(c0, r0 + 1)?;
        let h11 = self.sample(c0 + 1, r0 + 1)?;
        let bottom = h00 + (h10 - h00) * tx;
        let top = h01 + (h11 - h01) * tx;
        Some(bottom + (top - bottom) * ty)
    }

    /// Bounds of the whole heightfield in its own frame.
    pub fn bounds(&self) -> Aabb {
        let (lo, hi) = self
            .heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        Aabb::new(
            Vec3::new(0.0, 0.0, lo),
            Vec3::new(
                (self.cols - 1) as f32 * self.cell_size.x,
                (self.rows - 1) as f32 * self.cell_size.y,
                hi,
            ),
        )
    }
}
