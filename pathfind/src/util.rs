use anyhow::{anyhow, bail};
use image::{Rgb, RgbImage};

use crate::grid::{CellView, Grid, Point};

pub const GRID_LINE: [u8; 3] = [0, 0, 0];

/// The palette shared by every presentation of a grid
pub fn cell_color(view: CellView) -> [u8; 3] {
    match view {
        CellView::Blocked => [0, 104, 139], // deep sky blue 4
        CellView::Open => [255, 255, 255],
        CellView::Start => [127, 255, 0], // chartreuse
        CellView::End => [255, 0, 0],
        CellView::Frontier => [191, 62, 255], // dark orchid
        CellView::Visited => [152, 245, 255], // cadet blue
        CellView::Path => [255, 215, 0],      // gold
    }
}

/// Side of an image holding `cells` cells of `stride` pixels plus the closing line
fn image_side(cells: usize, stride: u32) -> Option<u32> {
    u32::try_from(cells).ok()?.checked_mul(stride)?.checked_add(1)
}

/// Draws the grid with `cell_size` pixels per cell and one pixel grid lines
/// between cells and around the border.
pub fn render_image(grid: &Grid, cell_size: u32) -> Result<RgbImage, anyhow::Error> {
    let stride = cell_size
        .max(1)
        .checked_add(1)
        .ok_or_else(|| anyhow!("cell size {} is too large", cell_size))?;
    let (Some(width), Some(height)) = (
        image_side(grid.columns(), stride),
        image_side(grid.rows(), stride),
    ) else {
        bail!(
            "a {}x{} grid does not fit in an image at {} pixels per cell",
            grid.rows(),
            grid.columns(),
            cell_size
        );
    };

    Ok(RgbImage::from_fn(width, height, |x, y| {
        if x % stride == 0 || y % stride == 0 {
            return Rgb(GRID_LINE);
        }
        let point = Point {
            row: (y / stride) as usize,
            col: (x / stride) as usize,
        };
        Rgb(grid.view(point).map_or(GRID_LINE, cell_color))
    }))
}
