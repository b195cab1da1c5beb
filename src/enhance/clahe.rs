//! Contrast-limited adaptive histogram equalization on a single 8-bit plane.

use image::{GrayImage, Luma};

const BINS: usize = 256;

/// Equalize `image` tile by tile, limiting each tile's histogram to
/// `clip_limit` times the uniform bin height, then blend neighbouring tile
/// mappings bilinearly so tile seams do not show.
///
/// `grid` is the number of tiles across and down. It is shrunk for images
/// smaller than the grid. A `clip_limit` of zero disables clipping.
pub fn clahe(image: &GrayImage, clip_limit: f32, grid: (u32, u32)) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let tile_w = width.div_ceil(grid.0.clamp(1, width));
    let tile_h = height.div_ceil(grid.1.clamp(1, height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(image, (x0, y0, x1, y1), clip_limit));
        }
    }
    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = pixel[0] as usize;

        let txf = x as f32 / tile_w as f32 - 0.5;
        let tyf = y as f32 / tile_h as f32 - 0.5;
        let tx1 = txf.floor();
        let ty1 = tyf.floor();
        let xa = txf - tx1;
        let ya = tyf - ty1;

        let last_x = tiles_x as i64 - 1;
        let last_y = tiles_y as i64 - 1;
        let tx2 = (tx1 as i64 + 1).min(last_x) as u32;
        let ty2 = (ty1 as i64 + 1).min(last_y) as u32;
        let tx1 = (tx1 as i64).clamp(0, last_x) as u32;
        let ty1 = (ty1 as i64).clamp(0, last_y) as u32;

        let top = lut_at(tx1, ty1)[value] as f32 * (1.0 - xa) + lut_at(tx2, ty1)[value] as f32 * xa;
        let bottom =
            lut_at(tx1, ty2)[value] as f32 * (1.0 - xa) + lut_at(tx2, ty2)[value] as f32 * xa;
        let blended = top * (1.0 - ya) + bottom * ya;

        out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
    }

    out
}

/// Clipped, redistributed cumulative histogram for one tile as a lookup
/// table.
fn tile_lut(image: &GrayImage, (x0, y0, x1, y1): (u32, u32, u32, u32), clip_limit: f32) -> [u8; BINS] {
    let mut hist = [0u32; BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[image.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);

    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }

        let share = excess / BINS as u32;
        let mut residual = excess - share * BINS as u32;
        for bin in hist.iter_mut() {
            *bin += share;
        }
        if residual > 0 {
            let step = (BINS as u32 / residual).max(1) as usize;
            let mut i = 0;
            while i < BINS && residual > 0 {
                hist[i] += 1;
                residual -= 1;
                i += step;
            }
        }
    }

    let scale = (BINS - 1) as f32 / area as f32;
    let mut lut = [0u8; BINS];
    let mut sum = 0u32;
    for (i, count) in hist.iter().enumerate() {
        sum += count;
        lut[i] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
