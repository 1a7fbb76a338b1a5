use image::Luma;

use super::{ColorGate, MaskBuffer, SELECTED, rgb_of};
use crate::source::RasterPair;

/// Result of a flood fill over the original image.
#[derive(Debug, Clone)]
pub struct FloodRegion {
    /// Canvas-sized mask, origin at `(0, 0)`
    pub mask: MaskBuffer,
    /// Number of selected pixels
    pub area: usize,
}

/// 4-connected flood fill over the original, grown on the canvas pixel grid.
///
/// A neighbor joins the region while its original color is within
/// `threshold` of the seed pixel's color. Uses an explicit stack and a
/// visited bitmap so large uniform regions cannot overflow the call stack
/// or revisit pixels. Returns `None` when the seed is off-canvas.
pub fn flood_fill(sources: &RasterPair, seed: (i64, i64), threshold: f32) -> Option<FloodRegion> {
    let (w, h) = sources.canvas_dimensions();
    if seed.0 < 0 || seed.1 < 0 || seed.0 >= w as i64 || seed.1 >= h as i64 {
        return None;
    }
    let (sx, sy) = (seed.0 as u32, seed.1 as u32);
    let gate = ColorGate::new(rgb_of(sources.original_at(sx, sy)), threshold);

    let wu = w as usize;
    let mut visited = vec![false; wu * h as usize];
    let mut mask = MaskBuffer::new(w, h);
    let mut area = 0usize;
    let mut stack = vec![(sx, sy)];
    visited[sy as usize * wu + sx as usize] = true;

    while let Some((x, y)) = stack.pop() {
        if !gate.admits(rgb_of(sources.original_at(x, y))) {
            continue;
        }
        mask.put_pixel(x, y, Luma([SELECTED]));
        area += 1;

        let neighbors = [
            (x.checked_sub(1), Some(y)),
            (x.checked_add(1).filter(|&nx| nx < w), Some(y)),
            (Some(x), y.checked_sub(1)),
            (Some(x), y.checked_add(1).filter(|&ny| ny < h)),
        ];
        for (nx, ny) in neighbors {
            let (Some(nx), Some(ny)) = (nx, ny) else {
                continue;
            };
            let vi = ny as usize * wu + nx as usize;
            if !visited[vi] {
                visited[vi] = true;
                stack.push((nx, ny));
            }
        }
    }

    Some(FloodRegion { mask, area })
}
