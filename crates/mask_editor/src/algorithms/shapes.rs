//! Rasterization of the geometric regions the compositor understands.
//!
//! Every function returns a mask plus the canvas position of its top-left
//! pixel, or `None` for degenerate geometry or a region that misses the
//! canvas entirely.

use geo::{Area, Contains, Intersects};
use geo_types::{Coord, Line, LineString, Point, Polygon};
use image::Luma;

use super::{MaskBuffer, SELECTED};
use crate::types::{CanvasPoint, CanvasRect};

/// A rasterized region positioned on the canvas.
#[derive(Debug, Clone)]
pub struct Footprint {
    pub mask: MaskBuffer,
    pub origin: (i64, i64),
}

/// Intersect the pixel window `[x0, x1) x [y0, y1)` with a canvas of size
/// `bounds`. Returns the clipped origin and size, or `None` when nothing is left.
fn clip_window(x0: i64, y0: i64, x1: i64, y1: i64, bounds: (u32, u32)) -> Option<(i64, i64, u32, u32)> {
    let (x0, y0) = (x0.max(0), y0.max(0));
    let x1 = x1.min(bounds.0 as i64);
    let y1 = y1.min(bounds.1 as i64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let width = u32::try_from(x1 - x0).ok()?;
    let height = u32::try_from(y1 - y0).ok()?;
    Some((x0, y0, width, height))
}

/// Filled disc of diameter `round(2 * radius)` pixels around `center`,
/// clipped to a canvas of size `bounds`.
///
/// Odd diameters are centered on the pixel containing `center`, even ones on
/// the nearest pixel corner, so the painted width always equals the diameter.
pub fn circle_footprint(center: CanvasPoint, radius: f32, bounds: (u32, u32)) -> Option<Footprint> {
    if !(radius > 0.0) || !radius.is_finite() || !center.x.is_finite() || !center.y.is_finite() {
        return None;
    }
    let diameter = (radius as f64 * 2.0).round();
    if diameter < 1.0 {
        return None;
    }
    let half = diameter / 2.0;
    let d = diameter as i64;
    let ox = (center.x as f64 - half + 0.5).floor() as i64;
    let oy = (center.y as f64 - half + 0.5).floor() as i64;
    let (x0, y0, width, height) = clip_window(ox, oy, ox + d, oy + d, bounds)?;

    let r2 = half * half;
    let mask = MaskBuffer::from_fn(width, height, |mx, my| {
        let dx = (x0 - ox + mx as i64) as f64 + 0.5 - half;
        let dy = (y0 - oy + my as i64) as f64 + 0.5 - half;
        if dx * dx + dy * dy <= r2 { Luma([SELECTED]) } else { Luma([0]) }
    });
    Some(Footprint { mask, origin: (x0, y0) })
}

/// Pixel span `[x0, x1) x [y0, y1)` covered by `rect`.
pub fn rect_span(rect: &CanvasRect) -> Option<(i64, i64, i64, i64)> {
    if rect.is_empty() || !rect.x.is_finite() || !rect.y.is_finite() {
        return None;
    }
    let x0 = rect.x.floor() as i64;
    let y0 = rect.y.floor() as i64;
    let x1 = rect.right().ceil() as i64;
    let y1 = rect.bottom().ceil() as i64;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1, y1))
}

/// Filled rectangle, clipped to a canvas of size `bounds`.
pub fn rect_footprint(rect: &CanvasRect, bounds: (u32, u32)) -> Option<Footprint> {
    let (x0, y0, x1, y1) = rect_span(rect)?;
    let (x0, y0, width, height) = clip_window(x0, y0, x1, y1, bounds)?;
    let mask = MaskBuffer::from_pixel(width, height, Luma([SELECTED]));
    Some(Footprint { mask, origin: (x0, y0) })
}

/// Consecutive duplicate points removed, including a closing point equal to the first.
fn dedup_ring(points: &[CanvasPoint]) -> Vec<CanvasPoint> {
    let mut ring: Vec<CanvasPoint> = Vec::with_capacity(points.len());
    for p in points {
        if ring.last() != Some(p) {
            ring.push(*p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Whether any two non-adjacent edges of the closed ring intersect.
pub fn is_self_intersecting(points: &[CanvasPoint]) -> bool {
    let ring = dedup_ring(points);
    let n = ring.len();
    if n < 4 {
        return false;
    }
    let edge = |i: usize| {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        Line::new(
            Coord { x: a.x as f64, y: a.y as f64 },
            Coord { x: b.x as f64, y: b.y as f64 },
        )
    };
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if edge(i).intersects(&edge(j)) {
                return true;
            }
        }
    }
    false
}

/// Filled simple polygon, clipped to a canvas of size `bounds`. Fewer than
/// three distinct vertices, zero area or a self-intersecting outline are
/// degenerate.
pub fn polygon_footprint(points: &[CanvasPoint], bounds: (u32, u32)) -> Option<Footprint> {
    let ring = dedup_ring(points);
    if ring.len() < 3 || ring.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return None;
    }
    if is_self_intersecting(&ring) {
        return None;
    }

    let coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|p| Coord { x: p.x as f64, y: p.y as f64 })
        .collect();
    let polygon = Polygon::new(LineString::new(coords), vec![]);
    if polygon.unsigned_area() <= 0.0 {
        return None;
    }

    let min_x = ring.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor() as i64;
    let min_y = ring.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor() as i64;
    let max_x = ring.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil() as i64;
    let max_y = ring.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil() as i64;
    let (x0, y0, width, height) = clip_window(min_x, min_y, max_x.max(min_x + 1), max_y.max(min_y + 1), bounds)?;

    let mut mask = MaskBuffer::new(width, height);
    for (mx, my, value) in mask.enumerate_pixels_mut() {
        let center = Point::new(
            (x0 + mx as i64) as f64 + 0.5,
            (y0 + my as i64) as f64 + 0.5,
        );
        if polygon.contains(&center) {
            value[0] = SELECTED;
        }
    }

    Some(Footprint { mask, origin: (x0, y0) })
}
