use image::{Rgb, Rgba};

use super::MaskBuffer;
use crate::source::RasterPair;

/// Euclidean distance in RGB space.
pub fn color_distance(a: Rgb<u8>, b: Rgb<u8>) -> f32 {
    let dr = a[0] as f32 - b[0] as f32;
    let dg = a[1] as f32 - b[1] as f32;
    let db = a[2] as f32 - b[2] as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

pub fn rgb_of(pixel: Rgba<u8>) -> Rgb<u8> {
    Rgb([pixel[0], pixel[1], pixel[2]])
}

/// Color-similarity constraint locked to a reference color for one gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorGate {
    pub reference: Rgb<u8>,
    pub threshold: f32,
}

impl ColorGate {
    pub fn new(reference: Rgb<u8>, threshold: f32) -> Self {
        Self { reference, threshold }
    }

    /// `distance < threshold`; an exact match is always admitted so a zero
    /// threshold still selects identical colors.
    pub fn admits(&self, color: Rgb<u8>) -> bool {
        let distance = color_distance(color, self.reference);
        distance == 0.0 || distance < self.threshold
    }
}

/// Clear every selected mask pixel whose original color the gate rejects.
///
/// `origin` is the canvas position of the mask's top-left pixel. Pixels that
/// fall outside the canvas are cleared too.
pub fn retain_similar(mask: &mut MaskBuffer, origin: (i64, i64), sources: &RasterPair, gate: &ColorGate) {
    let (cw, ch) = sources.canvas_dimensions();
    for (mx, my, value) in mask.enumerate_pixels_mut() {
        if value[0] == 0 {
            continue;
        }
        let x = origin.0 + mx as i64;
        let y = origin.1 + my as i64;
        let inside = x >= 0 && y >= 0 && x < cw as i64 && y < ch as i64;
        if !inside || !gate.admits(rgb_of(sources.original_at(x as u32, y as u32))) {
            value[0] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbaImage};

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(color_distance(Rgb([0, 0, 0]), Rgb([3, 4, 0])), 5.0);
        assert_eq!(color_distance(Rgb([10, 10, 10]), Rgb([10, 10, 10])), 0.0);
    }

    #[test]
    fn gate_is_strict_except_for_exact_match() {
        let gate = ColorGate::new(Rgb([0, 0, 0]), 5.0);
        assert!(gate.admits(Rgb([0, 0, 0])));
        assert!(gate.admits(Rgb([3, 3, 0])));
        assert!(!gate.admits(Rgb([3, 4, 0])));

        let exact = ColorGate::new(Rgb([200, 10, 10]), 0.0);
        assert!(exact.admits(Rgb([200, 10, 10])));
        assert!(!exact.admits(Rgb([200, 10, 11])));
    }

    #[test]
    fn retain_similar_drops_dissimilar_and_offcanvas_pixels() {
        let mut original = RgbaImage::from_pixel(4, 1, Rgba([255, 0, 0, 255]));
        original.put_pixel(2, 0, Rgba([0, 0, 255, 255]));
        let pair = RasterPair::new(original, RgbaImage::new(4, 1));

        // Mask spans x = -1..=3.
        let mut mask = GrayImage::from_pixel(5, 1, Luma([255]));
        retain_similar(&mut mask, (-1, 0), &pair, &ColorGate::new(Rgb([255, 0, 0]), 10.0));

        let selected: Vec<u8> = mask.pixels().map(|p| p[0]).collect();
        assert_eq!(selected, vec![0, 255, 255, 0, 255]);
    }
}
