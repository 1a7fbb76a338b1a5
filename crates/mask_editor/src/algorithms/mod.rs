pub mod color;
pub mod flood_fill;
pub mod shapes;

pub use color::*;
pub use flood_fill::*;
pub use shapes::*;

use image::GrayImage;

/// Per-pixel selection mask. Any non-zero value selects the pixel.
pub type MaskBuffer = GrayImage;

/// Mask value written for selected pixels.
pub const SELECTED: u8 = 255;
