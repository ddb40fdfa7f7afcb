//! Color-space conversions built on `palette`.
//!
//! HSV values follow the common 8-bit convention: hue in `[0, 180)` (two
//! degrees per unit), saturation and value in `[0, 255]`. Lab values are CIE
//! L*a*b* under the D65 white point.

use palette::{FromColor, Hsv, IntoColor, Lab, LinSrgb, Srgb};

/// HSV triple in 8-bit units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsv8 {
    /// Hue in `[0, 180)`.
    pub h: f32,
    /// Saturation in `[0, 255]`.
    pub s: f32,
    /// Value in `[0, 255]`.
    pub v: f32,
}

fn srgb(rgb: [u8; 3]) -> Srgb<f32> {
    Srgb::new(rgb[0], rgb[1], rgb[2]).into_format::<f32>()
}

/// Converts an RGB8 pixel to 8-bit HSV.
pub fn rgb_to_hsv8(rgb: [u8; 3]) -> Hsv8 {
    let hsv: Hsv = Hsv::from_color(srgb(rgb));
    let degrees = hsv.hue.into_positive_degrees();
    let h = (degrees / 2.0) % 180.0;
    Hsv8 {
        h,
        s: hsv.saturation * 255.0,
        v: hsv.value * 255.0,
    }
}

/// Converts an RGB8 pixel to CIE L*a*b* (D65).
pub fn rgb_to_lab(rgb: [u8; 3]) -> Lab {
    srgb(rgb).into_linear().into_color()
}

/// Converts CIE L*a*b* back to RGB8, clamping out-of-gamut channels.
pub fn lab_to_rgb(lab: Lab) -> [u8; 3] {
    let linear: LinSrgb = lab.into_color();
    let encoded: Srgb<f32> = Srgb::from_linear(linear);
    let to_u8 = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_u8(encoded.red), to_u8(encoded.green), to_u8(encoded.blue)]
}

/// Euclidean distance between two Lab colors (CIE76 delta-E).
pub fn delta_e76(a: Lab, b: Lab) -> f32 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// L* multiplier that maps `[0, 100]` onto the 8-bit range.
pub const LIGHTNESS_TO_8BIT: f32 = 2.55;

/// CIE76 delta-E in 8-bit Lab units: L* stretched to `[0, 255]`, a* and b*
/// unchanged. Lightness differences weigh 2.55 times more than in
/// [`delta_e76`].
pub fn delta_e76_8bit(a: Lab, b: Lab) -> f32 {
    let dl = (a.l - b.l) * LIGHTNESS_TO_8BIT;
    let da = a.a - b.a;
    let db = a.b - b.b;
    (dl * dl + da * da + db * db).sqrt()
}
