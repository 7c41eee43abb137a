//! Color maps for density and dominant source fields.

use crate::math::*;
use std::ops::{Add, AddAssign, Div, Mul};

/// Linear RGB triple with components nominally in `[0, 1]`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rgb {
    pub r: Float,
    pub g: Float,
    pub b: Float,
}

impl Rgb {
    /// Black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new color.
    ///
    /// * `r` - Red.
    /// * `g` - Green.
    /// * `b` - Blue.
    pub const fn new(r: Float, g: Float, b: Float) -> Self {
        Self { r, g, b }
    }

    /// Clamps all components to `[0, 1]`.
    pub fn clamp(&self) -> Self {
        Self::new(
            clamp(self.r, 0.0, 1.0),
            clamp(self.g, 0.0, 1.0),
            clamp(self.b, 0.0, 1.0),
        )
    }

    /// Converts to 8-bit components.
    pub fn to_rgb8(&self) -> [u8; 3] {
        let c = self.clamp();
        [to_byte(c.r), to_byte(c.g), to_byte(c.b)]
    }
}

#[inline]
fn to_byte(v: Float) -> u8 {
    clamp(255.0 * v + 0.5, 0.0, 255.0) as u8
}

impl Add for Rgb {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }
}

impl AddAssign for Rgb {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Mul<Float> for Rgb {
    type Output = Self;

    fn mul(self, f: Float) -> Self::Output {
        Self::new(self.r * f, self.g * f, self.b * f)
    }
}

impl Mul<Rgb> for Float {
    type Output = Rgb;

    fn mul(self, c: Rgb) -> Self::Output {
        c * self
    }
}

impl Div<Float> for Rgb {
    type Output = Self;

    fn div(self, f: Float) -> Self::Output {
        debug_assert!(f != 0.0);
        let inv = 1.0 / f;
        self * inv
    }
}

/// Heat map stops from low to high density.
const HEAT_STOPS: [Rgb; 5] = [
    Rgb::new(0.0, 0.0, 0.5),
    Rgb::new(0.0, 0.5, 1.0),
    Rgb::new(0.0, 1.0, 0.3),
    Rgb::new(1.0, 1.0, 0.0),
    Rgb::new(1.0, 0.1, 0.0),
];

/// Maps a density in `[0, 1]` to a blue-green-red heat color. Values outside
/// the range are clamped.
///
/// * `t` - The density.
pub fn heat_color(t: Float) -> Rgb {
    let t = clamp(t, 0.0, 1.0);
    let segments = (HEAT_STOPS.len() - 1) as Float;
    let x = t * segments;
    let i = min(x as usize, HEAT_STOPS.len() - 2);
    lerp(x - i as Float, HEAT_STOPS[i], HEAT_STOPS[i + 1]).clamp()
}

/// Maps a normalized dominant source index (`index / count`) to a fully
/// saturated hue so that each source gets a distinct color.
///
/// * `dominant` - Normalized source index in `[0, 1)`.
pub fn source_color(dominant: Float) -> Rgb {
    hsv_to_rgb(clamp(dominant, 0.0, 1.0) * 360.0, 1.0, 1.0)
}

/// Converts HSV to RGB.
///
/// * `h` - Hue in degrees.
/// * `s` - Saturation in `[0, 1]`.
/// * `v` - Value in `[0, 1]`.
pub fn hsv_to_rgb(h: Float, s: Float, v: Float) -> Rgb {
    let h = h.rem_euclid(360.0) / 60.0;
    let c = v * s;
    let x = c * (1.0 - abs(h % 2.0 - 1.0));
    let m = v - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Rgb::new(r + m, g + m, b + m)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
