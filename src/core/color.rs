//! sRGB → CIELAB conversion for appearance features.
//!
//! Classification and the appearance kernel operate in a perceptually
//! uniform space. The conversion quantizes L*a*b* back into the 8-bit
//! color channels (L ∈ [0,255], a and b offset by 128), so the cloud type
//! stays unchanged downstream.

use crate::core::ColoredCloud;

// D65 white point
const XN: f32 = 0.950456;
const ZN: f32 = 1.088754;

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// Convert one sRGB color to 8-bit quantized CIELAB.
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let rl = srgb_to_linear(r as f32 / 255.0);
    let gl = srgb_to_linear(g as f32 / 255.0);
    let bl = srgb_to_linear(b as f32 / 255.0);

    let x = (0.412453 * rl + 0.357580 * gl + 0.180423 * bl) / XN;
    let y = 0.212671 * rl + 0.715160 * gl + 0.072169 * bl;
    let z = (0.019334 * rl + 0.119193 * gl + 0.950227 * bl) / ZN;

    let fy = lab_f(y);
    let l = if y > 0.008856 { 116.0 * fy - 16.0 } else { 903.3 * y };
    let a = 500.0 * (lab_f(x) - fy);
    let bb = 200.0 * (fy - lab_f(z));

    (
        (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        (a + 128.0).round().clamp(0.0, 255.0) as u8,
        (bb + 128.0).round().clamp(0.0, 255.0) as u8,
    )
}

/// Rewrite every point's color channels from sRGB to quantized Lab in place.
pub fn normalize_cloud(cloud: &mut ColoredCloud) {
    for p in &mut cloud.points {
        let (l, a, b) = rgb_to_lab(p.r, p.g, p.b);
        p.r = l;
        p.g = a;
        p.b = b;
    }
}
