// ============================================================================
// ADJUSTMENT OPERATIONS — per-pixel color adjustments
// ============================================================================
//
// Every function takes the source image by reference and returns a new one.
// Rows are processed in parallel via rayon; the result does not depend on
// scheduling, so the same input always yields the same bytes.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

// ============================================================================
// HELPER: per-pixel transform
// ============================================================================

/// Apply a per-pixel transform and return the result as a new image.
/// `transform` receives (r, g, b, a) as f32 and returns (r, g, b, a) as f32.
pub(crate) fn map_pixels<F>(src: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(f32, f32, f32, f32) -> (f32, f32, f32, f32) + Sync,
{
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let src_raw = src.as_raw();
    let stride = w * 4;
    let mut out = RgbaImage::new(w as u32, h as u32);
    let dst_raw: &mut [u8] = &mut out;

    dst_raw
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            let row_in = &src_raw[y * stride..(y + 1) * stride];
            for x in 0..w {
                let pi = x * 4;
                let r = row_in[pi] as f32;
                let g = row_in[pi + 1] as f32;
                let b = row_in[pi + 2] as f32;
                let a = row_in[pi + 3] as f32;
                let (nr, ng, nb, na) = transform(r, g, b, a);
                row_out[pi] = to_u8(nr);
                row_out[pi + 1] = to_u8(ng);
                row_out[pi + 2] = to_u8(nb);
                row_out[pi + 3] = to_u8(na);
            }
        });

    out
}

#[inline]
pub(crate) fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ============================================================================
// HSV-BASED OPERATIONS (8-bit scale: H 0..180, S 0..255, V 0..255)
// ============================================================================

/// Add `dh`/`ds`/`dv` to the HSV representation of every pixel.
/// Hue wraps around the color wheel; saturation and value saturate at 0/255.
fn hsv_add(src: &RgbaImage, dh: i32, ds: i32, dv: i32) -> RgbaImage {
    let (dh, ds, dv) = (dh as f32, ds as f32, dv as f32);
    map_pixels(src, move |r, g, b, a| {
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let h = (h + dh).rem_euclid(180.0);
        let s = (s + ds).clamp(0.0, 255.0);
        let v = (v + dv).clamp(0.0, 255.0);
        let (nr, ng, nb) = hsv_to_rgb(h, s, v);
        (nr, ng, nb, a)
    })
}

/// Increase (or decrease, for negative values) color saturation.
pub fn saturate(src: &RgbaImage, value: i32) -> RgbaImage {
    hsv_add(src, 0, value, 0)
}

/// Add `value` to the HSV value channel.
pub fn brighten(src: &RgbaImage, value: i32) -> RgbaImage {
    hsv_add(src, 0, 0, value)
}

/// Rotate hue by `value` steps of two degrees.
pub fn hue(src: &RgbaImage, value: i32) -> RgbaImage {
    hsv_add(src, value, 0, 0)
}

/// RGB (0..255) → HSV with H in 0..180 and S, V in 0..255.
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;
    let v = max;
    let s = if max > 0.0 { d / max * 255.0 } else { 0.0 };

    if d.abs() < 1e-6 {
        return (0.0, s, v);
    }

    let mut h = if (max - r).abs() < 1e-6 {
        60.0 * (g - b) / d
    } else if (max - g).abs() < 1e-6 {
        120.0 + 60.0 * (b - r) / d
    } else {
        240.0 + 60.0 * (r - g) / d
    };
    if h < 0.0 {
        h += 360.0;
    }

    (h / 2.0, s, v)
}

/// HSV (H 0..180, S 0..255, V 0..255) → RGB (0..255).
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let s = s / 255.0;
    if s <= 0.0 {
        return (v, v, v);
    }

    let h6 = (h * 2.0 / 60.0).rem_euclid(6.0);
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match sector as u32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

// ============================================================================
// LAB-BASED OPERATIONS (8-bit scale: L 0..255)
// ============================================================================

// D65 reference white
const XN: f32 = 0.950_456;
const ZN: f32 = 1.088_754;

/// Add `value` to the lightness channel of CIE Lab (8-bit scale).
pub fn lighten(src: &RgbaImage, value: i32) -> RgbaImage {
    let dl = value as f32 * 100.0 / 255.0;
    map_pixels(src, move |r, g, b, a| {
        let (l, la, lb) = rgb_to_lab(r, g, b);
        let l = (l + dl).clamp(0.0, 100.0);
        let (nr, ng, nb) = lab_to_rgb(l, la, lb);
        (nr, ng, nb, a)
    })
}

fn srgb_to_linear(c: f32) -> f32 {
    let c = c / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    v * 255.0
}

fn lab_f(t: f32) -> f32 {
    if t > 0.008_856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    let t3 = t * t * t;
    if t3 > 0.008_856 {
        t3
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

/// sRGB (0..255) → CIE Lab (L 0..100).
pub fn rgb_to_lab(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let (r, g, b) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));
    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / XN;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / ZN;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = 116.0 * fy - 16.0;
    (l.max(0.0), 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// CIE Lab (L 0..100) → sRGB (0..255).
pub fn lab_to_rgb(l: f32, a: f32, b: f32) -> (f32, f32, f32) {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let x = lab_f_inv(fx) * XN;
    let y = lab_f_inv(fy);
    let z = lab_f_inv(fz) * ZN;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_992 * y + 0.041_556 * z;
    let bl = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;
    (linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(bl))
}

// ============================================================================
// LINEAR CHANNEL OPERATIONS
// ============================================================================

/// Contrast around mid-grey. `value` is clamped to -255..255.
/// C' = factor * (C - 128) + 128
pub fn contrast(src: &RgbaImage, value: i32) -> RgbaImage {
    let v = value.clamp(-255, 255) as f32;
    let factor = (259.0 * (v + 255.0)) / (255.0 * (259.0 - v));
    map_pixels(src, move |r, g, b, a| {
        (
            factor * (r - 128.0) + 128.0,
            factor * (g - 128.0) + 128.0,
            factor * (b - 128.0) + 128.0,
            a,
        )
    })
}

/// Black & white filter. BT.601 luminance, alpha preserved.
pub fn gray(src: &RgbaImage) -> RgbaImage {
    map_pixels(src, |r, g, b, a| {
        let lum = 0.299 * r + 0.587 * g + 0.114 * b;
        (lum, lum, lum, a)
    })
}

/// Shift the green channel.
pub fn tint(src: &RgbaImage, value: i32) -> RgbaImage {
    let shift = value as f32;
    map_pixels(src, move |r, g, b, a| (r, g + shift, b, a))
}

/// Warm (positive) or cool (negative): red up, blue down.
pub fn temperature(src: &RgbaImage, value: i32) -> RgbaImage {
    let shift = value as f32;
    map_pixels(src, move |r, g, b, a| (r + shift, g, b - shift, a))
}

/// Wash the image with a solid color: (1 - alpha) * C + alpha * color.
pub fn apply_color(src: &RgbaImage, r: u8, g: u8, b: u8, alpha: f32) -> RgbaImage {
    let alpha = alpha.clamp(0.0, 1.0);
    let keep = 1.0 - alpha;
    let (cr, cg, cb) = (r as f32 * alpha, g as f32 * alpha, b as f32 * alpha);
    map_pixels(src, move |pr, pg, pb, pa| {
        (pr * keep + cr, pg * keep + cg, pb * keep + cb, pa)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn test_hsv_round_trip_primaries() {
        for &(r, g, b) in &[(255.0, 0.0, 0.0), (0.0, 255.0, 0.0), (0.0, 0.0, 255.0), (40.0, 90.0, 200.0)] {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let (nr, ng, nb) = hsv_to_rgb(h, s, v);
            assert!((nr - r).abs() < 0.5 && (ng - g).abs() < 0.5 && (nb - b).abs() < 0.5);
        }
    }

    #[test]
    fn test_lab_round_trip() {
        let (l, a, b) = rgb_to_lab(120.0, 60.0, 30.0);
        let (r, g, bl) = lab_to_rgb(l, a, b);
        assert!((r - 120.0).abs() < 1.0);
        assert!((g - 60.0).abs() < 1.0);
        assert!((bl - 30.0).abs() < 1.0);
    }

    #[test]
    fn test_gray_equalizes_channels_and_keeps_alpha() {
        let img = solid(3, 2, [200, 100, 50, 77]);
        let out = gray(&img);
        let p = out.get_pixel(1, 1);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        assert_eq!(p[3], 77);
    }

    #[test]
    fn test_saturate_negative_fully_desaturates() {
        let img = solid(2, 2, [200, 40, 40, 255]);
        let out = saturate(&img, -255);
        let p = out.get_pixel(0, 0);
        assert_eq!((p[0], p[1], p[2]), (200, 200, 200));
    }

    #[test]
    fn test_brighten_saturates_at_white() {
        let img = solid(1, 1, [250, 250, 250, 255]);
        let out = brighten(&img, 100);
        assert_eq!(out.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_hue_full_turn_is_identity() {
        let img = solid(1, 1, [255, 0, 0, 255]);
        let out = hue(&img, 180);
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(0, 0));
    }

    #[test]
    fn test_contrast_zero_is_identity() {
        let img = solid(2, 1, [10, 128, 240, 255]);
        assert_eq!(contrast(&img, 0), img);
    }

    #[test]
    fn test_contrast_extreme_value_is_finite() {
        let img = solid(1, 1, [100, 128, 160, 255]);
        let out = contrast(&img, 259);
        let p = out.get_pixel(0, 0);
        assert_eq!(p[0], 0);
        assert_eq!(p[1], 128);
        assert_eq!(p[2], 255);
    }

    #[test]
    fn test_lighten_raises_luminance() {
        let img = solid(1, 1, [80, 80, 80, 255]);
        let out = lighten(&img, 40);
        assert!(out.get_pixel(0, 0)[0] > 80);
    }

    #[test]
    fn test_tint_and_temperature_shift_channels() {
        let img = solid(1, 1, [100, 100, 100, 255]);
        assert_eq!(tint(&img, 20).get_pixel(0, 0).0, [100, 120, 100, 255]);
        assert_eq!(temperature(&img, 20).get_pixel(0, 0).0, [120, 100, 80, 255]);
        assert_eq!(temperature(&img, -20).get_pixel(0, 0).0, [80, 100, 120, 255]);
    }

    #[test]
    fn test_apply_color_full_alpha_replaces_rgb() {
        let img = solid(2, 2, [10, 20, 30, 99]);
        let out = apply_color(&img, 255, 0, 255, 1.0);
        assert_eq!(out.get_pixel(1, 0).0, [255, 0, 255, 99]);
        assert_eq!(apply_color(&img, 255, 0, 255, 0.0), img);
    }

    #[test]
    fn test_empty_image_passes_through() {
        let img = RgbaImage::new(0, 0);
        assert_eq!(gray(&img).dimensions(), (0, 0));
    }
}
