// ============================================================================
// TRANSFORM OPERATIONS — crop, rotate-in-frame, perspective warp
// ============================================================================

use image::{RgbaImage, imageops};
use rayon::prelude::*;

use crate::error::OpError;
use crate::ops::adjustments::to_u8;

/// Sample coordinates this close to an integer are snapped onto it, so exact
/// transforms (identity, quarter turns) reproduce source pixels bit for bit.
const SNAP_EPSILON: f64 = 1e-6;

/// Cut out a `width`×`height` rectangle whose top-left corner is (`x`, `y`).
pub fn crop(src: &RgbaImage, width: u32, height: u32, x: u32, y: u32) -> Result<RgbaImage, OpError> {
    let fits_x = x.checked_add(width).is_some_and(|r| r <= src.width());
    let fits_y = y.checked_add(height).is_some_and(|b| b <= src.height());
    if !fits_x || !fits_y {
        return Err(OpError::CropOutOfBounds {
            width,
            height,
            x,
            y,
            image_width: src.width(),
            image_height: src.height(),
        });
    }
    Ok(imageops::crop_imm(src, x, y, width, height).to_image())
}

/// Rotate by `angle` degrees counter-clockwise around the image centre.
/// The canvas grows to the rotated bounding box so nothing is clipped;
/// uncovered corners are transparent.
pub fn rotate_in_frame(src: &RgbaImage, angle: f64) -> Result<RgbaImage, OpError> {
    let (w, h) = (src.width() as f64, src.height() as f64);
    if src.width() == 0 || src.height() == 0 {
        return Err(OpError::EmptyImage);
    }

    let (sin, cos) = angle.to_radians().sin_cos();
    let bw = snap(w * cos.abs() + h * sin.abs()).round().max(1.0);
    let bh = snap(w * sin.abs() + h * cos.abs()).round().max(1.0);

    let src_cx = (w - 1.0) / 2.0;
    let src_cy = (h - 1.0) / 2.0;
    let dst_cx = (bw - 1.0) / 2.0;
    let dst_cy = (bh - 1.0) / 2.0;

    // Inverse of the counter-clockwise rotation (y axis points down).
    Ok(warp(src, bw as u32, bh as u32, |dx, dy| {
        let u = dx - dst_cx;
        let v = dy - dst_cy;
        Some((cos * u - sin * v + src_cx, sin * u + cos * v + src_cy))
    }))
}

/// Warp the image so that its corners (top-left, top-right, bottom-right,
/// bottom-left) land on `quad`. The output keeps the input size.
pub fn transform_perspective(src: &RgbaImage, quad: &[(f32, f32); 4]) -> Result<RgbaImage, OpError> {
    let (w, h) = (src.width() as f64, src.height() as f64);
    let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let target = quad.map(|(x, y)| (x as f64, y as f64));

    let forward = perspective_matrix(&corners, &target).ok_or(OpError::DegenerateQuad)?;
    let inverse = invert_3x3(forward).ok_or(OpError::DegenerateQuad)?;

    Ok(warp(src, src.width(), src.height(), |dx, dy| {
        let sw = inverse[2][0] * dx + inverse[2][1] * dy + inverse[2][2];
        if sw.abs() < 1e-12 {
            return None;
        }
        let sx = (inverse[0][0] * dx + inverse[0][1] * dy + inverse[0][2]) / sw;
        let sy = (inverse[1][0] * dx + inverse[1][1] * dy + inverse[1][2]) / sw;
        Some((sx, sy))
    }))
}

/// Fill a `out_w`×`out_h` image by bilinear sampling `src` at the source
/// coordinates `map` returns for each destination pixel.
fn warp<F>(src: &RgbaImage, out_w: u32, out_h: u32, map: F) -> RgbaImage
where
    F: Fn(f64, f64) -> Option<(f64, f64)> + Sync,
{
    let mut dst = RgbaImage::new(out_w, out_h);
    let row_bytes = out_w as usize * 4;
    if row_bytes == 0 || out_h == 0 {
        return dst;
    }
    let dst_raw: &mut [u8] = &mut dst;

    dst_raw.par_chunks_mut(row_bytes).enumerate().for_each(|(dy, row)| {
        for dx in 0..out_w as usize {
            let Some((sx, sy)) = map(dx as f64, dy as f64) else { continue };
            let px = bilinear_sample(src, snap(sx), snap(sy));
            row[dx * 4..dx * 4 + 4].copy_from_slice(&px);
        }
    });
    dst
}

fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < SNAP_EPSILON { r } else { v }
}

/// Bilinear interpolation against a transparent background.
fn bilinear_sample(img: &RgbaImage, x: f64, y: f64) -> [u8; 4] {
    let x0 = x.floor();
    let y0 = y.floor();
    let (w, h) = (img.width() as i64, img.height() as i64);
    if x0 < -1.0 || y0 < -1.0 || x0 >= w as f64 || y0 >= h as f64 {
        return [0; 4];
    }
    let (x0, y0) = (x0 as i64, y0 as i64);
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let sample = |sx: i64, sy: i64| -> [f32; 4] {
        if sx < 0 || sy < 0 || sx >= w || sy >= h {
            [0.0; 4]
        } else {
            let p = img.get_pixel(sx as u32, sy as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
        }
    };

    let tl = sample(x0, y0);
    let tr = sample(x0 + 1, y0);
    let bl = sample(x0, y0 + 1);
    let br = sample(x0 + 1, y0 + 1);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = lerp(tl[c], tr[c], fx);
        let bot = lerp(bl[c], br[c], fx);
        out[c] = to_u8(lerp(top, bot, fy));
    }
    out
}

/// Homography taking each `from[i]` onto `to[i]`, or `None` when the points
/// are degenerate (three of them collinear).
fn perspective_matrix(from: &[(f64, f64); 4], to: &[(f64, f64); 4]) -> Option<[[f64; 3]; 3]> {
    // Eight unknowns h00..h21 with h22 = 1.
    let mut a = [[0.0f64; 9]; 8];
    for i in 0..4 {
        let (x, y) = from[i];
        let (u, v) = to[i];
        a[i] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u, u];
        a[i + 4] = [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v, v];
    }

    // Gaussian elimination with partial pivoting.
    for col in 0..8 {
        let pivot = (col..8).max_by(|&p, &q| a[p][col].abs().total_cmp(&a[q][col].abs()))?;
        if a[pivot][col].abs() < 1e-10 {
            return None;
        }
        a.swap(col, pivot);
        for row in 0..8 {
            if row == col {
                continue;
            }
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..9 {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    let s: Vec<f64> = (0..8).map(|i| a[i][8] / a[i][i]).collect();
    Some([[s[0], s[1], s[2]], [s[3], s[4], s[5]], [s[6], s[7], 1.0]])
}

/// Invert a 3×3 matrix. `None` on singular input.
fn invert_3x3(m: [[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let (a, b, c) = (m[0][0], m[0][1], m[0][2]);
    let (d, e, f) = (m[1][0], m[1][1], m[1][2]);
    let (g, h, i) = (m[2][0], m[2][1], m[2][2]);

    let det = a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv = 1.0 / det;
    Some([
        [(e * i - f * h) * inv, (c * h - b * i) * inv, (b * f - c * e) * inv],
        [(f * g - d * i) * inv, (a * i - c * g) * inv, (c * d - a * f) * inv],
        [(d * h - e * g) * inv, (b * g - a * h) * inv, (a * e - b * d) * inv],
    ])
}
