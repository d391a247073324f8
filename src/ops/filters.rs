// ============================================================================
// IMAGE FILTERS — Gaussian blur, unsharp-mask sharpen, weighted blend
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

use crate::error::OpError;
use crate::ops::adjustments::to_u8;

/// Sigma of the blur used as the low-pass reference when sharpening.
const SHARPEN_SIGMA: f32 = 1.0;

/// Gaussian blur with standard deviation `sigma`.
/// A non-positive sigma returns an unchanged copy.
pub fn gaussian_blur(src: &RgbaImage, sigma: f32) -> RgbaImage {
    if !(sigma > 0.0) {
        return src.clone();
    }
    parallel_gaussian_blur(src, sigma)
}

/// Unsharp mask: result = (1 + amount) * original - amount * blurred.
/// Negative amounts soften the image instead.
pub fn sharpen(src: &RgbaImage, amount: f32) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let blurred = parallel_gaussian_blur(src, SHARPEN_SIGMA);
    let src_raw = src.as_raw();
    let blur_raw = blurred.as_raw();
    let stride = w * 4;
    let mut out = RgbaImage::new(w as u32, h as u32);
    let dst_raw: &mut [u8] = &mut out;

    dst_raw
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            let row = y * stride;
            for (i, out_px) in row_out.iter_mut().enumerate() {
                let s = src_raw[row + i] as f32;
                let b = blur_raw[row + i] as f32;
                *out_px = to_u8(s + amount * (s - b));
            }
        });

    out
}

/// Weighted sum of two equally sized images: alpha * first + (1 - alpha) * second.
/// All four channels are mixed.
pub fn blend(first: &RgbaImage, second: &RgbaImage, alpha: f32) -> Result<RgbaImage, OpError> {
    if first.dimensions() != second.dimensions() {
        return Err(OpError::SizeMismatch {
            left: first.dimensions(),
            right: second.dimensions(),
        });
    }

    let beta = 1.0 - alpha;
    let a_raw = first.as_raw();
    let b_raw = second.as_raw();
    let mut out = RgbaImage::new(first.width(), first.height());
    let stride = first.width() as usize * 4;
    if stride == 0 {
        return Ok(out);
    }
    let dst_raw: &mut [u8] = &mut out;

    dst_raw
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            let row = y * stride;
            for (i, out_px) in row_out.iter_mut().enumerate() {
                let v = a_raw[row + i] as f32 * alpha + b_raw[row + i] as f32 * beta;
                *out_px = to_u8(v);
            }
        });

    Ok(out)
}

// ---------------------------------------------------------------------------
//  Parallel separable Gaussian blur (rayon)
// ---------------------------------------------------------------------------

/// Build a 1-D Gaussian kernel truncated at ceil(3*sigma), and never wider
/// than `max_radius` taps on each side.
fn build_gaussian_kernel(sigma: f32, max_radius: usize) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil().min(max_radius as f32) as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let len = radius * 2 + 1;
    let mut kernel = vec![0.0f32; len];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;
    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        let v = (-x * x / s2).exp();
        *k = v;
        sum += v;
    }
    let inv = 1.0 / sum;
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

fn parallel_gaussian_blur(src: &RgbaImage, sigma: f32) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    // Taps past the far edge only repeat the clamped border pixel.
    let kernel = build_gaussian_kernel(sigma, w.max(h));
    let radius = kernel.len() / 2;
    let pixel_count = w * h * 4;
    let buf_in: Vec<f32> = src.as_raw().iter().map(|&b| b as f32).collect();

    // --- Horizontal pass (parallel by row), edges clamped ---
    let mut buf_h = vec![0.0f32; pixel_count];
    buf_h.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        let row_in_start = y * w * 4;
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = (x as isize + ki as isize - radius as isize).clamp(0, w as isize - 1) as usize;
                let idx = row_in_start + sx * 4;
                for c in 0..4 {
                    acc[c] += buf_in[idx + c] * kv;
                }
            }
            row_out[x * 4..x * 4 + 4].copy_from_slice(&acc);
        }
    });

    // --- Vertical pass (parallel by row) ---
    let mut out = RgbaImage::new(w as u32, h as u32);
    let dst_raw: &mut [u8] = &mut out;
    dst_raw.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y as isize + ki as isize - radius as isize).clamp(0, h as isize - 1) as usize;
                let idx = sy * w * 4 + x * 4;
                for c in 0..4 {
                    acc[c] += buf_h[idx + c] * kv;
                }
            }
            for c in 0..4 {
                row_out[x * 4 + c] = to_u8(acc[c]);
            }
        }
    });

    out
}
