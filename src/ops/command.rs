use std::sync::Arc;

use image::RgbaImage;

use crate::error::OpError;
use crate::ops::{adjustments, filters, transform};

/// One parameterized image operation.
///
/// `execute` is pure: it never touches its input and the same command on the
/// same image always produces the same bytes. Parameters are taken as given;
/// keeping them in a sensible range is up to whoever builds the command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Records an image without changing it (used for the opening baseline).
    Identity,
    Crop { width: u32, height: u32, x: u32, y: u32 },
    /// Degrees, counter-clockwise; the frame grows to fit.
    RotateInFrame { angle: f64 },
    Saturate { value: i32 },
    Brighten { value: i32 },
    Hue { value: i32 },
    Contrast { value: i32 },
    Lighten { value: i32 },
    Gray,
    /// Mixes in a second image: `alpha * current + (1 - alpha) * other`.
    Blend { other: Arc<RgbaImage>, alpha: f32 },
    Tint { value: i32 },
    Temperature { value: i32 },
    Blur { sigma: f32 },
    Sharpen { amount: f32 },
    ApplyColor { r: u8, g: u8, b: u8, alpha: f32 },
    /// Target positions of the top-left, top-right, bottom-right and
    /// bottom-left corners.
    TransformPerspective { quad: [(f32, f32); 4] },
}

impl Command {
    pub fn execute(&self, image: &RgbaImage) -> Result<RgbaImage, OpError> {
        match self {
            Command::Identity => Ok(image.clone()),
            Command::Crop { width, height, x, y } => transform::crop(image, *width, *height, *x, *y),
            Command::RotateInFrame { angle } => transform::rotate_in_frame(image, *angle),
            Command::Saturate { value } => Ok(adjustments::saturate(image, *value)),
            Command::Brighten { value } => Ok(adjustments::brighten(image, *value)),
            Command::Hue { value } => Ok(adjustments::hue(image, *value)),
            Command::Contrast { value } => Ok(adjustments::contrast(image, *value)),
            Command::Lighten { value } => Ok(adjustments::lighten(image, *value)),
            Command::Gray => Ok(adjustments::gray(image)),
            Command::Blend { other, alpha } => filters::blend(image, other, *alpha),
            Command::Tint { value } => Ok(adjustments::tint(image, *value)),
            Command::Temperature { value } => Ok(adjustments::temperature(image, *value)),
            Command::Blur { sigma } => Ok(filters::gaussian_blur(image, *sigma)),
            Command::Sharpen { amount } => Ok(filters::sharpen(image, *amount)),
            Command::ApplyColor { r, g, b, alpha } => Ok(adjustments::apply_color(image, *r, *g, *b, *alpha)),
            Command::TransformPerspective { quad } => transform::transform_perspective(image, quad),
        }
    }

    /// Short description for history listings and the log.
    pub fn label(&self) -> String {
        match self {
            Command::Identity => "Open".to_string(),
            Command::Crop { width, height, x, y } => format!("Crop {}x{} at ({}, {})", width, height, x, y),
            Command::RotateInFrame { angle } => format!("Rotate {}°", angle),
            Command::Saturate { value } => format!("Saturation {:+}", value),
            Command::Brighten { value } => format!("Brightness {:+}", value),
            Command::Hue { value } => format!("Hue {:+}", value),
            Command::Contrast { value } => format!("Contrast {:+}", value),
            Command::Lighten { value } => format!("Lightness {:+}", value),
            Command::Gray => "Black & White".to_string(),
            Command::Blend { other, alpha } => {
                format!("Blend {}x{} ({:.2})", other.width(), other.height(), alpha)
            }
            Command::Tint { value } => format!("Tint {:+}", value),
            Command::Temperature { value } => format!("Temperature {:+}", value),
            Command::Blur { sigma } => format!("Blur (sigma {:.1})", sigma),
            Command::Sharpen { amount } => format!("Sharpen {:.1}", amount),
            Command::ApplyColor { r, g, b, alpha } => {
                format!("Color #{:02x}{:02x}{:02x} ({:.2})", r, g, b, alpha)
            }
            Command::TransformPerspective { .. } => "Perspective".to_string(),
        }
    }
}
