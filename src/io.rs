// ============================================================================
// IMAGE I/O — decode from disk, encode to disk or memory
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::codecs::tiff::TiffEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, ImageError, ImageFormat, RgbaImage};

/// Output formats the editor can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tga,
    Tiff,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Webp => "webp",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
            SaveFormat::Tiff => "tiff",
        }
    }

    pub fn supports_quality(&self) -> bool {
        matches!(self, SaveFormat::Jpeg)
    }

    /// Match a format name or file extension, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpeg" | "jpg" => Some(SaveFormat::Jpeg),
            "webp" => Some(SaveFormat::Webp),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            "tiff" | "tif" => Some(SaveFormat::Tiff),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_name)
    }
}

/// Decode any supported file into RGBA8.
pub fn load_image(path: &Path) -> crate::error::Result<RgbaImage> {
    let img = image::open(path)?.to_rgba8();
    crate::log_info!("Loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img)
}

/// Encode and write an image to a file.
/// Standalone so it can run from a background thread.
pub fn encode_and_write(image: &RgbaImage, path: &Path, format: SaveFormat, quality: u8) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            PngEncoder::new(&mut writer).write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)?;
        }
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(rgb_image.as_raw(), rgb_image.width(), rgb_image.height(), ColorType::Rgb8)?;
        }
        SaveFormat::Webp => {
            DynamicImage::ImageRgba8(image.clone()).save_with_format(path, ImageFormat::WebP)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)?;
        }
        SaveFormat::Tga => {
            TgaEncoder::new(&mut writer).encode(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)?;
        }
        SaveFormat::Tiff => {
            TiffEncoder::new(&mut writer).encode(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)?;
        }
    }

    writer.flush()?;
    crate::log_info!("Saved {} as {}", path.display(), format.extension());
    Ok(())
}

/// PNG bytes of `image`, as sent to image hosts.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(7, 5, |x, y| Rgba([(x * 30) as u8, (y * 40) as u8, 99, 255]))
    }

    #[test]
    fn test_format_names() {
        assert_eq!(SaveFormat::from_name("JPG"), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::from_name("tif"), Some(SaveFormat::Tiff));
        assert_eq!(SaveFormat::from_name("gif"), None);
        assert_eq!(SaveFormat::from_path(Path::new("a/b.PNG")), Some(SaveFormat::Png));
        assert_eq!(SaveFormat::from_path(Path::new("noext")), None);
        assert_eq!(SaveFormat::Jpeg.extension(), "jpg");
        assert!(SaveFormat::Jpeg.supports_quality());
        assert!(!SaveFormat::Png.supports_quality());
    }

    #[test]
    fn test_lossless_formats_reload_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let img = sample();
        for format in [SaveFormat::Png, SaveFormat::Bmp, SaveFormat::Tga, SaveFormat::Tiff] {
            let path = dir.path().join(format!("out.{}", format.extension()));
            encode_and_write(&img, &path, format, 90).unwrap();
            assert_eq!(load_image(&path).unwrap(), img, "{:?}", format);
        }
    }

    #[test]
    fn test_jpeg_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        encode_and_write(&sample(), &path, SaveFormat::Jpeg, 80).unwrap();
        let back = load_image(&path).unwrap();
        assert_eq!(back.dimensions(), (7, 5));
        assert_eq!(back.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_encode_png_signature() {
        let bytes = encode_png(&sample()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_image(&dir.path().join("missing.png")).is_err());
    }
}
