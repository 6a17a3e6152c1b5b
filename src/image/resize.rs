/// Image resizing with a closed set of interpolators
use crate::{
    error::{VaultError, VaultResult},
    image::filetypes::{MIME_JPEG, MIME_PNG, MIME_TIFF},
};
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use std::io::Cursor;

/// Scaling kernel selected by configuration.
///
/// `ApproxBilinear` maps onto the same triangle kernel as `Bilinear`; the
/// distinction is kept so configured names stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolator {
    NearestNeighbor,
    CatmullRom,
    Bilinear,
    ApproxBilinear,
}

impl Interpolator {
    /// Case-insensitive lookup; unknown names are rejected before any I/O.
    pub fn parse(name: &str) -> VaultResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "nearestneighbor" => Ok(Self::NearestNeighbor),
            "catmullrom" => Ok(Self::CatmullRom),
            "bilinear" => Ok(Self::Bilinear),
            "approxbilinear" => Ok(Self::ApproxBilinear),
            other => Err(VaultError::UnsupportedType(format!(
                "interpolator {other:?}"
            ))),
        }
    }

    fn filter(self) -> FilterType {
        match self {
            Self::NearestNeighbor => FilterType::Nearest,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Bilinear | Self::ApproxBilinear => FilterType::Triangle,
        }
    }
}

fn format_for_mime(mime: &str) -> VaultResult<ImageFormat> {
    match mime {
        MIME_JPEG => Ok(ImageFormat::Jpeg),
        MIME_PNG => Ok(ImageFormat::Png),
        MIME_TIFF => Ok(ImageFormat::Tiff),
        other => Err(VaultError::UnsupportedType(format!("MIME type {other:?}"))),
    }
}

/// Resize an image to the target width, preserving aspect ratio.
///
/// Decodes per MIME, scales into a fresh RGBA raster with the selected
/// kernel and re-encodes to the same MIME. The target height is
/// `round(origH * width / origW)`.
pub fn resize_image(
    data: &[u8],
    mime: &str,
    width: u32,
    interpolator: Interpolator,
) -> VaultResult<Vec<u8>> {
    let format = format_for_mime(mime)?;

    let original = image::load_from_memory_with_format(data, format)
        .map_err(|e| VaultError::Internal(format!("decode image: {e}")))?;

    let height = ((f64::from(original.height()) * f64::from(width))
        / f64::from(original.width()))
    .round() as u32;

    let resized = original.resize_exact(width, height.max(1), interpolator.filter());
    let rgba = DynamicImage::ImageRgba8(resized.to_rgba8());

    // The JPEG encoder has no alpha channel to write into
    let out = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(rgba.to_rgb8()),
        _ => rgba,
    };

    let mut buffer = Cursor::new(Vec::new());
    out.write_to(&mut buffer, format)
        .map_err(|e| VaultError::Internal(format!("encode image: {e}")))?;

    Ok(buffer.into_inner())
}
