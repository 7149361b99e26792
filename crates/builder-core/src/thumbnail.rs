//! Thumbnail encoding helpers built on `image` and `base64`.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use builder_types::WearableCategory;
use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::error::ProcessError;
use crate::render::ThumbnailType;

pub const PNG_MIME: &str = "image/png";

/// Edge of the box a user-supplied thumbnail is resized to fit.
pub const THUMBNAIL_BOX: u32 = 256;

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Decode a base64 `data:` URL back into its payload.
pub fn data_url_to_bytes(url: &str) -> Result<Bytes, ProcessError> {
    let payload = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| payload)
        .ok_or(ProcessError::InvalidDataUrl)?;
    STANDARD
        .decode(payload)
        .map(Bytes::from)
        .map_err(|_| ProcessError::InvalidDataUrl)
}

pub fn is_png(bytes: &[u8]) -> bool {
    matches!(image::guess_format(bytes), Ok(ImageFormat::Png))
}

/// Validate a user-supplied thumbnail and shrink it to fit [`THUMBNAIL_BOX`].
pub fn prepare_custom_thumbnail(bytes: &[u8]) -> Result<Bytes, ProcessError> {
    if !is_png(bytes) {
        return Err(ProcessError::WrongThumbnailFormat);
    }
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    let resized = if img.width() > THUMBNAIL_BOX || img.height() > THUMBNAIL_BOX {
        img.resize(THUMBNAIL_BOX, THUMBNAIL_BOX, FilterType::Lanczos3)
    } else {
        img
    };
    encode_png(&resized)
}

/// Render a flat image wearable onto a square transparent canvas.
///
/// Facial feature categories use the top-down preset, which leaves a margin
/// around the artwork; everything else fills the canvas.
pub fn image_to_wearable_thumbnail(
    source: &[u8],
    category: Option<WearableCategory>,
    size: u32,
) -> Result<String, ProcessError> {
    let size = size.max(1);
    let img = image::load_from_memory(source)?;
    let fill = match ThumbnailType::for_category(category) {
        ThumbnailType::Top => 0.6,
        ThumbnailType::Default => 1.0,
    };
    let edge = ((size as f32) * fill).round().max(1.0) as u32;
    let art = img.resize(edge, edge, FilterType::Triangle).to_rgba8();

    let mut canvas = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    let x = i64::from(size.saturating_sub(art.width()) / 2);
    let y = i64::from(size.saturating_sub(art.height()) / 2);
    imageops::overlay(&mut canvas, &art, x, y);

    let png = encode_png(&DynamicImage::ImageRgba8(canvas))?;
    Ok(to_data_url(PNG_MIME, &png))
}

/// A solid PNG used where no real snapshot can be produced.
pub fn placeholder_png(size: u32) -> Result<Bytes, ProcessError> {
    let canvas = RgbaImage::from_pixel(size, size, Rgba([0x24, 0x21, 0x29, 0xff]));
    encode_png(&DynamicImage::ImageRgba8(canvas))
}

fn encode_png(img: &DynamicImage) -> Result<Bytes, ProcessError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(Bytes::from(out.into_inner()))
}
