//! Raster embedding as image XObjects
//!
//! PNG (and any other decodable format) is flattened to an 8-bit RGB stream
//! with the alpha channel as a DeviceGray soft mask. JPEG bytes are passed
//! through untouched with `DCTDecode`.

use lopdf::{dictionary, Document, ObjectId, Stream};
use overlay_core::entry::{ImageData, ImageKind};

#[derive(Debug, thiserror::Error)]
pub enum ImageEmbedError {
    #[error("image is empty")]
    Empty,
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Add the XObject (and soft mask) for `data` to `doc`
pub(crate) fn embed_image(
    doc: &mut Document,
    data: &ImageData,
) -> Result<ObjectId, ImageEmbedError> {
    if data.image_bytes.is_empty() {
        return Err(ImageEmbedError::Empty);
    }
    match data.image_type {
        ImageKind::Jpeg => embed_jpeg(doc, &data.image_bytes),
        ImageKind::Png => embed_rgba(doc, &data.image_bytes),
    }
}

fn embed_jpeg(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId, ImageEmbedError> {
    // Decoding validates the stream and tells us the component count.
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)?;
    let color_space = if decoded.color().channel_count() == 1 { "DeviceGray" } else { "DeviceRGB" };

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => decoded.width() as i64,
            "Height" => decoded.height() as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        bytes.to_vec(),
    )
    .with_compression(false);
    Ok(doc.add_object(stream))
}

fn embed_rgba(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId, ImageEmbedError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = img.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in img.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    ));

    Ok(doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    )))
}
