//! JPEG/RGB conversions shared by the annotator and the HTTP layer

use crate::error::AnalysisError;
use crate::frame::{FrameData, FrameFormat};
use std::sync::Arc;
#[cfg(feature = "overlay")]
use std::time::SystemTime;

#[cfg(feature = "overlay")]
use image::{DynamicImage, ImageFormat, RgbImage};

/// Decode any supported frame into an owned RGB raster
#[cfg(feature = "overlay")]
pub fn decode_rgb(frame: &FrameData) -> Result<RgbImage, AnalysisError> {
    match frame.format {
        FrameFormat::Mjpeg => image::load_from_memory_with_format(&frame.data, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(|e| AnalysisError::FrameDecode {
                frame_id: frame.id,
                details: e.to_string(),
            }),
        FrameFormat::Rgb24 => RgbImage::from_raw(frame.width, frame.height, frame.data.to_vec())
            .ok_or_else(|| AnalysisError::FrameDecode {
                frame_id: frame.id,
                details: format!(
                    "expected {} bytes for {}x{} RGB, got {}",
                    frame.width as usize * frame.height as usize * 3,
                    frame.width,
                    frame.height,
                    frame.data.len()
                ),
            }),
    }
}

#[cfg(feature = "overlay")]
pub fn encode_jpeg(image: RgbImage) -> Result<Vec<u8>, AnalysisError> {
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Jpeg)
        .map_err(|e| AnalysisError::Annotation {
            details: format!("Failed to encode JPEG: {}", e),
        })?;
    Ok(output)
}

/// JPEG bytes for a frame, encoding raw frames when needed
pub fn jpeg_bytes(frame: &FrameData) -> Result<Arc<Vec<u8>>, AnalysisError> {
    match frame.format {
        FrameFormat::Mjpeg => Ok(Arc::clone(&frame.data)),
        #[cfg(feature = "overlay")]
        FrameFormat::Rgb24 => encode_jpeg(decode_rgb(frame)?).map(Arc::new),
        #[cfg(not(feature = "overlay"))]
        FrameFormat::Rgb24 => Err(AnalysisError::UnsupportedFormat {
            format: "RGB24 (built without JPEG encoding)".to_string(),
        }),
    }
}

/// Wrap an uploaded JPEG as a frame, reading its dimensions from the header
#[cfg(feature = "overlay")]
pub fn frame_from_jpeg(id: u64, bytes: Vec<u8>) -> Result<FrameData, AnalysisError> {
    let (width, height) = image::io::Reader::with_format(
        std::io::Cursor::new(&bytes),
        ImageFormat::Jpeg,
    )
    .into_dimensions()
    .map_err(|e| AnalysisError::FrameDecode {
        frame_id: id,
        details: e.to_string(),
    })?;

    Ok(FrameData::new(
        id,
        SystemTime::now(),
        bytes,
        width,
        height,
        FrameFormat::Mjpeg,
    ))
}

#[cfg(not(feature = "overlay"))]
pub fn frame_from_jpeg(id: u64, _bytes: Vec<u8>) -> Result<FrameData, AnalysisError> {
    Err(AnalysisError::UnsupportedFormat {
        format: format!("JPEG upload {} (built without image decoding)", id),
    })
}
