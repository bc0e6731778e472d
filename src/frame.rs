use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Frame format enumeration supporting different video formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// Motion JPEG format - compressed JPEG frames
    Mjpeg,
    /// RGB24 format - uncompressed RGB data
    Rgb24,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Mjpeg => 0, // Variable size, compressed
            FrameFormat::Rgb24 => 3,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }
}

/// An immutable raster snapshot.
///
/// Pixel data sits behind an `Arc`, so cloning hands out a read-only view
/// that the producer can never mutate underneath a consumer.
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership for efficiency)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    /// Create a new frame data instance
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Same frame metadata with different pixel data
    pub fn with_data(&self, data: Vec<u8>, format: FrameFormat) -> Self {
        Self {
            id: self.id,
            timestamp: self.timestamp,
            data: Arc::new(data),
            width: self.width,
            height: self.height,
            format,
        }
    }

    /// Get the expected frame size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => true,
        }
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_frame_size_validation() {
        let frame = FrameData::new(1, SystemTime::now(), vec![0u8; 4 * 2 * 3], 4, 2, FrameFormat::Rgb24);
        assert_eq!(frame.expected_size(), Some(24));
        assert!(frame.validate_size());

        let short = frame.with_data(vec![0u8; 10], FrameFormat::Rgb24);
        assert!(!short.validate_size());
        assert_eq!(short.id, 1);
    }

    #[test]
    fn test_clone_shares_pixels() {
        let frame = FrameData::new(7, SystemTime::now(), vec![1, 2, 3], 1, 1, FrameFormat::Rgb24);
        let snapshot = frame.clone();

        assert!(Arc::ptr_eq(&frame.data, &snapshot.data));
        assert!(FrameFormat::Mjpeg.is_compressed());
        assert!(snapshot.validate_size());
    }
}
