use crate::classifier::Overlay;
#[cfg(feature = "overlay")]
use crate::classifier::OverlayAccent;
use crate::config::OverlayConfig;
use crate::error::AnalysisError;
use crate::frame::FrameData;
use std::sync::Arc;
#[cfg(feature = "overlay")]
use tracing::info;
use tracing::warn;

#[cfg(feature = "overlay")]
use super::codec::{decode_rgb, encode_jpeg};
#[cfg(feature = "overlay")]
use crate::frame::FrameFormat;
#[cfg(feature = "overlay")]
use image::{Rgb, RgbImage};
#[cfg(feature = "overlay")]
use imageproc::drawing::{draw_text_mut, text_size};
#[cfg(feature = "overlay")]
use rusttype::{Font, Scale};

/// Draws classifier state onto a frame.
///
/// Implementations hold no per-session state; the output depends only on the
/// frame and the overlay passed in.
pub trait Annotator: Send + Sync {
    fn annotate(&self, frame: &FrameData, overlay: &Overlay) -> Result<FrameData, AnalysisError>;
}

/// Returns frames untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughAnnotator;

impl Annotator for PassthroughAnnotator {
    fn annotate(&self, frame: &FrameData, _overlay: &Overlay) -> Result<FrameData, AnalysisError> {
        Ok(frame.clone())
    }
}

#[cfg(feature = "overlay")]
const PADDING: u32 = 10;
#[cfg(feature = "overlay")]
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
#[cfg(feature = "overlay")]
const YELLOW: Rgb<u8> = Rgb([255, 220, 0]);
#[cfg(feature = "overlay")]
const GREEN: Rgb<u8> = Rgb([80, 220, 80]);
#[cfg(feature = "overlay")]
const RED: Rgb<u8> = Rgb([235, 60, 60]);

/// Header counters, status lines and a feedback bar rendered with a TrueType font.
/// Output frames are always JPEG.
#[cfg(feature = "overlay")]
pub struct TextOverlayAnnotator {
    font: Font<'static>,
    font_size: f32,
}

#[cfg(feature = "overlay")]
impl TextOverlayAnnotator {
    pub fn new(config: &OverlayConfig) -> Result<Self, AnalysisError> {
        let font_data = std::fs::read(&config.font_path).map_err(|e| AnalysisError::Annotation {
            details: format!("Failed to read font file '{}': {}", config.font_path, e),
        })?;
        Self::from_font_data(font_data, config.font_size)
    }

    pub fn from_font_data(font_data: Vec<u8>, font_size: f32) -> Result<Self, AnalysisError> {
        let font = Font::try_from_vec(font_data).ok_or_else(|| AnalysisError::Annotation {
            details: "Failed to parse font data".to_string(),
        })?;
        Ok(Self {
            font,
            font_size: font_size.max(8.0),
        })
    }

    fn draw(&self, img: &mut RgbImage, overlay: &Overlay) {
        let scale = Scale::uniform(self.font_size);
        let line_height = (self.font_size * 1.3) as u32;
        let header_height = line_height + PADDING;

        shade(img, 0, 0, img.width(), header_height);
        let mut x = PADDING as i32;
        for (label, value) in &overlay.counters {
            let text = format!("{} {}", label, value);
            draw_text_mut(img, WHITE, x, (PADDING / 2) as i32, scale, &self.font, &text);
            let (text_width, _) = text_size(scale, &self.font, &text);
            x += text_width + 2 * PADDING as i32;
        }

        let status_scale = Scale::uniform(self.font_size * 0.7);
        let status_color = match overlay.accent {
            OverlayAccent::Neutral => WHITE,
            OverlayAccent::Good => GREEN,
            OverlayAccent::Bad => RED,
        };
        let mut y = header_height + PADDING / 2;
        for status in &overlay.status {
            draw_text_mut(
                img,
                status_color,
                PADDING as i32,
                y as i32,
                status_scale,
                &self.font,
                status,
            );
            y += (self.font_size * 0.9) as u32;
        }

        if let Some(feedback) = &overlay.feedback {
            let bar_height = line_height + PADDING;
            let bar_top = img.height().saturating_sub(bar_height);
            shade(img, 0, bar_top, img.width(), bar_height);
            draw_text_mut(
                img,
                YELLOW,
                PADDING as i32,
                (bar_top + PADDING / 2) as i32,
                scale,
                &self.font,
                feedback,
            );
        }
    }
}

#[cfg(feature = "overlay")]
impl Annotator for TextOverlayAnnotator {
    fn annotate(&self, frame: &FrameData, overlay: &Overlay) -> Result<FrameData, AnalysisError> {
        let mut img = decode_rgb(frame)?;
        self.draw(&mut img, overlay);
        let jpeg = encode_jpeg(img)?;
        Ok(frame.with_data(jpeg, FrameFormat::Mjpeg))
    }
}

/// Darken a rectangle so text drawn over it stays legible
#[cfg(feature = "overlay")]
fn shade(img: &mut RgbImage, x: u32, y: u32, width: u32, height: u32) {
    let x_end = x.saturating_add(width).min(img.width());
    let y_end = y.saturating_add(height).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            let pixel = img.get_pixel(px, py);
            img.put_pixel(px, py, Rgb([pixel[0] / 3, pixel[1] / 3, pixel[2] / 3]));
        }
    }
}

/// The text annotator when its font loads, otherwise passthrough
pub fn annotator_from_config(config: &OverlayConfig) -> Arc<dyn Annotator> {
    #[cfg(feature = "overlay")]
    {
        match TextOverlayAnnotator::new(config) {
            Ok(annotator) => {
                info!(
                    "Overlay text enabled (font: {}, size: {})",
                    config.font_path, config.font_size
                );
                return Arc::new(annotator);
            }
            Err(e) => warn!("{}; frames will not be annotated", e),
        }
    }

    #[cfg(not(feature = "overlay"))]
    {
        warn!(
            "Built without overlay support, ignoring font {}; frames will not be annotated",
            config.font_path
        );
    }

    Arc::new(PassthroughAnnotator)
}
