use super::source::SourceFactory;
#[cfg(all(feature = "camera", target_os = "linux"))]
use super::source::VideoSource;
use crate::config::CameraConfig;
use crate::error::CameraError;
#[cfg(all(feature = "camera", target_os = "linux"))]
use crate::frame::{FrameData, FrameFormat};
#[cfg(all(feature = "camera", target_os = "linux"))]
use std::sync::Arc;
#[cfg(all(feature = "camera", target_os = "linux"))]
use std::time::SystemTime;
#[cfg(all(feature = "camera", target_os = "linux"))]
use tracing::{debug, info, trace, warn};

#[cfg(all(feature = "camera", target_os = "linux"))]
use gstreamer::prelude::*;
#[cfg(all(feature = "camera", target_os = "linux"))]
use gstreamer::Pipeline;
#[cfg(all(feature = "camera", target_os = "linux"))]
use gstreamer_app::AppSink;
#[cfg(all(feature = "camera", target_os = "linux"))]
use gstreamer_video::VideoInfo;

/// How long a single `read` waits for the next sample
#[cfg(all(feature = "camera", target_os = "linux"))]
const PULL_TIMEOUT_MS: u64 = 100;

/// GStreamer launch line for the configured V4L2 device.
///
/// `MJPG` keeps the camera's JPEG frames as-is; any other format is
/// converted to packed RGB.
pub fn pipeline_description(config: &CameraConfig) -> String {
    let (width, height) = config.resolution;
    let source = format!(
        "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true",
        config.index
    );
    let sink = "appsink name=sink sync=false max-buffers=2 drop=true qos=false enable-last-sample=false emit-signals=false";

    if config.format.eq_ignore_ascii_case("MJPG") {
        format!(
            "{} ! image/jpeg,width={},height={},framerate={}/1 ! queue max-size-buffers=4 leaky=downstream ! {}",
            source, width, height, config.fps, sink
        )
    } else {
        format!(
            "{} ! video/x-raw,width={},height={},framerate={}/1 ! videoconvert ! video/x-raw,format=RGB ! queue max-size-buffers=4 leaky=downstream ! {}",
            source, width, height, config.fps, sink
        )
    }
}

/// V4L2 camera read through a GStreamer appsink
#[cfg(all(feature = "camera", target_os = "linux"))]
pub struct GstVideoSource {
    config: CameraConfig,
    pipeline: Option<Pipeline>,
    appsink: Option<AppSink>,
    frame_format: FrameFormat,
    frame_counter: u64,
}

#[cfg(all(feature = "camera", target_os = "linux"))]
impl GstVideoSource {
    pub fn new(config: CameraConfig) -> Self {
        let frame_format = if config.format.eq_ignore_ascii_case("MJPG") {
            FrameFormat::Mjpeg
        } else {
            FrameFormat::Rgb24
        };
        Self {
            config,
            pipeline: None,
            appsink: None,
            frame_format,
            frame_counter: 0,
        }
    }

    fn build_pipeline(&self) -> Result<(Pipeline, AppSink), CameraError> {
        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let description = pipeline_description(&self.config);
        info!("Creating GStreamer pipeline: {}", description);

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Configuration {
                details: "Pipeline has no appsink".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        Ok((pipeline, appsink))
    }

    fn frame_from_sample(&mut self, sample: gstreamer::Sample) -> Result<FrameData, CameraError> {
        let buffer = sample.buffer().ok_or_else(|| CameraError::CaptureStream {
            details: "No buffer in sample".to_string(),
        })?;

        let caps = sample.caps().ok_or_else(|| CameraError::CaptureStream {
            details: "No caps in sample".to_string(),
        })?;

        let (width, height) = match self.frame_format {
            FrameFormat::Mjpeg => {
                let structure = caps.structure(0).ok_or_else(|| CameraError::CaptureStream {
                    details: "Empty caps in sample".to_string(),
                })?;
                let width = structure.get::<i32>("width").unwrap_or(self.config.resolution.0 as i32);
                let height = structure.get::<i32>("height").unwrap_or(self.config.resolution.1 as i32);
                (width.max(0) as u32, height.max(0) as u32)
            }
            FrameFormat::Rgb24 => {
                let info = VideoInfo::from_caps(caps).map_err(|e| CameraError::CaptureStream {
                    details: format!("Failed to get video info: {}", e),
                })?;
                (info.width(), info.height())
            }
        };

        let map = buffer.map_readable().map_err(|e| CameraError::CaptureStream {
            details: format!("Failed to map buffer: {}", e),
        })?;

        let frame_id = self.frame_counter;
        self.frame_counter += 1;

        trace!(
            "Captured frame {} ({}x{}, {} bytes)",
            frame_id,
            width,
            height,
            map.len()
        );

        Ok(FrameData::new(
            frame_id,
            SystemTime::now(),
            map.as_slice().to_vec(),
            width,
            height,
            self.frame_format,
        ))
    }
}

#[cfg(all(feature = "camera", target_os = "linux"))]
impl VideoSource for GstVideoSource {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.is_open() {
            return Ok(());
        }

        let (pipeline, appsink) = self.build_pipeline()?;
        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(CameraError::DeviceOpen {
                device: self.config.index,
                details: e.to_string(),
            });
        }

        info!(
            "Camera /dev/video{} opened ({}x{} @ {}fps, {})",
            self.config.index,
            self.config.resolution.0,
            self.config.resolution.1,
            self.config.fps,
            self.config.format
        );
        self.pipeline = Some(pipeline);
        self.appsink = Some(appsink);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.pipeline.is_some()
    }

    fn read(&mut self) -> Result<Option<FrameData>, CameraError> {
        let Some(appsink) = self.appsink.clone() else {
            return Err(CameraError::CaptureStream {
                details: "Camera is not open".to_string(),
            });
        };

        match appsink.try_pull_sample(gstreamer::ClockTime::from_mseconds(PULL_TIMEOUT_MS)) {
            Some(sample) => self.frame_from_sample(sample).map(Some),
            None if appsink.is_eos() => Err(CameraError::CaptureStream {
                details: "Camera stream ended".to_string(),
            }),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.appsink = None;
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                warn!("Failed to stop camera pipeline: {}", e);
            }
            debug!(
                "Camera /dev/video{} closed after {} frames",
                self.config.index, self.frame_counter
            );
        }
    }
}

#[cfg(all(feature = "camera", target_os = "linux"))]
impl Drop for GstVideoSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Factory for the configured hardware camera
#[cfg(all(feature = "camera", target_os = "linux"))]
pub fn camera_source_factory(config: &CameraConfig) -> Result<SourceFactory, CameraError> {
    let config = config.clone();
    Ok(Arc::new(move || {
        Box::new(GstVideoSource::new(config.clone())) as Box<dyn VideoSource>
    }))
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
pub fn camera_source_factory(config: &CameraConfig) -> Result<SourceFactory, CameraError> {
    Err(CameraError::DeviceOpen {
        device: config.index,
        details: "built without GStreamer camera support".to_string(),
    })
}
