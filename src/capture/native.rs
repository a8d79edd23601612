//! Webcam capture using nokhwa
//!
//! The device is driven from a dedicated thread that keeps only the most
//! recent decoded frame, so `read_frame` never waits on the hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution as DeviceResolution,
};
use parking_lot::Mutex;

use super::traits::{Camera, CameraError, CameraFactory, CameraInfo, Resolution};
use crate::video::{VideoFrame, VideoParams};

/// Default time allowed for a device to deliver its format
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens physical webcams
#[derive(Debug, Clone)]
pub struct NativeCameraFactory {
    startup_timeout: Duration,
}

impl Default for NativeCameraFactory {
    fn default() -> Self {
        Self::new(DEFAULT_STARTUP_TIMEOUT)
    }
}

impl NativeCameraFactory {
    pub fn new(startup_timeout: Duration) -> Self {
        Self { startup_timeout }
    }
}

impl CameraFactory for NativeCameraFactory {
    fn open(&self, index: u32, requested: VideoParams) -> Result<Box<dyn Camera>, CameraError> {
        NativeCamera::open(index, requested, self.startup_timeout)
            .map(|c| Box::new(c) as Box<dyn Camera>)
    }

    fn list(&self) -> Vec<CameraInfo> {
        match nokhwa::query(ApiBackend::Auto) {
            Ok(cameras) => cameras
                .into_iter()
                .map(|info| {
                    let id = match info.index() {
                        CameraIndex::Index(i) => i.to_string(),
                        CameraIndex::String(s) => s.to_string(),
                    };
                    CameraInfo {
                        id,
                        name: info.human_name().to_string(),
                        supported_resolutions: vec![
                            Resolution { width: 1920, height: 1080 },
                            Resolution { width: 1280, height: 720 },
                            Resolution { width: 640, height: 480 },
                        ],
                    }
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate cameras: {:?}", e);
                Vec::new()
            }
        }
    }
}

/// A running webcam
pub struct NativeCamera {
    params: VideoParams,
    latest: Arc<Mutex<Option<VideoFrame>>>,
    running: Arc<AtomicBool>,
    capture_thread: Option<JoinHandle<()>>,
}

impl NativeCamera {
    fn open(
        index: u32,
        requested: VideoParams,
        startup_timeout: Duration,
    ) -> Result<Self, CameraError> {
        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<VideoParams, String>>();

        let thread_latest = latest.clone();
        let thread_running = running.clone();
        let handle = std::thread::spawn(move || {
            let wanted = CameraFormat::new(
                DeviceResolution::new(requested.width, requested.height),
                FrameFormat::MJPEG,
                requested.fps.round() as u32,
            );
            let format =
                RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(wanted));

            let mut camera = match nokhwa::Camera::new(CameraIndex::Index(index), format) {
                Ok(c) => c,
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("{:?}", e)));
                    return;
                }
            };

            if let Err(e) = camera.open_stream() {
                let _ = ready_tx.send(Err(format!("{:?}", e)));
                return;
            }

            let camera_format = camera.camera_format();
            let fps = f64::from(camera_format.frame_rate());
            tracing::info!(
                "Webcam {} opened: {}x{} @ {}fps, format={:?} (requested {}x{} @ {}fps)",
                index,
                camera_format.resolution().width(),
                camera_format.resolution().height(),
                fps,
                camera_format.format(),
                requested.width,
                requested.height,
                requested.fps
            );

            // Ready is signalled with the first decoded frame, so readers never see an empty slot.
            let mut ready = Some(ready_tx);
            while thread_running.load(Ordering::SeqCst) {
                match camera.frame().and_then(|buffer| buffer.decode_image::<RgbAFormat>()) {
                    Ok(image) => {
                        let (width, height) = (image.width(), image.height());
                        *thread_latest.lock() = Some(VideoFrame {
                            width,
                            height,
                            data: image.into_raw(),
                        });
                        if let Some(tx) = ready.take() {
                            if tx.send(Ok(VideoParams::new(width, height, fps))).is_err() {
                                // Opener gave up waiting.
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Failed to capture frame: {:?}", e);
                    }
                }
            }

            if let Err(e) = camera.stop_stream() {
                tracing::warn!("Error stopping camera stream: {:?}", e);
            }
            tracing::info!("Webcam {} capture thread stopped", index);
        });

        match ready_rx.recv_timeout(startup_timeout) {
            Ok(Ok(params)) => Ok(Self {
                params,
                latest,
                running,
                capture_thread: Some(handle),
            }),
            Ok(Err(reason)) => {
                let _ = handle.join();
                Err(CameraError::Open { index, reason })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                Err(CameraError::Open {
                    index,
                    reason: "capture thread exited".to_string(),
                })
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // Detached: the thread exits once the device answers or fails.
                running.store(false, Ordering::SeqCst);
                Err(CameraError::StartupTimeout(startup_timeout.as_millis() as u64))
            }
        }
    }
}

impl Camera for NativeCamera {
    fn params(&self) -> VideoParams {
        self.params
    }

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        if self.capture_thread.is_none() {
            return Err(CameraError::Released);
        }
        if self.capture_thread.as_ref().is_some_and(|h| h.is_finished()) {
            return Err(CameraError::Read("capture thread stopped".to_string()));
        }
        self.latest
            .lock()
            .clone()
            .ok_or_else(|| CameraError::Read("no frame captured yet".to_string()))
    }

    fn release(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for NativeCamera {
    fn drop(&mut self) {
        self.release();
    }
}
