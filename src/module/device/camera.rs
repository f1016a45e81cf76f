//! Camera Functions
//!

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rscam::{Camera, Config};

use super::{CaptureError, CapturedImage};
use crate::module::define;
use crate::module::util::init::AppProperty;

/// Represents a V4L2 camera configuration and capture functionality.
///
/// The device is opened per capture, so nothing is held between shots.
pub struct V4l2Camera {
    device: String,         // Device node, e.g. /dev/video0.
    resolution: (u32, u32), // Width and height of a frame.
    grab_times: u8,         // Grabs per capture, the last one is kept.
    dir: PathBuf,           // Where pictures are written.
}

impl V4l2Camera {
    /// Creates a new V4L2 camera from the application properties.
    ///
    /// # Arguments
    ///
    /// * `property` - The camera configuration properties.
    ///
    pub fn new(property: &AppProperty) -> Self {
        let camera = &property.conf.camera;
        Self {
            device: camera.device.clone(),
            resolution: (camera.width as u32, camera.height as u32),
            grab_times: camera.grab_times,
            dir: PathBuf::from(&property.path.dir.img),
        }
    }
}

#[async_trait]
impl super::Camera for V4l2Camera {
    /// Captures a frame from the camera and saves it into the library.
    async fn take_picture(&self) -> Result<CapturedImage, CaptureError> {
        let device = self.device.clone();
        let resolution = self.resolution;
        let grab_times = self.grab_times;
        let path = self.dir.join(capture_file_name(chrono::Local::now()));

        let target = path.clone();
        tokio::task::spawn_blocking(move || grab(&device, resolution, grab_times, &target))
            .await
            .map_err(|e| CaptureError::Failed(format!("Camera task failed: {}", e)))??;
        Ok(CapturedImage::LocalFile(path))
    }
}

/// Open the device, grab frames and write the last one to `path`.
fn grab(
    device: &str,
    resolution: (u32, u32),
    grab_times: u8,
    path: &Path,
) -> Result<(), CaptureError> {
    let mut cap = Camera::new(device)
        .map_err(|e| CaptureError::Failed(format!("Can't open {}: {}", device, e)))?;

    cap.start(&Config {
        interval: (1, 30), // 30 fps.
        resolution,
        format: b"MJPG",
        nbuffers: 1,
        ..Default::default()
    })
    .map_err(|e| CaptureError::Failed(format!("Can't start {}: {:?}", device, e)))?;

    // Stale frames are queued in the driver, throw them away.
    for _ in 1..grab_times.max(1) {
        let _ = cap.capture();
    }
    let frame = cap
        .capture()
        .map_err(|e| CaptureError::Failed(format!("Can't capture: {}", e)))?;

    fs::write(path, &frame[..])
        .map_err(|e| CaptureError::Failed(format!("Can't save {}: {}", path.display(), e)))?;
    log::debug!("Frame of {} bytes written to {}", frame.len(), path.display());
    Ok(())
}

/// File name for a new capture, `scan_<YYYYmmddHHMMSS>_<uuid>.jpg`.
pub fn capture_file_name<Tz: chrono::TimeZone>(now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_{}_{}.jpg",
        define::path::CAPTURE_PREFIX,
        now.format("%Y%m%d%H%M%S"),
        uuid::Uuid::new_v4().simple()
    )
}
