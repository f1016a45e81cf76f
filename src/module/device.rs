//! Provide Device Access.
//!
//! Permissions, the camera and the photo library. Every capture ends in a
//! `CapturedImage` that the session hands to the uploader.
pub mod camera;
pub mod library;
pub mod permission;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Reference to a single photograph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedImage {
    /// A file on the local file system.
    LocalFile(PathBuf),
    /// A URI handed over by another component (`file://`, `http://`, `https://`).
    Uri(String),
}

impl CapturedImage {
    /// Identifier handed to the result screen.
    pub fn reference(&self) -> String {
        match self {
            CapturedImage::LocalFile(path) => path.to_string_lossy().into_owned(),
            CapturedImage::Uri(uri) => uri.clone(),
        }
    }

    /// Lowercased file extension, if the reference has one.
    pub fn extension(&self) -> Option<String> {
        let name = match self {
            CapturedImage::LocalFile(path) => path.file_name()?.to_string_lossy().into_owned(),
            CapturedImage::Uri(uri) => {
                // Drop query and fragment, then keep the last path segment.
                let uri = uri.as_str();
                let path = uri.split(['?', '#']).next().unwrap_or(uri);
                path.rsplit('/').next().unwrap_or(path).to_string()
            }
        };
        let ext = Path::new(&name).extension()?.to_string_lossy().to_lowercase();
        match ext.is_empty() {
            true => None,
            false => Some(ext),
        }
    }
}

impl fmt::Display for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference())
    }
}

/// Capture failures. Neither touches the session.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture cancelled")]
    Cancelled,
    #[error("capture failed: {0}")]
    Failed(String),
}

/// Something that can take a picture.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn take_picture(&self) -> Result<CapturedImage, CaptureError>;
}

/// Lets the user accept or reject a fresh photograph.
#[async_trait]
pub trait Review: Send + Sync {
    async fn keep(&self, image: &CapturedImage) -> bool;
}

/// Accepts every photograph.
pub struct KeepAll;

#[async_trait]
impl Review for KeepAll {
    async fn keep(&self, _image: &CapturedImage) -> bool {
        true
    }
}

/// Media capture aggregator
///
pub struct MediaCapture {
    camera: Box<dyn Camera>,
    review: Box<dyn Review>,
    library: library::Library,
}

impl MediaCapture {
    pub fn new(
        camera: Box<dyn Camera>,
        review: Box<dyn Review>,
        library: library::Library,
    ) -> Self {
        Self {
            camera,
            review,
            library,
        }
    }

    /// Take a new photograph with the camera.
    ///
    /// A rejected photograph is deleted and reported as `Cancelled`.
    pub async fn capture_from_camera(&self) -> Result<CapturedImage, CaptureError> {
        let image = self.camera.take_picture().await?;
        if !self.review.keep(&image).await {
            discard(&image).await;
            return Err(CaptureError::Cancelled);
        }
        log::info!("Captured {} from camera", image);
        Ok(image)
    }

    /// Pick an existing photograph. `None` means the user backed out.
    pub async fn capture_from_library(
        &self,
        selection: Option<&str>,
    ) -> Result<CapturedImage, CaptureError> {
        let image = self.library.pick(selection)?;
        log::info!("Picked {} from library", image);
        Ok(image)
    }

    /// Images available in the library, sorted by path.
    pub fn list_library(&self) -> Result<Vec<PathBuf>, CaptureError> {
        self.library
            .list()
            .map_err(|e| CaptureError::Failed(format!("Can't read library: {}", e)))
    }
}

/// Remove a rejected photograph from disk. Only local files are ours to delete.
async fn discard(image: &CapturedImage) {
    if let CapturedImage::LocalFile(path) = image {
        match tokio::fs::remove_file(path).await {
            Ok(()) => log::info!("Discarded {}", image),
            Err(e) => log::warn!("Can't remove {}: {}", image, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Writes a file and hands it out as the photograph.
    struct FileCamera(PathBuf);

    #[async_trait]
    impl Camera for FileCamera {
        async fn take_picture(&self) -> Result<CapturedImage, CaptureError> {
            fs::write(&self.0, b"jpeg").map_err(|e| CaptureError::Failed(e.to_string()))?;
            Ok(CapturedImage::LocalFile(self.0.clone()))
        }
    }

    struct Answer(bool);

    #[async_trait]
    impl Review for Answer {
        async fn keep(&self, _image: &CapturedImage) -> bool {
            self.0
        }
    }

    struct CancelledCamera;

    #[async_trait]
    impl Camera for CancelledCamera {
        async fn take_picture(&self) -> Result<CapturedImage, CaptureError> {
            Err(CaptureError::Cancelled)
        }
    }

    #[test]
    fn extension_of_local_file() {
        let image = CapturedImage::LocalFile(PathBuf::from("/data/img/Leaf.JPG"));
        assert_eq!(image.extension(), Some("jpg".to_string()));
        let image = CapturedImage::LocalFile(PathBuf::from("/data/img/leaf"));
        assert_eq!(image.extension(), None);
    }

    #[test]
    fn extension_of_uri_ignores_query() {
        let image = CapturedImage::Uri("https://cdn.example.com/a/leaf.png?size=large".to_string());
        assert_eq!(image.extension(), Some("png".to_string()));
        let image = CapturedImage::Uri("file:///var/mobile/photo.heic#x".to_string());
        assert_eq!(image.extension(), Some("heic".to_string()));
        let image = CapturedImage::Uri("https://cdn.example.com/".to_string());
        assert_eq!(image.extension(), None);
    }

    #[test]
    fn reference_is_path_or_uri() {
        let image = CapturedImage::LocalFile(PathBuf::from("/tmp/a.jpg"));
        assert_eq!(image.reference(), "/tmp/a.jpg");
        assert_eq!(
            CapturedImage::Uri("file:///tmp/a.jpg".to_string()).to_string(),
            "file:///tmp/a.jpg"
        );
    }

    #[tokio::test]
    async fn camera_cancel_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let capture = MediaCapture::new(
            Box::new(CancelledCamera),
            Box::new(KeepAll),
            library::Library::new(tmp.path().to_path_buf()),
        );
        assert!(matches!(
            capture.capture_from_camera().await,
            Err(CaptureError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn rejected_photo_is_deleted_and_cancelled() {
        let tmp = tempfile::tempdir().unwrap();
        let shot = tmp.path().join("scan_1.jpg");
        let capture = MediaCapture::new(
            Box::new(FileCamera(shot.clone())),
            Box::new(Answer(false)),
            library::Library::new(tmp.path().to_path_buf()),
        );

        assert!(matches!(
            capture.capture_from_camera().await,
            Err(CaptureError::Cancelled)
        ));
        assert!(!shot.exists());
    }

    #[tokio::test]
    async fn accepted_photo_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let shot = tmp.path().join("scan_1.jpg");
        let capture = MediaCapture::new(
            Box::new(FileCamera(shot.clone())),
            Box::new(Answer(true)),
            library::Library::new(tmp.path().to_path_buf()),
        );

        let image = capture.capture_from_camera().await.unwrap();
        assert_eq!(image, CapturedImage::LocalFile(shot.clone()));
        assert!(shot.exists());
    }

    #[tokio::test]
    async fn library_capture_goes_through_aggregator() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("leaf.jpg"), b"jpeg").unwrap();
        let capture = MediaCapture::new(
            Box::new(CancelledCamera),
            Box::new(KeepAll),
            library::Library::new(tmp.path().to_path_buf()),
        );

        let image = capture.capture_from_library(Some("leaf.jpg")).await.unwrap();
        assert_eq!(image, CapturedImage::LocalFile(tmp.path().join("leaf.jpg")));
        assert_eq!(capture.list_library().unwrap().len(), 1);
    }
}
