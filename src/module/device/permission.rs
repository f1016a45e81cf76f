//! Permission Gate.
//!
//! Asks the platform for camera, media library and location access. A denial
//! is a normal answer, the caller decides whether to ask again.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::module::util::init::AppProperty;

/// Platform permissions the client asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Camera,
    MediaLibrary,
    Location,
}

/// Answer to a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

/// Outcome of `PermissionGate::ensure_permissions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionReport {
    pub camera: PermissionStatus,
    pub media_library: PermissionStatus,
    pub location: PermissionStatus,
}

impl PermissionReport {
    /// Both capture permissions granted. Otherwise the scan screen warns the user.
    pub fn capture_granted(&self) -> bool {
        self.camera.is_granted() && self.media_library.is_granted()
    }

    pub fn all_granted(&self) -> bool {
        self.capture_granted() && self.location.is_granted()
    }
}

/// Platform seam for permission prompts.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn request(&self, permission: Permission) -> PermissionStatus;
}

/// Requests all permissions the scan flow needs.
#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self { provider }
    }

    /// Request camera, media library and location access in turn.
    pub async fn ensure_permissions(&self) -> PermissionReport {
        let report = PermissionReport {
            camera: self.provider.request(Permission::Camera).await,
            media_library: self.provider.request(Permission::MediaLibrary).await,
            location: self.provider.request(Permission::Location).await,
        };
        log::info!("Permissions: {:?}", report);
        report
    }
}

/// Permissions of a Linux device.
///
/// Camera access means the device node opens for reading, library access means
/// the library directory can be listed, location access is the user's setting.
#[derive(Debug, Clone)]
pub struct DevicePermissions {
    camera_device: PathBuf,
    library_dir: PathBuf,
    location_enabled: bool,
}

impl DevicePermissions {
    pub fn new(camera_device: PathBuf, library_dir: PathBuf, location_enabled: bool) -> Self {
        Self {
            camera_device,
            library_dir,
            location_enabled,
        }
    }

    pub fn from_property(property: &AppProperty) -> Self {
        Self::new(
            PathBuf::from(&property.conf.camera.device),
            PathBuf::from(&property.path.dir.img),
            property.conf.location.enabled,
        )
    }
}

#[async_trait]
impl PermissionProvider for DevicePermissions {
    async fn request(&self, permission: Permission) -> PermissionStatus {
        let granted = match permission {
            Permission::Camera => tokio::fs::OpenOptions::new()
                .read(true)
                .open(&self.camera_device)
                .await
                .is_ok(),
            Permission::MediaLibrary => tokio::fs::read_dir(&self.library_dir).await.is_ok(),
            Permission::Location => self.location_enabled,
        };
        match granted {
            true => PermissionStatus::Granted,
            false => {
                log::warn!("{:?} permission denied", permission);
                PermissionStatus::Denied
            }
        }
    }
}
