//! Scan Flow.
//!
//! What the scan screen does: ask for permissions, locate the device while the
//! user takes or picks a photograph, upload both and move on to the result.

use std::sync::Arc;

use thiserror::Error;

use crate::module::device::permission::{PermissionGate, PermissionReport};
use crate::module::device::{CaptureError, CapturedImage, MediaCapture};
use crate::module::location::{LocationError, LocationResolver, ResolvedLocation};
use crate::module::session::{Session, SessionError};
use crate::module::submit::SubmissionResult;

/// Where the photograph comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Camera,
    /// Library selection, `None` when the user backed out of the picker.
    Library(Option<String>),
}

/// Hand-off to the result screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRoute {
    /// Reference of the image the diagnosis belongs to.
    pub image_uri: String,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl FlowError {
    /// Text shown to the user. Every case can be retried.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Capture(CaptureError::Cancelled) => "Capture cancelled.".to_string(),
            FlowError::Capture(CaptureError::Failed(e)) => {
                format!("Couldn't get the image ({}). Please try again.", e)
            }
            FlowError::Location(LocationError::PermissionDenied) => {
                "Location permission is required. Enable it and retry.".to_string()
            }
            FlowError::Location(LocationError::Unavailable(e)) => format!(
                "Couldn't determine your location ({}). Retry or enter it manually.",
                e
            ),
            FlowError::Session(SessionError::MissingImage) => {
                "No Image: please select or capture an image first.".to_string()
            }
            FlowError::Session(SessionError::MissingLocation) => {
                "No Location: retry locating or enter it manually.".to_string()
            }
            FlowError::Session(SessionError::InFlight) => {
                "An analysis is already running.".to_string()
            }
            FlowError::Session(SessionError::Submission(e)) => {
                format!("Analysis failed ({}). Please try again.", e)
            }
        }
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, FlowError::Capture(CaptureError::Cancelled))
    }
}

pub struct ScanFlow {
    gate: PermissionGate,
    resolver: LocationResolver,
    capture: MediaCapture,
    session: Arc<Session>,
}

impl ScanFlow {
    pub fn new(
        gate: PermissionGate,
        resolver: LocationResolver,
        capture: MediaCapture,
        session: Arc<Session>,
    ) -> Self {
        Self {
            gate,
            resolver,
            capture,
            session,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn media(&self) -> &MediaCapture {
        &self.capture
    }

    /// Ask for every permission; missing capture access is only a warning.
    pub async fn prepare(&self) -> PermissionReport {
        let report = self.gate.ensure_permissions().await;
        if !report.capture_granted() {
            log::warn!(
                "Permissions Required: please grant camera and media library permissions to use this feature."
            );
        }
        report
    }

    /// Resolve the device location and keep it in the session.
    pub async fn locate(&self) -> Result<ResolvedLocation, FlowError> {
        let location = self.resolver.resolve_location().await.map_err(|e| {
            log::warn!("Location failed: {}", e);
            e
        })?;
        self.session.set_location(location.clone());
        Ok(location)
    }

    /// Use a location typed in by the user.
    pub fn use_location(&self, display: &str) -> ResolvedLocation {
        let location = ResolvedLocation::manual(display.trim());
        self.session.set_location(location.clone());
        location
    }

    /// Take or pick a photograph and keep it in the session.
    pub async fn capture(&self, source: &Source) -> Result<CapturedImage, FlowError> {
        let image = match source {
            Source::Camera => self.capture.capture_from_camera().await,
            Source::Library(selection) => {
                self.capture
                    .capture_from_library(selection.as_deref())
                    .await
            }
        };
        let image = match image {
            Ok(image) => image,
            Err(CaptureError::Cancelled) => {
                log::info!("Capture cancelled");
                return Err(CaptureError::Cancelled.into());
            }
            Err(e) => {
                log::warn!("{}", e);
                return Err(e.into());
            }
        };
        self.session.set_image(image.clone());
        Ok(image)
    }

    /// Locate and capture concurrently.
    pub async fn locate_and_capture(
        &self,
        source: &Source,
    ) -> (
        Result<ResolvedLocation, FlowError>,
        Result<CapturedImage, FlowError>,
    ) {
        futures::join!(self.locate(), self.capture(source))
    }

    /// Upload the session's image and location. On success the result screen
    /// is shown for the uploaded image, even if a newer one was captured since.
    pub async fn analyze(&self) -> Result<(ResultRoute, SubmissionResult), FlowError> {
        let (image, result) = self.session.submit().await?;
        let route = ResultRoute {
            image_uri: image.reference(),
        };
        Ok((route, result))
    }
}
