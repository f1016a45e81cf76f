//! Session Store.
//!
//! Holds what the scan and result screens share: the captured image, the
//! resolved location, the last diagnosis and whether an upload is running.
//! Created at start-up, closed at exit, never written to disk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::module::device::CapturedImage;
use crate::module::location::ResolvedLocation;
use crate::module::submit::{SubmissionError, SubmissionResult, Submitter};

/// Why a submission did not produce a result.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no image captured")]
    MissingImage,
    #[error("no location resolved")]
    MissingLocation,
    #[error("a submission is already in flight")]
    InFlight,
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

#[derive(Debug, Default)]
struct SessionState {
    image: Option<CapturedImage>,
    location: Option<ResolvedLocation>,
    result: Option<SubmissionResult>,
    submitted: Option<CapturedImage>,
}

pub struct Session {
    submitter: Arc<dyn Submitter>,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
}

/// Holds the in-flight flag for the duration of one submission.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Session {
    pub fn new(submitter: Arc<dyn Submitter>) -> Self {
        log::debug!("Session opened");
        Self {
            submitter,
            state: Mutex::new(SessionState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // The state is plain data, a panic elsewhere can't leave it half written.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the captured image.
    pub fn set_image(&self, image: CapturedImage) {
        self.state().image = Some(image);
    }

    /// Forget the captured image (the user removed it).
    pub fn clear_image(&self) {
        self.state().image = None;
    }

    pub fn image(&self) -> Option<CapturedImage> {
        self.state().image.clone()
    }

    pub fn set_location(&self, location: ResolvedLocation) {
        self.state().location = Some(location);
    }

    pub fn location(&self) -> Option<ResolvedLocation> {
        self.state().location.clone()
    }

    /// Last diagnosis, if any submission succeeded.
    pub fn result(&self) -> Option<SubmissionResult> {
        self.state().result.clone()
    }

    /// Image the last stored result belongs to.
    pub fn submitted_image(&self) -> Option<CapturedImage> {
        self.state().submitted.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Image and location present and nothing in flight.
    pub fn can_submit(&self) -> bool {
        let state = self.state();
        state.image.is_some() && state.location.is_some() && !self.is_in_flight()
    }

    /// Upload the current image and location.
    ///
    /// The result is stored only on success. The in-flight flag is set for the
    /// whole upload and cleared however it ends. A call made while another is
    /// running is rejected before any request goes out.
    ///
    /// Returns the uploaded image with its result; the session image may have
    /// been replaced while the upload was running.
    pub async fn submit(&self) -> Result<(CapturedImage, SubmissionResult), SessionError> {
        let (image, location) = {
            let state = self.state();
            let image = state.image.clone().ok_or(SessionError::MissingImage)?;
            let location = state.location.clone().ok_or(SessionError::MissingLocation)?;
            (image, location)
        };

        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or_else(|| {
            log::warn!("Submission rejected, another one is in flight");
            SessionError::InFlight
        })?;

        let result = match self.submitter.submit(&image, &location.display).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Error submitting plant data: {}", e);
                return Err(e.into());
            }
        };
        {
            let mut state = self.state();
            state.result = Some(result.clone());
            state.submitted = Some(image.clone());
        }
        Ok((image, result))
    }

    /// Tear the session down at application exit.
    pub fn close(self) {
        let state = self.state();
        log::debug!(
            "Session closed (image: {}, location: {}, result: {})",
            state.image.is_some(),
            state.location.is_some(),
            state.result.is_some()
        );
    }
}
