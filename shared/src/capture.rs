//! Camera and file capture.
//!
//! [`CaptureController`] owns the camera lifecycle. The platform is reached
//! only through [`MediaDevices`] (stream acquisition) and [`CameraFeed`] (a
//! live stream bound to its preview surface), so the same state machine runs
//! in the browser and under test.

use crate::payload::{ImagePayload, JPEG_QUALITY};
use async_trait::async_trait;
use derive_more::{Display, From};
use std::cell::RefCell;
use std::rc::Rc;
use strum_macros::AsRefStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Camera permission denied")]
    PermissionDenied,
    #[error("No camera found")]
    NotFound,
    #[error("Camera is in use by another application")]
    InUse,
    #[error("Camera access requires a secure context")]
    InsecureContext,
    #[error("Camera API is not supported")]
    Unsupported,
    #[error("Camera constraints cannot be satisfied")]
    Overconstrained,
    #[error("Video playback failed: {0}")]
    Playback(String),
    #[error("Frame encoding failed: {0}")]
    Encoding(String),
    #[error("Camera error: {0}")]
    Other(String),
}

impl DeviceError {
    /// Maps a `DOMException` name raised by `getUserMedia` or playback.
    pub fn from_dom_exception(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => DeviceError::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" => DeviceError::NotFound,
            "NotReadableError" | "TrackStartError" | "AbortError" => DeviceError::InUse,
            "SecurityError" => DeviceError::InsecureContext,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => DeviceError::Overconstrained,
            "NotSupportedError" | "TypeError" => DeviceError::Unsupported,
            _ if message.is_empty() => DeviceError::Other(name.to_string()),
            _ => DeviceError::Other(message.to_string()),
        }
    }

    /// Text shown next to the camera controls.
    pub fn user_message(&self) -> String {
        match self {
            DeviceError::PermissionDenied => {
                "Camera access was denied. Allow camera access in your browser settings, or upload a photo instead.".to_string()
            }
            DeviceError::NotFound => {
                "No camera was found on this device. Upload a photo instead.".to_string()
            }
            DeviceError::InUse => {
                "The camera is being used by another application. Close it and try again.".to_string()
            }
            DeviceError::InsecureContext => {
                "Camera access requires a secure (HTTPS) connection.".to_string()
            }
            DeviceError::Unsupported => {
                "This browser does not support camera capture. Upload a photo instead.".to_string()
            }
            DeviceError::Overconstrained => {
                "No camera matches the requested settings.".to_string()
            }
            DeviceError::Playback(detail) => format!("Could not start the camera preview: {}", detail),
            DeviceError::Encoding(detail) => format!("Could not capture the photo: {}", detail),
            DeviceError::Other(detail) => format!("Unable to access the camera: {}", detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    Environment,
    /// No facing preference; whatever the platform picks.
    Any,
}

impl FacingMode {
    pub fn as_constraint(self) -> Option<&'static str> {
        match self {
            FacingMode::Environment => Some("environment"),
            FacingMode::Any => None,
        }
    }
}

/// Video-only acquisition hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl VideoConstraints {
    pub fn preferred() -> Self {
        Self {
            facing: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }

    pub fn with_facing(self, facing: FacingMode) -> Self {
        Self { facing, ..self }
    }
}

#[async_trait(?Send)]
pub trait MediaDevices {
    type Feed: CameraFeed;

    async fn open(&self, constraints: VideoConstraints) -> Result<Self::Feed, DeviceError>;
}

/// A live camera stream bound to a preview surface.
#[async_trait(?Send)]
pub trait CameraFeed {
    async fn play(&self) -> Result<(), DeviceError>;

    /// Native size of the frames currently being rendered, `None` until the
    /// surface has a frame.
    fn frame_size(&self) -> Option<(u32, u32)>;

    async fn encode_frame(&self, quality: f64) -> Result<ImagePayload, DeviceError>;

    /// Stops every track and detaches the preview. Called exactly once per
    /// feed by the controller.
    fn stop(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, AsRefStr)]
pub enum CameraState {
    Idle,
    RequestingCamera,
    CameraActive,
    Error(DeviceError),
}

/// How the most recent capture attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    FrameCaptured,
    Cancelled,
    Failed,
    FileSelected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, From)]
#[display(fmt = "camera session #{}", _0)]
pub struct SessionId(u64);

struct CameraSession<F> {
    id: SessionId,
    feed: Rc<F>,
    facing: FacingMode,
}

struct Inner<F> {
    state: CameraState,
    session: Option<CameraSession<F>>,
    pending: Option<SessionId>,
    sessions_started: u64,
    last_outcome: Option<CaptureOutcome>,
}

/// Produces at most one [`ImagePayload`] per capture, from the camera or a
/// chosen file. Clones share the same state.
pub struct CaptureController<D: MediaDevices> {
    devices: Rc<D>,
    inner: Rc<RefCell<Inner<D::Feed>>>,
}

impl<D: MediaDevices> Clone for CaptureController<D> {
    fn clone(&self) -> Self {
        Self {
            devices: Rc::clone(&self.devices),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: MediaDevices> CaptureController<D> {
    pub fn new(devices: D) -> Self {
        Self {
            devices: Rc::new(devices),
            inner: Rc::new(RefCell::new(Inner {
                state: CameraState::Idle,
                session: None,
                pending: None,
                sessions_started: 0,
                last_outcome: None,
            })),
        }
    }

    pub fn devices(&self) -> &D {
        &self.devices
    }

    pub fn state(&self) -> CameraState {
        self.inner.borrow().state.clone()
    }

    pub fn last_outcome(&self) -> Option<CaptureOutcome> {
        self.inner.borrow().last_outcome
    }

    pub fn is_streaming(&self) -> bool {
        self.inner.borrow().session.is_some()
    }

    pub fn facing_mode(&self) -> Option<FacingMode> {
        self.inner.borrow().session.as_ref().map(|s| s.facing)
    }

    /// Requests the camera, preferring the environment-facing one. A call
    /// while a request is pending or a stream is live does nothing.
    ///
    /// Returns the acquisition error when the controller ended in
    /// [`CameraState::Error`].
    pub async fn start_camera(&self) -> Result<(), DeviceError> {
        let id = {
            let mut inner = self.inner.borrow_mut();
            if matches!(
                inner.state,
                CameraState::RequestingCamera | CameraState::CameraActive
            ) {
                log::debug!("Ignoring camera start while {}", inner.state.as_ref());
                return Ok(());
            }
            inner.sessions_started += 1;
            let id = SessionId::from(inner.sessions_started);
            inner.pending = Some(id);
            inner.state = CameraState::RequestingCamera;
            id
        };
        log::info!("Requesting camera for {}", id);

        let preferred = VideoConstraints::preferred();
        let opened = match self.devices.open(preferred).await {
            Ok(feed) => Ok((feed, FacingMode::Environment)),
            Err(err) => {
                if !self.is_pending(id) {
                    return Ok(());
                }
                log::warn!(
                    "Environment camera unavailable for {} ({}), retrying with any camera",
                    id,
                    err
                );
                self.devices
                    .open(preferred.with_facing(FacingMode::Any))
                    .await
                    .map(|feed| (feed, FacingMode::Any))
            }
        };

        let (feed, facing) = match opened {
            Ok(opened) => opened,
            Err(err) => return self.fail(id, err),
        };

        if !self.is_pending(id) {
            log::info!("{} was cancelled during acquisition, releasing stream", id);
            feed.stop();
            return Ok(());
        }

        let feed = Rc::new(feed);
        if let Err(err) = feed.play().await {
            feed.stop();
            return self.fail(id, err);
        }

        if !self.is_pending(id) {
            log::info!("{} was cancelled before playback started, releasing stream", id);
            feed.stop();
            return Ok(());
        }

        let mut inner = self.inner.borrow_mut();
        inner.pending = None;
        inner.session = Some(CameraSession { id, feed, facing });
        inner.state = CameraState::CameraActive;
        log::info!("{} active ({:?} facing)", id, facing);
        Ok(())
    }

    /// Releases the camera and returns to `Idle`. Safe to call in any state.
    pub fn stop_camera(&self) {
        if self.release(CaptureOutcome::Cancelled) {
            log::info!("Camera stopped");
        }
    }

    /// Grabs the current frame as a JPEG and releases the camera. Returns
    /// `None` without side effects when no frame can be taken.
    pub async fn capture_photo(&self) -> Option<ImagePayload> {
        let (id, feed) = {
            let inner = self.inner.borrow();
            match (&inner.state, &inner.session) {
                (CameraState::CameraActive, Some(session)) => (session.id, Rc::clone(&session.feed)),
                _ => {
                    log::debug!("Ignoring capture: camera is {}", inner.state.as_ref());
                    return None;
                }
            }
        };

        let Some((width, height)) = feed.frame_size() else {
            log::debug!("Ignoring capture: {} has no frame yet", id);
            return None;
        };

        let payload = match feed.encode_frame(JPEG_QUALITY).await {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("Failed to capture frame from {}: {}", id, err);
                return None;
            }
        };

        if self.active_session() != Some(id) {
            log::info!("{} ended while encoding, discarding frame", id);
            return None;
        }

        self.release(CaptureOutcome::FrameCaptured);
        log::info!(
            "Captured {}x{} frame from {} ({} bytes)",
            width,
            height,
            id,
            payload.len()
        );
        Some(payload)
    }

    /// Wraps a user-chosen file. Does not touch the camera.
    pub fn select_file(&self, bytes: Vec<u8>, declared_mime: &str) -> ImagePayload {
        let payload = ImagePayload::from_file(bytes, declared_mime);
        log::info!(
            "Selected file {} ({}, {} bytes)",
            payload.id(),
            payload.mime_type(),
            payload.len()
        );
        self.inner.borrow_mut().last_outcome = Some(CaptureOutcome::FileSelected);
        payload
    }

    fn is_pending(&self, id: SessionId) -> bool {
        self.inner.borrow().pending == Some(id)
    }

    fn active_session(&self) -> Option<SessionId> {
        self.inner.borrow().session.as_ref().map(|s| s.id)
    }

    fn fail(&self, id: SessionId, err: DeviceError) -> Result<(), DeviceError> {
        let mut inner = self.inner.borrow_mut();
        if inner.pending != Some(id) {
            return Ok(());
        }
        log::error!("Camera acquisition failed for {}: {}", id, err);
        inner.pending = None;
        inner.state = CameraState::Error(err.clone());
        inner.last_outcome = Some(CaptureOutcome::Failed);
        Err(err)
    }

    /// Tears down any session or pending request. Returns whether one existed.
    fn release(&self, outcome: CaptureOutcome) -> bool {
        let (session, had_pending) = {
            let mut inner = self.inner.borrow_mut();
            let session = inner.session.take();
            let had_pending = inner.pending.take().is_some();
            inner.state = CameraState::Idle;
            if session.is_some() || had_pending {
                inner.last_outcome = Some(outcome);
            }
            (session, had_pending)
        };

        match session {
            Some(session) => {
                session.feed.stop();
                log::debug!("Released {}", session.id);
                true
            }
            None => had_pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::encode_jpeg;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use tokio::sync::oneshot;

    #[derive(Default)]
    struct Probe {
        plays: Cell<u32>,
        stops: Cell<u32>,
    }

    struct FakeFeed {
        probe: Rc<Probe>,
        size: Option<(u32, u32)>,
        play_error: Option<DeviceError>,
    }

    #[async_trait(?Send)]
    impl CameraFeed for FakeFeed {
        async fn play(&self) -> Result<(), DeviceError> {
            self.probe.plays.set(self.probe.plays.get() + 1);
            match &self.play_error {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }

        fn frame_size(&self) -> Option<(u32, u32)> {
            self.size
        }

        async fn encode_frame(&self, quality: f64) -> Result<ImagePayload, DeviceError> {
            let (width, height) = self.size.ok_or(DeviceError::Encoding("no frame".into()))?;
            let rgba = vec![96u8; (width * height * 4) as usize];
            encode_jpeg(rgba, width, height, quality)
                .map_err(|e| DeviceError::Encoding(e.to_string()))
        }

        fn stop(&self) {
            self.probe.stops.set(self.probe.stops.get() + 1);
        }
    }

    struct FakeDevices {
        results: RefCell<VecDeque<Result<(), DeviceError>>>,
        requests: RefCell<Vec<VideoConstraints>>,
        opened: RefCell<Vec<Rc<Probe>>>,
        gate: RefCell<Option<oneshot::Receiver<()>>>,
        size: Option<(u32, u32)>,
        play_error: Option<DeviceError>,
    }

    impl FakeDevices {
        fn new(results: Vec<Result<(), DeviceError>>) -> Self {
            Self {
                results: RefCell::new(results.into()),
                requests: RefCell::new(Vec::new()),
                opened: RefCell::new(Vec::new()),
                gate: RefCell::new(None),
                size: Some((1920, 1080)),
                play_error: None,
            }
        }

        fn granting() -> Self {
            Self::new(vec![Ok(())])
        }

        fn live_streams(&self) -> usize {
            self.opened
                .borrow()
                .iter()
                .filter(|probe| probe.stops.get() == 0)
                .count()
        }
    }

    #[async_trait(?Send)]
    impl MediaDevices for FakeDevices {
        type Feed = FakeFeed;

        async fn open(&self, constraints: VideoConstraints) -> Result<FakeFeed, DeviceError> {
            self.requests.borrow_mut().push(constraints);
            let gate = self.gate.borrow_mut().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let result = self.results.borrow_mut().pop_front().unwrap_or(Ok(()));
            result?;
            let probe = Rc::new(Probe::default());
            self.opened.borrow_mut().push(Rc::clone(&probe));
            Ok(FakeFeed {
                probe,
                size: self.size,
                play_error: self.play_error.clone(),
            })
        }
    }

    async fn wait_for_request(controller: &CaptureController<FakeDevices>) {
        while controller.state() != CameraState::RequestingCamera {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_start_camera_prefers_environment_facing() {
        let controller = CaptureController::new(FakeDevices::granting());

        controller.start_camera().await.unwrap();

        assert_eq!(controller.state(), CameraState::CameraActive);
        assert_eq!(controller.facing_mode(), Some(FacingMode::Environment));
        let requests = controller.devices().requests.borrow();
        assert_eq!(*requests, vec![VideoConstraints::preferred()]);
        assert_eq!((requests[0].ideal_width, requests[0].ideal_height), (1280, 720));
        assert_eq!(controller.devices().opened.borrow()[0].plays.get(), 1);
    }

    #[tokio::test]
    async fn test_start_camera_retries_without_facing_mode() {
        let devices = FakeDevices::new(vec![Err(DeviceError::Overconstrained), Ok(())]);
        let controller = CaptureController::new(devices);

        controller.start_camera().await.unwrap();

        assert_eq!(controller.state(), CameraState::CameraActive);
        assert_eq!(controller.facing_mode(), Some(FacingMode::Any));
        let facings: Vec<FacingMode> = controller
            .devices()
            .requests
            .borrow()
            .iter()
            .map(|c| c.facing)
            .collect();
        assert_eq!(facings, vec![FacingMode::Environment, FacingMode::Any]);
    }

    #[tokio::test]
    async fn test_permission_denied_enters_error_without_open_stream() {
        let devices = FakeDevices::new(vec![
            Err(DeviceError::PermissionDenied),
            Err(DeviceError::PermissionDenied),
        ]);
        let controller = CaptureController::new(devices);

        let err = controller.start_camera().await.unwrap_err();

        assert_eq!(err, DeviceError::PermissionDenied);
        assert!(!err.user_message().is_empty());
        assert_eq!(controller.state(), CameraState::Error(DeviceError::PermissionDenied));
        assert_eq!(controller.last_outcome(), Some(CaptureOutcome::Failed));
        assert!(!controller.is_streaming());
        assert_eq!(controller.devices().live_streams(), 0);
        assert_eq!(controller.devices().requests.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_after_error() {
        let devices = FakeDevices::new(vec![
            Err(DeviceError::NotFound),
            Err(DeviceError::NotFound),
            Ok(()),
        ]);
        let controller = CaptureController::new(devices);

        assert!(controller.start_camera().await.is_err());
        controller.start_camera().await.unwrap();

        assert_eq!(controller.state(), CameraState::CameraActive);
        assert_eq!(controller.devices().live_streams(), 1);
    }

    #[tokio::test]
    async fn test_playback_failure_releases_stream() {
        let mut devices = FakeDevices::granting();
        devices.play_error = Some(DeviceError::Playback("autoplay blocked".into()));
        let controller = CaptureController::new(devices);

        let err = controller.start_camera().await.unwrap_err();

        assert!(matches!(err, DeviceError::Playback(_)));
        assert!(matches!(controller.state(), CameraState::Error(DeviceError::Playback(_))));
        let opened = controller.devices().opened.borrow();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].stops.get(), 1);
    }

    #[tokio::test]
    async fn test_start_while_active_does_not_open_second_stream() {
        let controller = CaptureController::new(FakeDevices::new(vec![Ok(()), Ok(())]));

        controller.start_camera().await.unwrap();
        controller.start_camera().await.unwrap();

        assert_eq!(controller.state(), CameraState::CameraActive);
        assert_eq!(controller.devices().requests.borrow().len(), 1);
        assert_eq!(controller.devices().live_streams(), 1);
    }

    #[tokio::test]
    async fn test_start_while_requesting_is_ignored() {
        let devices = FakeDevices::granting();
        let (release, gate) = oneshot::channel();
        *devices.gate.borrow_mut() = Some(gate);
        let controller = CaptureController::new(devices);
        let second = controller.clone();

        let (first, ()) = tokio::join!(controller.start_camera(), async {
            wait_for_request(&second).await;
            second.start_camera().await.unwrap();
            release.send(()).unwrap();
        });

        first.unwrap();
        assert_eq!(controller.state(), CameraState::CameraActive);
        assert_eq!(controller.devices().requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_during_request_releases_late_stream() {
        let devices = FakeDevices::granting();
        let (release, gate) = oneshot::channel();
        *devices.gate.borrow_mut() = Some(gate);
        let controller = CaptureController::new(devices);
        let canceller = controller.clone();

        let (result, ()) = tokio::join!(controller.start_camera(), async {
            wait_for_request(&canceller).await;
            canceller.stop_camera();
            release.send(()).unwrap();
        });

        result.unwrap();
        assert_eq!(controller.state(), CameraState::Idle);
        assert_eq!(controller.last_outcome(), Some(CaptureOutcome::Cancelled));
        assert!(!controller.is_streaming());
        let opened = controller.devices().opened.borrow();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].stops.get(), 1);
        assert_eq!(opened[0].plays.get(), 0);
    }

    #[tokio::test]
    async fn test_stop_camera_is_idempotent() {
        let controller = CaptureController::new(FakeDevices::granting());

        controller.stop_camera();
        assert_eq!(controller.state(), CameraState::Idle);
        assert_eq!(controller.last_outcome(), None);

        controller.start_camera().await.unwrap();
        controller.stop_camera();
        controller.stop_camera();

        assert_eq!(controller.state(), CameraState::Idle);
        assert_eq!(controller.last_outcome(), Some(CaptureOutcome::Cancelled));
        assert_eq!(controller.devices().opened.borrow()[0].stops.get(), 1);
    }

    #[tokio::test]
    async fn test_stop_clears_error_state() {
        let devices = FakeDevices::new(vec![
            Err(DeviceError::InsecureContext),
            Err(DeviceError::InsecureContext),
        ]);
        let controller = CaptureController::new(devices);

        let _ = controller.start_camera().await;
        controller.stop_camera();

        assert_eq!(controller.state(), CameraState::Idle);
    }

    #[tokio::test]
    async fn test_capture_photo_encodes_native_frame_and_releases_camera() {
        let controller = CaptureController::new(FakeDevices::granting());
        controller.start_camera().await.unwrap();

        let payload = controller.capture_photo().await.expect("frame");

        assert_eq!(payload.mime_type(), "image/jpeg");
        assert_eq!(payload.dimensions().unwrap(), (1920, 1080));
        assert_eq!(controller.state(), CameraState::Idle);
        assert_eq!(controller.last_outcome(), Some(CaptureOutcome::FrameCaptured));
        assert_eq!(controller.devices().live_streams(), 0);
    }

    #[tokio::test]
    async fn test_capture_photo_without_preconditions_is_noop() {
        let controller = CaptureController::new(FakeDevices::granting());
        assert!(controller.capture_photo().await.is_none());
        assert_eq!(controller.state(), CameraState::Idle);

        let mut devices = FakeDevices::granting();
        devices.size = None;
        let controller = CaptureController::new(devices);
        controller.start_camera().await.unwrap();

        assert!(controller.capture_photo().await.is_none());
        assert_eq!(controller.state(), CameraState::CameraActive);
        assert_eq!(controller.devices().live_streams(), 1);
    }

    #[tokio::test]
    async fn test_select_file_ignores_camera_state() {
        let controller = CaptureController::new(FakeDevices::granting());
        controller.start_camera().await.unwrap();

        let payload = controller.select_file(vec![1, 2, 3], "image/png");

        assert_eq!(payload.mime_type(), "image/png");
        assert_eq!(payload.bytes(), &[1, 2, 3]);
        assert_eq!(controller.last_outcome(), Some(CaptureOutcome::FileSelected));
        assert_eq!(controller.state(), CameraState::CameraActive);
    }

    #[test]
    fn test_dom_exception_mapping() {
        assert_eq!(
            DeviceError::from_dom_exception("NotAllowedError", "Permission denied"),
            DeviceError::PermissionDenied
        );
        assert_eq!(
            DeviceError::from_dom_exception("NotFoundError", ""),
            DeviceError::NotFound
        );
        assert_eq!(
            DeviceError::from_dom_exception("OverconstrainedError", ""),
            DeviceError::Overconstrained
        );
        assert_eq!(
            DeviceError::from_dom_exception("WeirdError", "something broke"),
            DeviceError::Other("something broke".into())
        );
        assert_eq!(
            DeviceError::from_dom_exception("WeirdError", ""),
            DeviceError::Other("WeirdError".into())
        );
    }

    #[test]
    fn test_state_names() {
        assert_eq!(CameraState::RequestingCamera.as_ref(), "RequestingCamera");
        assert_eq!(
            CameraState::Error(DeviceError::NotFound).as_ref(),
            "Error"
        );
        assert_eq!(SessionId::from(3).to_string(), "camera session #3");
    }
}
