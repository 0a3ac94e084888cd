//! Recognition capture flow: camera frame → face recognition → self-scoring → log.
//!
//! The flow owns its frame source for the whole capture session. The source
//! is stopped on `close()` and when the flow is dropped, so every exit path
//! releases the camera.

use crate::contacts::{ContactRepository, ScoreChange};
use crate::remote::FaceRecognizer;
use crate::session::Session;
use crate::types::{RecognitionLog, TrustedContact};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use thiserror::Error;

/// Location recorded when a sighting is saved from the camera.
pub const CURRENT_LOCATION: &str = "Current Location";

/// A camera that can be started, sampled as JPEG, and stopped.
pub trait FrameSource: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Acquire the device. Calling while active is a no-op.
    fn start(&mut self) -> Result<(), Self::Error>;
    fn is_active(&self) -> bool;
    /// Grab the current frame, JPEG-encoded.
    fn capture_jpeg(&mut self) -> Result<Vec<u8>, Self::Error>;
    /// Release the device. Calling while stopped is a no-op.
    fn stop(&mut self);
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Unable to access camera: {0}")]
    Camera(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("{action} is not available while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CaptureState {
    /// No camera stream.
    #[default]
    Closed,
    /// Live preview, ready to capture.
    Live,
    /// Image submitted, waiting for the recognition endpoint.
    Processing,
    /// Top-ranked match; other candidates are dropped.
    Recognized {
        image: Vec<u8>,
        contact: TrustedContact,
    },
    /// The endpoint answered with zero matches.
    NoMatch { image: Vec<u8> },
    /// Recognition failed; the image is kept for a retry.
    Failed { image: Vec<u8>, message: String },
}

impl CaptureState {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::Closed => "closed",
            CaptureState::Live => "live",
            CaptureState::Processing => "processing",
            CaptureState::Recognized { .. } => "recognized",
            CaptureState::NoMatch { .. } => "no match",
            CaptureState::Failed { .. } => "failed",
        }
    }

    pub fn image(&self) -> Option<&[u8]> {
        match self {
            CaptureState::Recognized { image, .. }
            | CaptureState::NoMatch { image }
            | CaptureState::Failed { image, .. } => Some(image),
            _ => None,
        }
    }
}

/// What the user did with a recognized face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// "Yes, I remembered them": score +1, logged.
    Remembered,
    /// "No, I forgot": score -1, logged.
    Forgot,
    /// Keep the sighting without scoring: last seen updated, logged.
    Save,
    /// Throw the snap away: nothing recorded.
    Discard,
}

pub struct CaptureFlow<'a, S, R>
where
    S: FrameSource,
    R: FaceRecognizer + ?Sized,
{
    source: S,
    recognizer: &'a R,
    session: &'a Session,
    contacts: &'a mut ContactRepository,
    state: CaptureState,
}

impl<'a, S, R> CaptureFlow<'a, S, R>
where
    S: FrameSource,
    R: FaceRecognizer + ?Sized,
{
    pub fn new(
        source: S,
        recognizer: &'a R,
        session: &'a Session,
        contacts: &'a mut ContactRepository,
    ) -> Self {
        Self {
            source,
            recognizer,
            session,
            contacts,
            state: CaptureState::Closed,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Acquire the camera and enter live preview.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        self.source
            .start()
            .map_err(|e| CaptureError::Camera(Box::new(e)))?;
        tracing::info!("camera stream started");
        self.state = CaptureState::Live;
        Ok(())
    }

    /// Capture the current frame and submit it for recognition.
    pub async fn capture(&mut self) -> Result<&CaptureState, CaptureError> {
        if self.state != CaptureState::Live {
            return Err(self.invalid("capture"));
        }
        let image = self
            .source
            .capture_jpeg()
            .map_err(|e| CaptureError::Camera(Box::new(e)))?;
        tracing::debug!(bytes = image.len(), "frame captured");
        self.submit(image).await;
        Ok(&self.state)
    }

    /// Resubmit the held image after a failure or an empty result.
    pub async fn retry(&mut self) -> Result<&CaptureState, CaptureError> {
        let image = match &self.state {
            CaptureState::Failed { image, .. } | CaptureState::NoMatch { image } => image.clone(),
            _ => return Err(self.invalid("retry")),
        };
        self.submit(image).await;
        Ok(&self.state)
    }

    async fn submit(&mut self, image: Vec<u8>) {
        self.state = CaptureState::Processing;

        let Some(user) = self.session.store().get_user().filter(|u| !u.id.is_empty()) else {
            self.state = CaptureState::Failed {
                image,
                message: "User not authenticated".to_string(),
            };
            return;
        };

        self.state = match self.recognizer.recognize_face(&image, &user.id).await {
            Ok(response) => {
                let candidates = response.matches.len();
                match response.matches.into_iter().next() {
                    Some(contact) => {
                        tracing::info!(
                            contact = %contact.id,
                            confidence = contact.face_confidence,
                            candidates,
                            "face recognized"
                        );
                        CaptureState::Recognized { image, contact }
                    }
                    None => {
                        tracing::info!("no familiar faces in frame");
                        CaptureState::NoMatch { image }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "face recognition failed");
                let message = match e.message() {
                    "" => "Face recognition failed".to_string(),
                    m => m.to_string(),
                };
                CaptureState::Failed { image, message }
            }
        };
    }

    /// Apply the user's verdict and return to live preview.
    pub fn resolve(&mut self, verdict: Verdict) -> Result<(), CaptureError> {
        match (&self.state, verdict) {
            (CaptureState::Recognized { .. }, _) => {}
            (CaptureState::NoMatch { .. } | CaptureState::Failed { .. }, Verdict::Discard) => {}
            _ => return Err(self.invalid(verdict_name(verdict))),
        }

        let state = std::mem::replace(&mut self.state, CaptureState::Live);
        if let CaptureState::Recognized { image, contact } = state {
            match verdict {
                Verdict::Remembered => {
                    self.contacts.apply_memory_score(&contact.id, ScoreChange::Remembered);
                    self.append_log(&contact, &image);
                }
                Verdict::Forgot => {
                    self.contacts.apply_memory_score(&contact.id, ScoreChange::Forgot);
                    self.append_log(&contact, &image);
                }
                Verdict::Save => {
                    self.contacts.record_sighting(&contact.id, Some(CURRENT_LOCATION));
                    self.append_log(&contact, &image);
                }
                Verdict::Discard => {
                    tracing::debug!(contact = %contact.id, "snap discarded");
                }
            }
        }

        self.restart_if_stopped()
    }

    pub fn remembered(&mut self) -> Result<(), CaptureError> {
        self.resolve(Verdict::Remembered)
    }

    pub fn forgot(&mut self) -> Result<(), CaptureError> {
        self.resolve(Verdict::Forgot)
    }

    pub fn save(&mut self) -> Result<(), CaptureError> {
        self.resolve(Verdict::Save)
    }

    pub fn discard(&mut self) -> Result<(), CaptureError> {
        self.resolve(Verdict::Discard)
    }

    fn append_log(&self, contact: &TrustedContact, image: &[u8]) {
        self.session.store().add_recognition_log(recognition_log(contact, image));
        tracing::info!(contact = %contact.id, "sighting logged");
    }

    fn restart_if_stopped(&mut self) -> Result<(), CaptureError> {
        if !self.source.is_active() {
            tracing::debug!("camera stream stopped; restarting");
            return self.open();
        }
        self.state = CaptureState::Live;
        Ok(())
    }

    /// Release the camera.
    pub fn close(&mut self) {
        if self.source.is_active() {
            self.source.stop();
            tracing::info!("camera stream stopped");
        }
        self.state = CaptureState::Closed;
    }

    fn invalid(&self, action: &'static str) -> CaptureError {
        CaptureError::InvalidState {
            action,
            state: self.state.name(),
        }
    }
}

impl<S, R> Drop for CaptureFlow<'_, S, R>
where
    S: FrameSource,
    R: FaceRecognizer + ?Sized,
{
    fn drop(&mut self) {
        self.close();
    }
}

fn verdict_name(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Remembered => "remembered",
        Verdict::Forgot => "forgot",
        Verdict::Save => "save",
        Verdict::Discard => "discard",
    }
}

/// `data:image/jpeg;base64,...`
pub fn jpeg_data_url(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))
}

fn recognition_log(contact: &TrustedContact, image: &[u8]) -> RecognitionLog {
    RecognitionLog {
        contact_id: contact.id.clone(),
        name: contact.name.clone(),
        relationship: contact.relationship.clone(),
        picture: contact.picture.clone(),
        phone: Some(contact.phone.clone()),
        location: Some(contact.location.clone()),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        image: (!image.is_empty()).then(|| jpeg_data_url(image)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{ApiError, ApiResult};
    use crate::store::Store;
    use crate::types::{Contact, RecognitionResponse, StoredUser};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, thiserror::Error)]
    #[error("permission denied")]
    struct Denied;

    #[derive(Default)]
    struct FakeCamera {
        active: bool,
        deny: bool,
        starts: usize,
        stops: Arc<Mutex<usize>>,
    }

    impl FrameSource for FakeCamera {
        type Error = Denied;

        fn start(&mut self) -> Result<(), Denied> {
            if self.deny {
                return Err(Denied);
            }
            self.active = true;
            self.starts += 1;
            Ok(())
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn capture_jpeg(&mut self) -> Result<Vec<u8>, Denied> {
            Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
        }

        fn stop(&mut self) {
            self.active = false;
            *self.stops.lock().unwrap() += 1;
        }
    }

    struct FakeRecognizer {
        responses: Mutex<Vec<ApiResult<RecognitionResponse>>>,
    }

    impl FakeRecognizer {
        fn scripted(mut responses: Vec<ApiResult<RecognitionResponse>>) -> Self {
            responses.reverse();
            Self { responses: Mutex::new(responses) }
        }
    }

    #[async_trait]
    impl FaceRecognizer for FakeRecognizer {
        async fn recognize_face(&self, jpeg: &[u8], user_id: &str) -> ApiResult<RecognitionResponse> {
            assert_eq!(user_id, "u1");
            assert!(!jpeg.is_empty());
            self.responses.lock().unwrap().pop().expect("unexpected recognition call")
        }
    }

    fn trusted(id: &str) -> TrustedContact {
        TrustedContact {
            id: id.into(),
            face_id: "f".into(),
            name: format!("name-{id}"),
            relationship: "Mother".into(),
            location: "Porto".into(),
            phone: "123".into(),
            email: None,
            note: None,
            picture: Some(format!("{id}.jpg")),
            user: "u1".into(),
            face_confidence: 97.0,
            face_indexed: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn matches(ids: &[&str]) -> ApiResult<RecognitionResponse> {
        Ok(RecognitionResponse {
            message: "ok".into(),
            matches: ids.iter().map(|id| trusted(id)).collect(),
            count: ids.len(),
            search_criteria: None,
        })
    }

    fn fixture() -> (Session, ContactRepository) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store.set_user(&StoredUser {
            id: "u1".into(),
            name: "U".into(),
            email: "u@example.com".into(),
            gender: "female".into(),
            date_of_birth: "1980-01-01".into(),
            phone: String::new(),
            created_at: String::new(),
            avatar: None,
        });
        store.set_contacts(&[Contact::from(&trusted("c1")), Contact::from(&trusted("c2"))]);
        let repo = ContactRepository::hydrate(store.clone());
        (Session::new(store), repo)
    }

    #[tokio::test]
    async fn test_remembered_increments_and_logs() {
        let (session, mut repo) = fixture();
        let recognizer = FakeRecognizer::scripted(vec![matches(&["c1", "c2"])]);
        let mut flow = CaptureFlow::new(FakeCamera::default(), &recognizer, &session, &mut repo);
        flow.open().unwrap();

        let state = flow.capture().await.unwrap();
        match state {
            CaptureState::Recognized { contact, .. } => assert_eq!(contact.id, "c1"),
            other => panic!("unexpected state {other:?}"),
        }
        flow.resolve(Verdict::Remembered).unwrap();
        assert_eq!(flow.state(), &CaptureState::Live);
        drop(flow);

        assert_eq!(repo.get("c1").unwrap().score(), 1);
        let logs = session.store().get_recognition_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].contact_id, "c1");
        assert_eq!(logs[0].picture.as_deref(), Some("c1.jpg"));
        assert!(logs[0].image.as_deref().unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(logs[0].timestamp.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_forgot_decrements_below_zero() {
        let (session, mut repo) = fixture();
        let recognizer = FakeRecognizer::scripted(vec![matches(&["c2"])]);
        let mut flow = CaptureFlow::new(FakeCamera::default(), &recognizer, &session, &mut repo);
        flow.open().unwrap();
        flow.capture().await.unwrap();
        flow.resolve(Verdict::Forgot).unwrap();
        drop(flow);

        assert_eq!(repo.get("c2").unwrap().score(), -1);
        assert_eq!(session.store().get_recognition_logs().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_matches_writes_nothing() {
        let (session, mut repo) = fixture();
        let recognizer = FakeRecognizer::scripted(vec![matches(&[])]);
        let mut flow = CaptureFlow::new(FakeCamera::default(), &recognizer, &session, &mut repo);
        flow.open().unwrap();

        let state = flow.capture().await.unwrap();
        assert!(matches!(state, CaptureState::NoMatch { .. }));
        assert!(flow.resolve(Verdict::Remembered).is_err());
        assert!(flow.resolve(Verdict::Save).is_err());
        flow.resolve(Verdict::Discard).unwrap();
        drop(flow);

        assert!(session.store().get_recognition_logs().is_empty());
        assert!(repo.contacts().iter().all(|c| c.score() == 0));
    }

    #[tokio::test]
    async fn test_failure_keeps_image_and_retry_recovers() {
        let (session, mut repo) = fixture();
        let recognizer = FakeRecognizer::scripted(vec![Err(ApiError::Network), matches(&["c1"])]);
        let mut flow = CaptureFlow::new(FakeCamera::default(), &recognizer, &session, &mut repo);
        flow.open().unwrap();

        match flow.capture().await.unwrap() {
            CaptureState::Failed { image, message } => {
                assert!(!image.is_empty());
                assert_eq!(message, crate::remote::NETWORK_ERROR_MESSAGE);
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(matches!(flow.retry().await.unwrap(), CaptureState::Recognized { .. }));
    }

    #[tokio::test]
    async fn test_retry_after_no_match_resubmits_same_image() {
        let (session, mut repo) = fixture();
        let recognizer = FakeRecognizer::scripted(vec![matches(&[]), matches(&["c1"])]);
        let mut flow = CaptureFlow::new(FakeCamera::default(), &recognizer, &session, &mut repo);
        flow.open().unwrap();

        let first = match flow.capture().await.unwrap() {
            CaptureState::NoMatch { image } => image.clone(),
            other => panic!("unexpected state {other:?}"),
        };
        match flow.retry().await.unwrap() {
            CaptureState::Recognized { image, contact } => {
                assert_eq!(image, &first);
                assert_eq!(contact.id, "c1");
            }
            other => panic!("unexpected state {other:?}"),
        }
        flow.resolve(Verdict::Remembered).unwrap();
        drop(flow);

        assert_eq!(session.store().get_recognition_logs().len(), 1);
    }

    #[tokio::test]
    async fn test_save_records_sighting_without_scoring() {
        let (session, mut repo) = fixture();
        let recognizer = FakeRecognizer::scripted(vec![matches(&["c2"])]);
        let mut flow = CaptureFlow::new(FakeCamera::default(), &recognizer, &session, &mut repo);
        flow.open().unwrap();
        flow.capture().await.unwrap();
        flow.resolve(Verdict::Save).unwrap();
        drop(flow);

        let c2 = repo.get("c2").unwrap();
        assert_eq!(c2.score(), 0);
        assert!(c2.last_seen.as_deref().unwrap().ends_with("• Current Location"));
        assert_eq!(repo.recent()[0].id, "c2");
        assert_eq!(session.store().get_recognition_logs().len(), 1);
    }

    #[tokio::test]
    async fn test_discard_records_nothing() {
        let (session, mut repo) = fixture();
        let recognizer = FakeRecognizer::scripted(vec![matches(&["c1"])]);
        let mut flow = CaptureFlow::new(FakeCamera::default(), &recognizer, &session, &mut repo);
        flow.open().unwrap();
        flow.capture().await.unwrap();
        flow.resolve(Verdict::Discard).unwrap();
        drop(flow);

        assert!(session.store().get_recognition_logs().is_empty());
        assert_eq!(repo.get("c1").unwrap().score(), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_capture_fails_inline() {
        let (session, mut repo) = fixture();
        session.store().remove_user();
        let recognizer = FakeRecognizer::scripted(vec![]);
        let mut flow = CaptureFlow::new(FakeCamera::default(), &recognizer, &session, &mut repo);
        flow.open().unwrap();
        match flow.capture().await.unwrap() {
            CaptureState::Failed { message, .. } => assert_eq!(message, "User not authenticated"),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_restarts_after_verdict_when_stopped() {
        let (session, mut repo) = fixture();
        let recognizer = FakeRecognizer::scripted(vec![matches(&["c1"])]);
        let mut flow = CaptureFlow::new(FakeCamera::default(), &recognizer, &session, &mut repo);
        flow.open().unwrap();
        flow.capture().await.unwrap();
        flow.source.stop();
        flow.resolve(Verdict::Discard).unwrap();
        assert!(flow.source().is_active());
        assert_eq!(flow.source().starts, 2);
    }

    #[test]
    fn test_permission_denied_halts() {
        let (session, mut repo) = fixture();
        let recognizer = FakeRecognizer::scripted(vec![]);
        let camera = FakeCamera { deny: true, ..Default::default() };
        let mut flow = CaptureFlow::new(camera, &recognizer, &session, &mut repo);
        let err = flow.open().unwrap_err();
        assert!(matches!(err, CaptureError::Camera(_)));
        assert_eq!(flow.state(), &CaptureState::Closed);
    }

    #[test]
    fn test_drop_releases_camera() {
        let (session, mut repo) = fixture();
        let recognizer = FakeRecognizer::scripted(vec![]);
        let stops = Arc::new(Mutex::new(0));
        let camera = FakeCamera { stops: stops.clone(), ..Default::default() };
        {
            let mut flow = CaptureFlow::new(camera, &recognizer, &session, &mut repo);
            flow.open().unwrap();
        }
        assert_eq!(*stops.lock().unwrap(), 1);
    }
}
