use crate::app::App;
use crate::prompt::{ask, Action};
use anyhow::Result;
use memorie_core::capture::{CaptureFlow, CaptureState, FrameSource};
use memorie_hw::frame::is_jpeg;
use memorie_hw::CameraSession;
use std::path::PathBuf;

/// A JPEG on disk standing in for the camera.
pub struct ImageFile {
    path: PathBuf,
    active: bool,
}

impl ImageFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, active: false }
    }
}

impl FrameSource for ImageFile {
    type Error = std::io::Error;

    fn start(&mut self) -> Result<(), std::io::Error> {
        if !self.path.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a file", self.path.display()),
            ));
        }
        self.active = true;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn capture_jpeg(&mut self) -> Result<Vec<u8>, std::io::Error> {
        let bytes = std::fs::read(&self.path)?;
        if !is_jpeg(&bytes) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} is not a JPEG image", self.path.display()),
            ));
        }
        Ok(bytes)
    }

    fn stop(&mut self) {
        self.active = false;
    }
}

pub async fn run(app: &App, image: Option<PathBuf>, device: Option<String>) -> Result<()> {
    app.require_signed_in()?;
    let mut contacts = app.contacts();

    match image {
        Some(path) => {
            let flow = CaptureFlow::new(ImageFile::new(path), &app.api, &app.session, &mut contacts);
            drive(flow, true).await
        }
        None => {
            let device = device.unwrap_or_else(|| app.config.camera_device.clone());
            let camera = CameraSession::new(device, app.config.warmup_frames);
            let flow = CaptureFlow::new(camera, &app.api, &app.session, &mut contacts);
            drive(flow, false).await
        }
    }
}

/// Capture loop. `single_shot` stops after the first resolved capture.
async fn drive<S>(mut flow: CaptureFlow<'_, S, memorie_api::ApiClient>, single_shot: bool) -> Result<()>
where
    S: FrameSource,
{
    flow.open()?;

    loop {
        if !single_shot {
            let input = ask("Press Enter to capture (q to quit)")?;
            if Action::parse(&input) == Some(Action::Quit) {
                break;
            }
        }

        println!("Recognizing...");
        flow.capture().await?;

        if !resolve(&mut flow).await? || single_shot {
            break;
        }
    }

    flow.close();
    Ok(())
}

/// Prompt until the capture is resolved. Returns false if the user quit.
async fn resolve<S>(flow: &mut CaptureFlow<'_, S, memorie_api::ApiClient>) -> Result<bool>
where
    S: FrameSource,
{
    loop {
        let recognized = match flow.state() {
            CaptureState::Recognized { contact, .. } => {
                println!(
                    "This is {} ({}), confidence {:.1}%",
                    contact.name, contact.relationship, contact.face_confidence
                );
                if !contact.location.is_empty() {
                    println!("You met at {}", contact.location);
                }
                true
            }
            CaptureState::NoMatch { .. } => {
                println!("No familiar faces detected");
                false
            }
            CaptureState::Failed { message, .. } => {
                println!("Recognition failed: {message}");
                false
            }
            other => {
                tracing::debug!(state = other.name(), "nothing to resolve");
                return Ok(true);
            }
        };

        let choices = if recognized {
            "Did you remember them? [r]emembered, [f]orgot, [s]ave, [d]elete, [q]uit"
        } else {
            "[t]ry again, [d]elete, [q]uit"
        };

        match Action::parse(&ask(choices)?) {
            Some(Action::Remembered) if recognized => {
                flow.remembered()?;
                println!("Nice! Memory score increased");
            }
            Some(Action::Forgot) if recognized => {
                flow.forgot()?;
                println!("Logged. Keep practicing");
            }
            Some(Action::Save) if recognized => {
                flow.save()?;
                println!("Sighting saved");
            }
            Some(Action::Discard) => flow.discard()?,
            Some(Action::Retry) if !recognized => {
                println!("Recognizing...");
                flow.retry().await?;
                continue;
            }
            Some(Action::Quit) => {
                flow.discard()?;
                return Ok(false);
            }
            _ => {
                println!("Please choose one of the listed options");
                continue;
            }
        }
        return Ok(true);
    }
}
