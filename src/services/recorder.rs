// src/services/recorder.rs
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use tracing::debug;

use crate::error::CaptureError;

/// A microphone-like source the chat view records voice clips from.
pub trait AudioCapture: Send {
    /// Acquire the device and begin capturing.
    fn start(&mut self) -> Result<(), CaptureError>;
    /// Stop capturing and hand back the recorded clip.
    fn stop(&mut self) -> Result<Vec<u8>, CaptureError>;
    fn is_recording(&self) -> bool;
}

/// Plays a pre-recorded clip file as if it were the microphone.
///
/// Opening the file stands in for acquiring the device: an unreadable file
/// is reported as [`CaptureError::PermissionDenied`].
#[derive(Debug)]
pub struct ClipFileCapture {
    path: PathBuf,
    source: Option<File>,
}

impl ClipFileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), source: None }
    }
}

impl AudioCapture for ClipFileCapture {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.source.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }
        let file = File::open(&self.path)
            .map_err(|e| CaptureError::PermissionDenied(format!("{}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "capture started");
        self.source = Some(file);
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<u8>, CaptureError> {
        let mut file = self.source.take().ok_or(CaptureError::NotRecording)?;
        let mut clip = Vec::new();
        file.read_to_end(&mut clip)?;
        debug!(path = %self.path.display(), size = clip.len(), "capture stopped");
        Ok(clip)
    }

    fn is_recording(&self) -> bool {
        self.source.is_some()
    }
}
