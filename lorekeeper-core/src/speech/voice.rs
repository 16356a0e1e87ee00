//! Push-to-talk voice input

use std::sync::Arc;
use std::time::Duration;

use crate::config::VoiceConfig;
use crate::dialogue::{DialogueOrchestrator, SubmitOutcome};
use crate::error::{LorekeeperError, Result};

use super::{AudioCapture, AudioClip, Transcriber};

/// Sample rate Whisper-family transcribers expect
pub(crate) const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Longest clip a transcriber accepts
pub(crate) const MAX_RECORDING: Duration = Duration::from_secs(30);

/// Press to record, release to transcribe.
pub struct VoiceInput {
    capture: Box<dyn AudioCapture>,
    transcriber: Arc<dyn Transcriber>,
    sample_rate: u32,
    max_recording: Duration,
    recording: bool,
}

impl VoiceInput {
    pub fn new(capture: Box<dyn AudioCapture>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            capture,
            transcriber,
            sample_rate: WHISPER_SAMPLE_RATE,
            max_recording: MAX_RECORDING,
            recording: false,
        }
    }

    /// Apply sample rate and recording limit from config
    pub fn with_config(mut self, config: &VoiceConfig) -> Self {
        self.sample_rate = config.sample_rate;
        self.max_recording = config.max_recording;
        self
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Start recording. An active recording is discarded and restarted.
    pub fn begin(&mut self) -> Result<()> {
        if self.recording {
            tracing::debug!("Restarting voice capture; discarding previous recording");
            self.recording = false;
            let _ = self.capture.stop()?;
        }
        self.capture.start()?;
        self.recording = true;
        tracing::info!("Voice capture started");
        Ok(())
    }

    /// Stop recording and transcribe.
    ///
    /// Returns `None` when no recording was active or the capture produced
    /// no clip.
    pub async fn finish(&mut self) -> Result<Option<String>> {
        if !self.recording {
            return Ok(None);
        }
        self.recording = false;

        let Some(clip) = self.capture.stop()? else {
            tracing::warn!("Voice capture stopped with no audio");
            return Ok(None);
        };
        self.validate(&clip)?;

        let text = match self.transcriber.transcribe(&clip).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Transcription failed");
                return Err(e);
            }
        };
        tracing::info!(
            duration_ms = clip.duration().as_millis() as u64,
            chars = text.len(),
            "Transcribed voice input"
        );
        Ok(Some(text))
    }

    /// Stop recording, transcribe, and submit the text as a player turn.
    pub async fn finish_and_submit(
        &mut self,
        orchestrator: &DialogueOrchestrator,
    ) -> Result<Option<SubmitOutcome>> {
        match self.finish().await? {
            Some(text) => Ok(Some(orchestrator.submit(&text).await)),
            None => Ok(None),
        }
    }

    fn validate(&self, clip: &AudioClip) -> Result<()> {
        if clip.sample_rate != self.sample_rate {
            return Err(LorekeeperError::InvalidInput(format!(
                "Audio must be sampled at {} Hz, got {} Hz",
                self.sample_rate, clip.sample_rate
            )));
        }
        if clip.duration() > self.max_recording {
            return Err(LorekeeperError::InvalidInput(format!(
                "Recording is {:?} long; the limit is {:?}",
                clip.duration(),
                self.max_recording
            )));
        }
        Ok(())
    }
}
