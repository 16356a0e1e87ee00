//! Speech adapters.
//!
//! The engine never touches audio devices or speech models directly. It
//! talks to three seams:
//!
//! - [`SpeechSynthesizer`] turns an NPC answer into audio
//! - [`Transcriber`] turns a recorded clip into text
//! - [`AudioCapture`] records the player's microphone
//!
//! [`VoiceInput`] strings capture and transcription together into a
//! push-to-talk flow that feeds the dialogue orchestrator.

mod voice;

pub use voice::VoiceInput;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Mono PCM audio
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A clip with no samples
    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length; zero when the sample rate is zero
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Text-to-speech
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioClip>;
}

/// Speech-to-text
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String>;
}

/// Microphone recording
pub trait AudioCapture: Send {
    /// Begin recording
    fn start(&mut self) -> Result<()>;

    /// Stop recording and hand back what was captured, if anything
    fn stop(&mut self) -> Result<Option<AudioClip>>;
}

/// Synthesizer for text-only sessions
#[derive(Debug, Clone, Copy)]
pub struct SilentSynthesizer {
    sample_rate: u32,
}

impl SilentSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SilentSynthesizer {
    fn default() -> Self {
        Self {
            sample_rate: voice::WHISPER_SAMPLE_RATE,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<AudioClip> {
        Ok(AudioClip::empty(self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_duration() {
        let clip = AudioClip::new(vec![0.0; 8000], 16_000);
        assert_eq!(clip.duration(), Duration::from_millis(500));
        assert_eq!(AudioClip::new(vec![0.0; 10], 0).duration(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_silent_synthesizer() {
        let clip = SilentSynthesizer::new().synthesize("Hello there").await.unwrap();
        assert!(clip.is_empty());
        assert_eq!(clip.sample_rate, 16_000);
    }
}
