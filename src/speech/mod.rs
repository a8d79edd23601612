//! Spoken feedback
//!
//! Renders feedback text to audio files through an external text-to-speech
//! command. Playback is up to the caller.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SpeechConfig;
use crate::utils::error::{CoachError, CoachResult};

/// Characters spoken per second, used to estimate clip length
pub const CHARS_PER_SECOND: f64 = 3.0;

/// A rendered audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechClip {
    pub path: PathBuf,
    pub estimated_duration_seconds: f64,
}

impl SpeechClip {
    pub fn new(path: PathBuf, text: &str) -> Self {
        Self {
            path,
            estimated_duration_seconds: estimate_duration(text),
        }
    }
}

/// Rough speaking time for `text`
pub fn estimate_duration(text: &str) -> f64 {
    text.chars().count() as f64 / CHARS_PER_SECOND
}

pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` to a new audio file
    fn synthesize(&self, text: &str) -> CoachResult<SpeechClip>;
}

/// Synthesizer backed by an espeak-compatible command line tool
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    command: String,
    voice: Option<String>,
    rate: u32,
    audio_dir: PathBuf,
}

impl CommandSynthesizer {
    pub fn new(config: &SpeechConfig, audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: config.command.clone(),
            voice: config.voice.clone(),
            rate: config.rate,
            audio_dir: audio_dir.into(),
        }
    }

    /// Check if the command can be run
    pub fn is_available(&self) -> bool {
        Command::new(&self.command).arg("--version").output().is_ok()
    }

    fn args(&self, text: &str, output: &Path) -> Vec<String> {
        let mut args = vec!["-s".to_string(), self.rate.to_string()];
        if let Some(voice) = &self.voice {
            args.push("-v".to_string());
            args.push(voice.clone());
        }
        args.push("-w".to_string());
        args.push(output.to_string_lossy().to_string());
        // Text starting with '-' must not be read as an option.
        args.push("--".to_string());
        args.push(text.to_string());
        args
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn synthesize(&self, text: &str) -> CoachResult<SpeechClip> {
        if text.trim().is_empty() {
            return Err(CoachError::Validation("nothing to speak".to_string()));
        }
        std::fs::create_dir_all(&self.audio_dir)?;
        let output = self.audio_dir.join(format!("feedback_{}.wav", Uuid::new_v4()));

        let result = Command::new(&self.command)
            .args(self.args(text, &output))
            .output()
            .map_err(|e| CoachError::Resource(format!("Failed to run {}: {}", self.command, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CoachError::Resource(format!("{} failed: {}", self.command, stderr.trim())));
        }

        tracing::debug!("Synthesized {} chars to {:?}", text.chars().count(), output);
        Ok(SpeechClip::new(output, text))
    }
}
