//! Process configuration
//!
//! Loaded from TOML; every field has a default so a partial (or missing)
//! file is fine. A handful of environment variables override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::error::{CoachError, CoachResult};
use crate::video::{BackendKind, VideoParams};

pub const ENV_CAMERA_INDEX: &str = "POSE_COACH_CAMERA_INDEX";
pub const ENV_VIDEO_DIR: &str = "POSE_COACH_VIDEO_DIR";
pub const ENV_DATA_DIR: &str = "POSE_COACH_DATA_DIR";
pub const ENV_LOG: &str = "POSE_COACH_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Give up on a device that has not produced a frame after this long
    pub startup_timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 1920,
            height: 1080,
            fps: 30.0,
            startup_timeout_ms: 5000,
        }
    }
}

impl CameraConfig {
    pub fn params(&self) -> VideoParams {
        VideoParams::new(self.width, self.height, self.fps)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub video_dir: PathBuf,
    /// Final session videos, relative to `video_dir`
    pub sessions_subdir: String,
    /// Per-pose segments, relative to `video_dir`
    pub segments_subdir: String,
    pub audio_dir: PathBuf,
    /// Session documents
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("videos"),
            sessions_subdir: "sessions".to_string(),
            segments_subdir: "segments".to_string(),
            audio_dir: PathBuf::from("audio"),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl StorageConfig {
    pub fn sessions_dir(&self) -> PathBuf {
        self.video_dir.join(&self.sessions_subdir)
    }

    pub fn segments_dir(&self) -> PathBuf {
        self.video_dir.join(&self.segments_subdir)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub backend: BackendKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub command: String,
    pub voice: Option<String>,
    /// Words per minute
    pub rate: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: "espeak-ng".to_string(),
            voice: None,
            rate: 160,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "pose_coach=debug".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    pub default_user_id: String,
    pub camera: CameraConfig,
    pub storage: StorageConfig,
    pub video: VideoConfig,
    pub speech: SpeechConfig,
    pub logging: LoggingConfig,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            default_user_id: "default_user".to_string(),
            camera: CameraConfig::default(),
            storage: StorageConfig::default(),
            video: VideoConfig::default(),
            speech: SpeechConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl CoachConfig {
    pub fn from_toml_str(content: &str) -> CoachResult<Self> {
        toml::from_str(content).map_err(|e| CoachError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> CoachResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoachError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if given, otherwise defaults; then apply environment overrides
    pub fn resolve(path: Option<&Path>) -> CoachResult<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> CoachResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CoachError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoachResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(index) = lookup(ENV_CAMERA_INDEX) {
            self.camera.index = index.trim().parse().map_err(|_| {
                CoachError::Config(format!(
                    "{} must be a camera index, got '{}'",
                    ENV_CAMERA_INDEX, index
                ))
            })?;
        }
        if let Some(dir) = lookup(ENV_VIDEO_DIR) {
            self.storage.video_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.logging.filter = filter;
        }
        Ok(())
    }

    /// Create every directory the coach writes to
    pub fn ensure_dirs(&self) -> CoachResult<()> {
        for dir in [
            self.storage.sessions_dir(),
            self.storage.segments_dir(),
            self.storage.audio_dir.clone(),
            self.storage.data_dir.clone(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}
