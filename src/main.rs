//! Pose Coach command line
//!
//! - `pose-coach classify --landmarks frame.json` - score one keypoint frame
//! - `pose-coach replay --frames session.jsonl --pose "Tree Pose"` - record a
//!   session while replaying captured frames, then assemble its video
//! - `pose-coach history` - list stored sessions
//! - `pose-coach detail --session <id>` - one session with its statistics
//! - `pose-coach cameras` - list capture devices
//! - `pose-coach init-config coach.toml` - write the default configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use pose_coach::capture::{CameraFactory, TestPatternFactory};
use pose_coach::feedback::FeedbackHub;
use pose_coach::speech::{CommandSynthesizer, SpeechSynthesizer};
use pose_coach::storage::{JsonSessionStore, SessionStore};
use pose_coach::{
    ClassificationResult, CoachConfig, CoordinatorSettings, Keypoint, PoseEngine,
    SessionCoordinator,
};

#[derive(Parser)]
#[command(name = "pose-coach")]
#[command(about = "Real-time pose scoring and session recording", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single frame of keypoints and print the result as JSON
    Classify {
        /// JSON array of 33 keypoints
        #[arg(long)]
        landmarks: PathBuf,

        /// Pose to score against (e.g. "WideStance" or "Tree Pose")
        #[arg(long)]
        pose: Option<String>,
    },

    /// Run a full recorded session over frames from a JSON-lines file
    Replay {
        /// One JSON keypoint array per line
        #[arg(long)]
        frames: PathBuf,

        /// Pose practised during the session
        #[arg(long)]
        pose: String,

        /// User the session belongs to
        #[arg(long)]
        user: Option<String>,

        /// Use the synthetic camera even when a webcam backend is built in
        #[arg(long)]
        test_pattern: bool,

        /// Render the final feedback to an audio file
        #[arg(long)]
        speak: bool,
    },

    /// List stored sessions, newest first
    History {
        #[arg(long)]
        user: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        skip: usize,
    },

    /// Show one stored session, its poses and statistics
    Detail {
        #[arg(long)]
        session: String,
    },

    /// List capture devices
    Cameras {
        /// List the synthetic camera even when a webcam backend is built in
        #[arg(long)]
        test_pattern: bool,
    },

    /// Write the default configuration to a file
    InitConfig {
        #[arg(name = "PATH")]
        path: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config =
        CoachConfig::resolve(cli.config.as_deref()).context("Failed to load configuration")?;
    pose_coach::init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Classify { landmarks, pose } => classify(&landmarks, pose.as_deref()),
        Commands::Replay {
            frames,
            pose,
            user,
            test_pattern,
            speak,
        } => {
            let user = user.unwrap_or_else(|| config.default_user_id.clone());
            replay(&config, &frames, &pose, &user, test_pattern, speak).await
        }
        Commands::History { user, limit, skip } => {
            let user = user.unwrap_or_else(|| config.default_user_id.clone());
            history(&config, &user, limit, skip).await
        }
        Commands::Detail { session } => detail(&config, &session).await,
        Commands::Cameras { test_pattern } => {
            cameras(&config, test_pattern);
            Ok(())
        }
        Commands::InitConfig { path, force } => init_config(&path, force),
    }
}

fn classify(landmarks: &Path, pose: Option<&str>) -> Result<()> {
    let content = std::fs::read_to_string(landmarks)
        .with_context(|| format!("Failed to read {:?}", landmarks))?;
    let keypoints: Vec<Keypoint> = serde_json::from_str(&content)
        .with_context(|| format!("{:?} is not a keypoint array", landmarks))?;

    let result = PoseEngine::new().classify(&keypoints, pose);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn camera_factory(config: &CoachConfig, test_pattern: bool) -> Arc<dyn CameraFactory> {
    #[cfg(feature = "native-camera")]
    if !test_pattern {
        let timeout = std::time::Duration::from_millis(config.camera.startup_timeout_ms);
        return Arc::new(pose_coach::capture::NativeCameraFactory::new(timeout));
    }

    let _ = (config, test_pattern);
    Arc::new(TestPatternFactory)
}

async fn replay(
    config: &CoachConfig,
    frames: &Path,
    pose: &str,
    user: &str,
    test_pattern: bool,
    speak: bool,
) -> Result<()> {
    let engine = PoseEngine::new();
    if engine.find(pose).is_none() {
        bail!("Unknown pose '{}' (supported: {})", pose, engine.pose_names().join(", "));
    }
    config.ensure_dirs()?;

    let backend = config.video.backend.build();
    let store: Arc<dyn SessionStore> =
        Arc::new(JsonSessionStore::open(&config.storage.data_dir).await?);
    let coordinator = SessionCoordinator::new(
        CoordinatorSettings::from(config),
        camera_factory(config, test_pattern),
        backend,
        store,
    )
    .with_feedback(Arc::new(FeedbackHub::new()));

    let outcome = run_session(&coordinator, frames, pose, user).await;
    coordinator.shutdown().await;
    let (video, best) = outcome?;

    println!("{}", video.display());

    if speak {
        let synthesizer = CommandSynthesizer::new(&config.speech, config.storage.audio_dir.clone());
        let feedback = best.feedback.clone();
        match tokio::task::spawn_blocking(move || synthesizer.synthesize(&feedback)).await? {
            Ok(clip) => println!(
                "{} ({:.1}s)",
                clip.path.display(),
                clip.estimated_duration_seconds
            ),
            Err(e) => tracing::warn!("Spoken feedback unavailable: {}", e),
        }
    }
    Ok(())
}

/// Start, record one segment over every frame, stop and finalize.
/// Returns the session video and the best result seen.
async fn run_session(
    coordinator: &SessionCoordinator,
    frames: &Path,
    pose: &str,
    user: &str,
) -> Result<(PathBuf, ClassificationResult)> {
    let file = tokio::fs::File::open(frames)
        .await
        .with_context(|| format!("Failed to open {:?}", frames))?;
    let mut lines = BufReader::new(file).lines();

    let session_id = coordinator.start_session(user).await?;
    let mut feedback = coordinator.subscribe(&session_id)?;
    let listener = tokio::spawn(async move {
        while let Some(result) = feedback.recv().await {
            tracing::debug!(
                "Feedback: {} {} - {}",
                result.pose_name,
                result.score,
                result.feedback
            );
        }
    });

    coordinator.start_segment(&session_id).await?;

    let mut best: Option<ClassificationResult> = None;
    let mut line_number = 0;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let keypoints: Vec<Keypoint> = match serde_json::from_str(&line) {
            Ok(k) => k,
            Err(e) => {
                tracing::warn!("Skipping line {}: {}", line_number, e);
                continue;
            }
        };
        let result = coordinator.submit_frame(&session_id, &keypoints, Some(pose)).await?;
        if best.as_ref().map_or(true, |b| result.score > b.score) {
            best = Some(result);
        }
    }

    let Some(best) = best else {
        coordinator.teardown_session(&session_id).await?;
        bail!("{:?} contains no keypoint frames", frames);
    };

    coordinator
        .stop_segment(&session_id, &best.pose_name, best.score, &best.feedback)
        .await?;
    let video = coordinator.finalize_session(&session_id).await?;
    listener.abort();

    tracing::info!("Best: {} scored {} ({})", best.pose_name, best.score, best.feedback);
    Ok((video, best))
}

async fn history(config: &CoachConfig, user: &str, limit: usize, skip: usize) -> Result<()> {
    let store = JsonSessionStore::open(&config.storage.data_dir).await?;
    let total = store.count_sessions(user).await?;
    let entries = store.query_history(user, limit, skip).await?;

    println!("{} sessions for {}", total, user);
    for entry in entries {
        println!(
            "{}  {}  {:>3} poses  {:>6.1}s  avg {:>5.1}  {}",
            entry.session_id,
            entry.date.format("%Y-%m-%d %H:%M"),
            entry.poses_count,
            entry.duration_seconds,
            entry.avg_score,
            if entry.video_available { "video" } else { "-" }
        );
    }
    Ok(())
}

async fn detail(config: &CoachConfig, session_id: &str) -> Result<()> {
    let store = JsonSessionStore::open(&config.storage.data_dir).await?;
    let Some(document) = store.get_session(session_id).await? else {
        bail!("No stored session {}", session_id);
    };
    let stats = document.stats();

    println!("Session {} ({})", document.session_id, document.user_id);
    println!("  started   {}", document.start_time.format("%Y-%m-%d %H:%M:%S"));
    if let Some(end) = document.end_time {
        println!("  ended     {}", end.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("  duration  {:.1}s", document.duration_seconds);
    println!("  avg score {:.1}", document.avg_score);
    println!(
        "  correct   {}/{} ({:.1}%)",
        stats.correct_poses, stats.total_poses, stats.accuracy_rate
    );
    if let Some(video) = &document.final_video_path {
        println!("  video     {}", video);
    }
    for pose in &document.poses {
        println!(
            "  #{:<3} {:<14} {:>3} {}  {}",
            pose.segment_id,
            pose.pose_name,
            pose.score,
            if pose.correct { "ok" } else { "--" },
            pose.feedback
        );
    }
    Ok(())
}

fn cameras(config: &CoachConfig, test_pattern: bool) {
    let devices = camera_factory(config, test_pattern).list();
    if devices.is_empty() {
        println!("No cameras found");
    }
    for device in devices {
        let resolutions: Vec<String> = device
            .supported_resolutions
            .iter()
            .map(|r| format!("{}x{}", r.width, r.height))
            .collect();
        println!("{}  {}  [{}]", device.id, device.name, resolutions.join(", "));
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{:?} already exists (use --force to replace it)", path);
    }
    CoachConfig::default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
