//! FFmpeg encoder and decoder wrappers
//!
//! Frames travel as raw RGBA over the child process pipes: the encoder reads
//! them from stdin and produces H.264 MP4, the decoder writes them to stdout.

use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use super::types::{FrameReader, FrameWriter, VideoBackend, VideoError, VideoFrame, VideoParams};

/// Encoder settings and tool locations
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub preset: String,
    pub crf: u8,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            preset: "veryfast".to_string(),
            crf: 20,
        }
    }
}

impl FfmpegBackend {
    /// Whether the ffmpeg binary can be executed
    pub fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn encoder_args(&self, output: &Path, params: VideoParams) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgba".to_string(),
            "-s".to_string(),
            format!("{}x{}", params.width, params.height),
            "-r".to_string(),
            params.fps.to_string(),
            "-i".to_string(),
            "-".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Width, height and frame rate of a file, as reported by ffprobe
    fn inspect(&self, path: &Path) -> Result<VideoParams, VideoError> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate",
                "-of",
                "csv=p=0",
            ])
            .arg(path)
            .output()
            .map_err(|e| VideoError::Ffmpeg(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::Ffmpeg(format!("ffprobe failed: {}", stderr.trim())));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl VideoBackend for FfmpegBackend {
    fn extension(&self) -> &'static str {
        "mp4"
    }

    fn create_writer(
        &self,
        path: &Path,
        params: VideoParams,
    ) -> Result<Box<dyn FrameWriter>, VideoError> {
        let args = self.encoder_args(path, params);
        tracing::debug!("Starting FFmpeg encoder: {:?}", args);

        let mut process = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::Ffmpeg(format!("Failed to start FFmpeg encoder: {}", e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| VideoError::Ffmpeg("Failed to capture FFmpeg stdin".to_string()))?;

        Ok(Box::new(VideoEncoder {
            process,
            stdin,
            params,
            frame_count: 0,
        }))
    }

    fn open_reader(&self, path: &Path) -> Result<Box<dyn FrameReader>, VideoError> {
        let params = self.inspect(path)?;
        params.validate()?;

        tracing::info!(
            "Opening video decoder for {:?}: {}x{} @ {}fps",
            path,
            params.width,
            params.height,
            params.fps
        );

        // -s keeps the output at the reported size without padding.
        let mut process = Command::new(&self.ffmpeg)
            .args(["-loglevel", "error", "-i"])
            .arg(path)
            .args([
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{}x{}", params.width, params.height),
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::Ffmpeg(format!("Failed to start FFmpeg decoder: {}", e)))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| VideoError::Ffmpeg("Failed to capture FFmpeg stdout".to_string()))?;

        Ok(Box::new(VideoDecoder {
            process,
            stdout: BufReader::with_capacity(params.frame_size() * 2, stdout),
            params,
            frames_read: 0,
        }))
    }
}

/// Parse `width,height,num/den` as printed by ffprobe
fn parse_probe_output(stdout: &str) -> Result<VideoParams, VideoError> {
    let parts: Vec<&str> = stdout.trim().split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return Err(VideoError::Ffmpeg(format!("Unexpected ffprobe output: {}", stdout)));
    }

    let width: u32 = parts[0]
        .parse()
        .map_err(|_| VideoError::Ffmpeg("Invalid width".to_string()))?;
    let height: u32 = parts[1]
        .parse()
        .map_err(|_| VideoError::Ffmpeg("Invalid height".to_string()))?;

    // "30/1" or "30000/1001"
    let fps = match parts[2].split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().unwrap_or(30.0);
            let den: f64 = den.parse().unwrap_or(1.0);
            if den > 0.0 {
                num / den
            } else {
                30.0
            }
        }
        None => parts[2].parse().unwrap_or(30.0),
    };

    Ok(VideoParams::new(width, height, fps))
}

/// Video decoder reading RGBA frames from an FFmpeg child
pub struct VideoDecoder {
    process: Child,
    stdout: BufReader<ChildStdout>,
    params: VideoParams,
    frames_read: u64,
}

impl FrameReader for VideoDecoder {
    fn params(&self) -> VideoParams {
        self.params
    }

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, VideoError> {
        let mut buffer = vec![0u8; self.params.frame_size()];

        match self.stdout.read_exact(&mut buffer) {
            Ok(()) => {
                self.frames_read += 1;
                Ok(Some(VideoFrame {
                    width: self.params.width,
                    height: self.params.height,
                    data: buffer,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(VideoError::Decoding(format!("Failed to read frame: {}", e))),
        }
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Video encoder writing RGBA frames into an FFmpeg child
pub struct VideoEncoder {
    process: Child,
    stdin: ChildStdin,
    params: VideoParams,
    frame_count: u64,
}

impl FrameWriter for VideoEncoder {
    fn write_frame(&mut self, frame: &VideoFrame) -> Result<(), VideoError> {
        if !frame.matches(&self.params) {
            return Err(VideoError::FrameSize {
                got: frame.data.len(),
                expected: self.params.frame_size(),
            });
        }
        self.stdin
            .write_all(&frame.data)
            .map_err(|e| VideoError::Encoding(format!("Failed to write frame: {}", e)))?;
        self.frame_count += 1;
        Ok(())
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn finish(self: Box<Self>) -> Result<u64, VideoError> {
        let VideoEncoder {
            process,
            stdin,
            frame_count,
            ..
        } = *self;

        // EOF on stdin lets FFmpeg flush and exit.
        drop(stdin);

        let output = process
            .wait_with_output()
            .map_err(|e| VideoError::Ffmpeg(format!("Failed to wait for FFmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::Ffmpeg(format!("FFmpeg exited with error: {}", stderr.trim())));
        }

        tracing::info!("FFmpeg encoder finished: {} frames written", frame_count);
        Ok(frame_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_integer_rate() {
        let params = parse_probe_output("1920,1080,30/1\n").unwrap();
        assert_eq!(params, VideoParams::new(1920, 1080, 30.0));
    }

    #[test]
    fn test_parse_probe_ntsc_rate() {
        let params = parse_probe_output("640,480,30000/1001").unwrap();
        assert!((params.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_probe_rejects_garbage() {
        assert!(parse_probe_output("").is_err());
        assert!(parse_probe_output("wide,480,30/1").is_err());
    }

    #[test]
    fn test_encoder_args_describe_input_and_output() {
        let backend = FfmpegBackend::default();
        let args =
            backend.encoder_args(Path::new("/tmp/out.mp4"), VideoParams::new(320, 240, 15.0));
        assert!(args.windows(2).any(|w| w[0] == "-s" && w[1] == "320x240"));
        assert!(args.windows(2).any(|w| w[0] == "-r" && w[1] == "15"));
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx264"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }
}
