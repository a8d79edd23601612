//! Uncompressed RGBA container
//!
//! Layout: a magic line, one JSON line with the [`VideoParams`], then packed
//! RGBA frames back to back. Needs no external tools, which makes it the
//! backend of choice for tests and headless replays.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::types::{FrameReader, FrameWriter, VideoBackend, VideoError, VideoFrame, VideoParams};

const MAGIC: &str = "POSECOACH-RGBA/1";

/// Raw RGBA backend
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBackend;

impl VideoBackend for RawBackend {
    fn extension(&self) -> &'static str {
        "rgba"
    }

    fn create_writer(
        &self,
        path: &Path,
        params: VideoParams,
    ) -> Result<Box<dyn FrameWriter>, VideoError> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{}", MAGIC)?;
        let header = serde_json::to_string(&params)
            .map_err(|e| VideoError::Encoding(format!("Invalid header: {}", e)))?;
        writeln!(out, "{}", header)?;

        Ok(Box::new(RawWriter {
            out,
            params,
            frame_count: 0,
        }))
    }

    fn open_reader(&self, path: &Path) -> Result<Box<dyn FrameReader>, VideoError> {
        let mut input = BufReader::new(File::open(path)?);

        let mut magic = String::new();
        input.read_line(&mut magic)?;
        if magic.trim_end() != MAGIC {
            return Err(VideoError::Decoding(format!("{:?} is not a raw RGBA stream", path)));
        }

        let mut header = String::new();
        input.read_line(&mut header)?;
        let params: VideoParams = serde_json::from_str(header.trim_end())
            .map_err(|e| VideoError::Decoding(format!("Invalid header in {:?}: {}", path, e)))?;
        params.validate()?;

        Ok(Box::new(RawReader { input, params }))
    }
}

struct RawWriter {
    out: BufWriter<File>,
    params: VideoParams,
    frame_count: u64,
}

impl FrameWriter for RawWriter {
    fn write_frame(&mut self, frame: &VideoFrame) -> Result<(), VideoError> {
        if !frame.matches(&self.params) {
            return Err(VideoError::FrameSize {
                got: frame.data.len(),
                expected: self.params.frame_size(),
            });
        }
        self.out
            .write_all(&frame.data)
            .map_err(|e| VideoError::Encoding(format!("Failed to write frame: {}", e)))?;
        self.frame_count += 1;
        Ok(())
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn finish(mut self: Box<Self>) -> Result<u64, VideoError> {
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        Ok(self.frame_count)
    }
}

struct RawReader {
    input: BufReader<File>,
    params: VideoParams,
}

impl FrameReader for RawReader {
    fn params(&self) -> VideoParams {
        self.params
    }

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, VideoError> {
        let mut data = vec![0u8; self.params.frame_size()];
        match self.input.read_exact(&mut data) {
            Ok(()) => Ok(Some(VideoFrame {
                width: self.params.width,
                height: self.params.height,
                data,
            })),
            // A truncated trailing frame ends the stream.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(VideoError::Decoding(format!("Failed to read frame: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_frames_survive_the_container() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.rgba");
        let params = VideoParams::new(3, 2, 24.0);

        let mut writer = RawBackend.create_writer(&path, params).unwrap();
        writer.write_frame(&VideoFrame::solid(3, 2, [255, 0, 0, 255])).unwrap();
        writer.write_frame(&VideoFrame::solid(3, 2, [0, 0, 255, 255])).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let mut reader = RawBackend.open_reader(&path).unwrap();
        assert_eq!(reader.params(), params);
        assert_eq!(reader.read_frame().unwrap().unwrap().pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(reader.read_frame().unwrap().unwrap().pixel(2, 1), Some([0, 0, 255, 255]));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_wrong_frame_size_is_rejected() {
        let dir = tempdir().unwrap();
        let mut writer = RawBackend
            .create_writer(&dir.path().join("clip.rgba"), VideoParams::new(4, 4, 30.0))
            .unwrap();
        let err = writer.write_frame(&VideoFrame::solid(2, 2, [0, 0, 0, 255])).unwrap_err();
        assert!(matches!(err, VideoError::FrameSize { got: 16, expected: 64 }));
        assert_eq!(writer.frame_count(), 0);
    }

    #[test]
    fn test_foreign_file_is_not_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.rgba");
        std::fs::write(&path, b"definitely not video").unwrap();
        assert!(RawBackend.open_reader(&path).is_err());
        assert!(RawBackend.open_reader(&dir.path().join("missing.rgba")).is_err());
    }

    #[test]
    fn test_absurd_header_geometry_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge.rgba");
        let header = r#"{"width":4294967295,"height":4294967295,"fps":30}"#;
        std::fs::write(&path, format!("{}\n{}\n", MAGIC, header)).unwrap();
        assert!(matches!(RawBackend.open_reader(&path), Err(VideoError::Decoding(_))));
    }

    #[test]
    fn test_truncated_tail_ends_stream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.rgba");
        let mut writer = RawBackend.create_writer(&path, VideoParams::new(2, 2, 30.0)).unwrap();
        writer.write_frame(&VideoFrame::solid(2, 2, [9, 9, 9, 255])).unwrap();
        writer.finish().unwrap();

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();

        let mut reader = RawBackend.open_reader(&path).unwrap();
        assert!(reader.read_frame().unwrap().is_some());
        assert!(reader.read_frame().unwrap().is_none());
    }
}
