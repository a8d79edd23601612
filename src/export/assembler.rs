//! Final video assembly
//!
//! Concatenates recorded segments in order, burning the pose annotation of
//! each segment into every one of its frames.

use std::path::Path;
use std::sync::Arc;

use super::types::{MergeProgress, MergeReport, MergeStage, SkippedSegment};
use crate::recorder::SegmentDescriptor;
use crate::utils::error::{CoachError, CoachResult};
use crate::video::{AnnotationOverlay, FrameReader, FrameWriter, VideoBackend, VideoParams};

/// Merges segment files through a video backend
pub struct VideoAssembler {
    backend: Arc<dyn VideoBackend>,
}

impl VideoAssembler {
    pub fn new(backend: Arc<dyn VideoBackend>) -> Self {
        Self { backend }
    }

    /// Merge `segments` into `output`
    pub fn merge(&self, segments: &[SegmentDescriptor], output: &Path) -> CoachResult<MergeReport> {
        self.merge_with_progress(segments, output, |_| {})
    }

    /// Merge `segments` into `output`, reporting progress after each segment
    pub fn merge_with_progress<F>(
        &self,
        segments: &[SegmentDescriptor],
        output: &Path,
        progress_callback: F,
    ) -> CoachResult<MergeReport>
    where
        F: Fn(MergeProgress) + Send,
    {
        if segments.is_empty() {
            return Err(CoachError::EmptyInput("session has no recorded segments".to_string()));
        }

        let total = segments.len();
        let progress = |stage: MergeStage, done: usize| {
            progress_callback(MergeProgress {
                stage,
                segments_done: done,
                segments_total: total,
            })
        };

        tracing::info!("Merging {} segments into {:?}", total, output);
        progress(MergeStage::Preparing, 0);

        let mut writer: Option<(Box<dyn FrameWriter>, VideoParams)> = None;
        let mut report = MergeReport {
            output_path: output.to_path_buf(),
            segments_written: Vec::new(),
            skipped: Vec::new(),
            frames_written: 0,
        };

        for (done, segment) in segments.iter().enumerate() {
            progress(MergeStage::Merging { segment: segment.index }, done);

            let mut reader = match self.backend.open_reader(&segment.file_path) {
                Ok(reader) => reader,
                Err(e) => {
                    tracing::warn!(
                        "Skipping segment {} ({:?}): {}",
                        segment.index,
                        segment.file_path,
                        e
                    );
                    report.skipped.push(SkippedSegment {
                        index: segment.index,
                        reason: format!("unreadable: {}", e),
                    });
                    continue;
                }
            };

            let source = reader.params();
            if writer.is_none() {
                if let Some(parent) = output.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                tracing::info!(
                    "Output format from segment {}: {}x{} @ {}fps",
                    segment.index,
                    source.width,
                    source.height,
                    source.fps
                );
                writer = Some((self.backend.create_writer(output, source)?, source));
            }
            let Some((out, params)) = writer.as_mut() else {
                continue;
            };
            let params = *params;

            if source.width != params.width || source.height != params.height {
                tracing::warn!(
                    "Skipping segment {}: {}x{} differs from output {}x{}",
                    segment.index,
                    source.width,
                    source.height,
                    params.width,
                    params.height
                );
                report.skipped.push(SkippedSegment {
                    index: segment.index,
                    reason: format!(
                        "frame size {}x{} differs from output {}x{}",
                        source.width, source.height, params.width, params.height
                    ),
                });
                continue;
            }

            let overlay =
                AnnotationOverlay::new(&segment.pose_name, segment.score, &segment.feedback);
            let copied = copy_annotated(reader.as_mut(), out.as_mut(), &overlay, segment.index)?;
            report.frames_written += copied;
            report.segments_written.push(segment.index);
            tracing::debug!("Segment {} merged: {} frames", segment.index, copied);
        }

        let Some((out, _)) = writer else {
            return Err(CoachError::Resource(format!(
                "none of the {} segments could be read",
                total
            )));
        };

        progress(MergeStage::Finalizing, total);
        out.finish()?;
        progress(MergeStage::Complete, total);

        tracing::info!(
            "Merge complete: {} frames from {} segments written to {:?} ({} skipped)",
            report.frames_written,
            report.segments_written.len(),
            output,
            report.skipped.len()
        );
        Ok(report)
    }
}

/// Copy every frame of `reader` into `writer` with `overlay` applied
fn copy_annotated(
    reader: &mut dyn FrameReader,
    writer: &mut dyn FrameWriter,
    overlay: &AnnotationOverlay,
    index: u32,
) -> CoachResult<u64> {
    let mut copied = 0u64;
    loop {
        let mut frame = match reader.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Segment {} ended early after {} frames: {}", index, copied, e);
                break;
            }
        };
        overlay.apply(&mut frame);
        writer.write_frame(&frame)?;
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{RawBackend, VideoFrame};
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn record(
        dir: &Path,
        index: u32,
        width: u32,
        height: u32,
        frames: usize,
        score: u8,
    ) -> SegmentDescriptor {
        let path = dir.join(format!("s_segment_{}.rgba", index));
        let mut writer = RawBackend
            .create_writer(&path, VideoParams::new(width, height, 30.0))
            .unwrap();
        for _ in 0..frames {
            writer
                .write_frame(&VideoFrame::solid(width, height, [200, 200, 200, 255]))
                .unwrap();
        }
        let frame_count = writer.finish().unwrap();
        SegmentDescriptor {
            index,
            pose_name: "Warrior II".to_string(),
            score,
            feedback: "Perfect Warrior II! Your form is excellent.".to_string(),
            duration_seconds: frames as f64 / 30.0,
            file_path: path,
            frame_count,
        }
    }

    #[test]
    fn test_empty_input() {
        let dir = tempdir().unwrap();
        let assembler = VideoAssembler::new(Arc::new(RawBackend));
        let err = assembler.merge(&[], &dir.path().join("out.rgba")).unwrap_err();
        assert!(matches!(err, CoachError::EmptyInput(_)));
    }

    #[test]
    fn test_segments_concatenate_in_order() {
        let dir = tempdir().unwrap();
        let segments = vec![
            record(dir.path(), 1, 64, 48, 3, 95),
            record(dir.path(), 2, 64, 48, 2, 75),
        ];
        let output = dir.path().join("sessions").join("final.rgba");

        let report = VideoAssembler::new(Arc::new(RawBackend))
            .merge(&segments, &output)
            .unwrap();
        assert_eq!(report.segments_written, vec![1, 2]);
        assert_eq!(report.frames_written, 5);
        assert!(report.skipped.is_empty());

        let mut reader = RawBackend.open_reader(&output).unwrap();
        let mut frames = 0;
        while let Some(frame) = reader.read_frame().unwrap() {
            // Annotated: banner darkened the area under its top-right corner.
            assert_eq!(frame.pixel(53, 11), Some([80, 80, 80, 255]));
            assert_eq!(frame.pixel(2, 2), Some([200, 200, 200, 255]));
            frames += 1;
        }
        assert_eq!(frames, 5);
    }

    #[test]
    fn test_corrupt_segment_is_skipped() {
        let dir = tempdir().unwrap();
        let good = record(dir.path(), 1, 64, 48, 2, 95);
        let mut corrupt = record(dir.path(), 2, 64, 48, 2, 95);
        std::fs::write(&corrupt.file_path, b"garbage").unwrap();
        let mut missing = record(dir.path(), 3, 64, 48, 1, 95);
        missing.file_path = PathBuf::from("/nonexistent/segment.rgba");
        corrupt.pose_name = "Tree Pose".to_string();

        let report = VideoAssembler::new(Arc::new(RawBackend))
            .merge(&[good, corrupt, missing], &dir.path().join("out.rgba"))
            .unwrap();
        assert_eq!(report.segments_written, vec![1]);
        assert_eq!(report.skipped.iter().map(|s| s.index).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(report.frames_written, 2);
    }

    #[test]
    fn test_oversized_header_is_skipped() {
        let dir = tempdir().unwrap();
        let good = record(dir.path(), 1, 64, 48, 2, 95);
        let bogus = record(dir.path(), 2, 64, 48, 1, 95);
        std::fs::write(
            &bogus.file_path,
            b"POSECOACH-RGBA/1\n{\"width\":4294967295,\"height\":4294967295,\"fps\":30}\n",
        )
        .unwrap();

        let report = VideoAssembler::new(Arc::new(RawBackend))
            .merge(&[good, bogus], &dir.path().join("out.rgba"))
            .unwrap();
        assert_eq!(report.segments_written, vec![1]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 2);
        assert_eq!(report.frames_written, 2);
    }

    #[test]
    fn test_size_mismatch_is_skipped() {
        let dir = tempdir().unwrap();
        let segments = vec![
            record(dir.path(), 1, 64, 48, 1, 95),
            record(dir.path(), 2, 32, 24, 1, 95),
            record(dir.path(), 3, 64, 48, 1, 95),
        ];
        let report = VideoAssembler::new(Arc::new(RawBackend))
            .merge(&segments, &dir.path().join("out.rgba"))
            .unwrap();
        assert_eq!(report.segments_written, vec![1, 3]);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("32x24"));
    }

    #[test]
    fn test_first_readable_segment_sets_params() {
        let dir = tempdir().unwrap();
        let mut broken = record(dir.path(), 1, 64, 48, 1, 95);
        broken.file_path = dir.path().join("missing.rgba");
        let segments = vec![broken, record(dir.path(), 2, 32, 24, 2, 95)];
        let output = dir.path().join("out.rgba");

        let report = VideoAssembler::new(Arc::new(RawBackend))
            .merge(&segments, &output)
            .unwrap();
        assert_eq!(report.segments_written, vec![2]);
        assert_eq!(RawBackend.open_reader(&output).unwrap().params().width, 32);
    }

    #[test]
    fn test_nothing_readable_is_resource_error() {
        let dir = tempdir().unwrap();
        let mut segment = record(dir.path(), 1, 64, 48, 1, 95);
        segment.file_path = dir.path().join("missing.rgba");
        let err = VideoAssembler::new(Arc::new(RawBackend))
            .merge(&[segment], &dir.path().join("out.rgba"))
            .unwrap_err();
        assert!(matches!(err, CoachError::Resource(_)));
    }

    #[test]
    fn test_progress_reaches_complete() {
        let dir = tempdir().unwrap();
        let segments = vec![record(dir.path(), 1, 64, 48, 1, 95)];
        let stages = Mutex::new(Vec::new());
        VideoAssembler::new(Arc::new(RawBackend))
            .merge_with_progress(&segments, &dir.path().join("out.rgba"), |p| {
                let percent = p.percent();
                stages.lock().push((p.stage, percent))
            })
            .unwrap();
        let stages = stages.into_inner();
        assert_eq!(stages.first(), Some(&(MergeStage::Preparing, 0.0)));
        assert_eq!(stages.last(), Some(&(MergeStage::Complete, 100.0)));
        assert!(stages.iter().any(|(stage, _)| *stage == MergeStage::Merging { segment: 1 }));
    }
}
