//! Burned-in segment annotation
//!
//! Draws a translucent banner across the top of a frame carrying the pose
//! name, the score in its band colour and the start of the feedback text.

use super::font::{self, ADVANCE, GLYPH_HEIGHT};
use super::types::{VideoFrame, RGBA_CHANNELS};

/// Offset of the banner from the frame's top/left/right edges, in pixels
pub const BANNER_MARGIN: u32 = 10;
/// Bottom edge of the banner, in pixels from the top
pub const BANNER_BOTTOM: u32 = 150;
/// Weight of the banner fill over the underlying frame
pub const BANNER_ALPHA: f32 = 0.6;
/// Feedback longer than this many characters is cut
pub const FEEDBACK_CHARS: usize = 50;

const WHITE: [u8; 3] = [255, 255, 255];

/// Colour band for a score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Passing,
    Failing,
}

impl ScoreBand {
    pub fn for_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => ScoreBand::Excellent,
            70..=89 => ScoreBand::Passing,
            _ => ScoreBand::Failing,
        }
    }

    /// Text colour as RGB
    pub fn color(self) -> [u8; 3] {
        match self {
            ScoreBand::Excellent => [0, 255, 0],
            ScoreBand::Passing => [255, 255, 0],
            ScoreBand::Failing => [255, 0, 0],
        }
    }
}

/// Caption for every frame of one segment
#[derive(Debug, Clone)]
pub struct AnnotationOverlay {
    pose_line: String,
    score_line: String,
    feedback_line: String,
    band: ScoreBand,
}

impl AnnotationOverlay {
    pub fn new(pose_name: &str, score: u8, feedback: &str) -> Self {
        Self {
            pose_line: format!("POSE: {}", pose_name),
            score_line: format!("SCORE: {}", score),
            feedback_line: feedback.chars().take(FEEDBACK_CHARS).collect(),
            band: ScoreBand::for_score(score),
        }
    }

    pub fn feedback_line(&self) -> &str {
        &self.feedback_line
    }

    /// Draw the banner and captions onto `frame` in place
    pub fn apply(&self, frame: &mut VideoFrame) {
        let (width, height) = (frame.width, frame.height);
        if width <= BANNER_MARGIN * 2 || height <= BANNER_MARGIN * 2 {
            return;
        }

        let left = BANNER_MARGIN;
        let top = BANNER_MARGIN;
        let right = width - BANNER_MARGIN;
        let bottom = BANNER_BOTTOM.min(height - BANNER_MARGIN);

        darken(frame, left, top, right, bottom);

        // Three caption rows share the banner height; the pose line is largest.
        let unit = ((bottom - top) / 28).max(1);
        let pad = unit * 2;
        let pose_scale = unit;
        let score_scale = (unit * 4 / 5).max(1);
        let feedback_scale = (unit * 3 / 5).max(1);

        let mut y = top + pad;
        draw_text(frame, &self.pose_line, left + pad, y, pose_scale, WHITE, right, bottom);
        y += GLYPH_HEIGHT * pose_scale + pad;
        let score_color = self.band.color();
        draw_text(frame, &self.score_line, left + pad, y, score_scale, score_color, right, bottom);
        y += GLYPH_HEIGHT * score_scale + pad;
        draw_text(frame, &self.feedback_line, left + pad, y, feedback_scale, WHITE, right, bottom);
    }
}

/// Blend a black rectangle over `[left, right) x [top, bottom)`
fn darken(frame: &mut VideoFrame, left: u32, top: u32, right: u32, bottom: u32) {
    let keep = 1.0 - BANNER_ALPHA;
    let stride = frame.width as usize * RGBA_CHANNELS;
    for y in top..bottom {
        let row = y as usize * stride;
        for x in left..right {
            let idx = row + x as usize * RGBA_CHANNELS;
            if idx + 3 >= frame.data.len() {
                continue;
            }
            for channel in &mut frame.data[idx..idx + 3] {
                *channel = (*channel as f32 * keep).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Render `text` with its top-left corner at (`x`, `y`), clipped to `max_x`/`max_y`
#[allow(clippy::too_many_arguments)]
fn draw_text(
    frame: &mut VideoFrame,
    text: &str,
    x: u32,
    y: u32,
    scale: u32,
    color: [u8; 3],
    max_x: u32,
    max_y: u32,
) {
    let stride = frame.width as usize * RGBA_CHANNELS;
    for (i, c) in text.chars().enumerate() {
        let origin_x = x + i as u32 * ADVANCE * scale;
        if origin_x >= max_x {
            break;
        }
        for row in 0..GLYPH_HEIGHT {
            for col in 0..font::GLYPH_WIDTH {
                if !font::is_set(c, col, row) {
                    continue;
                }
                for dy in 0..scale {
                    let py = y + row * scale + dy;
                    if py >= max_y {
                        continue;
                    }
                    for dx in 0..scale {
                        let px = origin_x + col * scale + dx;
                        if px >= max_x {
                            continue;
                        }
                        let idx = py as usize * stride + px as usize * RGBA_CHANNELS;
                        if idx + 3 >= frame.data.len() {
                            continue;
                        }
                        frame.data[idx..idx + 3].copy_from_slice(&color);
                    }
                }
            }
        }
    }
}
