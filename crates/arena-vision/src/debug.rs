use crate::layout::Roi;
use crate::scene::Detection;
use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const ROI_HAND_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const ROI_ENEMY_COLOR: Rgb<u8> = Rgb([255, 165, 0]);
const CARD_BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const UNIT_BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const LABEL_SCALE: f32 = 14.0;
const LABEL_GAP: i32 = 2;

/// Fonts tried when no label font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load the font used for detection labels: the configured file if given,
/// otherwise the first readable system font. `None` means boxes only.
pub fn load_label_font(configured: Option<&Path>) -> Option<FontVec> {
    let candidates: Vec<PathBuf> = match configured {
        Some(path) => vec![path.to_path_buf()],
        None => SYSTEM_FONTS.iter().map(PathBuf::from).collect(),
    };
    for path in &candidates {
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                debug!("Debug labels use font {}", path.display());
                return Some(font);
            }
            Err(e) => warn!("Unusable font {}: {}", path.display(), e),
        }
    }
    debug!("No label font found; debug snapshots will have boxes only");
    None
}

/// Writes annotated copies of analyzed frames for offline inspection.
pub struct DebugSnapshots {
    output_dir: PathBuf,
    font: Option<FontVec>,
}

impl DebugSnapshots {
    pub fn new(output_dir: &Path, font_path: Option<&Path>) -> Self {
        if !output_dir.exists() {
            match std::fs::create_dir_all(output_dir) {
                Ok(()) => info!("Created debug output directory: {}", output_dir.display()),
                Err(e) => warn!("Failed to create {}: {}", output_dir.display(), e),
            }
        }
        Self {
            output_dir: output_dir.to_path_buf(),
            font: load_label_font(font_path),
        }
    }

    pub fn save_hand(
        &self,
        frame: &DynamicImage,
        roi: Roi,
        cards: &[Detection],
        timestamp_ms: u128,
    ) -> Option<PathBuf> {
        let canvas = render_overlay(
            frame,
            roi,
            ROI_HAND_COLOR,
            cards,
            CARD_BOX_COLOR,
            self.font.as_ref(),
        );
        self.write(canvas, &format!("hand_roi_debug_{}.png", timestamp_ms))
    }

    pub fn save_enemy_field(
        &self,
        frame: &DynamicImage,
        roi: Roi,
        units: &[Detection],
        timestamp_ms: u128,
    ) -> Option<PathBuf> {
        let canvas = render_overlay(
            frame,
            roi,
            ROI_ENEMY_COLOR,
            units,
            UNIT_BOX_COLOR,
            self.font.as_ref(),
        );
        self.write(canvas, &format!("enemy_field_roi_debug_{}.png", timestamp_ms))
    }

    fn write(&self, canvas: RgbImage, file_name: &str) -> Option<PathBuf> {
        let path = self.output_dir.join(file_name);
        match canvas.save(&path) {
            Ok(()) => {
                info!("Saved debug image to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Failed to save debug image {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Color frame with the ROI outlined and a template-sized box per detection.
/// With a font, each box gets its name written just above it.
pub fn render_overlay(
    frame: &DynamicImage,
    roi: Roi,
    roi_color: Rgb<u8>,
    detections: &[Detection],
    box_color: Rgb<u8>,
    font: Option<&FontVec>,
) -> RgbImage {
    let mut canvas = frame.to_rgb8();

    draw_thick_rect(
        &mut canvas,
        roi.left as i32,
        roi.top as i32,
        roi.width(),
        roi.height(),
        roi_color,
    );

    for d in detections {
        let (w, h) = d.size;
        let x = d.position.x as i32 - (w / 2) as i32;
        let y = d.position.y as i32 - (h / 2) as i32;
        draw_thick_rect(&mut canvas, x, y, w, h, box_color);
        if let Some(font) = font {
            let scale = PxScale::from(LABEL_SCALE);
            let (_, text_h) = text_size(scale, font, &d.name);
            let label_y = (y - text_h as i32 - LABEL_GAP).max(0);
            let label_x = x.max(0);
            draw_text_mut(&mut canvas, box_color, label_x, label_y, scale, font, &d.name);
        }
    }

    canvas
}

/// Two-pixel outline. Zero-sized rectangles are skipped.
fn draw_thick_rect(canvas: &mut RgbImage, x: i32, y: i32, w: u32, h: u32, color: Rgb<u8>) {
    if w == 0 || h == 0 {
        return;
    }
    draw_hollow_rect_mut(canvas, Rect::at(x, y).of_size(w, h), color);
    if w > 2 && h > 2 {
        draw_hollow_rect_mut(canvas, Rect::at(x + 1, y + 1).of_size(w - 2, h - 2), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_state::Point;

    #[test]
    fn test_overlay_outlines_roi_and_detection() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(40, 40));
        let detections = vec![Detection {
            name: "Knight".into(),
            position: Point::new(20, 20),
            size: (10, 6),
        }];
        let canvas = render_overlay(
            &frame,
            Roi::new(2, 2, 38, 38),
            ROI_HAND_COLOR,
            &detections,
            CARD_BOX_COLOR,
            None,
        );
        assert_eq!(*canvas.get_pixel(2, 2), ROI_HAND_COLOR);
        assert_eq!(*canvas.get_pixel(3, 10), ROI_HAND_COLOR);
        assert_eq!(*canvas.get_pixel(15, 17), CARD_BOX_COLOR);
        assert_eq!(*canvas.get_pixel(20, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_overlay_clips_out_of_bounds() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        let canvas = render_overlay(
            &frame,
            crate::layout::HAND_ROI,
            ROI_HAND_COLOR,
            &[],
            CARD_BOX_COLOR,
            None,
        );
        assert_eq!(canvas.dimensions(), (1, 1));
    }

    #[test]
    fn test_snapshots_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("debug");
        let snapshots = DebugSnapshots::new(&out, None);
        let frame = DynamicImage::ImageRgb8(RgbImage::new(16, 16));
        let hand = snapshots
            .save_hand(&frame, Roi::new(0, 8, 16, 16), &[], 42)
            .unwrap();
        let enemy = snapshots
            .save_enemy_field(&frame, Roi::new(0, 0, 16, 8), &[], 42)
            .unwrap();
        assert!(hand.ends_with("hand_roi_debug_42.png"));
        assert!(enemy.ends_with("enemy_field_roi_debug_42.png"));
        assert!(hand.exists() && enemy.exists());
    }

    #[test]
    fn test_label_drawn_above_box() {
        let Some(font) = load_label_font(None) else {
            // No system font on this machine.
            return;
        };
        let frame = DynamicImage::ImageRgb8(RgbImage::new(120, 80));
        let detections = vec![Detection {
            name: "Knight".into(),
            position: Point::new(40, 50),
            size: (20, 10),
        }];
        let roi = Roi::new(0, 0, 1, 1);
        let plain = render_overlay(
            &frame,
            roi,
            ROI_HAND_COLOR,
            &detections,
            CARD_BOX_COLOR,
            None,
        );
        let labeled = render_overlay(
            &frame,
            roi,
            ROI_HAND_COLOR,
            &detections,
            CARD_BOX_COLOR,
            Some(&font),
        );

        // Box top edge is row 45; the label sits in the rows above it.
        let changed_above = (0..120)
            .flat_map(|x| (2..45).map(move |y| (x, y)))
            .any(|(x, y)| plain.get_pixel(x, y) != labeled.get_pixel(x, y));
        let changed_below = (0..120)
            .flat_map(|x| (56..80).map(move |y| (x, y)))
            .any(|(x, y)| plain.get_pixel(x, y) != labeled.get_pixel(x, y));
        assert!(changed_above);
        assert!(!changed_below);
    }

    #[test]
    fn test_label_clamped_at_top_edge() {
        let Some(font) = load_label_font(None) else {
            return;
        };
        let frame = DynamicImage::ImageRgb8(RgbImage::new(60, 30));
        let detections = vec![Detection {
            name: "Hog Rider".into(),
            position: Point::new(20, 4),
            size: (16, 8),
        }];
        let canvas = render_overlay(
            &frame,
            Roi::new(0, 0, 1, 1),
            ROI_HAND_COLOR,
            &detections,
            UNIT_BOX_COLOR,
            Some(&font),
        );
        assert_eq!(canvas.dimensions(), (60, 30));
    }

    #[test]
    fn test_missing_font_path_gives_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_label_font(Some(&dir.path().join("missing.ttf"))).is_none());

        let junk = dir.path().join("junk.ttf");
        std::fs::write(&junk, b"not a font").unwrap();
        assert!(load_label_font(Some(&junk)).is_none());
    }
}
