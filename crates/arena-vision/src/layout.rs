use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Resolution the fixed regions below were measured on.
pub const REFERENCE_WIDTH: u32 = 720;
pub const REFERENCE_HEIGHT: u32 = 1280;

/// The player's hand of cards along the bottom edge.
pub const HAND_ROI: Roi = Roi::new(50, 1050, 670, 1230);

/// Area where units move and fight.
pub const BATTLEFIELD_ROI: Roi = Roi::new(0, 150, 720, 1000);

/// How far the enemy field reaches past the battlefield midline.
pub const ENEMY_FIELD_OVERLAP: u32 = 50;

/// Axis-aligned rectangle in full-frame pixels, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Roi {
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Upper half of `self` plus `overlap` pixels past the midline.
    pub fn upper_half_with_overlap(&self, overlap: u32) -> Roi {
        Roi {
            bottom: self.top + self.height() / 2 + overlap,
            ..*self
        }
    }

    /// Intersect with a `width` x `height` image. The result may be empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> Roi {
        let left = self.left.min(width);
        let top = self.top.min(height);
        Roi {
            left,
            top,
            right: self.right.min(width).max(left),
            bottom: self.bottom.min(height).max(top),
        }
    }

    /// Copy the clamped region out of `image`. `None` if nothing is left.
    pub fn crop(&self, image: &GrayImage) -> Option<GrayImage> {
        let clamped = self.clamp_to(image.width(), image.height());
        if clamped.is_empty() {
            return None;
        }
        Some(
            image::imageops::crop_imm(
                image,
                clamped.left,
                clamped.top,
                clamped.width(),
                clamped.height(),
            )
            .to_image(),
        )
    }
}

/// Enemy half of the battlefield: its upper half plus a fixed overlap.
pub fn enemy_field_roi(battlefield: Roi, overlap: u32) -> Roi {
    battlefield.upper_half_with_overlap(overlap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enemy_field_from_reference_battlefield() {
        let roi = enemy_field_roi(BATTLEFIELD_ROI, ENEMY_FIELD_OVERLAP);
        assert_eq!(roi, Roi::new(0, 150, 720, 625));
    }

    #[test]
    fn test_reference_rois_fit_reference_frame() {
        for roi in [HAND_ROI, BATTLEFIELD_ROI] {
            assert_eq!(roi.clamp_to(REFERENCE_WIDTH, REFERENCE_HEIGHT), roi);
        }
        assert_eq!(HAND_ROI.width(), 620);
        assert_eq!(HAND_ROI.height(), 180);
    }

    #[test]
    fn test_clamp_outside_image_is_empty() {
        let clamped = HAND_ROI.clamp_to(1, 1);
        assert!(clamped.is_empty());
        assert!(HAND_ROI.crop(&GrayImage::new(1, 1)).is_none());
    }

    #[test]
    fn test_crop_partially_outside() {
        let img = GrayImage::from_fn(100, 100, |x, y| image::Luma([(x + y) as u8]));
        let crop = Roi::new(90, 95, 200, 200).crop(&img).unwrap();
        assert_eq!(crop.dimensions(), (10, 5));
        assert_eq!(crop.get_pixel(0, 0)[0], 185);
    }
}
