use crate::layout::Roi;
use crate::matcher::SearchImage;
use crate::templates::Template;
use arena_state::Point;
use image::GrayImage;
use tracing::debug;

/// One template found inside a region, in full-frame coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub name: String,
    pub position: Point,
    /// Template size, used to draw debug boxes
    pub size: (u32, u32),
}

/// Match every template against `roi` of `gray`.
///
/// Each template contributes at most one detection (its best match), and
/// detections come out in template order. Positions are shifted from ROI to
/// frame coordinates. An ROI that lies outside the frame yields nothing.
pub fn detect_in_roi<'a, I>(gray: &GrayImage, roi: Roi, templates: I, threshold: f64) -> Vec<Detection>
where
    I: IntoIterator<Item = &'a Template>,
{
    let clamped = roi.clamp_to(gray.width(), gray.height());
    let Some(region) = roi.crop(gray) else {
        debug!("ROI {:?} is empty for a {}x{} frame", roi, gray.width(), gray.height());
        return Vec::new();
    };

    let search = SearchImage::new(&region);
    let templates: Vec<&Template> = templates.into_iter().collect();
    let detect = |template: &&Template| {
        search.find(template, threshold).map(|local| Detection {
            name: template.name().to_string(),
            position: Point::new(local.x + clamped.left, local.y + clamped.top),
            size: template.dimensions(),
        })
    };

    #[cfg(feature = "parallel")]
    let detections = {
        use rayon::prelude::*;
        templates.par_iter().filter_map(detect).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let detections = templates.iter().filter_map(detect).collect();

    detections
}
