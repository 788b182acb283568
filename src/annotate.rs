//! Draws detections onto a copy of the source image.

use std::path::Path;
use ab_glyph::{FontVec, PxScale};
use anyhow::Context;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use crate::common::Detection;

const LINE_WIDTH: i32 = 2;
const TEXT_HEIGHT: f32 = 18.;
const TEXT_PADDING: i32 = 3;
const TEXT_COLOUR: Rgb<u8> = Rgb([255, 255, 255]);

pub fn class_colour(class: usize) -> Rgb<u8> {
    match class {
        0 => Rgb([128, 0, 128]),      // purple (people)
        1..=8 => Rgb([0, 160, 0]),    // green (vehicles)
        14..=23 => Rgb([220, 0, 0]),  // red (animals)
        _ => Rgb([0, 0, 255])         // blue (everything else)
    }
}

/// Caption drawn above a box, or `None` when both toggles are off.
pub fn caption(detection: &Detection, show_labels: bool, show_conf: bool) -> Option<String> {
    match (show_labels, show_conf) {
        (true, true) => Some(format!("{} {:.2}", detection.get_label(), detection.confidence)),
        (true, false) => Some(detection.get_label()),
        (false, true) => Some(format!("{:.2}", detection.confidence)),
        (false, false) => None,
    }
}

#[derive(Default)]
pub struct Annotator {
    font: Option<FontVec>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator").field("font", &self.font.is_some()).finish()
    }
}

impl Annotator {
    /// Loads the caption font. Without one, boxes and caption tabs are drawn but no text.
    pub fn new(font_path: Option<&Path>) -> anyhow::Result<Self> {
        let font = match font_path {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read font {}", path.display()))?;
                Some(FontVec::try_from_vec(bytes)
                    .with_context(|| format!("Invalid font file {}", path.display()))?)
            }
            None => {
                log::warn!("No font configured, annotated images will not contain text");
                None
            }
        };
        Ok(Self { font })
    }

    pub fn plot(&self, image: &DynamicImage, detections: &[Detection], show_labels: bool, show_conf: bool) -> RgbImage {
        let mut img = image.to_rgb8();
        let (img_w, img_h) = (img.width() as i32, img.height() as i32);
        if img_w == 0 || img_h == 0 {
            return img;
        }

        for det in detections {
            let (x, y, w, h) = det.bbox.as_xy_wh_i32();
            let colour = class_colour(det.class_id);

            for inset in 0..LINE_WIDTH {
                let (bw, bh) = (w - 2 * inset, h - 2 * inset);
                if bw <= 0 || bh <= 0 {
                    break;
                }
                let rect = Rect::at(x + inset, y + inset).of_size(bw as u32, bh as u32);
                draw_hollow_rect_mut(&mut img, rect, colour);
            }

            let Some(text) = caption(det, show_labels, show_conf) else {
                continue;
            };
            self.draw_caption(&mut img, &text, x, y, colour);
        }

        img
    }

    fn draw_caption(&self, img: &mut RgbImage, text: &str, x: i32, y: i32, colour: Rgb<u8>) {
        let scale = PxScale::from(TEXT_HEIGHT);
        let (text_w, text_h) = match &self.font {
            Some(font) => text_size(scale, font, text),
            None => ((text.len() as f32 * TEXT_HEIGHT * 0.5) as u32, TEXT_HEIGHT as u32),
        };
        let tab_w = text_w as i32 + 2 * TEXT_PADDING;
        let tab_h = text_h as i32 + 2 * TEXT_PADDING;

        // above the box when it fits, otherwise inside its top edge
        let tab_y = if y - tab_h >= 0 { y - tab_h } else { y.max(0) };
        let tab_x = x.clamp(0, (img.width() as i32 - 1).max(0));

        draw_filled_rect_mut(img, Rect::at(tab_x, tab_y).of_size(tab_w.max(1) as u32, tab_h.max(1) as u32), colour);
        if let Some(font) = &self.font {
            draw_text_mut(img, TEXT_COLOUR, tab_x + TEXT_PADDING, tab_y + TEXT_PADDING, scale, font, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DetBox;

    fn dog(confidence: f32) -> Detection {
        Detection::default()
            .with_class_id(16)
            .with_label("dog")
            .with_confidence(confidence)
            .with_bbox(DetBox::new(20., 40., 80., 90.))
    }

    #[test]
    fn caption_follows_toggles() {
        let det = dog(0.876);
        assert_eq!(caption(&det, true, true).as_deref(), Some("dog 0.88"));
        assert_eq!(caption(&det, true, false).as_deref(), Some("dog"));
        assert_eq!(caption(&det, false, true).as_deref(), Some("0.88"));
        assert_eq!(caption(&det, false, false), None);
    }

    #[test]
    fn plot_draws_box_outline_without_touching_the_interior() {
        let image = DynamicImage::from(RgbImage::from_pixel(100, 100, Rgb([0, 0, 0])));
        let plotted = Annotator::default().plot(&image, &[dog(0.9)], false, false);

        assert_eq!(*plotted.get_pixel(20, 60), class_colour(16));
        assert_eq!(*plotted.get_pixel(21, 60), class_colour(16));
        assert_eq!(*plotted.get_pixel(50, 60), Rgb([0, 0, 0]));
    }

    #[test]
    fn plot_without_detections_is_a_plain_copy() {
        let image = DynamicImage::from(RgbImage::from_pixel(10, 10, Rgb([7, 8, 9])));
        let plotted = Annotator::default().plot(&image, &[], true, true);
        assert_eq!(plotted, image.to_rgb8());
    }
}
