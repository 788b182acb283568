use anyhow::Result;
use image::DynamicImage;
use ndarray::{s, ArrayView2, Axis, Ix2};
use ndarray::parallel::prelude::*;
use regex::Regex;

use crate::common::{DetBox, Detection};
use crate::data::{ConfigOrt, Xs, Y};
use crate::detection_runners::image_ops;
use crate::detection_runners::inference_process::InferenceProcess;
use crate::detection_runners::ort_detector::OrtEngine;
use crate::handler::Detector;
use crate::utils::COCO_NAMES;

/// Boxes narrower or shorter than this many source pixels are dropped.
const MIN_BOX_SIDE: f32 = 1.0;

/// YOLOv8 detector: output `[1, 4 + nc, anchors]`, boxes as cx/cy/w/h
/// followed by per-class scores.
#[derive(Debug)]
pub struct OrtYOLO {
    engine: OrtEngine,
    nc: usize,
    height: usize,
    width: usize,
    iou: f32,
    names: Vec<String>,
}

impl InferenceProcess for OrtYOLO {
    type Input = DynamicImage;

    fn new(options: ConfigOrt) -> Result<Self> {
        let engine = OrtEngine::new(&options)?;
        let height = engine.input_height().unwrap_or(options.model_size as usize);
        let width = engine.input_width().unwrap_or(options.model_size as usize);

        let names = resolve_names(Self::fetch_names(&engine), options.names);
        let nc = names.len();

        log::info!("YOLO input: {}x{} | classes: {}", width, height, nc);

        Ok(Self {
            engine,
            nc,
            height,
            width,
            iou: options.iou,
            names,
        })
    }

    fn preprocess(&self, x: &Self::Input) -> Result<(Xs, f32)> {
        let letterboxed = image_ops::letterbox(x, self.height as u32, self.width as u32)?;
        Ok((Xs::from(letterboxed.tensor), letterboxed.ratio))
    }

    fn inference(&mut self, xs: Xs) -> Result<Xs> {
        self.engine.run(xs)
    }

    fn postprocess(&self, xs: Xs, x0: &Self::Input, ratio: f32, threshold: f32) -> Result<Y> {
        if xs.is_empty() {
            anyhow::bail!("Model produced no outputs");
        }
        let output = &xs[0];
        if output.ndim() != 3 {
            anyhow::bail!("Expected a [batch, 4 + nc, anchors] output, got shape {:?}", output.shape());
        }
        let preds = output
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()?;

        let preds = if preds.shape()[0] == 4 + self.nc {
            preds.reversed_axes()
        } else if preds.shape()[1] == 4 + self.nc {
            preds
        } else {
            anyhow::bail!(
                "Output shape {:?} does not match {} classes",
                output.shape(),
                self.nc
            );
        };

        let decode = DecodeParams {
            ratio,
            image_width: x0.width() as f32,
            image_height: x0.height() as f32,
            threshold,
            min_box_side: MIN_BOX_SIDE,
        };
        let detections = decode_predictions(preds, &self.names, &decode);

        Ok(Y::default().with_detections(detections).apply_nms(self.iou))
    }
}

impl Detector for OrtYOLO {
    fn detect(&mut self, image: &DynamicImage, threshold: f32) -> Result<Vec<Detection>> {
        Ok(self.run(image, threshold)?.into_detections())
    }
}

impl OrtYOLO {
    fn fetch_names(engine: &OrtEngine) -> Option<Vec<String>> {
        // fetch class names from onnx metadata
        // String format: `{0: 'person', 1: 'bicycle', 2: 'sports ball', ..., 27: "yellow_lady's_slipper"}`
        let names = engine.try_fetch("names")?;
        let re = Regex::new(r#"(['"])([-()\w '"]+)(['"])"#).ok()?;
        Some(
            re.captures_iter(&names)
                .map(|x| x.extract())
                .map(|(_, [_, name, _])| name.to_string())
                .collect(),
        )
    }
}

/// Class names from the ONNX metadata, then the configured list, then COCO.
pub fn resolve_names(from_metadata: Option<Vec<String>>, configured: Option<Vec<String>>) -> Vec<String> {
    match (from_metadata, configured) {
        (Some(names), _) if !names.is_empty() => names,
        (_, Some(names)) if !names.is_empty() => names,
        _ => COCO_NAMES.iter().map(|x| x.to_string()).collect(),
    }
}

/// Geometry and filtering used to turn raw predictions into detections.
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    /// Letterbox scale that was applied to the source image.
    pub ratio: f32,
    pub image_width: f32,
    pub image_height: f32,
    pub threshold: f32,
    pub min_box_side: f32,
}

/// Decodes `[anchors, 4 + nc]` predictions (before NMS).
pub fn decode_predictions(preds: ArrayView2<f32>, names: &[String], params: &DecodeParams) -> Vec<Detection> {
    preds
        .axis_iter(Axis(0))
        .into_par_iter()
        .filter_map(|pred| {
            let (class_id, &confidence) = pred
                .slice(s![4..])
                .into_iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))?;

            // filtering low scores
            if confidence < params.threshold {
                return None;
            }

            let (cx, cy, w, h) = (
                pred[0] / params.ratio,
                pred[1] / params.ratio,
                pred[2] / params.ratio,
                pred[3] / params.ratio,
            );
            let bbox = DetBox::default()
                .with_cxcy_wh(cx, cy, w, h)
                .clamp_to(params.image_width, params.image_height);

            if bbox.width() < params.min_box_side || bbox.height() < params.min_box_side {
                return None;
            }

            let label = names.get(class_id).map(String::as_str).unwrap_or("Unknown");
            Some(
                Detection::default()
                    .with_bbox(bbox)
                    .with_confidence(confidence)
                    .with_class_id(class_id)
                    .with_label(label),
            )
        })
        .collect()
}
