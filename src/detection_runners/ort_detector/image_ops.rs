//! Functions to preprocess images.

use anyhow::{bail, Result};
use fast_image_resize::{
    images::{CroppedImageMut, Image as FirImage},
    pixels::PixelType,
    ResizeAlg, ResizeOptions, Resizer, FilterType,
};
use image::{DynamicImage, RgbImage};
use crate::detection_runners::input_wrapper::X;

/// Grey used by YOLO for letterbox padding.
pub const LETTERBOX_FILL: u8 = 114;

/// Letterboxed model input plus what is needed to map boxes back.
#[derive(Debug)]
pub struct Letterboxed {
    pub tensor: X,
    /// `model_side / max(src_w, src_h)`-style scale applied to the source image.
    pub ratio: f32,
}

/// Resizes `image` into a `target_w` x `target_h` canvas keeping its aspect
/// ratio (top-left aligned, padded with [`LETTERBOX_FILL`]) and returns a
/// normalized NCHW tensor of shape `[1, 3, target_h, target_w]`.
pub fn letterbox(image: &DynamicImage, target_h: u32, target_w: u32) -> Result<Letterboxed> {
    let src = to_fir_image(image.to_rgb8())?;
    if src.width() == 0 || src.height() == 0 {
        bail!("Cannot letterbox an empty image");
    }

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    let mut resizer = Resizer::new();
    let (padded, ratio) = letterbox_image(&src, target_h, target_w, LETTERBOX_FILL, &mut resizer, &options)?;
    let flat = nchw_normalize_flat(&padded)?;
    let tensor = X::from_shape_vec(&[1, 3, target_h as usize, target_w as usize], flat)?;

    Ok(Letterboxed { tensor, ratio })
}

pub fn to_fir_image<'a>(image: RgbImage) -> Result<FirImage<'a>> {
    let (width, height) = image.dimensions();
    let buffer = image.into_raw();

    Ok(FirImage::from_vec_u8(width, height, buffer, PixelType::U8x3)?)
}

fn letterbox_image<'a>(
    img: &FirImage,
    target_h: u32,
    target_w: u32,
    bg: u8,
    resizer: &mut Resizer,
    resize_options: &ResizeOptions,
) -> Result<(FirImage<'a>, f32)> {
    let (w0, h0) = (img.width(), img.height());
    let scale = (target_w as f32 / w0 as f32).min(target_h as f32 / h0 as f32);
    let new_w = ((w0 as f32 * scale).round() as u32).clamp(1, target_w);
    let new_h = ((h0 as f32 * scale).round() as u32).clamp(1, target_h);

    let mut padded = FirImage::from_vec_u8(
        target_w,
        target_h,
        vec![bg; (target_w * target_h * 3) as usize],
        PixelType::U8x3,
    )?;

    let mut cropped = CroppedImageMut::new(&mut padded, 0, 0, new_w, new_h)?;
    resizer.resize(img, &mut cropped, resize_options)?;

    Ok((padded, scale))
}

fn nchw_normalize_flat(img: &FirImage) -> Result<Vec<f32>> {
    let buf = img.buffer();
    let w = img.width() as usize;
    let h = img.height() as usize;

    if buf.len() != w * h * 3 {
        bail!("Unexpected buffer size: got {}, expected {}", buf.len(), w * h * 3);
    }

    let hw = w * h;
    let mut out = vec![0.0f32; buf.len()];

    for i in 0..hw {
        out[i] = buf[3 * i] as f32 / 255.0;              // Channel 0
        out[i + hw] = buf[3 * i + 1] as f32 / 255.0;     // Channel 1
        out[i + 2 * hw] = buf[3 * i + 2] as f32 / 255.0; // Channel 2
    }

    Ok(out)
}
