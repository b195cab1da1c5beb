use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::filter::{Kernel, separable_filter};

use super::clahe::clahe;
use super::color::{lab_to_rgb, rgb_to_lab};
use super::config::{ContrastParams, MorphOp};
use super::morphology::{self, StructuringElement};

/// One stage of the enhancement pipeline. Stages are pure: same input, same
/// output.
pub trait EnhanceStep: Send + Sync {
    fn apply(&self, image: DynamicImage) -> DynamicImage;

    /// Human-readable name (used in logs and debug dumps)
    fn name(&self) -> &str;
}

/// Magnify by `scale` with Catmull-Rom (cubic) interpolation.
pub fn upscale(image: &RgbImage, scale: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    let scaled_w = ((width as f32 * scale).round() as u32).max(1);
    let scaled_h = ((height as f32 * scale).round() as u32).max(1);
    image::imageops::resize(image, scaled_w, scaled_h, FilterType::CatmullRom)
}

/// Run CLAHE and/or the box deblur on the Lab luminance plane, leaving
/// chrominance untouched.
pub fn enhance_luminance(
    image: &RgbImage,
    contrast: Option<ContrastParams>,
    deconv_kernel: Option<(u32, u32)>,
) -> RgbImage {
    let mut lab = rgb_to_lab(image);
    if let Some(params) = contrast {
        lab.l = clahe(&lab.l, params.clip_limit, params.tile_size);
    }
    if let Some(kernel) = deconv_kernel {
        lab.l = box_deblur(&lab.l, kernel);
    }
    lab_to_rgb(&lab)
}

/// Uniform averaging over exactly a `kw` x `kh` window anchored at
/// `(kw / 2, kh / 2)`, edges clamped. This is a blur, kept as the cheap
/// stand-in for deconvolution.
pub fn box_deblur(plane: &GrayImage, (kw, kh): (u32, u32)) -> GrayImage {
    let weights = vec![1.0 / (kw * kh) as f32; (kw * kh) as usize];
    Kernel::new(&weights, kw, kh).filter(plane, |out: &mut u8, acc: f32| {
        *out = acc.round().clamp(0.0, 255.0) as u8;
    })
}

/// Gaussian sigma for a kernel of `size` taps.
fn sigma_for_kernel(size: u32) -> f32 {
    (0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8).max(0.1)
}

/// Normalized 1-D Gaussian of exactly `size` taps. Small odd sizes use the
/// fixed binomial taps.
fn gaussian_taps(size: u32) -> Vec<f32> {
    match size {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
        _ => {
            let sigma = sigma_for_kernel(size);
            let center = (size as f32 - 1.0) * 0.5;
            let taps: Vec<f32> = (0..size)
                .map(|i| {
                    let x = i as f32 - center;
                    (-x * x / (2.0 * sigma * sigma)).exp()
                })
                .collect();
            let sum: f32 = taps.iter().sum();
            taps.into_iter().map(|t| t / sum).collect()
        }
    }
}

/// `out = orig * (1 + amount) - blurred * amount`, clamped. The blur is
/// separable with its own width along each axis.
pub fn unsharp_mask(image: &RgbImage, amount: f32, (kw, kh): (u32, u32)) -> RgbImage {
    let blurred = separable_filter(image, &gaussian_taps(kw), &gaussian_taps(kh));
    let mut out = RgbImage::new(image.width(), image.height());
    for ((orig, blur), dst) in image.pixels().zip(blurred.pixels()).zip(out.pixels_mut()) {
        *dst = Rgb(std::array::from_fn(|c| {
            let v = orig[c] as f32 * (1.0 + amount) - blur[c] as f32 * amount;
            v.round().clamp(0.0, 255.0) as u8
        }));
    }
    out
}

/// ITU-R BT.601 luma in 14-bit fixed point.
pub fn luma(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0.map(u32::from);
        Luma([((r * 4899 + g * 9617 + b * 1868 + (1 << 13)) >> 14) as u8])
    })
}

/// Global Otsu threshold: pixels above the level become 255, the rest 0.
pub fn binarize(gray: &GrayImage) -> GrayImage {
    threshold(gray, otsu_level(gray), ThresholdType::Binary)
}

pub struct ResizeStep {
    pub scale: f32,
}

impl EnhanceStep for ResizeStep {
    fn apply(&self, image: DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgb8(upscale(&image.into_rgb8(), self.scale))
    }

    fn name(&self) -> &str {
        "Resize"
    }
}

/// Contrast equalization and deconvolution share one Lab round trip.
pub struct LuminanceStep {
    pub contrast: Option<ContrastParams>,
    pub deconv_kernel: Option<(u32, u32)>,
}

impl EnhanceStep for LuminanceStep {
    fn apply(&self, image: DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgb8(enhance_luminance(
            &image.into_rgb8(),
            self.contrast,
            self.deconv_kernel,
        ))
    }

    fn name(&self) -> &str {
        "Luminance"
    }
}

pub struct SharpenStep {
    pub amount: f32,
    pub kernel_size: (u32, u32),
}

impl EnhanceStep for SharpenStep {
    fn apply(&self, image: DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgb8(unsharp_mask(
            &image.into_rgb8(),
            self.amount,
            self.kernel_size,
        ))
    }

    fn name(&self) -> &str {
        "Sharpen"
    }
}

/// Drop to one intensity channel, optionally two-level.
pub struct IntensityStep {
    pub binarize: bool,
}

impl EnhanceStep for IntensityStep {
    fn apply(&self, image: DynamicImage) -> DynamicImage {
        let gray = luma(&image.into_rgb8());
        if self.binarize {
            DynamicImage::ImageLuma8(binarize(&gray))
        } else {
            DynamicImage::ImageLuma8(gray)
        }
    }

    fn name(&self) -> &str {
        if self.binarize {
            "Binarize"
        } else {
            "Grayscale"
        }
    }
}

pub struct MorphologyStep {
    pub op: MorphOp,
    pub element: StructuringElement,
}

impl EnhanceStep for MorphologyStep {
    fn apply(&self, image: DynamicImage) -> DynamicImage {
        DynamicImage::ImageLuma8(morphology::apply(&image.into_luma8(), self.op, &self.element))
    }

    fn name(&self) -> &str {
        "Morphology"
    }
}

/// Back to three channels in RGB order, which is what the text extractor
/// reads.
pub struct ChannelNormalizeStep;

impl EnhanceStep for ChannelNormalizeStep {
    fn apply(&self, image: DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgb8(image.into_rgb8())
    }

    fn name(&self) -> &str {
        "Channel Normalization"
    }
}
