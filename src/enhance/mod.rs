//! Region enhancement for text extraction.
//!
//! A cropped plate region goes through a fixed sequence of optional stages
//! (upscale, Lab luminance equalization and deblur, unsharp mask,
//! intensity/binarization, morphology) and always comes back as a
//! three-channel RGB image. Which stages run is decided by
//! [`EnhancementConfig`].

pub mod clahe;
pub mod color;
pub mod config;
pub mod morphology;
pub mod steps;

use image::{DynamicImage, RgbImage};

use crate::error::Result;
pub use config::{ContrastParams, EnhancementConfig, EnhancementConfigBuilder, KernelShape, MorphOp};
use morphology::StructuringElement;
use steps::*;

/// An enhancement pipeline built once from a validated config.
pub struct Enhancer {
    steps: Vec<Box<dyn EnhanceStep>>,
}

impl Enhancer {
    pub fn new(config: &EnhancementConfig) -> Result<Self> {
        config.validate()?;

        let mut steps: Vec<Box<dyn EnhanceStep>> = Vec::new();
        if config.scale_factor != 1.0 {
            steps.push(Box::new(ResizeStep {
                scale: config.scale_factor,
            }));
        }
        if config.use_contrast_equalization || config.use_deconvolution {
            steps.push(Box::new(LuminanceStep {
                contrast: config
                    .use_contrast_equalization
                    .then_some(config.contrast_params),
                deconv_kernel: config.use_deconvolution.then_some(config.deconv_kernel_size),
            }));
        }
        if config.use_sharpening {
            steps.push(Box::new(SharpenStep {
                amount: config.sharpen_amount,
                kernel_size: config.sharpen_kernel_size,
            }));
        }
        steps.push(Box::new(IntensityStep {
            binarize: config.apply_binarization,
        }));
        if config.use_morphology {
            steps.push(Box::new(MorphologyStep {
                op: config.morph_op,
                element: StructuringElement::new(
                    config.morph_kernel_shape,
                    config.morph_kernel_size,
                ),
            }));
        }
        steps.push(Box::new(ChannelNormalizeStep));

        Ok(Self { steps })
    }

    /// Names of the stages that will run, in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, region: &RgbImage) -> RgbImage {
        self.run_inspect(region, |_, _| {})
    }

    /// Like [`run`](Self::run), handing every intermediate result to
    /// `inspect` along with the stage name.
    pub fn run_inspect<F>(&self, region: &RgbImage, mut inspect: F) -> RgbImage
    where
        F: FnMut(&str, &DynamicImage),
    {
        if region.width() == 0 || region.height() == 0 {
            return region.clone();
        }

        let mut image = DynamicImage::ImageRgb8(region.clone());
        for step in &self.steps {
            image = step.apply(image);
            inspect(step.name(), &image);
        }
        image.into_rgb8()
    }
}

/// Enhance one region with `config`. Fails only on an invalid config.
pub fn enhance(region: &RgbImage, config: &EnhancementConfig) -> Result<RgbImage> {
    Ok(Enhancer::new(config)?.run(region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn default_stage_order() {
        let enhancer = Enhancer::new(&EnhancementConfig::default()).unwrap();
        assert_eq!(
            enhancer.step_names(),
            vec!["Resize", "Luminance", "Binarize", "Morphology", "Channel Normalization"]
        );
    }

    #[test]
    fn minimal_stage_order() {
        let config = EnhancementConfig {
            scale_factor: 1.0,
            apply_binarization: false,
            use_contrast_equalization: false,
            use_deconvolution: false,
            use_morphology: false,
            ..EnhancementConfig::default()
        };
        let enhancer = Enhancer::new(&config).unwrap();
        assert_eq!(enhancer.step_names(), vec!["Grayscale", "Channel Normalization"]);
    }

    #[test]
    fn invalid_scale_fails_fast() {
        let config = EnhancementConfig {
            scale_factor: 0.0,
            ..EnhancementConfig::default()
        };
        let region = RgbImage::new(4, 4);
        assert_eq!(enhance(&region, &config), Err(ConfigError::InvalidScale(0.0)));
    }

    #[test]
    fn inspect_sees_every_stage() {
        let enhancer = Enhancer::new(&EnhancementConfig::default()).unwrap();
        let mut seen = Vec::new();
        enhancer.run_inspect(&RgbImage::new(6, 3), |name, _| seen.push(name.to_string()));
        assert_eq!(seen, enhancer.step_names());
    }
}
