use crate::error::{ConfigError, Result};

/// Largest kernel side accepted for any stage.
pub const MAX_KERNEL_SIDE: u32 = 511;

/// Which morphological operation runs on the single-channel image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphOp {
    /// Dilate then erode. Fills small gaps in strokes.
    Close,
    /// Erode then dilate. Removes small noise specks.
    Open,
    /// Open followed by close.
    Both,
}

/// Shape of the morphological structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShape {
    Rect,
    Ellipse,
    Cross,
}

/// Localized histogram equalization parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastParams {
    /// Histogram clip limit, relative to a uniform histogram.
    pub clip_limit: f32,
    /// Tile grid as (tiles across, tiles down).
    pub tile_size: (u32, u32),
}

impl Default for ContrastParams {
    fn default() -> Self {
        Self {
            clip_limit: 3.0,
            tile_size: (8, 8),
        }
    }
}

/// Options for [`enhance`](super::enhance). Passed by reference, never
/// mutated by the enhancer.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementConfig {
    pub scale_factor: f32,
    pub apply_binarization: bool,
    pub use_contrast_equalization: bool,
    pub contrast_params: ContrastParams,
    pub use_deconvolution: bool,
    pub deconv_kernel_size: (u32, u32),
    pub use_sharpening: bool,
    pub sharpen_amount: f32,
    pub sharpen_kernel_size: (u32, u32),
    pub use_morphology: bool,
    pub morph_op: MorphOp,
    pub morph_kernel_shape: KernelShape,
    pub morph_kernel_size: (u32, u32),
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            scale_factor: 2.0,
            apply_binarization: true,
            use_contrast_equalization: true,
            contrast_params: ContrastParams::default(),
            use_deconvolution: true,
            deconv_kernel_size: (5, 5),
            use_sharpening: false,
            sharpen_amount: 1.5,
            sharpen_kernel_size: (5, 5),
            use_morphology: true,
            morph_op: MorphOp::Close,
            morph_kernel_shape: KernelShape::Ellipse,
            morph_kernel_size: (3, 3),
        }
    }
}

impl EnhancementConfig {
    pub fn builder() -> EnhancementConfigBuilder {
        EnhancementConfigBuilder::default()
    }

    /// Check every parameter the enabled stages will use.
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(ConfigError::InvalidScale(self.scale_factor));
        }
        if self.use_contrast_equalization {
            let ContrastParams {
                clip_limit,
                tile_size,
            } = self.contrast_params;
            if !clip_limit.is_finite() || clip_limit < 0.0 {
                return Err(ConfigError::InvalidClipLimit(clip_limit));
            }
            if tile_size.0 == 0 || tile_size.1 == 0 {
                return Err(ConfigError::EmptyTileGrid(tile_size.0, tile_size.1));
            }
        }
        if self.use_deconvolution {
            check_kernel("deconvolution", self.deconv_kernel_size)?;
        }
        if self.use_sharpening {
            if !self.sharpen_amount.is_finite() || self.sharpen_amount < 0.0 {
                return Err(ConfigError::InvalidSharpenAmount(self.sharpen_amount));
            }
            check_kernel("sharpening", self.sharpen_kernel_size)?;
        }
        if self.use_morphology {
            check_kernel("morphology", self.morph_kernel_size)?;
        }
        Ok(())
    }
}

fn check_kernel(name: &'static str, (width, height): (u32, u32)) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ConfigError::EmptyKernel {
            name,
            width,
            height,
        });
    }
    if width > MAX_KERNEL_SIDE || height > MAX_KERNEL_SIDE {
        return Err(ConfigError::KernelTooLarge {
            name,
            width,
            height,
            max: MAX_KERNEL_SIDE,
        });
    }
    Ok(())
}

#[derive(Default)]
pub struct EnhancementConfigBuilder {
    scale_factor: Option<f32>,
    apply_binarization: Option<bool>,
    use_contrast_equalization: Option<bool>,
    contrast_params: Option<ContrastParams>,
    use_deconvolution: Option<bool>,
    deconv_kernel_size: Option<(u32, u32)>,
    use_sharpening: Option<bool>,
    sharpen_amount: Option<f32>,
    sharpen_kernel_size: Option<(u32, u32)>,
    use_morphology: Option<bool>,
    morph_op: Option<MorphOp>,
    morph_kernel_shape: Option<KernelShape>,
    morph_kernel_size: Option<(u32, u32)>,
}

impl EnhancementConfigBuilder {
    pub fn scale_factor(mut self, scale: f32) -> Self {
        self.scale_factor = Some(scale);
        self
    }

    pub fn binarization(mut self, enabled: bool) -> Self {
        self.apply_binarization = Some(enabled);
        self
    }

    pub fn contrast_equalization(mut self, enabled: bool) -> Self {
        self.use_contrast_equalization = Some(enabled);
        self
    }

    pub fn contrast_params(mut self, clip_limit: f32, tile_size: (u32, u32)) -> Self {
        self.contrast_params = Some(ContrastParams {
            clip_limit,
            tile_size,
        });
        self
    }

    pub fn deconvolution(mut self, enabled: bool) -> Self {
        self.use_deconvolution = Some(enabled);
        self
    }

    pub fn deconv_kernel_size(mut self, size: (u32, u32)) -> Self {
        self.deconv_kernel_size = Some(size);
        self
    }

    pub fn sharpening(mut self, enabled: bool) -> Self {
        self.use_sharpening = Some(enabled);
        self
    }

    pub fn sharpen_amount(mut self, amount: f32) -> Self {
        self.sharpen_amount = Some(amount);
        self
    }

    pub fn sharpen_kernel_size(mut self, size: (u32, u32)) -> Self {
        self.sharpen_kernel_size = Some(size);
        self
    }

    pub fn morphology(mut self, enabled: bool) -> Self {
        self.use_morphology = Some(enabled);
        self
    }

    pub fn morph_op(mut self, op: MorphOp) -> Self {
        self.morph_op = Some(op);
        self
    }

    pub fn morph_kernel_shape(mut self, shape: KernelShape) -> Self {
        self.morph_kernel_shape = Some(shape);
        self
    }

    pub fn morph_kernel_size(mut self, size: (u32, u32)) -> Self {
        self.morph_kernel_size = Some(size);
        self
    }

    /// Assemble the config, failing fast on invalid parameters.
    pub fn build(self) -> Result<EnhancementConfig> {
        let default = EnhancementConfig::default();
        let config = EnhancementConfig {
            scale_factor: self.scale_factor.unwrap_or(default.scale_factor),
            apply_binarization: self.apply_binarization.unwrap_or(default.apply_binarization),
            use_contrast_equalization: self
                .use_contrast_equalization
                .unwrap_or(default.use_contrast_equalization),
            contrast_params: self.contrast_params.unwrap_or(default.contrast_params),
            use_deconvolution: self.use_deconvolution.unwrap_or(default.use_deconvolution),
            deconv_kernel_size: self.deconv_kernel_size.unwrap_or(default.deconv_kernel_size),
            use_sharpening: self.use_sharpening.unwrap_or(default.use_sharpening),
            sharpen_amount: self.sharpen_amount.unwrap_or(default.sharpen_amount),
            sharpen_kernel_size: self
                .sharpen_kernel_size
                .unwrap_or(default.sharpen_kernel_size),
            use_morphology: self.use_morphology.unwrap_or(default.use_morphology),
            morph_op: self.morph_op.unwrap_or(default.morph_op),
            morph_kernel_shape: self.morph_kernel_shape.unwrap_or(default.morph_kernel_shape),
            morph_kernel_size: self.morph_kernel_size.unwrap_or(default.morph_kernel_size),
        };
        config.validate()?;
        Ok(config)
    }
}
