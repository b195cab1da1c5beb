use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, ValueEnum};

use platereader::detection::ocr::{OcrsExtractor, default_model_dir};
use platereader::detection::PlateDetector;
use platereader::enhance::{EnhancementConfig, KernelShape, MorphOp};
use platereader::logger::{self, info, warn};
use platereader::{FramePipeline, FullFrameDetector, ImageSequenceSource, PngSequenceSink, Runner};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MorphArg {
    Close,
    Open,
    Both,
    None,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShapeArg {
    Rect,
    Ellipse,
    Cross,
}

impl From<ShapeArg> for KernelShape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Rect => KernelShape::Rect,
            ShapeArg::Ellipse => KernelShape::Ellipse,
            ShapeArg::Cross => KernelShape::Cross,
        }
    }
}

#[derive(Parser)]
#[command(name = "platereader")]
#[command(about = "Detect, enhance and read license plates in image frames")]
struct Cli {
    /// Image file or directory of frames
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Append accepted plates to this file, one per line
    #[arg(long, value_name = "FILE", default_value = "plates.txt")]
    output_record: PathBuf,

    /// Write annotated frames to this directory
    #[arg(long, value_name = "DIR")]
    annotated_out: Option<PathBuf>,

    /// Save enhanced regions to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Directory holding the ocrs models (defaults to ~/.cache/ocrs)
    #[arg(long, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// YOLO plate detector model; without it every frame is one plate
    #[cfg(feature = "yolo")]
    #[arg(long, value_name = "FILE")]
    detector_model: Option<PathBuf>,

    /// Upscale factor applied to each region
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// Keep grayscale instead of Otsu binarization
    #[arg(long)]
    no_binarize: bool,

    /// Skip CLAHE on the luminance channel
    #[arg(long)]
    no_clahe: bool,

    /// Skip the luminance deblur
    #[arg(long)]
    no_deconv: bool,

    /// Enable unsharp masking with this amount
    #[arg(long, value_name = "AMOUNT")]
    sharpen: Option<f32>,

    /// Morphological cleanup after binarization
    #[arg(long, value_enum, default_value = "close")]
    morph: MorphArg,

    /// Structuring element shape for --morph
    #[arg(long, value_enum, default_value = "ellipse")]
    morph_shape: ShapeArg,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn enhancement_config(&self) -> anyhow::Result<EnhancementConfig> {
        let mut builder = EnhancementConfig::builder()
            .scale_factor(self.scale)
            .binarization(!self.no_binarize)
            .contrast_equalization(!self.no_clahe)
            .deconvolution(!self.no_deconv)
            .morph_kernel_shape(self.morph_shape.into());

        if let Some(amount) = self.sharpen {
            builder = builder.sharpening(true).sharpen_amount(amount);
        }
        builder = match self.morph {
            MorphArg::Close => builder.morph_op(MorphOp::Close),
            MorphArg::Open => builder.morph_op(MorphOp::Open),
            MorphArg::Both => builder.morph_op(MorphOp::Both),
            MorphArg::None => builder.morphology(false),
        };

        Ok(builder.build()?)
    }

    fn detector(&self) -> anyhow::Result<Box<dyn PlateDetector>> {
        #[cfg(feature = "yolo")]
        if let Some(path) = &self.detector_model {
            use platereader::detection::yolo::{YoloParams, YoloPlateDetector};
            return Ok(Box::new(YoloPlateDetector::load(path, YoloParams::default())?));
        }
        Ok(Box::new(FullFrameDetector))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    logger::init(args.verbose);

    let config = args.enhancement_config()?;
    info!(?config, "Enhancement configured");

    let model_dir = match &args.model_dir {
        Some(dir) => dir.clone(),
        None => default_model_dir()?,
    };
    let extractor = OcrsExtractor::from_model_dir(&model_dir)?;

    let mut pipeline = FramePipeline::new(Box::new(extractor), &config)?;
    if let Some(dir) = &args.debug_out {
        pipeline = pipeline.with_debug(dir.clone())?;
        info!(dir = %dir.display(), "Saving enhanced regions");
    }

    let source = ImageSequenceSource::open(&args.input)?;
    let stop = Arc::new(AtomicBool::new(false));
    let mut runner = Runner::new(Box::new(source), args.detector()?, pipeline)
        .with_stop_flag(stop.clone());
    if let Some(dir) = &args.annotated_out {
        runner = runner.with_sink(Box::new(PngSequenceSink::new(dir.clone())?));
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing current frame");
            stop.store(true, Ordering::Relaxed);
        }
    });

    let summary = runner.run(&args.output_record).await?;
    println!(
        "Processed {} frame(s), accepted {} plate(s) -> {}",
        summary.frames,
        summary.plates,
        args.output_record.display()
    );

    Ok(())
}
