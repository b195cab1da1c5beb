//! The run loop: frames from a [`FrameSource`] go through detection and the
//! [`FramePipeline`] on a blocking thread, annotated frames go to an optional
//! [`FrameSink`], and accepted plates go to a single record-writer task.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use image::{ImageFormat, RgbImage};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::detection::PlateDetector;
use crate::pipeline::FramePipeline;

/// Produces frames until exhausted (`Ok(None)`).
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Receives every processed frame, annotated.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;
}

/// A single image, or every image in a directory in file-name order.
pub struct ImageSequenceSource {
    pending: VecDeque<PathBuf>,
}

impl ImageSequenceSource {
    pub fn open(path: &Path) -> Result<Self> {
        let pending = if path.is_dir() {
            let mut paths = Vec::new();
            for entry in std::fs::read_dir(path)? {
                let entry_path = entry?.path();
                if entry_path.is_file() && ImageFormat::from_path(&entry_path).is_ok() {
                    paths.push(entry_path);
                }
            }
            paths.sort();
            paths.into()
        } else if path.is_file() {
            VecDeque::from([path.to_path_buf()])
        } else {
            return Err(anyhow!("Input not found: {}", path.display()));
        };

        info!(input = %path.display(), frames = pending.len(), "Opened image sequence");
        Ok(Self { pending })
    }

    /// Frames not yet read.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        debug!(path = %path.display(), "Reading frame");
        let image = image::open(&path)
            .map_err(|e| anyhow!("Failed to decode image {}: {}", path.display(), e))?;
        Ok(Some(image.into_rgb8()))
    }
}

/// Writes frames as `frame_NNNNNN.png` into a directory.
pub struct PngSequenceSink {
    dir: PathBuf,
    next_index: usize,
}

impl PngSequenceSink {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self { dir, next_index: 0 })
    }
}

impl FrameSink for PngSequenceSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.png", self.next_index));
        frame
            .save(&path)
            .map_err(|e| anyhow!("Failed to save frame {}: {}", path.display(), e))?;
        self.next_index += 1;
        Ok(())
    }
}

/// Sole writer of the plate record. Lines arrive over a bounded channel and
/// are appended in arrival order.
pub struct RecordWriter {
    sender: mpsc::Sender<String>,
    worker: JoinHandle<Result<usize>>,
}

impl RecordWriter {
    pub async fn open(path: &Path, capacity: usize) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open plate record {}", path.display()))?;

        let (sender, mut rx) = mpsc::channel::<String>(capacity.max(1));
        let worker = tokio::spawn(async move {
            let mut written: usize = 0;
            while let Some(plate) = rx.recv().await {
                file.write_all(plate.as_bytes()).await?;
                file.write_all(b"\n").await?;
                file.flush().await?;
                written += 1;
            }
            Ok::<_, anyhow::Error>(written)
        });

        Ok(Self { sender, worker })
    }

    pub fn sender(&self) -> mpsc::Sender<String> {
        self.sender.clone()
    }

    /// Close the channel, wait for queued lines to be written and return
    /// how many were.
    pub async fn shutdown(self) -> Result<usize> {
        drop(self.sender);
        self.worker
            .await
            .map_err(|e| anyhow!("Plate record writer failed: {}", e))?
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub plates: usize,
}

pub struct Runner {
    source: Box<dyn FrameSource>,
    detector: Box<dyn PlateDetector>,
    pipeline: FramePipeline,
    sink: Option<Box<dyn FrameSink>>,
    stop: Arc<AtomicBool>,
    channel_capacity: usize,
}

impl Runner {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn PlateDetector>,
        pipeline: FramePipeline,
    ) -> Self {
        Self {
            source,
            detector,
            pipeline,
            sink: None,
            stop: Arc::new(AtomicBool::new(false)),
            channel_capacity: 64,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Checked between frames; once set, the run ends after the current frame.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Process frames until the source is exhausted or the stop flag is
    /// set, appending accepted plates to `record_path`.
    pub async fn run(self, record_path: &Path) -> Result<RunSummary> {
        let writer = RecordWriter::open(record_path, self.channel_capacity).await?;
        let tx = writer.sender();

        let Runner {
            mut source,
            mut detector,
            pipeline,
            mut sink,
            stop,
            ..
        } = self;

        let frame_loop = tokio::task::spawn_blocking(move || -> Result<RunSummary> {
            let mut summary = RunSummary::default();
            while !stop.load(Ordering::Relaxed) {
                let Some(mut frame) = source.next_frame()? else {
                    info!("Frame source exhausted");
                    break;
                };

                let detections = detector.detect(&frame)?;
                let plates = pipeline.process_frame(&mut frame, &detections)?;
                for plate in plates {
                    info!(plate = %plate, "Plate accepted");
                    tx.blocking_send(plate.as_str().to_string())
                        .map_err(|_| anyhow!("Plate record writer stopped"))?;
                    summary.plates += 1;
                }

                if let Some(sink) = sink.as_mut() {
                    sink.write_frame(&frame)?;
                }
                summary.frames += 1;
            }
            if stop.load(Ordering::Relaxed) {
                warn!(frames = summary.frames, "Stopped before the source was exhausted");
            }
            Ok(summary)
        });

        let loop_result = frame_loop
            .await
            .map_err(|e| anyhow!("Frame loop failed: {}", e))?;
        let written = writer.shutdown().await?;
        let summary = loop_result?;
        debug!(written, "Plate record closed");

        info!(frames = summary.frames, plates = summary.plates, "Run finished");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_source_reads_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, width) in [("b.png", 2), ("a.png", 1), ("c.png", 3)] {
            RgbImage::new(width, 1).save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.remaining(), 3);
        let widths: Vec<u32> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.width())
            .collect();
        assert_eq!(widths, vec![1, 2, 3]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequenceSource::open(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn png_sink_numbers_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSequenceSink::new(dir.path().join("out")).unwrap();
        sink.write_frame(&RgbImage::new(2, 2)).unwrap();
        sink.write_frame(&RgbImage::new(2, 2)).unwrap();
        assert!(dir.path().join("out/frame_000000.png").is_file());
        assert!(dir.path().join("out/frame_000001.png").is_file());
    }

    #[tokio::test]
    async fn record_writer_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plates.txt");
        std::fs::write(&path, "OLD1\n").unwrap();

        let writer = RecordWriter::open(&path, 2).await.unwrap();
        let tx = writer.sender();
        tx.send("A123456".to_string()).await.unwrap();
        tx.send("AB12345".to_string()).await.unwrap();
        drop(tx);
        assert_eq!(writer.shutdown().await.unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "OLD1\nA123456\nAB12345\n");
    }
}
