use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

use colorfilter::capture::{self, FrameSource, ImageSequenceSource, StillImageSource};
use colorfilter::config::{parse_preset_spec, ParamsFile};
use colorfilter::render::{DirectorySink, FrameSink, LogSink, DEFAULT_DISPLAY_WIDTH};
use colorfilter::{BuiltinColor, FrameMaskPipeline, FrameOutput, Session, Settings};

#[derive(Parser)]
#[command(name = "colorfilter")]
#[command(version, about = "Isolate and count colored objects in images and camera frames")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single image
    Process {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Write original.png, mask.png and result.png here
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Process frames continuously from a camera, a directory or a still image
    #[command(group(ArgGroup::new("source").required(true).args(["camera", "frames", "image"])))]
    Watch {
        /// Capture device index
        #[arg(long, value_name = "N")]
        camera: Option<u32>,

        /// Directory of images played in name order
        #[arg(long, value_name = "DIR")]
        frames: Option<PathBuf>,

        /// Still image processed every tick
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,

        /// Write the views of each frame here
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Stop after this many ticks
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,

        /// Restart the frame directory when it runs out
        #[arg(long = "loop")]
        looping: bool,

        /// Width the written views are scaled to
        #[arg(long, value_name = "W", default_value_t = DEFAULT_DISPLAY_WIDTH)]
        display_width: u32,

        /// Keep every frame instead of overwriting
        #[arg(long)]
        history: bool,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// List the built-in colors
    Presets,
}

#[derive(Args)]
struct TuningArgs {
    /// JSON params file applied before the flags below
    #[arg(long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Color space: HSV, BGR, RGB, Lab or YCrCb
    #[arg(long, value_name = "NAME")]
    space: Option<String>,

    /// Built-in color to detect (switches to HSV)
    #[arg(long, value_name = "NAME")]
    color: Option<String>,

    /// Channel ranges, e.g. 170-10,100-255,70-255
    #[arg(long, value_name = "RANGES")]
    range: Option<String>,

    /// Add a saved color and enable multi-color mode: a built-in name or name=SPACE:RANGES
    #[arg(long = "multi", value_name = "SPEC")]
    multi: Vec<String>,

    /// Gaussian blur kernel size (0 disables)
    #[arg(long, value_name = "K")]
    blur: Option<u32>,

    /// Erosion kernel size (0 disables)
    #[arg(long, value_name = "K")]
    erode: Option<u32>,

    /// Dilation kernel size (0 disables)
    #[arg(long, value_name = "K")]
    dilate: Option<u32>,

    /// Minimum contour area
    #[arg(long, value_name = "AREA")]
    min_area: Option<f64>,

    /// Do not draw contour outlines
    #[arg(long)]
    no_contours: bool,

    /// Do not draw bounding boxes
    #[arg(long)]
    no_boxes: bool,

    /// Do not draw object centers
    #[arg(long)]
    no_center: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

impl TuningArgs {
    fn overrides(&self) -> anyhow::Result<ParamsFile> {
        let presets = self
            .multi
            .iter()
            .map(|spec| parse_preset_spec(spec))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(ParamsFile {
            space: self.space.clone(),
            color: self.color.clone(),
            range: self.range.clone(),
            multi: (!presets.is_empty()).then_some(true),
            presets,
            blur: self.blur,
            erosion: self.erode,
            dilation: self.dilate,
            min_area: self.min_area,
            show_contours: self.no_contours.then_some(false),
            show_bounding_boxes: self.no_boxes.then_some(false),
            show_center: self.no_center.then_some(false),
        })
    }

    /// Settings from the params file with the flags layered on top
    fn settings(&self) -> anyhow::Result<Settings> {
        let base = match &self.params {
            Some(path) => ParamsFile::load(path)?,
            None => ParamsFile::default(),
        };
        let mut settings = Settings::default();
        for issue in base.merge(self.overrides()?).apply(&mut settings)? {
            log::warn!("{}", issue);
        }
        log::debug!("Settings: {:?}", settings);
        Ok(settings)
    }

    fn pipeline(&self, verbose: bool) -> anyhow::Result<FrameMaskPipeline> {
        let pipeline = FrameMaskPipeline::new().with_verbose(verbose);
        match &self.debug_out {
            Some(dir) => pipeline.with_debug(dir.clone()),
            None => Ok(pipeline),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    match args.command {
        Commands::Process { image, out, tuning } => {
            let settings = tuning.settings()?;
            let pipeline = tuning.pipeline(args.verbose)?;

            log::info!("Loading image: {}", image.display());
            let raw = capture::load_rgb(&image)?;
            log::debug!("Image loaded: {}x{}", raw.width(), raw.height());

            let output = pipeline.process(&raw, &settings.snapshot());
            let status = output.status_line(&settings.status_label());
            print_detections(&output, &status);

            if let Some(dir) = out {
                DirectorySink::new(dir.clone())?.render(&output, &status)?;
                log::info!("Views written to {}", dir.display());
            }
        }

        Commands::Watch {
            camera,
            frames,
            image,
            out,
            ticks,
            looping,
            display_width,
            history,
            tuning,
        } => {
            let settings = tuning.settings()?;
            let pipeline = tuning.pipeline(args.verbose)?;

            let source: Box<dyn FrameSource> = match (camera, frames, image) {
                (Some(index), _, _) => open_camera(index)?,
                (None, Some(dir), _) => Box::new(ImageSequenceSource::open(&dir, looping)?),
                (None, None, Some(path)) => Box::new(StillImageSource::open(&path)?),
                (None, None, None) => anyhow::bail!("one of --camera, --frames or --image is required"),
            };
            let sink: Box<dyn FrameSink> = match out {
                Some(dir) => {
                    let sink = DirectorySink::new(dir)?
                        .with_display_width(Some(display_width))
                        .with_history(history);
                    log::info!("Writing views to {}", sink.dir().display());
                    Box::new(sink)
                }
                None => Box::new(LogSink),
            };

            let mut session = Session::new(settings, source, sink).with_pipeline(pipeline);
            let summary = session.run(ticks)?;

            println!("\n=== Run Summary ===");
            println!("Ticks: {}", summary.ticks);
            println!("Frames processed: {}", summary.frames);
            println!("Detections: {}", summary.detections);
            if let Some(fps) = summary.fps {
                println!("FPS: {:.1}", fps);
            }
            println!("Last status: {}", summary.last_status);
        }

        Commands::Presets => {
            println!("{:<12} {:<20} {}", "Name", "HSV range", "Swatch");
            for color in BuiltinColor::ALL {
                let preset = color.preset();
                println!("{:<12} {:<20} {}", color.name(), preset.range.to_string(), preset.swatch_hex());
            }
        }
    }

    Ok(())
}

fn print_detections(output: &FrameOutput, status: &str) {
    println!("\n=== Color Detection Results ===");
    println!("Space: {} ({})", output.space, output.space.channel_labels().join(", "));
    println!("{}", status);
    for (i, detection) in output.detections.iter().enumerate() {
        let center = detection
            .centroid
            .map(|(x, y)| format!("({}, {})", x, y))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  Object {} at ({}, {}) {}x{} - area: {:.1}, center: {}",
            i + 1,
            detection.bbox.x,
            detection.bbox.y,
            detection.width(),
            detection.height(),
            detection.area,
            center
        );
    }
}

#[cfg(feature = "camera")]
fn open_camera(index: u32) -> anyhow::Result<Box<dyn FrameSource>> {
    Ok(Box::new(capture::CameraSource::new(index)))
}

#[cfg(not(feature = "camera"))]
fn open_camera(_index: u32) -> anyhow::Result<Box<dyn FrameSource>> {
    anyhow::bail!("camera capture needs the `camera` feature (cargo build --features camera)")
}
