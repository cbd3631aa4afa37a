use colorfilter::capture::load_rgb;
use colorfilter::detection::steps::*;
use colorfilter::{
    build_standard_pipeline, BlurParam, BuiltinColor, ColorSpace, ContourFilterParams,
    MorphologyParams, Pipeline, PipelineParams, RangeSelection,
};
use std::env;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image_path>", args[0]);
        std::process::exit(1);
    }

    let img = load_rgb(Path::new(&args[1]))?;
    println!("Loaded image: {}x{}", img.width(), img.height());

    // Example 1: Standard pipeline, one built-in color
    println!("\n=== Standard Pipeline (Blue) ===");
    let params = PipelineParams {
        ranges: RangeSelection::Single(BuiltinColor::Blue.range()),
        ..PipelineParams::default()
    };
    let output = build_standard_pipeline(&params).with_verbose(true).run(&img);
    println!("{}", output.status_line("Blue"));
    for (i, detection) in output.detections.iter().take(10).enumerate() {
        println!(
            "  {}: at ({}, {}) {}x{} area={:.1}",
            i + 1,
            detection.bbox.x,
            detection.bbox.y,
            detection.width(),
            detection.height(),
            detection.area
        );
    }

    // Example 2: Custom pipeline, every warm color at once and heavier cleanup
    println!("\n\n=== Custom Pipeline (Warm Colors) ===");
    let warm = [BuiltinColor::Red, BuiltinColor::RedWrap, BuiltinColor::Orange, BuiltinColor::Yellow];
    let custom_pipeline = Pipeline::new()
        .add_step_boxed(Box::new(ConvertStep { space: ColorSpace::Hsv }))
        .add_step_boxed(Box::new(BlurStep { blur: BlurParam { kernel: 7 } })) // More blur
        .add_step_boxed(Box::new(ThresholdStep {
            ranges: RangeSelection::Multi(warm.iter().map(|c| c.preset()).collect()),
        }))
        .add_step_boxed(Box::new(MorphologyStep {
            params: MorphologyParams { erosion: 5, dilation: 5 },
        }))
        .add_step_boxed(Box::new(ContourStep { min_area: 2000.0 })) // Larger min area
        .add_step_boxed(Box::new(AnnotateStep {
            params: ContourFilterParams::default(),
        }));

    let custom_output = custom_pipeline.run(&img);
    println!("Custom pipeline found {} warm object(s)", custom_output.count);

    // Example 3: Partial execution, stop after thresholding
    println!("\n\n=== Partial Pipeline (Stop After Threshold) ===");
    let partial = build_standard_pipeline(&params).run_partial(&img, 3);
    let selected = partial.mask.pixels().filter(|p| p[0] > 0).count();
    println!("Raw mask selects {} pixel(s) in {}", selected, partial.space);

    // Could save this for debugging:
    // partial.mask.save("debug_mask.png")?;

    Ok(())
}
