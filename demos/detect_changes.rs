//! Change Detection Example
//!
//! Compares two captures of the same area and prints the change report.
//!
//! Run with: cargo run --example detect_changes -- <before> <after> [output_dir] [threshold_factor]

use std::{env, fs, path::Path};

use env_logger::{Builder, Env};
use raster_change::{
    AnalysisType, ChangeDetector, DetectionConfig,
    error::Result,
    raster::loader::RasterLoader,
    report::visualization::Visualizer,
};

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        println!("Raster Change Detection Example");
        println!("===============================");
        println!();
        println!("Usage: {} <before> <after> [output_dir] [threshold_factor]", args[0]);
        println!();
        println!("Arguments:");
        println!("  before            - Earlier capture (multi-band TIFF or any RGB image)");
        println!("  after             - Later capture of the same area, same size");
        println!("  output_dir        - Where to write images (default: ./output)");
        println!("  threshold_factor  - k in mean + k*std, lower is more sensitive (default: 1.0)");
        return Ok(());
    }

    let before_path = &args[1];
    let after_path = &args[2];
    let output_dir = args.get(3).map(|s| s.as_str()).unwrap_or("./output");
    let threshold_factor = match args.get(4) {
        Some(k) => k.parse::<f64>().unwrap_or_else(|_| {
            eprintln!("Error: threshold factor '{}' is not a number", k);
            std::process::exit(1);
        }),
        None => 1.0,
    };

    for path in [before_path, after_path] {
        if !Path::new(path).exists() {
            eprintln!("Error: image file '{}' not found", path);
            std::process::exit(1);
        }
    }

    fs::create_dir_all(output_dir)?;

    let map_path = Path::new(output_dir).join("change_map.png");
    let config = DetectionConfig {
        threshold_factor,
        change_map: Some(map_path),
        ..DetectionConfig::default()
    };
    let detector = ChangeDetector::new().with_config(config);

    println!("📁 Before: {}", before_path);
    println!("📁 After:  {}", after_path);
    println!("📂 Output: {}", output_dir);
    println!();

    let (before, after, pathway) = RasterLoader::new().load_pair(before_path, after_path)?;
    println!("🔍 Loaded {:?} pair ({}x{}, {} bands)", pathway, before.width(), before.height(), before.band_count());
    println!();

    let report = detector.analyze(&before, &after)?;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    match report.analysis_type {
        AnalysisType::SatelliteIndices => println!("SPECTRAL INDEX ANALYSIS"),
        AnalysisType::RgbBased => println!("RGB ANALYSIS (lower confidence)"),
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if let Some(ref vegetation) = report.vegetation_changes {
        println!("  Vegetation loss:    {:.2}%", vegetation.loss_percentage);
        println!("  Vegetation gain:    {:.2}%", vegetation.gain_percentage);
        println!("  Mean NDVI change:   {:+.4}", vegetation.mean_ndvi_change);
    }
    if let Some(ref urban) = report.urban_changes {
        println!("  Urban growth:       {:.2}%", urban.growth_percentage);
        println!("  Urban decline:      {:.2}%", urban.decline_percentage);
        println!("  Mean NDBI change:   {:+.4}", urban.mean_ndbi_change);
    }
    if let (Some(channels), Some(change_type)) = (report.channel_changes, report.change_type) {
        println!(
            "  Channel changes:    r={:.2}% g={:.2}% b={:.2}%",
            channels.red, channels.green, channels.blue
        );
        println!("  Change type:        {}", change_type);
    }
    if let Some(breakdown) = report.threshold_breakdown {
        println!(
            "  Changed samples:    >10: {:.0}  >20: {:.0}  >30: {:.0}",
            breakdown.above_10, breakdown.above_20, breakdown.above_30
        );
    }

    println!("  Pixel change:       {:.2}%", report.pixel_change_percentage);
    println!("  Total change:       {:.2}%", report.total_change_percentage);
    println!();

    for caveat in &report.caveats {
        println!("  ⚠ {}", caveat);
    }
    if let Some(ref map) = report.change_map_path {
        println!("  Change map: {}", map.display());
    }

    let comparison_path = Path::new(output_dir).join("comparison.png");
    Visualizer::new().render_comparison(&before, &after, &comparison_path)?;
    println!("  Comparison: {}", comparison_path.display());

    let report_path = Path::new(output_dir).join("change_report.json");
    fs::write(&report_path, report.to_json()?)?;
    println!("  Report: {}", report_path.display());

    Ok(())
}
