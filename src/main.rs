//! Rooftop Harvest
//!
//! Estimates the rainwater a site's roofs can collect in a year from an aerial
//! screenshot: roofs are detected and measured, annual rainfall is looked up
//! for the site, and the harvest is reported with an annotated overlay.

mod config;
mod error;
mod geo;
mod harvest;
mod logging;
mod ocr;
mod paths;
mod pipeline;
mod precipitation;
mod report;
mod roofs;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use config::AnalysisConfig;
use ocr::{locate_tesseract, TesseractExtractor, TextExtractor};
use pipeline::{AnalysisOutcome, AnalysisRequest, Capabilities, ManualInput};
use precipitation::{OpenMeteoSource, PrecipitationResolver};
use report::AnalysisReport;
use roofs::{CommandDetector, CommandSegmenter, Detector, Segmenter};

#[derive(Parser)]
#[command(name = "rooftop-harvest")]
#[command(about = "Estimate rooftop rainwater harvest from an aerial screenshot", long_about = None)]
struct Cli {
    /// Aerial screenshot to analyze
    #[arg(value_name = "IMAGE", required_unless_present = "write_default_config")]
    image: Option<PathBuf>,

    /// Site latitude, overrides OCR
    #[arg(long, allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Site longitude, overrides OCR
    #[arg(long, allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Camera altitude in meters, overrides OCR
    #[arg(long)]
    altitude: Option<f64>,

    /// Runoff coefficient in (0, 1]
    #[arg(long)]
    runoff: Option<f64>,

    /// Minimum roof area in m²
    #[arg(long)]
    min_area: Option<f64>,

    /// Detector confidence threshold
    #[arg(long)]
    confidence: Option<f32>,

    /// Config file (default: config.json beside the executable)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for run results (default: output/ beside the executable)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Skip reading coordinates from the screenshot
    #[arg(long)]
    no_ocr: bool,

    /// Write the default config to FILE and exit
    #[arg(long, value_name = "FILE")]
    write_default_config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AnalysisConfig) {
        if let Some(runoff) = self.runoff {
            config.runoff_coefficient = runoff;
        }
        if let Some(min_area) = self.min_area {
            config.min_roof_area_m2 = min_area;
        }
        if let Some(confidence) = self.confidence {
            config.detection.confidence_threshold = confidence;
        }
    }

    fn manual_input(&self) -> ManualInput {
        ManualInput {
            latitude: self.lat,
            longitude: self.lon,
            altitude_m: self.altitude,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    paths::ensure_directories()?;
    logging::init(logging::level_for_verbosity(cli.verbose))?;

    if let Some(path) = &cli.write_default_config {
        AnalysisConfig::save_default(path)?;
        log::info!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut config = AnalysisConfig::load(&config_path);
    cli.apply_overrides(&mut config);

    let image_path = cli
        .image
        .as_deref()
        .context("No image given")?;
    let image = image::open(image_path)
        .with_context(|| format!("Failed to open image: {}", image_path.display()))?
        .to_rgb8();
    log::info!(
        "Loaded {} ({}x{})",
        image_path.display(),
        image.width(),
        image.height()
    );

    let capabilities = load_capabilities(&config, cli.no_ocr);
    let source = OpenMeteoSource::new(&config.precipitation)
        .context("Failed to create HTTP client")?;
    let resolver = PrecipitationResolver::new(Box::new(source), &config.precipitation);

    let request = AnalysisRequest {
        image,
        manual: cli.manual_input(),
    };

    let outcome = pipeline::run(
        &request,
        &capabilities,
        &resolver,
        &config,
        &mut rand::thread_rng(),
    )
    .inspect_err(|e| log::error!("Analysis failed: {}", e))?;

    match outcome {
        AnalysisOutcome::Completed(report) => {
            let base = cli.output_dir.clone().unwrap_or_else(paths::get_output_dir);
            let run_dir = save_results(&report, &base)?;
            print_summary(&report);
            println!("\nResults saved to {}", run_dir.display());
        }
        AnalysisOutcome::NoRoofs { skipped, .. } => {
            println!("No roofs detected. Try a clearer image or a lower --confidence.");
            if !skipped.is_empty() {
                println!("{} detections could not be segmented.", skipped.len());
            }
        }
    }

    Ok(())
}

/// Builds the capabilities the config and environment provide.
///
/// Missing ones are logged and left empty; the run decides whether that is
/// fatal.
fn load_capabilities(config: &AnalysisConfig, no_ocr: bool) -> Capabilities {
    let detector = config
        .capabilities
        .detector_command
        .as_ref()
        .and_then(|spec| match CommandDetector::new(spec) {
            Ok(d) => Some(Box::new(d) as Box<dyn Detector>),
            Err(e) => {
                log::warn!("Roof detector not loaded: {}", e);
                None
            }
        });

    let segmenter = config
        .capabilities
        .segmenter_command
        .as_ref()
        .and_then(|spec| match CommandSegmenter::new(spec) {
            Ok(s) => Some(Box::new(s) as Box<dyn Segmenter>),
            Err(e) => {
                log::warn!("Roof segmenter not loaded: {}", e);
                None
            }
        });

    let text_extractor = if no_ocr {
        None
    } else {
        match locate_tesseract() {
            Ok(paths) => Some(Box::new(TesseractExtractor::new(paths, config.ocr.region))
                as Box<dyn TextExtractor>),
            Err(e) => {
                log::warn!("OCR disabled: {}", e);
                None
            }
        }
    };

    Capabilities {
        detector,
        segmenter,
        text_extractor,
    }
}

/// Writes the overlay and JSON report into a new timestamped folder.
fn save_results(report: &AnalysisReport, base: &Path) -> Result<PathBuf> {
    let run_dir = paths::create_run_dir(base)
        .with_context(|| format!("Failed to create output folder in {}", base.display()))?;

    let overlay_path = run_dir.join("overlay.png");
    report
        .overlay
        .save(&overlay_path)
        .with_context(|| format!("Failed to save overlay: {}", overlay_path.display()))?;
    log::info!("Saved overlay to {}", overlay_path.display());

    let json_path = run_dir.join("rainwater_analysis.json");
    report::export_to_json(report, &json_path)?;
    log::info!("Saved report to {}", json_path.display());

    Ok(run_dir)
}

fn print_summary(report: &AnalysisReport) {
    let harvest = &report.water_harvest;
    let precipitation = &report.precipitation;

    println!("\n=== Rainwater Harvest Estimate ===");
    println!(
        "Location:           {:.6}°, {:.6}° (camera {:.0} m)",
        report.location.latitude, report.location.longitude, report.location.camera_altitude_m
    );
    println!("Total roof area:    {:.2} m²", harvest.total_area_m2);
    match &precipitation.region {
        Some(region) => println!(
            "Annual rainfall:    {:.1} mm ({:?}, {})",
            precipitation.annual_mm, precipitation.source, region
        ),
        None => println!(
            "Annual rainfall:    {:.1} mm ({:?})",
            precipitation.annual_mm, precipitation.source
        ),
    }
    if !precipitation.source.is_live() {
        println!(
            "                    (live data unavailable, {:?} confidence estimate)",
            precipitation.confidence
        );
    }
    println!("Harvestable water:  {:.0} liters/year", harvest.harvestable_liters);
    println!("Household supply:   {:.0} days", harvest.days_supply);
    println!("Annual savings:     {:.2}", harvest.annual_savings);
    println!("Runoff efficiency:  {:.0}%", harvest.runoff_coefficient * 100.0);

    println!("\nRoofs:");
    for roof in &report.roofs {
        println!("  Roof #{}: {:.1} m² ({} px)", roof.id, roof.area_m2, roof.pixel_count);
    }
    if !report.skipped_detections.is_empty() {
        println!("  ({} detections skipped)", report.skipped_detections.len());
    }
}
