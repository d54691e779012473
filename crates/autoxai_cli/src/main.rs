//! autoxai CLI: run attribution explainers on an image.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::imageops::FilterType;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autoxai::prelude::*;
use burn::prelude::*;
use burn::tensor::TensorData;
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;

/// Backend used for explanations.
type ExplainBackend = Autodiff<NdArray>;

#[derive(Parser)]
#[command(name = "autoxai")]
#[command(author, version)]
#[command(about = "Run attribution explainers alongside inference of an image classifier")]
#[command(long_about = "autoxai: explain image classifier predictions with gradient and perturbation attributions.

EXAMPLES:
  # List available explainers
  autoxai list

  # Explain a grayscale image with Noise Tunnel and GradCAM
  autoxai explain --image cat.png -e noise-tunnel -e layer-gradcam

  # Reproducible run with parameters from a configuration file
  autoxai explain --image cat.png --config xai.json --seed 42 --output result.json")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available explainers
    List,
    /// Run explainers on one image with the sample classifier
    Explain(ExplainArgs),
}

#[derive(Args, Debug)]
struct ExplainArgs {
    /// PNG or JPEG image. A random image is used when omitted
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Explainer name or alias, repeatable (e.g. noise-tunnel)
    #[arg(short, long = "explainer", value_name = "NAME")]
    explainers: Vec<Explainers>,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output index to explain
    #[arg(long, value_name = "INDEX")]
    target: Option<usize>,

    /// Random seed for noise based explainers
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Layer for layer explainers (defaults to the last convolution)
    #[arg(long, value_name = "NAME")]
    layer: Option<String>,

    /// Square input resolution
    #[arg(long, default_value = "224", value_name = "PIXELS")]
    resolution: usize,

    /// Write a JSON report here instead of stdout
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match cli.command {
        Commands::List => {
            handle_list();
            Ok(())
        }
        Commands::Explain(args) => handle_explain(&args),
    }
}

fn handle_list() {
    println!("Available explainers:\n");
    for kind in Explainers::ALL {
        println!("  {:<42} {:<28} {}", kind.name(), kind.alias(), kind.description());
    }
    println!("\nUsage:");
    println!("  autoxai explain --image IMAGE -e ALIAS [-e ALIAS ...]");
}

fn handle_explain(args: &ExplainArgs) -> Result<()> {
    let report = serde_json::to_string_pretty(&explain_report(args)?)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, report).with_context(|| format!("Failed to write '{}'", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => println!("{}", report),
    }
    Ok(())
}

fn resolve_config(args: &ExplainArgs) -> Result<XaiConfig> {
    let mut xai_config = match &args.config {
        Some(path) => XaiConfig::load(path)
            .with_context(|| format!("Failed to load configuration '{}'", path.display()))?,
        None => XaiConfig::default(),
    };
    if !args.explainers.is_empty() {
        xai_config.explainers = args.explainers.clone();
    }
    if let Some(target) = args.target {
        xai_config.target = target;
    }
    if let Some(seed) = args.seed {
        xai_config = xai_config.with_seed(Seed::new(seed));
    }
    if let Some(layer) = &args.layer {
        xai_config = xai_config.with_layer(layer.clone());
    }
    if xai_config.explainers.is_empty() {
        bail!("No explainer selected. Use 'autoxai list' to see available explainers.");
    }
    Ok(xai_config)
}

/// Run the sample classifier and the selected explainers, and summarize
/// the result as JSON.
fn explain_report(args: &ExplainArgs) -> Result<serde_json::Value> {
    let xai_config = resolve_config(args)?;
    let resolution = args.resolution;

    let device = Default::default();
    let input = match &args.image {
        Some(path) => load_image::<ExplainBackend>(path, resolution, &device)?,
        None => {
            tracing::info!("No image given, explaining a random {}x{} input", resolution, resolution);
            random_image::<ExplainBackend>(resolution, xai_config.seed, &device)
        }
    };
    let input_shape = ImageShape::from(input.dims());

    let mut model = SampleModelConfig::new(1, resolution).init::<ExplainBackend>(&device);
    let explainer = AutoXaiExplainer::<ExplainBackend, _>::from_config(&mut model, &xai_config)
        .context("Invalid configuration")?;
    let (prediction, explanations) = explainer
        .run(|session| session.explain(input))
        .context("Explanation failed")?;

    let mut report = serde_json::Map::new();
    for (name, attributions) in &explanations {
        let method = name.parse::<Explainers>()?.method();
        let map = AttributionMap::new(attributions.clone(), method).with_target_class(xai_config.target);
        report.insert(
            name.clone(),
            json!({
                "shape": map.shape(),
                "summary": map.summary(),
            }),
        );
    }

    let prediction = prediction
        .into_data()
        .to_vec::<f32>()
        .map_err(|err| anyhow::anyhow!("Failed to read model output: {:?}", err))?;
    Ok(json!({
        "image": args.image.as_ref().map(|path| path.display().to_string()),
        "input": input_shape,
        "target": xai_config.target,
        "prediction": prediction,
        "explanations": report,
    }))
}

/// Load an image as a grayscale `(1, 1, resolution, resolution)` batch in `[0, 1]`.
///
/// The shorter side is resized to `resolution` and the center is cropped.
fn load_image<B: Backend>(path: &Path, resolution: usize, device: &B::Device) -> Result<Tensor<B, 4>> {
    let image = image::open(path).with_context(|| format!("Failed to open image '{}'", path.display()))?;
    let side = u32::try_from(resolution).context("Resolution does not fit an image dimension")?;
    let pixels = image
        .resize_to_fill(side, side, FilterType::Triangle)
        .into_luma8()
        .into_raw();

    let tensor = Tensor::<B, 4>::from_data(
        TensorData::new(pixels, [1, 1, resolution, resolution]).convert::<B::FloatElem>(),
        device,
    );
    Ok(tensor.div_scalar(255.0))
}

/// Uniform noise image, seeded when a seed is given.
fn random_image<B: Backend>(resolution: usize, seed: Option<Seed>, device: &B::Device) -> Tensor<B, 4> {
    use rand::Rng;

    let mut rng = seed.unwrap_or_else(Seed::from_entropy).derive("input").to_rng();
    let pixels: Vec<f32> = (0..resolution * resolution).map(|_| rng.gen()).collect();
    Tensor::from_data(TensorData::new(pixels, [1, 1, resolution, resolution]), device)
}
