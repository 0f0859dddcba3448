use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use autolysis::config::AnalysisConfig;
use autolysis::data::loader::load_file;
use autolysis::narrative::client::ChatCompletionsClient;
use autolysis::pipeline::{self, NarrativeOutcome};
use autolysis::render::PngRenderer;

#[derive(Parser, Debug)]
#[command(name = "autolysis")]
#[command(about = "Profile a dataset, chart it and write a narrated README.md")]
struct Args {
    /// Dataset to analyse (.csv, .tsv, .json or .parquet).
    dataset: PathBuf,

    /// Where charts and README.md go; defaults to a directory named after the dataset.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON file overriding the analysis defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write the dataset profile as profile.json.
    #[arg(long)]
    dump_profile: bool,

    /// Bearer token for the narrative service.
    #[arg(long, env = "AIPROXY_TOKEN", hide_env_values = true)]
    api_key: String,
}

fn default_output_dir(dataset: &Path) -> PathBuf {
    let stem = dataset
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "autolysis".into());
    dataset.with_file_name(stem)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    let dataset = load_file(&args.dataset)?;
    let out_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&args.dataset));

    let renderer = PngRenderer::new(config.render.clone());
    let narrator = ChatCompletionsClient::new(args.api_key.clone(), config.narrative.clone())?;
    let summary = pipeline::run(&dataset, &config, &out_dir, &renderer, &narrator)?;

    if args.dump_profile {
        let path = out_dir.join("profile.json");
        std::fs::write(&path, summary.profile.to_pretty_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Profile written to {}", path.display());
    }

    if let NarrativeOutcome::Failed(reason) = &summary.narrative {
        log::warn!("Report written without stories: {reason}");
    }
    log::info!(
        "Done: {} charts, {} stages skipped, report at {}",
        summary.artifacts.len(),
        summary.skipped.len(),
        summary.report_path.display()
    );
    Ok(())
}
