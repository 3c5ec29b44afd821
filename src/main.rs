use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use address_inference::app::infer_use_case::InferUseCase;
use address_inference::app::transform_use_case::TransformUseCase;
use address_inference::config::Config;
use address_inference::infra::graph_writer_adapter::FileGraphWriterAdapter;
use address_inference::infra::match_output_adapter::FileMatchOutputAdapter;
use address_inference::infra::ndjson_source::NdjsonFileSource;
use address_inference::observability::{self, metrics};
use address_inference::types::{HouseNumberRecord, StreetRecord};

#[derive(Parser)]
#[command(name = "address-inference")]
#[command(about = "Infers addresses by matching house numbers to historical street segments")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match every house number to the closest valid street segment
    Infer {
        #[command(flatten)]
        inputs: InputArgs,
        /// Directory to write inferred.ndjson into
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Convert inferred matches into graph objects, relations and log entries
    Transform {
        /// Inferred matches file (defaults to <output_dir>/inferred.ndjson)
        #[arg(long)]
        inferred: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Run infer followed by transform
    Run {
        #[command(flatten)]
        inputs: InputArgs,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Street objects file (overrides the configured dataset path)
    #[arg(long)]
    streets: Option<PathBuf>,
    /// House number objects file (overrides the configured dataset path)
    #[arg(long)]
    house_numbers: Option<PathBuf>,
}

struct Paths {
    streets: PathBuf,
    house_numbers: PathBuf,
    inferred: PathBuf,
    output_dir: PathBuf,
}

impl Paths {
    fn resolve(config: &Config, inputs: Option<&InputArgs>, inferred: Option<PathBuf>) -> Self {
        let streets = inputs.and_then(|i| i.streets.clone());
        let house_numbers = inputs.and_then(|i| i.house_numbers.clone());
        Self {
            streets: streets.unwrap_or_else(|| config.streets_file()),
            house_numbers: house_numbers.unwrap_or_else(|| config.house_numbers_file()),
            inferred: inferred.unwrap_or_else(|| config.inferred_file()),
            output_dir: config.paths.output_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    let _log_guard = observability::init_logging();
    if let Err(e) = metrics::init() {
        error!("Failed to initialize metrics: {}", e);
    }

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("address_inference", run_id = %run_id);

    if let Err(e) = run(cli).instrument(span).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    if let Some(rendered) = metrics::render() {
        debug!("Metrics:\n{}", rendered);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Infer { inputs, output_dir } => {
            if let Some(dir) = output_dir {
                config.paths.output_dir = dir;
            }
            let paths = Paths::resolve(&config, Some(&inputs), None);
            infer(&config, &paths).await
        }
        Commands::Transform {
            inferred,
            output_dir,
        } => {
            if let Some(dir) = output_dir {
                config.paths.output_dir = dir;
            }
            let paths = Paths::resolve(&config, None, inferred);
            transform(&config, &paths).await
        }
        Commands::Run { inputs, output_dir } => {
            if let Some(dir) = output_dir {
                config.paths.output_dir = dir;
            }
            let paths = Paths::resolve(&config, Some(&inputs), None);
            infer(&config, &paths).await?;
            transform(&config, &paths).await
        }
    }
}

async fn infer(config: &Config, paths: &Paths) -> anyhow::Result<()> {
    info!("Reading streets from {}", paths.streets.display());
    let mut streets = NdjsonFileSource::<StreetRecord>::open(&paths.streets).await?;
    let mut house_numbers =
        NdjsonFileSource::<HouseNumberRecord>::open(&paths.house_numbers).await?;
    let output = FileMatchOutputAdapter::create(&paths.inferred).await?;

    let use_case = InferUseCase::with_config(
        Box::new(output),
        config.datasets.clone(),
        config.matching.clone(),
    );
    let stats = use_case
        .run(&mut streets, &mut house_numbers)
        .await
        .context("Matching house numbers failed")?;

    info!(
        "Wrote {} results to {} ({:.1}% matched)",
        stats.processed(),
        paths.inferred.display(),
        stats.match_rate()
    );
    Ok(())
}

async fn transform(config: &Config, paths: &Paths) -> anyhow::Result<()> {
    ensure_exists(&paths.inferred)?;
    let mut inferred = NdjsonFileSource::<Value>::open(&paths.inferred).await?;
    let writer = FileGraphWriterAdapter::create(&paths.output_dir, &config.datasets.output).await?;

    let use_case = TransformUseCase::new(Box::new(writer));
    let stats = use_case
        .run(&mut inferred)
        .await
        .context("Transforming inferred matches failed")?;

    info!(
        "Transform wrote {} graph records",
        stats.objects + stats.relations + stats.logs
    );
    Ok(())
}

fn ensure_exists(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!(
            "Inferred matches not found at {}, run `infer` first",
            path.display()
        );
    }
    Ok(())
}
