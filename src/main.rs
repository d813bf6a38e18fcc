//! Tsunami Risk - command line entry point
//!
//! ```bash
//! tsunami-risk explore --data earthquake_data_tsunami.csv
//! tsunami-risk run --data earthquake_data_tsunami.csv --models logistic,random_forest
//! tsunami-risk tune --data earthquake_data_tsunami.csv --model svm_rbf
//! tsunami-risk init-config tsunami.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tsunami_risk::explore::ExploreSummary;
use tsunami_risk::report::format_best;
use tsunami_risk::{Config, ModelKind, Pipeline};

#[derive(Parser)]
#[command(name = "tsunami-risk")]
#[command(about = "Tsunami risk classification from earthquake records")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the cleaned dataset
    Explore {
        /// Path to the earthquake CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Write the correlation matrix to this CSV
        #[arg(long)]
        correlations: Option<PathBuf>,
    },

    /// Tune, finalize and compare models
    Run {
        /// Path to the earthquake CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Comma-separated model names (default: all seven)
        #[arg(short, long, value_delimiter = ',')]
        models: Vec<String>,

        /// Output directory for the report files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ignore and do not write cached tuning results
        #[arg(long)]
        no_cache: bool,
    },

    /// Grid search a single model and show its best candidates
    Tune {
        /// Path to the earthquake CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Model name, e.g. knn or boosted_trees
        #[arg(short, long)]
        model: String,

        /// Number of candidates to show
        #[arg(short = 'n', long, default_value = "5")]
        top: usize,

        /// Ignore and do not write cached tuning results
        #[arg(long)]
        no_cache: bool,
    },

    /// Write the default configuration
    InitConfig {
        /// Destination file
        #[arg(default_value = "tsunami.toml")]
        path: PathBuf,
    },
}

fn init_logging(verbose: bool, level: &str) {
    let fallback = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn parse_models(names: &[String]) -> Result<Vec<ModelKind>> {
    if names.is_empty() {
        return Ok(ModelKind::ALL.to_vec());
    }
    names
        .iter()
        .map(|n| n.parse::<ModelKind>().map_err(anyhow::Error::from))
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    init_logging(cli.verbose, &config.logging.level);

    match cli.command {
        Commands::Explore { data, correlations } => {
            let pipeline = Pipeline::new(config);
            let frame = pipeline
                .load(&data)
                .with_context(|| format!("Failed to load {:?}", data))?;
            let summary = ExploreSummary::from_frame(&frame);

            println!("{}", "Exploratory summary".bold());
            println!("{}", summary.render());

            if let Some(path) = correlations {
                summary.correlation.write_csv(&path)?;
                info!("Saved correlations to {:?}", path);
            }
        }

        Commands::Run {
            data,
            models,
            output,
            no_cache,
        } => {
            let kinds = parse_models(&models)?;
            let output_dir = output.unwrap_or_else(|| config.output.dir.clone());
            let use_cache = config.output.use_cache && !no_cache;

            let pipeline = Pipeline::new(config).with_cache(use_cache);
            let frame = pipeline
                .load(&data)
                .with_context(|| format!("Failed to load {:?}", data))?;
            info!("Loaded {} earthquakes", frame.n_rows());

            let report = pipeline.run(&frame, &kinds)?;
            println!("{}", report.render());

            if let Some(best) = report.best() {
                println!(
                    "{} {} (test AUC {})",
                    "Best model:".green().bold(),
                    best.kind.label(),
                    best.test_auc.map_or("n/a".to_string(), |a| format!("{:.4}", a))
                );
            }

            let written = report.export(&output_dir)?;
            for path in written {
                println!("  wrote {}", path.display());
            }
        }

        Commands::Tune {
            data,
            model,
            top,
            no_cache,
        } => {
            let kind: ModelKind = model.parse()?;
            let use_cache = config.output.use_cache && !no_cache;

            let pipeline = Pipeline::new(config).with_cache(use_cache);
            let frame = pipeline
                .load(&data)
                .with_context(|| format!("Failed to load {:?}", data))?;
            let resamples = pipeline.resample(&frame)?;
            let results = pipeline.tune(kind, &resamples)?;

            println!("{}", format_best(&results, top));
            let best = results.select_best()?;
            println!("{} {}", "Selected:".green().bold(), best.params.describe());
        }

        Commands::InitConfig { path } => {
            config.save(&path)?;
            println!("Wrote configuration to {}", path.display());
        }
    }

    Ok(())
}
