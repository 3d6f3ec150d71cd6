mod display;
mod input;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rentcheck_ai::gemini::DEFAULT_BASE_URL;
use rentcheck_ai::{FactExtractor, GeminiClient, ModelExtractor, Pipeline};
use rentcheck_core::{PipelineConfig, Source, normalize};

#[derive(Parser)]
#[command(
    name = "rentcheck",
    version,
    about = "Compare a rental listing flyer with the initial-cost estimate and flag overcharges"
)]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Vision model identifier
    #[arg(long, env = "RENTCHECK_MODEL", default_value = "gemini-2.5-flash")]
    model: String,

    /// API base URL
    #[arg(long, env = "RENTCHECK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Deadline for one diagnosis, in seconds
    #[arg(long, env = "RENTCHECK_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full flyer-vs-estimate diagnosis
    Diagnose {
        /// Flyer (listing) images, in page order
        #[arg(long, num_args = 1.., required = true)]
        flyer: Vec<PathBuf>,

        /// Estimate images, in page order
        #[arg(long, num_args = 1.., required = true)]
        estimate: Vec<PathBuf>,

        /// Print the full report as JSON instead of a card
        #[arg(long)]
        json: bool,
    },
    /// Extract and normalize the facts of one document, printed as JSON
    Extract {
        #[arg(long, value_enum)]
        source: SourceArg,

        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Flyer,
    Estimate,
}

impl From<SourceArg> for Source {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Flyer => Source::Flyer,
            SourceArg::Estimate => Source::Estimate,
        }
    }
}

impl ModelArgs {
    fn extractor(&self) -> ModelExtractor<GeminiClient> {
        let client = GeminiClient::with_base_url(self.api_key.clone(), self.base_url.clone());
        ModelExtractor::new(client, self.model.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("rentcheck v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Diagnose {
            flyer,
            estimate,
            json,
        } => {
            let flyer = input::read_images(&flyer)?;
            let estimate = input::read_images(&estimate)?;

            let config = PipelineConfig {
                deadline: Duration::from_secs(cli.model.timeout_secs),
                ..PipelineConfig::default()
            };
            let pipeline = Pipeline::new(Arc::new(cli.model.extractor())).with_config(config);
            let report = pipeline.diagnose(&flyer, &estimate).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                display::print_report_card(&report)?;
            }
        }
        Commands::Extract { source, images } => {
            let images = input::read_images(&images)?;
            let facts = cli.model.extractor().extract(&images, source.into()).await;
            println!("{}", serde_json::to_string_pretty(&normalize(facts))?);
        }
    }

    Ok(())
}
