use std::path::PathBuf;

use clap::Parser;
use nb_inference::Config;
use nb_parsers::ParserRegistry;
use nb_web::AppState;
use tracing::info;

mod commands;
mod logging;

#[derive(Parser, Debug)]
#[command(author, version, about = "Article parsing and bias analysis service", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, env = "NB_STORAGE", default_value = "memory")]
    storage: String,
    /// SQLite database file
    #[arg(long, env = "NB_DATABASE", default_value = "articles.db")]
    database: String,
    #[arg(
        long,
        env = "NB_MODEL",
        default_value = "openai",
        help = "Model to use for inference. Available models: openai (default), dummy"
    )]
    model: String,
    /// Provider model name, defaults to gpt-4o-mini
    #[arg(long, env = "NB_MODEL_NAME")]
    model_name: Option<String>,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,
    /// Use publisher-specific parsers where one exists
    #[arg(long)]
    rule_based_parsers: bool,
    #[arg(long, env = "NB_LOG_LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Parse a saved page and print the result as JSON
    Parse {
        /// URL the page was downloaded from
        #[arg(long)]
        url: String,
        /// HTML file to parse
        #[arg(long)]
        file: PathBuf,
    },
    /// Re-apply text cleanup to every stored article
    CleanText,
    /// Merge publications that share a hostname
    DedupePublications,
}

impl Cli {
    fn inference_config(&self) -> Config {
        Config {
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            model_name: self.model_name.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;

    match &cli.command {
        Commands::Serve { port } => {
            let storage = nb_storage::create_storage(&cli.storage, &cli.database).await?;
            info!("💾 Storage initialized (using {})", cli.storage);
            let model = nb_inference::create_model(&cli.inference_config())?;
            info!("🧠 Inference model initialized (using {})", model.name());

            let state = AppState::new(storage, model).with_rule_based_parsers(cli.rule_based_parsers);
            nb_web::serve(state, *port).await?;
        }
        Commands::Parse { url, file } => {
            let model = nb_inference::create_model(&cli.inference_config())?;
            let registry = ParserRegistry::new(model).with_rule_based(cli.rule_based_parsers);
            let article = commands::parse_file(&registry, url, file).await?;
            println!("{}", serde_json::to_string_pretty(&article)?);
        }
        Commands::CleanText => {
            let storage = nb_storage::create_storage(&cli.storage, &cli.database).await?;
            let report = commands::clean_text(storage.as_ref()).await?;
            println!(
                "Processed {} articles, updated {}, saved {} characters",
                report.processed, report.updated, report.chars_saved
            );
        }
        Commands::DedupePublications => {
            let storage = nb_storage::create_storage(&cli.storage, &cli.database).await?;
            let report = commands::dedupe_publications(storage.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
