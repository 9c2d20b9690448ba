use anyhow::{Context, Result};
use background_service::{PollService, PollSettings};
use clap::Parser;
use database::LedgerStore;
use llm_interface::{OpenAiProvider, PromptConfig};
use reddit_client::{RedditClient, RedditOAuth2Config};
use std::path::{Path, PathBuf};
use threadcast_core::{AppConfig, Credentials, DEFAULT_CONFIG_PATH};
use tracing_subscriber::EnvFilter;
use x_poster::{OAuth1Credentials, XPoster};

const DEFAULT_LOG_FILTER: &str =
    "threadcast=info,background_service=info,post_selector=info,reddit_client=info,\
     llm_interface=info,x_poster=info,database=info";

#[derive(Parser)]
#[command(
    name = "threadcast",
    version,
    about = "Summarizes the most discussed recent subreddit post and publishes it to X"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "THREADCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load_or_default(Path::new(DEFAULT_CONFIG_PATH))
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_PATH))?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the variables may come from the shell.
    let _ = dotenvy::dotenv();
    init_logging();

    let cli = Cli::parse();
    tracing::info!("Starting threadcast");

    let config = load_config(cli.config.as_ref())?;
    let credentials = Credentials::from_env().context("Missing credentials")?;
    let policy = config.policy();

    let user_agent = credentials
        .reddit_user_agent
        .clone()
        .unwrap_or_else(|| config.source.user_agent.clone());
    let reddit = RedditClient::new(RedditOAuth2Config::new(
        credentials.reddit_client_id.clone(),
        credentials.reddit_client_secret.clone(),
        user_agent,
    ))
    .context("Failed to create Reddit client")?
    .with_comment_depth(policy.depth_limit);

    let prompt = PromptConfig::from_generation(&config.source.subreddit, &config.generation);
    let generator = OpenAiProvider::new(
        credentials.openai_api_key.clone(),
        config.generation.model.clone(),
        prompt,
    )
    .context("Failed to create OpenAI client")?
    .with_base_url(&config.generation.base_url);

    let publisher = XPoster::new(OAuth1Credentials::from(&credentials), &config.publish)
        .context("Failed to create X client")?;

    let ledger = LedgerStore::open(&config.ledger)
        .await
        .context("Failed to open processed-items ledger")?;

    tracing::info!(
        subreddit = %config.source.subreddit,
        fetch_limit = config.fetch_limit(),
        time_range_hours = policy.time_range_hours,
        depth_limit = policy.depth_limit,
        "Configuration loaded"
    );

    let mut service = PollService::new(
        reddit,
        generator,
        publisher,
        ledger,
        PollSettings::from_config(&config),
    );

    if cli.once {
        service.run_once().await;
    } else {
        service.run().await;
    }

    Ok(())
}
