use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use framefeed::config::Config;
use framefeed::feed::{blog_slug, items_for_blog, FeedApi};
use framefeed::pipeline::{CallRecorder, FeedPipeline, SubscribeError};
use framefeed::storage::{CacheStore, Database, FeedItem, MemoryStore};
use framefeed::subscription::SubscriptionRequest;
use framefeed::util::{fit_width, html_to_text, single_line};

/// Get the config directory path (~/.config/framefeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("framefeed"))
}

#[derive(Parser, Debug)]
#[command(name = "framefeed", about = "Aggregated blog feeds from the Farcaster RSS mini-app")]
struct Args {
    /// Config file (defaults to ~/.config/framefeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feed API root, overrides config and FRAMEFEED_BASE_URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Keep the cache in memory for this run only
    #[arg(long)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the merged feed, newest first
    Feeds {
        /// Only items from the blog with this title
        #[arg(long, value_name = "TITLE")]
        blog: Option<String>,

        /// Maximum number of items to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one summary per subscribed blog
    Blogs,
    /// Ask the feed API whether a URL is a usable RSS/Atom feed
    Validate { url: String },
    /// Validate a feed and print its addFeed call for a wallet to sign.
    /// Nothing is sent on chain, so the feed list is not refreshed.
    Subscribe { fid: String, url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env()
        .context("Invalid FRAMEFEED_BASE_URL")?
        .with_base_url(args.base_url.clone())
        .context("Invalid --base-url")?;

    let database = if args.no_cache {
        None
    } else {
        open_database(&config_dir.join("cache.db")).await
    };
    let store: Arc<dyn CacheStore> = match &database {
        Some(db) => Arc::new(db.clone()),
        None => Arc::new(MemoryStore::new()),
    };

    let api = FeedApi::new(&config).context("Failed to build HTTP client")?;
    let pipeline = FeedPipeline::new(store, api).with_pruning(config.prune_stale_items);

    let ok = run(&pipeline, &config, args.command).await?;

    if let Some(db) = database {
        db.close().await;
    }
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Open the cache file, or log and carry on without one.
async fn open_database(path: &Path) -> Option<Database> {
    let Some(path_str) = path.to_str() else {
        tracing::warn!(path = %path.display(), "Cache path is not valid UTF-8, using memory cache");
        return None;
    };
    match Database::open(path_str).await {
        Ok(db) => Some(db),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cache unavailable, using memory cache");
            None
        }
    }
}

async fn run(pipeline: &FeedPipeline, config: &Config, command: Command) -> Result<bool> {
    match command {
        Command::Feeds { blog, limit } => {
            let state = pipeline.load_feeds().await;
            let items: Vec<&FeedItem> = match &blog {
                Some(title) => items_for_blog(&state.items, &blog_slug(title)),
                None => state.items.iter().collect(),
            };
            for item in items.iter().take(limit) {
                print_item(item);
            }
            report_error(state.error.as_deref());
            Ok(state.error.is_none() || !state.items.is_empty())
        }
        Command::Blogs => {
            let state = pipeline.load_blog_summaries().await;
            for blog in state.items.iter() {
                let date = blog
                    .latest_post_instant()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "----------".to_string());
                println!(
                    "{:>10}  {}  {}  ({})",
                    blog.source_id,
                    date,
                    fit_width(&single_line(&blog.title), 40),
                    single_line(&blog.latest_author)
                );
            }
            report_error(state.error.as_deref());
            Ok(state.error.is_none() || !state.items.is_empty())
        }
        Command::Validate { url } => {
            let validation = pipeline.validate_feed_url(&url).await;
            if validation.valid {
                println!("valid");
            } else {
                println!("invalid: {}", validation.reason.as_deref().unwrap_or("no reason given"));
            }
            Ok(validation.valid)
        }
        Command::Subscribe { fid, url } => {
            let request = SubscriptionRequest::parse(&fid, &url)?;
            let recorder = CallRecorder::new(config.contract_address.clone(), config.chain_id);
            match pipeline.subscribe(&request, &recorder).await {
                Ok(receipt) => {
                    for call in recorder.calls() {
                        println!("{}", serde_json::to_string_pretty(&call)?);
                    }
                    println!("reference: {}", receipt.reference);
                    if !receipt.confirmed {
                        eprintln!("Sign and send the call above, then run `framefeed feeds`.");
                    }
                    Ok(true)
                }
                Err(SubscribeError::Rejected { reason }) => {
                    eprintln!("Feed rejected: {}", reason);
                    Ok(false)
                }
                Err(e) => {
                    eprintln!("Error: {} (you can retry)", e);
                    Ok(false)
                }
            }
        }
    }
}

fn print_item(item: &FeedItem) {
    let date = item
        .published_instant()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    println!(
        "{}  {}  {}",
        date,
        fit_width(&single_line(&item.source_title), 20),
        fit_width(&single_line(&item.title), 60)
    );
    let summary = html_to_text(&item.content);
    if !summary.is_empty() {
        println!("            {}", fit_width(&single_line(&summary), 78));
    }
}

fn report_error(error: Option<&str>) {
    if let Some(error) = error {
        eprintln!("Warning: refresh failed: {}", error);
    }
}
