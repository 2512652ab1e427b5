use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foa_core::PageVariant;
use foa_extract::TagRules;
use foa_storage::{write_outputs, HttpClientConfig, HttpFetcher, IngestConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "foa-cli")]
#[command(about = "Extract a funding opportunity page into foa.json and foa.csv")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Extract(ExtractArgs),
}

#[derive(Debug, clap::Args)]
struct ExtractArgs {
    /// Opportunity page URL; also recorded as `source_url`.
    #[arg(long)]
    url: String,
    /// Defaults to FOA_OUT_DIR, then `./out`.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Read the page from disk instead of fetching it.
    #[arg(long)]
    html_file: Option<PathBuf>,
    /// `classic` or `simpler`; inferred from the URL when omitted.
    #[arg(long)]
    variant: Option<PageVariant>,
    /// YAML tag rules; defaults to FOA_TAG_RULES, then the built-in rules.
    #[arg(long)]
    tag_rules: Option<PathBuf>,
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

async fn run_extract(args: ExtractArgs, config: IngestConfig) -> Result<()> {
    let out_dir = args.out_dir.unwrap_or(config.out_dir.clone());
    let rules = match args.tag_rules.or(config.tag_rules_path.clone()) {
        Some(path) => TagRules::from_path(&path)?,
        None => TagRules::default(),
    };

    let html = match &args.html_file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let fetcher = HttpFetcher::new(HttpClientConfig::from(&config))?;
            fetcher.fetch_html(&args.url).await?
        }
    };

    let record = foa_extract::extract_from_html(&args.url, &html, args.variant, &rules)?;
    let paths = write_outputs(&record, &out_dir).await?;
    info!(
        json = %paths.json.display(),
        csv = %paths.csv.display(),
        "wrote outputs"
    );
    println!("{}", paths.json.display());
    println!("{}", paths.csv.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = IngestConfig::from_env();
    init_tracing(&config.log_filter);

    match cli.command {
        Commands::Extract(args) => run_extract(args, config).await?,
    }

    Ok(())
}
