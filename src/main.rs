use std::{
    fs,
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use anyhow::{anyhow, Context};
use clap::Parser;
use foodscrape::{
    config::{DebugHtmlConfig, DebugHtmlMode, ScrapeConfig, StorageConfig},
    fetcher::HttpFetcher,
    pipeline::Pipeline,
    runner::{BatchRunner, RunnerOptions},
    store::S3Store,
    uploader::DatasetUploader,
};
use log::debug;
use signal_hook::consts::{SIGINT, SIGTERM};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Food product scraper and S3 uploader", long_about = None)]
struct Args {
    /// Barcodes to scrape, in order
    barcodes: Vec<String>,
    /// File with one barcode per line ('#' starts a comment)
    #[arg(short = 'f', long)]
    identifiers_file: Option<PathBuf>,
    /// Concurrent fetches; 1 is strictly sequential
    #[arg(short = 'c', long, default_value_t = 1)]
    concurrency: usize,
    /// Minimum politeness delay before each request, in milliseconds
    #[arg(long, default_value_t = 500)]
    min_delay_ms: u64,
    /// Maximum politeness delay before each request, in milliseconds
    #[arg(long, default_value_t = 1500)]
    max_delay_ms: u64,
    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
    /// Stop after this many identifiers
    #[arg(short = 'n', long)]
    max_products: Option<usize>,
    /// When to keep fetched pages on disk for inspection
    #[arg(long, value_enum, default_value = "off")]
    debug_html: DebugHtmlMode,
    /// Directory for kept pages
    #[arg(long, default_value = "debug_html")]
    debug_dir: PathBuf,
    /// Scrape only, skip the upload phase
    #[arg(long, default_value_t = false)]
    skip_upload: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    debug!("starting with {:#?}", args.clone());

    let identifiers = load_identifiers(&args)?;
    if identifiers.is_empty() {
        return Err(anyhow!(
            "no identifiers supplied, pass barcodes or --identifiers-file"
        ));
    }

    let scrape_config = ScrapeConfig {
        timeout: Duration::from_secs(args.timeout),
        ..ScrapeConfig::from_env()
    };
    let fetcher = HttpFetcher::new(&scrape_config).context("could not build fetcher")?;

    let options = RunnerOptions::default_builder()
        .concurrency(args.concurrency)
        .min_delay_ms(args.min_delay_ms)
        .max_delay_ms(args.max_delay_ms)
        .max_products(args.max_products)
        .debug_html(DebugHtmlConfig {
            mode: args.debug_html,
            dir: args.debug_dir.clone(),
        })
        .build()?;
    let runner = BatchRunner::new(fetcher, options);

    let should_terminate = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGTERM, Arc::clone(&should_terminate))?;
    signal_hook::flag::register(SIGINT, Arc::clone(&should_terminate))?;

    if args.skip_upload {
        let outcome = runner.run(&identifiers, should_terminate).await;
        println!("{}", outcome.summary());
        if outcome.dataset.is_empty() {
            return Err(anyhow!("batch produced an empty dataset"));
        }
        return Ok(());
    }

    let storage_config = StorageConfig::from_env().context("storage configuration")?;
    let store = S3Store::new(&storage_config).await;
    let uploader = DatasetUploader::new(store, &storage_config.key_prefix);

    let pipeline = Pipeline::new(runner, uploader);
    let report = pipeline.run(&identifiers, should_terminate).await?;

    println!("{}", report.summary);
    println!(
        "dataset uploaded to s3://{}/{}",
        storage_config.bucket, report.upload.dataset_key
    );

    Ok(())
}

fn load_identifiers(args: &Args) -> anyhow::Result<Vec<String>> {
    let mut identifiers = args.barcodes.clone();

    if let Some(path) = &args.identifiers_file {
        let content = fs::read_to_string(path)
            .context(format!("could not read identifiers file {:?}", path))?;
        identifiers.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }

    Ok(identifiers)
}
