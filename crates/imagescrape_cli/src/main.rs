//! `imagescrape`: scroll image search results and download what they show.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use imagescrape_engine::{
    write_manifest, CancellationToken, ImageScraper, Query, ReqwestFetcher, ScraperConfig,
    WebDriverSessionFactory,
};
use scrape_logging::{scrape_error, scrape_info, scrape_warn, LevelFilter};

mod cli;
mod config;
mod report;

use cli::Args;
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut app_config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    app_config.apply_args(&args);

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    scrape_logging::initialize(args.log.into(), level, &app_config.log_file);

    let config = app_config
        .to_scraper_config()
        .context("invalid configuration")?;
    let queries = app_config.queries()?;

    run(config, &queries, &app_config.output_dir).await
}

async fn run(config: ScraperConfig, queries: &[Query], output_dir: &Path) -> Result<ExitCode> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            scrape_warn!("interrupted, cancelling remaining work");
            interrupt.cancel();
        }
    });

    let factory = WebDriverSessionFactory::new(config.webdriver.clone());
    let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone()));
    let mut scraper = ImageScraper::new(config, Box::new(factory), fetcher);

    scrape_info!("running {} queries", queries.len());
    let finished = tokio::select! {
        report = scraper.run_queries(queries) => Some(report),
        _ = cancel.cancelled() => None,
    };
    // Downloads never need the browser.
    scraper.close().await;
    let Some(run_report) = finished else {
        scrape_warn!("interrupted before discovery finished, nothing downloaded");
        return Ok(ExitCode::FAILURE);
    };

    let outcomes = scraper.download_all(output_dir, &cancel).await;

    let generated_utc = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    match write_manifest(output_dir, &generated_utc, &run_report, &outcomes) {
        Ok(path) => scrape_info!("manifest written to {:?}", path),
        Err(err) => scrape_error!("failed to write manifest into {:?}: {}", output_dir, err),
    }

    print!("{}", report::render(&run_report, &outcomes));

    if run_report.aborted.is_some() || cancel.is_cancelled() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
