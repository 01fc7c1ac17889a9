use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::{Instant, timeout_at};
use tracing_subscriber::EnvFilter;

use snapvoice::cli::{Cli, Command};
use snapvoice::config::SnapvoiceConfig;
use snapvoice::driver;
use snapvoice::error::SnapvoiceError;
use snapvoice::image::ImageSource;
use snapvoice::pipeline::{HttpPipelineApi, PipelineApi};
use snapvoice::ui::JobProgress;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = SnapvoiceConfig::load()?;
    if let Some(voice) = cli.voice {
        config.voice = voice.into();
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(secs) = cli.timeout_secs {
        config.job_timeout_secs = secs;
    }
    config.validate()?;

    let api = HttpPipelineApi::with_timeouts(
        config.upload_url.clone(),
        config.status_url.clone(),
        config.connect_timeout(),
        config.request_timeout(),
    )
    .map_err(SnapvoiceError::from)?;

    match cli.command {
        Command::Submit { image } => submit(Arc::new(api), &image, &config, cli.json).await,
        Command::Status { job_id } => status(&api, &job_id).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "snapvoice=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

async fn submit(
    api: Arc<HttpPipelineApi>,
    path: &Path,
    config: &SnapvoiceConfig,
    json: bool,
) -> Result<ExitCode> {
    let image = ImageSource::from_path(path).await?;
    let progress = JobProgress::start(image.reference().as_str());
    let mut handle = driver::start(api, image, config.driver_config());

    let deadline = Instant::now() + config.job_timeout();
    let cancel = handle.cancellation_token();
    loop {
        tokio::select! {
            update = timeout_at(deadline, handle.next_update()) => match update {
                Ok(Some(snapshot)) => progress.update(&snapshot),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(timeout_secs = config.job_timeout_secs, "job timed out, cancelling");
                    cancel.cancel();
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                break;
            }
        }
    }

    let report = handle.finish().await.context("job task panicked")?;
    progress.complete(&report);
    if json {
        progress.print_report(&report);
    }

    Ok(if report.phase.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn status(api: &HttpPipelineApi, job_id: &str) -> Result<ExitCode> {
    let report = api
        .fetch_status(job_id)
        .await
        .map_err(SnapvoiceError::from)?;

    println!("status: {}", report.status());
    match report.phase() {
        Some(phase) => println!("phase:  {phase}"),
        None => println!("phase:  (waiting)"),
    }
    if let Some(text) = report.processed_text() {
        println!("text:   {text}");
    }
    if let Some(url) = report.audio_url() {
        println!("audio:  {url}");
    }
    Ok(ExitCode::SUCCESS)
}
