// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kassenbon — scan a receipt image and print the expense record as JSON.
//
// Progress goes to stderr, the `ExpenseOutput` to stdout. Ctrl-C cancels the
// running scan.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use kassenbon_core::error::Result;
use kassenbon_core::{DisplayRegistry, RawImageInput, ScanConfig, humanize_error};
use kassenbon_document::{EngineManager, OcrConfig, OcrsEngineFactory};
use kassenbon_scan::{ScanOutcome, ScanPipeline};
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(
    name = "kassenbon",
    version,
    about = "Scan a receipt image and print the extracted expense as JSON"
)]
struct Args {
    /// Receipt image (JPEG, PNG, WebP, ...).
    image: PathBuf,

    /// Scanner configuration (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory containing `text-detection.rten` and `text-recognition.rten`.
    /// Overrides `model_dir` from the configuration.
    #[arg(long)]
    models: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!(image = %args.image.display(), "Kassenbon starting");

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(run(args));
    // A cancelled recognition may still be running on a blocking thread.
    // Its result is unwanted, so do not wait for it.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "scan failed");
            eprintln!("{}", humanize_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn build_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    let model_dir = args.models.or_else(|| config.model_dir.clone());
    let factory = OcrsEngineFactory::new(OcrConfig::from_optional_dir(model_dir.as_deref()));
    let engines = EngineManager::new(Arc::new(factory));
    let mut pipeline = ScanPipeline::new(&config, engines, DisplayRegistry::new())?;

    let bytes = tokio::fs::read(&args.image).await?;
    let extension = args
        .image
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    pipeline
        .load_image(RawImageInput::from_extension(bytes, extension))
        .await?;

    let mut progress = pipeline.progress();
    let printer = tokio::spawn(async move {
        while let Some(event) = progress.next().await {
            eprintln!("[{:>3}%] {}", event.percent, event.status);
        }
    });

    let cancel = pipeline.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let outcome = pipeline.scan().await;
    interrupt.abort();
    printer.abort();

    match outcome? {
        ScanOutcome::Completed(_) => {
            let expense = pipeline.use_data()?;
            println!("{}", serde_json::to_string_pretty(&expense)?);
        }
        ScanOutcome::Cancelled => eprintln!("scan cancelled"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn parses_image_and_overrides() {
        let args = Args::try_parse_from([
            "kassenbon",
            "receipt.jpg",
            "--config",
            "scan.json",
            "--models",
            "/opt/models",
        ])
        .unwrap();
        assert_eq!(args.image, PathBuf::from("receipt.jpg"));
        assert_eq!(args.config, Some(PathBuf::from("scan.json")));
        assert_eq!(args.models, Some(PathBuf::from("/opt/models")));
    }

    #[test]
    fn image_argument_is_required() {
        assert!(Args::try_parse_from(["kassenbon"]).is_err());
    }

    #[test]
    fn shutdown_does_not_wait_for_abandoned_blocking_work() {
        let runtime = build_runtime().unwrap();
        let (release, gate) = mpsc::channel::<()>();
        runtime.spawn_blocking(move || {
            let _ = gate.recv();
        });

        let started = Instant::now();
        runtime.shutdown_background();
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(release);
    }
}
