//! Render binary: `recaps-render <job.json>`.
//!
//! The file holds one job or an array of jobs. Outcomes are printed to
//! stdout as JSON; the process exits non-zero when any job fails.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recaps_models::RenderJob;
use recaps_stt::{GoogleSttClient, SttConfig};
use recaps_worker::{metrics, render_batch, RenderConfig, Renderer};

#[derive(Deserialize)]
#[serde(untagged)]
enum JobFile {
    Many(Vec<RenderJob>),
    One(Box<RenderJob>),
}

impl JobFile {
    fn into_jobs(self) -> Vec<RenderJob> {
        match self {
            JobFile::Many(jobs) => jobs,
            JobFile::One(job) => vec![*job],
        }
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "recaps=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    // Logs go to stderr; stdout carries the outcomes
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let job_path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => bail!("usage: recaps-render <job.json>"),
    };

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid METRICS_ADDR {:?}", addr))?;
        metrics::init_metrics(addr).context("failed to start Prometheus exporter")?;
        info!("Prometheus metrics on http://{}/metrics", addr);
    }

    let raw = tokio::fs::read(&job_path)
        .await
        .with_context(|| format!("failed to read {}", job_path.display()))?;
    let jobs = serde_json::from_slice::<JobFile>(&raw)
        .with_context(|| format!("invalid job file {}", job_path.display()))?
        .into_jobs();

    let config = RenderConfig::from_env();
    info!("Render config: {:?}", config);

    let mut renderer = Renderer::new(config).context("failed to create renderer")?;
    match SttConfig::from_env() {
        Ok(stt) => {
            let client = GoogleSttClient::new(stt).context("failed to create STT client")?;
            renderer = renderer.with_transcriber(Arc::new(client));
            info!("Voice transcription enabled");
        }
        Err(e) => info!("Voice transcription disabled: {}", e),
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, cancelling renders");
            let _ = cancel_tx.send(true);
        }
    });

    let results = render_batch(&renderer, &jobs, Some(cancel_rx)).await;

    let mut failed = 0;
    for (job, result) in jobs.iter().zip(results) {
        match result {
            Ok(outcome) => println!("{}", serde_json::to_string(&outcome)?),
            Err(e) => {
                failed += 1;
                error!(job_id = %job.job_id, kind = e.kind(), "Render failed: {}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} renders failed", failed, jobs.len());
    }
    Ok(())
}
