mod cli;
mod ui;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use easeflow::generation::CATALOG;
use easeflow::{EngineConfig, ImageSubmission, JobId, JobStatus, Orchestrator, VideoSubmission};
use ui::JobProgress;

const FOLLOW_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Models => {
            ui::print_models(CATALOG);
            Ok(())
        }
        Command::Image {
            prompt,
            model,
            aspect_ratio,
            resolution,
            references,
        } => {
            let orch = build(&cli.config)?;
            let reference_images = references
                .iter()
                .map(|r| load_reference(r))
                .collect::<Result<Vec<_>>>()?;
            let id = orch
                .submit_image(
                    ImageSubmission {
                        prompt: prompt.clone(),
                        model,
                        aspect_ratio,
                        resolution,
                        reference_image: None,
                        reference_images,
                    },
                    None,
                )
                .await?;
            follow(&orch, &id, &prompt).await
        }
        Command::Video {
            prompt,
            ratio,
            resolution,
            duration,
            mode,
            reference,
        } => {
            let orch = build(&cli.config)?;
            let reference_image = reference.as_deref().map(load_reference).transpose()?;
            let id = orch
                .submit_video(
                    VideoSubmission {
                        prompt: prompt.clone(),
                        ratio,
                        resolution,
                        duration,
                        mode,
                        reference_image,
                    },
                    None,
                )
                .await?;
            follow(&orch, &id, &prompt).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "easeflow=debug" } else { "easeflow=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build(config_path: &Path) -> Result<Orchestrator> {
    let config = EngineConfig::load_from(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let orch = Orchestrator::new(config).context("building engine")?;
    orch.spawn_reaper();
    Ok(orch)
}

/// Poll the job until it is terminal, rendering progress on the way.
async fn follow(orch: &Orchestrator, id: &JobId, prompt: &str) -> Result<()> {
    let progress = JobProgress::start(id.as_str(), prompt);
    loop {
        let Some(view) = orch.status(id).await else {
            bail!("job {id} disappeared from the store");
        };
        progress.update(&view, orch.limiter().queued());
        if view.status.is_terminal() {
            progress.finish(&view);
            if view.status == JobStatus::Error {
                bail!("job {id} failed");
            }
            return Ok(());
        }
        tokio::time::sleep(FOLLOW_INTERVAL).await;
    }
}

/// URLs pass through; anything else is read from disk as a data URI.
fn load_reference(reference: &str) -> Result<String> {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Ok(reference.to_string());
    }
    let path = Path::new(reference);
    let bytes = std::fs::read(path).with_context(|| format!("reading {reference}"))?;
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    };
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}
