//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use vclean_models::{JobId, JobStatus, ProcessingParams, TaskSnapshot};
use vclean_tracker::{ErrorKind, JobTracker, TrackerConfig, TrackerEvent};
use vclean_transport::{ProgressFn, TransportClient, TransportConfig};

use crate::activity::{ActivityEntry, ActivityLog};
use crate::{Cli, Command, UploadArgs};

/// Cadence of the health watch loop.
const HEALTH_WATCH_INTERVAL: Duration = Duration::from_secs(30);

/// Cadence of `status --wait` polling.
const STATUS_WAIT_INTERVAL: Duration = Duration::from_secs(2);

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = TransportConfig::from_env();
    if let Some(server) = &cli.server {
        config = config.with_base_url(server.clone());
    }
    let client = TransportClient::new(config)?;

    match cli.command {
        Command::Upload(args) => upload(client, args).await,
        Command::Status { task_id, wait } => status(client, task_id, wait).await,
        Command::Cancel { task_id } => cancel(client, task_id).await,
        Command::Download { task_id, output } => download(client, task_id, output).await,
        Command::Health { watch } => health(client, watch).await,
        Command::Log => show_log(),
    }
}

/// Upload through the tracker and, when asked, follow the job to its end
/// via the boundary events. Ctrl-C while waiting cancels the job.
async fn upload(client: TransportClient, args: UploadArgs) -> anyhow::Result<()> {
    let params = ProcessingParams {
        epsilon: args.epsilon,
        video_strength: args.strength,
        audio_level: args.audio,
        every_n_frames: args.frames,
        user_id: args.user.clone(),
    };

    let tracker = JobTracker::new(Arc::new(client.clone()), TrackerConfig::from_env());
    let mut events = tracker.subscribe();

    let job_id = tracker.submit_job(&args.video, params).await?;
    println!("task {job_id} submitted");

    let mut log = ActivityLog::load_default();
    if let Some(job) = tracker.current_job() {
        log.append(ActivityEntry::from_job(&job))?;
    }

    if !args.wait && args.download_dir.is_none() {
        println!("track it with: vclean status {job_id} --wait");
        return Ok(());
    }

    let mut last_line = String::new();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(TrackerEvent::StatusChanged { job }) => {
                    let line = format!("[{}] {}%", job.display_status, job.progress_percent);
                    if line != last_line {
                        println!("{line}");
                        last_line = line;
                    }
                }
                Ok(TrackerEvent::JobTerminal { job, duration_ms }) => {
                    if job.status != JobStatus::Cancelled {
                        log.finish_latest(&job.display_status, duration_ms)?;
                    }
                    match job.status {
                        JobStatus::Completed => {
                            println!("done in {duration_ms}ms");
                            if let Some(dir) = &args.download_dir {
                                let dest = dir.join(artifact_name(&job.id));
                                save_artifact(&client, &job.id, &dest).await?;
                            }
                        }
                        JobStatus::Failed => {
                            anyhow::bail!(
                                "processing failed: {}",
                                job.last_message
                                    .unwrap_or_else(|| "unknown error".to_string())
                            );
                        }
                        _ => println!("task cancelled"),
                    }
                    return Ok(());
                }
                Ok(TrackerEvent::Error { kind: ErrorKind::Poll, detail }) => {
                    anyhow::bail!("status polling stopped: {detail}");
                }
                Ok(TrackerEvent::Error { kind, detail }) => {
                    warn!(%kind, "{detail}");
                }
                Ok(TrackerEvent::UploadProgress { .. }) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => anyhow::bail!("tracker event channel closed"),
            },
            _ = tokio::signal::ctrl_c() => {
                println!("cancelling...");
                tracker.cancel_job().ok();
            }
        }
    }
}

async fn status(client: TransportClient, task_id: String, wait: bool) -> anyhow::Result<()> {
    let job_id = JobId::new(task_id);

    if !wait {
        let snapshot = client.fetch_status(&job_id).await?;
        print_snapshot(&snapshot);
        return Ok(());
    }

    loop {
        let snapshot = client.fetch_status(&job_id).await?;
        println!(
            "[{}] {}%",
            snapshot.status.to_uppercase(),
            snapshot.normalized_progress()
        );
        if matches!(snapshot.known_status(), Some(status) if status.is_terminal()) {
            if let Some(message) = &snapshot.message {
                println!("{message}");
            }
            return Ok(());
        }
        tokio::time::sleep(STATUS_WAIT_INTERVAL).await;
    }
}

async fn cancel(client: TransportClient, task_id: String) -> anyhow::Result<()> {
    client.cancel(&JobId::new(task_id)).await?;
    println!("cancel requested");
    Ok(())
}

async fn download(
    client: TransportClient,
    task_id: String,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let job_id = JobId::new(task_id);
    let dest = output.unwrap_or_else(|| PathBuf::from(artifact_name(&job_id)));
    save_artifact(&client, &job_id, &dest).await
}

async fn health(client: TransportClient, watch: bool) -> anyhow::Result<()> {
    if !watch {
        let healthy = client.health().await;
        print_health(&client, healthy);
        return if healthy {
            Ok(())
        } else {
            anyhow::bail!("service unreachable or unhealthy")
        };
    }

    let mut ticker = tokio::time::interval(HEALTH_WATCH_INTERVAL);
    let mut last: Option<bool> = None;
    loop {
        ticker.tick().await;
        let healthy = client.health().await;
        if last != Some(healthy) {
            print_health(&client, healthy);
            last = Some(healthy);
        }
    }
}

fn show_log() -> anyhow::Result<()> {
    let log = ActivityLog::load_default();
    if log.entries().is_empty() {
        println!("no activity recorded yet");
        return Ok(());
    }

    for entry in log.entries() {
        println!(
            "{}  {:<12} {:<28} {:>10} B  {}  {}  {}ms",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.user,
            entry.filename,
            entry.file_size_bytes,
            entry.params,
            entry.status,
            entry.duration_ms,
        );
    }
    Ok(())
}

async fn save_artifact(
    client: &TransportClient,
    job_id: &JobId,
    dest: &Path,
) -> anyhow::Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let progress: ProgressFn = Arc::new(|percent| {
        print!("\rdownloading: {percent}%");
        let _ = std::io::Write::flush(&mut std::io::stdout());
    });

    let written = client.fetch_artifact_to(job_id, dest, Some(progress)).await?;
    println!("\nsaved {} ({written} bytes)", dest.display());
    Ok(())
}

fn artifact_name(job_id: &JobId) -> String {
    let short: String = job_id.as_str().chars().take(8).collect();
    format!("protected_{short}.mp4")
}

fn print_snapshot(snapshot: &TaskSnapshot) {
    match serde_json::to_string_pretty(snapshot) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{snapshot:?}"),
    }
}

fn print_health(client: &TransportClient, healthy: bool) {
    if healthy {
        println!("{} is healthy", client.base_url());
    } else {
        println!("{} is offline or unhealthy", client.base_url());
    }
}
