use std::path::Path;

use reel_media::{check_ffmpeg, check_ffprobe, FfmpegEngine};
use reel_storage::R2Client;
use reel_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_tools()?;
    ensure_env_present(&[
        "R2_ENDPOINT_URL",
        "R2_ACCESS_KEY_ID",
        "R2_SECRET_ACCESS_KEY",
        "R2_BUCKET_NAME",
        "GEMINI_API_KEY",
    ])?;
    ensure_storage().await?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_tools() -> anyhow::Result<()> {
    FfmpegEngine::check_available().map_err(|e| anyhow::anyhow!("{}", e))?;
    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("{}", e))?;
    let ffprobe = check_ffprobe().map_err(|e| anyhow::anyhow!("{}", e))?;
    println!(
        "worker-selfcheck: ffmpeg={} ffprobe={}",
        ffmpeg.display(),
        ffprobe.display()
    );
    Ok(())
}

async fn ensure_storage() -> anyhow::Result<()> {
    let client = R2Client::from_env().map_err(|e| anyhow::anyhow!("{}", e))?;
    client
        .check_connectivity()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    println!("worker-selfcheck: bucket {} reachable", client.bucket());
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    let missing: Vec<&str> = vars
        .iter()
        .copied()
        .filter(|var| std::env::var(var).map(|v| v.trim().is_empty()).unwrap_or(true))
        .collect();
    if !missing.is_empty() {
        return Err(anyhow::anyhow!(
            "missing required env vars: {}",
            missing.join(", ")
        ));
    }
    Ok(())
}
