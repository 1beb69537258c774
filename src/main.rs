mod cli;
mod pipeline;
mod storage;
mod video;
mod web;

use anyhow::{Context, Result};
use cli::Args;
use pipeline::detector::ObjectDetector;
use web::server::run_server;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse_args();

    std::fs::create_dir_all(&args.upload_dir)
        .with_context(|| format!("Failed to create upload dir: {:?}", args.upload_dir))?;
    tracing::info!("Upload folder path: {}", args.upload_dir.display());

    // Load the detection model once; requests share this handle
    let detector = ObjectDetector::new(&args.model_path)
        .with_context(|| format!("Failed to load detection model: {}", args.model_path))?;
    tracing::info!("Detection model loaded successfully");

    run_server(args, detector).await?;

    Ok(())
}
