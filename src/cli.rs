use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to bind to
    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// Shared storage directory for uploaded and annotated videos
    #[arg(long, env = "VIDMARK_UPLOAD_DIR", default_value = "./uploads")]
    pub upload_dir: PathBuf,

    /// Path to the detection model weights
    #[arg(long, env = "VIDMARK_MODEL_PATH")]
    pub model_path: String,

    /// Trusted origins for cross-origin requests
    #[arg(
        long,
        env = "VIDMARK_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
