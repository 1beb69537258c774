use crate::cli::Args;
use crate::pipeline::detector::ObjectDetector;
use crate::web::api::{detect_handler, upload_handler};
use crate::web::files::serve_upload;
use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Matches the original service's 100MB multipart cap.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub struct AppState {
    pub config: Args,
    /// Process-wide model handle, loaded once at startup. Inference needs
    /// exclusive access, so concurrent requests serialize here.
    pub detector: Arc<Mutex<ObjectDetector>>,
}

/// Cross-origin layer for the trusted origin allow-list. Handles preflight
/// `OPTIONS` for the POST endpoints and echoes the matching origin back.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .expose_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .allow_credentials(true)
        .allow_origin(origins)
}

pub async fn run_server(args: Args, detector: ObjectDetector) -> Result<()> {
    let host: IpAddr = args.host;
    let port = args.port;
    let allowed_origins = args.allowed_origins.clone();

    let state = Arc::new(AppState {
        config: args,
        detector: Arc::new(Mutex::new(detector)),
    });

    let app = Router::new()
        .route("/upload", post(upload_handler))
        .route("/detect", post(detect_handler))
        .route("/uploads/:filename", get(serve_upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer(&allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let mut current_port = port;
    let listener = loop {
        let addr = SocketAddr::new(host, current_port);
        match TcpListener::bind(addr) {
            Ok(listener) => {
                listener.set_nonblocking(true)?;
                info!("Successfully bound to {}", addr);
                break listener;
            }
            Err(e) => {
                warn!("Failed to bind to {}: {}. Trying next port...", addr, e);
                current_port = current_port.wrapping_add(1);
                if current_port == 0 {
                    return Err(anyhow::anyhow!("No available ports found"));
                }
            }
        }
    };

    let tokio_listener = tokio::net::TcpListener::from_std(listener)?;
    info!(
        "Vidmark server started on http://{:?}",
        tokio_listener.local_addr()?
    );

    axum::serve(tokio_listener, app).await?;

    Ok(())
}
