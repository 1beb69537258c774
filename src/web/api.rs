use crate::pipeline::annotate::annotate_video;
use crate::storage;
use crate::web::error::{ApiError, ApiResult};
use crate::web::server::AppState;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_path: String,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub success: bool,
    pub annotated_video_url: String,
    pub processing_time: f64,
    pub total_frames: usize,
}

/// Handle a multipart upload: sanitize the client-supplied name and persist
/// the raw bytes under the shared storage directory, overwriting any existing
/// file of the same name.
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        if original_name.is_empty() {
            return Err(ApiError::bad_request("No filename provided"));
        }

        let filename = storage::sanitize_filename(&original_name);
        if filename.is_empty() {
            return Err(ApiError::bad_request(format!(
                "Invalid filename: {}",
                original_name
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        let path = storage::save_upload(&state.config.upload_dir, &filename, &bytes)?;
        tracing::info!("File saved to: {}", path.display());

        return Ok(Json(UploadResponse {
            success: true,
            file_path: filename,
            message: "File uploaded successfully".to_string(),
        }));
    }

    Err(ApiError::bad_request("No file provided"))
}

/// Run the annotation pipeline over a previously uploaded video referenced by
/// the basename of `videoUrl`. Blocks a worker thread for the duration; the
/// single model handle serializes concurrent requests.
pub async fn detect_handler(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<DetectRequest>>,
) -> ApiResult<Json<DetectResponse>> {
    let video_url = match payload.as_ref().and_then(|p| p.video_url.as_deref()) {
        Some(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => return Err(ApiError::bad_request("No video URL provided")),
    };
    tracing::info!("Received video URL: {}", video_url);

    let basename = video_url.rsplit('/').next().unwrap_or_default();
    let filename = storage::sanitize_filename(basename);
    if filename.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Invalid video reference: {}",
            video_url
        )));
    }

    let input_path = state.config.upload_dir.join(&filename);
    if !input_path.exists() {
        return Err(ApiError::not_found(format!(
            "Video file not found: {}",
            filename
        )));
    }

    let output_name = storage::output_filename();
    let output_path = state.config.upload_dir.join(&output_name);

    let detector = state.detector.clone();
    let report = tokio::task::spawn_blocking(move || {
        let mut detector = detector
            .lock()
            .map_err(|_| anyhow::anyhow!("Detector lock poisoned"))?;
        annotate_video(&input_path, &output_path, &mut *detector)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Annotation task failed: {}", e)))??;

    Ok(Json(DetectResponse {
        success: true,
        annotated_video_url: format!("/uploads/{}", output_name),
        processing_time: report.elapsed.as_secs_f64(),
        total_frames: report.frames,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_request_accepts_camel_case_payload() {
        let req: DetectRequest =
            serde_json::from_str(r#"{"videoUrl": "/uploads/game.mov"}"#).unwrap();
        assert_eq!(req.video_url.as_deref(), Some("/uploads/game.mov"));

        let empty: DetectRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.video_url.is_none());
    }

    #[test]
    fn responses_serialize_with_camel_case_keys() {
        let body = serde_json::to_value(DetectResponse {
            success: true,
            annotated_video_url: "/uploads/processed_1700000000.mp4".to_string(),
            processing_time: 1.5,
            total_frames: 42,
        })
        .unwrap();
        assert_eq!(body["annotatedVideoUrl"], "/uploads/processed_1700000000.mp4");
        assert_eq!(body["processingTime"], 1.5);
        assert_eq!(body["totalFrames"], 42);

        let upload = serde_json::to_value(UploadResponse {
            success: true,
            file_path: "game.mov".to_string(),
            message: "File uploaded successfully".to_string(),
        })
        .unwrap();
        assert_eq!(upload["filePath"], "game.mov");
    }
}
