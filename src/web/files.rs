// File server for the shared storage directory, with single-range partial
// content support so clients can seek within videos.

use crate::storage;
use crate::web::error::ApiError;
use crate::web::server::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Response, StatusCode};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

/// An inclusive byte range resolved against a concrete file length.
#[derive(Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No range header or one we don't handle (e.g. multipart): full body.
    Full,
    /// A single satisfiable range.
    Partial(ByteRange),
    /// Well-formed but unsatisfiable: respond 416.
    Unsatisfiable,
}

/// Interpret a `Range` header against a file of `file_len` bytes. Only single
/// `bytes=` ranges are honored; malformed headers fall back to a full
/// response rather than an error.
pub fn resolve_range(header: Option<&str>, file_len: u64) -> RangeOutcome {
    let Some(spec) = header.and_then(|h| h.strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };
    if spec.contains(',') {
        return RangeOutcome::Full;
    }

    let Some((start_s, end_s)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };

    let range = match (start_s.is_empty(), end_s.is_empty()) {
        // bytes=-N: final N bytes
        (true, false) => {
            let Ok(suffix) = end_s.parse::<u64>() else {
                return RangeOutcome::Full;
            };
            if suffix == 0 || file_len == 0 {
                return RangeOutcome::Unsatisfiable;
            }
            let start = file_len.saturating_sub(suffix);
            ByteRange {
                start,
                end: file_len - 1,
            }
        }
        // bytes=N-: from N to the end
        (false, true) => {
            let Ok(start) = start_s.parse::<u64>() else {
                return RangeOutcome::Full;
            };
            if start >= file_len {
                return RangeOutcome::Unsatisfiable;
            }
            ByteRange {
                start,
                end: file_len - 1,
            }
        }
        // bytes=N-M
        (false, false) => {
            let (Ok(start), Ok(end)) = (start_s.parse::<u64>(), end_s.parse::<u64>()) else {
                return RangeOutcome::Full;
            };
            if start > end || start >= file_len {
                return RangeOutcome::Unsatisfiable;
            }
            ByteRange {
                start,
                end: end.min(file_len - 1),
            }
        }
        (true, true) => return RangeOutcome::Full,
    };

    RangeOutcome::Partial(range)
}

/// Stream a stored or produced video file by name. The filename must already
/// be in sanitized form; anything else is rejected before touching the
/// filesystem.
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response<Body>, ApiError> {
    let path = storage::resolve_upload(&state.config.upload_dir, &filename)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    if !path.exists() {
        return Err(ApiError::not_found("File not found"));
    }

    let mut file = File::open(&path).map_err(|e| ApiError::internal(e.to_string()))?;
    let file_len = file
        .metadata()
        .map_err(|e| ApiError::internal(e.to_string()))?
        .len();

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    let builder = Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::ACCEPT_RANGES, "bytes");

    let response = match resolve_range(range_header, file_len) {
        RangeOutcome::Unsatisfiable => builder
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{}", file_len))
            .body(Body::empty()),
        RangeOutcome::Partial(range) => {
            let mut buf = vec![0u8; range.len() as usize];
            file.seek(SeekFrom::Start(range.start))
                .and_then(|_| file.read_exact(&mut buf))
                .map_err(|e| ApiError::internal(e.to_string()))?;

            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", range.start, range.end, file_len),
                )
                .header(header::CONTENT_LENGTH, range.len())
                .body(Body::from(buf))
        }
        RangeOutcome::Full => {
            let mut buf = Vec::with_capacity(file_len as usize);
            file.read_to_end(&mut buf)
                .map_err(|e| ApiError::internal(e.to_string()))?;

            builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, file_len)
                .body(Body::from(buf))
        }
    };

    response.map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_header_serves_full_body() {
        assert_eq!(resolve_range(None, 100), RangeOutcome::Full);
    }

    #[test]
    fn bounded_range_is_clamped_to_file_length() {
        assert_eq!(
            resolve_range(Some("bytes=0-499"), 100),
            RangeOutcome::Partial(ByteRange { start: 0, end: 99 })
        );
        assert_eq!(
            resolve_range(Some("bytes=10-19"), 100),
            RangeOutcome::Partial(ByteRange { start: 10, end: 19 })
        );
    }

    #[test]
    fn open_and_suffix_ranges_resolve() {
        assert_eq!(
            resolve_range(Some("bytes=90-"), 100),
            RangeOutcome::Partial(ByteRange { start: 90, end: 99 })
        );
        assert_eq!(
            resolve_range(Some("bytes=-10"), 100),
            RangeOutcome::Partial(ByteRange { start: 90, end: 99 })
        );
        // Suffix longer than the file covers the whole file
        assert_eq!(
            resolve_range(Some("bytes=-500"), 100),
            RangeOutcome::Partial(ByteRange { start: 0, end: 99 })
        );
    }

    #[test]
    fn out_of_bounds_ranges_are_unsatisfiable() {
        assert_eq!(
            resolve_range(Some("bytes=100-"), 100),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            resolve_range(Some("bytes=50-20"), 100),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            resolve_range(Some("bytes=-0"), 100),
            RangeOutcome::Unsatisfiable
        );
    }

    #[test]
    fn malformed_and_multipart_ranges_fall_back_to_full() {
        assert_eq!(resolve_range(Some("frames=0-10"), 100), RangeOutcome::Full);
        assert_eq!(resolve_range(Some("bytes=abc-10"), 100), RangeOutcome::Full);
        assert_eq!(resolve_range(Some("bytes=-"), 100), RangeOutcome::Full);
        assert_eq!(
            resolve_range(Some("bytes=0-10,20-30"), 100),
            RangeOutcome::Full
        );
    }

    #[test]
    fn range_len_is_inclusive() {
        assert_eq!(ByteRange { start: 0, end: 99 }.len(), 100);
        assert_eq!(ByteRange { start: 10, end: 10 }.len(), 1);
    }
}
