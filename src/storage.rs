// Shared storage directory helpers
//
// Both the upload handler and the annotation pipeline write here; the file
// server reads from it. No locking: uploads are last-writer-wins and pipeline
// outputs carry timestamped names.

use anyhow::{anyhow, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

/// Reduce a client-supplied filename to a safe basename.
///
/// Directory components (either separator) are stripped, every character
/// outside `[A-Za-z0-9._-]` becomes `_`, and leading/trailing dots are
/// removed. Idempotent: applying this to an already-sanitized name returns
/// it unchanged. Pure traversal inputs like `..` collapse to an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches('.').to_string()
}

/// Resolve a filename inside the storage root, rejecting anything that is not
/// already in sanitized form. This is the file server's traversal guard.
pub fn resolve_upload(root: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() || sanitize_filename(name) != name {
        return Err(anyhow!("Invalid filename: {}", name));
    }
    Ok(root.join(name))
}

/// Persist raw upload bytes under the sanitized name, creating the storage
/// directory tree if absent. An existing file of the same name is overwritten.
pub fn save_upload(root: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(root)?;
    let path = root.join(name);
    fs::write(&path, bytes)?;
    Ok(path)
}

/// Generated name for a pipeline output file.
pub fn output_filename() -> String {
    format!("processed_{}.mp4", Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_ordinary_names() {
        assert_eq!(sanitize_filename("game.mov"), "game.mov");
        assert_eq!(sanitize_filename("clip_01-final.mp4"), "clip_01-final.mp4");
    }

    #[test]
    fn sanitize_strips_directory_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("/var/tmp/x.mp4"), "x.mp4");
        assert_eq!(sanitize_filename("C:\\Users\\me\\x.mp4"), "x.mp4");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my video (1).mp4"), "my_video__1_.mp4");
        assert_eq!(sanitize_filename("añotado.mp4"), "a_otado.mp4");
    }

    #[test]
    fn sanitize_collapses_traversal_to_empty() {
        assert_eq!(sanitize_filename(".."), "");
        assert_eq!(sanitize_filename("."), "");
        assert_eq!(sanitize_filename("..."), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in ["game.mov", "../../x.mp4", "my video (1).mp4", "..hidden"] {
            let once = sanitize_filename(raw);
            assert_eq!(sanitize_filename(&once), once);
        }
    }

    #[test]
    fn resolve_rejects_unsanitized_names() {
        let root = Path::new("/srv/uploads");
        assert!(resolve_upload(root, "").is_err());
        assert!(resolve_upload(root, "..").is_err());
        assert!(resolve_upload(root, "a/b.mp4").is_err());
        assert!(resolve_upload(root, "a b.mp4").is_err());
        assert_eq!(
            resolve_upload(root, "b.mp4").unwrap(),
            PathBuf::from("/srv/uploads/b.mp4")
        );
    }

    #[test]
    fn save_overwrites_and_creates_the_tree() {
        let root = std::env::temp_dir().join("vidmark_storage_test");
        let _ = fs::remove_dir_all(&root);

        let path = save_upload(&root, "clip.mp4", b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        // Same name overwrites: last writer wins
        save_upload(&root, "clip.mp4", b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn output_names_match_expected_shape() {
        let name = output_filename();
        let stem = name
            .strip_prefix("processed_")
            .and_then(|s| s.strip_suffix(".mp4"))
            .expect("prefix and suffix");
        assert!(stem.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(sanitize_filename(&name), name);
    }
}
