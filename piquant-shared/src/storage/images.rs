/// Image file lifecycle
///
/// Every item record references exactly one image file on disk. This module
/// keeps the two in lockstep:
///
/// - `store` writes an uploaded file under a collision-proof generated name
/// - `replace` retires the old file (best-effort) and stores the new one
/// - `remove` retires a file once its record is gone (best-effort)
///
/// Deletion is deliberately best-effort: an orphaned file on disk is less
/// harmful than a record mutation blocked by filesystem trouble, so removal
/// failures are logged and swallowed. The opposite drift — a surviving
/// record pointing at a missing file — is never produced on the success
/// path, because records are only updated after `store` has succeeded.
///
/// Stored names are `{uuid-v4}.{ext}`: the random component guarantees
/// uniqueness across concurrent uploads, and the client-supplied filename
/// contributes nothing but a sanitized extension.
///
/// # Example
///
/// ```no_run
/// use piquant_shared::storage::images::{public_url, ImageStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = ImageStore::new("images");
/// store.ensure_root().await?;
///
/// let filename = store.store(Some("chili.png"), b"...bytes...").await?;
/// let url = public_url("http://localhost:8080", &filename);
/// assert!(url.starts_with("http://localhost:8080/images/"));
///
/// store.remove(&url).await;
/// # Ok(())
/// # }
/// ```

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// URL path segment under which stored images are served
const URL_PREFIX: &str = "/images/";

/// Extension used when the upload carries no usable one
const DEFAULT_EXTENSION: &str = "bin";

/// Error type for image storage operations
///
/// Only `store` (and the storing half of `replace`) can fail; deletions
/// never surface errors.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Writing the uploaded bytes to disk failed
    #[error("failed to store image file: {0}")]
    Write(#[from] std::io::Error),
}

/// Manages the on-disk image directory
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Creates a store rooted at `root`
    ///
    /// The directory is not touched here; call [`ImageStore::ensure_root`]
    /// once at startup.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory stored files live in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the storage directory if it does not exist yet
    pub async fn ensure_root(&self) -> Result<(), ImageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Persists uploaded bytes under a freshly generated filename
    ///
    /// `original_name` is only consulted for its extension; the stored name
    /// is `{uuid-v4}.{ext}` and never derived from client input beyond that.
    ///
    /// # Returns
    ///
    /// The stored filename (not a URL; see [`public_url`]).
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Write`] if the file cannot be written.
    pub async fn store(
        &self,
        original_name: Option<&str>,
        data: &[u8],
    ) -> Result<String, ImageError> {
        let filename = format!("{}.{}", Uuid::new_v4(), sanitize_extension(original_name));
        let path = self.root.join(&filename);

        tokio::fs::write(&path, data).await?;
        debug!(filename = %filename, bytes = data.len(), "stored image file");

        Ok(filename)
    }

    /// Retires the file behind `old_image_url`, then stores a new upload
    ///
    /// The deletion half is best-effort: a failure there is logged and does
    /// not block the new store. The store half propagates errors normally.
    pub async fn replace(
        &self,
        old_image_url: &str,
        original_name: Option<&str>,
        data: &[u8],
    ) -> Result<String, ImageError> {
        self.remove(old_image_url).await;
        self.store(original_name, data).await
    }

    /// Deletes the file referenced by `image_url`, best-effort
    ///
    /// Never fails: an unparseable URL or a filesystem error is logged and
    /// swallowed, since the caller's record operation must still succeed and
    /// an orphaned file is not user-actionable.
    pub async fn remove(&self, image_url: &str) {
        let Some(filename) = filename_from_url(image_url) else {
            warn!(url = %image_url, "image url does not reference a stored file, skipping delete");
            return;
        };

        if let Err(e) = tokio::fs::remove_file(self.root.join(&filename)).await {
            warn!(filename = %filename, error = %e, "failed to delete image file");
        } else {
            debug!(filename = %filename, "deleted image file");
        }
    }
}

/// Builds the public URL for a stored filename
///
/// Pure and deterministic: the URL is a function of the base URL and the
/// filename alone, with no persisted state behind it.
pub fn public_url(base_url: &str, filename: &str) -> String {
    format!("{}{}{}", base_url.trim_end_matches('/'), URL_PREFIX, filename)
}

/// Extracts the stored filename from a public image URL
///
/// Returns `None` when the URL does not contain the image path segment or
/// when the trailing component would escape the storage directory.
pub fn filename_from_url(image_url: &str) -> Option<String> {
    let (_, filename) = image_url.split_once(URL_PREFIX)?;

    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return None;
    }

    Some(filename.to_string())
}

/// Reduces a client-supplied filename to a safe lowercase extension
fn sanitize_extension(original_name: Option<&str>) -> String {
    let ext = original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .unwrap_or("");

    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(8)
        .collect();

    if ext.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        ext
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, ImageStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = ImageStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension(Some("photo.PNG")), "png");
        assert_eq!(sanitize_extension(Some("archive.tar.gz")), "gz");
        assert_eq!(sanitize_extension(Some("noext")), "bin");
        assert_eq!(sanitize_extension(Some("trailingdot.")), "bin");
        assert_eq!(sanitize_extension(Some("weird.p/n\\g")), "png");
        assert_eq!(sanitize_extension(None), "bin");
    }

    #[test]
    fn test_public_url_shape() {
        assert_eq!(
            public_url("http://localhost:8080", "abc.png"),
            "http://localhost:8080/images/abc.png"
        );
        // Trailing slash on the base does not double up.
        assert_eq!(
            public_url("http://localhost:8080/", "abc.png"),
            "http://localhost:8080/images/abc.png"
        );
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("http://localhost:8080/images/abc.png"),
            Some("abc.png".to_string())
        );
        assert_eq!(filename_from_url("http://localhost:8080/other/abc.png"), None);
        assert_eq!(filename_from_url("http://localhost:8080/images/"), None);
        assert_eq!(
            filename_from_url("http://localhost:8080/images/../secret"),
            None
        );
        assert_eq!(
            filename_from_url("http://localhost:8080/images/a/b.png"),
            None
        );
    }

    #[tokio::test]
    async fn test_store_writes_file_with_generated_name() {
        let (_dir, store) = temp_store();

        let filename = store.store(Some("sauce.jpg"), b"image-bytes").await.unwrap();

        assert!(filename.ends_with(".jpg"));
        // Generated stem, not the client's name.
        assert!(!filename.contains("sauce"));

        let on_disk = tokio::fs::read(store.root().join(&filename)).await.unwrap();
        assert_eq!(on_disk, b"image-bytes");
    }

    #[tokio::test]
    async fn test_store_names_never_collide() {
        let (_dir, store) = temp_store();

        let a = store.store(Some("same.png"), b"a").await.unwrap();
        let b = store.store(Some("same.png"), b"b").await.unwrap();

        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_remove_deletes_stored_file() {
        let (_dir, store) = temp_store();

        let filename = store.store(Some("x.png"), b"bytes").await.unwrap();
        let url = public_url("http://localhost:8080", &filename);

        store.remove(&url).await;

        assert!(!store.root().join(&filename).exists());
    }

    #[tokio::test]
    async fn test_remove_of_missing_file_is_silent() {
        let (_dir, store) = temp_store();

        // Neither a missing file nor an unparseable URL panics or errors.
        store.remove("http://localhost:8080/images/gone.png").await;
        store.remove("http://localhost:8080/images/../../etc/passwd").await;
        store.remove("not a url at all").await;
    }

    #[tokio::test]
    async fn test_replace_swaps_files() {
        let (_dir, store) = temp_store();

        let old = store.store(Some("old.png"), b"old").await.unwrap();
        let old_url = public_url("http://localhost:8080", &old);

        let new = store.replace(&old_url, Some("new.gif"), b"new").await.unwrap();

        assert!(!store.root().join(&old).exists());
        assert!(store.root().join(&new).exists());
        assert!(new.ends_with(".gif"));
    }

    #[tokio::test]
    async fn test_replace_survives_missing_old_file() {
        let (_dir, store) = temp_store();

        let new = store
            .replace("http://localhost:8080/images/never-existed.png", Some("n.png"), b"n")
            .await
            .unwrap();

        assert!(store.root().join(&new).exists());
    }
}
