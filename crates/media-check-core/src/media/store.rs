use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use super::{validate_file, validate_text, MediaKind, DEFAULT_MAX_FILE_BYTES};

/// Record of one item written into the media directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMedia {
    pub id: String,
    pub name: String,
    pub kind: MediaKind,
    pub size: u64,
    pub created_at: String,
}

/// Saves submitted media into a user-chosen local directory before it is
/// handed to the backend.
pub struct MediaStore {
    base_path: PathBuf,
    max_file_bytes: u64,
    sequence: AtomicUsize,
}

impl MediaStore {
    /// Create a store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            sequence: AtomicUsize::new(0),
        }
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Copy a media file into the directory, keeping its name unless taken.
    pub async fn save_file(&self, source: &Path) -> Result<SavedMedia> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("`{}` has no usable file name", source.display()))?;
        let size = fs::metadata(source)
            .await
            .with_context(|| format!("failed to stat {}", source.display()))?
            .len();
        let media = validate_file(name, size, self.max_file_bytes)?;

        let target = self.prepare_target(name).await?;
        fs::copy(source, &target).await.with_context(|| {
            format!(
                "failed to copy {} into {}",
                source.display(),
                target.display()
            )
        })?;
        Ok(self.record(&target, media.kind, size))
    }

    /// Write pasted text into the directory as a `.txt` file.
    pub async fn save_text(&self, name: &str, text: &str) -> Result<SavedMedia> {
        validate_text(text)?;
        let target = self.prepare_target(name).await?;
        fs::write(&target, text)
            .await
            .with_context(|| format!("failed to write {}", target.display()))?;
        Ok(self.record(&target, MediaKind::Text, text.len() as u64))
    }

    async fn prepare_target(&self, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_path).await.with_context(|| {
            format!(
                "failed to create media directory {}",
                self.base_path.display()
            )
        })?;
        let target = unique_path(&self.base_path, name).await;
        debug!(target = %target.display(), "saving media");
        Ok(target)
    }

    fn record(&self, target: &Path, kind: MediaKind, size: u64) -> SavedMedia {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(%name, kind = kind.as_str(), size, "media saved");
        SavedMedia {
            id: format!("media-{seq}"),
            name,
            kind,
            size,
            created_at: humantime::format_rfc3339_millis(SystemTime::now()).to_string(),
        }
    }
}

/// First free path for `name` in `dir`, suffixing `-1`, `-2`, ... before the extension.
async fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let mut counter = 0usize;
    loop {
        let candidate = numbered_path(dir, name, counter);
        if !exists(&candidate).await {
            return candidate;
        }
        counter += 1;
    }
}

/// `dir/name` for `counter == 0`, otherwise `dir/<stem>-<counter><.ext>`.
pub(crate) fn numbered_path(dir: &Path, name: &str, counter: usize) -> PathBuf {
    if counter == 0 {
        return dir.join(name);
    }
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    dir.join(format!("{stem}-{counter}{ext}"))
}

async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_file_under_original_name() {
        let source_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("promo.mp4");
        std::fs::write(&source, b"fake video").unwrap();

        let target_dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(target_dir.path().join("session"));
        let saved = store.save_file(&source).await.unwrap();

        assert_eq!(saved.name, "promo.mp4");
        assert_eq!(saved.kind, MediaKind::Video);
        assert_eq!(saved.size, 10);
        assert_eq!(saved.id, "media-1");
        assert!(store.base_path().join("promo.mp4").exists());
    }

    #[tokio::test]
    async fn never_overwrites_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        let first = store.save_text("notes.txt", "first").await.unwrap();
        let second = store.save_text("notes.txt", "second").await.unwrap();
        let third = store.save_text("notes.txt", "third").await.unwrap();

        assert_eq!(first.name, "notes.txt");
        assert_eq!(second.name, "notes-1.txt");
        assert_eq!(third.name, "notes-2.txt");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
            "first"
        );
    }

    #[tokio::test]
    async fn rejects_invalid_media() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tool.exe");
        std::fs::write(&source, b"MZ").unwrap();
        let store = MediaStore::new(dir.path().join("out"));

        let err = store.save_file(&source).await.unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));

        let err = store.save_text("blank.txt", "   ").await.unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[tokio::test]
    async fn enforces_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("big.png");
        std::fs::write(&source, vec![0u8; 64]).unwrap();
        let store = MediaStore::new(dir.path().join("out")).with_max_file_bytes(32);

        let err = store.save_file(&source).await.unwrap_err();
        assert!(err.to_string().contains("limit is 32 bytes"));
    }
}
