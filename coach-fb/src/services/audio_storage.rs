//! Audio artifact storage
//!
//! Uploaded files are written under the uploads directory and referenced by
//! an opaque `/uploads/<file>` locator, which the router also serves
//! statically. Nothing downstream interprets the locator.

use async_trait::async_trait;
use coach_common::{Error, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// URL prefix for stored artifacts
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Extension used when a chunk upload has none
pub const DEFAULT_CHUNK_EXTENSION: &str = ".webm";

/// Extension used when a generic upload has none
pub const DEFAULT_UPLOAD_EXTENSION: &str = ".bin";

/// Storage of uploaded audio
#[async_trait]
pub trait AudioStorage: Send + Sync {
    /// Write `bytes` under `file_name`, returning the artifact reference
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String>;

    /// Delete a previously stored artifact by its reference
    async fn remove(&self, reference: &str) -> Result<()>;
}

/// Filesystem storage rooted at the uploads directory
pub struct FsAudioStorage {
    uploads_dir: PathBuf,
}

impl FsAudioStorage {
    pub fn new(uploads_dir: PathBuf) -> Self {
        Self { uploads_dir }
    }

    /// File under the uploads directory named by an `/uploads/<file>` reference
    fn path_of(&self, reference: &str) -> Result<PathBuf> {
        reference
            .strip_prefix(UPLOADS_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
            .map(|name| self.uploads_dir.join(name))
            .ok_or_else(|| Error::Internal(format!("Not an upload reference: {}", reference)))
    }
}

#[async_trait]
impl AudioStorage for FsAudioStorage {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let dest = self.uploads_dir.join(file_name);

        if let Err(e) = tokio::fs::write(&dest, bytes).await {
            // Drop partial writes
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(e.into());
        }

        tracing::debug!(path = %dest.display(), bytes = bytes.len(), "Stored upload");
        Ok(format!("{}/{}", UPLOADS_PREFIX, file_name))
    }

    async fn remove(&self, reference: &str) -> Result<()> {
        let path = self.path_of(reference)?;
        tokio::fs::remove_file(&path).await?;
        tracing::debug!(path = %path.display(), "Removed upload");
        Ok(())
    }
}

/// Keep a path component to `[A-Za-z0-9_-]`
fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Extension (with leading dot) of a client file name, or `default`
fn extension_of(original: &str, default: &str) -> String {
    Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(sanitize_component)
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| default.to_string())
}

/// Random name for a feedback chunk, keeping the client extension
pub fn chunk_file_name(original: &str) -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        extension_of(original, DEFAULT_CHUNK_EXTENSION)
    )
}

/// `<sid>__<qid>__chunk<idx>__<8 hex><ext>` for generic uploads
pub fn upload_file_name(
    session_id: Option<&str>,
    question_id: Option<&str>,
    chunk_index: Option<&str>,
    original: &str,
) -> String {
    let sid = sanitize_component(session_id.unwrap_or("nosession"));
    let qid = sanitize_component(question_id.unwrap_or("noquestion"));
    let idx = sanitize_component(chunk_index.unwrap_or("0"));
    let uid = Uuid::new_v4().simple().to_string();

    format!(
        "{}__{}__chunk{}__{}{}",
        sid,
        qid,
        idx,
        &uid[..8],
        extension_of(original, DEFAULT_UPLOAD_EXTENSION)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_chunk_file_name_keeps_extension() {
        let name = chunk_file_name("recording.ogg");
        assert!(name.ends_with(".ogg"));
        assert_eq!(name.len(), 32 + ".ogg".len());
    }

    #[test]
    fn test_chunk_file_name_default_extension() {
        assert!(chunk_file_name("blob").ends_with(".webm"));
        assert!(chunk_file_name("").ends_with(".webm"));
    }

    #[test]
    fn test_upload_file_name_layout() {
        let name = upload_file_name(Some("s1"), Some("q-2"), Some("4"), "resume.pdf");
        assert!(name.starts_with("s1__q-2__chunk4__"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), "s1__q-2__chunk4__".len() + 8 + ".pdf".len());

        let name = upload_file_name(None, None, None, "data");
        assert!(name.starts_with("nosession__noquestion__chunk0__"));
        assert!(name.ends_with(".bin"));
    }

    #[test]
    fn test_upload_file_name_is_sanitized() {
        let name = upload_file_name(Some("../etc"), Some("a/b"), Some("1"), "x.w/av");
        assert!(!name.contains('/'));
        assert!(name.starts_with("___etc__a_b__chunk1__"));
    }

    #[tokio::test]
    async fn test_fs_storage_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let uploads = temp_dir.path().join("uploads");
        let storage = FsAudioStorage::new(uploads.clone());

        let reference = storage.store("abc.webm", b"RIFF").await.unwrap();
        assert_eq!(reference, "/uploads/abc.webm");
        assert_eq!(std::fs::read(uploads.join("abc.webm")).unwrap(), b"RIFF");
    }

    #[tokio::test]
    async fn test_fs_storage_removes_stored_file() {
        let temp_dir = TempDir::new().unwrap();
        let uploads = temp_dir.path().join("uploads");
        let storage = FsAudioStorage::new(uploads.clone());

        let reference = storage.store("gone.webm", b"data").await.unwrap();
        storage.remove(&reference).await.unwrap();
        assert!(!uploads.join("gone.webm").exists());

        // Only plain names under /uploads are accepted
        assert!(storage.remove("/uploads/../coach.db").await.is_err());
        assert!(storage.remove("/etc/passwd").await.is_err());
        assert!(storage.remove("/uploads/").await.is_err());
    }
}
