use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::AppError;

pub const PUBLIC_PREFIX: &str = "/trips-images";

/// A file received from the client, held in memory until it is stored.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadFailure {
    pub name: String,
    pub reason: String,
}

/// Result of a multi-file upload: stored paths in selection order plus the
/// files that could not be written.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    pub paths: Vec<String>,
    pub failures: Vec<UploadFailure>,
}

#[derive(Clone)]
pub struct UploadService {
    dir: Arc<PathBuf>,
}

impl UploadService {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Arc::new(dir) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes one file as `<millis>-<name>` and returns its public path.
    pub async fn store(&self, bytes: &[u8], original_name: &str) -> Result<String, AppError> {
        fs::create_dir_all(self.dir()).await?;
        let name = sanitize_file_name(original_name);
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let file_name = format!("{millis}-{name}");
            let path = self.dir().join(&file_name);
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            let mut file = match opened {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    millis += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            if let Err(err) = write_all(&mut file, bytes).await {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(err.into());
            }
            debug!(file = %file_name, size = bytes.len(), "upload stored");
            return Ok(format!("{PUBLIC_PREFIX}/{file_name}"));
        }
    }

    /// Stores files one at a time, in order. A failed file is logged and
    /// skipped; the remaining files are still attempted.
    pub async fn store_all(&self, files: Vec<IncomingFile>) -> UploadBatch {
        let mut batch = UploadBatch::default();
        for file in files {
            match self.store(&file.bytes, &file.name).await {
                Ok(path) => batch.paths.push(path),
                Err(err) => {
                    warn!(file = %file.name, "upload failed: {err}");
                    batch.failures.push(UploadFailure {
                        name: file.name,
                        reason: err.to_string(),
                    });
                }
            }
        }
        batch
    }
}

async fn write_all(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

/// Keeps only the last path component of a client-supplied name.
fn sanitize_file_name(original: &str) -> String {
    let last = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match last {
        "" | "." | ".." => "upload".to_string(),
        name => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\beach.png"), "beach.png");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name("dir/.."), "upload");
    }

    #[tokio::test]
    async fn identical_names_do_not_collide() {
        let dir = tempfile::TempDir::new().unwrap();
        let uploads = UploadService::new(dir.path().join("trips-images"));
        let first = uploads.store(b"one", "same.jpg").await.unwrap();
        let second = uploads.store(b"two", "same.jpg").await.unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("/trips-images/"));
        assert!(first.ends_with("-same.jpg"));
    }
}
