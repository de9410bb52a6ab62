pub mod admin;
pub mod public;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    Router,
};
use serde::Serialize;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::{
    error::AppError,
    services::uploads::{IncomingFile, UploadBatch},
    state::AppState,
};

pub fn create_router(state: AppState) -> Router {
    let uploads_dir = state.config.uploads_dir();
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .nest("/api", public::router())
        .nest("/api/admin", admin::router())
        .nest_service("/trips-images", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Text fields and files of a multipart trip form, in submission order.
#[derive(Debug, Default)]
pub(crate) struct TripForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<IncomingFile>,
}

impl TripForm {
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == file_field {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // browsers send an empty part when no file was picked
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.files.push(IncomingFile {
                    name: file_name,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field.text().await?;
                form.fields.push((name, value));
            }
        }
        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Names of the files a multi-file upload had to skip.
#[derive(Debug, Default, Serialize)]
pub(crate) struct FailedUploads {
    #[serde(rename = "failedUploads", skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

impl FailedUploads {
    pub fn from_batch(batch: &UploadBatch) -> Self {
        if !batch.failures.is_empty() {
            warn!(
                failed = batch.failures.len(),
                stored = batch.paths.len(),
                "photos saved with partial upload"
            );
        }
        Self {
            names: batch
                .failures
                .iter()
                .map(|failure| failure.name.clone())
                .collect(),
        }
    }
}
