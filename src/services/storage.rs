use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::fs;

use crate::{error::AppError, models::trip::Trip};

const TRIPS_FILE: &str = "trips.json";

/// JSON file persistence for the trip collection.
#[derive(Clone)]
pub struct StorageService {
    root: Arc<PathBuf>,
}

impl StorageService {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn trips_path(&self) -> PathBuf {
        self.root().join(TRIPS_FILE)
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root()).await?;
        Ok(())
    }

    pub async fn load_raw(&self) -> Result<Option<Vec<u8>>, AppError> {
        let path = self.trips_path();
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(fs::read(&path).await?))
    }

    pub async fn load_trips(&self) -> Result<Vec<Trip>, AppError> {
        let Some(raw) = self.load_raw().await? else {
            return Ok(Vec::new());
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let trips: Vec<Trip> = serde_json::from_slice(&raw).map_err(|err| {
            AppError::Other(anyhow::anyhow!(
                "{} is corrupt: {err}",
                self.trips_path().display()
            ))
        })?;
        Ok(trips)
    }

    /// Rewrites the whole collection. The data goes to a sibling temp file
    /// first and is renamed into place, so readers never see a half-written file.
    pub async fn save_trips(&self, trips: &[Trip]) -> Result<(), AppError> {
        fs::create_dir_all(self.root()).await?;
        let data = encode_trips(trips)?;
        let path = self.trips_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// The persisted format doubles as the export format.
pub fn encode_trips(trips: &[Trip]) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec_pretty(trips).map_err(|err| AppError::Other(err.into()))
}
