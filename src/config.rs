use std::{env, net::SocketAddr, path::PathBuf};

use crate::error::AppError;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub data_root: PathBuf,
    pub public_root: PathBuf,
    pub cookie_secret: String,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let data_root = env::var("DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let public_root = env::var("PUBLIC_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public"));

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-travelog-development-cookie-secret".to_string());

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => raw
                .parse()
                .map_err(|err| AppError::Config(format!("invalid MAX_UPLOAD_BYTES: {err}")))?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            listen_addr,
            data_root,
            public_root,
            cookie_secret,
            max_upload_bytes,
        })
    }

    /// Directory that backs the `/trips-images` static route.
    pub fn uploads_dir(&self) -> PathBuf {
        self.public_root.join("trips-images")
    }
}
