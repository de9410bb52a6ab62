use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    auth::SessionGate,
    config::AppConfig,
    services::{storage::StorageService, trips::TripStore, uploads::UploadService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub trips: TripStore,
    pub uploads: UploadService,
    pub gate: SessionGate,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, storage: StorageService, uploads: UploadService) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        Self {
            config,
            trips: TripStore::new(storage),
            uploads,
            gate: SessionGate::default(),
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
