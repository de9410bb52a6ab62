use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    error::AppError,
    models::trip::{Trip, TripDraft, TripId, TripPatch},
    services::storage::{encode_trips, StorageService},
};

/// Owner of the canonical trip collection.
///
/// Every operation reads the persisted file, applies its change and writes the
/// full collection back. Mutations hold `write_lock` for the whole cycle, so
/// concurrent requests are applied one after another.
#[derive(Clone)]
pub struct TripStore {
    storage: StorageService,
    write_lock: Arc<Mutex<()>>,
}

impl TripStore {
    pub fn new(storage: StorageService) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn storage(&self) -> &StorageService {
        &self.storage
    }

    pub async fn list(&self) -> Result<Vec<Trip>, AppError> {
        self.storage.load_trips().await
    }

    pub async fn get(&self, id: &TripId) -> Result<Trip, AppError> {
        self.list()
            .await?
            .into_iter()
            .find(|trip| &trip.id == id)
            .ok_or(AppError::NotFound)
    }

    pub async fn create(
        &self,
        draft: TripDraft,
        uploaded_photos: Option<Vec<String>>,
    ) -> Result<Trip, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.storage.load_trips().await?;
        let taken: HashSet<TripId> = trips.iter().map(|trip| trip.id.clone()).collect();
        let id = mint_created_id(&taken, Utc::now().timestamp_millis());

        let mut trip = Trip::from_draft(id, draft);
        trip.photos = uploaded_photos.unwrap_or_default();
        trips.push(trip.clone());
        self.storage.save_trips(&trips).await?;
        debug!(id = %trip.id, photos = trip.photos.len(), "trip created");
        Ok(trip)
    }

    /// Unknown ids leave the collection untouched.
    pub async fn update(&self, id: &TripId, patch: TripPatch) -> Result<Vec<Trip>, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.storage.load_trips().await?;
        let Some(trip) = trips.iter_mut().find(|trip| &trip.id == id) else {
            debug!(%id, "update skipped, trip not found");
            return Ok(trips);
        };
        trip.apply(patch);
        self.storage.save_trips(&trips).await?;
        debug!(%id, "trip updated");
        Ok(trips)
    }

    /// Appends photos to the end of a trip's photo list, keeping their order.
    pub async fn append_photos(
        &self,
        id: &TripId,
        photos: Vec<String>,
    ) -> Result<Vec<Trip>, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.storage.load_trips().await?;
        let Some(trip) = trips.iter_mut().find(|trip| &trip.id == id) else {
            debug!(%id, "append skipped, trip not found");
            return Ok(trips);
        };
        trip.photos.extend(photos);
        self.storage.save_trips(&trips).await?;
        debug!(%id, "photos appended");
        Ok(trips)
    }

    /// Idempotent: deleting a missing trip is not an error.
    pub async fn delete(&self, id: &TripId) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.storage.load_trips().await?;
        let before = trips.len();
        trips.retain(|trip| &trip.id != id);
        if trips.len() == before {
            debug!(%id, "delete skipped, trip not found");
            return Ok(());
        }
        self.storage.save_trips(&trips).await?;
        debug!(%id, "trip deleted");
        Ok(())
    }

    /// Removes the photo at `index`; later photos shift down by one.
    /// An unknown id or an out-of-range index is a no-op.
    pub async fn delete_photo(&self, id: &TripId, index: usize) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.storage.load_trips().await?;
        let Some(trip) = trips.iter_mut().find(|trip| &trip.id == id) else {
            debug!(%id, "photo delete skipped, trip not found");
            return Ok(());
        };
        if index >= trip.photos.len() {
            debug!(%id, index, "photo delete skipped, index out of range");
            return Ok(());
        }
        trip.photos.remove(index);
        self.storage.save_trips(&trips).await?;
        debug!(%id, index, "photo deleted");
        Ok(())
    }

    /// Merges an exported document into the collection under fresh ids.
    ///
    /// The payload is fully validated before the collection is touched; on
    /// `MalformedImport` the persisted file is left as it was.
    pub async fn import(&self, payload: &str) -> Result<Vec<Trip>, AppError> {
        let drafts = parse_import(payload)?;

        let _guard = self.write_lock.lock().await;
        let mut trips = self.storage.load_trips().await?;
        let mut taken: HashSet<TripId> = trips.iter().map(|trip| trip.id.clone()).collect();
        let now = Utc::now().timestamp_millis();
        let count = drafts.len();
        for draft in drafts {
            let id = mint_imported_id(&taken, now);
            taken.insert(id.clone());
            trips.push(Trip::from_draft(id, draft));
        }
        self.storage.save_trips(&trips).await?;
        info!(count, total = trips.len(), "trips imported");
        Ok(trips)
    }

    pub async fn export(&self) -> Result<Vec<u8>, AppError> {
        let trips = self.list().await?;
        encode_trips(&trips)
    }
}

/// Schema check for imported documents: a JSON array of trip-shaped objects.
pub fn parse_import(payload: &str) -> Result<Vec<TripDraft>, AppError> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|err| AppError::MalformedImport(format!("not valid JSON: {err}")))?;
    let serde_json::Value::Array(items) = value else {
        return Err(AppError::MalformedImport(
            "expected a JSON array of trips".into(),
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            serde_json::from_value::<TripDraft>(item).map_err(|err| {
                AppError::MalformedImport(format!("trip #{}: {err}", position + 1))
            })
        })
        .collect()
}

fn mint_created_id(taken: &HashSet<TripId>, now_millis: i64) -> TripId {
    let mut millis = now_millis;
    loop {
        let id = TripId::from_millis(millis);
        if !taken.contains(&id) {
            return id;
        }
        millis += 1;
    }
}

fn mint_imported_id(taken: &HashSet<TripId>, now_millis: i64) -> TripId {
    let mut rng = rand::thread_rng();
    let mut base = now_millis as f64;
    let mut attempts = 0u32;
    loop {
        let candidate = TripId::from_f64(base + rng.gen::<f64>());
        if let Some(id) = candidate.filter(|id| !taken.contains(id)) {
            return id;
        }
        attempts += 1;
        // a millisecond only holds a few thousand distinct f64 offsets
        if attempts % 16 == 0 {
            base += 1.0;
        }
    }
}
