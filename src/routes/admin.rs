use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use axum_extra::extract::{PrivateCookieJar, WithRejection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    auth::{AdminSession, Session},
    error::AppError,
    models::trip::{Trip, TripPatch},
    routes::{public::parse_trip_id, FailedUploads, TripForm},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session_status))
        .route("/trips", get(trips_overview))
        .route("/trips/:id", patch(update_trip).delete(delete_trip))
        .route("/trips/:id/photos", post(add_photos))
        .route("/trips/:id/photos/:index", delete(delete_photo))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    WithRejection(Json(form), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(PrivateCookieJar, Json<Value>), AppError> {
    let mut session = Session::from_jar(&jar);
    if let Err(err) = state.gate.login(&mut session, &form.username, &form.password) {
        warn!(username = %form.username, "admin login rejected");
        return Err(err);
    }
    info!("admin logged in");
    Ok((session.persist(jar), Json(json!({ "authenticated": true }))))
}

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Json<Value>) {
    let mut session = Session::from_jar(&jar);
    state.gate.logout(&mut session);
    (session.persist(jar), Json(json!({ "authenticated": false })))
}

async fn session_status(AdminSession(session): AdminSession) -> Json<Value> {
    Json(json!({ "authenticated": session.is_authenticated() }))
}

#[derive(Serialize)]
struct TripsOverview {
    total: usize,
    trips: Vec<Trip>,
}

async fn trips_overview(
    State(state): State<AppState>,
    admin: AdminSession,
) -> Result<Json<TripsOverview>, AppError> {
    admin.require_admin()?;
    let trips = state.trips.list().await?;
    Ok(Json(TripsOverview {
        total: trips.len(),
        trips,
    }))
}

async fn update_trip(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(id): Path<String>,
    WithRejection(Json(patch), _): WithRejection<Json<TripPatch>, AppError>,
) -> Result<Json<Vec<Trip>>, AppError> {
    admin.require_admin()?;
    let Ok(id) = parse_trip_id(&id) else {
        return Ok(Json(state.trips.list().await?));
    };
    Ok(Json(state.trips.update(&id, patch).await?))
}

#[derive(Serialize)]
struct PhotosAdded {
    trips: Vec<Trip>,
    #[serde(flatten)]
    failed: FailedUploads,
}

async fn add_photos(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(id): Path<String>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<Json<PhotosAdded>, AppError> {
    admin.require_admin()?;
    let Ok(id) = parse_trip_id(&id) else {
        return Ok(Json(PhotosAdded {
            trips: state.trips.list().await?,
            failed: FailedUploads::default(),
        }));
    };
    let form = TripForm::read(multipart, "photos").await?;
    let batch = state.uploads.store_all(form.files).await;
    let failed = FailedUploads::from_batch(&batch);
    let trips = state.trips.append_photos(&id, batch.paths).await?;
    Ok(Json(PhotosAdded { trips, failed }))
}

async fn delete_trip(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    admin.require_admin()?;
    // an id that cannot exist is just another missing trip
    if let Ok(id) = parse_trip_id(&id) {
        state.trips.delete(&id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_photo(
    State(state): State<AppState>,
    admin: AdminSession,
    Path((id, index)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    admin.require_admin()?;
    // negative or oversized indices point past the list like any other out-of-range index
    if let (Ok(id), Ok(index)) = (parse_trip_id(&id), index.trim().parse::<usize>()) {
        state.trips.delete_photo(&id, index).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
