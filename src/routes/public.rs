use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::{
    error::AppError,
    models::trip::{Trip, TripDraft, TripId},
    routes::{FailedUploads, TripForm},
    state::AppState,
};

pub const EXPORT_FILE_NAME: &str = "trips-data.json";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route("/trips/export", get(export_trips))
        .route("/trips/import", post(import_trips))
        .route("/trips/:id", get(trip_detail))
        .route("/upload", post(upload))
}

async fn list_trips(State(state): State<AppState>) -> Result<Json<Vec<Trip>>, AppError> {
    Ok(Json(state.trips.list().await?))
}

async fn trip_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    let id = parse_trip_id(&id)?;
    Ok(Json(state.trips.get(&id).await?))
}

#[derive(Serialize)]
struct TripCreated {
    #[serde(flatten)]
    trip: Trip,
    #[serde(flatten)]
    failed: FailedUploads,
}

async fn create_trip(
    State(state): State<AppState>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let form = TripForm::read(multipart, "photos").await?;
    let draft = draft_from_form(&form)?;
    let batch = state.uploads.store_all(form.files).await;
    let failed = FailedUploads::from_batch(&batch);
    let trip = state.trips.create(draft, Some(batch.paths)).await?;
    Ok((StatusCode::CREATED, Json(TripCreated { trip, failed })))
}

async fn export_trips(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.trips.export().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        body,
    ))
}

async fn import_trips(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<Trip>>, AppError> {
    let payload = std::str::from_utf8(&body)
        .map_err(|err| AppError::MalformedImport(format!("not UTF-8 text: {err}")))?;
    Ok(Json(state.trips.import(payload).await?))
}

async fn upload(
    State(state): State<AppState>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<Response, AppError> {
    let form = TripForm::read(multipart, "file").await?;
    let Some(file) = form.files.into_iter().next() else {
        return Err(AppError::BadRequest("no file in request".into()));
    };
    let response = match state.uploads.store(&file.bytes, &file.name).await {
        Ok(url) => Json(json!({ "success": true, "url": url })).into_response(),
        Err(err) => {
            error!(file = %file.name, "upload failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to store upload" })),
            )
                .into_response()
        }
    };
    Ok(response)
}

pub(crate) fn parse_trip_id(raw: &str) -> Result<TripId, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

fn draft_from_form(form: &TripForm) -> Result<TripDraft, AppError> {
    let required = |name: &str| -> Result<String, AppError> {
        match form.field(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(AppError::BadRequest(format!("{name} is required"))),
        }
    };
    let date = required("date")?;
    NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date: {date}")))?;
    Ok(TripDraft {
        date,
        country: required("country")?,
        city: required("city")?,
        description: form
            .field("description")
            .map(|value| value.trim().to_string())
            .unwrap_or_default(),
        photos: Vec::new(),
    })
}
