use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Numeric trip identifier.
///
/// Trips created locally get an integer millisecond timestamp, imported trips
/// get a timestamp with a random fractional part. Both are kept as the exact
/// JSON number so persisted and exported ids round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(Number);

impl TripId {
    pub fn from_millis(millis: i64) -> Self {
        Self(Number::from(millis))
    }

    /// Returns `None` for NaN or infinite values, which JSON cannot carry.
    pub fn from_f64(value: f64) -> Option<Self> {
        Number::from_f64(value).map(Self)
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TripId {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str::<Number>(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub date: String,
    pub country: String,
    pub city: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl Trip {
    pub fn from_draft(id: TripId, draft: TripDraft) -> Self {
        Self {
            id,
            date: draft.date,
            country: draft.country,
            city: draft.city,
            description: draft.description,
            photos: draft.photos,
        }
    }

    /// Shallow merge: every field present in the patch replaces the stored one.
    pub fn apply(&mut self, patch: TripPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(country) = patch.country {
            self.country = country;
        }
        if let Some(city) = patch.city {
            self.city = city;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(photos) = patch.photos {
            self.photos = photos;
        }
    }

    pub fn draft(&self) -> TripDraft {
        TripDraft {
            date: self.date.clone(),
            country: self.country.clone(),
            city: self.city.clone(),
            description: self.description.clone(),
            photos: self.photos.clone(),
        }
    }
}

/// A trip without an id: the shape accepted on create and on import.
///
/// Unknown fields (including any incoming `id`) are ignored so that exported
/// files from any version stay importable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDraft {
    pub date: String,
    pub country: String,
    pub city: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripPatch {
    pub date: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub photos: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_keep_their_json_representation() {
        let created = TripId::from_millis(1_700_000_000_123);
        assert_eq!(created.to_string(), "1700000000123");
        assert_eq!("1700000000123".parse::<TripId>().unwrap(), created);

        let imported = TripId::from_f64(1_700_000_000_123.25).unwrap();
        let text = serde_json::to_string(&imported).unwrap();
        assert_eq!(serde_json::from_str::<TripId>(&text).unwrap(), imported);
        assert_eq!(text.parse::<TripId>().unwrap(), imported);
    }

    #[test]
    fn missing_photos_default_to_empty() {
        let trip: Trip = serde_json::from_str(
            r#"{"id": 1, "date": "2024-05-01", "country": "Italy", "city": "Rome"}"#,
        )
        .unwrap();
        assert!(trip.photos.is_empty());
        assert_eq!(trip.description, "");
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut trip = Trip::from_draft(
            TripId::from_millis(1),
            TripDraft {
                date: "2024-05-01".into(),
                country: "Italy".into(),
                city: "Rome".into(),
                description: "pasta".into(),
                photos: vec!["/trips-images/a.jpg".into()],
            },
        );
        trip.apply(TripPatch {
            city: Some("Milan".into()),
            ..TripPatch::default()
        });
        assert_eq!(trip.city, "Milan");
        assert_eq!(trip.country, "Italy");
        assert_eq!(trip.photos, vec!["/trips-images/a.jpg".to_string()]);
    }
}
