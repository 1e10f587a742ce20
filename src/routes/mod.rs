//! JSON API under `/api`. Every handler takes a [`Tenant`](crate::tenant::Tenant)
//! and scopes its queries by the tenant's parish.

pub mod announcements;
pub mod calendar;
pub mod dashboard;
pub mod events;
pub mod groups;
pub mod images;
pub mod mass_requests;
pub mod masses;
pub mod me;
pub mod notifications;
pub mod parish;
pub mod profiles;
pub mod team;
pub mod upload;

use axum::Router;
use chrono::{NaiveDateTime, Utc};

use crate::error::AppError;
use crate::router::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(me::routes())
        .merge(dashboard::routes())
        .merge(calendar::routes())
        .merge(parish::routes())
        .merge(profiles::routes())
        .merge(announcements::routes())
        .merge(events::routes())
        .merge(masses::routes())
        .merge(groups::routes())
        .merge(team::routes())
        .merge(notifications::routes())
        .merge(mass_requests::routes())
        .merge(upload::routes())
        .merge(images::routes())
}

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Trimmed, non-empty value of a mandatory text field.
pub(crate) fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Empty or whitespace-only optional text becomes `None`.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn day_of_week(day: i16, field: &str) -> Result<i16, AppError> {
    if (0..=6).contains(&day) {
        Ok(day)
    } else {
        Err(AppError::validation(format!(
            "{field} must be between 0 (Sunday) and 6 (Saturday)"
        )))
    }
}

/// Lenient parsers for the date and time shapes HTML forms send.
pub(crate) mod form {
    use chrono::{DateTime, NaiveDateTime, NaiveTime};
    use serde::{Deserialize, Deserializer, de::Error};

    pub fn parse_time(value: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
            .ok()
    }

    /// Accepts `2025-06-01T10:00`, `2025-06-01T10:00:00` or RFC 3339 with an offset.
    pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
            .ok()
    }

    pub fn time<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_time(&raw).ok_or_else(|| D::Error::custom(format!("invalid time `{raw}`")))
    }

    pub fn opt_time<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_time(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid time `{raw}`"))),
        }
    }

    pub fn datetime<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_datetime(&raw).ok_or_else(|| D::Error::custom(format!("invalid date `{raw}`")))
    }

    pub fn opt_datetime<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_datetime(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date `{raw}`"))),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum_login::tower_sessions::{MemoryStore, Session};
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::entities::{parish, profile};
    use crate::tenant::Tenant;

    pub(crate) fn parish(id: Uuid) -> parish::Model {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        parish::Model {
            id,
            name: "Saint-Louis".into(),
            address: "1 place de l'Église".into(),
            city: "Lyon".into(),
            country: "France".into(),
            description: None,
            diocese: Some("Lyon".into()),
            history: None,
            founding_date: None,
            contact_email: None,
            contact_phone: None,
            website: None,
            image_url: None,
            logo_url: None,
            primary_color: Some("#112233".into()),
            secondary_color: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    pub(crate) fn tenant() -> Tenant {
        let parish = parish(Uuid::new_v4());
        let profile = profile::Model {
            id: Uuid::new_v4(),
            auth_subject: "subject-1".into(),
            parish_id: Some(parish.id),
            email: "secretariat@example.org".into(),
            full_name: Some("Marie Dupont".into()),
            avatar_url: None,
            phone_number: None,
            role: Some("admin".into()),
            access_token: "token".into(),
            created_at: parish.created_at,
            updated_at: parish.created_at,
        };
        Tenant { profile, parish }
    }

    /// A fresh session backed by an in-memory store.
    pub(crate) fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }
}
