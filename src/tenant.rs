//! Resolves the signed-in profile's parish for every protected request.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_login::tower_sessions::Session;
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::auth::user::AuthSession;
use crate::entities::{parish, prelude::*, profile};
use crate::error::AppError;
use crate::router::AppState;

pub const TENANT_KEY: &str = "tenant.parish";

/// What the session remembers between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedTenant {
    profile_id: Uuid,
    parish: parish::Model,
}

/// The signed-in profile and the parish every query is scoped to.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub profile: profile::Model,
    pub parish: parish::Model,
}

impl Tenant {
    pub fn parish_id(&self) -> Uuid {
        self.parish.id
    }
}

impl FromRequestParts<AppState> for Tenant {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_session = AuthSession::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;
        let profile = auth_session.user.ok_or(AppError::Unauthorized)?;
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;

        resolve(state.db.as_ref(), &session, profile).await
    }
}

/// The profile's parish, from the session cache when it still matches,
/// otherwise from the database.
pub async fn resolve<C: ConnectionTrait>(
    db: &C,
    session: &Session,
    profile: profile::Model,
) -> Result<Tenant, AppError> {
    if let Some(cached) = session.get::<CachedTenant>(TENANT_KEY).await? {
        if cached.profile_id == profile.id && Some(cached.parish.id) == profile.parish_id {
            return Ok(Tenant {
                profile,
                parish: cached.parish,
            });
        }
    }

    let parish_id = profile
        .parish_id
        .ok_or_else(|| AppError::Forbidden("No parish is assigned to this account".into()))?;
    let parish = Parish::find_by_id(parish_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Forbidden("Parish not found".into()))?;

    debug!(profile_id = %profile.id, parish_id = %parish.id, "tenant resolved");
    remember(session, &profile, &parish).await?;
    Ok(Tenant { profile, parish })
}

pub async fn remember(
    session: &Session,
    profile: &profile::Model,
    parish: &parish::Model,
) -> Result<(), AppError> {
    let cached = CachedTenant {
        profile_id: profile.id,
        parish: parish.clone(),
    };
    session.insert(TENANT_KEY, cached).await?;
    Ok(())
}

pub async fn forget(session: &Session) -> Result<(), AppError> {
    session.remove::<serde_json::Value>(TENANT_KEY).await?;
    Ok(())
}
