use axum::{Json, Router, extract::State, routing::get};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    entities::{prelude::*, profile},
    error::AppError,
    router::AppState,
    tenant::Tenant,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/profiles", get(list))
}

/// Members of the parish, used to pick group admins and notification targets.
pub async fn list(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<Vec<profile::Model>>, AppError> {
    let profiles = Profile::find()
        .filter(profile::Column::ParishId.eq(tenant.parish_id()))
        .order_by_asc(profile::Column::FullName)
        .order_by_asc(profile::Column::Email)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(profiles))
}
