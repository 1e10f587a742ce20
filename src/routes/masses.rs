use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{day_of_week, form, now, optional};
use crate::{
    entities::{mass, prelude::*},
    error::AppError,
    router::AppState,
    tenant::Tenant,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/masses", get(list).post(create))
        .route("/masses/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct MassForm {
    pub day_of_week: i16,
    #[serde(deserialize_with = "form::time")]
    pub time_of_day: NaiveTime,
    pub description: Option<String>,
    pub location: Option<String>,
    pub celebrant: Option<String>,
    pub lang: Option<String>,
    #[serde(default)]
    pub is_exceptional: bool,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
}

impl MassForm {
    fn apply(self, model: &mut mass::ActiveModel) -> Result<(), AppError> {
        let day = day_of_week(self.day_of_week, "Day of week")?;
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if until < from {
                return Err(AppError::validation("Validity ends before it starts"));
            }
        }

        model.day_of_week = Set(day);
        model.time_of_day = Set(self.time_of_day);
        model.description = Set(optional(self.description));
        model.location = Set(optional(self.location));
        model.celebrant = Set(optional(self.celebrant));
        model.lang = Set(optional(self.lang));
        model.is_exceptional = Set(self.is_exceptional);
        model.valid_from = Set(self.valid_from);
        model.valid_until = Set(self.valid_until);
        Ok(())
    }
}

async fn find_scoped(state: &AppState, tenant: &Tenant, id: Uuid) -> Result<mass::Model, AppError> {
    Mass::find_by_id(id)
        .filter(mass::Column::ParishId.eq(tenant.parish_id()))
        .one(state.db.as_ref())
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<Vec<mass::Model>>, AppError> {
    let masses = Mass::find()
        .filter(mass::Column::ParishId.eq(tenant.parish_id()))
        .order_by_asc(mass::Column::DayOfWeek)
        .order_by_asc(mass::Column::TimeOfDay)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(masses))
}

pub async fn show(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
) -> Result<Json<mass::Model>, AppError> {
    Ok(Json(find_scoped(&state, &tenant, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(form): Json<MassForm>,
) -> Result<(StatusCode, Json<mass::Model>), AppError> {
    let now = now();
    let mut model = mass::ActiveModel {
        id: Set(Uuid::new_v4()),
        parish_id: Set(tenant.parish_id()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    form.apply(&mut model)?;

    let mass = model.insert(state.db.as_ref()).await?;
    info!(mass_id = %mass.id, day = mass.day_of_week, "mass created");
    Ok((StatusCode::CREATED, Json(mass)))
}

pub async fn update(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
    Json(form): Json<MassForm>,
) -> Result<Json<mass::Model>, AppError> {
    let mut model = find_scoped(&state, &tenant, id).await?.into_active_model();
    form.apply(&mut model)?;
    model.updated_at = Set(now());
    Ok(Json(model.update(state.db.as_ref()).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = Mass::delete_many()
        .filter(mass::Column::Id.eq(id))
        .filter(mass::Column::ParishId.eq(tenant.parish_id()))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    info!(mass_id = %id, "mass deleted");
    Ok(StatusCode::NO_CONTENT)
}
