use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{now, optional, required};
use crate::{
    entities::{pastoral_member, prelude::*},
    error::AppError,
    router::AppState,
    tenant::Tenant,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/team", get(list).post(create))
        .route("/team/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct TeamMemberForm {
    pub full_name: String,
    pub role: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub rank_order: Option<i32>,
}

impl TeamMemberForm {
    fn apply(self, model: &mut pastoral_member::ActiveModel) -> Result<(), AppError> {
        model.full_name = Set(required(&self.full_name, "Full name")?);
        model.role = Set(required(&self.role, "Role")?);
        model.bio = Set(optional(self.bio));
        model.image_url = Set(optional(self.image_url));
        if let Some(rank) = self.rank_order {
            model.rank_order = Set(rank);
        }
        Ok(())
    }
}

async fn find_scoped(
    state: &AppState,
    tenant: &Tenant,
    id: Uuid,
) -> Result<pastoral_member::Model, AppError> {
    PastoralMember::find_by_id(id)
        .filter(pastoral_member::Column::ParishId.eq(tenant.parish_id()))
        .one(state.db.as_ref())
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<Vec<pastoral_member::Model>>, AppError> {
    let members = PastoralMember::find()
        .filter(pastoral_member::Column::ParishId.eq(tenant.parish_id()))
        .order_by_asc(pastoral_member::Column::RankOrder)
        .order_by_asc(pastoral_member::Column::FullName)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(members))
}

pub async fn show(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
) -> Result<Json<pastoral_member::Model>, AppError> {
    Ok(Json(find_scoped(&state, &tenant, id).await?))
}

/// New members go to the end of the list unless a rank is given.
pub async fn create(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(form): Json<TeamMemberForm>,
) -> Result<(StatusCode, Json<pastoral_member::Model>), AppError> {
    let rank = match form.rank_order {
        Some(rank) => rank,
        None => PastoralMember::find()
            .filter(pastoral_member::Column::ParishId.eq(tenant.parish_id()))
            .count(state.db.as_ref())
            .await? as i32,
    };

    let now = now();
    let mut model = pastoral_member::ActiveModel {
        id: Set(Uuid::new_v4()),
        parish_id: Set(tenant.parish_id()),
        rank_order: Set(rank),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    form.apply(&mut model)?;

    let member = model.insert(state.db.as_ref()).await?;
    info!(member_id = %member.id, rank = member.rank_order, "team member created");
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
    Json(form): Json<TeamMemberForm>,
) -> Result<Json<pastoral_member::Model>, AppError> {
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
    let result = PastoralMember::delete_many()
        .filter(pastoral_member::Column::Id.eq(id))
        .filter(pastoral_member::Column::ParishId.eq(tenant.parish_id()))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
