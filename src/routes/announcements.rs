use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{form, now, optional, required};
use crate::{
    entities::{announcement, prelude::*},
    error::AppError,
    router::AppState,
    tenant::Tenant,
};

const PRIORITIES: [&str; 3] = ["low", "normal", "high"];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/announcements", get(list).post(create))
        .route(
            "/announcements/{id}",
            get(show).put(update).delete(remove),
        )
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementForm {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub image_url: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "form::opt_datetime")]
    pub published_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "form::opt_datetime")]
    pub expires_at: Option<NaiveDateTime>,
}

fn active() -> bool {
    true
}

impl AnnouncementForm {
    fn apply(self, model: &mut announcement::ActiveModel) -> Result<(), AppError> {
        let title = required(&self.title, "Title")?;
        let content = required(&self.content, "Content")?;
        let priority = optional(self.priority).unwrap_or_else(|| "normal".into());
        if !PRIORITIES.contains(&priority.as_str()) {
            return Err(AppError::validation(format!(
                "Priority must be one of {}",
                PRIORITIES.join(", ")
            )));
        }
        if let (Some(published), Some(expires)) = (self.published_at, self.expires_at) {
            if expires < published {
                return Err(AppError::validation("Expiry must not be before publication"));
            }
        }

        model.title = Set(title);
        model.content = Set(content);
        model.category = Set(optional(self.category).unwrap_or_else(|| "general".into()));
        model.priority = Set(priority);
        model.image_url = Set(optional(self.image_url));
        model.is_active = Set(self.is_active);
        model.published_at = Set(self.published_at);
        model.expires_at = Set(self.expires_at);
        Ok(())
    }
}

async fn find_scoped(
    state: &AppState,
    tenant: &Tenant,
    id: Uuid,
) -> Result<announcement::Model, AppError> {
    Announcement::find_by_id(id)
        .filter(announcement::Column::ParishId.eq(tenant.parish_id()))
        .one(state.db.as_ref())
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<Vec<announcement::Model>>, AppError> {
    let announcements = Announcement::find()
        .filter(announcement::Column::ParishId.eq(tenant.parish_id()))
        .order_by_desc(announcement::Column::CreatedAt)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(announcements))
}

pub async fn show(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
) -> Result<Json<announcement::Model>, AppError> {
    Ok(Json(find_scoped(&state, &tenant, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(form): Json<AnnouncementForm>,
) -> Result<(StatusCode, Json<announcement::Model>), AppError> {
    let now = now();
    let mut model = announcement::ActiveModel {
        id: Set(Uuid::new_v4()),
        parish_id: Set(tenant.parish_id()),
        author_id: Set(Some(tenant.profile.id)),
        views_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    form.apply(&mut model)?;

    let announcement = model.insert(state.db.as_ref()).await?;
    info!(announcement_id = %announcement.id, "announcement created");
    Ok((StatusCode::CREATED, Json(announcement)))
}

pub async fn update(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
    Json(form): Json<AnnouncementForm>,
) -> Result<Json<announcement::Model>, AppError> {
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
    let result = Announcement::delete_many()
        .filter(announcement::Column::Id.eq(id))
        .filter(announcement::Column::ParishId.eq(tenant.parish_id()))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    info!(announcement_id = %id, "announcement deleted");
    Ok(StatusCode::NO_CONTENT)
}
