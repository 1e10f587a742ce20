use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{now, optional, required};
use crate::{
    entities::{notification, prelude::*, profile},
    error::AppError,
    router::AppState,
    tenant::Tenant,
};

const KINDS: [&str; 3] = ["info", "alert", "event"];
const PRIORITIES: [&str; 3] = ["low", "normal", "high"];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list).post(create))
        .route("/notifications/{id}", delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct NotificationForm {
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub priority: Option<String>,
    pub action_url: Option<String>,
    /// Target a single profile. Omitted means every member of the parish.
    pub user_id: Option<Uuid>,
}

impl NotificationForm {
    fn into_active_model(self, parish_id: Uuid) -> Result<notification::ActiveModel, AppError> {
        let title = required(&self.title, "Title")?;
        let body = required(&self.body, "Message")?;
        let kind = optional(self.kind).unwrap_or_else(|| "info".into());
        if !KINDS.contains(&kind.as_str()) {
            return Err(AppError::validation(format!(
                "Type must be one of {}",
                KINDS.join(", ")
            )));
        }
        let priority = optional(self.priority).unwrap_or_else(|| "normal".into());
        if !PRIORITIES.contains(&priority.as_str()) {
            return Err(AppError::validation(format!(
                "Priority must be one of {}",
                PRIORITIES.join(", ")
            )));
        }

        let now = now();
        Ok(notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            parish_id: Set(parish_id),
            user_id: Set(self.user_id),
            title: Set(title),
            body: Set(body),
            kind: Set(kind),
            action_url: Set(optional(self.action_url)),
            data: Set(Some(json!({ "priority": priority }))),
            is_read: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }
}

/// Broadcasts plus the ones addressed to the caller, newest first.
pub async fn list(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<Vec<notification::Model>>, AppError> {
    let notifications = Notification::find()
        .filter(notification::Column::ParishId.eq(tenant.parish_id()))
        .filter(
            Condition::any()
                .add(notification::Column::UserId.is_null())
                .add(notification::Column::UserId.eq(tenant.profile.id)),
        )
        .order_by_desc(notification::Column::CreatedAt)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(notifications))
}

pub async fn create(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(form): Json<NotificationForm>,
) -> Result<(StatusCode, Json<notification::Model>), AppError> {
    if let Some(user_id) = form.user_id {
        let recipients = Profile::find_by_id(user_id)
            .filter(profile::Column::ParishId.eq(tenant.parish_id()))
            .count(state.db.as_ref())
            .await?;
        if recipients == 0 {
            return Err(AppError::validation("Recipient is not a member of this parish"));
        }
    }

    let notification = form
        .into_active_model(tenant.parish_id())?
        .insert(state.db.as_ref())
        .await?;
    info!(
        notification_id = %notification.id,
        broadcast = notification.user_id.is_none(),
        "notification sent"
    );
    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn remove(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = Notification::delete_many()
        .filter(notification::Column::Id.eq(id))
        .filter(notification::Column::ParishId.eq(tenant.parish_id()))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(json: serde_json::Value) -> NotificationForm {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn broadcast_by_default_with_priority_in_data() {
        let parish_id = Uuid::new_v4();
        let model = form(serde_json::json!({
            "title": "Fermeture",
            "body": "L'église sera fermée lundi",
            "priority": "high",
        }))
        .into_active_model(parish_id)
        .unwrap();

        assert_eq!(model.user_id, Set(None));
        assert_eq!(model.kind, Set("info".to_string()));
        assert_eq!(model.data, Set(Some(json!({ "priority": "high" }))));
        assert_eq!(model.parish_id, Set(parish_id));
    }

    #[test]
    fn rejects_unknown_type() {
        let err = form(serde_json::json!({
            "title": "x",
            "body": "y",
            "type": "promo",
        }))
        .into_active_model(Uuid::new_v4())
        .unwrap_err();
        assert_eq!(err.to_string(), "Type must be one of info, alert, event");
    }
}
