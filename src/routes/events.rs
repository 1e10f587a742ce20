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
    entities::{event, prelude::*},
    error::AppError,
    router::AppState,
    tenant::Tenant,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list).post(create))
        .route("/events/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct EventForm {
    pub title: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "form::datetime")]
    pub date: NaiveDateTime,
    #[serde(default, deserialize_with = "form::opt_datetime")]
    pub end_date: Option<NaiveDateTime>,
    pub location: Option<String>,
    pub event_type: Option<String>,
    pub image_url: Option<String>,
    pub organizer: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub max_participants: Option<i32>,
}

impl EventForm {
    fn apply(self, model: &mut event::ActiveModel) -> Result<(), AppError> {
        let title = required(&self.title, "Title")?;
        if self.end_date.is_some_and(|end| end < self.date) {
            return Err(AppError::validation("End date must not be before the start"));
        }
        if self.max_participants.is_some_and(|max| max < 0) {
            return Err(AppError::validation("Max participants must not be negative"));
        }

        model.title = Set(title);
        model.description = Set(optional(self.description));
        model.date = Set(self.date);
        model.end_date = Set(self.end_date);
        model.location = Set(optional(self.location));
        model.event_type = Set(optional(self.event_type).unwrap_or_else(|| "other".into()));
        model.image_url = Set(optional(self.image_url));
        model.organizer = Set(optional(self.organizer));
        model.contact_email = Set(optional(self.contact_email));
        model.contact_phone = Set(optional(self.contact_phone));
        model.max_participants = Set(self.max_participants);
        Ok(())
    }
}

async fn find_scoped(state: &AppState, tenant: &Tenant, id: Uuid) -> Result<event::Model, AppError> {
    Event::find_by_id(id)
        .filter(event::Column::ParishId.eq(tenant.parish_id()))
        .one(state.db.as_ref())
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<Vec<event::Model>>, AppError> {
    let events = Event::find()
        .filter(event::Column::ParishId.eq(tenant.parish_id()))
        .order_by_asc(event::Column::Date)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(events))
}

pub async fn show(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
) -> Result<Json<event::Model>, AppError> {
    Ok(Json(find_scoped(&state, &tenant, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(form): Json<EventForm>,
) -> Result<(StatusCode, Json<event::Model>), AppError> {
    let now = now();
    let mut model = event::ActiveModel {
        id: Set(Uuid::new_v4()),
        parish_id: Set(tenant.parish_id()),
        registered_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    form.apply(&mut model)?;

    let event = model.insert(state.db.as_ref()).await?;
    info!(event_id = %event.id, parish_id = %event.parish_id, "event created");
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
    Json(form): Json<EventForm>,
) -> Result<Json<event::Model>, AppError> {
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
    let result = Event::delete_many()
        .filter(event::Column::Id.eq(id))
        .filter(event::Column::ParishId.eq(tenant.parish_id()))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    info!(event_id = %id, "event deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::tests::{test_state, transaction_log};
    use crate::routes::test_support::tenant;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn form(json: serde_json::Value) -> EventForm {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn rejects_end_before_start() {
        let mut model = <event::ActiveModel as Default>::default();
        let err = form(serde_json::json!({
            "title": "Retraite",
            "date": "2025-06-10T09:00",
            "end_date": "2025-06-09T17:00",
        }))
        .apply(&mut model)
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn defaults_event_type_and_trims_fields() {
        let mut model = <event::ActiveModel as Default>::default();
        form(serde_json::json!({
            "title": "  Kermesse ",
            "date": "2025-06-14T09:00",
            "end_date": "",
            "location": " ",
        }))
        .apply(&mut model)
        .unwrap();

        assert_eq!(model.title, Set("Kermesse".to_string()));
        assert_eq!(model.event_type, Set("other".to_string()));
        assert_eq!(model.location, Set(None));
        assert_eq!(model.end_date, Set(None));
    }

    #[tokio::test]
    async fn delete_of_foreign_row_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let tenant = tenant();
        let parish_id = tenant.parish_id();
        let state = test_state(db);

        let err = remove(State(state.clone()), tenant, Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        let log = transaction_log(state);
        assert!(format!("{log:?}").contains(&parish_id.to_string()));
    }

    #[tokio::test]
    async fn list_is_scoped_to_parish() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<event::Model>::new()])
            .into_connection();
        let tenant = tenant();
        let parish_id = tenant.parish_id();
        let state = test_state(db);

        let Json(events) = list(State(state.clone()), tenant).await.unwrap();
        assert!(events.is_empty());

        let log = format!("{:?}", transaction_log(state));
        assert!(log.contains("parish_id"));
        assert!(log.contains(&parish_id.to_string()));
    }
}
