use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, sea_query::Expr};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::now;
use crate::{
    entities::{mass_intention, mass_intention::Status, prelude::*},
    error::AppError,
    router::AppState,
    tenant::Tenant,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/mass-requests", get(list))
        .route("/mass-requests/{id}/status", put(set_status))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<Status>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: Status,
}

pub async fn list(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<mass_intention::Model>>, AppError> {
    let mut select = MassIntention::find()
        .filter(mass_intention::Column::ParishId.eq(tenant.parish_id()));
    if let Some(status) = query.status {
        select = select.filter(mass_intention::Column::Status.eq(status));
    }
    let requests = select
        .order_by_desc(mass_intention::Column::CreatedAt)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(requests))
}

/// Approves or rejects a pending request. Decided requests are final.
pub async fn set_status(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> Result<Json<mass_intention::Model>, AppError> {
    let request = MassIntention::find_by_id(id)
        .filter(mass_intention::Column::ParishId.eq(tenant.parish_id()))
        .one(state.db.as_ref())
        .await?
        .ok_or(AppError::NotFound)?;

    let from = request.status;
    if !from.can_transition_to(change.status) {
        return Err(AppError::Conflict(format!(
            "Request is already {}, it cannot become {}",
            status_name(from),
            status_name(change.status)
        )));
    }

    // Only a row that is still pending may move, even under concurrent decisions.
    let updated_at = now();
    let result = MassIntention::update_many()
        .col_expr(mass_intention::Column::Status, Expr::value(change.status))
        .col_expr(mass_intention::Column::UpdatedAt, Expr::value(updated_at))
        .filter(mass_intention::Column::Id.eq(id))
        .filter(mass_intention::Column::ParishId.eq(tenant.parish_id()))
        .filter(mass_intention::Column::Status.eq(Status::Pending))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Request was decided in the meantime".into(),
        ));
    }

    let request = mass_intention::Model {
        status: change.status,
        updated_at,
        ..request
    };
    info!(request_id = %id, from = status_name(from), to = status_name(request.status), "mass request decided");
    Ok(Json(request))
}

fn status_name(status: Status) -> &'static str {
    match status {
        Status::Pending => "pending",
        Status::Approved => "approved",
        Status::Rejected => "rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::tests::{test_state, transaction_log};
    use crate::routes::test_support::tenant;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn request(parish_id: Uuid, status: Status) -> mass_intention::Model {
        let ts = chrono::NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        mass_intention::Model {
            id: Uuid::new_v4(),
            parish_id,
            user_id: None,
            intention_text: "Pour les défunts de la famille Durand".into(),
            requested_date: None,
            status,
            transaction_id: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[tokio::test]
    async fn approved_request_cannot_be_rejected() {
        let tenant = tenant();
        let existing = request(tenant.parish_id(), Status::Approved);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing.clone()]])
            .into_connection();
        let state = test_state(db);

        let err = set_status(
            State(state),
            tenant,
            Path(existing.id),
            Json(StatusChange {
                status: Status::Rejected,
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.to_string(), "Request is already approved, it cannot become rejected");
    }

    #[tokio::test]
    async fn pending_request_is_approved() {
        let tenant = tenant();
        let parish_id = tenant.parish_id();
        let existing = request(parish_id, Status::Pending);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing.clone()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let state = test_state(db);

        let Json(updated) = set_status(
            State(state.clone()),
            tenant,
            Path(existing.id),
            Json(StatusChange {
                status: Status::Approved,
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, Status::Approved);
        assert_eq!(updated.intention_text, existing.intention_text);

        let log = transaction_log(state);
        assert_eq!(log.len(), 2);
        let update = format!("{:?}", log[1]);
        assert!(update.contains("UPDATE"));
        assert!(update.contains("parish_id"));
        assert!(update.contains(&parish_id.to_string()));
        // The write is guarded on the row still being pending.
        assert!(update.contains("pending"));
    }

    #[tokio::test]
    async fn concurrent_decision_is_a_conflict() {
        let tenant = tenant();
        let existing = request(tenant.parish_id(), Status::Pending);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing.clone()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = set_status(
            State(test_state(db)),
            tenant,
            Path(existing.id),
            Json(StatusChange {
                status: Status::Rejected,
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn status_filter_parses_lowercase() {
        let query: ListQuery = serde_json::from_str(r#"{"status":"pending"}"#).unwrap();
        assert_eq!(query.status, Some(Status::Pending));
    }
}
