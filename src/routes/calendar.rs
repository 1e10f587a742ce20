use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{Datelike, NaiveTime};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, Select};
use uuid::Uuid;
use serde::Deserialize;

use super::now;
use crate::{
    calendar::{self, CalendarEntry, MonthWindow},
    entities::{event, mass, prelude::*},
    error::AppError,
    router::AppState,
    tenant::Tenant,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/calendar", get(month))
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Events and mass occurrences of one month. Defaults to the current month.
pub async fn month(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<CalendarEntry>>, AppError> {
    let today = now().date();
    let window = MonthWindow::new(
        query.year.unwrap_or(today.year()),
        query.month.unwrap_or(today.month()),
    )
    .ok_or_else(|| AppError::validation("Month must be between 1 and 12"))?;

    let events = events_in(tenant.parish_id(), &window)?
        .all(state.db.as_ref())
        .await?;
    let masses = Mass::find()
        .filter(mass::Column::ParishId.eq(tenant.parish_id()))
        .all(state.db.as_ref())
        .await?;

    Ok(Json(calendar::build(window, &events, &masses)))
}

/// Events starting inside `[first, next month)`, or started earlier and
/// still running at the start of the month.
fn events_in(parish_id: Uuid, window: &MonthWindow) -> Result<Select<Event>, AppError> {
    let start = window.first.and_time(NaiveTime::MIN);
    let next = window
        .last
        .succ_opt()
        .ok_or_else(|| AppError::validation("Invalid month"))?
        .and_time(NaiveTime::MIN);

    Ok(Event::find()
        .filter(event::Column::ParishId.eq(parish_id))
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(event::Column::Date.gte(start))
                        .add(event::Column::Date.lt(next)),
                )
                .add(
                    Condition::all()
                        .add(event::Column::Date.lt(start))
                        .add(event::Column::EndDate.gte(start)),
                ),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::tests::test_state;
    use crate::routes::test_support::tenant;
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait};

    fn sql(parish_id: Uuid, year: i32, month: u32) -> String {
        let window = MonthWindow::new(year, month).unwrap();
        events_in(parish_id, &window)
            .unwrap()
            .build(DatabaseBackend::Postgres)
            .to_string()
    }

    #[test]
    fn event_filter_is_half_open_and_scoped() {
        let parish_id = Uuid::new_v4();
        let sql = sql(parish_id, 2025, 6);

        assert!(sql.contains(&parish_id.to_string()));
        assert!(sql.contains(r#""date" >= '2025-06-01 00:00:00"#));
        assert!(sql.contains(r#""date" < '2025-07-01 00:00:00"#));
        assert!(!sql.contains("BETWEEN"));
    }

    #[test]
    fn event_filter_keeps_events_straddling_month_start() {
        let sql = sql(Uuid::new_v4(), 2025, 6);
        assert!(sql.contains(r#""date" < '2025-06-01 00:00:00"#));
        assert!(sql.contains(r#""end_date" >= '2025-06-01 00:00:00"#));
    }

    #[test]
    fn december_ends_at_new_year() {
        let sql = sql(Uuid::new_v4(), 2025, 12);
        assert!(sql.contains(r#""date" < '2026-01-01 00:00:00"#));
    }

    #[tokio::test]
    async fn straddling_event_is_listed() {
        let tenant = tenant();
        let ts = NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let retreat = event::Model {
            id: Uuid::new_v4(),
            parish_id: tenant.parish_id(),
            title: "Retraite paroissiale".into(),
            description: None,
            date: NaiveDate::from_ymd_opt(2025, 5, 30)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(14, 0, 0),
            location: None,
            event_type: "retreat".into(),
            image_url: None,
            organizer: None,
            contact_email: None,
            contact_phone: None,
            max_participants: None,
            registered_count: 0,
            created_at: ts,
            updated_at: ts,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[retreat.clone()]])
            .append_query_results([Vec::<mass::Model>::new()])
            .into_connection();

        let Json(entries) = month(
            State(test_state(db)),
            tenant,
            Query(MonthQuery {
                year: Some(2025),
                month: Some(6),
            }),
        )
        .await
        .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, format!("event-{}", retreat.id));
    }
}
