use axum::{Json, Router, extract::State, routing::get};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;

use super::now;
use crate::{
    entities::{
        announcement, event, group, mass, mass_intention, mass_intention::Status, prelude::*,
    },
    error::AppError,
    router::AppState,
    tenant::Tenant,
};

const PREVIEW: u64 = 3;

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub pending_mass_requests: u64,
    pub upcoming_events: u64,
    pub total_events: u64,
    pub active_announcements: u64,
    pub total_announcements: u64,
    pub active_groups: u64,
    pub total_groups: u64,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub stats: Stats,
    pub next_events: Vec<event::Model>,
    pub masses: Vec<mass::Model>,
    pub recent_announcements: Vec<announcement::Model>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<Dashboard>, AppError> {
    let db = state.db.as_ref();
    let parish_id = tenant.parish_id();
    let now = now();

    let events = Event::find().filter(event::Column::ParishId.eq(parish_id));
    let announcements =
        Announcement::find().filter(announcement::Column::ParishId.eq(parish_id));
    let groups = Group::find().filter(group::Column::ParishId.eq(parish_id));

    let stats = Stats {
        pending_mass_requests: MassIntention::find()
            .filter(mass_intention::Column::ParishId.eq(parish_id))
            .filter(mass_intention::Column::Status.eq(Status::Pending))
            .count(db)
            .await?,
        upcoming_events: events
            .clone()
            .filter(event::Column::Date.gte(now))
            .count(db)
            .await?,
        total_events: events.clone().count(db).await?,
        active_announcements: announcements
            .clone()
            .filter(announcement::Column::IsActive.eq(true))
            .count(db)
            .await?,
        total_announcements: announcements.clone().count(db).await?,
        active_groups: groups
            .clone()
            .filter(group::Column::IsActive.eq(true))
            .count(db)
            .await?,
        total_groups: groups.count(db).await?,
    };

    let next_events = events
        .filter(event::Column::Date.gte(now))
        .order_by_asc(event::Column::Date)
        .limit(PREVIEW)
        .all(db)
        .await?;
    let masses = Mass::find()
        .filter(mass::Column::ParishId.eq(parish_id))
        .order_by_asc(mass::Column::DayOfWeek)
        .order_by_asc(mass::Column::TimeOfDay)
        .limit(PREVIEW)
        .all(db)
        .await?;
    let recent_announcements = announcements
        .order_by_desc(announcement::Column::CreatedAt)
        .limit(PREVIEW)
        .all(db)
        .await?;

    Ok(Json(Dashboard {
        stats,
        next_events,
        masses,
        recent_announcements,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::tests::test_state;
    use crate::routes::test_support::tenant;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn count(n: i64) -> Vec<BTreeMap<&'static str, Value>> {
        vec![BTreeMap::from([("num_items", Value::BigInt(Some(n)))])]
    }

    #[tokio::test]
    async fn collects_counts_in_order() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                count(2),
                count(4),
                count(9),
                count(1),
                count(5),
                count(3),
                count(3),
            ])
            .append_query_results([Vec::<event::Model>::new()])
            .append_query_results([Vec::<mass::Model>::new()])
            .append_query_results([Vec::<announcement::Model>::new()])
            .into_connection();

        let Json(dashboard) = dashboard(State(test_state(db)), tenant()).await.unwrap();

        assert_eq!(
            dashboard.stats,
            Stats {
                pending_mass_requests: 2,
                upcoming_events: 4,
                total_events: 9,
                active_announcements: 1,
                total_announcements: 5,
                active_groups: 3,
                total_groups: 3,
            }
        );
        assert!(dashboard.next_events.is_empty());
    }
}
