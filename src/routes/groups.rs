use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::NaiveTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{day_of_week, form, now, optional, required};
use crate::{
    entities::{group, prelude::*, profile},
    error::AppError,
    router::AppState,
    tenant::Tenant,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list).post(create))
        .route("/groups/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct GroupForm {
    pub name: String,
    pub description: Option<String>,
    pub group_type: Option<String>,
    pub meeting_day: Option<i16>,
    #[serde(default, deserialize_with = "form::opt_time")]
    pub meeting_time: Option<NaiveTime>,
    pub meeting_day2: Option<i16>,
    #[serde(default, deserialize_with = "form::opt_time")]
    pub meeting_time2: Option<NaiveTime>,
    pub meeting_location: Option<String>,
    pub image_url: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    pub members_count: Option<i32>,
    pub admin1_id: Option<Uuid>,
    pub admin2_id: Option<Uuid>,
}

fn active() -> bool {
    true
}

impl GroupForm {
    fn admins(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.admin1_id.into_iter().chain(self.admin2_id).collect();
        ids.dedup();
        ids
    }

    fn apply(self, model: &mut group::ActiveModel) -> Result<(), AppError> {
        let name = required(&self.name, "Name")?;
        let meeting_day = self
            .meeting_day
            .map(|d| day_of_week(d, "Meeting day"))
            .transpose()?;
        let meeting_day2 = self
            .meeting_day2
            .map(|d| day_of_week(d, "Second meeting day"))
            .transpose()?;
        if self.members_count.is_some_and(|c| c < 0) {
            return Err(AppError::validation("Member count must not be negative"));
        }

        model.name = Set(name);
        model.description = Set(optional(self.description));
        model.group_type = Set(optional(self.group_type).unwrap_or_else(|| "other".into()));
        model.meeting_day = Set(meeting_day);
        model.meeting_time = Set(self.meeting_time);
        model.meeting_day2 = Set(meeting_day2);
        model.meeting_time2 = Set(self.meeting_time2);
        model.meeting_location = Set(optional(self.meeting_location));
        model.image_url = Set(optional(self.image_url));
        model.is_active = Set(self.is_active);
        if let Some(count) = self.members_count {
            model.members_count = Set(count);
        }
        model.admin1_id = Set(self.admin1_id);
        model.admin2_id = Set(self.admin2_id);
        Ok(())
    }
}

/// Admins have to be profiles of the same parish.
async fn check_admins<C: ConnectionTrait>(
    db: &C,
    parish_id: Uuid,
    admins: &[Uuid],
) -> Result<(), AppError> {
    if admins.is_empty() {
        return Ok(());
    }
    let found = Profile::find()
        .filter(profile::Column::Id.is_in(admins.iter().copied()))
        .filter(profile::Column::ParishId.eq(parish_id))
        .count(db)
        .await?;
    if found as usize != admins.len() {
        return Err(AppError::validation(
            "Group admins must be members of this parish",
        ));
    }
    Ok(())
}

async fn find_scoped(state: &AppState, tenant: &Tenant, id: Uuid) -> Result<group::Model, AppError> {
    Group::find_by_id(id)
        .filter(group::Column::ParishId.eq(tenant.parish_id()))
        .one(state.db.as_ref())
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<Vec<group::Model>>, AppError> {
    let groups = Group::find()
        .filter(group::Column::ParishId.eq(tenant.parish_id()))
        .order_by_asc(group::Column::Name)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(groups))
}

pub async fn show(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
) -> Result<Json<group::Model>, AppError> {
    Ok(Json(find_scoped(&state, &tenant, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(form): Json<GroupForm>,
) -> Result<(StatusCode, Json<group::Model>), AppError> {
    check_admins(state.db.as_ref(), tenant.parish_id(), &form.admins()).await?;

    let now = now();
    let mut model = group::ActiveModel {
        id: Set(Uuid::new_v4()),
        parish_id: Set(tenant.parish_id()),
        members_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    form.apply(&mut model)?;

    let group = model.insert(state.db.as_ref()).await?;
    info!(group_id = %group.id, "group created");
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
    Json(form): Json<GroupForm>,
) -> Result<Json<group::Model>, AppError> {
    let mut model = find_scoped(&state, &tenant, id).await?.into_active_model();
    check_admins(state.db.as_ref(), tenant.parish_id(), &form.admins()).await?;
    form.apply(&mut model)?;
    model.updated_at = Set(now());
    Ok(Json(model.update(state.db.as_ref()).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = Group::delete_many()
        .filter(group::Column::Id.eq(id))
        .filter(group::Column::ParishId.eq(tenant.parish_id()))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    info!(group_id = %id, "group deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    #[test]
    fn validates_meeting_days() {
        let form: GroupForm = serde_json::from_value(serde_json::json!({
            "name": "Chorale",
            "meeting_day": 4,
            "meeting_time": "20:00",
            "meeting_day2": 9,
        }))
        .unwrap();
        let err = form.apply(&mut <group::ActiveModel as Default>::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Second meeting day must be between 0 (Sunday) and 6 (Saturday)"
        );
    }

    #[test]
    fn same_admin_twice_counts_once() {
        let id = Uuid::new_v4();
        let form: GroupForm = serde_json::from_value(serde_json::json!({
            "name": "Scouts",
            "admin1_id": id,
            "admin2_id": id,
        }))
        .unwrap();
        assert_eq!(form.admins(), vec![id]);
    }

    #[tokio::test]
    async fn admins_from_another_parish_are_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(1)]])
            .into_connection();

        let err = check_admins(&db, Uuid::new_v4(), &[Uuid::new_v4(), Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn no_admins_needs_no_query() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        check_admins(&db, Uuid::new_v4(), &[]).await.unwrap();
        assert!(db.into_transaction_log().is_empty());
    }
}
