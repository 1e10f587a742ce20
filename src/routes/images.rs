use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    routing::post,
};
use axum_login::tower_sessions::Session;
use uuid::Uuid;

use super::upload::{OptimizeQuery, read_form};
use crate::{
    error::AppError,
    media::{ImageTarget, ImageUpload, OptimizeOptions, StoredObject, target::attach_image},
    router::AppState,
    tenant::{self, Tenant},
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/images/{target}/{id}", post(attach))
}

/// Uploads `file` and writes its URL into the target column of row `id`.
pub async fn attach(
    State(state): State<AppState>,
    session: Session,
    tenant: Tenant,
    Path((target, id)): Path<(String, Uuid)>,
    Query(query): Query<OptimizeQuery>,
    multipart: Multipart,
) -> Result<Json<StoredObject>, AppError> {
    let target = ImageTarget::from_path(&target)
        .ok_or_else(|| AppError::validation(format!("Unknown image target: {target}")))?;
    let upload = read_form(multipart).await?.into_upload(Some(target.folder()))?;

    let stored = store_and_attach(&state, &session, &tenant, target, id, upload, query.options()).await?;
    Ok(Json(stored))
}

/// A new parish logo or picture drops the cached tenant so the next request
/// sees it.
async fn store_and_attach(
    state: &AppState,
    session: &Session,
    tenant: &Tenant,
    target: ImageTarget,
    id: Uuid,
    upload: ImageUpload,
    options: OptimizeOptions,
) -> Result<StoredObject, AppError> {
    let stored = attach_image(
        state.db.as_ref(),
        state.storage.as_ref(),
        target,
        tenant.parish_id(),
        id,
        upload,
        options,
    )
    .await?;

    if target.is_parish() {
        tenant::forget(session).await?;
    }
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{UploadFolder, optimize::tests::encoded};
    use crate::router::tests::test_state;
    use crate::routes::test_support::{session, tenant};
    use crate::tenant::TENANT_KEY;
    use image::ImageFormat;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn logo() -> ImageUpload {
        ImageUpload {
            bytes: encoded(40, 40, ImageFormat::Png),
            file_name: "logo.png".into(),
            content_type: "image/png".into(),
            folder: UploadFolder::Parishes,
            optimize: true,
        }
    }

    fn one_row() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
    }

    #[tokio::test]
    async fn new_parish_logo_clears_cached_tenant() {
        let state = test_state(one_row().into_connection());
        let session = session();
        let tenant = tenant();
        tenant::remember(&session, &tenant.profile, &tenant.parish)
            .await
            .unwrap();

        let stored = store_and_attach(
            &state,
            &session,
            &tenant,
            ImageTarget::ParishLogo,
            tenant.parish_id(),
            logo(),
            OptimizeOptions::default(),
        )
        .await
        .unwrap();

        assert!(stored.key.starts_with("parishes/"));
        let cached: Option<serde_json::Value> = session.get(TENANT_KEY).await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn other_targets_keep_cached_tenant() {
        let state = test_state(one_row().into_connection());
        let session = session();
        let tenant = tenant();
        tenant::remember(&session, &tenant.profile, &tenant.parish)
            .await
            .unwrap();

        store_and_attach(
            &state,
            &session,
            &tenant,
            ImageTarget::Event,
            Uuid::new_v4(),
            logo(),
            OptimizeOptions::default(),
        )
        .await
        .unwrap();

        let cached: Option<serde_json::Value> = session.get(TENANT_KEY).await.unwrap();
        assert!(cached.is_some());
    }
}
