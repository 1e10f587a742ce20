use crate::{
    auth::{
        router as auth_router,
        user::{Backend, BackendError},
    },
    error::AppError,
    media::ObjectStore,
    routes,
    tenant::Tenant,
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::header,
    response::{Html, IntoResponse},
    routing::{get, get_service},
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{
        Expiry, SessionManagerLayer,
        cookie::{SameSite, time},
    },
};
use minijinja::Environment;
use oauth2::{EndpointNotSet, EndpointSet, basic::BasicClient};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::{signal, task::AbortHandle};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::error;

pub type OauthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

const DEFAULT_PRIMARY: &str = "#1e3a8a";
const DEFAULT_SECONDARY: &str = "#d4a017";

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub templates: Arc<Environment<'static>>,
    pub storage: Arc<dyn ObjectStore>,
}

pub async fn create_router(
    db: DatabaseConnection,
    client: OauthClient,
    userinfo_url: String,
    storage: Arc<dyn ObjectStore>,
    session_store: PostgresStore,
    upload_max_bytes: usize,
) -> Result<Router, BackendError> {
    let db = Arc::new(db);
    let state = AppState {
        db: db.clone(),
        templates: Arc::new(setup_templates()),
        storage,
    };

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax) // Ensure we send the cookie from the OAuth redirect.
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    // Auth service.
    //
    // This combines the session layer with our backend to establish the auth
    // service which will provide the auth session as a request extension.
    let backend = Backend::new(db, client, userinfo_url)?;
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let app = app_routes(upload_max_bytes)
        .with_state(state)
        .nest_service("/static", get_service(ServeDir::new("static")))
        .layer(auth_layer)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

/// Every route, before the session and auth layers are applied.
pub fn app_routes(upload_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/theme.css", get(theme))
        .nest(
            "/api",
            routes::api_router().layer(DefaultBodyLimit::max(upload_max_bytes)),
        )
        .merge(auth_router::router())
}

pub fn setup_templates() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader("templates"));
    env
}

async fn index(
    State(state): State<AppState>,
    tenant: Result<Tenant, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let tmpl = state.templates.get_template("index.html")?;
    let html = match tenant {
        Ok(tenant) => tmpl.render(minijinja::context! {
            signed_in => true,
            name => tenant.profile.full_name.unwrap_or(tenant.profile.email),
            parish => tenant.parish.name,
            logo_url => tenant.parish.logo_url,
        })?,
        Err(AppError::Forbidden(reason)) => tmpl.render(minijinja::context! {
            signed_in => true,
            pending => reason,
        })?,
        Err(_) => tmpl.render(minijinja::context! { signed_in => false })?,
    };
    Ok(Html(html))
}

/// CSS variables for the current parish, or the default palette.
async fn theme(
    State(state): State<AppState>,
    tenant: Result<Tenant, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let (primary, secondary) = match &tenant {
        Ok(tenant) => (
            tenant.parish.primary_color.as_deref(),
            tenant.parish.secondary_color.as_deref(),
        ),
        Err(_) => (None, None),
    };
    let css = state
        .templates
        .get_template("theme.css")?
        .render(minijinja::context! {
            primary => primary.unwrap_or(DEFAULT_PRIMARY),
            secondary => secondary.unwrap_or(DEFAULT_SECONDARY),
        })?;
    Ok(([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css))
}

pub async fn shutdown_signal(deletion_task_abort_handle: AbortHandle) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(?err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!(?err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { deletion_task_abort_handle.abort() },
        _ = terminate => { deletion_task_abort_handle.abort() },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::media::storage::memory::MemoryStore;
    use axum::{body::Body, http::Request, http::StatusCode};
    use http_body_util::BodyExt;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;

    pub(crate) fn test_state(db: DatabaseConnection) -> AppState {
        AppState {
            db: Arc::new(db),
            templates: Arc::new(setup_templates()),
            storage: Arc::new(MemoryStore::new()),
        }
    }

    /// Statements the handlers ran, once every clone of `state` is gone.
    pub(crate) fn transaction_log(state: AppState) -> Vec<sea_orm::Transaction> {
        Arc::try_unwrap(state.db)
            .ok()
            .expect("database handle still shared")
            .into_transaction_log()
    }

    fn app() -> Router {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        app_routes(1024 * 1024).with_state(test_state(db))
    }

    #[tokio::test]
    async fn theme_falls_back_to_default_palette() {
        let response = app()
            .oneshot(Request::get("/theme.css").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/css; charset=utf-8"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let css = String::from_utf8(body.to_vec()).unwrap();
        assert!(css.contains(DEFAULT_PRIMARY));
        assert!(css.contains(DEFAULT_SECONDARY));
    }

    #[tokio::test]
    async fn landing_page_offers_login_when_signed_out() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("/login"));
    }

    #[tokio::test]
    async fn api_requires_a_session() {
        let response = app()
            .oneshot(Request::get("/api/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Not signed in");
    }
}
