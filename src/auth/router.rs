use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use axum_login::tower_sessions::Session;
use oauth2::CsrfToken;
use serde::Deserialize;
use tracing::{error, warn};

use super::user::{AuthSession, Credentials};
use crate::error::AppError;
use crate::router::AppState;
use crate::tenant;

pub const NEXT_URL_KEY: &str = "auth.next-url";
pub const CSRF_STATE_KEY: &str = "oauth.csrf-state";

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzResp {
    code: String,
    state: CsrfToken,
}

// This allows us to extract the "next" field from the query string. We use this
// to redirect after log in.
#[derive(Debug, Deserialize)]
pub struct NextUrl {
    next: Option<String>,
}

/// Only same-site paths are accepted as post-login targets.
fn safe_next(next: Option<String>) -> Option<String> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(self::post::login))
        .route("/login", get(self::get::login))
        .route("/logout", get(self::get::logout))
        .route("/auth/complete", get(self::get::callback))
}

mod post {
    use super::*;

    pub async fn login(
        auth_session: AuthSession,
        session: Session,
        Form(NextUrl { next }): Form<NextUrl>,
    ) -> impl IntoResponse {
        let (auth_url, csrf_state) = auth_session.backend.authorize_url();

        if let Err(err) = session.insert(CSRF_STATE_KEY, csrf_state.secret()).await {
            error!(?err, "failed to store csrf state");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        if let Err(err) = session.insert(NEXT_URL_KEY, safe_next(next)).await {
            error!(?err, "failed to store next url");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        Redirect::to(auth_url.as_str()).into_response()
    }
}

mod get {
    use super::*;

    pub async fn login(
        State(state): State<AppState>,
        Query(NextUrl { next }): Query<NextUrl>,
    ) -> Result<Html<String>, AppError> {
        let html = state
            .templates
            .get_template("login.html")?
            .render(minijinja::context! { next => safe_next(next) })?;
        Ok(Html(html))
    }

    pub async fn logout(mut auth_session: AuthSession, session: Session) -> impl IntoResponse {
        if let Err(err) = tenant::forget(&session).await {
            warn!(?err, "failed to clear tenant cache");
        }
        match auth_session.logout().await {
            Ok(_) => Redirect::to("/").into_response(),
            Err(err) => {
                error!(?err, "logout failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }

    pub async fn callback(
        mut auth_session: AuthSession,
        session: Session,
        Query(AuthzResp {
            code,
            state: new_state,
        }): Query<AuthzResp>,
    ) -> impl IntoResponse {
        let Ok(Some(old_state)) = session.get(CSRF_STATE_KEY).await else {
            return StatusCode::BAD_REQUEST.into_response();
        };

        let creds = Credentials {
            code,
            old_state,
            new_state,
        };

        let user = match auth_session.authenticate(creds).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return (StatusCode::UNAUTHORIZED, "You are not allowed here.").into_response();
            }
            Err(err) => {
                error!(?err, "authentication failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        if auth_session.login(&user).await.is_err() {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        if let Ok(Some(next)) = session.remove::<String>(NEXT_URL_KEY).await {
            Redirect::to(&next).into_response()
        } else {
            Redirect::to("/").into_response()
        }
    }
}
