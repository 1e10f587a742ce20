use async_trait::async_trait;
use axum_login::{AuthUser, AuthnBackend, UserId};
use oauth2::{
    AuthorizationCode, CsrfToken, HttpClientError, Scope, TokenResponse,
    basic::BasicRequestTokenError,
};
use reqwest::Url;
use sea_orm::{ActiveValue::*, IntoActiveModel, prelude::*};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use serde::Deserialize;
use tracing::{debug, info};

use crate::entities::{prelude::*, profile};
use crate::identity::get_user_info;
use crate::router::OauthClient;

impl AuthUser for profile::Model {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.access_token.as_bytes()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub code: String,
    pub old_state: CsrfToken,
    pub new_state: CsrfToken,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Seaorm(sea_orm::DbErr),

    #[error(transparent)]
    Reqwest(reqwest::Error),

    #[error(transparent)]
    OAuth2(BasicRequestTokenError<HttpClientError<reqwest::Error>>),

    #[error("Identity provider returned no e-mail")]
    MissingEmail,
}

#[derive(Debug, Clone)]
pub struct Backend {
    db: Arc<DatabaseConnection>,
    client: OauthClient,
    http: reqwest::Client,
    userinfo_url: String,
}

impl Backend {
    pub fn new(
        db: Arc<DatabaseConnection>,
        client: OauthClient,
        userinfo_url: String,
    ) -> Result<Self, BackendError> {
        let http = reqwest::ClientBuilder::new()
            // Following redirects opens the client up to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(BackendError::Reqwest)?;
        Ok(Self {
            db,
            client,
            http,
            userinfo_url,
        })
    }

    pub fn authorize_url(&self) -> (Url, CsrfToken) {
        self.client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url()
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = profile::Model;
    type Credentials = Credentials;
    type Error = BackendError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        // Ensure the CSRF state has not been tampered with.
        if creds.old_state.secret() != creds.new_state.secret() {
            return Ok(None);
        };

        let token_res = self
            .client
            .exchange_code(AuthorizationCode::new(creds.code))
            .request_async(&self.http)
            .await
            .map_err(Self::Error::OAuth2)?;
        let access_token = token_res.access_token().secret().to_string();

        let identity = get_user_info(&self.http, &self.userinfo_url, &access_token)
            .await
            .map_err(Self::Error::Reqwest)?;
        let email = identity.email.clone().ok_or(Self::Error::MissingEmail)?;
        let phone = identity.phone();
        let now = chrono::Utc::now().naive_utc();

        let existing = Profile::find()
            .filter(profile::Column::AuthSubject.eq(identity.id.clone()))
            .one(self.db.as_ref())
            .await
            .map_err(Self::Error::Seaorm)?;

        let profile = match existing {
            Some(existing) => {
                debug!(profile_id = %existing.id, "updating profile");
                let mut profile = existing.into_active_model();
                profile.email = Set(email);
                profile.access_token = Set(access_token);
                if identity.user_metadata.full_name.is_some() {
                    profile.full_name = Set(identity.user_metadata.full_name);
                }
                if identity.user_metadata.avatar_url.is_some() {
                    profile.avatar_url = Set(identity.user_metadata.avatar_url);
                }
                if phone.is_some() {
                    profile.phone_number = Set(phone);
                }
                profile.updated_at = Set(now);
                profile.update(self.db.as_ref()).await.map_err(Self::Error::Seaorm)?
            }
            None => {
                let profile = profile::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    auth_subject: Set(identity.id),
                    parish_id: Set(None),
                    email: Set(email),
                    full_name: Set(identity.user_metadata.full_name),
                    avatar_url: Set(identity.user_metadata.avatar_url),
                    phone_number: Set(phone),
                    role: NotSet,
                    access_token: Set(access_token),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                let profile = profile.insert(self.db.as_ref()).await.map_err(Self::Error::Seaorm)?;
                info!(profile_id = %profile.id, "created profile, awaiting parish assignment");
                profile
            }
        };

        Ok(Some(profile))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Profile::find_by_id(*user_id)
            .one(self.db.as_ref())
            .await
            .map_err(Self::Error::Seaorm)
    }
}

// We use a type alias for convenience.
//
// Note that we've supplied our concrete backend here.
pub type AuthSession = axum_login::AuthSession<Backend>;
