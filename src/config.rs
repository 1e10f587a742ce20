use anyhow::Context;
use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use std::env;

const DEFAULT_UPLOAD_MAX_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub storage: StorageConfig,
    pub upload_max_bytes: usize,
}

/// OAuth2 settings for the hosted identity provider. Only `serve` needs them.
#[derive(Clone)]
pub struct AuthConfig {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
    pub userinfo_url: String,
    pub redirect_url: RedirectUrl,
}

/// S3-compatible bucket settings. Credentials never leave the server.
#[derive(Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env is fine in deployments that set the environment directly.
        dotenvy::dotenv().ok();
        let database_url = required("DATABASE_URL")?;
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "debug".into());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
        let upload_max_bytes = match env::var("UPLOAD_MAX_BYTES") {
            Ok(value) => value
                .parse()
                .context("UPLOAD_MAX_BYTES must be a byte count")?,
            Err(_) => DEFAULT_UPLOAD_MAX_BYTES,
        };

        Ok(Self {
            database_url,
            rust_log,
            bind_addr,
            storage: StorageConfig::from_env()?,
            upload_max_bytes,
        })
    }
}

impl AuthConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let client_id = ClientId::new(required("AUTH_CLIENT_ID")?);
        let client_secret = ClientSecret::new(required("AUTH_CLIENT_SECRET")?);
        let auth_url = AuthUrl::new(required("AUTH_AUTHORIZE_URL")?)
            .context("AUTH_AUTHORIZE_URL is not a valid URL")?;
        let token_url = TokenUrl::new(required("AUTH_TOKEN_URL")?)
            .context("AUTH_TOKEN_URL is not a valid URL")?;
        let userinfo_url = required("AUTH_USERINFO_URL")?;
        let redirect_url = RedirectUrl::new(required("AUTH_REDIRECT_URI")?)
            .context("AUTH_REDIRECT_URI is not a valid URL")?;

        Ok(Self {
            client_id,
            client_secret,
            auth_url,
            token_url,
            userinfo_url,
            redirect_url,
        })
    }
}

impl StorageConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            endpoint: env::var("S3_ENDPOINT")
                .unwrap_or_else(|_| "s3.us-east-005.backblazeb2.com".into()),
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            access_key_id: required("S3_ACCESS_KEY_ID")?,
            secret_access_key: required("S3_SECRET_ACCESS_KEY")?,
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "stlouis-media".into()),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} is not set in the environment or .env file"))
}
