use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::{
    entities::{parish, profile},
    router::AppState,
    tenant::Tenant,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

#[derive(Debug, Serialize)]
pub struct Me {
    pub profile: profile::Model,
    pub parish: parish::Model,
}

pub async fn me(tenant: Tenant) -> Json<Me> {
    Json(Me {
        profile: tenant.profile,
        parish: tenant.parish,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::tenant;

    #[tokio::test]
    async fn never_exposes_access_token() {
        let Json(me) = me(tenant()).await;
        let json = serde_json::to_value(&me).unwrap();

        assert_eq!(json["profile"]["email"], "secretariat@example.org");
        assert_eq!(json["parish"]["primary_color"], "#112233");
        assert!(json["profile"].get("access_token").is_none());
    }
}
