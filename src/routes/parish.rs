use axum::{Json, Router, extract::State, routing::get};
use axum_login::tower_sessions::Session;
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::Deserialize;
use tracing::info;

use super::{now, optional, required};
use crate::{
    entities::parish, error::AppError, router::AppState, tenant, tenant::Tenant,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/parish", get(show).put(update))
}

#[derive(Debug, Deserialize)]
pub struct ParishForm {
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub description: Option<String>,
    pub diocese: Option<String>,
    pub history: Option<String>,
    pub founding_date: Option<NaiveDate>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
    pub image_url: Option<String>,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
}

/// `#rgb` or `#rrggbb`.
fn hex_color(value: Option<String>, field: &str) -> Result<Option<String>, AppError> {
    let Some(color) = optional(value) else {
        return Ok(None);
    };
    let digits = color.strip_prefix('#').unwrap_or_default();
    if matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(Some(color.to_ascii_lowercase()))
    } else {
        Err(AppError::validation(format!(
            "{field} must be a hex colour like #1e3a8a"
        )))
    }
}

impl ParishForm {
    fn apply(self, model: &mut parish::ActiveModel) -> Result<(), AppError> {
        model.primary_color = Set(hex_color(self.primary_color, "Primary colour")?);
        model.secondary_color = Set(hex_color(self.secondary_color, "Secondary colour")?);
        model.name = Set(required(&self.name, "Name")?);
        model.address = Set(required(&self.address, "Address")?);
        model.city = Set(required(&self.city, "City")?);
        model.country = Set(required(&self.country, "Country")?);
        model.description = Set(optional(self.description));
        model.diocese = Set(optional(self.diocese));
        model.history = Set(optional(self.history));
        model.founding_date = Set(self.founding_date);
        model.contact_email = Set(optional(self.contact_email));
        model.contact_phone = Set(optional(self.contact_phone));
        model.website = Set(optional(self.website));
        model.image_url = Set(optional(self.image_url));
        model.logo_url = Set(optional(self.logo_url));
        Ok(())
    }
}

pub async fn show(tenant: Tenant) -> Json<parish::Model> {
    Json(tenant.parish)
}

/// Saves the settings and refreshes the cached tenant so the theme follows.
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    tenant: Tenant,
    Json(form): Json<ParishForm>,
) -> Result<Json<parish::Model>, AppError> {
    let mut model = tenant.parish.clone().into_active_model();
    form.apply(&mut model)?;
    model.updated_at = Set(now());
    let parish = model.update(state.db.as_ref()).await?;

    tenant::remember(&session, &tenant.profile, &parish).await?;
    info!(parish_id = %parish.id, "parish settings updated");
    Ok(Json(parish))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colours_must_be_hex() {
        assert_eq!(
            hex_color(Some("#1E3A8A".into()), "c").unwrap().as_deref(),
            Some("#1e3a8a")
        );
        assert_eq!(hex_color(Some("#fff".into()), "c").unwrap().as_deref(), Some("#fff"));
        assert_eq!(hex_color(Some(" ".into()), "c").unwrap(), None);
        assert!(hex_color(Some("blue".into()), "c").is_err());
        assert!(hex_color(Some("#12345g".into()), "c").is_err());
    }

    #[test]
    fn requires_identity_fields() {
        let form: ParishForm = serde_json::from_value(serde_json::json!({
            "name": "Saint-Louis",
            "address": "",
            "city": "Lyon",
            "country": "France",
        }))
        .unwrap();
        let err = form.apply(&mut <parish::ActiveModel as Default>::default()).unwrap_err();
        assert_eq!(err.to_string(), "Address is required");
    }
}
