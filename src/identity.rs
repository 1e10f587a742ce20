//! Client for the identity provider's user-info endpoint.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    #[serde(alias = "sub")]
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl IdentityUser {
    /// Empty strings from the provider count as missing.
    pub fn phone(&self) -> Option<String> {
        self.phone.clone().filter(|p| !p.is_empty())
    }
}

pub async fn get_user_info(
    http: &reqwest::Client,
    userinfo_url: &str,
    access_token: &str,
) -> Result<IdentityUser, reqwest::Error> {
    http.get(userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await?
        .error_for_status()?
        .json::<IdentityUser>()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_user() {
        let json = r#"{
            "id": "5f1c8c2e-1111-4a4a-9c9c-222233334444",
            "aud": "authenticated",
            "email": "pere.martin@example.org",
            "phone": "",
            "user_metadata": {
                "full_name": "Père Martin",
                "avatar_url": "https://cdn.example.org/a.png"
            }
        }"#;

        let user: IdentityUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "5f1c8c2e-1111-4a4a-9c9c-222233334444");
        assert_eq!(user.email.as_deref(), Some("pere.martin@example.org"));
        assert_eq!(user.phone(), None);
        assert_eq!(user.user_metadata.full_name.as_deref(), Some("Père Martin"));
    }

    #[test]
    fn accepts_oidc_subject_without_metadata() {
        let user: IdentityUser =
            serde_json::from_str(r#"{"sub": "abc", "email": "a@b.c"}"#).unwrap();
        assert_eq!(user.id, "abc");
        assert!(user.user_metadata.avatar_url.is_none());
    }
}
