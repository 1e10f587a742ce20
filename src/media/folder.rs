use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::MediaError;

/// Fixed logical categories that namespace object keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadFolder {
    Events,
    Announcements,
    Notifications,
    Groups,
    Team,
    Parishes,
    Avatars,
    Books,
    Gallery,
    Homelies,
}

impl UploadFolder {
    pub const ALL: [UploadFolder; 10] = [
        UploadFolder::Events,
        UploadFolder::Announcements,
        UploadFolder::Notifications,
        UploadFolder::Groups,
        UploadFolder::Team,
        UploadFolder::Parishes,
        UploadFolder::Avatars,
        UploadFolder::Books,
        UploadFolder::Gallery,
        UploadFolder::Homelies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UploadFolder::Events => "events",
            UploadFolder::Announcements => "announcements",
            UploadFolder::Notifications => "notifications",
            UploadFolder::Groups => "groups",
            UploadFolder::Team => "team",
            UploadFolder::Parishes => "parishes",
            UploadFolder::Avatars => "avatars",
            UploadFolder::Books => "books",
            UploadFolder::Gallery => "gallery",
            UploadFolder::Homelies => "homelies",
        }
    }
}

impl fmt::Display for UploadFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadFolder {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        UploadFolder::ALL
            .into_iter()
            .find(|folder| folder.as_str() == wanted)
            .ok_or_else(|| MediaError::UnknownFolder(s.to_string()))
    }
}
