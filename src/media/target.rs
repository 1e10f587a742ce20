use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect,
    sea_query::{Expr, LikeExpr},
};
use tracing::warn;
use uuid::Uuid;

use super::{ImageUpload, ObjectStore, OptimizeOptions, StoredObject, UploadFolder, ingest};
use crate::entities::{announcement, event, group, parish, pastoral_member, profile};
use crate::error::AppError;

/// A URL column that an uploaded image can be written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTarget {
    Event,
    Announcement,
    Group,
    TeamMember,
    ParishLogo,
    ParishImage,
    Avatar,
}

impl ImageTarget {
    /// Columns that may still hold URLs from the legacy storage.
    pub const MIGRATED: [ImageTarget; 5] = [
        ImageTarget::Event,
        ImageTarget::Announcement,
        ImageTarget::Group,
        ImageTarget::TeamMember,
        ImageTarget::ParishLogo,
    ];

    pub fn from_path(segment: &str) -> Option<Self> {
        Some(match segment {
            "events" => Self::Event,
            "announcements" => Self::Announcement,
            "groups" => Self::Group,
            "team" => Self::TeamMember,
            "parish-logo" => Self::ParishLogo,
            "parish-image" => Self::ParishImage,
            "avatars" => Self::Avatar,
            _ => return None,
        })
    }

    pub fn folder(self) -> UploadFolder {
        match self {
            Self::Event => UploadFolder::Events,
            Self::Announcement => UploadFolder::Announcements,
            Self::Group => UploadFolder::Groups,
            Self::TeamMember => UploadFolder::Team,
            Self::ParishLogo | Self::ParishImage => UploadFolder::Parishes,
            Self::Avatar => UploadFolder::Avatars,
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Self::Event => "events",
            Self::Announcement => "announcements",
            Self::Group => "groups",
            Self::TeamMember => "pastoral_members",
            Self::ParishLogo | Self::ParishImage => "parishes",
            Self::Avatar => "profiles",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::ParishLogo => "logo_url",
            Self::Avatar => "avatar_url",
            _ => "image_url",
        }
    }

    /// Whether the column lives on the parish row itself.
    pub fn is_parish(self) -> bool {
        matches!(self, Self::ParishLogo | Self::ParishImage)
    }

    /// Writes `url` into the row `id` of the given parish. Returns rows touched.
    pub async fn set_url<C: ConnectionTrait>(
        self,
        db: &C,
        parish_id: Uuid,
        id: Uuid,
        url: &str,
    ) -> Result<u64, DbErr> {
        self.write(db, Some(parish_id), id, url).await
    }

    /// Writes `url` into row `id` regardless of tenant. Only for maintenance jobs.
    pub async fn rewrite_url<C: ConnectionTrait>(
        self,
        db: &C,
        id: Uuid,
        url: &str,
    ) -> Result<u64, DbErr> {
        self.write(db, None, id, url).await
    }

    async fn write<C: ConnectionTrait>(
        self,
        db: &C,
        parish_id: Option<Uuid>,
        id: Uuid,
        url: &str,
    ) -> Result<u64, DbErr> {
        match self {
            Self::Event => {
                update_url::<event::Entity, _>(
                    db,
                    UrlColumns {
                        id: event::Column::Id,
                        parish: event::Column::ParishId,
                        url: event::Column::ImageUrl,
                        updated_at: event::Column::UpdatedAt,
                    },
                    parish_id,
                    id,
                    url,
                )
                .await
            }
            Self::Announcement => {
                update_url::<announcement::Entity, _>(
                    db,
                    UrlColumns {
                        id: announcement::Column::Id,
                        parish: announcement::Column::ParishId,
                        url: announcement::Column::ImageUrl,
                        updated_at: announcement::Column::UpdatedAt,
                    },
                    parish_id,
                    id,
                    url,
                )
                .await
            }
            Self::Group => {
                update_url::<group::Entity, _>(
                    db,
                    UrlColumns {
                        id: group::Column::Id,
                        parish: group::Column::ParishId,
                        url: group::Column::ImageUrl,
                        updated_at: group::Column::UpdatedAt,
                    },
                    parish_id,
                    id,
                    url,
                )
                .await
            }
            Self::TeamMember => {
                update_url::<pastoral_member::Entity, _>(
                    db,
                    UrlColumns {
                        id: pastoral_member::Column::Id,
                        parish: pastoral_member::Column::ParishId,
                        url: pastoral_member::Column::ImageUrl,
                        updated_at: pastoral_member::Column::UpdatedAt,
                    },
                    parish_id,
                    id,
                    url,
                )
                .await
            }
            Self::Avatar => {
                update_url::<profile::Entity, _>(
                    db,
                    UrlColumns {
                        id: profile::Column::Id,
                        parish: profile::Column::ParishId,
                        url: profile::Column::AvatarUrl,
                        updated_at: profile::Column::UpdatedAt,
                    },
                    parish_id,
                    id,
                    url,
                )
                .await
            }
            // A parish is its own tenant: the row id is the scope.
            Self::ParishLogo | Self::ParishImage => {
                if parish_id.is_some_and(|p| p != id) {
                    return Ok(0);
                }
                let url_column = if self == Self::ParishLogo {
                    parish::Column::LogoUrl
                } else {
                    parish::Column::ImageUrl
                };
                update_url::<parish::Entity, _>(
                    db,
                    UrlColumns {
                        id: parish::Column::Id,
                        parish: parish::Column::Id,
                        url: url_column,
                        updated_at: parish::Column::UpdatedAt,
                    },
                    None,
                    id,
                    url,
                )
                .await
            }
        }
    }

    /// `(id, url)` of every row whose column contains `marker`.
    pub async fn rows_matching<C: ConnectionTrait>(
        self,
        db: &C,
        marker: &str,
    ) -> Result<Vec<(Uuid, String)>, DbErr> {
        use ImageTarget::*;
        match self {
            Event => select_matching::<event::Entity, _>(db, event::Column::Id, event::Column::ImageUrl, marker).await,
            Announcement => {
                select_matching::<announcement::Entity, _>(
                    db,
                    announcement::Column::Id,
                    announcement::Column::ImageUrl,
                    marker,
                )
                .await
            }
            Group => select_matching::<group::Entity, _>(db, group::Column::Id, group::Column::ImageUrl, marker).await,
            TeamMember => {
                select_matching::<pastoral_member::Entity, _>(
                    db,
                    pastoral_member::Column::Id,
                    pastoral_member::Column::ImageUrl,
                    marker,
                )
                .await
            }
            ParishLogo => select_matching::<parish::Entity, _>(db, parish::Column::Id, parish::Column::LogoUrl, marker).await,
            ParishImage => select_matching::<parish::Entity, _>(db, parish::Column::Id, parish::Column::ImageUrl, marker).await,
            Avatar => select_matching::<profile::Entity, _>(db, profile::Column::Id, profile::Column::AvatarUrl, marker).await,
        }
    }
}

struct UrlColumns<C> {
    id: C,
    parish: C,
    url: C,
    updated_at: C,
}

async fn update_url<E, C>(
    db: &C,
    columns: UrlColumns<E::Column>,
    parish_id: Option<Uuid>,
    id: Uuid,
    url: &str,
) -> Result<u64, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let mut update = E::update_many()
        .col_expr(columns.url, Expr::value(url))
        .col_expr(columns.updated_at, Expr::value(Utc::now().naive_utc()))
        .filter(columns.id.eq(id));
    if let Some(parish_id) = parish_id {
        update = update.filter(columns.parish.eq(parish_id));
    }
    Ok(update.exec(db).await?.rows_affected)
}

async fn select_matching<E, C>(
    db: &C,
    id: E::Column,
    url: E::Column,
    marker: &str,
) -> Result<Vec<(Uuid, String)>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    E::find()
        .select_only()
        .column(id)
        .column(url)
        .filter(url.like(LikeExpr::new(like_pattern(marker)).escape('\\')))
        .into_tuple()
        .all(db)
        .await
}

/// `%marker%`, with `%`, `_` and `\` in the marker matched literally.
fn like_pattern(marker: &str) -> String {
    let mut pattern = String::with_capacity(marker.len() + 2);
    pattern.push('%');
    for c in marker.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Uploads the image, then points the target column of row `id` at it.
/// Nothing is written to the database when the upload fails.
pub async fn attach_image<C: ConnectionTrait>(
    db: &C,
    store: &dyn ObjectStore,
    target: ImageTarget,
    parish_id: Uuid,
    id: Uuid,
    upload: ImageUpload,
    options: OptimizeOptions,
) -> Result<StoredObject, AppError> {
    let stored = ingest(store, upload, options).await?;

    let rows = target.set_url(db, parish_id, id, &stored.url).await?;
    if rows == 0 {
        warn!(
            key = %stored.key,
            table = target.table(),
            %id,
            "row not found, uploaded object left orphaned"
        );
        return Err(AppError::NotFound);
    }
    Ok(stored)
}
