//! PostgreSQL implementation of the wallpaper store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use super::{FeatureInsert, StoreError, WallpaperStore};
use crate::duplicate::{DuplicateDetector, DuplicateMatch, MatchKind};
use crate::error::{Result, WallpaperError};
use crate::fingerprint::Fingerprint;
use crate::model::{DailyFeature, Image, ImageId, NewImage, Page, PageRequest};

/// Advisory lock key serializing guarded image creation.
const IMAGE_CREATE_LOCK: i64 = 0x6461_696c_7977_616c;

const IMAGE_COLUMNS: &str = "id, fingerprint, file_name, content_type, source_url, width, height, \
                             byte_size, is_approved, uploaded_at, approved_at";

/// PostgreSQL-backed wallpaper store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct ImageRow {
    id: i64,
    fingerprint: String,
    file_name: String,
    content_type: String,
    source_url: Option<String>,
    width: i32,
    height: i32,
    byte_size: i64,
    is_approved: bool,
    uploaded_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
}

impl TryFrom<ImageRow> for Image {
    type Error = StoreError;

    fn try_from(row: ImageRow) -> std::result::Result<Self, StoreError> {
        let fingerprint = row.fingerprint.parse::<Fingerprint>().map_err(|e| {
            StoreError::Corrupt(format!("image {}: {}", row.id, e))
        })?;
        let dimension = |v: i32| {
            u32::try_from(v)
                .map_err(|_| StoreError::Corrupt(format!("image {}: bad dimension {}", row.id, v)))
        };

        Ok(Self {
            id: ImageId(row.id),
            fingerprint,
            width: dimension(row.width)?,
            height: dimension(row.height)?,
            file_name: row.file_name,
            content_type: row.content_type,
            source_url: row.source_url,
            byte_size: row.byte_size.max(0) as u64,
            is_approved: row.is_approved,
            uploaded_at: row.uploaded_at,
            approved_at: row.approved_at,
        })
    }
}

#[derive(FromRow)]
struct FeatureRow {
    feature_date: NaiveDate,
    image_id: i64,
}

impl From<FeatureRow> for DailyFeature {
    fn from(row: FeatureRow) -> Self {
        Self {
            date: row.feature_date,
            image_id: ImageId(row.image_id),
        }
    }
}

fn parse_fingerprints(rows: Vec<(i64, String)>) -> std::result::Result<Vec<(ImageId, Fingerprint)>, StoreError> {
    rows.into_iter()
        .map(|(id, fp)| {
            fp.parse::<Fingerprint>()
                .map(|fp| (ImageId(id), fp))
                .map_err(|e| StoreError::Corrupt(format!("image {}: {}", id, e)))
        })
        .collect()
}

/// Dimensions are stored as `INTEGER`.
fn to_db_dimension(name: &str, value: u32) -> std::result::Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::OutOfRange(format!("image {name} {value} exceeds {}", i32::MAX)))
}

fn to_images(rows: Vec<ImageRow>) -> std::result::Result<Vec<Image>, StoreError> {
    rows.into_iter().map(Image::try_from).collect()
}

impl PostgresStore {
    /// Connect and apply migrations.
    pub async fn new(database_url: &str, max_connections: u32) -> std::result::Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::info!("Wallpaper store connected and migrations applied");
        Ok(store)
    }

    /// Create from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> std::result::Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn page(
        &self,
        approved: bool,
        request: PageRequest,
    ) -> std::result::Result<Page<Image>, StoreError> {
        let order = if approved {
            "approved_at DESC, id DESC"
        } else {
            "uploaded_at ASC, id ASC"
        };

        let rows: Vec<ImageRow> = sqlx::query_as(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images WHERE is_approved = $1 ORDER BY {order} LIMIT $2 OFFSET $3"
        ))
        .bind(approved)
        .bind(i64::from(request.per_page))
        .bind(request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE is_approved = $1")
            .bind(approved)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(to_images(rows)?, request, total.max(0) as u64))
    }

    async fn fingerprint_owner(&self, fingerprint: &Fingerprint) -> std::result::Result<Option<ImageId>, StoreError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM images WHERE fingerprint = $1")
            .bind(fingerprint.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(id.map(ImageId))
    }
}

#[async_trait]
impl WallpaperStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn check_health(&self) -> std::result::Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn create_image(&self, new: NewImage, detector: &DuplicateDetector) -> Result<Image> {
        let width = to_db_dimension("width", new.width)?;
        let height = to_db_dimension("height", new.height)?;

        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        // Held until commit or rollback; serializes concurrent creations
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(IMAGE_CREATE_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, fingerprint FROM images ORDER BY id")
            .fetch_all(&mut *tx)
            .await
            .map_err(StoreError::from)?;
        let existing = parse_fingerprints(rows)?;

        if let Some(matched) = detector.check(&new.fingerprint, &existing).matched {
            tx.rollback().await.map_err(StoreError::from)?;
            return Err(WallpaperError::Duplicate(matched));
        }

        let inserted: std::result::Result<ImageRow, sqlx::Error> = sqlx::query_as(&format!(
            r#"
            INSERT INTO images
                (fingerprint, file_name, content_type, source_url, width, height,
                 byte_size, data, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(new.fingerprint.to_string())
        .bind(&new.file_name)
        .bind(&new.content_type)
        .bind(&new.source_url)
        .bind(width)
        .bind(height)
        .bind(new.data.len() as i64)
        .bind(&new.data)
        .bind(new.uploaded_at)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // Unique index backstop: report the row that owns the fingerprint
                drop(tx);
                let owner = self
                    .fingerprint_owner(&new.fingerprint)
                    .await?
                    .ok_or_else(|| StoreError::Query(db.to_string()))?;
                return Err(WallpaperError::Duplicate(DuplicateMatch {
                    image_id: owner,
                    kind: MatchKind::Exact,
                    mean_distance: 0.0,
                }));
            }
            Err(e) => return Err(StoreError::from(e).into()),
        };

        tx.commit().await.map_err(StoreError::from)?;

        let image = Image::try_from(row)?;
        tracing::debug!(image_id = %image.id, "Stored image");
        Ok(image)
    }

    async fn image(&self, id: ImageId) -> std::result::Result<Option<Image>, StoreError> {
        let row: Option<ImageRow> =
            sqlx::query_as(&format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Image::try_from).transpose()
    }

    async fn image_data(&self, id: ImageId) -> std::result::Result<Option<Vec<u8>>, StoreError> {
        let data: Option<Vec<u8>> = sqlx::query_scalar("SELECT data FROM images WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(data)
    }

    async fn fingerprints(&self) -> std::result::Result<Vec<(ImageId, Fingerprint)>, StoreError> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, fingerprint FROM images ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        parse_fingerprints(rows)
    }

    async fn approve(
        &self,
        id: ImageId,
        at: DateTime<Utc>,
    ) -> std::result::Result<Option<Image>, StoreError> {
        let row: Option<ImageRow> = sqlx::query_as(&format!(
            r#"
            UPDATE images
            SET is_approved = TRUE, approved_at = COALESCE(approved_at, $2)
            WHERE id = $1
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(id.0)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_some() {
            tracing::debug!(image_id = %id, "Approved image");
        }
        row.map(Image::try_from).transpose()
    }

    async fn approve_many(
        &self,
        ids: &[ImageId],
        at: DateTime<Utc>,
    ) -> std::result::Result<u64, StoreError> {
        let ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let result = sqlx::query(
            r#"
            UPDATE images
            SET is_approved = TRUE, approved_at = $2
            WHERE id = ANY($1) AND NOT is_approved
            "#,
        )
        .bind(&ids)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn approved_image_ids(&self) -> std::result::Result<Vec<ImageId>, StoreError> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM images WHERE is_approved ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(ImageId).collect())
    }

    async fn list_approved(&self, page: PageRequest) -> std::result::Result<Page<Image>, StoreError> {
        self.page(true, page).await
    }

    async fn list_pending(&self, page: PageRequest) -> std::result::Result<Page<Image>, StoreError> {
        self.page(false, page).await
    }

    async fn feature_for_date(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<Option<DailyFeature>, StoreError> {
        let rows: Vec<FeatureRow> = sqlx::query_as(
            "SELECT feature_date, image_id FROM daily_features WHERE feature_date = $1",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        assert!(
            rows.len() <= 1,
            "{} daily features recorded for {}",
            rows.len(),
            date
        );
        Ok(rows.into_iter().next().map(Into::into))
    }

    async fn feature_counts(&self) -> std::result::Result<HashMap<ImageId, u64>, StoreError> {
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT image_id, COUNT(*) FROM daily_features GROUP BY image_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, count)| (ImageId(id), count.max(0) as u64))
            .collect())
    }

    async fn insert_feature_if_absent(
        &self,
        feature: DailyFeature,
    ) -> std::result::Result<FeatureInsert, StoreError> {
        let inserted: Option<FeatureRow> = sqlx::query_as(
            r#"
            INSERT INTO daily_features (feature_date, image_id)
            VALUES ($1, $2)
            ON CONFLICT (feature_date) DO NOTHING
            RETURNING feature_date, image_id
            "#,
        )
        .bind(feature.date)
        .bind(feature.image_id.0)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(FeatureInsert::Inserted(row.into()));
        }

        let existing = self.feature_for_date(feature.date).await?.ok_or_else(|| {
            StoreError::Query(format!(
                "daily feature for {} conflicted but could not be read back",
                feature.date
            ))
        })?;
        Ok(FeatureInsert::Existing(existing))
    }
}
