//! SQLite access to the marketplace tables.
//!
//! Reads the `profiles`, `offers` and `interests` tables written by the
//! marketplace application. Nothing here writes.

use async_trait::async_trait;
use ofrezco_live_core::{
    InterestId, InterestRecord, InterestStatus, InterestStore, Listing, ListingId, ProfileId,
    StoreError, UserId,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{info, warn};

/// Row shape of an interest record query.
type InterestRow = (i64, i64, Option<i64>, Option<String>, Option<i64>);

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Interest store backed by the marketplace SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await
            .map_err(backend)?;

        info!("Connected to marketplace database");
        Ok(Self { pool })
    }
}

fn into_record((id, listing_id, interested_user, status, created_at): InterestRow) -> InterestRecord {
    let status = match status.as_deref() {
        None => InterestStatus::default(),
        Some(name) => InterestStatus::parse(name).unwrap_or_else(|| {
            warn!(interest = id, status = %name, "Unknown interest status");
            InterestStatus::default()
        }),
    };

    InterestRecord {
        id,
        listing_id,
        interested_user,
        status,
        created_at,
    }
}

#[async_trait]
impl InterestStore for SqliteStore {
    async fn profile_of(&self, user: UserId) -> Result<Option<ProfileId>, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM profiles WHERE user_id = ? ORDER BY id LIMIT 1")
                .bind(user)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(row.map(|(id,)| id))
    }

    async fn listings_of(&self, profile: ProfileId) -> Result<Vec<Listing>, StoreError> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, title FROM offers WHERE profile_id = ? ORDER BY id")
                .bind(profile)
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|(id, title)| Listing { id, title })
            .collect())
    }

    async fn interests_after(
        &self,
        listings: &[ListingId],
        cursor: InterestId,
    ) -> Result<Vec<InterestRecord>, StoreError> {
        if listings.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id, offer_id, interested_user_id, status, \
             CAST(strftime('%s', created_at) AS INTEGER) \
             FROM interests WHERE id > ",
        );
        query.push_bind(cursor);
        query.push(" AND offer_id IN (");
        let mut ids = query.separated(", ");
        for id in listings {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");
        query.push(" ORDER BY id DESC");

        let rows: Vec<InterestRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(into_record).collect())
    }

    async fn count_interests(&self, listing: ListingId) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(id) FROM interests WHERE offer_id = ?")
            .bind(listing)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        u64::try_from(count).map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn marketplace() -> SqliteStore {
        // One connection: each in-memory connection is its own database.
        let store = SqliteStore::connect("sqlite::memory:", 1).await.unwrap();
        let schema = [
            "CREATE TABLE profiles (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL)",
            "CREATE TABLE offers (id INTEGER PRIMARY KEY, profile_id INTEGER NOT NULL, title TEXT NOT NULL)",
            "CREATE TABLE interests (id INTEGER PRIMARY KEY, offer_id INTEGER NOT NULL, \
             interested_user_id INTEGER, status TEXT DEFAULT 'PENDING', created_at DATETIME)",
            "INSERT INTO profiles (id, user_id) VALUES (100, 1)",
            "INSERT INTO offers (id, profile_id, title) VALUES (500, 100, 'Clases de guitarra')",
            "INSERT INTO offers (id, profile_id, title) VALUES (501, 100, 'Sin interesados')",
            "INSERT INTO offers (id, profile_id, title) VALUES (600, 200, 'Otra tienda')",
            "INSERT INTO interests (id, offer_id, interested_user_id, status, created_at) \
             VALUES (10, 500, 2, 'PENDING', '2024-05-01 10:00:00')",
            "INSERT INTO interests (id, offer_id, interested_user_id, status, created_at) \
             VALUES (11, 500, NULL, 'CONTACTED', NULL)",
            "INSERT INTO interests (id, offer_id, interested_user_id, status, created_at) \
             VALUES (12, 500, 3, 'PENDING', '2024-05-01 10:05:00.123456')",
            "INSERT INTO interests (id, offer_id, interested_user_id) VALUES (13, 600, 4)",
        ];
        for statement in schema {
            sqlx::query(statement).execute(&store.pool).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_profile_and_listings() {
        let store = marketplace().await;
        assert_eq!(store.profile_of(1).await.unwrap(), Some(100));
        assert_eq!(store.profile_of(9).await.unwrap(), None);

        let listings = store.listings_of(100).await.unwrap();
        let ids: Vec<_> = listings.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![500, 501]);
        assert!(store.listings_of(999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_interests_after() {
        let store = marketplace().await;

        let records = store.interests_after(&[500, 501], 0).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![12, 11, 10]);

        assert_eq!(records[1].interested_user, None);
        assert_eq!(records[1].status, InterestStatus::Contacted);
        assert_eq!(records[1].created_at, None);
        assert_eq!(records[2].created_at, Some(1_714_557_600));

        assert!(store.interests_after(&[500], 12).await.unwrap().is_empty());
        assert!(store.interests_after(&[], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_count_interests() {
        let store = marketplace().await;
        assert_eq!(store.count_interests(500).await.unwrap(), 3);
        assert_eq!(store.count_interests(501).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cursor_query_over_sqlite() {
        use live_protocol::PollResponse;
        use ofrezco_live_core::CursorQuery;
        use std::sync::Arc;

        let query = CursorQuery::new(Arc::new(marketplace().await));
        assert_eq!(
            query.poll(Some(1), 0).await.unwrap(),
            PollResponse::new_records(12, 3)
        );
        assert_eq!(query.poll(Some(1), 12).await.unwrap(), PollResponse::nothing_new());
    }
}
