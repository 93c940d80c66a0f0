//! Interest notification cursor.
//!
//! Sellers poll with the highest interest id they have seen and learn
//! whether anything newer arrived on their listings. Each poll is a plain
//! read; nothing is held open between calls.

use crate::store::{InterestId, InterestStore, ListingId, StoreError, UserId};
use live_protocol::{InterestSummary, PollResponse};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Notification query errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The request carried no caller identity.
    #[error("Caller is not authenticated")]
    Unauthenticated,

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stateless interest queries over an [`InterestStore`].
#[derive(Clone)]
pub struct CursorQuery {
    store: Arc<dyn InterestStore>,
}

impl CursorQuery {
    /// Create a query over a store.
    #[must_use]
    pub fn new(store: Arc<dyn InterestStore>) -> Self {
        Self { store }
    }

    /// Get the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn InterestStore> {
        &self.store
    }

    /// Report interest records newer than `last_id` on the caller's listings.
    ///
    /// An anonymous caller, a caller without a profile, or a profile without
    /// listings all yield `has_new: false`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn poll(
        &self,
        caller: Option<UserId>,
        last_id: InterestId,
    ) -> Result<PollResponse, NotifyError> {
        let Some(user) = caller else {
            return Ok(PollResponse::nothing_new());
        };

        let listing_ids = self.owned_listing_ids(user).await?;
        if listing_ids.is_empty() {
            trace!(user, "No listings to poll");
            return Ok(PollResponse::nothing_new());
        }

        let records = self.store.interests_after(&listing_ids, last_id).await?;
        let (newest, count) = records
            .iter()
            .map(|r| r.id)
            .filter(|id| *id > last_id)
            .fold((None, 0usize), |(newest, count), id| {
                (newest.max(Some(id)), count + 1)
            });

        match newest {
            Some(newest) => {
                debug!(user, last_id, newest, count, "New interest");
                Ok(PollResponse::new_records(newest, count))
            }
            None => Ok(PollResponse::nothing_new()),
        }
    }

    /// Interest totals per listing for the caller's listings that have any.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Unauthenticated`] for an anonymous caller, or
    /// an error if the store fails.
    pub async fn summary(&self, caller: Option<UserId>) -> Result<Vec<InterestSummary>, NotifyError> {
        let user = caller.ok_or(NotifyError::Unauthenticated)?;

        let Some(profile) = self.store.profile_of(user).await? else {
            return Ok(Vec::new());
        };

        let mut summaries = Vec::new();
        for listing in self.store.listings_of(profile).await? {
            let interested_count = self.store.count_interests(listing.id).await?;
            if interested_count > 0 {
                summaries.push(InterestSummary {
                    listing_id: listing.id,
                    title: listing.title,
                    interested_count,
                });
            }
        }
        Ok(summaries)
    }

    async fn owned_listing_ids(&self, user: UserId) -> Result<Vec<ListingId>, StoreError> {
        let Some(profile) = self.store.profile_of(user).await? else {
            return Ok(Vec::new());
        };
        Ok(self
            .store
            .listings_of(profile)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect())
    }
}

impl std::fmt::Debug for CursorQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorQuery")
            .field("store", &self.store.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InterestRecord, InterestStatus, Listing, MemoryStore, ProfileId};
    use async_trait::async_trait;

    /// Store that ignores the cursor and returns every record.
    struct UnfilteredStore(Arc<MemoryStore>);

    #[async_trait]
    impl InterestStore for UnfilteredStore {
        async fn profile_of(&self, user: UserId) -> Result<Option<ProfileId>, StoreError> {
            self.0.profile_of(user).await
        }

        async fn listings_of(&self, profile: ProfileId) -> Result<Vec<Listing>, StoreError> {
            self.0.listings_of(profile).await
        }

        async fn interests_after(
            &self,
            listings: &[ListingId],
            _cursor: InterestId,
        ) -> Result<Vec<InterestRecord>, StoreError> {
            self.0.interests_after(listings, InterestId::MIN).await
        }

        async fn count_interests(&self, listing: ListingId) -> Result<u64, StoreError> {
            self.0.count_interests(listing).await
        }

        fn name(&self) -> &'static str {
            "unfiltered"
        }
    }

    fn seller_with_interests(ids: &[InterestId]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.add_profile(1, 100);
        store.add_listing(100, 500, "Clases de guitarra");
        for id in ids {
            store.insert_interest(InterestRecord {
                id: *id,
                listing_id: 500,
                interested_user: Some(2),
                status: InterestStatus::Pending,
                created_at: None,
            });
        }
        store
    }

    #[tokio::test]
    async fn test_poll_reports_new_records_then_nothing() {
        let query = CursorQuery::new(seller_with_interests(&[10, 11, 12]));

        let first = query.poll(Some(1), 0).await.unwrap();
        assert_eq!(first, PollResponse::new_records(12, 3));

        let second = query.poll(Some(1), 12).await.unwrap();
        assert_eq!(second, PollResponse::nothing_new());
    }

    #[tokio::test]
    async fn test_poll_counts_only_past_cursor() {
        let query = CursorQuery::new(seller_with_interests(&[10, 11, 12]));
        assert_eq!(
            query.poll(Some(1), 10).await.unwrap(),
            PollResponse::new_records(12, 2)
        );
    }

    #[tokio::test]
    async fn test_poll_counts_agree_with_last_id() {
        let store = seller_with_interests(&[10, 11, 12]);
        let query = CursorQuery::new(Arc::new(UnfilteredStore(store)));

        assert_eq!(
            query.poll(Some(1), 10).await.unwrap(),
            PollResponse::new_records(12, 2)
        );
        assert_eq!(query.poll(Some(1), 12).await.unwrap(), PollResponse::nothing_new());
    }

    #[tokio::test]
    async fn test_poll_without_listings() {
        let store = Arc::new(MemoryStore::new());
        store.add_profile(1, 100);
        store.record_interest(999, Some(3));
        let query = CursorQuery::new(store);

        for last_id in [-1, 0, 50] {
            assert_eq!(query.poll(Some(1), last_id).await.unwrap(), PollResponse::nothing_new());
        }
    }

    #[tokio::test]
    async fn test_poll_anonymous_or_without_profile() {
        let query = CursorQuery::new(seller_with_interests(&[10]));
        assert_eq!(query.poll(None, 0).await.unwrap(), PollResponse::nothing_new());
        assert_eq!(query.poll(Some(77), 0).await.unwrap(), PollResponse::nothing_new());
    }

    #[tokio::test]
    async fn test_poll_ignores_other_sellers_listings() {
        let store = seller_with_interests(&[10]);
        store.add_profile(2, 200);
        store.add_listing(200, 600, "Tarta de queso");
        store.record_interest(600, None);
        let query = CursorQuery::new(store);

        assert_eq!(query.poll(Some(1), 10).await.unwrap(), PollResponse::nothing_new());
        assert_eq!(query.poll(Some(2), 10).await.unwrap(), PollResponse::new_records(11, 1));
    }

    #[tokio::test]
    async fn test_summary() {
        let store = seller_with_interests(&[10, 11]);
        store.add_listing(100, 501, "Sin interesados");
        let query = CursorQuery::new(store);

        let summary = query.summary(Some(1)).await.unwrap();
        assert_eq!(
            summary,
            vec![InterestSummary {
                listing_id: 500,
                title: "Clases de guitarra".to_string(),
                interested_count: 2,
            }]
        );

        assert!(query.summary(Some(77)).await.unwrap().is_empty());
        assert!(matches!(
            query.summary(None).await,
            Err(NotifyError::Unauthenticated)
        ));
    }
}
