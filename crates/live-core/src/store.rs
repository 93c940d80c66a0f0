//! Read-only view of the marketplace data the notification query needs.
//!
//! Profiles, listings and interest records are owned by the surrounding
//! marketplace. This module only defines how they are read.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

/// Marketplace user id.
pub type UserId = i64;
/// Seller profile id.
pub type ProfileId = i64;
/// Listing (offer) id.
pub type ListingId = i64;
/// Interest record id. Strictly increasing in creation order.
pub type InterestId = i64;

/// Follow-up status of an interest record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterestStatus {
    #[default]
    Pending,
    Contacted,
}

impl InterestStatus {
    /// The stored name of this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestStatus::Pending => "PENDING",
            InterestStatus::Contacted => "CONTACTED",
        }
    }

    /// Parse a stored status name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(InterestStatus::Pending),
            "CONTACTED" => Some(InterestStatus::Contacted),
            _ => None,
        }
    }
}

/// A listing owned by a seller profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
}

/// One party's interest in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestRecord {
    pub id: InterestId,
    pub listing_id: ListingId,
    /// `None` for anonymous interest.
    pub interested_user: Option<UserId>,
    pub status: InterestStatus,
    /// Creation time in epoch seconds, when known.
    pub created_at: Option<i64>,
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed.
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A row could not be mapped.
    #[error("Invalid stored data: {0}")]
    Decode(String),
}

/// Read access to profiles, listings and interest records.
///
/// Every method treats "nothing found" as an empty result, never an error.
#[async_trait]
pub trait InterestStore: Send + Sync {
    /// The seller profile owned by a user, if any.
    async fn profile_of(&self, user: UserId) -> Result<Option<ProfileId>, StoreError>;

    /// Listings owned by a profile.
    async fn listings_of(&self, profile: ProfileId) -> Result<Vec<Listing>, StoreError>;

    /// Interest records on `listings` with id greater than `cursor`,
    /// ordered by id descending.
    async fn interests_after(
        &self,
        listings: &[ListingId],
        cursor: InterestId,
    ) -> Result<Vec<InterestRecord>, StoreError>;

    /// Number of interest records on one listing.
    async fn count_interests(&self, listing: ListingId) -> Result<u64, StoreError>;

    /// Get the store name (e.g., "memory", "sqlite").
    fn name(&self) -> &'static str;
}

/// In-process store.
///
/// Used when no database is configured, and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: DashMap<UserId, ProfileId>,
    listings: DashMap<ProfileId, Vec<Listing>>,
    interests: DashMap<InterestId, InterestRecord>,
    last_interest_id: AtomicI64,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a seller profile to a user.
    pub fn add_profile(&self, user: UserId, profile: ProfileId) {
        self.profiles.insert(user, profile);
    }

    /// Add a listing to a profile.
    pub fn add_listing(&self, profile: ProfileId, id: ListingId, title: impl Into<String>) {
        self.listings.entry(profile).or_default().push(Listing {
            id,
            title: title.into(),
        });
    }

    /// Record interest in a listing, assigning the next id.
    pub fn record_interest(&self, listing_id: ListingId, interested_user: Option<UserId>) -> InterestId {
        let id = self.last_interest_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.interests.insert(
            id,
            InterestRecord {
                id,
                listing_id,
                interested_user,
                status: InterestStatus::Pending,
                created_at: None,
            },
        );
        id
    }

    /// Insert a record with a caller-chosen id.
    ///
    /// Later [`MemoryStore::record_interest`] calls continue above it.
    pub fn insert_interest(&self, record: InterestRecord) {
        self.last_interest_id.fetch_max(record.id, Ordering::SeqCst);
        self.interests.insert(record.id, record);
    }
}

#[async_trait]
impl InterestStore for MemoryStore {
    async fn profile_of(&self, user: UserId) -> Result<Option<ProfileId>, StoreError> {
        Ok(self.profiles.get(&user).map(|p| *p))
    }

    async fn listings_of(&self, profile: ProfileId) -> Result<Vec<Listing>, StoreError> {
        Ok(self
            .listings
            .get(&profile)
            .map(|l| l.value().clone())
            .unwrap_or_default())
    }

    async fn interests_after(
        &self,
        listings: &[ListingId],
        cursor: InterestId,
    ) -> Result<Vec<InterestRecord>, StoreError> {
        let mut found: Vec<InterestRecord> = self
            .interests
            .iter()
            .filter(|r| r.id > cursor && listings.contains(&r.listing_id))
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(found)
    }

    async fn count_interests(&self, listing: ListingId) -> Result<u64, StoreError> {
        Ok(self
            .interests
            .iter()
            .filter(|r| r.listing_id == listing)
            .count() as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(InterestStatus::parse("PENDING"), Some(InterestStatus::Pending));
        assert_eq!(InterestStatus::parse("CONTACTED"), Some(InterestStatus::Contacted));
        assert_eq!(InterestStatus::parse("pending"), None);
        assert_eq!(InterestStatus::Contacted.as_str(), "CONTACTED");
        assert_eq!(InterestStatus::default(), InterestStatus::Pending);
    }

    #[tokio::test]
    async fn test_interests_after_filters_and_orders() {
        let store = MemoryStore::new();
        let first = store.record_interest(1, Some(5));
        let second = store.record_interest(2, None);
        let third = store.record_interest(1, Some(6));

        let found = store.interests_after(&[1], first - 1).await.unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third, first]);

        let found = store.interests_after(&[1, 2], first).await.unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third, second]);

        assert!(store.interests_after(&[], 0).await.unwrap().is_empty());
        assert_eq!(store.count_interests(1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_interest_advances_ids() {
        let store = MemoryStore::new();
        store.insert_interest(InterestRecord {
            id: 40,
            listing_id: 1,
            interested_user: None,
            status: InterestStatus::Contacted,
            created_at: Some(1_700_000_000),
        });
        assert_eq!(store.record_interest(1, None), 41);
    }

    #[tokio::test]
    async fn test_missing_profile_is_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.profile_of(9).await.unwrap(), None);
        assert!(store.listings_of(9).await.unwrap().is_empty());
    }
}
