//! Response bodies for the interest notification endpoints.

use serde::{Deserialize, Serialize};

/// Result of a notification cursor poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    /// Whether interest records newer than the cursor exist.
    pub has_new: bool,
    /// Highest interest id found; the caller's next cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<i64>,
    /// Number of records newer than the cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl PollResponse {
    /// Nothing new since the cursor.
    #[must_use]
    pub fn nothing_new() -> Self {
        Self {
            has_new: false,
            last_id: None,
            count: None,
        }
    }

    /// New records up to `last_id`.
    #[must_use]
    pub fn new_records(last_id: i64, count: usize) -> Self {
        Self {
            has_new: true,
            last_id: Some(last_id),
            count: Some(count),
        }
    }
}

/// Interest totals for one listing owned by the caller.
///
/// Listings are called offers on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestSummary {
    #[serde(rename = "offer_title")]
    pub title: String,
    #[serde(rename = "offer_id")]
    pub listing_id: i64,
    pub interested_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_new_omits_cursor() {
        let json = serde_json::to_string(&PollResponse::nothing_new()).unwrap();
        assert_eq!(json, r#"{"has_new":false}"#);
    }

    #[test]
    fn test_new_records_shape() {
        let json = serde_json::to_string(&PollResponse::new_records(12, 3)).unwrap();
        assert_eq!(json, r#"{"has_new":true,"last_id":12,"count":3}"#);
    }

    #[test]
    fn test_summary_shape() {
        let summary = InterestSummary {
            title: "Clases de guitarra".to_string(),
            listing_id: 500,
            interested_count: 2,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(
            json,
            r#"{"offer_title":"Clases de guitarra","offer_id":500,"interested_count":2}"#
        );
    }
}
