use crate::errors::Result;
use crate::model::EventRow;
use async_trait::async_trait;

/// Sort direction over the timestamp sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Range query within a single device partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub device_id: String,
    /// Inclusive lower bound on the timestamp; no upper bound is applied.
    pub since: Option<i64>,
    pub direction: Direction,
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn latest(device_id: &str, limit: usize) -> Self {
        Self {
            device_id: device_id.to_string(),
            since: None,
            direction: Direction::Descending,
            limit: Some(limit),
        }
    }

    pub fn since(device_id: &str, cutoff: i64) -> Self {
        Self {
            device_id: device_id.to_string(),
            since: Some(cutoff),
            direction: Direction::Ascending,
            limit: None,
        }
    }
}

/// Read access to the key-sorted event table
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fetch rows of one partition ordered by timestamp. Rows without a
    /// timestamp sort last and never match a lower bound.
    async fn query(&self, query: &EventQuery) -> Result<Vec<EventRow>>;
}
