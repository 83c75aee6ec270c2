use crate::errors::{Error, Result};
use bigdecimal::ToPrimitive;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use std::collections::BTreeMap;

/// Label used by the photo gallery when an event carries no classification.
pub const UNKNOWN_LABEL: &str = "unknown";

/// A detection event recorded by the bowl device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub device_id: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Raw row as stored in the events table. `ts` keeps the store's decimal
/// representation until the row is converted into an [`Event`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub device_id: String,
    pub ts: Option<BigDecimal>,
    pub detected_object: Option<String>,
    pub photo_url: Option<String>,
}

impl TryFrom<EventRow> for Event {
    type Error = Error;

    fn try_from(row: EventRow) -> Result<Self> {
        let ts = row.ts.ok_or_else(|| {
            Error::MalformedRecord(format!("event of device {} has no timestamp", row.device_id))
        })?;

        // Whole seconds only; fractional parts are truncated toward zero.
        let timestamp = ts.with_scale(0).to_i64().ok_or_else(|| {
            Error::MalformedRecord(format!("timestamp {} does not fit in i64", ts))
        })?;

        Ok(Event {
            device_id: row.device_id,
            timestamp,
            detected_object: row.detected_object,
            photo_url: row.photo_url,
        })
    }
}

/// Aggregation category after collapsing the open label set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Dog,
    Cat,
    Other,
}

impl Category {
    /// Anything that is not exactly `dog` or `cat`, including a missing
    /// label, is `Other`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("dog") => Category::Dog,
            Some("cat") => Category::Cat,
            _ => Category::Other,
        }
    }
}

/// Per-category event counts, serialized as `{"dog":n,"cat":n,"other":n}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub dog: u64,
    pub cat: u64,
    pub other: u64,
}

impl CategoryCounts {
    pub fn record(&mut self, category: Category) {
        match category {
            Category::Dog => self.dog += 1,
            Category::Cat => self.cat += 1,
            Category::Other => self.other += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.dog + self.cat + self.other
    }
}

/// Counts keyed by two-digit hour label `"00"`..`"23"`
pub type HourlyStats = BTreeMap<String, CategoryCounts>;

/// Gallery entry for an event that captured a photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub timestamp: i64,
    pub photo_url: String,
    pub detected_object: String,
}
