use crate::metrics::MALFORMED_RECORDS_TOTAL;
use crate::model::{Category, CategoryCounts, Event, HourlyStats, PhotoRecord, UNKNOWN_LABEL};
use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use tracing::warn;

/// Count events per collapsed category
pub fn count_by_category(events: &[Event]) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for event in events {
        counts.record(Category::from_label(event.detected_object.as_deref()));
    }
    counts
}

/// All 24 hour labels mapped to zeroed counts
pub fn empty_hourly() -> HourlyStats {
    (0..24)
        .map(|hour| (format!("{:02}", hour), CategoryCounts::default()))
        .collect()
}

/// Count events per hour-of-day in `tz` and collapsed category
pub fn count_by_hour(events: &[Event], tz: &Tz) -> HourlyStats {
    let mut hourly = empty_hourly();

    for event in events {
        let Some(utc) = DateTime::from_timestamp(event.timestamp, 0) else {
            warn!(
                "Skipping event with unrepresentable timestamp {}",
                event.timestamp
            );
            MALFORMED_RECORDS_TOTAL.inc();
            continue;
        };

        let hour = format!("{:02}", utc.with_timezone(tz).hour());
        if let Some(counts) = hourly.get_mut(&hour) {
            counts.record(Category::from_label(event.detected_object.as_deref()));
        }
    }

    hourly
}

/// Events that captured a photo, newest first. A missing label is reported
/// as `"unknown"` here rather than collapsed to `"other"`.
pub fn photo_gallery(events: &[Event]) -> Vec<PhotoRecord> {
    let mut photos: Vec<PhotoRecord> = events
        .iter()
        .filter_map(|event| {
            let photo_url = event.photo_url.as_deref().filter(|url| !url.is_empty())?;
            Some(PhotoRecord {
                timestamp: event.timestamp,
                photo_url: photo_url.to_string(),
                detected_object: event
                    .detected_object
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            })
        })
        .collect();

    photos.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    photos
}
