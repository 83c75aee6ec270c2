use crate::aggregate;
use crate::errors::{Error, Result};
use crate::metrics::{MALFORMED_RECORDS_TOTAL, STORE_FAILURES_TOTAL};
use crate::model::{CategoryCounts, Event, HourlyStats, PhotoRecord};
use crate::store::{EventQuery, EventStore};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const LATEST_EVENTS_LIMIT: usize = 20;
pub const WINDOW_SECONDS: i64 = 86_400;

/// Read-only queries over the events of one device
#[derive(Clone)]
pub struct EventQueryService {
    store: Arc<dyn EventStore>,
    device_id: String,
    timezone: Tz,
    store_timeout: Duration,
}

impl EventQueryService {
    pub fn new(
        store: Arc<dyn EventStore>,
        device_id: impl Into<String>,
        timezone: Tz,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            device_id: device_id.into(),
            timezone,
            store_timeout,
        }
    }

    /// The most recent events, newest first
    pub async fn latest_events(&self) -> Result<Vec<Event>> {
        self.fetch(EventQuery::latest(&self.device_id, LATEST_EVENTS_LIMIT))
            .await
    }

    pub async fn stats_last_24h(&self, now: DateTime<Utc>) -> Result<CategoryCounts> {
        let events = self.fetch_window(now).await?;
        let counts = aggregate::count_by_category(&events);
        debug!("{} events in the last 24h for {}", counts.total(), self.device_id);
        Ok(counts)
    }

    pub async fn stats_by_hour(&self, now: DateTime<Utc>) -> Result<HourlyStats> {
        let events = self.fetch_window(now).await?;
        Ok(aggregate::count_by_hour(&events, &self.timezone))
    }

    pub async fn photo_gallery(&self, now: DateTime<Utc>) -> Result<Vec<PhotoRecord>> {
        let events = self.fetch_window(now).await?;
        Ok(aggregate::photo_gallery(&events))
    }

    /// Events at or after `now - 24h`. Future-dated events are included.
    async fn fetch_window(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let cutoff = now.timestamp() - WINDOW_SECONDS;
        self.fetch(EventQuery::since(&self.device_id, cutoff)).await
    }

    async fn fetch(&self, query: EventQuery) -> Result<Vec<Event>> {
        let rows = match tokio::time::timeout(self.store_timeout, self.store.query(&query)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                STORE_FAILURES_TOTAL.inc();
                return Err(e);
            }
            Err(_) => {
                error!(
                    "Event store query for device {} timed out after {:?}",
                    self.device_id, self.store_timeout
                );
                STORE_FAILURES_TOTAL.inc();
                return Err(Error::StoreTimeout(self.store_timeout));
            }
        };

        let fetched = rows.len();
        let events: Vec<Event> = rows
            .into_iter()
            .filter_map(|row| match Event::try_from(row) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Skipping stored event: {}", e);
                    MALFORMED_RECORDS_TOTAL.inc();
                    None
                }
            })
            .collect();

        debug!("Parsed {}/{} events for {:?}", events.len(), fetched, query);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventRow;
    use crate::store::memory::MemoryEventStore;
    use chrono::TimeZone;
    use sqlx::types::BigDecimal;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn row(device_id: &str, ts: Option<i64>, object: Option<&str>, photo_url: Option<&str>) -> EventRow {
        EventRow {
            device_id: device_id.to_string(),
            ts: ts.map(BigDecimal::from),
            detected_object: object.map(str::to_string),
            photo_url: photo_url.map(str::to_string),
        }
    }

    fn service(rows: Vec<EventRow>) -> EventQueryService {
        EventQueryService::new(
            Arc::new(MemoryEventStore::new(rows)),
            "bowl_1",
            Tz::UTC,
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_latest_events_limited_and_ordered() {
        let base = now().timestamp();
        let rows = (0..30)
            .map(|i| row("bowl_1", Some(base - i * 60), Some("dog"), None))
            .collect();

        let events = service(rows).latest_events().await.unwrap();
        assert_eq!(events.len(), LATEST_EVENTS_LIMIT);
        assert!(events.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(events[0].timestamp, base);
    }

    #[tokio::test]
    async fn test_latest_events_scoped_to_device() {
        let rows = vec![
            row("bowl_1", Some(100), Some("dog"), None),
            row("bowl_2", Some(200), Some("cat"), None),
        ];

        let events = service(rows).latest_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].device_id, "bowl_1");
    }

    #[tokio::test]
    async fn test_stats_window_is_inclusive_and_unbounded_above() {
        let now_ts = now().timestamp();
        let rows = vec![
            row("bowl_1", Some(now_ts - WINDOW_SECONDS - 1), Some("dog"), None),
            row("bowl_1", Some(now_ts - WINDOW_SECONDS), Some("dog"), None),
            row("bowl_1", Some(now_ts - 10), Some("cat"), None),
            row("bowl_1", Some(now_ts + 3600), Some("fox"), None),
        ];

        let counts = service(rows).stats_last_24h(now()).await.unwrap();
        assert_eq!(counts, CategoryCounts { dog: 1, cat: 1, other: 1 });
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() {
        let now_ts = now().timestamp();
        let rows = vec![
            row("bowl_1", None, Some("dog"), Some("https://photos/a.jpg")),
            row("bowl_1", Some(now_ts - 5), Some("cat"), Some("https://photos/b.jpg")),
        ];
        let service = service(rows);

        let latest = service.latest_events().await.unwrap();
        assert_eq!(latest.len(), 1);

        let photos = service.photo_gallery(now()).await.unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].detected_object, "cat");
    }

    #[tokio::test]
    async fn test_hourly_and_daily_stats_agree() {
        let now_ts = now().timestamp();
        let rows = (0..48)
            .map(|i| {
                let label = if i % 3 == 0 { Some("dog") } else { None };
                row("bowl_1", Some(now_ts - i * 1800), label, None)
            })
            .collect();
        let service = service(rows);

        let daily = service.stats_last_24h(now()).await.unwrap();
        let hourly = service.stats_by_hour(now()).await.unwrap();

        assert_eq!(hourly.len(), 24);
        assert_eq!(hourly.values().map(CategoryCounts::total).sum::<u64>(), daily.total());
        assert_eq!(daily.total(), 48);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let now_ts = now().timestamp();
        let rows = vec![
            row("bowl_1", Some(now_ts - 100), Some("dog"), Some("https://photos/1.jpg")),
            row("bowl_1", Some(now_ts - 50), Some("cat"), Some("https://photos/2.jpg")),
        ];
        let service = service(rows);

        assert_eq!(
            service.photo_gallery(now()).await.unwrap(),
            service.photo_gallery(now()).await.unwrap()
        );
        assert_eq!(
            service.stats_by_hour(now()).await.unwrap(),
            service.stats_by_hour(now()).await.unwrap()
        );
    }

    #[test]
    fn test_store_failure_propagates() {
        tokio_test::block_on(async {
            let service = EventQueryService::new(
                Arc::new(MemoryEventStore::failing()),
                "bowl_1",
                Tz::UTC,
                Duration::from_secs(1),
            );

            let err = service.stats_last_24h(now()).await.unwrap_err();
            assert!(matches!(err, Error::Database(_)));
        });
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = MemoryEventStore::new(vec![]).with_delay(Duration::from_millis(200));
        let service = EventQueryService::new(
            Arc::new(store),
            "bowl_1",
            Tz::UTC,
            Duration::from_millis(20),
        );

        let err = service.latest_events().await.unwrap_err();
        assert!(matches!(err, Error::StoreTimeout(_)));
        assert!(err.is_unavailable());
    }
}
