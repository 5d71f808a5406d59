//! Real-time dashboard counters in Redis, parallel to the durable
//! Postgres upserts. All operations here are CRDT-like (increment,
//! zadd, zincrby) — no single-writer requirement, arbitrary interleaving
//! across plugin instances is correct.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::AnalyticsError;
use crate::event::{AnalyticsEvent, EventType};

const ACTIVE_SESSION_WINDOW_SECONDS: i64 = 300;
const COUNTER_TTL_SECONDS: i64 = 3600;

#[derive(Clone)]
pub struct RealtimeCounters {
    conn: ConnectionManager,
}

impl RealtimeCounters {
    pub async fn connect(url: &str) -> Result<Self, AnalyticsError> {
        let client = redis::Client::open(url)?;
        Ok(Self { conn: client.get_connection_manager().await? })
    }

    /// Record one event's effect on the minute-bucketed real-time
    /// counters and the rolling active-sessions sorted set.
    pub async fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        let mut conn = self.conn.clone();
        let bucket = minute_bucket(event.timestamp);

        let events_key = format!("stats:realtime:events:{bucket}");
        let plays_key = format!("stats:realtime:plays:{bucket}");
        let trending_key = format!("stats:trending:tracks:{bucket}");
        let active_key = "stats:realtime:active_sessions".to_string();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .incr(&events_key, 1)
            .ignore()
            .expire(&events_key, COUNTER_TTL_SECONDS)
            .ignore();

        if event.event_type == EventType::Play {
            pipe.incr(&plays_key, 1).ignore().expire(&plays_key, COUNTER_TTL_SECONDS).ignore();
            pipe.zincr(&trending_key, &event.subject_id, 1).ignore();
            pipe.expire(&trending_key, COUNTER_TTL_SECONDS).ignore();
        }

        let now_ts = event.timestamp.timestamp();
        pipe.zadd(&active_key, &event.user_or_session_id, now_ts).ignore();

        pipe.query_async::<()>(&mut conn).await?;

        let cutoff = now_ts - ACTIVE_SESSION_WINDOW_SECONDS;
        conn.zrembyscore::<_, _, _, ()>(&active_key, i64::MIN, cutoff).await?;
        Ok(())
    }

    pub async fn active_session_count(&self) -> Result<u64, AnalyticsError> {
        let mut conn = self.conn.clone();
        Ok(conn.zcard("stats:realtime:active_sessions").await?)
    }

    pub async fn trending(&self, timestamp: DateTime<Utc>, limit: isize) -> Result<Vec<(String, f64)>, AnalyticsError> {
        let mut conn = self.conn.clone();
        let key = format!("stats:trending:tracks:{}", minute_bucket(timestamp));
        Ok(conn.zrevrange_withscores(&key, 0, limit - 1).await?)
    }
}

fn minute_bucket(ts: DateTime<Utc>) -> i64 {
    ts.timestamp() / 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_bucket_truncates_to_the_minute() {
        let a = DateTime::parse_from_rfc3339("2026-08-01T10:15:05Z").unwrap().with_timezone(&Utc);
        let b = DateTime::parse_from_rfc3339("2026-08-01T10:15:59Z").unwrap().with_timezone(&Utc);
        assert_eq!(minute_bucket(a), minute_bucket(b));

        let c = DateTime::parse_from_rfc3339("2026-08-01T10:16:00Z").unwrap().with_timezone(&Utc);
        assert_ne!(minute_bucket(a), minute_bucket(c));
    }
}
