//! Durable statistics aggregation via atomic Postgres upserts.
//!
//! Every handler is a single `sqlx::query(...).execute(pool)` round
//! trip using `INSERT ... ON CONFLICT ... DO UPDATE SET count =
//! table.count + 1` arithmetic, with no intermediate read-modify-write
//! step.

use sqlx::PgPool;
use tracing::warn;

use crate::batcher::MicroBatcher;
use crate::error::AnalyticsError;
use crate::event::{AnalyticsEvent, EventType};

#[derive(Clone)]
pub struct AnalyticsAggregator {
    pool: PgPool,
}

impl AnalyticsAggregator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply one event's effect on `track_stats`, `heatmap`, `genre_stats`
    /// and `streak`, each as its own atomic upsert.
    pub async fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.record_track_stats(event).await?;
        self.record_heatmap(event).await?;
        if let Some(genre) = &event.genre {
            self.record_genre_stats(genre).await?;
        }
        if matches!(event.event_type, EventType::Play | EventType::Complete) {
            self.record_streak(&event.user_or_session_id).await?;
        }
        Ok(())
    }

    async fn record_track_stats(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        match event.event_type {
            EventType::Play => {
                let duration = event.duration.unwrap_or(0.0);
                sqlx::query(
                    "INSERT INTO track_stats (subject_id, play_count, total_play_time, last_played_at) \
                     VALUES ($1, 1, $2, now()) \
                     ON CONFLICT (subject_id) DO UPDATE SET \
                       play_count = track_stats.play_count + 1, \
                       total_play_time = track_stats.total_play_time + $2, \
                       last_played_at = now()",
                )
                .bind(&event.subject_id)
                .bind(duration)
                .execute(&self.pool)
                .await?;
            }
            EventType::Complete => {
                let value = event.completion_value().unwrap_or(100.0);
                sqlx::query(
                    "INSERT INTO track_stats (subject_id, complete_count, avg_completion, last_played_at) \
                     VALUES ($1, 1, $2, now()) \
                     ON CONFLICT (subject_id) DO UPDATE SET \
                       complete_count = track_stats.complete_count + 1, \
                       avg_completion = (track_stats.avg_completion * (track_stats.complete_count + track_stats.skip_count) + $2) \
                         / (track_stats.complete_count + track_stats.skip_count + 1), \
                       last_played_at = now()",
                )
                .bind(&event.subject_id)
                .bind(value)
                .execute(&self.pool)
                .await?;
            }
            EventType::Skip => {
                let value = event.completion_value().unwrap_or(0.0);
                sqlx::query(
                    "INSERT INTO track_stats (subject_id, skip_count, avg_completion, last_played_at) \
                     VALUES ($1, 1, $2, now()) \
                     ON CONFLICT (subject_id) DO UPDATE SET \
                       skip_count = track_stats.skip_count + 1, \
                       avg_completion = (track_stats.avg_completion * (track_stats.complete_count + track_stats.skip_count) + $2) \
                         / (track_stats.complete_count + track_stats.skip_count + 1), \
                       last_played_at = now()",
                )
                .bind(&event.subject_id)
                .bind(value)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn record_heatmap(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        let date = event.timestamp.date_naive();
        let hour = event.timestamp.format("%H").to_string().parse::<i32>().unwrap_or(0);
        sqlx::query(
            "INSERT INTO heatmap (date, hour, count) VALUES ($1, $2, 1) \
             ON CONFLICT (date, hour) DO UPDATE SET count = heatmap.count + 1",
        )
        .bind(date)
        .bind(hour)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_genre_stats(&self, genre: &str) -> Result<(), AnalyticsError> {
        sqlx::query(
            "INSERT INTO genre_stats (genre, count) VALUES ($1, 1) \
             ON CONFLICT (genre) DO UPDATE SET count = genre_stats.count + 1",
        )
        .bind(genre)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Bump a user's listening streak. `current_streak` only ever
    /// increments — there is no date-gap reset, so `max_streak` (tracked
    /// as `GREATEST` of itself and the new `current_streak`) can never
    /// fall behind it either.
    async fn record_streak(&self, user_id: &str) -> Result<(), AnalyticsError> {
        sqlx::query(
            "INSERT INTO streak (user_id, current_streak, max_streak, last_played_at) \
             VALUES ($1, 1, 1, now()) \
             ON CONFLICT (user_id) DO UPDATE SET \
               current_streak = streak.current_streak + 1, \
               max_streak = GREATEST(streak.max_streak, streak.current_streak + 1), \
               last_played_at = now()",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Accumulates incoming events into size/time-bounded batches and, on
/// flush, applies each row's upsert sequentially on a single connection.
/// A failed row logs and proceeds — a batch's per-event failure is
/// non-fatal to the rest of the batch.
pub struct BatchIngestor {
    aggregator: AnalyticsAggregator,
    batcher: MicroBatcher<AnalyticsEvent>,
}

impl BatchIngestor {
    pub fn new(aggregator: AnalyticsAggregator, max_size: usize, max_wait: std::time::Duration) -> Self {
        Self { aggregator, batcher: MicroBatcher::new(max_size, max_wait) }
    }

    pub fn push(&mut self, events: Vec<AnalyticsEvent>) {
        self.batcher.push(events);
    }

    pub fn should_flush(&self) -> bool {
        self.batcher.should_flush()
    }

    pub async fn flush(&mut self) {
        let Some(batch) = self.batcher.try_flush() else { return };
        self.apply(batch).await;
    }

    /// Unconditionally drain and apply the buffer, bypassing the
    /// size/time threshold — used on consumer shutdown so a partial
    /// batch isn't silently dropped.
    pub async fn force_flush(&mut self) {
        let batch = self.batcher.flush();
        if !batch.is_empty() {
            self.apply(batch).await;
        }
    }

    async fn apply(&self, batch: Vec<AnalyticsEvent>) {
        for event in batch {
            if let Err(e) = self.aggregator.record(&event).await {
                warn!(subject_id = %event.subject_id, error = %e, "failed to record analytics event, skipping");
            }
        }
    }
}
