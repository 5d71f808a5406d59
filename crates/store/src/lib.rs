//! Redis-backed durable job storage shared by every plugin runtime.
//!
//! Each plugin instance owns a namespace prefix `P` (e.g. `embed`,
//! `separate`, `enrich`, `download`) so that multiple plugins can share
//! one Redis instance without key collisions. See the field layout in
//! [`keys`] for the exact key shapes.

mod error;
mod keys;

pub use error::StoreError;

use std::collections::HashMap;

use auris_core::{Job, JobId, JobStatus, Modality, Priority};
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Jobs are kept for seven days after their last write.
const JOB_TTL_SECONDS: i64 = 7 * 24 * 3600;

/// Upper bound on how many ids the recency index keeps; `list_recent`
/// is a downloader convenience, not a full job history.
const RECENT_LIST_CAP: isize = 1000;

/// Durable, namespaced job store over a single Redis connection.
///
/// Cloning is cheap: `ConnectionManager` is itself a cheap-to-clone
/// handle that multiplexes over one underlying connection and
/// transparently reconnects.
#[derive(Clone)]
pub struct JobStore {
    conn: ConnectionManager,
    namespace: String,
}

impl JobStore {
    /// Connect to Redis at `url` and scope all keys under `namespace`.
    pub async fn connect(url: &str, namespace: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn, namespace: namespace.into() })
    }

    /// Persist a job, refreshing its TTL and updating the subject index
    /// and active-set membership as a single pipelined transaction.
    pub async fn save(&self, job: &Job) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let job_key = keys::job(&self.namespace, job.id);
        let status_key = keys::status(&self.namespace, job.id);
        let subject_key = keys::subject(&self.namespace, &job.subject_id);
        let active_key = keys::active_ids(&self.namespace);
        let recent_key = keys::recent_ids(&self.namespace);
        let fields = job_to_fields(job)?;
        let id_str = job.id.to_string();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(&job_key, &fields)
            .ignore()
            .expire(&job_key, JOB_TTL_SECONDS)
            .ignore()
            .set_ex(&status_key, job.status.to_string(), JOB_TTL_SECONDS as u64)
            .ignore()
            .set_ex(&subject_key, &id_str, JOB_TTL_SECONDS as u64)
            .ignore()
            .zadd(&recent_key, &id_str, job.created_at.timestamp())
            .ignore()
            .zremrangebyrank(&recent_key, 0, -(RECENT_LIST_CAP + 1))
            .ignore();

        if job.status.is_terminal() {
            pipe.srem(&active_key, &id_str).ignore();
        } else {
            pipe.sadd(&active_key, &id_str).ignore();
        }

        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    /// Update only the `progress` field of an in-flight job, without
    /// touching its other fields. Used for the live progress stream a
    /// download emits between its `processing` transition and its
    /// terminal write, which would otherwise go through `save` on every
    /// line of subprocess output.
    pub async fn update_progress(&self, id: JobId, progress: f32) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let job_key = keys::job(&self.namespace, id);
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(&job_key, "progress", progress)
            .ignore()
            .expire(&job_key, JOB_TTL_SECONDS)
            .ignore();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    /// Fetch a job by id.
    pub async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let mut conn = self.conn.clone();
        let job_key = keys::job(&self.namespace, id);
        let fields: HashMap<String, String> = conn.hgetall(&job_key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(fields_to_job(&fields)?))
    }

    /// Find the most recently indexed job for a subject, if any.
    pub async fn find_by_subject(&self, subject_id: &str) -> Result<Option<Job>, StoreError> {
        let mut conn = self.conn.clone();
        let subject_key = keys::subject(&self.namespace, subject_id);
        let id: Option<String> = conn.get(&subject_key).await?;
        let Some(id) = id else { return Ok(None) };
        let Ok(id) = id.parse::<JobId>() else { return Ok(None) };
        self.get(id).await
    }

    /// List every job id currently in the non-terminal active set.
    pub async fn list_active(&self) -> Result<Vec<JobId>, StoreError> {
        let mut conn = self.conn.clone();
        let active_key = keys::active_ids(&self.namespace);
        let ids: Vec<String> = conn.smembers(&active_key).await?;
        Ok(ids.into_iter().filter_map(|s| s.parse().ok()).collect())
    }

    /// Set a process-wide admission cooldown for `seconds`, advisory only.
    pub async fn set_cooldown(&self, seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = keys::cooldown(&self.namespace);
        conn.set_ex::<_, _, ()>(&key, "1", seconds).await?;
        Ok(())
    }

    /// Whether the admission cooldown flag is currently set.
    pub async fn in_cooldown(&self) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let key = keys::cooldown(&self.namespace);
        Ok(conn.exists(&key).await?)
    }

    /// Most recently created jobs, newest first, optionally filtered by
    /// status, capped at `limit`. Downloader-only surface: other
    /// modalities only expose single-job status lookups.
    pub async fn list_recent(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<Job>, StoreError> {
        let mut conn = self.conn.clone();
        let recent_key = keys::recent_ids(&self.namespace);
        // Over-fetch past `limit` so a status filter doesn't starve the
        // page; still bounded by the index's own retention cap.
        let fetch = (limit.max(1) * 4).min(RECENT_LIST_CAP as usize) as isize;
        let ids: Vec<String> = conn.zrevrange(&recent_key, 0, fetch - 1).await?;

        let mut jobs = Vec::with_capacity(limit.min(ids.len()));
        for id in ids {
            let Ok(id) = id.parse::<JobId>() else { continue };
            let Some(job) = self.get(id).await? else { continue };
            if status.is_some_and(|s| job.status != s) {
                continue;
            }
            jobs.push(job);
            if jobs.len() >= limit {
                break;
            }
        }
        Ok(jobs)
    }
}

fn job_to_fields(job: &Job) -> Result<Vec<(&'static str, String)>, StoreError> {
    Ok(vec![
        ("id", job.id.to_string()),
        ("subject_id", job.subject_id.clone()),
        ("modality", job.modality.to_string()),
        ("status", job.status.to_string()),
        ("priority", job.priority.as_i32().to_string()),
        ("progress", job.progress.to_string()),
        ("input_descriptor", serde_json::to_string(&job.input_descriptor)?),
        ("result", job.result.as_ref().map(serde_json::to_string).transpose()?.unwrap_or_default()),
        ("error", job.error.clone().unwrap_or_default()),
        ("created_at", job.created_at.to_rfc3339()),
        ("updated_at", job.updated_at.to_rfc3339()),
    ])
}

fn fields_to_job(fields: &HashMap<String, String>) -> Result<Job, StoreError> {
    let get = |k: &'static str| fields.get(k).cloned().ok_or(StoreError::MissingField(k));

    let modality = match get("modality")?.as_str() {
        "embedding" => Modality::Embedding,
        "stem-separation" => Modality::StemSeparation,
        "enrichment" => Modality::Enrichment,
        "download" => Modality::Download,
        _ => return Err(StoreError::MissingField("modality")),
    };
    let status = match get("status")?.as_str() {
        "pending" => JobStatus::Pending,
        "processing" => JobStatus::Processing,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        "cancelled" => JobStatus::Cancelled,
        _ => return Err(StoreError::MissingField("status")),
    };
    let priority = Priority::from_i32(get("priority")?.parse().unwrap_or(10))
        .unwrap_or(Priority::Normal);
    let result_raw = get("result").unwrap_or_default();
    let result = if result_raw.is_empty() {
        None
    } else {
        Some(serde_json::from_str(&result_raw)?)
    };
    let error_raw = get("error").unwrap_or_default();
    let error = if error_raw.is_empty() { None } else { Some(error_raw) };
    let created_at: DateTime<Utc> = get("created_at")?
        .parse()
        .map_err(|_| StoreError::MissingField("created_at"))?;
    let updated_at: DateTime<Utc> = get("updated_at")?
        .parse()
        .map_err(|_| StoreError::MissingField("updated_at"))?;

    Ok(Job {
        id: get("id")?.parse().map_err(|_| StoreError::MissingField("id"))?,
        subject_id: get("subject_id")?,
        modality,
        input_descriptor: serde_json::from_str(&get("input_descriptor")?)?,
        status,
        priority,
        progress: get("progress")?.parse().unwrap_or(0.0),
        result,
        error,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_job_through_field_map() {
        let job = Job::new(
            "T1",
            Modality::Embedding,
            serde_json::json!({"path": "a.flac"}),
            Priority::Streaming,
        );
        let fields_vec = job_to_fields(&job).unwrap();
        let fields: HashMap<String, String> = fields_vec.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        let restored = fields_to_job(&fields).unwrap();
        assert_eq!(restored.id, job.id);
        assert_eq!(restored.subject_id, job.subject_id);
        assert_eq!(restored.status, job.status);
        assert_eq!(restored.priority, job.priority);
    }

    #[test]
    fn completed_job_round_trips_with_result() {
        let mut job = Job::new("T2", Modality::Download, serde_json::json!({}), Priority::Low);
        job.mark_completed(serde_json::json!({"paths": ["a.mp3"]}), Utc::now());
        let fields_vec = job_to_fields(&job).unwrap();
        let fields: HashMap<String, String> = fields_vec.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        let restored = fields_to_job(&fields).unwrap();
        assert_eq!(restored.result, job.result);
        assert_eq!(restored.progress, 1.0);
    }
}
